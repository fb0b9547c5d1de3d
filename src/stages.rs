// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Auto-Scan Stage List
 * Canonical wildcard-flow pipeline order and stage classification
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde::{Deserialize, Serialize};

use crate::types::Tool;

/// One unit of the auto-scan pipeline: a tool invocation, a consolidation
/// gate, or a system marker. `Idle` is the pre-start/post-reset state;
/// `Completed` closes the run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScanStage {
    Idle,
    Amass,
    Sublist3r,
    Assetfinder,
    Gau,
    Ctl,
    Subfinder,
    ConsolidateRound1,
    HttpxRound1,
    Shuffledns,
    Cewl,
    ConsolidateRound2,
    HttpxRound2,
    Gospider,
    Subdomainizer,
    ConsolidateRound3,
    HttpxRound3,
    NucleiScreenshot,
    Metadata,
    Completed,
}

impl ScanStage {
    /// Runnable stages in strict execution order. Each consolidation gate
    /// is immediately followed by a live-web-server probe over the set it
    /// just recomputed.
    pub const RUN_ORDER: &'static [ScanStage] = &[
        ScanStage::Amass,
        ScanStage::Sublist3r,
        ScanStage::Assetfinder,
        ScanStage::Gau,
        ScanStage::Ctl,
        ScanStage::Subfinder,
        ScanStage::ConsolidateRound1,
        ScanStage::HttpxRound1,
        ScanStage::Shuffledns,
        ScanStage::Cewl,
        ScanStage::ConsolidateRound2,
        ScanStage::HttpxRound2,
        ScanStage::Gospider,
        ScanStage::Subdomainizer,
        ScanStage::ConsolidateRound3,
        ScanStage::HttpxRound3,
        ScanStage::NucleiScreenshot,
        ScanStage::Metadata,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStage::Idle => "idle",
            ScanStage::Amass => "amass",
            ScanStage::Sublist3r => "sublist3r",
            ScanStage::Assetfinder => "assetfinder",
            ScanStage::Gau => "gau",
            ScanStage::Ctl => "ctl",
            ScanStage::Subfinder => "subfinder",
            ScanStage::ConsolidateRound1 => "consolidate_round1",
            ScanStage::HttpxRound1 => "httpx_round1",
            ScanStage::Shuffledns => "shuffledns",
            ScanStage::Cewl => "cewl",
            ScanStage::ConsolidateRound2 => "consolidate_round2",
            ScanStage::HttpxRound2 => "httpx_round2",
            ScanStage::Gospider => "gospider",
            ScanStage::Subdomainizer => "subdomainizer",
            ScanStage::ConsolidateRound3 => "consolidate_round3",
            ScanStage::HttpxRound3 => "httpx_round3",
            ScanStage::NucleiScreenshot => "nuclei_screenshot",
            ScanStage::Metadata => "metadata",
            ScanStage::Completed => "completed",
        }
    }

    /// Config toggle key for this stage. A consolidation gate and the probe
    /// that follows it share one toggle per round. System stages have none.
    pub fn config_key(&self) -> Option<&'static str> {
        match self {
            ScanStage::Amass => Some("amass"),
            ScanStage::Sublist3r => Some("sublist3r"),
            ScanStage::Assetfinder => Some("assetfinder"),
            ScanStage::Gau => Some("gau"),
            ScanStage::Ctl => Some("ctl"),
            ScanStage::Subfinder => Some("subfinder"),
            ScanStage::ConsolidateRound1 | ScanStage::HttpxRound1 => {
                Some("consolidate_httpx_round1")
            }
            ScanStage::Shuffledns => Some("shuffledns"),
            ScanStage::Cewl => Some("cewl"),
            ScanStage::ConsolidateRound2 | ScanStage::HttpxRound2 => {
                Some("consolidate_httpx_round2")
            }
            ScanStage::Gospider => Some("gospider"),
            ScanStage::Subdomainizer => Some("subdomainizer"),
            ScanStage::ConsolidateRound3 | ScanStage::HttpxRound3 => {
                Some("consolidate_httpx_round3")
            }
            ScanStage::NucleiScreenshot => Some("nuclei_screenshot"),
            ScanStage::Metadata => Some("metadata"),
            ScanStage::Idle | ScanStage::Completed => None,
        }
    }

    /// The single tool a non-gate stage submits
    pub fn tool(&self) -> Option<Tool> {
        match self {
            ScanStage::Amass => Some(Tool::Amass),
            ScanStage::Sublist3r => Some(Tool::Sublist3r),
            ScanStage::Assetfinder => Some(Tool::Assetfinder),
            ScanStage::Gau => Some(Tool::Gau),
            ScanStage::Ctl => Some(Tool::Ctl),
            ScanStage::Subfinder => Some(Tool::Subfinder),
            ScanStage::HttpxRound1 | ScanStage::HttpxRound2 | ScanStage::HttpxRound3 => {
                Some(Tool::Httpx)
            }
            ScanStage::Shuffledns => Some(Tool::Shuffledns),
            ScanStage::Cewl => Some(Tool::Cewl),
            ScanStage::Gospider => Some(Tool::Gospider),
            ScanStage::Subdomainizer => Some(Tool::Subdomainizer),
            ScanStage::NucleiScreenshot => Some(Tool::NucleiScreenshot),
            ScanStage::Metadata => Some(Tool::Metadata),
            ScanStage::ConsolidateRound1
            | ScanStage::ConsolidateRound2
            | ScanStage::ConsolidateRound3
            | ScanStage::Idle
            | ScanStage::Completed => None,
        }
    }

    pub fn is_gate(&self) -> bool {
        matches!(
            self,
            ScanStage::ConsolidateRound1
                | ScanStage::ConsolidateRound2
                | ScanStage::ConsolidateRound3
        )
    }

    pub fn is_probe(&self) -> bool {
        matches!(
            self,
            ScanStage::HttpxRound1 | ScanStage::HttpxRound2 | ScanStage::HttpxRound3
        )
    }

    /// Position in the runnable order; system stages have none
    pub fn position(&self) -> Option<usize> {
        Self::RUN_ORDER.iter().position(|s| s == self)
    }

    /// Runnable stages from this one (inclusive) to the end of the
    /// pipeline. Resuming from `Idle` yields the whole pipeline.
    pub fn remaining(&self) -> &'static [ScanStage] {
        match self.position() {
            Some(idx) => &Self::RUN_ORDER[idx..],
            None => {
                if *self == ScanStage::Idle {
                    Self::RUN_ORDER
                } else {
                    &[]
                }
            }
        }
    }
}

impl std::fmt::Display for ScanStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ScanStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let all = [
            ScanStage::Idle,
            ScanStage::Completed,
        ];
        all.iter()
            .chain(Self::RUN_ORDER.iter())
            .find(|stage| stage.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown scan stage: {s}"))
    }
}
