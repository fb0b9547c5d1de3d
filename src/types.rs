// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What kind of entity a scope target names
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Company,
    Wildcard,
    Url,
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetKind::Company => write!(f, "company"),
            TargetKind::Wildcard => write!(f, "wildcard"),
            TargetKind::Url => write!(f, "url"),
        }
    }
}

/// The entity being reconnoitered. Created and activated by the surrounding
/// UI; read-only to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeTarget {
    pub id: String,
    pub kind: TargetKind,
    pub value: String,
    pub active: bool,
}

impl ScopeTarget {
    /// Base domain of a wildcard target, with the leading `*.` stripped.
    /// Consolidated hostnames are scoped to this suffix.
    pub fn base_domain(&self) -> Option<String> {
        match self.kind {
            TargetKind::Wildcard => Some(
                self.value
                    .trim_start_matches("*.")
                    .trim()
                    .to_ascii_lowercase(),
            ),
            _ => None,
        }
    }
}

/// Every external tool the engine can drive, pipeline stages and
/// consolidation-only sources alike
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    // Subdomain discovery family
    Amass,
    Sublist3r,
    Assetfinder,
    Gau,
    Ctl,
    Subfinder,
    Shuffledns,
    Cewl,
    ShufflednsCewl,
    Gospider,
    Subdomainizer,
    // Probing and enrichment
    Httpx,
    NucleiScreenshot,
    Metadata,
    // Company root-domain discovery
    CtlCompany,
    Securitytrails,
    Censys,
    GithubRecon,
    Shodan,
    GoogleDorking,
    ReverseWhois,
    // Network-range discovery
    AmassIntel,
    Metabigor,
    // Cloud asset discovery
    CloudEnum,
}

impl Tool {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Amass => "amass",
            Tool::Sublist3r => "sublist3r",
            Tool::Assetfinder => "assetfinder",
            Tool::Gau => "gau",
            Tool::Ctl => "ctl",
            Tool::Subfinder => "subfinder",
            Tool::Shuffledns => "shuffledns",
            Tool::Cewl => "cewl",
            Tool::ShufflednsCewl => "shuffledns_cewl",
            Tool::Gospider => "gospider",
            Tool::Subdomainizer => "subdomainizer",
            Tool::Httpx => "httpx",
            Tool::NucleiScreenshot => "nuclei_screenshot",
            Tool::Metadata => "metadata",
            Tool::CtlCompany => "ctl_company",
            Tool::Securitytrails => "securitytrails",
            Tool::Censys => "censys",
            Tool::GithubRecon => "github_recon",
            Tool::Shodan => "shodan",
            Tool::GoogleDorking => "google_dorking",
            Tool::ReverseWhois => "reverse_whois",
            Tool::AmassIntel => "amass_intel",
            Tool::Metabigor => "metabigor",
            Tool::CloudEnum => "cloud_enum",
        }
    }

    /// Tools whose output feeds the consolidated subdomain set
    pub const SUBDOMAIN_FAMILY: &'static [Tool] = &[
        Tool::Amass,
        Tool::Sublist3r,
        Tool::Assetfinder,
        Tool::Gau,
        Tool::Ctl,
        Tool::Subfinder,
        Tool::Shuffledns,
        Tool::ShufflednsCewl,
        Tool::Gospider,
        Tool::Subdomainizer,
    ];

    /// Tools whose output feeds the consolidated company root-domain set
    pub const COMPANY_DOMAIN_FAMILY: &'static [Tool] = &[
        Tool::GoogleDorking,
        Tool::ReverseWhois,
        Tool::CtlCompany,
        Tool::Securitytrails,
        Tool::Censys,
        Tool::GithubRecon,
        Tool::Shodan,
    ];

    /// Tools whose output feeds the consolidated network-range set
    pub const NETWORK_RANGE_FAMILY: &'static [Tool] = &[Tool::AmassIntel, Tool::Metabigor];
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ALL: &[Tool] = &[
            Tool::Amass,
            Tool::Sublist3r,
            Tool::Assetfinder,
            Tool::Gau,
            Tool::Ctl,
            Tool::Subfinder,
            Tool::Shuffledns,
            Tool::Cewl,
            Tool::ShufflednsCewl,
            Tool::Gospider,
            Tool::Subdomainizer,
            Tool::Httpx,
            Tool::NucleiScreenshot,
            Tool::Metadata,
            Tool::CtlCompany,
            Tool::Securitytrails,
            Tool::Censys,
            Tool::GithubRecon,
            Tool::Shodan,
            Tool::GoogleDorking,
            Tool::ReverseWhois,
            Tool::AmassIntel,
            Tool::Metabigor,
            Tool::CloudEnum,
        ];
        ALL.iter()
            .find(|tool| tool.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown tool: {s}"))
    }
}

/// Lifecycle of one tool invocation. Mutated only by the tool's backend
/// service; the engine observes, never writes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Failed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Success | JobStatus::Failed | JobStatus::Error
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Success => write!(f, "success"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            // Transient ingest state some tool backends report while
            // persisting large results; non-terminal, keep polling
            "running" | "processing" => Ok(JobStatus::Running),
            "success" | "completed" => Ok(JobStatus::Success),
            "failed" => Ok(JobStatus::Failed),
            "error" => Ok(JobStatus::Error),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// One row per invocation of one tool against one target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanJob {
    pub scan_id: String,
    pub tool: Tool,
    pub scope_target_id: String,
    pub status: JobStatus,
    /// Raw result payload in the tool's own encoding; decoded downstream
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub execution_time_secs: Option<f64>,
    pub created_at: DateTime<Utc>,
    /// Session that launched this job, when launched by the auto-scan
    #[serde(default)]
    pub auto_scan_session_id: Option<String>,
}

/// Lifecycle of one auto-scan session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Paused,
    Cancelled,
    Completed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Running => write!(f, "running"),
            SessionStatus::Paused => write!(f, "paused"),
            SessionStatus::Cancelled => write!(f, "cancelled"),
            SessionStatus::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(SessionStatus::Running),
            "paused" => Ok(SessionStatus::Paused),
            "cancelled" => Ok(SessionStatus::Cancelled),
            "completed" => Ok(SessionStatus::Completed),
            other => Err(format!("unknown session status: {other}")),
        }
    }
}

/// One end-to-end run of the pipeline against one target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoScanSession {
    pub id: String,
    pub scope_target_id: String,
    pub status: SessionStatus,
    pub config_snapshot: AutoScanConfig,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub final_consolidated_subdomains: Option<u64>,
    #[serde(default)]
    pub final_live_web_servers: Option<u64>,
}

/// Per-target auto-scan cursor and control flags, persisted so a run
/// survives a full process restart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub scope_target_id: String,
    pub current_stage: crate::stages::ScanStage,
    pub is_paused: bool,
    pub is_cancelled: bool,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Flat map of stage toggles plus run limits. The same value is the
/// runtime config and the stored session snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutoScanConfig {
    pub amass: bool,
    pub sublist3r: bool,
    pub assetfinder: bool,
    pub gau: bool,
    pub ctl: bool,
    pub subfinder: bool,
    pub consolidate_httpx_round1: bool,
    pub shuffledns: bool,
    pub cewl: bool,
    pub consolidate_httpx_round2: bool,
    pub gospider: bool,
    pub subdomainizer: bool,
    pub consolidate_httpx_round3: bool,
    pub nuclei_screenshot: bool,
    pub metadata: bool,
    #[serde(default = "default_max_consolidated_subdomains")]
    pub max_consolidated_subdomains: u64,
    #[serde(default = "default_max_live_web_servers")]
    pub max_live_web_servers: u64,
}

fn default_max_consolidated_subdomains() -> u64 {
    2500
}

fn default_max_live_web_servers() -> u64 {
    500
}

impl Default for AutoScanConfig {
    fn default() -> Self {
        Self {
            amass: true,
            sublist3r: true,
            assetfinder: true,
            gau: true,
            ctl: true,
            subfinder: true,
            consolidate_httpx_round1: true,
            shuffledns: true,
            cewl: true,
            consolidate_httpx_round2: true,
            gospider: true,
            subdomainizer: true,
            consolidate_httpx_round3: true,
            nuclei_screenshot: true,
            metadata: true,
            max_consolidated_subdomains: default_max_consolidated_subdomains(),
            max_live_web_servers: default_max_live_web_servers(),
        }
    }
}

impl AutoScanConfig {
    /// Toggle value for a stage's config key. System stages (idle,
    /// completed) are always enabled.
    pub fn enabled(&self, stage: crate::stages::ScanStage) -> bool {
        match stage.config_key() {
            Some("amass") => self.amass,
            Some("sublist3r") => self.sublist3r,
            Some("assetfinder") => self.assetfinder,
            Some("gau") => self.gau,
            Some("ctl") => self.ctl,
            Some("subfinder") => self.subfinder,
            Some("consolidate_httpx_round1") => self.consolidate_httpx_round1,
            Some("shuffledns") => self.shuffledns,
            Some("cewl") => self.cewl,
            Some("consolidate_httpx_round2") => self.consolidate_httpx_round2,
            Some("gospider") => self.gospider,
            Some("subdomainizer") => self.subdomainizer,
            Some("consolidate_httpx_round3") => self.consolidate_httpx_round3,
            Some("nuclei_screenshot") => self.nuclei_screenshot,
            Some("metadata") => self.metadata,
            _ => true,
        }
    }

    /// True when no runnable stage is enabled
    pub fn is_empty(&self) -> bool {
        crate::stages::ScanStage::RUN_ORDER
            .iter()
            .all(|s| !self.enabled(*s))
    }
}

/// Named per-target consolidated collection kinds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConsolidatedKind {
    Subdomains,
    CompanyDomains,
    NetworkRanges,
}

impl ConsolidatedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsolidatedKind::Subdomains => "subdomains",
            ConsolidatedKind::CompanyDomains => "company_domains",
            ConsolidatedKind::NetworkRanges => "network_ranges",
        }
    }
}

impl std::fmt::Display for ConsolidatedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A canonical deduplicated set, replaced wholesale at every gate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatedSet {
    pub kind: ConsolidatedKind,
    pub items: Vec<String>,
    pub count: u64,
}

impl ConsolidatedSet {
    pub fn new(kind: ConsolidatedKind, items: Vec<String>) -> Self {
        let count = items.len() as u64;
        Self { kind, items, count }
    }

    pub fn empty(kind: ConsolidatedKind) -> Self {
        Self::new(kind, Vec::new())
    }
}

/// Summary counts of the six attack-surface asset classes
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttackSurfaceCounts {
    pub asns: u64,
    pub network_ranges: u64,
    pub ip_addresses: u64,
    pub fqdns: u64,
    pub cloud_assets: u64,
    pub live_web_servers: u64,
}

/// Per-discovered-web-endpoint metadata, created by the live-web-server
/// probe and enriched by later stages. Never deleted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointRecord {
    pub id: String,
    pub scope_target_id: String,
    pub url: String,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub has_deprecated_tls: bool,
    #[serde(default)]
    pub has_expired_ssl: bool,
    #[serde(default)]
    pub has_mismatched_ssl: bool,
    #[serde(default)]
    pub has_revoked_ssl: bool,
    #[serde(default)]
    pub has_self_signed_ssl: bool,
    #[serde(default)]
    pub has_untrusted_root_ssl: bool,
    /// Crawler output; array, JSON string, or newline text
    #[serde(default)]
    pub katana_results: Option<serde_json::Value>,
    /// Fuzzer output; object with an `endpoints` array, JSON string, or
    /// newline text
    #[serde(default)]
    pub ffuf_results: Option<serde_json::Value>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub http_response_headers: Option<serde_json::Value>,
    #[serde(default)]
    pub screenshot: Option<String>,
    #[serde(default)]
    pub roi_score: u32,
    pub created_at: DateTime<Utc>,
}

impl EndpointRecord {
    /// A bare endpoint as the probe stage first records it
    pub fn new(scope_target_id: &str, url: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            scope_target_id: scope_target_id.to_string(),
            url: url.to_string(),
            status_code: None,
            has_deprecated_tls: false,
            has_expired_ssl: false,
            has_mismatched_ssl: false,
            has_revoked_ssl: false,
            has_self_signed_ssl: false,
            has_untrusted_root_ssl: false,
            katana_results: None,
            ffuf_results: None,
            technologies: Vec::new(),
            http_response_headers: None,
            screenshot: None,
            roi_score: 0,
            created_at: Utc::now(),
        }
    }

    /// Response headers as a map, tolerating the JSON-string encoding some
    /// probes persist
    pub fn headers_map(&self) -> HashMap<String, serde_json::Value> {
        match &self.http_response_headers {
            Some(serde_json::Value::Object(map)) => {
                map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
            }
            Some(serde_json::Value::String(raw)) => serde_json::from_str::<
                HashMap<String, serde_json::Value>,
            >(raw)
            .unwrap_or_default(),
            _ => HashMap::new(),
        }
    }
}

/// Final session metrics recorded at pipeline end
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FinalStats {
    pub final_consolidated_subdomains: u64,
    pub final_live_web_servers: u64,
}
