// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Consolidation Engine
 * Deduplicated unions of tool output into canonical per-target sets
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::decode::{decoder_for, is_valid_cidr, JsonArrayField, Decoder};
use crate::errors::{EngineError, ReconResult};
use crate::probe::parse_probe_output;
use crate::store::ScanStore;
use crate::types::{
    AttackSurfaceCounts, ConsolidatedKind, ConsolidatedSet, ScopeTarget, Tool,
};

/// Recomputes canonical sets wholesale from the full history of relevant
/// scan results. Idempotent and order-independent: a set union, not an
/// append log. The engine is the sole writer of consolidated sets.
pub struct ConsolidationEngine {
    scans: Arc<dyn ScanStore>,
}

impl ConsolidationEngine {
    pub fn new(scans: Arc<dyn ScanStore>) -> Self {
        Self { scans }
    }

    /// Union the most recent successful result of every subdomain-discovery
    /// tool, scoped to the target's base domain, and persist the sorted set.
    pub async fn consolidate_subdomains(
        &self,
        target: &ScopeTarget,
    ) -> ReconResult<ConsolidatedSet> {
        let base_domain = target.base_domain().ok_or_else(|| {
            EngineError::Configuration(
                "subdomain consolidation requires a wildcard target".to_string(),
            )
        })?;
        info!(
            "Starting subdomain consolidation for {} (base domain {})",
            target.id, base_domain
        );

        let mut unique: BTreeSet<String> = BTreeSet::new();
        for tool in Tool::SUBDOMAIN_FAMILY {
            let added = self
                .collect_tool(&target.id, *tool, &mut unique, |host| {
                    in_scope(host, &base_domain)
                })
                .await;
            info!("Found {} new unique subdomains from {}", added, tool);
        }

        let items: Vec<String> = unique.into_iter().collect();
        info!("Total unique subdomains found: {}", items.len());
        self.scans
            .replace_consolidated(&target.id, ConsolidatedKind::Subdomains, items)
            .await
    }

    /// Union the company root-domain sources (manual entries included) into
    /// the canonical root-domain set.
    pub async fn consolidate_company_domains(
        &self,
        target: &ScopeTarget,
    ) -> ReconResult<ConsolidatedSet> {
        info!("Starting company domain consolidation for {}", target.id);

        let mut unique: BTreeSet<String> = BTreeSet::new();
        for tool in Tool::COMPANY_DOMAIN_FAMILY {
            let added = self
                .collect_tool(&target.id, *tool, &mut unique, |domain| {
                    // Root-domain sets carry hostnames, never bare addresses
                    domain.contains('.') && domain.parse::<std::net::IpAddr>().is_err()
                })
                .await;
            info!("Found {} new unique company domains from {}", added, tool);
        }

        let items: Vec<String> = unique.into_iter().collect();
        info!("Total unique company domains found: {}", items.len());
        self.scans
            .replace_consolidated(&target.id, ConsolidatedKind::CompanyDomains, items)
            .await
    }

    /// Union the network-range sources into the canonical CIDR set
    pub async fn consolidate_network_ranges(
        &self,
        target: &ScopeTarget,
    ) -> ReconResult<ConsolidatedSet> {
        info!("Starting network range consolidation for {}", target.id);

        let mut unique: BTreeSet<String> = BTreeSet::new();
        for tool in Tool::NETWORK_RANGE_FAMILY {
            let added = self
                .collect_tool(&target.id, *tool, &mut unique, |range| is_valid_cidr(range))
                .await;
            info!("Found {} new unique network ranges from {}", added, tool);
        }

        let items: Vec<String> = unique.into_iter().collect();
        info!("Total unique network ranges found: {}", items.len());
        self.scans
            .replace_consolidated(&target.id, ConsolidatedKind::NetworkRanges, items)
            .await
    }

    /// Recompute one canonical set by kind
    pub async fn recompute(
        &self,
        target: &ScopeTarget,
        kind: ConsolidatedKind,
    ) -> ReconResult<ConsolidatedSet> {
        match kind {
            ConsolidatedKind::Subdomains => self.consolidate_subdomains(target).await,
            ConsolidatedKind::CompanyDomains => self.consolidate_company_domains(target).await,
            ConsolidatedKind::NetworkRanges => self.consolidate_network_ranges(target).await,
        }
    }

    /// Aggregate the six attack-surface asset classes into summary counts.
    /// A read-aggregate over the other consolidated sets and persisted scan
    /// outputs, not a merge of raw tool output.
    pub async fn consolidate_attack_surface(
        &self,
        target: &ScopeTarget,
    ) -> ReconResult<AttackSurfaceCounts> {
        let subdomains = self
            .scans
            .get_consolidated(&target.id, ConsolidatedKind::Subdomains)
            .await?;
        let company_domains = self
            .scans
            .get_consolidated(&target.id, ConsolidatedKind::CompanyDomains)
            .await?;
        let network_ranges = self
            .scans
            .get_consolidated(&target.id, ConsolidatedKind::NetworkRanges)
            .await?;

        let mut fqdns: BTreeSet<String> = BTreeSet::new();
        fqdns.extend(subdomains.items.iter().cloned());
        fqdns.extend(company_domains.items.iter().cloned());

        let asns = match self
            .scans
            .latest_successful_result(&target.id, Tool::AmassIntel)
            .await
        {
            Ok(Some(raw)) => JsonArrayField("asns").decode(&raw).len() as u64,
            Ok(None) => 0,
            Err(err) => {
                warn!("Skipping ASN aggregation: {}", err);
                0
            }
        };

        let cloud_assets = match self
            .scans
            .latest_successful_result(&target.id, Tool::CloudEnum)
            .await
        {
            Ok(Some(raw)) => decoder_for(Tool::CloudEnum).decode(&raw).len() as u64,
            Ok(None) => 0,
            Err(err) => {
                warn!("Skipping cloud asset aggregation: {}", err);
                0
            }
        };

        let (ip_addresses, live_web_servers) = match self
            .scans
            .latest_successful_result(&target.id, Tool::Httpx)
            .await
        {
            Ok(Some(raw)) => {
                let entries = parse_probe_output(&raw);
                let ips: BTreeSet<&str> = entries
                    .iter()
                    .filter_map(|entry| entry.ip.as_deref())
                    .collect();
                (ips.len() as u64, entries.len() as u64)
            }
            Ok(None) => (0, 0),
            Err(err) => {
                warn!("Skipping live web server aggregation: {}", err);
                (0, 0)
            }
        };

        let counts = AttackSurfaceCounts {
            asns,
            network_ranges: network_ranges.count,
            ip_addresses,
            fqdns: fqdns.len() as u64,
            cloud_assets,
            live_web_servers,
        };
        info!(
            "Attack surface for {}: {} ASNs, {} ranges, {} IPs, {} FQDNs, {} cloud assets, {} live servers",
            target.id,
            counts.asns,
            counts.network_ranges,
            counts.ip_addresses,
            counts.fqdns,
            counts.cloud_assets,
            counts.live_web_servers
        );
        Ok(counts)
    }

    /// Decode one tool's latest successful result into the accumulator.
    /// A missing, failed, or malformed contribution is skipped; it never
    /// aborts the gate.
    async fn collect_tool<F>(
        &self,
        target_id: &str,
        tool: Tool,
        unique: &mut BTreeSet<String>,
        keep: F,
    ) -> usize
    where
        F: Fn(&str) -> bool,
    {
        let raw = match self.scans.latest_successful_result(target_id, tool).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No results found for {}", tool);
                return 0;
            }
            Err(err) => {
                warn!("Skipping {} contribution: {}", tool, err);
                return 0;
            }
        };

        let decoded = decoder_for(tool).decode(&raw);
        let mut added = 0;
        for item in decoded {
            if keep(&item) && unique.insert(item) {
                added += 1;
            }
        }
        added
    }
}

/// Hostname scoping against the wildcard base domain
fn in_scope(host: &str, base_domain: &str) -> bool {
    host == base_domain || host.ends_with(&format!(".{base_domain}"))
}
