// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Tool Result Decoders
 * Normalizes each tool's result encoding into a canonical string set
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

use crate::types::Tool;

/// Hostnames embedded in free-text tool output (gospider, subdomainizer)
static HOSTNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b((?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,})\b")
        .expect("hostname regex must compile")
});

/// Decodes one tool's raw result payload into a normalized, lowercased,
/// deduplicated set of items. Keyed by tool so the consolidation engine
/// stays encoding-agnostic.
pub trait Decoder: Send + Sync {
    fn decode(&self, raw: &str) -> HashSet<String>;
}

/// One item per non-empty line (amass, sublist3r, assetfinder, ctl,
/// subfinder, shuffledns, cloud_enum, manual entries)
pub struct PlainLines;

impl Decoder for PlainLines {
    fn decode(&self, raw: &str) -> HashSet<String> {
        raw.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_ascii_lowercase)
            .collect()
    }
}

/// Newline-delimited JSON objects carrying a `url` field; only the
/// hostname is kept (gau)
pub struct JsonUrlLines;

impl Decoder for JsonUrlLines {
    fn decode(&self, raw: &str) -> HashSet<String> {
        let mut items = HashSet::new();
        for (i, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let parsed: serde_json::Value = match serde_json::from_str(line) {
                Ok(value) => value,
                Err(err) => {
                    debug!("Skipping unparsable JSON line {}: {}", i, err);
                    continue;
                }
            };
            let Some(raw_url) = parsed.get("url").and_then(|u| u.as_str()) else {
                continue;
            };
            match url::Url::parse(raw_url) {
                Ok(url) => {
                    if let Some(host) = url.host_str() {
                        items.insert(host.to_ascii_lowercase());
                    }
                }
                Err(err) => debug!("Skipping unparsable URL {}: {}", raw_url, err),
            }
        }
        items
    }
}

/// Free-text output scanned for embedded hostnames (gospider,
/// subdomainizer)
pub struct EmbeddedHostnames;

impl Decoder for EmbeddedHostnames {
    fn decode(&self, raw: &str) -> HashSet<String> {
        HOSTNAME_RE
            .find_iter(raw)
            .map(|m| m.as_str().to_ascii_lowercase())
            .collect()
    }
}

/// A JSON object with a named array of strings, e.g. `{"domains": [...]}`
/// (securitytrails, censys, github_recon, shodan, amass_intel)
pub struct JsonArrayField(pub &'static str);

impl Decoder for JsonArrayField {
    fn decode(&self, raw: &str) -> HashSet<String> {
        let parsed: serde_json::Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(err) => {
                debug!("Skipping unparsable JSON payload: {}", err);
                return HashSet::new();
            }
        };
        parsed
            .get(self.0)
            .and_then(|field| field.as_array())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| entry.as_str())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_ascii_lowercase)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// One CIDR block per line, invalid blocks dropped (metabigor)
pub struct CidrLines;

impl Decoder for CidrLines {
    fn decode(&self, raw: &str) -> HashSet<String> {
        raw.lines()
            .map(str::trim)
            .filter(|line| is_valid_cidr(line))
            .map(str::to_ascii_lowercase)
            .collect()
    }
}

/// Validates `address/prefix` notation for IPv4 and IPv6 blocks
pub fn is_valid_cidr(candidate: &str) -> bool {
    let Some((addr, prefix)) = candidate.split_once('/') else {
        return false;
    };
    let Ok(prefix) = prefix.parse::<u8>() else {
        return false;
    };
    match addr.parse::<std::net::IpAddr>() {
        Ok(std::net::IpAddr::V4(_)) => prefix <= 32,
        Ok(std::net::IpAddr::V6(_)) => prefix <= 128,
        Err(_) => false,
    }
}

static PLAIN_LINES: PlainLines = PlainLines;
static JSON_URL_LINES: JsonUrlLines = JsonUrlLines;
static EMBEDDED_HOSTNAMES: EmbeddedHostnames = EmbeddedHostnames;
static DOMAINS_ARRAY: JsonArrayField = JsonArrayField("domains");
static NETWORK_RANGES_ARRAY: JsonArrayField = JsonArrayField("network_ranges");
static CIDR_LINES: CidrLines = CidrLines;

/// Decoder registered for a tool's result encoding
pub fn decoder_for(tool: Tool) -> &'static dyn Decoder {
    match tool {
        Tool::Gau => &JSON_URL_LINES,
        Tool::Gospider | Tool::Subdomainizer => &EMBEDDED_HOSTNAMES,
        Tool::Securitytrails | Tool::Censys | Tool::GithubRecon | Tool::Shodan => &DOMAINS_ARRAY,
        Tool::AmassIntel => &NETWORK_RANGES_ARRAY,
        Tool::Metabigor => &CIDR_LINES,
        _ => &PLAIN_LINES,
    }
}
