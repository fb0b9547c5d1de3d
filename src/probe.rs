// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Live Web Server Probe Results
 * Parses httpx output into endpoint entries
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde_json::Value;
use tracing::debug;

use crate::types::EndpointRecord;

/// One live web server reported by the probe
#[derive(Debug, Clone)]
pub struct ProbeEntry {
    pub url: String,
    pub status_code: Option<u16>,
    pub technologies: Vec<String>,
    pub ip: Option<String>,
    pub headers: Option<Value>,
}

/// Parse probe output: newline-delimited JSON objects, falling back to
/// plain URL lines for minimal probe configurations.
pub fn parse_probe_output(raw: &str) -> Vec<ProbeEntry> {
    let mut entries = Vec::new();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('{') {
            match serde_json::from_str::<Value>(line) {
                Ok(value) => {
                    if let Some(entry) = entry_from_json(&value) {
                        entries.push(entry);
                    }
                }
                Err(err) => debug!("Skipping unparsable probe line: {}", err),
            }
        } else {
            entries.push(ProbeEntry {
                url: line.to_string(),
                status_code: None,
                technologies: Vec::new(),
                ip: None,
                headers: None,
            });
        }
    }
    entries
}

fn entry_from_json(value: &Value) -> Option<ProbeEntry> {
    let url = value.get("url").and_then(Value::as_str)?.to_string();

    let status_code = value
        .get("status_code")
        .or_else(|| value.get("status-code"))
        .and_then(Value::as_u64)
        .map(|code| code as u16);

    let technologies = value
        .get("tech")
        .or_else(|| value.get("technologies"))
        .and_then(Value::as_array)
        .map(|techs| {
            techs
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let ip = value
        .get("ip")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            value
                .get("a")
                .and_then(Value::as_array)
                .and_then(|records| records.first())
                .and_then(Value::as_str)
                .map(str::to_string)
        });

    let headers = value
        .get("header")
        .or_else(|| value.get("headers"))
        .cloned();

    Some(ProbeEntry {
        url,
        status_code,
        technologies,
        ip,
        headers,
    })
}

impl ProbeEntry {
    /// Endpoint record as the probe stage first persists it
    pub fn into_endpoint(self, target_id: &str) -> EndpointRecord {
        let mut endpoint = EndpointRecord::new(target_id, &self.url);
        endpoint.status_code = self.status_code;
        endpoint.technologies = self.technologies;
        endpoint.http_response_headers = self.headers;
        endpoint
    }
}
