// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Tool Submit/Poll Contract
 * Uniform interface to the external per-tool scanning services
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::{EngineError, ReconResult, ToolError};
use crate::types::{ScanJob, ScopeTarget, Tool};

/// One submit/poll pair per tool backend. Submission starts exactly one
/// tool run against one target and returns an opaque scan id; the job row
/// is then mutated only by the tool's own service.
#[async_trait]
pub trait ToolService: Send + Sync {
    async fn submit(
        &self,
        tool: Tool,
        target: &ScopeTarget,
        params: serde_json::Value,
    ) -> ReconResult<String>;

    async fn status(&self, tool: Tool, scan_id: &str) -> ReconResult<ScanJob>;
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    scan_id: String,
}

/// HTTP binding for tool backends exposing the shared REST surface:
/// `POST {base}/api/{tool}/run` and `GET {base}/api/{tool}/scans/{id}`.
pub struct HttpToolService {
    base_url: String,
    client: reqwest::Client,
}

impl HttpToolService {
    pub fn new(base_url: &str, timeout: Duration) -> ReconResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::General(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl ToolService for HttpToolService {
    async fn submit(
        &self,
        tool: Tool,
        target: &ScopeTarget,
        params: serde_json::Value,
    ) -> ReconResult<String> {
        let url = format!("{}/api/{}/run", self.base_url, tool.as_str());
        let body = serde_json::json!({
            "scope_target_id": target.id,
            "target": target.value,
            "params": params,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::SubmitFailed {
                tool,
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ToolError::SubmitFailed {
                tool,
                reason: format!("HTTP {}", response.status()),
            }
            .into());
        }

        let submitted: SubmitResponse =
            response.json().await.map_err(|e| ToolError::SubmitFailed {
                tool,
                reason: format!("malformed submit response: {e}"),
            })?;
        Ok(submitted.scan_id)
    }

    async fn status(&self, tool: Tool, scan_id: &str) -> ReconResult<ScanJob> {
        let url = format!(
            "{}/api/{}/scans/{}",
            self.base_url,
            tool.as_str(),
            scan_id
        );

        let response =
            self.client
                .get(&url)
                .send()
                .await
                .map_err(|e| ToolError::StatusUnavailable {
                    scan_id: scan_id.to_string(),
                    reason: e.to_string(),
                })?;

        if !response.status().is_success() {
            return Err(ToolError::StatusUnavailable {
                scan_id: scan_id.to_string(),
                reason: format!("HTTP {}", response.status()),
            }
            .into());
        }

        let job: ScanJob = response.json().await.map_err(|e| ToolError::StatusUnavailable {
            scan_id: scan_id.to_string(),
            reason: format!("malformed job row: {e}"),
        })?;
        Ok(job)
    }
}
