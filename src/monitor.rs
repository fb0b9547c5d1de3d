// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Job Monitor
 * Polls submitted tool jobs to a terminal status with an attempt ceiling
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::errors::{EngineError, ReconResult};
use crate::store::ScanStore;
use crate::tools::ToolService;
use crate::types::{ScanJob, Tool};

/// Polling behavior for one job monitor
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Delay between status polls
    pub poll_interval: Duration,

    /// Maximum poll attempts before the job is treated as timed out
    pub max_attempts: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_attempts: 600,
        }
    }
}

impl MonitorConfig {
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// Polls one submitted job until it reaches a terminal status or the
/// attempt ceiling. Observes jobs, never mutates them; every observed
/// snapshot is recorded so a later resume can re-attach.
pub struct JobMonitor {
    tools: Arc<dyn ToolService>,
    scans: Arc<dyn ScanStore>,
    config: MonitorConfig,
}

impl JobMonitor {
    pub fn new(
        tools: Arc<dyn ToolService>,
        scans: Arc<dyn ScanStore>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            tools,
            scans,
            config,
        }
    }

    /// Poll a job by scan id until terminal. Transient status-fetch
    /// failures keep polling; the ceiling maps to a stage failure upstream.
    pub async fn wait(&self, tool: Tool, scan_id: &str) -> ReconResult<ScanJob> {
        let mut attempts = 0;
        loop {
            attempts += 1;

            match self.tools.status(tool, scan_id).await {
                Ok(job) => {
                    if let Err(err) = self.scans.record_job(&job).await {
                        warn!(tool = %tool, scan_id, error = %err, "Failed to record job snapshot");
                    }
                    if job.status.is_terminal() {
                        debug!(
                            tool = %tool,
                            scan_id,
                            status = %job.status,
                            attempts,
                            "Job reached terminal status"
                        );
                        return Ok(job);
                    }
                    debug!(tool = %tool, scan_id, status = %job.status, attempts, "Job still in flight");
                }
                Err(err) => {
                    warn!(tool = %tool, scan_id, attempts, error = %err, "Status poll failed");
                }
            }

            if attempts >= self.config.max_attempts {
                return Err(EngineError::MonitorTimeout { tool, attempts });
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Poll until the most recent job for a tool exists and reaches a
    /// terminal status. Used to re-attach after a restart and to follow
    /// runs a prior stage triggered (CeWL's custom ShuffleDNS run).
    pub async fn wait_latest(&self, target_id: &str, tool: Tool) -> ReconResult<ScanJob> {
        let mut attempts = 0;
        loop {
            attempts += 1;

            match self.scans.latest_job(target_id, tool).await {
                Ok(Some(job)) if job.status.is_terminal() => {
                    debug!(tool = %tool, scan_id = %job.scan_id, status = %job.status, "Latest job terminal");
                    return Ok(job);
                }
                Ok(Some(job)) => match self.tools.status(tool, &job.scan_id).await {
                    Ok(fresh) => {
                        if let Err(err) = self.scans.record_job(&fresh).await {
                            warn!(tool = %tool, error = %err, "Failed to record job snapshot");
                        }
                        if fresh.status.is_terminal() {
                            return Ok(fresh);
                        }
                        debug!(tool = %tool, scan_id = %fresh.scan_id, status = %fresh.status, "Job still in flight");
                    }
                    Err(err) => {
                        warn!(tool = %tool, scan_id = %job.scan_id, error = %err, "Status poll failed");
                    }
                },
                Ok(None) => {
                    debug!(tool = %tool, target_id, attempts, "No job recorded yet");
                }
                Err(err) => {
                    warn!(tool = %tool, target_id, error = %err, "Latest-job lookup failed");
                }
            }

            if attempts >= self.config.max_attempts {
                return Err(EngineError::MonitorTimeout { tool, attempts });
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}
