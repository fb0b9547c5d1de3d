// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Auto-Scan State Machine
 * Resumable pipeline orchestration over the external scanning tools
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::consolidate::ConsolidationEngine;
use crate::errors::{EngineError, ReconResult};
use crate::monitor::JobMonitor;
use crate::probe::parse_probe_output;
use crate::roi;
use crate::stages::ScanStage;
use crate::store::{EndpointStore, ScanStore, SessionStore};
use crate::tools::ToolService;
use crate::types::{
    AutoScanConfig, ConsolidatedKind, EndpointRecord, FinalStats, JobStatus, ScanJob,
    ScopeTarget, SessionStatus, TargetKind, Tool,
};

/// Everything one run carries between stages: the session, the config
/// snapshot it was started with, and the stage cursor. Owned by the
/// orchestrator and passed explicitly.
#[derive(Debug, Clone)]
pub struct RunState {
    pub session_id: String,
    pub target: ScopeTarget,
    pub config: AutoScanConfig,
    pub stage: ScanStage,
    /// Resume path: re-attach to an in-flight job for the first stage
    /// instead of resubmitting it
    pub reattach_first: bool,
}

enum StageOutcome {
    Continue,
    LimitReached(String),
}

enum Control {
    Proceed,
    Cancelled,
}

/// The orchestrator. Sequences the stage list strictly in order, invokes
/// the submit/poll contract, runs consolidation gates, and keeps enough
/// state persisted that a new process can resume the run mid-pipeline.
pub struct AutoScanEngine {
    tools: Arc<dyn ToolService>,
    sessions: Arc<dyn SessionStore>,
    scans: Arc<dyn ScanStore>,
    endpoints: Arc<dyn EndpointStore>,
    consolidator: ConsolidationEngine,
    monitor: JobMonitor,
    config: EngineConfig,
}

impl AutoScanEngine {
    pub fn new(
        tools: Arc<dyn ToolService>,
        sessions: Arc<dyn SessionStore>,
        scans: Arc<dyn ScanStore>,
        endpoints: Arc<dyn EndpointStore>,
        config: EngineConfig,
    ) -> Self {
        let consolidator = ConsolidationEngine::new(scans.clone());
        let monitor = JobMonitor::new(tools.clone(), scans.clone(), config.monitor.clone());
        Self {
            tools,
            sessions,
            scans,
            endpoints,
            consolidator,
            monitor,
            config,
        }
    }

    /// Create a session for a fresh run. Refused synchronously when the
    /// target or config cannot support a run; nothing is submitted on
    /// refusal.
    pub async fn start(
        &self,
        target: &ScopeTarget,
        config: AutoScanConfig,
    ) -> ReconResult<RunState> {
        if target.kind != TargetKind::Wildcard {
            return Err(EngineError::Configuration(format!(
                "auto scan requires a wildcard target, got {}",
                target.kind
            )));
        }
        if !target.active {
            return Err(EngineError::Configuration(format!(
                "target {} is not active",
                target.id
            )));
        }
        if config.is_empty() {
            return Err(EngineError::Configuration(
                "auto scan config has no enabled stages".to_string(),
            ));
        }
        if let Some(existing) = self.sessions.active_session(&target.id).await? {
            return Err(EngineError::SessionConflict {
                target_id: target.id.clone(),
                reason: format!("session {} is {}", existing.id, existing.status),
            });
        }

        let session_id = self.sessions.start_session(&target.id, &config).await?;
        info!(
            "Auto scan session {} started for {} ({})",
            session_id, target.value, target.id
        );

        Ok(RunState {
            session_id,
            target: target.clone(),
            config,
            stage: ScanStage::Idle,
            reattach_first: false,
        })
    }

    /// Re-enter the stage list at the persisted cursor. The config is the
    /// session's snapshot, never re-read from live settings.
    pub async fn resume(
        &self,
        target: &ScopeTarget,
        from_stage: ScanStage,
    ) -> ReconResult<RunState> {
        let session = self
            .sessions
            .active_session(&target.id)
            .await?
            .ok_or_else(|| {
                EngineError::Configuration(format!(
                    "no running or paused session to resume for target {}",
                    target.id
                ))
            })?;

        info!(
            "Resuming auto scan session {} for {} from stage {}",
            session.id, target.value, from_stage
        );

        Ok(RunState {
            session_id: session.id,
            target: target.clone(),
            config: session.config_snapshot,
            stage: from_stage,
            reattach_first: true,
        })
    }

    /// Resumption protocol: on attaching to a target, pick up an
    /// interrupted run without operator action. Returns the run state to
    /// drive, or None when the target is idle.
    pub async fn attach(&self, target: &ScopeTarget) -> ReconResult<Option<RunState>> {
        let state = self.sessions.session_state(&target.id).await?;
        if matches!(state.current_stage, ScanStage::Idle | ScanStage::Completed) {
            return Ok(None);
        }
        if self.sessions.active_session(&target.id).await?.is_none() {
            debug!(
                "Stale cursor {} for target {} with no active session",
                state.current_stage, target.id
            );
            return Ok(None);
        }
        info!(
            "Detected in-progress auto scan for {} at stage {}",
            target.id, state.current_stage
        );
        self.resume(target, state.current_stage).await.map(Some)
    }

    /// The in-flight stage finishes; the next stage is not submitted while
    /// paused.
    pub async fn pause(&self, target_id: &str) -> ReconResult<()> {
        info!("Pausing auto scan for target {}", target_id);
        self.sessions.set_paused(target_id, true).await
    }

    pub async fn unpause(&self, target_id: &str) -> ReconResult<()> {
        info!("Unpausing auto scan for target {}", target_id);
        self.sessions.set_paused(target_id, false).await
    }

    /// Cooperative: the orchestrator stops advancing once the current
    /// stage's job reaches a terminal state, then closes the session.
    pub async fn cancel(&self, target_id: &str) -> ReconResult<()> {
        info!("Cancelling auto scan for target {}", target_id);
        self.sessions.set_cancelled(target_id, true).await
    }

    /// Ranked endpoint report; scores are recomputed and persisted on
    /// every request.
    pub async fn report(&self, target_id: &str) -> ReconResult<Vec<EndpointRecord>> {
        roi::score_all(self.endpoints.as_ref(), target_id).await
    }

    /// Drive a run to its end: completion, cancellation, or a run limit.
    /// Stages execute strictly in list order; a failed stage is logged and
    /// the pipeline advances.
    pub async fn run(&self, state: RunState) -> ReconResult<()> {
        let mut reattach = state.reattach_first;

        for stage in state.stage.remaining() {
            if let Control::Cancelled = self.observe_control(&state).await {
                return self.finalize(&state, true).await;
            }

            if !state.config.enabled(*stage) {
                debug!("Stage {} is disabled in config, skipping", stage);
                reattach = false;
                continue;
            }

            if let Err(err) = self
                .sessions
                .set_current_stage(&state.target.id, *stage)
                .await
            {
                warn!("Failed to persist stage cursor {}: {}", stage, err);
            }

            info!("Stage {} starting", stage);
            match self.execute_stage(&state, *stage, reattach).await {
                Ok(StageOutcome::Continue) => {
                    info!("Stage {} finished", stage);
                }
                Ok(StageOutcome::LimitReached(reason)) => {
                    info!("Run limit reached at stage {}: {}", stage, reason);
                    break;
                }
                Err(err) => {
                    // Best-effort pipeline: partial results are still useful
                    warn!("Stage {} failed: {}; continuing with next stage", stage, err);
                }
            }
            reattach = false;

            if let Control::Cancelled = self.observe_control(&state).await {
                return self.finalize(&state, true).await;
            }
            tokio::time::sleep(self.config.stage_settle_delay).await;
        }

        self.finalize(&state, false).await
    }

    async fn execute_stage(
        &self,
        state: &RunState,
        stage: ScanStage,
        reattach: bool,
    ) -> ReconResult<StageOutcome> {
        if stage.is_gate() {
            let set = self.consolidator.consolidate_subdomains(&state.target).await?;
            if set.count > state.config.max_consolidated_subdomains {
                return Ok(StageOutcome::LimitReached(format!(
                    "{} consolidated subdomains exceed the {} limit",
                    set.count, state.config.max_consolidated_subdomains
                )));
            }
            return Ok(StageOutcome::Continue);
        }

        if stage.is_probe() {
            return self.execute_probe(state, reattach).await;
        }

        let tool = stage
            .tool()
            .ok_or_else(|| EngineError::General(format!("stage {stage} has no tool")))?;

        let job = self
            .run_tool_job(state, tool, json!({}), reattach)
            .await?;

        if stage == ScanStage::Cewl && job.status == JobStatus::Success {
            // The wordlist run triggers a custom ShuffleDNS resolution;
            // the stage is not done until that run is terminal too.
            let custom = self
                .monitor
                .wait_latest(&state.target.id, Tool::ShufflednsCewl)
                .await?;
            debug!(
                "CeWL-derived ShuffleDNS run {} ended {}",
                custom.scan_id, custom.status
            );
        }

        match stage {
            ScanStage::NucleiScreenshot => {
                if let (JobStatus::Success, Some(raw)) = (job.status, job.result.as_deref()) {
                    self.ingest_screenshots(state, raw).await?;
                }
            }
            ScanStage::Metadata => {
                if let (JobStatus::Success, Some(raw)) = (job.status, job.result.as_deref()) {
                    self.ingest_metadata(state, raw).await?;
                }
            }
            _ => {}
        }

        Ok(StageOutcome::Continue)
    }

    /// A probe consumes the latest consolidated subdomain set and records
    /// one endpoint per live server it reports.
    async fn execute_probe(&self, state: &RunState, reattach: bool) -> ReconResult<StageOutcome> {
        let set = self
            .scans
            .get_consolidated(&state.target.id, ConsolidatedKind::Subdomains)
            .await?;
        if set.items.is_empty() {
            warn!("No consolidated subdomains to probe for {}", state.target.id);
            return Ok(StageOutcome::Continue);
        }

        let params = json!({ "subdomains": set.items });
        let job = self.run_tool_job(state, Tool::Httpx, params, reattach).await?;

        if job.status != JobStatus::Success {
            return Ok(StageOutcome::Continue);
        }
        let Some(raw) = job.result.as_deref() else {
            return Ok(StageOutcome::Continue);
        };

        let entries = parse_probe_output(raw);
        let live = entries.len() as u64;
        for entry in entries {
            let endpoint = entry.into_endpoint(&state.target.id);
            if let Err(err) = self.endpoints.upsert_endpoint(&endpoint).await {
                warn!("Failed to record endpoint {}: {}", endpoint.url, err);
            }
        }
        info!("Probe recorded {} live web servers", live);

        if live > state.config.max_live_web_servers {
            return Ok(StageOutcome::LimitReached(format!(
                "{} live web servers exceed the {} limit",
                live, state.config.max_live_web_servers
            )));
        }
        Ok(StageOutcome::Continue)
    }

    /// Submit one tool job and wait for a terminal status. On resume, an
    /// in-flight job for the stage is re-attached, never duplicated.
    async fn run_tool_job(
        &self,
        state: &RunState,
        tool: Tool,
        mut params: serde_json::Value,
        reattach: bool,
    ) -> ReconResult<ScanJob> {
        if reattach {
            if let Some(job) = self.scans.latest_job(&state.target.id, tool).await? {
                if !job.status.is_terminal() {
                    info!(
                        "Re-attaching monitor to in-flight {} job {}",
                        tool, job.scan_id
                    );
                    return self.finish_job(tool, &job.scan_id).await;
                }
            }
        }

        if let Some(params_map) = params.as_object_mut() {
            params_map.insert(
                "auto_scan_session_id".to_string(),
                json!(state.session_id),
            );
        }

        let scan_id = self.tools.submit(tool, &state.target, params).await?;
        debug!("Submitted {} job {}", tool, scan_id);

        // Placeholder row so a restarted process can re-attach before the
        // first status poll lands
        let placeholder = ScanJob {
            scan_id: scan_id.clone(),
            tool,
            scope_target_id: state.target.id.clone(),
            status: JobStatus::Pending,
            result: None,
            error_message: None,
            execution_time_secs: None,
            created_at: Utc::now(),
            auto_scan_session_id: Some(state.session_id.clone()),
        };
        if let Err(err) = self.scans.record_job(&placeholder).await {
            warn!("Failed to record placeholder for {}: {}", scan_id, err);
        }

        self.finish_job(tool, &scan_id).await
    }

    async fn finish_job(&self, tool: Tool, scan_id: &str) -> ReconResult<ScanJob> {
        let job = self.monitor.wait(tool, scan_id).await?;
        if matches!(job.status, JobStatus::Failed | JobStatus::Error) {
            warn!(
                "{} job {} ended {}: {}",
                tool,
                scan_id,
                job.status,
                job.error_message.as_deref().unwrap_or("no error recorded")
            );
        }
        Ok(job)
    }

    /// Screenshot results: JSON lines of `{url, screenshot}`
    async fn ingest_screenshots(&self, state: &RunState, raw: &str) -> ReconResult<()> {
        let existing = self.endpoints.endpoints(&state.target.id).await?;
        for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let Ok(value) = serde_json::from_str::<serde_json::Value>(line) else {
                continue;
            };
            let Some(url) = value.get("url").and_then(|u| u.as_str()) else {
                continue;
            };
            let Some(shot) = value.get("screenshot").and_then(|s| s.as_str()) else {
                continue;
            };
            if let Some(endpoint) = existing.iter().find(|e| e.url == url) {
                let mut updated = endpoint.clone();
                updated.screenshot = Some(shot.to_string());
                self.endpoints.upsert_endpoint(&updated).await?;
            }
        }
        Ok(())
    }

    /// Metadata results enrich endpoints with TLS-issue flags, response
    /// headers, technologies, and crawl/fuzz payloads: JSON lines keyed by
    /// url.
    async fn ingest_metadata(&self, state: &RunState, raw: &str) -> ReconResult<()> {
        let existing = self.endpoints.endpoints(&state.target.id).await?;
        for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let Ok(value) = serde_json::from_str::<serde_json::Value>(line) else {
                continue;
            };
            let Some(url) = value.get("url").and_then(|u| u.as_str()) else {
                continue;
            };
            let Some(endpoint) = existing.iter().find(|e| e.url == url) else {
                continue;
            };

            let mut updated = endpoint.clone();
            let flag = |key: &str| value.get(key).and_then(|v| v.as_bool()).unwrap_or(false);
            updated.has_deprecated_tls |= flag("has_deprecated_tls");
            updated.has_expired_ssl |= flag("has_expired_ssl");
            updated.has_mismatched_ssl |= flag("has_mismatched_ssl");
            updated.has_revoked_ssl |= flag("has_revoked_ssl");
            updated.has_self_signed_ssl |= flag("has_self_signed_ssl");
            updated.has_untrusted_root_ssl |= flag("has_untrusted_root_ssl");

            if let Some(headers) = value.get("http_response_headers") {
                if !headers.is_null() {
                    updated.http_response_headers = Some(headers.clone());
                }
            }
            if let Some(katana) = value.get("katana_results") {
                if !katana.is_null() {
                    updated.katana_results = Some(katana.clone());
                }
            }
            if let Some(ffuf) = value.get("ffuf_results") {
                if !ffuf.is_null() {
                    updated.ffuf_results = Some(ffuf.clone());
                }
            }
            if let Some(techs) = value.get("technologies").and_then(|t| t.as_array()) {
                updated.technologies = techs
                    .iter()
                    .filter_map(|t| t.as_str())
                    .map(str::to_string)
                    .collect();
            }
            self.endpoints.upsert_endpoint(&updated).await?;
        }
        Ok(())
    }

    /// Stage-boundary control check. Blocks while paused on the session
    /// poll cadence; transient state-fetch failures are retried on the
    /// next tick rather than failing the run.
    async fn observe_control(&self, state: &RunState) -> Control {
        loop {
            match self.sessions.session_state(&state.target.id).await {
                Ok(s) if s.is_cancelled => {
                    info!("Auto scan for {} was cancelled", state.target.id);
                    return Control::Cancelled;
                }
                Ok(s) if s.is_paused => {
                    debug!("Auto scan for {} is paused", state.target.id);
                }
                Ok(_) => return Control::Proceed,
                Err(err) => {
                    warn!("Session state fetch failed, retrying next tick: {}", err);
                }
            }
            tokio::time::sleep(self.config.session_poll_interval).await;
        }
    }

    /// Close the session with final metrics and score every discovered
    /// endpoint so the ranked report is ready.
    async fn finalize(&self, state: &RunState, cancelled: bool) -> ReconResult<()> {
        let subdomains = self
            .scans
            .get_consolidated(&state.target.id, ConsolidatedKind::Subdomains)
            .await
            .map(|set| set.count)
            .unwrap_or(0);
        let live_web_servers = match self
            .scans
            .latest_successful_result(&state.target.id, Tool::Httpx)
            .await
        {
            Ok(Some(raw)) => parse_probe_output(&raw).len() as u64,
            _ => 0,
        };

        if cancelled {
            self.sessions
                .close_session(&state.session_id, SessionStatus::Cancelled, None)
                .await?;
        } else {
            if let Err(err) = self.report(&state.target.id).await {
                warn!("Endpoint scoring failed at finalize: {}", err);
            }
            self.sessions
                .record_final_stats(
                    &state.session_id,
                    FinalStats {
                        final_consolidated_subdomains: subdomains,
                        final_live_web_servers: live_web_servers,
                    },
                )
                .await?;
        }

        self.sessions
            .set_current_stage(&state.target.id, ScanStage::Completed)
            .await?;
        info!(
            "Auto scan session {} ended ({}): {} subdomains, {} live web servers",
            state.session_id,
            if cancelled { "cancelled" } else { "completed" },
            subdomains,
            live_web_servers
        );
        Ok(())
    }
}
