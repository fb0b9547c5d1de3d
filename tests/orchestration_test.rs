// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Auto-Scan Orchestration Tests
 * Stage ordering, resume re-attach, cancellation, and run limits
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use haukka::config::EngineConfig;
use haukka::engine::AutoScanEngine;
use haukka::errors::{ReconResult, ToolError};
use haukka::monitor::MonitorConfig;
use haukka::stages::ScanStage;
use haukka::store::{MemoryStore, ScanStore, SessionStore};
use haukka::tools::ToolService;
use haukka::types::{
    AutoScanConfig, ConsolidatedKind, JobStatus, ScanJob, ScopeTarget, SessionStatus,
    TargetKind, Tool,
};

const TARGET_ID: &str = "t1";

fn target() -> ScopeTarget {
    ScopeTarget {
        id: TARGET_ID.to_string(),
        kind: TargetKind::Wildcard,
        value: "*.example.com".to_string(),
        active: true,
    }
}

fn fast_engine_config() -> EngineConfig {
    EngineConfig::default()
        .with_session_poll_interval(Duration::from_millis(5))
        .with_stage_settle_delay(Duration::from_millis(0))
        .with_monitor(
            MonitorConfig::default()
                .with_poll_interval(Duration::from_millis(1))
                .with_max_attempts(50),
        )
}

/// Scripted tool backend: every submitted job runs for one poll, then
/// lands on its configured terminal status and result payload. Completed
/// CeWL runs spawn the custom ShuffleDNS row the way the real backend
/// does.
struct FakeToolService {
    store: Arc<MemoryStore>,
    results: HashMap<Tool, String>,
    terminal: HashMap<Tool, JobStatus>,
    submissions: Mutex<Vec<Tool>>,
    jobs: Mutex<HashMap<String, (Tool, u32)>>,
    cancel_after: Option<Tool>,
}

impl FakeToolService {
    fn new(store: Arc<MemoryStore>) -> Self {
        let mut results = HashMap::new();
        results.insert(Tool::Amass, "a.example.com\nb.example.com".to_string());
        results.insert(Tool::Sublist3r, "B.example.com".to_string());
        results.insert(Tool::Assetfinder, "c.example.com".to_string());
        results.insert(
            Tool::Gau,
            r#"{"url": "https://d.example.com/login"}"#.to_string(),
        );
        results.insert(Tool::Ctl, "a.example.com".to_string());
        results.insert(Tool::Subfinder, "e.example.com".to_string());
        results.insert(Tool::Shuffledns, "f.example.com".to_string());
        results.insert(Tool::Cewl, "wordlist-ok".to_string());
        results.insert(Tool::Gospider, "[subdomains] - https://g.example.com".to_string());
        results.insert(Tool::Subdomainizer, "found h.example.com in app.js".to_string());
        results.insert(
            Tool::Httpx,
            concat!(
                r#"{"url": "https://a.example.com", "status_code": 200, "tech": ["nginx"]}"#,
                "\n",
                r#"{"url": "https://b.example.com", "status_code": 403}"#,
            )
            .to_string(),
        );
        results.insert(
            Tool::NucleiScreenshot,
            r#"{"url": "https://a.example.com", "screenshot": "iVBORw0KGgo="}"#.to_string(),
        );
        results.insert(
            Tool::Metadata,
            concat!(
                r#"{"url": "https://a.example.com", "has_expired_ssl": true, "#,
                r#""technologies": ["nginx", "react"], "#,
                r#""http_response_headers": {"ETag": "abc"}}"#,
            )
            .to_string(),
        );

        Self {
            store,
            results,
            terminal: HashMap::new(),
            submissions: Mutex::new(Vec::new()),
            jobs: Mutex::new(HashMap::new()),
            cancel_after: None,
        }
    }

    fn submissions(&self) -> Vec<Tool> {
        self.submissions.lock().clone()
    }

    fn seed_job(&self, scan_id: &str, tool: Tool, polls: u32) {
        self.jobs
            .lock()
            .insert(scan_id.to_string(), (tool, polls));
    }

    fn terminal_status(&self, tool: Tool) -> JobStatus {
        self.terminal.get(&tool).copied().unwrap_or(JobStatus::Success)
    }
}

#[async_trait]
impl ToolService for FakeToolService {
    async fn submit(
        &self,
        tool: Tool,
        _target: &ScopeTarget,
        _params: serde_json::Value,
    ) -> ReconResult<String> {
        let mut submissions = self.submissions.lock();
        let scan_id = format!("{}-{}", tool, submissions.len());
        submissions.push(tool);
        drop(submissions);
        self.jobs.lock().insert(scan_id.clone(), (tool, 0));
        Ok(scan_id)
    }

    async fn status(&self, tool: Tool, scan_id: &str) -> ReconResult<ScanJob> {
        let status = {
            let mut jobs = self.jobs.lock();
            let entry = jobs
                .get_mut(scan_id)
                .ok_or_else(|| ToolError::StatusUnavailable {
                    scan_id: scan_id.to_string(),
                    reason: "unknown scan".to_string(),
                })?;
            entry.1 += 1;
            if entry.1 >= 2 {
                self.terminal_status(tool)
            } else {
                JobStatus::Running
            }
        };

        if status == JobStatus::Success && tool == Tool::Cewl {
            // The backend chains the custom ShuffleDNS resolution off the
            // finished wordlist run
            self.store
                .record_job(&ScanJob {
                    scan_id: format!("{scan_id}-custom"),
                    tool: Tool::ShufflednsCewl,
                    scope_target_id: TARGET_ID.to_string(),
                    status: JobStatus::Success,
                    result: Some("i.example.com".to_string()),
                    error_message: None,
                    execution_time_secs: None,
                    created_at: Utc::now(),
                    auto_scan_session_id: None,
                })
                .await?;
        }

        if status.is_terminal() {
            if let Some(cancel_tool) = self.cancel_after {
                if cancel_tool == tool {
                    self.store.set_cancelled(TARGET_ID, true).await?;
                }
            }
        }

        let result = if status == JobStatus::Success {
            self.results.get(&tool).cloned()
        } else {
            None
        };

        Ok(ScanJob {
            scan_id: scan_id.to_string(),
            tool,
            scope_target_id: TARGET_ID.to_string(),
            status,
            result,
            error_message: None,
            execution_time_secs: Some(0.1),
            created_at: Utc::now(),
            auto_scan_session_id: None,
        })
    }
}

fn engine_with(service: Arc<FakeToolService>, store: Arc<MemoryStore>) -> AutoScanEngine {
    AutoScanEngine::new(
        service,
        store.clone(),
        store.clone(),
        store,
        fast_engine_config(),
    )
}

#[tokio::test]
async fn test_full_run_executes_stages_in_canonical_order() {
    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(FakeToolService::new(store.clone()));
    let engine = engine_with(service.clone(), store.clone());

    let state = engine.start(&target(), AutoScanConfig::default()).await.unwrap();
    let session_id = state.session_id.clone();
    engine.run(state).await.unwrap();

    // Gates submit nothing; every probe round submits httpx
    assert_eq!(
        service.submissions(),
        vec![
            Tool::Amass,
            Tool::Sublist3r,
            Tool::Assetfinder,
            Tool::Gau,
            Tool::Ctl,
            Tool::Subfinder,
            Tool::Httpx,
            Tool::Shuffledns,
            Tool::Cewl,
            Tool::Httpx,
            Tool::Gospider,
            Tool::Subdomainizer,
            Tool::Httpx,
            Tool::NucleiScreenshot,
            Tool::Metadata,
        ]
    );

    let sessions = store.list_sessions(TARGET_ID).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, session_id);
    assert_eq!(sessions[0].status, SessionStatus::Completed);
    assert!(sessions[0].ended_at.is_some());

    // Final metrics: 9 in-scope subdomains (a-f from round 1 tools, g, h
    // from spiders, i from the custom run), 2 live servers
    assert_eq!(sessions[0].final_consolidated_subdomains, Some(9));
    assert_eq!(sessions[0].final_live_web_servers, Some(2));

    let state = store.session_state(TARGET_ID).await.unwrap();
    assert_eq!(state.current_stage, ScanStage::Completed);
}

#[tokio::test]
async fn test_full_run_enriches_and_scores_endpoints() {
    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(FakeToolService::new(store.clone()));
    let engine = engine_with(service, store.clone());

    let state = engine.start(&target(), AutoScanConfig::default()).await.unwrap();
    engine.run(state).await.unwrap();

    let report = engine.report(TARGET_ID).await.unwrap();
    assert_eq!(report.len(), 2);

    // a.example.com: 50 base + 25 expired cert + 2x3 technologies
    // + 10 caching headers, screenshot attached from the nuclei stage
    let enriched = &report[0];
    assert_eq!(enriched.url, "https://a.example.com");
    assert_eq!(enriched.roi_score, 91);
    assert!(enriched.has_expired_ssl);
    assert_eq!(enriched.screenshot.as_deref(), Some("iVBORw0KGgo="));

    // b.example.com: nothing beyond the probe row
    assert_eq!(report[1].roi_score, 50);
}

#[tokio::test]
async fn test_disabled_stage_is_skipped_but_order_preserved() {
    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(FakeToolService::new(store.clone()));
    let engine = engine_with(service.clone(), store.clone());

    let config = AutoScanConfig {
        cewl: false,
        ..AutoScanConfig::default()
    };
    let state = engine.start(&target(), config).await.unwrap();
    engine.run(state).await.unwrap();

    let submissions = service.submissions();
    assert!(!submissions.contains(&Tool::Cewl));

    // SHUFFLEDNS -> CONSOLIDATE_2/HTTPX_2 ordering survives the skip
    let shuffledns = submissions
        .iter()
        .position(|t| *t == Tool::Shuffledns)
        .unwrap();
    assert_eq!(submissions[shuffledns + 1], Tool::Httpx);
}

#[tokio::test]
async fn test_failed_stage_does_not_abort_the_run() {
    let store = Arc::new(MemoryStore::new());
    let mut service = FakeToolService::new(store.clone());
    service.terminal.insert(Tool::Amass, JobStatus::Failed);
    service.terminal.insert(Tool::Gau, JobStatus::Error);
    let service = Arc::new(service);
    let engine = engine_with(service.clone(), store.clone());

    let state = engine.start(&target(), AutoScanConfig::default()).await.unwrap();
    engine.run(state).await.unwrap();

    // Every stage was still attempted and the session completed
    assert_eq!(service.submissions().len(), 15);
    let sessions = store.list_sessions(TARGET_ID).await.unwrap();
    assert_eq!(sessions[0].status, SessionStatus::Completed);

    // Failed contributions are simply absent from the canonical set
    let set = store
        .get_consolidated(TARGET_ID, ConsolidatedKind::Subdomains)
        .await
        .unwrap();
    assert!(!set.items.contains(&"d.example.com".to_string()));
    assert!(set.items.contains(&"c.example.com".to_string()));
}

#[tokio::test]
async fn test_resume_reattaches_running_job_without_resubmitting() {
    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(FakeToolService::new(store.clone()));
    let engine = engine_with(service.clone(), store.clone());

    // A prior process got as far as HTTPX_2 and died mid-probe
    store
        .start_session(TARGET_ID, &AutoScanConfig::default())
        .await
        .unwrap();
    store
        .set_current_stage(TARGET_ID, ScanStage::HttpxRound2)
        .await
        .unwrap();
    store
        .replace_consolidated(
            TARGET_ID,
            ConsolidatedKind::Subdomains,
            vec!["a.example.com".to_string(), "b.example.com".to_string()],
        )
        .await
        .unwrap();
    store
        .record_job(&ScanJob {
            scan_id: "httpx-inflight".to_string(),
            tool: Tool::Httpx,
            scope_target_id: TARGET_ID.to_string(),
            status: JobStatus::Running,
            result: None,
            error_message: None,
            execution_time_secs: None,
            created_at: Utc::now(),
            auto_scan_session_id: None,
        })
        .await
        .unwrap();
    service.seed_job("httpx-inflight", Tool::Httpx, 0);

    let state = engine.attach(&target()).await.unwrap().expect("resumable run");
    assert_eq!(state.stage, ScanStage::HttpxRound2);
    engine.run(state).await.unwrap();

    // The in-flight probe was monitored, not resubmitted: the only new
    // httpx submission belongs to round 3
    let httpx_submissions = service
        .submissions()
        .iter()
        .filter(|t| **t == Tool::Httpx)
        .count();
    assert_eq!(httpx_submissions, 1);

    let sessions = store.list_sessions(TARGET_ID).await.unwrap();
    assert_eq!(sessions[0].status, SessionStatus::Completed);
}

#[tokio::test]
async fn test_attach_is_noop_for_idle_target() {
    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(FakeToolService::new(store.clone()));
    let engine = engine_with(service, store);

    assert!(engine.attach(&target()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_cancellation_stops_submissions_and_closes_session() {
    let store = Arc::new(MemoryStore::new());
    let mut service = FakeToolService::new(store.clone());
    // Operator cancels while the first stage's job is mid-flight
    service.cancel_after = Some(Tool::Amass);
    let service = Arc::new(service);
    let engine = engine_with(service.clone(), store.clone());

    let state = engine.start(&target(), AutoScanConfig::default()).await.unwrap();
    engine.run(state).await.unwrap();

    // The in-flight job ran to its terminal state, then nothing more was
    // submitted
    assert_eq!(service.submissions(), vec![Tool::Amass]);

    let sessions = store.list_sessions(TARGET_ID).await.unwrap();
    assert_eq!(sessions[0].status, SessionStatus::Cancelled);
    assert!(sessions[0].ended_at.is_some());
}

#[tokio::test]
async fn test_live_server_limit_ends_run_early() {
    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(FakeToolService::new(store.clone()));
    let engine = engine_with(service.clone(), store.clone());

    let config = AutoScanConfig {
        max_live_web_servers: 1,
        ..AutoScanConfig::default()
    };
    let state = engine.start(&target(), config).await.unwrap();
    engine.run(state).await.unwrap();

    // The run stopped at the first probe; nothing later was submitted
    let submissions = service.submissions();
    assert_eq!(*submissions.last().unwrap(), Tool::Httpx);
    assert!(!submissions.contains(&Tool::Shuffledns));

    // Partial results still close the session as completed
    let sessions = store.list_sessions(TARGET_ID).await.unwrap();
    assert_eq!(sessions[0].status, SessionStatus::Completed);
    assert_eq!(sessions[0].final_live_web_servers, Some(2));
}

#[tokio::test]
async fn test_pause_holds_next_stage_until_unpaused() {
    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(FakeToolService::new(store.clone()));
    let engine = Arc::new(engine_with(service.clone(), store.clone()));

    let state = engine.start(&target(), AutoScanConfig::default()).await.unwrap();
    engine.pause(TARGET_ID).await.unwrap();

    let runner = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.run(state).await })
    };

    // Paused before the first stage: nothing may be submitted
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(service.submissions().is_empty());
    assert!(!runner.is_finished());

    engine.unpause(TARGET_ID).await.unwrap();
    runner.await.unwrap().unwrap();

    assert_eq!(service.submissions().len(), 15);
    let sessions = store.list_sessions(TARGET_ID).await.unwrap();
    assert_eq!(sessions[0].status, SessionStatus::Completed);
}

#[tokio::test]
async fn test_start_refuses_bad_configurations() {
    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(FakeToolService::new(store.clone()));
    let engine = engine_with(service.clone(), store.clone());

    // Non-wildcard target
    let company = ScopeTarget {
        id: "t2".to_string(),
        kind: TargetKind::Company,
        value: "Example Oy".to_string(),
        active: true,
    };
    assert!(engine.start(&company, AutoScanConfig::default()).await.is_err());

    // Everything disabled
    let empty = AutoScanConfig {
        amass: false,
        sublist3r: false,
        assetfinder: false,
        gau: false,
        ctl: false,
        subfinder: false,
        consolidate_httpx_round1: false,
        shuffledns: false,
        cewl: false,
        consolidate_httpx_round2: false,
        gospider: false,
        subdomainizer: false,
        consolidate_httpx_round3: false,
        nuclei_screenshot: false,
        metadata: false,
        ..AutoScanConfig::default()
    };
    assert!(engine.start(&target(), empty).await.is_err());

    // Refusals never create jobs
    assert!(service.submissions().is_empty());

    // One active session per target
    let _running = engine.start(&target(), AutoScanConfig::default()).await.unwrap();
    assert!(engine.start(&target(), AutoScanConfig::default()).await.is_err());
}
