// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - In-Memory Store
 * Process-local store implementation for tests and single-shot runs
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::errors::{ReconResult, StoreError};
use crate::stages::ScanStage;
use crate::store::{EndpointStore, ScanStore, SessionStore};
use crate::types::{
    AutoScanConfig, AutoScanSession, ConsolidatedKind, ConsolidatedSet, EndpointRecord,
    FinalStats, ScanJob, SessionState, SessionStatus, Tool,
};

/// All engine state behind process-local locks. Not resumable across
/// restarts; the Postgres store is the durable counterpart.
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<Vec<AutoScanSession>>,
    states: RwLock<HashMap<String, SessionState>>,
    jobs: RwLock<Vec<ScanJob>>,
    consolidated: RwLock<HashMap<(String, ConsolidatedKind), Vec<String>>>,
    endpoints: RwLock<Vec<EndpointRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state_or_default(&self, target_id: &str) -> SessionState {
        self.states
            .read()
            .get(target_id)
            .cloned()
            .unwrap_or_else(|| SessionState {
                scope_target_id: target_id.to_string(),
                current_stage: ScanStage::Idle,
                is_paused: false,
                is_cancelled: false,
                session_id: None,
            })
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn start_session(
        &self,
        target_id: &str,
        config: &AutoScanConfig,
    ) -> ReconResult<String> {
        let session = AutoScanSession {
            id: Uuid::new_v4().to_string(),
            scope_target_id: target_id.to_string(),
            status: SessionStatus::Running,
            config_snapshot: config.clone(),
            started_at: Utc::now(),
            ended_at: None,
            error_message: None,
            final_consolidated_subdomains: None,
            final_live_web_servers: None,
        };
        let id = session.id.clone();
        self.sessions.write().push(session);

        let mut state = self.state_or_default(target_id);
        state.current_stage = ScanStage::Idle;
        state.is_paused = false;
        state.is_cancelled = false;
        state.session_id = Some(id.clone());
        self.states.write().insert(target_id.to_string(), state);

        Ok(id)
    }

    async fn active_session(&self, target_id: &str) -> ReconResult<Option<AutoScanSession>> {
        Ok(self
            .sessions
            .read()
            .iter()
            .filter(|s| s.scope_target_id == target_id)
            .filter(|s| {
                matches!(s.status, SessionStatus::Running | SessionStatus::Paused)
            })
            .max_by_key(|s| s.started_at)
            .cloned())
    }

    async fn list_sessions(&self, target_id: &str) -> ReconResult<Vec<AutoScanSession>> {
        let mut sessions: Vec<AutoScanSession> = self
            .sessions
            .read()
            .iter()
            .filter(|s| s.scope_target_id == target_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(sessions)
    }

    async fn session_state(&self, target_id: &str) -> ReconResult<SessionState> {
        Ok(self.state_or_default(target_id))
    }

    async fn set_current_stage(&self, target_id: &str, stage: ScanStage) -> ReconResult<()> {
        let mut state = self.state_or_default(target_id);
        state.current_stage = stage;
        self.states.write().insert(target_id.to_string(), state);
        Ok(())
    }

    async fn set_paused(&self, target_id: &str, paused: bool) -> ReconResult<()> {
        let mut state = self.state_or_default(target_id);
        state.is_paused = paused;
        self.states.write().insert(target_id.to_string(), state);

        let mut sessions = self.sessions.write();
        if let Some(session) = sessions
            .iter_mut()
            .filter(|s| s.scope_target_id == target_id)
            .find(|s| matches!(s.status, SessionStatus::Running | SessionStatus::Paused))
        {
            session.status = if paused {
                SessionStatus::Paused
            } else {
                SessionStatus::Running
            };
        }
        Ok(())
    }

    async fn set_cancelled(&self, target_id: &str, cancelled: bool) -> ReconResult<()> {
        let mut state = self.state_or_default(target_id);
        state.is_cancelled = cancelled;
        self.states.write().insert(target_id.to_string(), state);
        Ok(())
    }

    async fn record_final_stats(&self, session_id: &str, stats: FinalStats) -> ReconResult<()> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| StoreError::NotFound {
                what: format!("session {session_id}"),
            })?;
        session.final_consolidated_subdomains = Some(stats.final_consolidated_subdomains);
        session.final_live_web_servers = Some(stats.final_live_web_servers);
        session.status = SessionStatus::Completed;
        session.ended_at.get_or_insert_with(Utc::now);
        Ok(())
    }

    async fn close_session(
        &self,
        session_id: &str,
        status: SessionStatus,
        error_message: Option<String>,
    ) -> ReconResult<()> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| StoreError::NotFound {
                what: format!("session {session_id}"),
            })?;

        // A completed session is never downgraded to cancelled
        if session.status != SessionStatus::Completed {
            session.status = status;
        }
        session.ended_at.get_or_insert_with(Utc::now);
        if error_message.is_some() {
            session.error_message = error_message;
        }
        Ok(())
    }
}

#[async_trait]
impl ScanStore for MemoryStore {
    async fn record_job(&self, job: &ScanJob) -> ReconResult<()> {
        let mut jobs = self.jobs.write();
        match jobs.iter_mut().find(|j| j.scan_id == job.scan_id) {
            Some(existing) => *existing = job.clone(),
            None => jobs.push(job.clone()),
        }
        Ok(())
    }

    async fn latest_job(&self, target_id: &str, tool: Tool) -> ReconResult<Option<ScanJob>> {
        Ok(self
            .jobs
            .read()
            .iter()
            .filter(|j| j.scope_target_id == target_id && j.tool == tool)
            .max_by_key(|j| j.created_at)
            .cloned())
    }

    async fn latest_successful_result(
        &self,
        target_id: &str,
        tool: Tool,
    ) -> ReconResult<Option<String>> {
        Ok(self
            .jobs
            .read()
            .iter()
            .filter(|j| j.scope_target_id == target_id && j.tool == tool)
            .filter(|j| j.status == crate::types::JobStatus::Success)
            .max_by_key(|j| j.created_at)
            .and_then(|j| j.result.clone()))
    }

    async fn get_consolidated(
        &self,
        target_id: &str,
        kind: ConsolidatedKind,
    ) -> ReconResult<ConsolidatedSet> {
        let items = self
            .consolidated
            .read()
            .get(&(target_id.to_string(), kind))
            .cloned()
            .unwrap_or_default();
        Ok(ConsolidatedSet::new(kind, items))
    }

    async fn replace_consolidated(
        &self,
        target_id: &str,
        kind: ConsolidatedKind,
        items: Vec<String>,
    ) -> ReconResult<ConsolidatedSet> {
        self.consolidated
            .write()
            .insert((target_id.to_string(), kind), items.clone());
        Ok(ConsolidatedSet::new(kind, items))
    }
}

#[async_trait]
impl EndpointStore for MemoryStore {
    async fn endpoints(&self, target_id: &str) -> ReconResult<Vec<EndpointRecord>> {
        let mut endpoints: Vec<EndpointRecord> = self
            .endpoints
            .read()
            .iter()
            .filter(|e| e.scope_target_id == target_id)
            .cloned()
            .collect();
        endpoints.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(endpoints)
    }

    async fn upsert_endpoint(&self, endpoint: &EndpointRecord) -> ReconResult<()> {
        let mut endpoints = self.endpoints.write();
        match endpoints
            .iter_mut()
            .find(|e| e.scope_target_id == endpoint.scope_target_id && e.url == endpoint.url)
        {
            Some(existing) => {
                // Refresh probe data, keep identity and discovery time
                let id = existing.id.clone();
                let created_at = existing.created_at;
                *existing = endpoint.clone();
                existing.id = id;
                existing.created_at = created_at;
            }
            None => endpoints.push(endpoint.clone()),
        }
        Ok(())
    }

    async fn set_roi_score(&self, endpoint_id: &str, score: u32) -> ReconResult<()> {
        let mut endpoints = self.endpoints.write();
        let endpoint = endpoints
            .iter_mut()
            .find(|e| e.id == endpoint_id)
            .ok_or_else(|| StoreError::NotFound {
                what: format!("endpoint {endpoint_id}"),
            })?;
        endpoint.roi_score = score;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JobStatus;

    fn job(scan_id: &str, tool: Tool, status: JobStatus, result: Option<&str>) -> ScanJob {
        ScanJob {
            scan_id: scan_id.to_string(),
            tool,
            scope_target_id: "t1".to_string(),
            status,
            result: result.map(str::to_string),
            error_message: None,
            execution_time_secs: None,
            created_at: Utc::now(),
            auto_scan_session_id: None,
        }
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let store = MemoryStore::new();
        let id = store
            .start_session("t1", &AutoScanConfig::default())
            .await
            .unwrap();

        let active = store.active_session("t1").await.unwrap().unwrap();
        assert_eq!(active.id, id);
        assert_eq!(active.status, SessionStatus::Running);

        store.set_paused("t1", true).await.unwrap();
        let active = store.active_session("t1").await.unwrap().unwrap();
        assert_eq!(active.status, SessionStatus::Paused);
        assert!(store.session_state("t1").await.unwrap().is_paused);

        store
            .close_session(&id, SessionStatus::Cancelled, None)
            .await
            .unwrap();
        assert!(store.active_session("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_completed_session_not_downgraded() {
        let store = MemoryStore::new();
        let id = store
            .start_session("t1", &AutoScanConfig::default())
            .await
            .unwrap();
        store
            .record_final_stats(
                &id,
                FinalStats {
                    final_consolidated_subdomains: 10,
                    final_live_web_servers: 3,
                },
            )
            .await
            .unwrap();

        store
            .close_session(&id, SessionStatus::Cancelled, None)
            .await
            .unwrap();

        let sessions = store.list_sessions("t1").await.unwrap();
        assert_eq!(sessions[0].status, SessionStatus::Completed);
        assert_eq!(sessions[0].final_consolidated_subdomains, Some(10));
    }

    #[tokio::test]
    async fn test_latest_successful_result_ignores_failures() {
        let store = MemoryStore::new();
        store
            .record_job(&job("s1", Tool::Amass, JobStatus::Success, Some("a.example.com")))
            .await
            .unwrap();
        store
            .record_job(&job("s2", Tool::Amass, JobStatus::Failed, Some("garbage")))
            .await
            .unwrap();

        let result = store
            .latest_successful_result("t1", Tool::Amass)
            .await
            .unwrap();
        assert_eq!(result.as_deref(), Some("a.example.com"));
    }

    #[tokio::test]
    async fn test_endpoint_upsert_keeps_identity() {
        let store = MemoryStore::new();
        let first = EndpointRecord::new("t1", "https://app.example.com");
        store.upsert_endpoint(&first).await.unwrap();

        let mut refreshed = EndpointRecord::new("t1", "https://app.example.com");
        refreshed.status_code = Some(200);
        store.upsert_endpoint(&refreshed).await.unwrap();

        let endpoints = store.endpoints("t1").await.unwrap();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].id, first.id);
        assert_eq!(endpoints[0].status_code, Some(200));
    }
}
