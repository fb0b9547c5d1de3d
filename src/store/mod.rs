// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Persistence Contract
 * Session, scan-job, and endpoint stores behind async trait seams
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use async_trait::async_trait;

use crate::errors::ReconResult;
use crate::stages::ScanStage;
use crate::types::{
    AutoScanConfig, AutoScanSession, ConsolidatedKind, ConsolidatedSet, EndpointRecord,
    FinalStats, ScanJob, SessionStatus, Tool,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Session records and the per-target cursor/control flags. The engine is
/// the sole writer of `current_stage`; pause/cancel flags may be flipped by
/// any operator surface.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a running session with the given config snapshot; returns the
    /// new session id.
    async fn start_session(
        &self,
        target_id: &str,
        config: &AutoScanConfig,
    ) -> ReconResult<String>;

    /// The running or paused session for a target, if any
    async fn active_session(&self, target_id: &str) -> ReconResult<Option<AutoScanSession>>;

    /// Session history, most recent first
    async fn list_sessions(&self, target_id: &str) -> ReconResult<Vec<AutoScanSession>>;

    /// Per-target cursor and control flags. Targets with no recorded state
    /// report the idle stage with both flags clear.
    async fn session_state(&self, target_id: &str) -> ReconResult<crate::types::SessionState>;

    async fn set_current_stage(&self, target_id: &str, stage: ScanStage) -> ReconResult<()>;

    /// Also moves the active session between running and paused
    async fn set_paused(&self, target_id: &str, paused: bool) -> ReconResult<()>;

    async fn set_cancelled(&self, target_id: &str, cancelled: bool) -> ReconResult<()>;

    async fn record_final_stats(&self, session_id: &str, stats: FinalStats) -> ReconResult<()>;

    /// Close a session. A session already completed is never downgraded to
    /// cancelled.
    async fn close_session(
        &self,
        session_id: &str,
        status: SessionStatus,
        error_message: Option<String>,
    ) -> ReconResult<()>;
}

/// Scan-job observations and the canonical consolidated sets
#[async_trait]
pub trait ScanStore: Send + Sync {
    /// Upsert a job snapshot keyed by scan id
    async fn record_job(&self, job: &ScanJob) -> ReconResult<()>;

    /// Most recently created job for a tool against a target
    async fn latest_job(&self, target_id: &str, tool: Tool) -> ReconResult<Option<ScanJob>>;

    /// Raw result of the most recent successful job for a tool, if any
    async fn latest_successful_result(
        &self,
        target_id: &str,
        tool: Tool,
    ) -> ReconResult<Option<String>>;

    async fn get_consolidated(
        &self,
        target_id: &str,
        kind: ConsolidatedKind,
    ) -> ReconResult<ConsolidatedSet>;

    /// Replace a canonical set wholesale; never an incremental patch
    async fn replace_consolidated(
        &self,
        target_id: &str,
        kind: ConsolidatedKind,
        items: Vec<String>,
    ) -> ReconResult<ConsolidatedSet>;
}

/// Discovered web endpoints and their ROI scores
#[async_trait]
pub trait EndpointStore: Send + Sync {
    async fn endpoints(&self, target_id: &str) -> ReconResult<Vec<EndpointRecord>>;

    /// Insert or refresh an endpoint keyed by (target, url)
    async fn upsert_endpoint(&self, endpoint: &EndpointRecord) -> ReconResult<()>;

    async fn set_roi_score(&self, endpoint_id: &str, score: u32) -> ReconResult<()>;
}
