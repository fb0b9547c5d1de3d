// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Engine Error Types
 * Error taxonomy for the auto-scan orchestration engine
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::time::Duration;
use thiserror::Error;

use crate::types::Tool;

/// Top-level engine error with classified variants
#[derive(Error, Debug)]
pub enum EngineError {
    /// Session/scan persistence errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Tool submission/status errors
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Missing or invalid configuration, refused before any job is created
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A running or paused session already exists for the target
    #[error("Session conflict for target {target_id}: {reason}")]
    SessionConflict { target_id: String, reason: String },

    /// Job monitor exceeded its poll-attempt ceiling
    #[error("Monitor timed out for {tool} after {attempts} attempts")]
    MonitorTimeout { tool: Tool, attempts: u32 },

    /// General errors
    #[error("Engine error: {0}")]
    General(String),
}

/// Persistence errors, kept transport-agnostic
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Connection pool exhausted: {available}/{max} available")]
    PoolExhausted { available: usize, max: usize },

    #[error("Query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },
}

/// Errors from the external tool submit/poll contract
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to submit {tool}: {reason}")]
    SubmitFailed { tool: Tool, reason: String },

    #[error("Status unavailable for scan {scan_id}: {reason}")]
    StatusUnavailable { scan_id: String, reason: String },

    #[error("Tool {tool} is not configured for this deployment")]
    NotConfigured { tool: Tool },

    #[error("Tool service timed out after {duration:?}")]
    Timeout { duration: Duration },
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::ConnectionFailed { .. }
                | StoreError::PoolExhausted { .. }
                | StoreError::QueryFailed { .. }
        )
    }
}

impl ToolError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ToolError::StatusUnavailable { .. } | ToolError::Timeout { .. }
        )
    }
}

impl EngineError {
    /// Whether the next poll tick may succeed where this attempt failed
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Store(e) => e.is_retryable(),
            EngineError::Tool(e) => e.is_retryable(),
            EngineError::Configuration(_) => false,
            EngineError::SessionConflict { .. } => false,
            EngineError::MonitorTimeout { .. } => false,
            EngineError::General(_) => false,
        }
    }
}

pub type ReconResult<T> = Result<T, EngineError>;
