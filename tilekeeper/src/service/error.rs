//! Service error types.

use thiserror::Error;

use crate::marker::MarkerError;
use crate::scanner::ScanError;
use crate::scheduler::SchedulerError;

/// Errors from the prerender service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An operation needs a renderer but none is configured
    #[error("No renderer configured (set [render] command)")]
    NoRenderer,

    /// Startup scan failed
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),

    /// Marker pass failed
    #[error("Marker pass failed: {0}")]
    Mark(#[from] MarkerError),

    /// The prerender loop stopped unexpectedly
    #[error("Prerender scheduler failed: {0}")]
    Scheduler(#[from] SchedulerError),
}
