//! Error types for boltlog
//!
//! Provides a unified error type for all log operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using LogError
pub type Result<T> = std::result::Result<T, LogError>;

/// Unified error type for boltlog operations
#[derive(Debug, Error)]
pub enum LogError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to scan log directory {path}: {source}")]
    DirectoryScan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Locking Errors
    // -------------------------------------------------------------------------
    #[error("segment {path} is locked by another writer")]
    LockHeld { path: PathBuf },

    // -------------------------------------------------------------------------
    // Frame / Record Errors
    // -------------------------------------------------------------------------
    #[error("corrupt log frame: {0}")]
    CorruptFrame(String),

    #[error("invalid log record: {0}")]
    InvalidRecord(String),

    // -------------------------------------------------------------------------
    // Segment Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("rotation target {path} already holds records")]
    SegmentOccupied { path: PathBuf },

    #[error("log is closed")]
    Closed,

    #[error("log must be reopened: {0}")]
    Poisoned(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
