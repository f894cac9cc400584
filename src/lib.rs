//! # boltlog
//!
//! The write-ahead log of an embedded key-value store:
//! - Checksummed, length-prefixed frames for every put/delete
//! - Gapless LSNs that survive rotation and restarts
//! - Bounded-size segment files with rotation
//! - Exclusive advisory lock on the active segment (single writer)
//! - Replay that stops cleanly at a torn tail after a crash
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  KV Engine (caller)                         │
//! └─────────────────────┬───────────────────────▲───────────────┘
//!                       │ append(op) -> lsn     │ records()
//! ┌─────────────────────▼───────────┐   ┌───────┴───────────────┐
//! │            LogWriter            │   │       LogReader       │
//! │     (LSN + frame encoding)      │   │   (replay iterator)   │
//! └─────────────────────┬───────────┘   └───────▲───────────────┘
//!                       │                       │
//! ┌─────────────────────▼───────────┐           │
//! │         SegmentManager          │           │
//! │   (discovery + rotation)        │           │
//! └─────────────────────┬───────────┘           │
//!                       │                       │
//! ┌─────────────────────▼───────────────────────┴───────────────┐
//! │     Segment files  boltbin.000000 ... (active one locked)   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod wal;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{LogConfig, SyncMode};
pub use error::{LogError, Result};
pub use wal::{LogReader, LogRecord, LogWriter, Operation, SegmentManager};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of boltlog
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
