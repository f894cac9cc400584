//! Write-Ahead Log (WAL) Module
//!
//! Durably records put/delete intents before the store applies them.
//!
//! ## Responsibilities
//! - Frame records with a length prefix and CRC32 checksum
//! - Assign gapless, monotonically increasing LSNs
//! - Rotate bounded-size segment files
//! - Lock the active segment against a second writer
//! - Replay records, stopping cleanly at a torn tail
//!
//! ## Directory Layout
//! ```text
//! {dir}/
//!   ├── boltbin.000000   (closed)
//!   ├── boltbin.000001   (closed)
//!   └── boltbin.000002   (active, locked)
//! ```
//!
//! ## Segment Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ Frame 1                                                     │
//! │ ┌─────────┬─────────┬──────────┬────┬─────┬───────┬───────┐ │
//! │ │ Len (4) │ LSN (8) │ Time (8) │ Op │ Key │ Value │CRC (4)│ │
//! │ └─────────┴─────────┴──────────┴────┴─────┴───────┴───────┘ │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Frame 2 ...                                                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod lock;
mod manager;
mod reader;
mod record;
mod recovery;
mod segment;
mod writer;

pub use lock::Locker;
pub use manager::SegmentManager;
pub use reader::{LogReader, Replay, StopReason};
pub use record::{now_millis, LogRecord, Operation, FRAME_OVERHEAD};
pub use recovery::{RecoveryResult, SegmentScan, WalRecovery};
pub use segment::{
    discover_segments, discover_segments_wrapping, parse_segment_sequence, segment_file_name,
    Segment, SegmentInfo,
};
pub use writer::LogWriter;
