//! Log Writer
//!
//! The append interface of the log. Assigns LSNs, frames records and hands
//! them to the segment manager.

use crate::config::LogConfig;
use crate::error::Result;

use super::manager::SegmentManager;
use super::record::{LogRecord, Operation};
use super::recovery::WalRecovery;

/// Appends records to the log
///
/// A successful `append` means the frame has been flushed (and, with
/// `SyncMode::Fsync`, synced) before the call returns. Callers must not
/// treat a mutation as committed until then.
pub struct LogWriter {
    segments: SegmentManager,
    /// LSN of the last durable record (0 for an empty log)
    last_lsn: u64,
}

impl LogWriter {
    /// Open or create the log, resuming the LSN counter from disk
    pub fn open(config: LogConfig) -> Result<Self> {
        let segments = SegmentManager::open(&config)?;
        let last_lsn = WalRecovery::last_lsn(&segments.segments()?)?;

        tracing::info!(last_lsn, "log writer ready");
        Ok(Self { segments, last_lsn })
    }

    /// Append an operation and return its LSN
    ///
    /// On failure no LSN is consumed and the log stays appendable, unless
    /// the error is `Poisoned`.
    pub fn append(&mut self, operation: Operation) -> Result<u64> {
        let record = LogRecord::new(self.last_lsn + 1, operation);
        let frame = record.encode()?;

        self.segments.rotate_if_needed(frame.len() as u64)?;
        self.segments.append_frame(&frame)?;

        self.last_lsn = record.lsn;
        tracing::debug!(lsn = record.lsn, bytes = frame.len(), "appended record");
        Ok(record.lsn)
    }

    /// LSN of the last appended record
    pub fn last_lsn(&self) -> u64 {
        self.last_lsn
    }

    /// LSN the next append will get
    pub fn next_lsn(&self) -> u64 {
        self.last_lsn + 1
    }

    /// Sequence number of the active segment
    pub fn active_sequence(&self) -> Result<u32> {
        Ok(self.segments.active()?.sequence())
    }

    pub fn segment_manager(&self) -> &SegmentManager {
        &self.segments
    }

    pub fn close(&mut self) -> Result<()> {
        self.segments.close()
    }
}
