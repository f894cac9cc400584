//! Segment Manager
//!
//! Owns the active segment of a log directory.
//!
//! ## Responsibilities
//! - Discover existing segments on open and pick the active one
//! - Drop a torn tail left on the active segment by a crash
//! - Rotate to a fresh segment when the size bound would be exceeded
//! - Hold the active segment's lock from open to close

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{LogConfig, SyncMode};
use crate::error::{LogError, Result};

use super::recovery::WalRecovery;
use super::segment::{discover_segments_wrapping, Segment, SegmentInfo};

/// Manages the segment files of one log
///
/// Single-writer: every mutating method takes `&mut self`, so no append can
/// interleave with a rotation.
pub struct SegmentManager {
    dir: PathBuf,
    base_name: String,
    max_segment_size: u64,
    max_sequence: u32,
    sync_mode: SyncMode,
    /// `None` once closed
    active: Option<Segment>,
}

impl SegmentManager {
    /// Open the log described by `config`
    ///
    /// On open:
    /// 1. Create the directory if it doesn't exist
    /// 2. Pick the newest segment (or sequence 000000) and lock it; older
    ///    segments are never opened for writing
    /// 3. Truncate a torn tail on that segment
    /// 4. Rotate right away if it is already over the size bound
    pub fn open(config: &LogConfig) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.dir)?;

        let segments =
            discover_segments_wrapping(&config.dir, &config.base_name, config.max_sequence)?;
        let candidate = segments.last().map_or(0, |s| s.sequence);

        // Lock before touching anything so a second writer fails cleanly.
        let mut active = Segment::open(&config.dir, &config.base_name, candidate)?;

        let scan = WalRecovery::scan_segment(active.path())?;
        if scan.has_torn_tail() {
            tracing::warn!(
                segment = %active.path().display(),
                valid_len = scan.valid_len,
                file_len = scan.file_len,
                stop = ?scan.stop,
                "truncating torn tail of active segment"
            );
            active.truncate(scan.valid_len)?;
        }

        let mut manager = Self {
            dir: config.dir.clone(),
            base_name: config.base_name.clone(),
            max_segment_size: config.max_segment_size,
            max_sequence: config.max_sequence,
            sync_mode: config.sync_mode,
            active: Some(active),
        };

        if manager.active()?.size() > manager.max_segment_size {
            manager.rotate()?;
        }

        let active = manager.active()?;
        tracing::info!(
            dir = %manager.dir.display(),
            segment = active.sequence(),
            size = active.size(),
            "opened log"
        );
        Ok(manager)
    }

    /// The segment currently appended to
    pub fn active(&self) -> Result<&Segment> {
        self.active.as_ref().ok_or(LogError::Closed)
    }

    fn active_mut(&mut self) -> Result<&mut Segment> {
        self.active.as_mut().ok_or(LogError::Closed)
    }

    /// Rotate if `pending` more bytes would push the active segment past the bound
    ///
    /// An empty segment always takes the write, however large.
    pub fn rotate_if_needed(&mut self, pending: u64) -> Result<bool> {
        let size = self.active()?.size();
        if size == 0 || size + pending <= self.max_segment_size {
            return Ok(false);
        }
        self.rotate()?;
        Ok(true)
    }

    /// Write one already-encoded frame to the active segment and flush it
    ///
    /// Low-level: no LSN is assigned or checked and no rotation happens.
    /// Appending through [`LogWriter`](super::LogWriter) keeps the LSN
    /// sequence gapless; frames written here must continue it themselves.
    pub fn append_frame(&mut self, frame: &[u8]) -> Result<()> {
        let sync_mode = self.sync_mode;
        self.active_mut()?.append(frame, sync_mode)
    }

    /// Flush, unlock and close the active segment; later calls are no-ops
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut active) = self.active.take() {
            active.close()?;
            tracing::info!(segment = active.sequence(), "closed log");
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.active.is_none()
    }

    /// Segments currently on disk, oldest first
    pub fn segments(&self) -> Result<Vec<SegmentInfo>> {
        discover_segments_wrapping(&self.dir, &self.base_name, self.max_sequence)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Sequence that follows `sequence`, wrapping after `max_sequence`
    pub fn next_sequence(&self, sequence: u32) -> u32 {
        if sequence >= self.max_sequence {
            0
        } else {
            sequence + 1
        }
    }

    /// Switch to the next segment
    ///
    /// The next segment is opened and locked before the current one is
    /// retired, so a failed rotation leaves the current segment active.
    fn rotate(&mut self) -> Result<()> {
        let current = self.active()?.sequence();
        let next = self.next_sequence(current);

        let fresh = Segment::open(&self.dir, &self.base_name, next)?;
        if fresh.size() > 0 {
            return Err(LogError::SegmentOccupied {
                path: fresh.path().to_path_buf(),
            });
        }

        if let Some(mut retired) = self.active.replace(fresh) {
            retired.close()?;
        }

        tracing::info!(from = current, to = next, "rotated log segment");
        Ok(())
    }
}
