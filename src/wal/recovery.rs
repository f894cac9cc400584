//! WAL Recovery
//!
//! Scans segments after a crash: finds where the valid frames end, what the
//! last assigned LSN was, and collects records for replay.

use std::path::{Path, PathBuf};

use crate::error::Result;

use super::reader::{FrameRead, FrameReader, LogReader, StopReason};
use super::record::LogRecord;
use super::segment::SegmentInfo;

/// Outcome of scanning one segment file
#[derive(Debug, Clone)]
pub struct SegmentScan {
    pub path: PathBuf,

    /// Length of the valid frame prefix
    pub valid_len: u64,

    /// On-disk length at scan time
    pub file_len: u64,

    /// Number of valid frames
    pub records: u64,

    pub first_lsn: Option<u64>,
    pub last_lsn: Option<u64>,

    /// Why the scan stopped
    pub stop: StopReason,
}

impl SegmentScan {
    /// True if bytes follow the last valid frame
    pub fn has_torn_tail(&self) -> bool {
        self.valid_len < self.file_len
    }
}

/// Result of a recovery pass over a whole log
#[derive(Debug)]
pub struct RecoveryResult {
    /// Number of records successfully recovered
    pub records_recovered: u64,

    /// Number of segment files in the log
    pub segments_scanned: usize,

    /// Last valid LSN (0 for an empty log)
    pub last_lsn: u64,

    /// Why the pass stopped
    pub stop: StopReason,
}

impl RecoveryResult {
    /// True if the log ended on a frame boundary
    pub fn is_clean(&self) -> bool {
        self.stop.is_clean()
    }
}

/// Handles WAL recovery after a crash
pub struct WalRecovery;

impl WalRecovery {
    /// Walk every frame of one segment
    pub fn scan_segment(path: &Path) -> Result<SegmentScan> {
        let file_len = std::fs::metadata(path)?.len();
        let mut reader = FrameReader::open(path)?;
        let mut records = 0;
        let mut first_lsn = None;
        let mut last_lsn = None;

        let stop = loop {
            match reader.next_frame()? {
                FrameRead::Record(record) => {
                    records += 1;
                    if first_lsn.is_none() {
                        first_lsn = Some(record.lsn);
                    }
                    last_lsn = Some(record.lsn);
                }
                FrameRead::End => break StopReason::EndOfLog,
                FrameRead::Stopped(reason) => break reason,
            }
        };

        Ok(SegmentScan {
            path: path.to_path_buf(),
            valid_len: reader.offset(),
            file_len,
            records,
            first_lsn,
            last_lsn,
            stop,
        })
    }

    /// Recover every record of the log, in LSN order
    ///
    /// A torn or corrupt frame ends recovery; it is reported in the result,
    /// not returned as an error.
    pub fn recover(dir: &Path, base_name: &str) -> Result<(Vec<LogRecord>, RecoveryResult)> {
        let mut records = Vec::new();
        let result = Self::replay(dir, base_name, |record| records.push(record))?;
        Ok((records, result))
    }

    /// Check the integrity of the log without keeping records
    pub fn verify(dir: &Path, base_name: &str) -> Result<RecoveryResult> {
        Self::replay(dir, base_name, |_| {})
    }

    /// Last LSN written to the log
    ///
    /// Only the newest segment holding a valid frame is scanned.
    pub fn last_lsn(segments: &[SegmentInfo]) -> Result<u64> {
        for info in segments.iter().rev() {
            if info.first_lsn.is_none() {
                continue;
            }
            if let Some(lsn) = Self::scan_segment(&info.path)?.last_lsn {
                return Ok(lsn);
            }
        }
        Ok(0)
    }

    fn replay(
        dir: &Path,
        base_name: &str,
        mut sink: impl FnMut(LogRecord),
    ) -> Result<RecoveryResult> {
        let reader = LogReader::open(dir, base_name)?;
        let mut replay = reader.records();
        let mut records_recovered = 0;

        for record in replay.by_ref() {
            sink(record?);
            records_recovered += 1;
        }

        let stop = replay
            .stop_reason()
            .cloned()
            .unwrap_or(StopReason::EndOfLog);
        let result = RecoveryResult {
            records_recovered,
            segments_scanned: reader.segments().len(),
            last_lsn: replay.last_lsn().unwrap_or(0),
            stop,
        };

        tracing::info!(
            records = result.records_recovered,
            segments = result.segments_scanned,
            last_lsn = result.last_lsn,
            clean = result.is_clean(),
            "log recovery scan finished"
        );
        Ok(result)
    }
}
