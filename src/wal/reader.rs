//! Log Reader
//!
//! Sequential read-back of the log for a replay consumer.
//!
//! A crash can leave a torn frame at the tail of the last segment. Replay
//! treats the first truncated or invalid frame, or a break in the LSN
//! sequence, as the end of the log and reports why it stopped through
//! [`Replay::stop_reason`].

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::error::Result;

use super::record::{self, FrameDecode, LogRecord, CRC_SIZE, LEN_SIZE, PAYLOAD_FIXED_SIZE};
use super::segment::{discover_segments, SegmentInfo};

/// Why a replay (or a segment scan) stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Every segment was read to its last byte
    EndOfLog,

    /// A frame runs past the end of its file
    TruncatedFrame { segment: PathBuf, offset: u64 },

    /// A complete frame failed validation
    CorruptFrame {
        segment: PathBuf,
        offset: u64,
        reason: String,
    },
}

impl StopReason {
    /// True when the log ended on a frame boundary
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::EndOfLog)
    }
}

/// Result of reading one frame from a segment
#[derive(Debug)]
pub(crate) enum FrameRead {
    Record(LogRecord),
    /// Clean end of this segment
    End,
    Stopped(StopReason),
}

/// What the start of a segment file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SegmentHead {
    /// A valid first frame with this LSN
    Record(u64),
    /// Empty, or the first frame is cut short (never finished writing)
    Blank,
    /// A complete first frame that fails validation
    Corrupt,
}

/// Streams frames out of a single segment file
pub(crate) struct FrameReader {
    path: PathBuf,
    reader: BufReader<File>,
    /// File length when opened; later growth is not read
    file_len: u64,
    /// End of the last valid frame
    offset: u64,
    buf: Vec<u8>,
}

impl FrameReader {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            file_len,
            offset: 0,
            buf: Vec::new(),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes of valid frames read so far
    pub(crate) fn offset(&self) -> u64 {
        self.offset
    }

    pub(crate) fn next_frame(&mut self) -> Result<FrameRead> {
        let remaining = self.file_len - self.offset;
        if remaining == 0 {
            return Ok(FrameRead::End);
        }
        if remaining < LEN_SIZE as u64 {
            return Ok(FrameRead::Stopped(self.truncated()));
        }

        self.buf.resize(LEN_SIZE, 0);
        self.reader.read_exact(&mut self.buf[..LEN_SIZE])?;

        let payload_len = record::payload_len(&self.buf);
        if payload_len >= PAYLOAD_FIXED_SIZE {
            let frame_len = (LEN_SIZE + payload_len + CRC_SIZE) as u64;
            if frame_len > remaining {
                return Ok(FrameRead::Stopped(self.truncated()));
            }
            self.buf.resize(frame_len as usize, 0);
            self.reader.read_exact(&mut self.buf[LEN_SIZE..])?;
        }

        match record::decode_frame(&self.buf) {
            FrameDecode::Complete { record, len } => {
                self.offset += len as u64;
                Ok(FrameRead::Record(record))
            }
            FrameDecode::Incomplete => Ok(FrameRead::Stopped(self.truncated())),
            FrameDecode::Corrupt(reason) => Ok(FrameRead::Stopped(StopReason::CorruptFrame {
                segment: self.path.clone(),
                offset: self.offset,
                reason,
            })),
        }
    }

    /// Classify the first frame of the segment
    pub(crate) fn head(mut self) -> Result<SegmentHead> {
        match self.next_frame()? {
            FrameRead::Record(record) => Ok(SegmentHead::Record(record.lsn)),
            FrameRead::Stopped(StopReason::CorruptFrame { .. }) => Ok(SegmentHead::Corrupt),
            FrameRead::End | FrameRead::Stopped(_) => Ok(SegmentHead::Blank),
        }
    }

    fn truncated(&self) -> StopReason {
        StopReason::TruncatedFrame {
            segment: self.path.clone(),
            offset: self.offset,
        }
    }
}

/// Read-only view of a log directory
pub struct LogReader {
    dir: PathBuf,
    base_name: String,
    segments: Vec<SegmentInfo>,
}

impl LogReader {
    /// Discover the segments of the log `base_name` in `dir`
    pub fn open(dir: impl AsRef<Path>, base_name: &str) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let segments = discover_segments(&dir, base_name)?;
        Ok(Self {
            dir,
            base_name: base_name.to_string(),
            segments,
        })
    }

    /// Segments in replay order
    pub fn segments(&self) -> &[SegmentInfo] {
        &self.segments
    }

    /// Pick up segments created since `open`
    pub fn refresh(&mut self) -> Result<()> {
        self.segments = discover_segments(&self.dir, &self.base_name)?;
        Ok(())
    }

    /// A fresh pass over every record, from the start of the log
    pub fn records(&self) -> Replay {
        Replay {
            segments: self.segments.clone().into_iter(),
            current: None,
            last_lsn: None,
            stop: None,
            failed: false,
        }
    }
}

/// Lazy iterator over the records of a log, in LSN order
pub struct Replay {
    segments: std::vec::IntoIter<SegmentInfo>,
    current: Option<FrameReader>,
    last_lsn: Option<u64>,
    stop: Option<StopReason>,
    /// Set after an I/O error has been yielded
    failed: bool,
}

impl Replay {
    /// Why iteration ended; `None` while records remain or after an I/O error
    pub fn stop_reason(&self) -> Option<&StopReason> {
        self.stop.as_ref()
    }

    /// LSN of the last record yielded
    pub fn last_lsn(&self) -> Option<u64> {
        self.last_lsn
    }

    fn finish(&mut self, reason: StopReason) {
        if !reason.is_clean() {
            tracing::warn!(?reason, last_lsn = ?self.last_lsn, "replay stopped before end of log");
        }
        self.current = None;
        self.stop = Some(reason);
    }
}

impl Iterator for Replay {
    type Item = Result<LogRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stop.is_some() || self.failed {
            return None;
        }

        loop {
            if self.current.is_none() {
                let Some(info) = self.segments.next() else {
                    self.finish(StopReason::EndOfLog);
                    return None;
                };
                match FrameReader::open(&info.path) {
                    Ok(reader) => self.current = Some(reader),
                    Err(e) => {
                        self.failed = true;
                        return Some(Err(e));
                    }
                }
            }
            let reader = self.current.as_mut()?;

            let offset = reader.offset();
            let segment = reader.path().to_path_buf();
            match reader.next_frame() {
                Ok(FrameRead::Record(record)) => {
                    // LSNs are gapless: anything but prev + 1 means lost or stale frames
                    if let Some(prev) = self.last_lsn {
                        if prev.checked_add(1) != Some(record.lsn) {
                            self.finish(StopReason::CorruptFrame {
                                segment,
                                offset,
                                reason: format!("lsn {} does not follow {}", record.lsn, prev),
                            });
                            return None;
                        }
                    }
                    self.last_lsn = Some(record.lsn);
                    return Some(Ok(record));
                }
                Ok(FrameRead::End) => {
                    self.current = None;
                }
                Ok(FrameRead::Stopped(reason)) => {
                    self.finish(reason);
                    return None;
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
