//! Log Segments
//!
//! One segment is one physical file named `{base_name}.{sequence:06}` holding
//! an ordered run of frames. Only the active segment is ever written.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::{SyncMode, MAX_SEQUENCE_LIMIT};
use crate::error::{LogError, Result};

use super::lock::Locker;
use super::reader::{FrameReader, SegmentHead};

/// Width of the zero-padded sequence suffix
pub const SEQUENCE_WIDTH: usize = 6;

/// File name of segment `sequence`
pub fn segment_file_name(base_name: &str, sequence: u32) -> String {
    format!("{}.{:0width$}", base_name, sequence, width = SEQUENCE_WIDTH)
}

/// Parse the sequence out of a segment file name, if it is one of ours
pub fn parse_segment_sequence(base_name: &str, file_name: &str) -> Option<u32> {
    let suffix = file_name.strip_prefix(base_name)?.strip_prefix('.')?;
    if suffix.len() != SEQUENCE_WIDTH || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// A segment file found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentInfo {
    pub sequence: u32,
    pub path: PathBuf,
    /// On-disk size at discovery time
    pub size: u64,
    /// LSN of the first frame, `None` when that frame is missing, torn or corrupt
    pub first_lsn: Option<u64>,
}

/// List the segments in `dir`, oldest first
///
/// Assumes rotation wraps at `MAX_SEQUENCE_LIMIT`; see
/// [`discover_segments_wrapping`].
pub fn discover_segments(dir: &Path, base_name: &str) -> Result<Vec<SegmentInfo>> {
    discover_segments_wrapping(dir, base_name, MAX_SEQUENCE_LIMIT)
}

/// List the segments in `dir`, oldest first, for a log wrapping after `max_sequence`
///
/// Segments are written in sequence order, wrapping back to 0 after
/// `max_sequence`. The valid segment with the highest first LSN is the
/// newest; the order runs cyclically by sequence up to it. A segment that
/// directly follows the newest one and holds no finished frame yet (empty,
/// or its first frame cut short) is the one a crash interrupted, so it goes
/// last. Any other segment keeps its place by sequence, whatever its
/// contents, so replay stops at it instead of skipping it.
pub fn discover_segments_wrapping(
    dir: &Path,
    base_name: &str,
    max_sequence: u32,
) -> Result<Vec<SegmentInfo>> {
    let scan_err = |source: io::Error| LogError::DirectoryScan {
        path: dir.to_path_buf(),
        source,
    };

    let mut found = Vec::new();
    for entry in fs::read_dir(dir).map_err(scan_err)? {
        let entry = entry.map_err(scan_err)?;
        let file_name = entry.file_name();
        let Some(sequence) = file_name
            .to_str()
            .and_then(|name| parse_segment_sequence(base_name, name))
        else {
            continue;
        };

        let metadata = entry.metadata().map_err(scan_err)?;
        if !metadata.is_file() {
            continue;
        }

        let path = entry.path();
        let head = FrameReader::open(&path)?.head()?;
        tracing::debug!(segment = %path.display(), size = metadata.len(), ?head, "discovered segment");

        let first_lsn = match head {
            SegmentHead::Record(lsn) => Some(lsn),
            SegmentHead::Blank | SegmentHead::Corrupt => None,
        };
        found.push((
            SegmentInfo {
                sequence,
                path,
                size: metadata.len(),
                first_lsn,
            },
            head,
        ));
    }

    Ok(replay_order(found, max_sequence))
}

fn replay_order(
    mut found: Vec<(SegmentInfo, SegmentHead)>,
    max_sequence: u32,
) -> Vec<SegmentInfo> {
    if found.is_empty() {
        return Vec::new();
    }
    found.sort_by_key(|(info, _)| info.sequence);

    let newest = found
        .iter()
        .enumerate()
        .filter_map(|(i, (info, _))| info.first_lsn.map(|lsn| (lsn, i)))
        .max()
        .map(|(_, i)| i);

    let last = match newest {
        // Nothing readable: plain sequence order
        None => found.len() - 1,
        Some(i) => {
            let anchor = found[i].0.sequence;
            let (follower, follows) = if i + 1 < found.len() {
                (i + 1, found[i + 1].0.sequence == anchor + 1)
            } else {
                (0, found.len() > 1 && anchor >= max_sequence && found[0].0.sequence == 0)
            };
            if follows && found[follower].1 == SegmentHead::Blank {
                follower
            } else {
                i
            }
        }
    };

    let len = found.len();
    found.rotate_left((last + 1) % len);
    found.into_iter().map(|(info, _)| info).collect()
}

/// An open, locked segment owned by the writer
///
/// The lock is held from `open` until `close` or drop.
pub struct Segment {
    sequence: u32,
    path: PathBuf,
    /// Bytes known to be on disk
    size: u64,
    /// `None` once closed
    writer: Option<BufWriter<File>>,
    /// Set when a failed append could not be undone
    poisoned: bool,
}

impl Segment {
    /// Open (creating if absent) and lock segment `sequence` in `dir`
    pub fn open(dir: &Path, base_name: &str, sequence: u32) -> Result<Self> {
        let path = dir.join(segment_file_name(base_name, sequence));
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;

        Locker::acquire(&file, &path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            sequence,
            path,
            size,
            writer: Some(BufWriter::new(file)),
            poisoned: false,
        })
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    /// Write one frame and push it to disk before returning
    ///
    /// On failure the file is cut back to its previous size so a later
    /// append starts on a frame boundary.
    pub fn append(&mut self, frame: &[u8], sync_mode: SyncMode) -> Result<()> {
        if self.poisoned {
            return Err(LogError::Poisoned(format!(
                "segment {} has an unrecoverable partial write",
                self.path.display()
            )));
        }
        let writer = self.writer.as_mut().ok_or(LogError::Closed)?;

        match write_through(writer, frame, sync_mode) {
            Ok(()) => {
                self.size += frame.len() as u64;
                Ok(())
            }
            Err(e) => Err(self.rollback(e)),
        }
    }

    /// Cut the file back to `len` bytes (drops a torn tail)
    pub fn truncate(&mut self, len: u64) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(LogError::Closed)?;
        writer.flush()?;
        let file = writer.get_ref();
        file.set_len(len)?;
        file.sync_all()?;
        self.size = len;
        Ok(())
    }

    /// Flush, sync and unlock; later calls are no-ops
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            let file = writer.get_ref();
            file.sync_all()?;
            Locker::release(file)?;
            tracing::debug!(segment = %self.path.display(), size = self.size, "closed segment");
        }
        Ok(())
    }

    fn rollback(&mut self, cause: io::Error) -> LogError {
        let Some(writer) = self.writer.take() else {
            return LogError::Io(cause);
        };

        // Drop whatever is still buffered; it belongs to the failed frame.
        let (file, _unwritten) = writer.into_parts();
        let restored = file.set_len(self.size);
        self.writer = Some(BufWriter::new(file));

        match restored {
            Ok(()) => {
                tracing::warn!(segment = %self.path.display(), error = %cause, "append failed, rolled back");
                LogError::Io(cause)
            }
            Err(e) => {
                self.poisoned = true;
                LogError::Poisoned(format!(
                    "append to {} failed ({}) and rollback failed ({})",
                    self.path.display(),
                    cause,
                    e
                ))
            }
        }
    }
}

impl Drop for Segment {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            let (file, _unwritten) = writer.into_parts();
            let _ = Locker::release(&file);
        }
    }
}

fn write_through(writer: &mut BufWriter<File>, frame: &[u8], sync_mode: SyncMode) -> io::Result<()> {
    writer.write_all(frame)?;
    writer.flush()?;
    if sync_mode == SyncMode::Fsync {
        writer.get_ref().sync_data()?;
    }
    Ok(())
}
