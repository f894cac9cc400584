//! Log record definitions and frame codec
//!
//! Every append produces exactly one self-validating frame.
//!
//! ## Frame Layout (little-endian)
//! ```text
//! ┌─────────┬─────────┬──────────┬────────┬───────────┬─────┬───────────┬───────┬─────────┐
//! │ Len (4) │ LSN (8) │ Time (8) │ Op (1) │ KeyLen(4) │ Key │ ValLen(4) │ Value │ CRC (4) │
//! └─────────┴─────────┴──────────┴────────┴───────────┴─────┴───────────┴───────┴─────────┘
//!           └──────────────────────── Len bytes ──────────────────────────┘
//! ```
//!
//! The CRC32 covers `Len` and the payload, so a torn write anywhere in the
//! frame is caught.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{LogError, Result};

/// Size of the length prefix
pub const LEN_SIZE: usize = 4;

/// Size of the trailing checksum
pub const CRC_SIZE: usize = 4;

/// Fixed part of the payload: lsn (8) + timestamp (8) + op (1) + key_len (4) + value_len (4)
pub const PAYLOAD_FIXED_SIZE: usize = 25;

/// Bytes a frame adds on top of key and value
pub const FRAME_OVERHEAD: usize = LEN_SIZE + PAYLOAD_FIXED_SIZE + CRC_SIZE;

const OP_PUT: u8 = 0;
const OP_DELETE: u8 = 1;

/// Mutations that can be logged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Put a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },
}

impl Operation {
    /// Shorthand for `Operation::Put`
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Shorthand for `Operation::Delete`
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        Self::Delete { key: key.into() }
    }

    pub fn key(&self) -> &[u8] {
        match self {
            Self::Put { key, .. } | Self::Delete { key } => key,
        }
    }

    /// Value bytes; always empty for a delete
    pub fn value(&self) -> &[u8] {
        match self {
            Self::Put { value, .. } => value,
            Self::Delete { .. } => &[],
        }
    }

    fn op_code(&self) -> u8 {
        match self {
            Self::Put { .. } => OP_PUT,
            Self::Delete { .. } => OP_DELETE,
        }
    }

    /// Reject operations that cannot be framed
    pub fn validate(&self) -> Result<()> {
        if self.key().is_empty() {
            return Err(LogError::InvalidRecord("key must not be empty".to_string()));
        }
        let payload_len = PAYLOAD_FIXED_SIZE + self.key().len() + self.value().len();
        if u32::try_from(payload_len).is_err() {
            return Err(LogError::InvalidRecord(format!(
                "payload of {} bytes does not fit a frame",
                payload_len
            )));
        }
        Ok(())
    }
}

/// A single durable unit of the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Log Sequence Number, assigned by the writer
    pub lsn: u64,

    /// Creation time (unix millis); diagnostics only, the LSN orders records
    pub timestamp: u64,

    /// The logged mutation
    pub operation: Operation,
}

impl LogRecord {
    /// Create a record stamped with the current time
    pub fn new(lsn: u64, operation: Operation) -> Self {
        Self {
            lsn,
            timestamp: now_millis(),
            operation,
        }
    }

    /// Size of this record once framed
    pub fn frame_len(&self) -> usize {
        FRAME_OVERHEAD + self.operation.key().len() + self.operation.value().len()
    }

    /// Encode into a complete frame (length prefix through checksum)
    pub fn encode(&self) -> Result<BytesMut> {
        self.operation.validate()?;

        let key = self.operation.key();
        let value = self.operation.value();
        let payload_len = PAYLOAD_FIXED_SIZE + key.len() + value.len();

        let mut buf = BytesMut::with_capacity(LEN_SIZE + payload_len + CRC_SIZE);
        buf.put_u32_le(payload_len as u32);
        buf.put_u64_le(self.lsn);
        buf.put_u64_le(self.timestamp);
        buf.put_u8(self.operation.op_code());
        buf.put_u32_le(key.len() as u32);
        buf.put_slice(key);
        buf.put_u32_le(value.len() as u32);
        buf.put_slice(value);

        let crc = crc32fast::hash(&buf);
        buf.put_u32_le(crc);

        Ok(buf)
    }

    /// Decode one frame from the front of `bytes`
    ///
    /// Returns the record and the number of bytes consumed. A short buffer
    /// and a bad checksum both surface as `CorruptFrame`.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize)> {
        match decode_frame(bytes) {
            FrameDecode::Complete { record, len } => Ok((record, len)),
            FrameDecode::Incomplete => Err(LogError::CorruptFrame(format!(
                "truncated frame ({} bytes available)",
                bytes.len()
            ))),
            FrameDecode::Corrupt(reason) => Err(LogError::CorruptFrame(reason)),
        }
    }
}

/// Outcome of decoding a frame from a buffer
#[derive(Debug)]
pub(crate) enum FrameDecode {
    /// A valid frame of `len` bytes
    Complete { record: LogRecord, len: usize },

    /// The buffer ends before the frame does
    Incomplete,

    /// The frame is complete but fails validation
    Corrupt(String),
}

/// Read the payload length from a frame header
///
/// `header` must hold at least `LEN_SIZE` bytes.
pub(crate) fn payload_len(mut header: &[u8]) -> usize {
    header.get_u32_le() as usize
}

pub(crate) fn decode_frame(buf: &[u8]) -> FrameDecode {
    if buf.len() < LEN_SIZE {
        return FrameDecode::Incomplete;
    }

    let payload_len = payload_len(buf);
    if payload_len < PAYLOAD_FIXED_SIZE {
        return FrameDecode::Corrupt(format!(
            "payload length {} below minimum {}",
            payload_len, PAYLOAD_FIXED_SIZE
        ));
    }

    let frame_len = LEN_SIZE + payload_len + CRC_SIZE;
    if buf.len() < frame_len {
        return FrameDecode::Incomplete;
    }

    let body = &buf[..LEN_SIZE + payload_len];
    let mut crc_bytes = &buf[LEN_SIZE + payload_len..frame_len];
    let stored_crc = crc_bytes.get_u32_le();
    let computed_crc = crc32fast::hash(body);
    if stored_crc != computed_crc {
        return FrameDecode::Corrupt(format!(
            "checksum mismatch: stored {:#010x}, computed {:#010x}",
            stored_crc, computed_crc
        ));
    }

    let mut payload = &body[LEN_SIZE..];
    let lsn = payload.get_u64_le();
    let timestamp = payload.get_u64_le();
    let op = payload.get_u8();
    let key_len = payload.get_u32_le() as usize;

    if payload.remaining() < key_len + 4 {
        return FrameDecode::Corrupt(format!(
            "key length {} overruns payload of {} bytes",
            key_len, payload_len
        ));
    }
    let key = payload[..key_len].to_vec();
    payload.advance(key_len);

    let value_len = payload.get_u32_le() as usize;
    if payload.remaining() != value_len {
        return FrameDecode::Corrupt(format!(
            "value length {} disagrees with {} remaining payload bytes",
            value_len,
            payload.remaining()
        ));
    }
    let value = payload.to_vec();

    if key.is_empty() {
        return FrameDecode::Corrupt(format!("record {} has an empty key", lsn));
    }

    let operation = match op {
        OP_PUT => Operation::Put { key, value },
        OP_DELETE if value.is_empty() => Operation::Delete { key },
        OP_DELETE => {
            return FrameDecode::Corrupt(format!("delete record {} carries a value", lsn));
        }
        other => {
            return FrameDecode::Corrupt(format!("unknown op code 0x{:02x}", other));
        }
    };

    FrameDecode::Complete {
        record: LogRecord {
            lsn,
            timestamp,
            operation,
        },
        len: frame_len,
    }
}

/// Current wall-clock time in unix millis
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}
