//! Tests for log record framing
//!
//! These tests verify:
//! - Frame layout and size
//! - Encode/decode for both operation types
//! - CRC32 corruption detection
//! - Truncated and malformed frames
//! - Validation of records before they are framed

use boltlog::wal::{LogRecord, Operation, FRAME_OVERHEAD};
use boltlog::LogError;

// =============================================================================
// Encode/Decode Tests
// =============================================================================

#[test]
fn test_encode_decode_put() {
    let record = LogRecord::new(1, Operation::put("hello", "world"));

    let bytes = record.encode().unwrap();
    let (decoded, consumed) = LogRecord::decode(&bytes).unwrap();

    assert_eq!(decoded, record);
    assert_eq!(consumed, bytes.len());
}

#[test]
fn test_encode_decode_delete() {
    let record = LogRecord::new(42, Operation::delete("mykey"));

    let bytes = record.encode().unwrap();
    let (decoded, _) = LogRecord::decode(&bytes).unwrap();

    assert_eq!(decoded, record);
    assert!(decoded.operation.value().is_empty());
}

#[test]
fn test_put_with_empty_value() {
    let record = LogRecord::new(7, Operation::put("key_with_empty_value", Vec::<u8>::new()));

    let bytes = record.encode().unwrap();
    let (decoded, _) = LogRecord::decode(&bytes).unwrap();

    assert_eq!(decoded.operation, Operation::put("key_with_empty_value", Vec::<u8>::new()));
}

#[test]
fn test_large_value() {
    let large_value = vec![0xAB; 1024 * 1024]; // 1 MB value
    let record = LogRecord::new(999, Operation::put("big_key", large_value.clone()));

    let bytes = record.encode().unwrap();
    let (decoded, _) = LogRecord::decode(&bytes).unwrap();

    if let Operation::Put { key, value } = decoded.operation {
        assert_eq!(key, b"big_key");
        assert_eq!(value, large_value);
    } else {
        panic!("Expected Put operation");
    }
}

#[test]
fn test_timestamp_and_lsn_preserved() {
    for lsn in [0, 1, u64::MAX, 12345678901234] {
        let record = LogRecord {
            lsn,
            timestamp: 1_700_000_000_123,
            operation: Operation::delete("key"),
        };
        let bytes = record.encode().unwrap();
        let (decoded, _) = LogRecord::decode(&bytes).unwrap();

        assert_eq!(decoded.lsn, lsn);
        assert_eq!(decoded.timestamp, 1_700_000_000_123);
    }
}

#[test]
fn test_decode_consumes_one_frame() {
    let first = LogRecord::new(1, Operation::put("a", "1"));
    let second = LogRecord::new(2, Operation::delete("a"));

    let mut bytes = first.encode().unwrap().to_vec();
    bytes.extend_from_slice(&second.encode().unwrap());

    let (decoded, consumed) = LogRecord::decode(&bytes).unwrap();
    assert_eq!(decoded, first);

    let (decoded, _) = LogRecord::decode(&bytes[consumed..]).unwrap();
    assert_eq!(decoded, second);
}

// =============================================================================
// Frame Layout Tests
// =============================================================================

#[test]
fn test_frame_len_matches_encoding() {
    let record = LogRecord::new(1, Operation::put("test_key", "test_value"));

    let bytes = record.encode().unwrap();

    assert_eq!(bytes.len(), record.frame_len());
    assert_eq!(bytes.len(), FRAME_OVERHEAD + 8 + 10);
}

#[test]
fn test_frame_header_fields() {
    let record = LogRecord {
        lsn: 5,
        timestamp: 9,
        operation: Operation::delete("k"),
    };

    let bytes = record.encode().unwrap();

    // Length prefix covers everything between itself and the CRC
    let len = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
    assert_eq!(len, bytes.len() - 8);
    assert_eq!(u64::from_le_bytes(bytes[4..12].try_into().unwrap()), 5);
    assert_eq!(u64::from_le_bytes(bytes[12..20].try_into().unwrap()), 9);
    assert_eq!(bytes[20], 1); // Delete
}

// =============================================================================
// Corruption Detection Tests
// =============================================================================

#[test]
fn test_crc_corruption_detected() {
    let record = LogRecord::new(1, Operation::put("key", "value"));
    let mut bytes = record.encode().unwrap();

    // Corrupt a byte in the value
    let idx = bytes.len() - 6;
    bytes[idx] ^= 0xFF;

    let result = LogRecord::decode(&bytes);
    assert!(matches!(result.unwrap_err(), LogError::CorruptFrame(_)));
}

#[test]
fn test_corrupt_checksum_detected() {
    let record = LogRecord::new(1, Operation::put("key", "value"));
    let mut bytes = record.encode().unwrap();

    if let Some(byte) = bytes.last_mut() {
        *byte ^= 0xFF;
    }

    assert!(matches!(
        LogRecord::decode(&bytes).unwrap_err(),
        LogError::CorruptFrame(_)
    ));
}

#[test]
fn test_corrupt_lsn_detected() {
    let record = LogRecord::new(1, Operation::put("key", "value"));
    let mut bytes = record.encode().unwrap();

    bytes[4] ^= 0x01;

    assert!(LogRecord::decode(&bytes).is_err());
}

#[test]
fn test_truncated_frame() {
    let record = LogRecord::new(1, Operation::delete("key"));
    let bytes = record.encode().unwrap();

    for cut in [1, 4, 10, bytes.len() - 1] {
        let result = LogRecord::decode(&bytes[..cut]);
        assert!(
            matches!(result, Err(LogError::CorruptFrame(_))),
            "cut at {} should not decode",
            cut
        );
    }
}

#[test]
fn test_empty_buffer() {
    let bytes: [u8; 0] = [];
    assert!(LogRecord::decode(&bytes).is_err());
}

#[test]
fn test_zeroed_buffer_is_corrupt() {
    let bytes = [0u8; 64];
    assert!(matches!(
        LogRecord::decode(&bytes).unwrap_err(),
        LogError::CorruptFrame(_)
    ));
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_empty_key_rejected() {
    let record = LogRecord::new(1, Operation::put(Vec::<u8>::new(), "value"));

    let result = record.encode();
    assert!(matches!(result.unwrap_err(), LogError::InvalidRecord(_)));
}

#[test]
fn test_operation_accessors() {
    let put = Operation::put("k", "v");
    assert_eq!(put.key(), b"k");
    assert_eq!(put.value(), b"v");

    let delete = Operation::delete("k");
    assert_eq!(delete.key(), b"k");
    assert_eq!(delete.value(), b"");
}
