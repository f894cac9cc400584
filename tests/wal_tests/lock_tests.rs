//! Tests for the segment Locker
//!
//! These tests verify:
//! - Exclusive, non-blocking acquisition
//! - Release makes the file lockable again
//! - Release is safe to repeat
//! - Segments hold their lock until closed or dropped

use std::fs::{File, OpenOptions};
use std::path::PathBuf;

use boltlog::wal::{Locker, Segment};
use boltlog::LogError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_file() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("boltbin.000000");
    File::create(&path).unwrap();
    (temp_dir, path)
}

fn open_rw(path: &PathBuf) -> File {
    OpenOptions::new().read(true).write(true).open(path).unwrap()
}

// =============================================================================
// Locker Tests
// =============================================================================

#[test]
fn test_acquire_on_free_file() {
    let (_temp, path) = setup_temp_file();
    let file = open_rw(&path);

    Locker::acquire(&file, &path).unwrap();
    Locker::release(&file).unwrap();
}

#[test]
fn test_second_handle_fails_fast() {
    let (_temp, path) = setup_temp_file();
    let first = open_rw(&path);
    let second = open_rw(&path);

    Locker::acquire(&first, &path).unwrap();

    let result = Locker::acquire(&second, &path);
    assert!(matches!(result, Err(LogError::LockHeld { .. })));
}

#[test]
fn test_release_allows_reacquire() {
    let (_temp, path) = setup_temp_file();
    let first = open_rw(&path);
    let second = open_rw(&path);

    Locker::acquire(&first, &path).unwrap();
    Locker::release(&first).unwrap();

    Locker::acquire(&second, &path).unwrap();
}

#[test]
fn test_release_is_idempotent() {
    let (_temp, path) = setup_temp_file();
    let file = open_rw(&path);

    Locker::acquire(&file, &path).unwrap();
    Locker::release(&file).unwrap();
    Locker::release(&file).unwrap();

    // Never-locked handle
    let other = open_rw(&path);
    Locker::release(&other).unwrap();
}

#[test]
fn test_closing_handle_releases_lock() {
    let (_temp, path) = setup_temp_file();

    {
        let file = open_rw(&path);
        Locker::acquire(&file, &path).unwrap();
    }

    let file = open_rw(&path);
    Locker::acquire(&file, &path).unwrap();
}

// =============================================================================
// Segment Lock Scope Tests
// =============================================================================

#[test]
fn test_segment_holds_lock_while_open() {
    let temp = TempDir::new().unwrap();

    let _segment = Segment::open(temp.path(), "boltbin", 3).unwrap();

    let result = Segment::open(temp.path(), "boltbin", 3);
    assert!(matches!(result, Err(LogError::LockHeld { .. })));
}

#[test]
fn test_segment_close_releases_lock() {
    let temp = TempDir::new().unwrap();

    let mut segment = Segment::open(temp.path(), "boltbin", 0).unwrap();
    segment.close().unwrap();
    assert!(segment.is_closed());

    // Second close is a no-op
    segment.close().unwrap();

    Segment::open(temp.path(), "boltbin", 0).unwrap();
}

#[test]
fn test_segment_drop_releases_lock() {
    let temp = TempDir::new().unwrap();

    {
        let _segment = Segment::open(temp.path(), "boltbin", 0).unwrap();
    }

    Segment::open(temp.path(), "boltbin", 0).unwrap();
}
