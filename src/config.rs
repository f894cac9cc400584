//! Configuration for boltlog
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{LogError, Result};

/// Largest sequence number that fits the 6-digit file name suffix
pub const MAX_SEQUENCE_LIMIT: u32 = 999_999;

/// Configuration for an open log
#[derive(Debug, Clone)]
pub struct LogConfig {
    // -------------------------------------------------------------------------
    // Layout
    // -------------------------------------------------------------------------
    /// Directory holding the segment files
    /// Internal structure:
    ///   {dir}/
    ///     ├── {base_name}.000000
    ///     ├── {base_name}.000001
    ///     └── ...
    pub dir: PathBuf,

    /// File name prefix shared by every segment
    pub base_name: String,

    // -------------------------------------------------------------------------
    // Rotation
    // -------------------------------------------------------------------------
    /// Rotation trigger (in bytes)
    pub max_segment_size: u64,

    /// Sequence number after which rotation wraps back to 0
    pub max_sequence: u32,

    // -------------------------------------------------------------------------
    // Durability
    // -------------------------------------------------------------------------
    /// What "flushed" means for each append
    pub sync_mode: SyncMode,
}

/// How far each append pushes its bytes before returning
///
/// Both modes flush on every append; there is no write-behind batching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Flush the buffered writer, then fsync the segment (safest)
    Fsync,

    /// Flush the buffered writer to the OS only (survives process crash, not power loss)
    Flush,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            base_name: "boltbin".to_string(),
            max_segment_size: 1024 * 1024, // 1 MB
            max_sequence: MAX_SEQUENCE_LIMIT,
            sync_mode: SyncMode::Fsync,
        }
    }
}

impl LogConfig {
    /// Create a new config builder
    pub fn builder() -> LogConfigBuilder {
        LogConfigBuilder::default()
    }

    /// Check the config before any file is touched
    pub fn validate(&self) -> Result<()> {
        if self.base_name.is_empty() {
            return Err(LogError::Config("base name must not be empty".to_string()));
        }
        if self.base_name.contains(|c| c == '/' || c == '\\') {
            return Err(LogError::Config(format!(
                "base name must not contain path separators: {:?}",
                self.base_name
            )));
        }
        if self.max_segment_size == 0 {
            return Err(LogError::Config(
                "max segment size must be greater than zero".to_string(),
            ));
        }
        if self.max_sequence > MAX_SEQUENCE_LIMIT {
            return Err(LogError::Config(format!(
                "max sequence {} does not fit in 6 digits",
                self.max_sequence
            )));
        }
        Ok(())
    }
}

/// Builder for LogConfig
#[derive(Default)]
pub struct LogConfigBuilder {
    config: LogConfig,
}

impl LogConfigBuilder {
    /// Set the log directory
    pub fn dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.dir = path.into();
        self
    }

    /// Set the segment file name prefix
    pub fn base_name(mut self, name: impl Into<String>) -> Self {
        self.config.base_name = name.into();
        self
    }

    /// Set the maximum segment size (in bytes)
    pub fn max_segment_size(mut self, size: u64) -> Self {
        self.config.max_segment_size = size;
        self
    }

    /// Set the sequence number at which rotation wraps to 0
    pub fn max_sequence(mut self, seq: u32) -> Self {
        self.config.max_sequence = seq;
        self
    }

    /// Set the sync mode
    pub fn sync_mode(mut self, mode: SyncMode) -> Self {
        self.config.sync_mode = mode;
        self
    }

    pub fn build(self) -> LogConfig {
        self.config
    }
}
