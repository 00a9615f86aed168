//! Error types for cotlog log processing.
//!
//! Every pass reports failures through [`CotLogError`]. Per-event parse
//! failures are normally recovered inside a pass; they only surface here
//! when a pass cannot continue without the event (the time-shift reference).

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias using CotLogError as the error type.
pub type Result<T> = std::result::Result<T, CotLogError>;

/// Hard ceiling for a single output segment, in MiB.
pub const MAX_CHUNK_MIB: u64 = 100;

/// Top-level error type for all cotlog operations.
#[derive(Debug, Error)]
pub enum CotLogError {
    /// Target path is not a regular file (or folder, where one is accepted)
    #[error("{} is not a valid file", path.display())]
    NotAFile { path: PathBuf },

    /// An event fragment could not be parsed where the pass requires it
    #[error("Malformed event at index {index}: {reason}")]
    MalformedEvent { index: usize, reason: String },

    /// A timestamp could not be parsed
    #[error("Invalid time format: {value}")]
    InvalidTimeFormat { value: String },

    /// Requested chunk size above the hard ceiling
    #[error("Maximum file size exceeded: requested {requested_mib} MiB, limit is {max_mib} MiB")]
    SizeLimitExceeded { requested_mib: i64, max_mib: u64 },

    /// Requested chunk size of zero or less
    #[error("Invalid chunk size: {requested_mib} MiB (must be at least 1)")]
    InvalidChunkSize { requested_mib: i64 },

    /// No events in a file that needs at least one
    #[error("No events found in the file: {}", path.display())]
    EmptyStream { path: PathBuf },

    /// Writing a table artifact failed
    #[error("Failed to export {}: {reason}", path.display())]
    Export { path: PathBuf, reason: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CotLogError {
    /// Creates a not-a-file error.
    pub fn not_a_file(path: impl AsRef<Path>) -> Self {
        Self::NotAFile {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Creates an invalid time format error.
    pub fn invalid_time(value: impl Into<String>) -> Self {
        Self::InvalidTimeFormat {
            value: value.into(),
        }
    }

    /// Creates an empty stream error.
    pub fn empty_stream(path: impl AsRef<Path>) -> Self {
        Self::EmptyStream {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Creates an export error from any displayable cause.
    pub fn export(path: impl AsRef<Path>, reason: impl std::fmt::Display) -> Self {
        Self::Export {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Returns true if the operation was refused before any input was read.
    pub fn is_input_rejection(&self) -> bool {
        matches!(
            self,
            CotLogError::NotAFile { .. }
                | CotLogError::SizeLimitExceeded { .. }
                | CotLogError::InvalidChunkSize { .. }
                | CotLogError::InvalidTimeFormat { .. }
        )
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    /// Invalid configuration format
    #[error("Invalid configuration format: {reason}")]
    InvalidFormat { reason: String },

    /// Invalid value for a configuration field
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_a_file_message() {
        let err = CotLogError::not_a_file("/tmp/missing.xml");
        assert_eq!(err.to_string(), "/tmp/missing.xml is not a valid file");
        assert!(err.is_input_rejection());
    }

    #[test]
    fn test_size_limit_message() {
        let err = CotLogError::SizeLimitExceeded {
            requested_mib: 250,
            max_mib: MAX_CHUNK_MIB,
        };
        let display = err.to_string();
        assert!(display.contains("250"));
        assert!(display.contains("100"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: CotLogError = io_err.into();
        assert!(matches!(err, CotLogError::Io(_)));
        assert!(!err.is_input_rejection());
    }

    #[test]
    fn test_config_error_conversion() {
        let err: CotLogError = ConfigError::invalid_value("processing.progress_interval", "zero").into();
        assert!(matches!(err, CotLogError::Config(ConfigError::InvalidValue { .. })));
    }
}
