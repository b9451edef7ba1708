//! Error types and handling for cbor2json
//!
//! The conversion core never fails in its default mode; everything here
//! belongs to the collaborators around it: reading input, decoding bytes,
//! loading configuration and writing JSON.

use crate::convert::ConvertError;
use crate::decode::{DecodeError, DecodeFailure};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cbor2json operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Error types for cbor2json operations
#[derive(Error, Debug)]
pub enum CliError {
    // ═══════════════════════════════════════════════════════════════
    // Input Errors
    // ═══════════════════════════════════════════════════════════════
    /// Requested offset lies beyond the end of the input file
    #[error("offset {offset} is larger than file {} {len}", path.display())]
    OffsetOutOfRange {
        /// Requested offset
        offset: usize,
        /// Input file
        path: PathBuf,
        /// File length in bytes
        len: usize,
    },

    /// The input is not a well-formed CBOR data item
    #[error(
        "There was an error while reading the input near byte {} (read {read} bytes in total): {source}",
        source.position()
    )]
    Decode {
        /// Bytes consumed before decoding stopped
        read: usize,
        /// Decoder diagnostic
        source: DecodeError,
    },

    // ═══════════════════════════════════════════════════════════════
    // Conversion Errors
    // ═══════════════════════════════════════════════════════════════
    /// Strict key mode found a duplicate object key
    #[error("Conversion failed: {0}")]
    Convert(#[from] ConvertError),

    // ═══════════════════════════════════════════════════════════════
    // Configuration & File Errors
    // ═══════════════════════════════════════════════════════════════
    /// Failed to read configuration file
    #[error("Failed to read config from {}: {reason}", path.display())]
    ConfigRead {
        /// Config file
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// File operation failed
    #[error("File operation failed: {}: {reason}", path.display())]
    FileError {
        /// File involved
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// Permission denied
    #[error("Permission denied: {}", path.display())]
    PermissionDenied {
        /// File involved
        path: PathBuf,
    },

    // ═══════════════════════════════════════════════════════════════
    // Output Errors
    // ═══════════════════════════════════════════════════════════════
    /// Failed to serialize the JSON result
    #[error("Serialization failed: {0}")]
    SerializationError(String),
}

impl CliError {
    /// Get the exit code for this error
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::OffsetOutOfRange { .. } => 2,
            Self::Decode { .. } => 3,
            Self::Convert(_) => 4,
            Self::PermissionDenied { .. } => 13,
            _ => 1,
        }
    }

    /// Attach `path` to an I/O failure
    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::FileError {
                path,
                reason: "Not found".to_string(),
            },
            _ => Self::FileError {
                path,
                reason: err.to_string(),
            },
        }
    }
}

impl From<DecodeFailure> for CliError {
    fn from(failure: DecodeFailure) -> Self {
        Self::Decode {
            read: failure.read,
            source: failure.error,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::io("<unknown>", &err)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            Self::FileError {
                path: PathBuf::from("<output>"),
                reason: err.to_string(),
            }
        } else {
            Self::SerializationError(err.to_string())
        }
    }
}
