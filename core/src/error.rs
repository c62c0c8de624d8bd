//! Error types for the index builder.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = IndexError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum IndexError {
    /// A source document is unreadable or not valid UTF-8 text
    #[error("failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Invalid site configuration or exclude pattern
    #[error("invalid configuration: {0}")]
    Config(String),
    /// A persisted index artifact could not be decoded
    #[error("malformed index artifact {}: {reason}", path.display())]
    Format { path: PathBuf, reason: String },
    #[error("failed to encode index: {0}")]
    Encode(String),
}

impl IndexError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IndexError::Io { path: path.into(), source }
    }

    /// Path of the file that caused the error, when there is one.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            IndexError::Parse { path, .. }
            | IndexError::Io { path, .. }
            | IndexError::Format { path, .. } => Some(path),
            IndexError::Config(_) | IndexError::Encode(_) => None,
        }
    }
}
