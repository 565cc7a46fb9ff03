//! Error type for local (non-HTTP) failures.
//!
//! Backend calls have their own typed result, see [`crate::api::ApiError`].

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// File system failure while reading or writing local state
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stored JSON could not be parsed or produced
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local configuration problem (no config dir, bad URL, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input rejected before anything was sent to the backend
    #[error("{0}")]
    Validation(String),
}

impl CoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
