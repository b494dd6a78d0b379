use std::path::PathBuf;
use thiserror::Error;

/// Fatal failures of a cleanup run.
///
/// Every variant aborts the run. The only exception is a deletion failure
/// while pruning under [`crate::core::prune::FailurePolicy::Isolate`], which is
/// reported and collected instead of returned.
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("Not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Unreadable image {}: {source}", .path.display())]
    UnreadableImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("File system error on {}: {source}", .path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Invalid config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Conversion failed: {message}")]
    Conversion { message: String },
}

impl CleanupError {
    /// Wrap an I/O error, promoting `ErrorKind::NotFound` to [`CleanupError::NotFound`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            CleanupError::NotFound { path }
        } else {
            CleanupError::FileSystem { path, source }
        }
    }
}

pub type Result<T> = std::result::Result<T, CleanupError>;
