use thiserror::Error;

use crate::photos::ServiceError;

/// Typed download errors enabling retry classification.
///
/// Remote failures are retryable when the service error is transient;
/// disk failures never are.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Remote error downloading {path}: {source}")]
    Remote {
        source: ServiceError,
        path: String,
        bytes_written: u64,
    },

    #[error("Disk error writing {path}: {source}")]
    Disk {
        source: std::io::Error,
        path: String,
    },
}

impl DownloadError {
    pub(crate) fn remote(source: ServiceError, path: &std::path::Path, bytes_written: u64) -> Self {
        DownloadError::Remote {
            source,
            path: path.display().to_string(),
            bytes_written,
        }
    }

    pub(crate) fn disk(source: std::io::Error, path: &std::path::Path) -> Self {
        DownloadError::Disk {
            source,
            path: path.display().to_string(),
        }
    }

    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            DownloadError::Remote { source, .. } => source.is_transient(),
            DownloadError::Disk { .. } => false,
        }
    }
}
