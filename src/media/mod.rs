mod batch;
mod fetch;
mod progress;
mod store;

#[cfg(test)]
pub(crate) mod tests;

pub use batch::{BatchCoordinator, BatchReport, BatchSummary, ItemOutcome};
pub use fetch::{HttpFetcher, MediaFetcher, TempMedia};
pub use progress::{DownloadFailure, DownloadState, DownloadTracker, ProgressSample, TransferId};
pub use store::{AlbumDir, MediaStore};

use std::path::Path;

/// Media result type
pub type Result<T> = std::result::Result<T, MediaError>;

/// Kind of media being saved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Image,
}

impl MediaKind {
    /// Extension used when the URL does not carry one
    #[must_use]
    pub const fn default_extension(self) -> &'static str {
        match self {
            Self::Video => "mp4",
            Self::Image => "jpg",
        }
    }

    /// Album sub-directory for this kind
    #[must_use]
    pub const fn album_dir(self) -> &'static str {
        match self {
            Self::Video => "videos",
            Self::Image => "images",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Image => write!(f, "image"),
        }
    }
}

/// Media download and save errors
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Download failed with HTTP {status}")]
    Http { status: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Another transfer is already running")]
    Busy,

    #[error("Download cancelled")]
    Cancelled,

    #[error("Nothing to save")]
    EmptyBatch,
}

impl MediaError {
    /// Map an IO error on `path`, singling out permission failures
    pub(crate) fn from_io(err: std::io::Error, path: &Path) -> Self {
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            Self::PermissionDenied(path.display().to_string())
        } else {
            Self::Io(err)
        }
    }
}
