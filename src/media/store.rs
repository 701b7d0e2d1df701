use crate::media::{MediaError, MediaKind, Result};
use async_trait::async_trait;
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::info;

/// Device-side destination for saved media (the photo album)
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Check that writes are allowed before any download starts
    async fn authorize(&self) -> Result<()>;

    /// Copy a downloaded file into the store, returning its final location
    async fn persist(&self, file: &Path, kind: MediaKind) -> Result<PathBuf>;
}

/// Album backed by a directory with one sub-directory per media kind
#[derive(Debug, Clone)]
pub struct AlbumDir {
    root: PathBuf,
}

impl AlbumDir {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn target_for(&self, file: &Path, kind: MediaKind) -> PathBuf {
        let ext = file
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(kind.default_extension());
        let stamp = Local::now().format("%Y%m%d-%H%M%S");
        let id = uuid::Uuid::new_v4().simple().to_string();

        self.root
            .join(kind.album_dir())
            .join(format!("{stamp}-{}.{ext}", &id[..8]))
    }
}

#[async_trait]
impl MediaStore for AlbumDir {
    async fn authorize(&self) -> Result<()> {
        for kind in [MediaKind::Video, MediaKind::Image] {
            let dir = self.root.join(kind.album_dir());
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| MediaError::from_io(e, &dir))?;
        }

        let metadata = tokio::fs::metadata(&self.root)
            .await
            .map_err(|e| MediaError::from_io(e, &self.root))?;
        if metadata.permissions().readonly() {
            return Err(MediaError::PermissionDenied(self.root.display().to_string()));
        }

        Ok(())
    }

    async fn persist(&self, file: &Path, kind: MediaKind) -> Result<PathBuf> {
        let target = self.target_for(file, kind);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MediaError::from_io(e, parent))?;
        }

        tokio::fs::copy(file, &target)
            .await
            .map_err(|e| MediaError::from_io(e, &target))?;

        info!("Saved {} to {}", kind, target.display());
        Ok(target)
    }
}
