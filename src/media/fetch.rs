use crate::media::{MediaError, MediaKind, ProgressSample, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// A downloaded file waiting to be persisted. Deleted on drop.
#[derive(Debug)]
pub struct TempMedia {
    path: TempPath,
    bytes: u64,
}

impl TempMedia {
    #[must_use]
    pub fn new(path: TempPath, bytes: u64) -> Self {
        Self { path, bytes }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn len(&self) -> u64 {
        self.bytes
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes == 0
    }
}

/// Downloads a remote resource to a local temp file
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Fetch `url`, reporting every received chunk through `progress`
    async fn fetch(
        &self,
        url: &str,
        kind: MediaKind,
        progress: &(dyn Fn(ProgressSample) + Send + Sync),
    ) -> Result<TempMedia>;
}

/// Streams media over HTTP into the temp directory
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    temp_dir: PathBuf,
}

impl HttpFetcher {
    #[must_use]
    pub fn new(client: Client, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            temp_dir: temp_dir.into(),
        }
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        kind: MediaKind,
        progress: &(dyn Fn(ProgressSample) + Send + Sync),
    ) -> Result<TempMedia> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(MediaError::Http {
                status: response.status().as_u16(),
            });
        }

        let expected = response.content_length().unwrap_or(0);

        tokio::fs::create_dir_all(&self.temp_dir)
            .await
            .map_err(|e| MediaError::from_io(e, &self.temp_dir))?;

        let suffix = format!(".{}", extension_for(url, kind));
        let temp_path = tempfile::Builder::new()
            .prefix("nomark-")
            .suffix(&suffix)
            .tempfile_in(&self.temp_dir)
            .map_err(|e| MediaError::from_io(e, &self.temp_dir))?
            .into_temp_path();

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&temp_path)
            .await?;

        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            progress(ProgressSample::from_bytes(written, expected));
        }
        file.flush().await?;

        debug!("Fetched {} bytes from {}", written, url);

        Ok(TempMedia::new(temp_path, written))
    }
}

/// File extension taken from the URL path, falling back to the kind's default
#[must_use]
pub fn extension_for(url: &str, kind: MediaKind) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            let last = u.path_segments()?.next_back()?.to_string();
            let (_, ext) = last.rsplit_once('.')?;
            let valid = (1..=5).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric());
            valid.then(|| ext.to_ascii_lowercase())
        })
        .unwrap_or_else(|| kind.default_extension().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_from_url_path() {
        assert_eq!(extension_for("https://x.com/a.MP4?sig=1", MediaKind::Video), "mp4");
        assert_eq!(extension_for("https://x.com/p/b.webp", MediaKind::Image), "webp");
    }

    #[test]
    fn test_extension_fallback() {
        assert_eq!(extension_for("https://x.com/play?id=9", MediaKind::Video), "mp4");
        assert_eq!(extension_for("https://x.com/img/", MediaKind::Image), "jpg");
        assert_eq!(extension_for("not a url", MediaKind::Image), "jpg");
        assert_eq!(
            extension_for("https://x.com/a.tooolong", MediaKind::Image),
            "jpg"
        );
    }
}
