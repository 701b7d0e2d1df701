use crate::media::{
    BatchCoordinator, BatchReport, DownloadState, DownloadTracker, MediaError, MediaFetcher,
    MediaKind, MediaStore, ProgressSample,
};
use crate::screens::Notifier;
use std::sync::Arc;
use tracing::{info, warn};

const PERMISSION_TITLE: &str = "提示";
const VIDEO_PERMISSION: &str = "视频保存到相册需获取相册权限请允许开启权限";
const ALBUM_PERMISSION: &str = "图片保存到相册需获取相册权限请允许开启权限";

/// Save-to-album flows shared by the resolver and history screens
pub struct MediaSaver {
    fetcher: Arc<dyn MediaFetcher>,
    store: Arc<dyn MediaStore>,
    tracker: DownloadTracker,
    batch: BatchCoordinator,
    notifier: Arc<dyn Notifier>,
}

impl MediaSaver {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn MediaFetcher>,
        store: Arc<dyn MediaStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            tracker: DownloadTracker::new(Arc::clone(&fetcher), Arc::clone(&store)),
            batch: BatchCoordinator::new(Arc::clone(&fetcher), Arc::clone(&store)),
            fetcher,
            store,
            notifier,
        }
    }

    /// Tracker driving video downloads, for progress display and cancellation
    #[must_use]
    pub const fn tracker(&self) -> &DownloadTracker {
        &self.tracker
    }

    #[must_use]
    pub fn is_batch_running(&self) -> bool {
        self.batch.is_busy()
    }

    /// Ask for album access; on refusal show the settings modal
    async fn authorize(&self, modal_content: &str) -> bool {
        match self.store.authorize().await {
            Ok(()) => true,
            Err(MediaError::PermissionDenied(target)) => {
                warn!("Album access denied: {}", target);
                self.notifier.settings_modal(PERMISSION_TITLE, modal_content);
                false
            }
            Err(e) => {
                warn!("Album unavailable: {}", e);
                self.notifier.toast("相册不可用，请稍后重试");
                false
            }
        }
    }

    /// Download a video with progress and save it to the album.
    ///
    /// Returns the terminal state, or `None` when the download never started.
    pub async fn save_video(&self, url: &str) -> Option<DownloadState> {
        if !self.authorize(VIDEO_PERMISSION).await {
            return None;
        }

        self.tracker.reset();
        if let Err(e) = self.tracker.start(url) {
            warn!("Video download not started: {}", e);
            self.notifier.toast("正在下载中，请稍候");
            return None;
        }

        let outcome = self.tracker.finished().await;
        match &outcome {
            DownloadState::Saved(path) => {
                info!("Video saved to {}", path.display());
                self.notifier.toast("视频保存成功");
            }
            DownloadState::Failed(failure) => self.notifier.toast(failure.user_message()),
            // The cancel path already told the user
            _ => {}
        }
        Some(outcome)
    }

    /// Abort the running video download. Returns false when nothing was running.
    pub fn cancel_download(&self) -> bool {
        let cancelled = self.tracker.cancel();
        if cancelled {
            self.notifier.toast("下载已取消");
        }
        cancelled
    }

    /// Save one image without progress tracking
    pub async fn save_image(&self, url: &str) -> bool {
        let temp = match self
            .fetcher
            .fetch(url, MediaKind::Image, &|_: ProgressSample| {})
            .await
        {
            Ok(temp) => temp,
            Err(e) => {
                warn!("Image download failed: {}", e);
                self.notifier.toast("图片下载失败");
                return false;
            }
        };

        match self.store.persist(temp.path(), MediaKind::Image).await {
            Ok(path) => {
                info!("Image saved to {}", path.display());
                self.notifier.toast("图片保存成功");
                true
            }
            Err(e) => {
                warn!("Image save failed: {}", e);
                self.notifier.toast("图片保存失败");
                false
            }
        }
    }

    /// Save every image concurrently; the summary is toasted once all settle.
    ///
    /// `empty_message` is shown instead when there is nothing to save.
    pub async fn save_all_images(&self, urls: &[String], empty_message: &str) -> Option<BatchReport> {
        if urls.is_empty() {
            self.notifier.toast(empty_message);
            return None;
        }

        if !self.authorize(ALBUM_PERMISSION).await {
            return None;
        }

        let notifier = Arc::clone(&self.notifier);
        match self
            .batch
            .run(urls, MediaKind::Image, move |summary| {
                notifier.toast(&summary.message());
            })
            .await
        {
            Ok(report) => Some(report),
            Err(MediaError::Busy) => {
                self.notifier.toast("正在保存中，请稍候");
                None
            }
            Err(e) => {
                warn!("Batch save not started: {}", e);
                self.notifier.toast(empty_message);
                None
            }
        }
    }
}
