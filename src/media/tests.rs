//! Download, batch and store tests

#[cfg(test)]
pub(crate) mod fakes {
    use crate::media::{
        MediaError, MediaFetcher, MediaKind, MediaStore, ProgressSample, Result, TempMedia,
    };
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Serves canned bodies per URL; unknown URLs fail
    pub struct FakeFetcher {
        dir: TempDir,
        bodies: HashMap<String, Vec<u8>>,
        delays: HashMap<String, Duration>,
    }

    impl FakeFetcher {
        pub fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
                bodies: HashMap::new(),
                delays: HashMap::new(),
            }
        }

        pub fn serve(mut self, url: &str, body: &[u8]) -> Self {
            self.bodies.insert(url.to_string(), body.to_vec());
            self
        }

        pub fn delay(mut self, url: &str, delay: Duration) -> Self {
            self.delays.insert(url.to_string(), delay);
            self
        }
    }

    #[async_trait]
    impl MediaFetcher for FakeFetcher {
        async fn fetch(
            &self,
            url: &str,
            _kind: MediaKind,
            progress: &(dyn Fn(ProgressSample) + Send + Sync),
        ) -> Result<TempMedia> {
            if let Some(delay) = self.delays.get(url) {
                tokio::time::sleep(*delay).await;
            }

            let Some(body) = self.bodies.get(url) else {
                return Err(MediaError::Http { status: 404 });
            };

            let mut file = tempfile::NamedTempFile::new_in(self.dir.path()).unwrap();
            file.write_all(body).unwrap();
            let len = body.len() as u64;
            progress(ProgressSample::from_bytes(len, len));

            Ok(TempMedia::new(file.into_temp_path(), len))
        }
    }

    /// Emits one sample and then never finishes
    pub struct StalledFetcher;

    #[async_trait]
    impl MediaFetcher for StalledFetcher {
        async fn fetch(
            &self,
            _url: &str,
            _kind: MediaKind,
            progress: &(dyn Fn(ProgressSample) + Send + Sync),
        ) -> Result<TempMedia> {
            progress(ProgressSample::from_bytes(512, 2048));
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    /// Records persisted files; can refuse everything
    #[derive(Default)]
    pub struct FakeStore {
        pub saved: Mutex<Vec<(PathBuf, MediaKind)>>,
        pub deny: bool,
        pub fail_persist: bool,
    }

    impl FakeStore {
        pub fn denying() -> Self {
            Self {
                deny: true,
                ..Default::default()
            }
        }

        pub fn failing() -> Self {
            Self {
                fail_persist: true,
                ..Default::default()
            }
        }

        pub fn saved_count(&self) -> usize {
            self.saved.lock().len()
        }
    }

    #[async_trait]
    impl MediaStore for FakeStore {
        async fn authorize(&self) -> Result<()> {
            if self.deny {
                return Err(MediaError::PermissionDenied("album".to_string()));
            }
            Ok(())
        }

        async fn persist(&self, file: &Path, kind: MediaKind) -> Result<PathBuf> {
            if self.fail_persist {
                return Err(MediaError::PermissionDenied(file.display().to_string()));
            }
            let target = PathBuf::from(format!("/album/{}", self.saved_count()));
            self.saved.lock().push((target.clone(), kind));
            Ok(target)
        }
    }
}

#[cfg(test)]
mod batch_tests {
    use super::fakes::{FakeFetcher, FakeStore};
    use crate::media::{BatchCoordinator, BatchSummary, ItemOutcome, MediaError, MediaKind};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    fn urls(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("https://img.test/{i}.jpg")).collect()
    }

    fn recorder() -> (Arc<Mutex<Vec<BatchSummary>>>, impl FnOnce(BatchSummary) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |s: BatchSummary| sink.lock().push(s))
    }

    #[tokio::test]
    async fn test_one_fetch_failure_in_three() {
        let fetcher = FakeFetcher::new()
            .serve("https://img.test/1.jpg", b"one")
            .serve("https://img.test/3.jpg", b"three");
        let store = Arc::new(FakeStore::default());
        let coordinator = BatchCoordinator::new(Arc::new(fetcher), store.clone());

        let (seen, hook) = recorder();
        let report = coordinator
            .run(&urls(3), MediaKind::Image, hook)
            .await
            .unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].message(), "保存完成：成功2张，失败1张");
        assert_eq!(report.summary.succeeded + report.summary.failed, 3);
        assert!(matches!(report.items[1], ItemOutcome::FetchFailed(_)));
        assert!(report.items[0].is_saved());
        assert!(report.items[2].is_saved());
        assert_eq!(store.saved_count(), 2);
        assert!(!coordinator.is_busy());
    }

    #[tokio::test]
    async fn test_summary_once_under_reversed_completion() {
        let all = urls(5);
        let mut fetcher = FakeFetcher::new();
        for (i, url) in all.iter().enumerate() {
            fetcher = fetcher
                .serve(url, b"x")
                .delay(url, Duration::from_millis(10 * (5 - i as u64)));
        }
        let coordinator = BatchCoordinator::new(Arc::new(fetcher), Arc::new(FakeStore::default()));

        let (seen, hook) = recorder();
        let report = coordinator.run(&all, MediaKind::Image, hook).await.unwrap();

        assert_eq!(seen.lock().len(), 1);
        assert_eq!(seen.lock()[0].message(), "全部图片保存成功(5张)");
        assert_eq!(report.items.len(), 5);
    }

    #[tokio::test]
    async fn test_persist_failure_counts_once() {
        let fetcher = FakeFetcher::new()
            .serve("https://img.test/1.jpg", b"a")
            .serve("https://img.test/2.jpg", b"b");
        let coordinator = BatchCoordinator::new(Arc::new(fetcher), Arc::new(FakeStore::failing()));

        let (seen, hook) = recorder();
        let report = coordinator.run(&urls(2), MediaKind::Image, hook).await.unwrap();

        assert_eq!(report.summary.failed, 2);
        assert_eq!(report.summary.succeeded, 0);
        assert_eq!(report.summary.total, 2);
        assert!(
            report
                .items
                .iter()
                .all(|i| matches!(i, ItemOutcome::PersistFailed(_)))
        );
        assert_eq!(seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_batch_fails_fast() {
        let coordinator = BatchCoordinator::new(
            Arc::new(FakeFetcher::new()),
            Arc::new(FakeStore::default()),
        );

        let (seen, hook) = recorder();
        let err = coordinator.run(&[], MediaKind::Image, hook).await.unwrap_err();

        assert!(matches!(err, MediaError::EmptyBatch));
        assert!(seen.lock().is_empty());
        assert!(!coordinator.is_busy());
    }

    #[tokio::test]
    async fn test_second_batch_rejected_while_busy() {
        let slow = "https://img.test/1.jpg";
        let fetcher = FakeFetcher::new()
            .serve(slow, b"a")
            .delay(slow, Duration::from_millis(100));
        let coordinator = BatchCoordinator::new(Arc::new(fetcher), Arc::new(FakeStore::default()));
        let batch = vec![slow.to_string()];

        let first = coordinator.run(&batch, MediaKind::Image, |_| {});
        let second = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            coordinator.run(&batch, MediaKind::Image, |_| {}).await
        };
        let (first, second) = tokio::join!(first, second);

        assert!(first.is_ok());
        let err = second.unwrap_err();
        assert!(matches!(err, MediaError::Busy));
        assert_eq!(err.to_string(), "Another transfer is already running");
        assert!(!coordinator.is_busy());
    }

    #[tokio::test]
    async fn test_dropped_batch_releases_busy_flag() {
        let slow = "https://img.test/slow.jpg";
        let quick = "https://img.test/quick.jpg";
        let fetcher = FakeFetcher::new()
            .serve(slow, b"a")
            .delay(slow, Duration::from_secs(5))
            .serve(quick, b"b");
        let coordinator = BatchCoordinator::new(Arc::new(fetcher), Arc::new(FakeStore::default()));

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            coordinator.run(&[slow.to_string()], MediaKind::Image, |_| {}),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(!coordinator.is_busy());

        let report = coordinator
            .run(&[quick.to_string()], MediaKind::Image, |_| {})
            .await
            .unwrap();
        assert_eq!(report.summary.succeeded, 1);
        assert!(!coordinator.is_busy());
    }
}

#[cfg(test)]
mod progress_tests {
    use super::fakes::{FakeFetcher, FakeStore, StalledFetcher};
    use crate::media::{
        AlbumDir, DownloadFailure, DownloadState, DownloadTracker, HttpFetcher, MediaError,
        ProgressSample,
    };
    use httpmock::prelude::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_sample_percentages() {
        assert_eq!(ProgressSample::from_bytes(0, 0).progress, 0);
        assert_eq!(ProgressSample::from_bytes(1, 3).progress, 33);
        assert_eq!(ProgressSample::from_bytes(2, 3).progress, 67);
        assert_eq!(ProgressSample::from_bytes(5, 4).progress, 100);
    }

    #[test]
    fn test_status_text() {
        let sample = ProgressSample::from_bytes(1024 * 1024, 4 * 1024 * 1024);
        assert_eq!(sample.status_text(), "下载中... 25% (1.00MB/4.00MB)");
        assert_eq!(DownloadState::Persisting.status_text(), "下载完成，正在保存...");
    }

    #[tokio::test]
    async fn test_download_and_save_over_http() {
        let server = MockServer::start_async().await;
        let body = vec![7u8; 64 * 1024];
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v/a.mp4");
                then.status(200).body(body.clone());
            })
            .await;

        let temp = TempDir::new().unwrap();
        let fetcher = HttpFetcher::new(reqwest::Client::new(), temp.path().join("tmp"));
        let album = AlbumDir::new(temp.path().join("album"));
        let tracker = DownloadTracker::new(Arc::new(fetcher), Arc::new(album));

        tracker.start(&server.url("/v/a.mp4")).unwrap();
        let state = tracker.finished().await;

        let DownloadState::Saved(path) = state else {
            panic!("unexpected state: {state:?}");
        };
        assert!(path.starts_with(temp.path().join("album").join("videos")));
        assert_eq!(path.extension().unwrap(), "mp4");
        assert_eq!(std::fs::read(&path).unwrap(), body);
        assert!(tracker.active_id().is_none());
    }

    #[tokio::test]
    async fn test_cancel_ignores_late_samples() {
        let tracker = DownloadTracker::new(Arc::new(StalledFetcher), Arc::new(FakeStore::default()));
        let mut rx = tracker.subscribe();

        let id = tracker.start("https://v.test/a.mp4").unwrap();
        rx.wait_for(|s| s.progress() == 25).await.unwrap();

        assert!(tracker.cancel());
        assert_eq!(tracker.state(), DownloadState::Cancelled);
        assert_eq!(tracker.state().progress(), 0);
        assert!(tracker.active_id().is_none());

        // A callback from the aborted transfer must not resurrect it
        assert!(!tracker.record_progress(id, ProgressSample::from_bytes(2048, 2048)));
        assert_eq!(tracker.state(), DownloadState::Cancelled);

        // Nothing left to cancel
        assert!(!tracker.cancel());
    }

    #[tokio::test]
    async fn test_restart_after_cancel_gets_new_id() {
        let tracker = DownloadTracker::new(Arc::new(StalledFetcher), Arc::new(FakeStore::default()));
        let first = tracker.start("https://v.test/a.mp4").unwrap();
        tracker.cancel();

        let second = tracker.start("https://v.test/a.mp4").unwrap();
        assert_ne!(first, second);
        assert!(!tracker.record_progress(first, ProgressSample::from_bytes(1, 2)));
        assert!(tracker.record_progress(second, ProgressSample::from_bytes(1, 2)));
        tracker.cancel();
    }

    #[tokio::test]
    async fn test_second_start_rejected_while_active() {
        let tracker = DownloadTracker::new(Arc::new(StalledFetcher), Arc::new(FakeStore::default()));
        tracker.start("https://v.test/a.mp4").unwrap();

        let err = tracker.start("https://v.test/b.mp4").unwrap_err();
        assert!(matches!(err, MediaError::Busy));
        assert_eq!(err.to_string(), "Another transfer is already running");
        tracker.cancel();
    }

    #[tokio::test]
    async fn test_transfer_failure_is_distinct_from_persist_failure() {
        let tracker = DownloadTracker::new(
            Arc::new(FakeFetcher::new()),
            Arc::new(FakeStore::default()),
        );
        tracker.start("https://v.test/missing.mp4").unwrap();
        let state = tracker.finished().await;
        assert!(matches!(
            state,
            DownloadState::Failed(DownloadFailure::Transfer(_))
        ));
        assert_eq!(state.status_text(), "视频下载失败");

        let fetcher = FakeFetcher::new().serve("https://v.test/a.mp4", b"video");
        let tracker = DownloadTracker::new(Arc::new(fetcher), Arc::new(FakeStore::failing()));
        tracker.start("https://v.test/a.mp4").unwrap();
        let state = tracker.finished().await;
        assert!(matches!(
            state,
            DownloadState::Failed(DownloadFailure::Persist(_))
        ));
        assert_eq!(state.status_text(), "视频保存失败，请检查相册权限");
    }

    #[tokio::test]
    async fn test_reset_returns_to_idle_after_finish() {
        let fetcher = FakeFetcher::new().serve("https://v.test/a.mp4", b"video");
        let tracker = DownloadTracker::new(Arc::new(fetcher), Arc::new(FakeStore::default()));
        tracker.start("https://v.test/a.mp4").unwrap();
        tracker.finished().await;

        tracker.reset();
        assert_eq!(tracker.state(), DownloadState::Idle);
    }
}

#[cfg(test)]
mod store_tests {
    use crate::media::{AlbumDir, MediaKind, MediaStore};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_authorize_creates_album_dirs() {
        let temp = TempDir::new().unwrap();
        let album = AlbumDir::new(temp.path().join("album"));

        album.authorize().await.unwrap();

        assert!(temp.path().join("album").join("videos").is_dir());
        assert!(temp.path().join("album").join("images").is_dir());
    }

    #[tokio::test]
    async fn test_persist_copies_into_kind_dir() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src.webp");
        std::fs::write(&source, b"img").unwrap();

        let album = AlbumDir::new(temp.path().join("album"));
        let saved = album.persist(&source, MediaKind::Image).await.unwrap();

        assert!(saved.starts_with(album.root().join("images")));
        assert_eq!(saved.extension().unwrap(), "webp");
        assert_eq!(std::fs::read(saved).unwrap(), b"img");
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_persist_missing_source_fails() {
        let temp = TempDir::new().unwrap();
        let album = AlbumDir::new(temp.path().join("album"));

        let result = album
            .persist(&temp.path().join("nope.mp4"), MediaKind::Video)
            .await;
        assert!(result.is_err());
    }
}
