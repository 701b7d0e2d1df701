use crate::media::{MediaError, MediaFetcher, MediaKind, MediaStore, Result};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const MIB: f64 = 1024.0 * 1024.0;

/// Identifies one transfer started by a tracker
pub type TransferId = u64;

/// One progress report from an in-flight transfer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSample {
    /// Percentage, 0 to 100
    pub progress: u8,
    pub bytes_written: u64,
    /// 0 when the server did not announce a length
    pub bytes_expected: u64,
}

impl ProgressSample {
    #[must_use]
    pub fn from_bytes(bytes_written: u64, bytes_expected: u64) -> Self {
        let progress = if bytes_expected == 0 {
            0
        } else {
            let pct = (bytes_written as f64 / bytes_expected as f64 * 100.0).round();
            pct.clamp(0.0, 100.0) as u8
        };

        Self {
            progress,
            bytes_written,
            bytes_expected,
        }
    }

    /// Status line shown while downloading
    #[must_use]
    pub fn status_text(&self) -> String {
        format!(
            "下载中... {}% ({:.2}MB/{:.2}MB)",
            self.progress,
            self.bytes_written as f64 / MIB,
            self.bytes_expected as f64 / MIB
        )
    }
}

/// Why a download ended without saving
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadFailure {
    /// The transfer itself failed
    Transfer(String),
    /// The file arrived but the store refused it
    Persist(String),
}

impl DownloadFailure {
    /// User-facing message for this failure
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Transfer(_) => "视频下载失败",
            Self::Persist(_) => "视频保存失败，请检查相册权限",
        }
    }
}

/// Lifecycle of a single progress-tracked download
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DownloadState {
    #[default]
    Idle,
    Downloading(ProgressSample),
    Persisting,
    Saved(PathBuf),
    Failed(DownloadFailure),
    Cancelled,
}

impl DownloadState {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Saved(_) | Self::Failed(_) | Self::Cancelled)
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Downloading(_) | Self::Persisting)
    }

    /// Current progress percentage; 0 outside of an active transfer
    #[must_use]
    pub const fn progress(&self) -> u8 {
        match self {
            Self::Downloading(sample) => sample.progress,
            _ => 0,
        }
    }

    #[must_use]
    pub fn status_text(&self) -> String {
        match self {
            Self::Idle => String::new(),
            Self::Downloading(sample) if sample.bytes_written == 0 => "开始下载...".to_string(),
            Self::Downloading(sample) => sample.status_text(),
            Self::Persisting => "下载完成，正在保存...".to_string(),
            Self::Saved(_) => "视频保存成功".to_string(),
            Self::Failed(failure) => failure.user_message().to_string(),
            Self::Cancelled => "下载已取消".to_string(),
        }
    }
}

struct ActiveTransfer {
    id: TransferId,
    task: Option<JoinHandle<()>>,
}

struct TrackerState {
    current: DownloadState,
    active: Option<ActiveTransfer>,
    next_id: TransferId,
}

struct Shared {
    state: Mutex<TrackerState>,
    updates: watch::Sender<DownloadState>,
}

impl Shared {
    fn is_current(state: &TrackerState, id: TransferId) -> bool {
        state.active.as_ref().is_some_and(|a| a.id == id)
    }

    fn publish(&self, state: &TrackerState) {
        self.updates.send_replace(state.current.clone());
    }

    fn apply_sample(&self, id: TransferId, sample: ProgressSample) -> bool {
        let mut state = self.state.lock();
        if !Self::is_current(&state, id) || !matches!(state.current, DownloadState::Downloading(_)) {
            return false;
        }

        state.current = DownloadState::Downloading(sample);
        self.publish(&state);
        true
    }

    /// Move transfer `id` to `next`; a no-op once the transfer is no longer current
    fn transition(&self, id: TransferId, next: DownloadState) -> bool {
        let mut state = self.state.lock();
        if !Self::is_current(&state, id) {
            return false;
        }

        if next.is_terminal() {
            state.active = None;
        }
        state.current = next;
        self.publish(&state);
        true
    }
}

/// Progress-tracked single download with cancellation.
///
/// At most one transfer is active per tracker. Every sample and state change
/// is tagged with the transfer id, and anything arriving for a transfer that
/// is no longer current (cancelled, or finished) is dropped.
pub struct DownloadTracker {
    fetcher: Arc<dyn MediaFetcher>,
    store: Arc<dyn MediaStore>,
    shared: Arc<Shared>,
}

impl DownloadTracker {
    #[must_use]
    pub fn new(fetcher: Arc<dyn MediaFetcher>, store: Arc<dyn MediaStore>) -> Self {
        let (updates, _) = watch::channel(DownloadState::Idle);
        Self {
            fetcher,
            store,
            shared: Arc::new(Shared {
                state: Mutex::new(TrackerState {
                    current: DownloadState::Idle,
                    active: None,
                    next_id: 0,
                }),
                updates,
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> DownloadState {
        self.shared.state.lock().current.clone()
    }

    /// Id of the running transfer, if any
    #[must_use]
    pub fn active_id(&self) -> Option<TransferId> {
        self.shared.state.lock().active.as_ref().map(|a| a.id)
    }

    /// Watch state changes as they happen
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DownloadState> {
        self.shared.updates.subscribe()
    }

    /// Start downloading `url`, then persist it as a video.
    ///
    /// Fails with [`MediaError::Busy`] while another transfer is active.
    pub fn start(&self, url: &str) -> Result<TransferId> {
        let id = {
            let mut state = self.shared.state.lock();
            if state.active.is_some() {
                return Err(MediaError::Busy);
            }

            state.next_id += 1;
            let id = state.next_id;
            state.active = Some(ActiveTransfer { id, task: None });
            state.current = DownloadState::Downloading(ProgressSample::default());
            self.shared.publish(&state);
            id
        };

        info!("Starting download #{} from {}", id, url);

        let task = tokio::spawn(run_transfer(
            Arc::clone(&self.shared),
            Arc::clone(&self.fetcher),
            Arc::clone(&self.store),
            id,
            url.to_string(),
        ));

        let mut state = self.shared.state.lock();
        match state.active.as_mut() {
            Some(active) if active.id == id => active.task = Some(task),
            // Already finished or cancelled; nothing left to abort
            _ => drop(task),
        }

        Ok(id)
    }

    /// Feed a progress sample for transfer `id`.
    ///
    /// Returns false when the sample was ignored because `id` is no longer the
    /// running transfer.
    pub fn record_progress(&self, id: TransferId, sample: ProgressSample) -> bool {
        self.shared.apply_sample(id, sample)
    }

    /// Abort the running transfer. Returns false when nothing was running.
    pub fn cancel(&self) -> bool {
        let mut state = self.shared.state.lock();
        let Some(active) = state.active.take() else {
            return false;
        };

        if let Some(task) = active.task {
            task.abort();
        }
        state.current = DownloadState::Cancelled;
        self.shared.publish(&state);

        info!("Download #{} cancelled", active.id);
        true
    }

    /// Return to idle once the last transfer has ended
    pub fn reset(&self) {
        let mut state = self.shared.state.lock();
        if state.active.is_none() {
            state.current = DownloadState::Idle;
            self.shared.publish(&state);
        }
    }

    /// Wait until the current transfer reaches a terminal state
    pub async fn finished(&self) -> DownloadState {
        let mut rx = self.subscribe();
        match rx.wait_for(DownloadState::is_terminal).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }
}

async fn run_transfer(
    shared: Arc<Shared>,
    fetcher: Arc<dyn MediaFetcher>,
    store: Arc<dyn MediaStore>,
    id: TransferId,
    url: String,
) {
    let progress_target = Arc::clone(&shared);
    let on_progress = move |sample: ProgressSample| {
        if !progress_target.apply_sample(id, sample) {
            debug!("Dropped late progress sample for download #{}", id);
        }
    };

    let temp = match fetcher.fetch(&url, MediaKind::Video, &on_progress).await {
        Ok(temp) => temp,
        Err(e) => {
            warn!("Download #{} failed: {}", id, e);
            shared.transition(id, DownloadState::Failed(DownloadFailure::Transfer(e.to_string())));
            return;
        }
    };

    if !shared.transition(id, DownloadState::Persisting) {
        return;
    }

    let next = match store.persist(temp.path(), MediaKind::Video).await {
        Ok(path) => DownloadState::Saved(path),
        Err(e) => {
            warn!("Download #{} could not be saved: {}", id, e);
            DownloadState::Failed(DownloadFailure::Persist(e.to_string()))
        }
    };
    shared.transition(id, next);
}
