use crate::media::{MediaError, MediaFetcher, MediaKind, MediaStore, ProgressSample, Result};
use futures::future::join_all;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Aggregate outcome of a batch save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    /// The single user-facing line reported when a batch completes
    #[must_use]
    pub fn message(&self) -> String {
        if self.failed == 0 {
            format!("全部图片保存成功({}张)", self.succeeded)
        } else {
            format!("保存完成：成功{}张，失败{}张", self.succeeded, self.failed)
        }
    }
}

/// Result of one item's fetch-then-persist chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Saved(PathBuf),
    FetchFailed(String),
    PersistFailed(String),
}

impl ItemOutcome {
    #[must_use]
    pub const fn is_saved(&self) -> bool {
        matches!(self, Self::Saved(_))
    }
}

/// Everything a finished batch produced, items in input order
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub summary: BatchSummary,
    pub items: Vec<ItemOutcome>,
}

/// Completion counters shared by all item chains
#[derive(Debug)]
struct Tally {
    total: usize,
    succeeded: usize,
    failed: usize,
    recorded: Vec<bool>,
    finished: bool,
}

impl Tally {
    fn new(total: usize) -> Self {
        Self {
            total,
            succeeded: 0,
            failed: 0,
            recorded: vec![false; total],
            finished: false,
        }
    }

    /// Count item `index` once and report the summary on the transition to
    /// done. Increment and comparison happen under the same lock, so exactly
    /// one caller ever sees `Some`.
    fn record(&mut self, index: usize, saved: bool) -> Option<BatchSummary> {
        if self.finished || self.recorded.get(index).copied().unwrap_or(true) {
            return None;
        }
        self.recorded[index] = true;

        if saved {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }

        if self.succeeded + self.failed == self.total {
            self.finished = true;
            return Some(self.summary());
        }
        None
    }

    const fn summary(&self) -> BatchSummary {
        BatchSummary {
            total: self.total,
            succeeded: self.succeeded,
            failed: self.failed,
        }
    }
}

type SummaryHook = Box<dyn FnOnce(BatchSummary) + Send>;

/// Releases the busy flag when a batch is dropped before it completes
struct BusyGuard<'a> {
    busy: &'a AtomicBool,
    tally: &'a Mutex<Tally>,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        // A finished batch already released the flag at its completion transition
        if !self.tally.lock().finished {
            warn!("Batch abandoned before completion");
            self.busy.store(false, Ordering::Release);
        }
    }
}

/// Saves many remote resources concurrently and reports one aggregate result.
///
/// All chains are launched together; completion order is irrelevant, only
/// the counts are. There is no cancellation and no retry: a failed item
/// counts as a failure and the caller may re-run the whole batch.
pub struct BatchCoordinator {
    fetcher: Arc<dyn MediaFetcher>,
    store: Arc<dyn MediaStore>,
    busy: Arc<AtomicBool>,
}

impl BatchCoordinator {
    #[must_use]
    pub fn new(fetcher: Arc<dyn MediaFetcher>, store: Arc<dyn MediaStore>) -> Self {
        Self {
            fetcher,
            store,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a batch is in flight
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Fetch and persist every URL, calling `on_summary` exactly once when the
    /// last item settles.
    ///
    /// Fails fast with [`MediaError::EmptyBatch`] on an empty list and with
    /// [`MediaError::Busy`] while another batch is running.
    pub async fn run(
        &self,
        urls: &[String],
        kind: MediaKind,
        on_summary: impl FnOnce(BatchSummary) + Send + 'static,
    ) -> Result<BatchReport> {
        if urls.is_empty() {
            return Err(MediaError::EmptyBatch);
        }

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(MediaError::Busy);
        }

        info!("Saving {} {}s", urls.len(), kind);

        let tally = Mutex::new(Tally::new(urls.len()));
        let hook: Mutex<Option<SummaryHook>> = Mutex::new(Some(Box::new(on_summary)));
        let _guard = BusyGuard {
            busy: &self.busy,
            tally: &tally,
        };

        let chains = urls
            .iter()
            .enumerate()
            .map(|(index, url)| self.save_one(index, url, kind, &tally, &hook));
        let items = join_all(chains).await;

        let summary = tally.lock().summary();
        Ok(BatchReport { summary, items })
    }

    async fn save_one(
        &self,
        index: usize,
        url: &str,
        kind: MediaKind,
        tally: &Mutex<Tally>,
        hook: &Mutex<Option<SummaryHook>>,
    ) -> ItemOutcome {
        let outcome = match self.fetcher.fetch(url, kind, &|_: ProgressSample| {}).await {
            Err(e) => {
                warn!("Item {} fetch failed: {}", index + 1, e);
                ItemOutcome::FetchFailed(e.to_string())
            }
            Ok(temp) => match self.store.persist(temp.path(), kind).await {
                Ok(path) => ItemOutcome::Saved(path),
                Err(e) => {
                    warn!("Item {} persist failed: {}", index + 1, e);
                    ItemOutcome::PersistFailed(e.to_string())
                }
            },
        };

        let done = tally.lock().record(index, outcome.is_saved());
        if let Some(summary) = done {
            debug!("Batch complete: {:?}", summary);
            self.busy.store(false, Ordering::Release);
            if let Some(report) = hook.lock().take() {
                report(summary);
            }
        }

        outcome
    }
}
