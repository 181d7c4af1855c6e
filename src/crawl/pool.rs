//! Bounded worker pool scoped to one phase of a crawl.
//!
//! A [`WorkerPool`] runs one closure over a batch of items with at most
//! `width` of them in flight. Each worker slot sleeps for the configured
//! throttle after finishing an item before it takes the next one. The pool
//! returns only once every spawned task has finished or been aborted.
//!
//! A fatal error from any task trips the run-wide [`AbortSignal`]: every pool
//! sharing it stops dispatching, and in-flight tasks are dropped at their next
//! suspension point.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::CrawlError;

/// Run-wide kill switch shared by every pool of one run.
///
/// Wraps a [`CancellationToken`] together with the first recorded cause, so
/// pools that merely observe the cancellation can still report why.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    token: CancellationToken,
    cause: Arc<OnceLock<String>>,
}

impl AbortSignal {
    /// Creates an untripped signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Trips the signal. Only the first cause is kept.
    pub fn abort(&self, cause: impl Into<String>) {
        let _ = self.cause.set(cause.into());
        self.token.cancel();
    }

    /// Returns true once [`abort`](Self::abort) has been called.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// First recorded abort cause.
    #[must_use]
    pub fn cause(&self) -> Option<&str> {
        self.cause.get().map(String::as_str)
    }

    /// Completes when the signal is tripped.
    pub async fn aborted(&self) {
        self.token.cancelled().await;
    }

    /// Error handed to callers that stopped because of someone else's failure.
    #[must_use]
    pub fn to_error(&self) -> CrawlError {
        CrawlError::Aborted {
            cause: self.cause().unwrap_or("cancelled").to_string(),
        }
    }
}

/// Counts of one pool run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Items whose task returned `Ok`.
    pub completed: usize,
    /// Items whose task failed (non-fatally) or panicked.
    pub failed: usize,
}

impl PoolStats {
    /// Total number of items that ran to an outcome.
    #[must_use]
    pub fn total(&self) -> usize {
        self.completed + self.failed
    }
}

#[derive(Debug, Default)]
struct Counters {
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl Counters {
    fn increment_completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    fn snapshot(&self) -> PoolStats {
        PoolStats {
            completed: self.completed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

/// Fixed-width task pool for one crawl phase.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    name: &'static str,
    width: usize,
    throttle: Duration,
    abort: AbortSignal,
}

impl WorkerPool {
    /// Creates a pool running at most `width` tasks at once (minimum 1).
    #[must_use]
    pub fn new(name: &'static str, width: usize, abort: AbortSignal) -> Self {
        Self {
            name,
            width: width.max(1),
            throttle: Duration::ZERO,
            abort,
        }
    }

    /// Sets the sleep each slot takes after finishing an item.
    #[must_use]
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    /// Runs `task` over `items` and waits for all of them.
    ///
    /// Non-fatal task errors are logged and counted; they never stop the pool.
    ///
    /// # Errors
    ///
    /// Returns the first fatal task error, or [`CrawlError::Aborted`] when the
    /// shared signal was tripped elsewhere while this pool was running.
    #[instrument(skip_all, fields(pool = self.name, width = self.width))]
    pub async fn run<T, I, F, Fut>(&self, items: I, task: F) -> Result<PoolStats, CrawlError>
    where
        T: fmt::Display + Send + 'static,
        I: IntoIterator<Item = T>,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CrawlError>> + Send + 'static,
    {
        if self.abort.is_aborted() {
            return Err(self.abort.to_error());
        }

        let counters = Arc::new(Counters::default());
        let fatal: Arc<Mutex<Option<CrawlError>>> = Arc::new(Mutex::new(None));
        let semaphore = Arc::new(Semaphore::new(self.width));
        let task = Arc::new(task);
        let mut tasks = JoinSet::new();

        for item in items {
            let permit = tokio::select! {
                biased;
                () = self.abort.aborted() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let label = item.to_string();
            debug!(pool = self.name, item = %label, "dispatching");

            let task = Arc::clone(&task);
            let counters = Arc::clone(&counters);
            let fatal = Arc::clone(&fatal);
            let abort = self.abort.clone();
            let throttle = self.throttle;
            let name = self.name;

            tasks.spawn(async move {
                // Slot is held through the throttle sleep.
                let _permit = permit;

                let outcome = tokio::select! {
                    biased;
                    outcome = task(item) => outcome,
                    () = abort.aborted() => {
                        debug!(pool = name, item = %label, "aborted in flight");
                        return;
                    }
                };

                match outcome {
                    Ok(()) => counters.increment_completed(),
                    Err(e) if e.is_fatal() => {
                        error!(pool = name, item = %label, error = %e, "fatal error; aborting run");
                        abort.abort(e.to_string());
                        let mut slot = fatal.lock().unwrap_or_else(PoisonError::into_inner);
                        slot.get_or_insert(e);
                        return;
                    }
                    Err(e) => {
                        error!(pool = name, item = %label, error = %e, "item failed");
                        counters.increment_failed();
                    }
                }

                if !throttle.is_zero() {
                    tokio::select! {
                        () = tokio::time::sleep(throttle) => {}
                        () = abort.aborted() => {}
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined
                && e.is_panic()
            {
                warn!(pool = self.name, error = %e, "pool task panicked");
                counters.increment_failed();
            }
        }

        let own_fatal = fatal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(e) = own_fatal {
            return Err(e);
        }
        if self.abort.is_aborted() {
            return Err(self.abort.to_error());
        }

        let stats = counters.snapshot();
        info!(
            pool = self.name,
            completed = stats.completed,
            failed = stats.failed,
            "pool finished"
        );
        Ok(stats)
    }
}
