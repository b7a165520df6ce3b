//! Progress polling.
//!
//! A [`ProgressMonitor`] owns at most one polling task. Each tick reads a
//! snapshot and reports it:
//!
//! - a reading below 100 goes to `on_progress`
//! - a reading of 100 or more goes to `on_progress`, then the session stops
//!   and `on_complete` runs
//! - a failed fetch stops the session, then `on_error` runs
//! - a snapshot carrying a server error code is skipped and polling goes on
//!
//! Sessions are numbered. A tick only reports while its number is still the
//! current one, so results that arrive after `stop` or a restart are dropped.
//! `stop` also waits for a callback that is already running, which matters on
//! a multi-threaded runtime where the polling task runs on another worker.

use async_trait::async_trait;
use kollus_core::{ProgressSnapshot, UploadError, UploadResult};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::UploadClient;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Anything that can read a progress snapshot from a status address.
#[async_trait]
pub trait ProgressSource: Send + Sync + 'static {
    async fn fetch_progress(&self, progress_url: &str) -> UploadResult<ProgressSnapshot>;
}

#[async_trait]
impl ProgressSource for UploadClient {
    async fn fetch_progress(&self, progress_url: &str) -> UploadResult<ProgressSnapshot> {
        UploadClient::fetch_progress(self, progress_url).await
    }
}

pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;
pub type CompleteCallback = Arc<dyn Fn() + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(UploadError) + Send + Sync>;

/// Callbacks and timing for one monitoring session. Unset callbacks do
/// nothing.
#[derive(Clone)]
pub struct MonitorOptions {
    on_progress: ProgressCallback,
    on_complete: CompleteCallback,
    on_error: ErrorCallback,
    interval: Duration,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            on_progress: Arc::new(|_| {}),
            on_complete: Arc::new(|| {}),
            on_error: Arc::new(|_| {}),
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl fmt::Debug for MonitorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorOptions")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl MonitorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_progress(mut self, callback: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.on_progress = Arc::new(callback);
        self
    }

    pub fn on_complete(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_complete = Arc::new(callback);
        self
    }

    pub fn on_error(mut self, callback: impl Fn(UploadError) + Send + Sync + 'static) -> Self {
        self.on_error = Arc::new(callback);
        self
    }

    /// Time between polls. Zero is raised to one millisecond.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.interval
    }
}

#[derive(Default)]
struct SessionState {
    /// Bumped whenever a session ends or is replaced
    generation: u64,
    task: Option<JoinHandle<()>>,
    /// Thread running a callback, if any
    dispatching: Option<ThreadId>,
}

/// State shared between a monitor and its polling task.
///
/// Callbacks run while holding `dispatch`. `stop` and `start` bump the
/// generation first and then wait on `dispatch`, so once they return no
/// callback of the old session is running or will run. A callback that
/// calls back into its own monitor skips the wait.
#[derive(Default)]
struct Shared {
    state: Mutex<SessionState>,
    dispatch: Mutex<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    /// End the current session, if any. Returns whether one was running.
    fn retire(&self) -> bool {
        let (was_active, wait) = {
            let mut state = lock(&self.state);
            let was_active = match state.task.take() {
                Some(task) => {
                    task.abort();
                    state.generation += 1;
                    true
                }
                None => false,
            };
            let wait = state.dispatching != Some(thread::current().id());
            (was_active, wait)
        };

        if wait {
            drop(lock(&self.dispatch));
        }
        was_active
    }

    /// Run `callback` for `generation` unless that session was stopped or
    /// replaced. With `end_session` the session ends before the callback.
    /// Returns false when the callback was skipped.
    fn deliver(&self, generation: u64, end_session: bool, callback: impl FnOnce()) -> bool {
        let _gate = lock(&self.dispatch);
        {
            let mut state = lock(&self.state);
            if state.generation != generation {
                return false;
            }
            if end_session {
                state.generation += 1;
                // Dropping our own handle detaches it; the task returns right after.
                state.task.take();
            }
            state.dispatching = Some(thread::current().id());
        }

        callback();

        lock(&self.state).dispatching = None;
        true
    }
}

/// Polls one progress address until processing completes, a fetch fails, or
/// [`stop`](Self::stop) is called. Dropping the monitor stops it.
pub struct ProgressMonitor {
    source: Arc<dyn ProgressSource>,
    progress_url: Arc<str>,
    shared: Arc<Shared>,
}

impl fmt::Debug for ProgressMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressMonitor")
            .field("progress_url", &self.progress_url)
            .field("active", &self.is_active())
            .finish()
    }
}

impl ProgressMonitor {
    pub fn new(source: Arc<dyn ProgressSource>, progress_url: impl Into<String>) -> Self {
        Self {
            source,
            progress_url: Arc::from(progress_url.into()),
            shared: Arc::new(Shared::default()),
        }
    }

    pub fn progress_url(&self) -> &str {
        &self.progress_url
    }

    pub fn is_active(&self) -> bool {
        lock(&self.shared.state).task.is_some()
    }

    /// Start polling. The first poll happens one interval from now. A
    /// session that is already running is cancelled and replaced; none of
    /// its callbacks run after this returns.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, options: MonitorOptions) {
        if self.shared.retire() {
            tracing::debug!(progress_url = %self.progress_url, "Replacing running progress session");
        }

        let interval_ms = options.interval.as_millis() as u64;
        {
            let mut state = lock(&self.shared.state);
            // A concurrent start may have installed a session since retire.
            if let Some(previous) = state.task.take() {
                previous.abort();
            }
            state.generation += 1;
            let generation = state.generation;

            state.task = Some(tokio::spawn(poll_loop(
                self.source.clone(),
                self.progress_url.clone(),
                self.shared.clone(),
                generation,
                options,
            )));
        }

        tracing::info!(
            progress_url = %self.progress_url,
            interval_ms,
            "Progress monitoring started"
        );
    }

    /// Stop polling. Safe to call at any time, any number of times. Once
    /// this returns no callback of the stopped session is running or will
    /// run, unless called from inside one of those callbacks.
    pub fn stop(&self) {
        if self.shared.retire() {
            tracing::info!(progress_url = %self.progress_url, "Progress monitoring stopped");
        }
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop(
    source: Arc<dyn ProgressSource>,
    progress_url: Arc<str>,
    shared: Arc<Shared>,
    generation: u64,
    options: MonitorOptions,
) {
    let mut ticker = interval_at(Instant::now() + options.interval, options.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match source.fetch_progress(&progress_url).await {
            Ok(snapshot) => {
                let Some(progress) = snapshot.progress() else {
                    tracing::debug!(
                        progress_url = %progress_url,
                        error_code = ?snapshot.error,
                        "Skipping progress snapshot without a reading"
                    );
                    continue;
                };

                if !shared.deliver(generation, false, || (options.on_progress)(progress)) {
                    return;
                }

                if progress >= 100.0 {
                    shared.deliver(generation, true, || {
                        tracing::info!(progress_url = %progress_url, "Upload processing complete");
                        (options.on_complete)();
                    });
                    return;
                }
            }
            Err(err) => {
                shared.deliver(generation, true, || {
                    tracing::error!(
                        progress_url = %progress_url,
                        error = %err,
                        "Progress fetch failed, monitoring stopped"
                    );
                    (options.on_error)(err);
                });
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverCalled;

    #[async_trait]
    impl ProgressSource for NeverCalled {
        async fn fetch_progress(&self, _progress_url: &str) -> UploadResult<ProgressSnapshot> {
            panic!("source must not be polled");
        }
    }

    #[test]
    fn stop_before_start_is_noop() {
        let monitor = ProgressMonitor::new(Arc::new(NeverCalled), "https://example.com/p");
        assert!(!monitor.is_active());
        monitor.stop();
        monitor.stop();
        assert!(!monitor.is_active());
    }

    #[test]
    fn zero_interval_is_clamped() {
        let options = MonitorOptions::new().interval(Duration::ZERO);
        assert_eq!(options.poll_interval(), Duration::from_millis(1));
        assert_eq!(MonitorOptions::default().poll_interval(), DEFAULT_POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn start_then_stop_before_first_tick() {
        let monitor = ProgressMonitor::new(Arc::new(NeverCalled), "https://example.com/p");
        monitor.start(MonitorOptions::new());
        assert!(monitor.is_active());
        monitor.stop();
        assert!(!monitor.is_active());
        tokio::time::sleep(Duration::from_secs(5)).await;
    }
}
