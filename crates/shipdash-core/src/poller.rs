//! Long-running-operation poller
//!
//! Backend jobs are started with one request and then observed through a status
//! endpoint. [`Poller`] turns that into a stream of [`OperationStatus`] updates
//! delivered to a single callback, ending with exactly one terminal status
//! (`completed` or `failed`) unless the session is cancelled first.
//!
//! - The first status check happens one interval after [`Poller::start`], never
//!   inline.
//! - Checks are strictly sequential: the next timer is armed only after the
//!   previous check resolved.
//! - A failed status request ends polling with a synthetic `failed` status; it
//!   is not retried.
//! - When `max_attempts` is set and the last allowed check is still
//!   non-terminal, a synthetic `failed` status is delivered instead.
//! - Cancellation delivers nothing. A check that resolves after cancellation is
//!   discarded.
//!
//! # Example
//!
//! ```rust,ignore
//! use shipdash_core::{OperationHandle, Poller, PollOutcome};
//! use std::time::Duration;
//!
//! let session = Poller::new(client.clone())
//!     .interval(Duration::from_secs(2))
//!     .max_attempts(150)
//!     .start(
//!         OperationHandle::new("job-42"),
//!         Box::new(|status| println!("{}: {}", status.state, status.message)),
//!     );
//!
//! match session.wait().await {
//!     PollOutcome::Completed(status) => println!("done: {}", status.message),
//!     PollOutcome::Failed(status) => eprintln!("failed: {}", status.message),
//!     PollOutcome::Cancelled => {}
//! }
//! ```

use crate::error::Result;
use crate::operation::{OperationHandle, OperationState, OperationStatus};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default time between status checks
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(2000);

/// Callback receiving every status snapshot, terminal or not
pub type UpdateCallback = Box<dyn Fn(OperationStatus) + Send + Sync>;

/// Source of status snapshots for a handle
///
/// An `Err` means the status could not be obtained at all (network failure,
/// non-2xx answer, malformed body). A job that failed on the backend is an
/// `Ok` status with state `failed`.
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    async fn fetch_status(&self, handle: &OperationHandle) -> Result<OperationStatus>;
}

#[async_trait]
impl<T: StatusFetcher + ?Sized> StatusFetcher for Arc<T> {
    async fn fetch_status(&self, handle: &OperationHandle) -> Result<OperationStatus> {
        (**self).fetch_status(handle).await
    }
}

/// Adapts an async closure into a [`StatusFetcher`]
pub struct FetchFn<F>(pub F);

#[async_trait]
impl<F, Fut> StatusFetcher for FetchFn<F>
where
    F: Fn(OperationHandle) -> Fut + Send + Sync,
    Fut: Future<Output = Result<OperationStatus>> + Send,
{
    async fn fetch_status(&self, handle: &OperationHandle) -> Result<OperationStatus> {
        (self.0)(handle.clone()).await
    }
}

/// Timing options for a poll session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Time between the end of one status check and the start of the next
    pub interval: Duration,
    /// Upper bound on status checks; `None` polls until a terminal state
    pub max_attempts: Option<NonZeroU32>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_attempts: None,
        }
    }
}

impl PollOptions {
    /// Build options from raw values; `max_attempts` of 0 means unlimited
    pub fn new(interval: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.and_then(NonZeroU32::new),
        }
    }
}

/// Lifecycle of a poll session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
    Completed,
    Failed,
    Cancelled,
}

impl PollState {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Polling => "polling",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// How a poll session ended
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The backend reported `completed`; this status was the terminal update
    Completed(OperationStatus),
    /// The backend reported `failed`, or the poller produced a synthetic failure
    Failed(OperationStatus),
    /// Cancelled before a terminal state; no terminal update was delivered
    Cancelled,
}

impl PollOutcome {
    /// The terminal status, if one was delivered
    pub fn status(&self) -> Option<&OperationStatus> {
        match self {
            Self::Completed(status) | Self::Failed(status) => Some(status),
            Self::Cancelled => None,
        }
    }

    pub fn state(&self) -> PollState {
        match self {
            Self::Completed(_) => PollState::Completed,
            Self::Failed(_) => PollState::Failed,
            Self::Cancelled => PollState::Cancelled,
        }
    }
}

/// Configured, not yet started poller
///
/// A poller serves exactly one handle: [`Poller::start`] consumes it.
pub struct Poller {
    fetcher: Arc<dyn StatusFetcher>,
    options: PollOptions,
}

impl Poller {
    pub fn new<F: StatusFetcher + 'static>(fetcher: F) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            options: PollOptions::default(),
        }
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.options.interval = interval;
        self
    }

    /// Limit the number of status checks; 0 removes the limit
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.options.max_attempts = NonZeroU32::new(max_attempts);
        self
    }

    pub fn with_options(mut self, options: PollOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> PollOptions {
        self.options
    }

    /// Begin polling `handle` on the current tokio runtime
    ///
    /// Returns immediately; the first status check runs one interval later.
    /// Panics if called outside a tokio runtime.
    pub fn start(self, handle: OperationHandle, on_update: UpdateCallback) -> PollSession {
        let token = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(PollState::Idle);

        debug!(
            handle = %handle,
            interval_ms = self.options.interval.as_millis() as u64,
            max_attempts = ?self.options.max_attempts,
            "Starting poll session"
        );

        let task = tokio::spawn(run(
            handle.clone(),
            self.fetcher,
            on_update,
            self.options,
            token.clone(),
            state_tx,
        ));

        PollSession {
            handle,
            token,
            state: state_rx,
            task: Some(task),
        }
    }
}

/// A running poll session for one handle
///
/// Dropping the session cancels it.
pub struct PollSession {
    handle: OperationHandle,
    token: CancellationToken,
    state: watch::Receiver<PollState>,
    task: Option<JoinHandle<PollOutcome>>,
}

impl PollSession {
    pub fn handle(&self) -> &OperationHandle {
        &self.handle
    }

    /// Token that stops this session when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Request cancellation; no status check starts and no update is delivered
    /// once the request is observed
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn state(&self) -> PollState {
        *self.state.borrow()
    }

    /// Wait for the session to end
    pub async fn wait(mut self) -> PollOutcome {
        let Some(task) = self.task.take() else {
            return PollOutcome::Cancelled;
        };

        match task.await {
            Ok(outcome) => outcome,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => PollOutcome::Cancelled,
        }
    }
}

impl Drop for PollSession {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run(
    handle: OperationHandle,
    fetcher: Arc<dyn StatusFetcher>,
    on_update: UpdateCallback,
    options: PollOptions,
    token: CancellationToken,
    state: watch::Sender<PollState>,
) -> PollOutcome {
    state.send_replace(PollState::Polling);
    let mut attempts: u32 = 0;

    let outcome = loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break PollOutcome::Cancelled,
            _ = tokio::time::sleep(options.interval) => {}
        }

        attempts += 1;
        debug!(handle = %handle, attempt = attempts, "Checking operation status");

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => break PollOutcome::Cancelled,
            result = fetcher.fetch_status(&handle) => result,
        };

        // A check that finished after cancellation is discarded
        if token.is_cancelled() {
            break PollOutcome::Cancelled;
        }

        let status = match result {
            Ok(status) => status,
            Err(err) => {
                warn!(handle = %handle, attempt = attempts, error = %err, "Status check failed");
                let status = OperationStatus::transport_failure(&err);
                on_update(status.clone());
                break PollOutcome::Failed(status);
            }
        };

        if !status.is_recognized_state() {
            warn!(
                handle = %handle,
                reported_state = %status.reported_state,
                "Unrecognized operation state, treating as running"
            );
        }

        if status.is_terminal() {
            info!(handle = %handle, state = %status.state, attempts, "Operation finished");
            on_update(status.clone());
            break match status.state {
                OperationState::Completed => PollOutcome::Completed(status),
                _ => PollOutcome::Failed(status),
            };
        }

        if let Some(max) = options.max_attempts
            && attempts >= max.get()
        {
            warn!(handle = %handle, attempts, "Giving up without a terminal state");
            let exhausted = OperationStatus::attempts_exhausted(attempts, &status);
            on_update(exhausted.clone());
            break PollOutcome::Failed(exhausted);
        }

        on_update(status);
    };

    if matches!(outcome, PollOutcome::Cancelled) {
        debug!(handle = %handle, attempts, "Poll session cancelled");
    }
    state.send_replace(outcome.state());
    outcome
}
