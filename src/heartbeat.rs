//! Restartable keep-alive scheduler.
//!
//! A [`Heartbeat`] invokes a handler at a fixed interval, with the countdown
//! resettable without stopping. It has no dependency on the transport; owners
//! compose the two, typically postponing the heartbeat on every inbound
//! message and sending a keep-alive from the handler:
//!
//! ```ignore
//! use std::sync::Arc;
//! use resocket::{Heartbeat, HeartbeatOptions, Transport};
//!
//! let transport = Arc::new(Transport::new("wss://example.com/ws"));
//!
//! let sender = Arc::clone(&transport);
//! let heartbeat = Arc::new(Heartbeat::with_options(
//!     HeartbeatOptions::new().with_handler(move || {
//!         let _ = sender.send("ping".into());
//!     }),
//! ));
//!
//! let keepalive = Arc::clone(&heartbeat);
//! transport.set_message_handler(move |_| keepalive.postpone());
//! heartbeat.start();
//! ```
//!
//! The timer is modeled as "schedule one-shot, on fire run the handler and
//! schedule the next one-shot", never as a recurring interval primitive, so
//! postponing composes naturally with cancellation.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::debug;

// ============================================================================
// Constants
// ============================================================================

/// Default firing interval.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(5000);

// ============================================================================
// HeartbeatOptions
// ============================================================================

/// Handler invoked on every firing.
pub type HeartbeatHandler = Arc<dyn Fn() + Send + Sync>;

/// Heartbeat configuration.
#[derive(Clone)]
pub struct HeartbeatOptions {
    /// Time between firings.
    pub interval: Duration,

    /// Invoked on every firing. No-op by default.
    pub handler: HeartbeatHandler,
}

impl Default for HeartbeatOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_HEARTBEAT_INTERVAL,
            handler: Arc::new(|| {}),
        }
    }
}

impl HeartbeatOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the firing interval.
    #[inline]
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the firing handler.
    #[inline]
    #[must_use]
    pub fn with_handler(mut self, handler: impl Fn() + Send + Sync + 'static) -> Self {
        self.handler = Arc::new(handler);
        self
    }
}

impl fmt::Debug for HeartbeatOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeartbeatOptions")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Heartbeat
// ============================================================================

/// Running ticker state: a control channel plus the task it drives.
struct Ticker {
    postpone_tx: mpsc::UnboundedSender<()>,
    task: JoinHandle<()>,
}

/// Restartable periodic scheduler.
///
/// At most one firing is pending at any time. [`postpone`] resets the
/// countdown without invoking the handler; [`stop`] guarantees zero further
/// firings until [`start`] is called again. Dropping the heartbeat stops it.
///
/// [`start`]: Heartbeat::start
/// [`postpone`]: Heartbeat::postpone
/// [`stop`]: Heartbeat::stop
pub struct Heartbeat {
    /// Immutable configuration.
    options: HeartbeatOptions,
    /// Currently running ticker, if any.
    ticker: Mutex<Option<Ticker>>,
}

impl Heartbeat {
    /// Creates a stopped heartbeat with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(HeartbeatOptions::default())
    }

    /// Creates a stopped heartbeat with the given options.
    #[must_use]
    pub fn with_options(options: HeartbeatOptions) -> Self {
        Self {
            options,
            ticker: Mutex::new(None),
        }
    }

    /// Returns the configured interval.
    #[inline]
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.options.interval
    }

    /// Returns `true` while firings are scheduled.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.ticker
            .lock()
            .as_ref()
            .is_some_and(|ticker| !ticker.task.is_finished())
    }

    /// Starts (or restarts) the countdown from zero.
    ///
    /// Any previously pending firing is cancelled first. Must be called from
    /// within a Tokio runtime.
    pub fn start(&self) {
        let mut ticker = self.ticker.lock();
        if let Some(previous) = ticker.take() {
            previous.task.abort();
        }
        *ticker = Some(self.spawn_ticker());
    }

    /// Resets the countdown without invoking the handler.
    ///
    /// Starts the countdown when the heartbeat is idle.
    pub fn postpone(&self) {
        let mut ticker = self.ticker.lock();
        let alive = ticker
            .as_ref()
            .is_some_and(|current| current.postpone_tx.send(()).is_ok());

        if !alive {
            if let Some(finished) = ticker.take() {
                finished.task.abort();
            }
            *ticker = Some(self.spawn_ticker());
        }
    }

    /// Cancels the pending firing; nothing fires until the next `start`.
    ///
    /// Idempotent: stopping an already-stopped heartbeat is a no-op.
    pub fn stop(&self) {
        if let Some(ticker) = self.ticker.lock().take() {
            ticker.task.abort();
            debug!("Heartbeat stopped");
        }
    }

    /// Spawns the self-rescheduling ticker task.
    fn spawn_ticker(&self) -> Ticker {
        let interval = self.options.interval;
        let handler = Arc::clone(&self.options.handler);
        let (postpone_tx, mut postpone_rx) = mpsc::unbounded_channel::<()>();

        let task = tokio::spawn(async move {
            let timer = sleep(interval);
            tokio::pin!(timer);

            loop {
                tokio::select! {
                    () = timer.as_mut() => {
                        handler();
                        timer.as_mut().reset(Instant::now() + interval);
                    }
                    postponed = postpone_rx.recv() => match postponed {
                        Some(()) => timer.as_mut().reset(Instant::now() + interval),
                        None => break,
                    },
                }
            }
        });

        Ticker { postpone_tx, task }
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for Heartbeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heartbeat")
            .field("interval", &self.options.interval)
            .field("running", &self.is_running())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
