//! Transport configuration options.
//!
//! Options merge over documented defaults; anything not set keeps the
//! default.
//!
//! | Option | Default | Effect |
//! |--------|---------|--------|
//! | `auto_reconnect` | `true` | disables all reconnect logic when `false` |
//! | `max_retries` | unbounded | attempt count beyond which recovery stops |
//! | `retry_interval` | 5000 ms | delay before the next connect attempt |
//! | `should_reconnect` | fatal on 1008/1011/1015 | close-code retry policy |
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use resocket::{RetryInterval, TransportOptions};
//!
//! let options = TransportOptions::new()
//!     .with_max_retries(5)
//!     .with_retry_interval_fn(|_close, attempts| {
//!         // exponential backoff, capped at 30s
//!         Duration::from_millis((500 * 2u64.saturating_pow(attempts)).min(30_000))
//!     });
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::socket::{CloseEvent, close_code};

// ============================================================================
// Constants
// ============================================================================

/// Default delay before a reconnect attempt.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(5000);

// ============================================================================
// Types
// ============================================================================

/// Retry-delay policy callback.
///
/// Receives the close event that ended the previous socket and the current
/// attempt count, so exponential-style backoff can be expressed.
pub type RetryIntervalFn = Arc<dyn Fn(&CloseEvent, u32) -> Duration + Send + Sync>;

/// Close-code retry policy callback.
pub type ShouldReconnectFn = Arc<dyn Fn(&CloseEvent) -> bool + Send + Sync>;

// ============================================================================
// RetryInterval
// ============================================================================

/// Delay before the next connect attempt.
#[derive(Clone)]
pub enum RetryInterval {
    /// A constant delay.
    Fixed(Duration),

    /// A delay computed per close event and attempt count.
    Custom(RetryIntervalFn),
}

impl RetryInterval {
    /// Evaluates the policy for one reconnect decision.
    #[must_use]
    pub fn evaluate(&self, close: &CloseEvent, attempts: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Custom(policy) => policy(close, attempts),
        }
    }
}

impl Default for RetryInterval {
    fn default() -> Self {
        Self::Fixed(DEFAULT_RETRY_INTERVAL)
    }
}

impl fmt::Debug for RetryInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(delay) => f.debug_tuple("Fixed").field(delay).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

// ============================================================================
// Default Policy
// ============================================================================

/// Default close-code retry policy.
///
/// Policy violations, server-side internal errors and TLS failures are
/// treated as fatal; every other closure is worth retrying.
#[must_use]
pub fn default_should_reconnect(close: &CloseEvent) -> bool {
    !matches!(
        close.code,
        close_code::POLICY_VIOLATION | close_code::INTERNAL_ERROR | close_code::TLS_HANDSHAKE
    )
}

// ============================================================================
// TransportOptions
// ============================================================================

/// Resolved transport configuration.
///
/// Immutable after construction; the exclusive input to all reconnect
/// decisions.
#[derive(Clone)]
pub struct TransportOptions {
    /// When `false`, no reconnect logic runs at all.
    pub auto_reconnect: bool,

    /// Attempt count beyond which recovery stops. `None` means unbounded.
    pub max_retries: Option<u32>,

    /// Delay before the next connect attempt.
    pub retry_interval: RetryInterval,

    /// Close-code retry policy consulted on every recoverable closure.
    pub should_reconnect: ShouldReconnectFn,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            max_retries: None,
            retry_interval: RetryInterval::default(),
            should_reconnect: Arc::new(default_should_reconnect),
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl TransportOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl TransportOptions {
    /// Enables or disables automatic reconnection.
    #[inline]
    #[must_use]
    pub fn with_auto_reconnect(mut self, auto_reconnect: bool) -> Self {
        self.auto_reconnect = auto_reconnect;
        self
    }

    /// Bounds the number of reconnect attempts.
    #[inline]
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Sets a constant reconnect delay.
    #[inline]
    #[must_use]
    pub fn with_retry_interval(mut self, delay: Duration) -> Self {
        self.retry_interval = RetryInterval::Fixed(delay);
        self
    }

    /// Sets a computed reconnect delay.
    #[inline]
    #[must_use]
    pub fn with_retry_interval_fn(
        mut self,
        policy: impl Fn(&CloseEvent, u32) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.retry_interval = RetryInterval::Custom(Arc::new(policy));
        self
    }

    /// Sets the close-code retry policy.
    #[inline]
    #[must_use]
    pub fn with_should_reconnect(
        mut self,
        policy: impl Fn(&CloseEvent) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.should_reconnect = Arc::new(policy);
        self
    }
}

impl fmt::Debug for TransportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportOptions")
            .field("auto_reconnect", &self.auto_reconnect)
            .field("max_retries", &self.max_retries)
            .field("retry_interval", &self.retry_interval)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
