//! Connection lifecycle management.
//!
//! This module owns the reconnecting state machine wrapped around one logical
//! WebSocket connection.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  control   ┌──────────────┐  commands   ┌────────────┐
//! │  Transport   │ ─────────► │  Supervisor  │ ──────────► │  Socket    │
//! │  (handle)    │            │  (task)      │ ◄────────── │  I/O task  │
//! └──────────────┘            └──────┬───────┘   events    └────────────┘
//!        ▲                          │
//!        │     lifecycle events     │   reachability transitions
//!        └──────────────────────────┴─────────────────────────────
//! ```
//!
//! The supervisor applies the retry policy on every closure: forced closes
//! and fatal close codes halt recovery, an exhausted retry budget emits
//! `max-retries-made`, an offline network defers the reconnect until the
//! reachability provider reports the network back, and everything else
//! schedules a delayed attempt.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | Transport handle and supervisor state machine |
//! | `builder` | Fluent construction with injection points |
//! | `options` | Retry policy configuration |

// ============================================================================
// Submodules
// ============================================================================

/// Transport handle and supervisor state machine.
pub mod core;

/// Fluent construction with injection points.
pub mod builder;

/// Retry policy configuration.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::TransportBuilder;
pub use core::{MessageHandler, Transport};
pub use options::{
    DEFAULT_RETRY_INTERVAL, RetryInterval, RetryIntervalFn, ShouldReconnectFn, TransportOptions,
    default_should_reconnect,
};
