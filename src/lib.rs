//! Resocket - Resilient WebSocket transport.
//!
//! This library wraps a single logical WebSocket connection in a
//! connection-lifecycle manager: it establishes the connection, detects loss,
//! decides whether and when to re-establish it, suspends retries while the
//! network is unreachable, and optionally emits periodic keep-alive signals
//! while idle.
//!
//! # Architecture
//!
//! Two components, the second independent of the first:
//!
//! - **[`Transport`]**: owns one socket at a time and drives the
//!   `connecting → connected → disconnected → (reconnect | terminal)` state
//!   machine. Socket I/O, lifecycle events and reachability signals meet in a
//!   single supervisor task; the handle you hold is cheap and non-blocking.
//! - **[`Heartbeat`]**: a restartable self-rescheduling timer. Compose it with
//!   the transport externally, postponing on every inbound message and sending
//!   a keep-alive from the handler.
//!
//! # Quick Start
//!
//! ```no_run
//! use resocket::{EventKind, Transport, TransportOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     // Connects immediately; reconnects on failure every 2s, at most 10 times.
//!     let transport = Transport::builder("wss://example.com/ws")
//!         .options(
//!             TransportOptions::new()
//!                 .with_max_retries(10)
//!                 .with_retry_interval(std::time::Duration::from_secs(2)),
//!         )
//!         .build();
//!
//!     transport.on(EventKind::Connected, |_| println!("up"));
//!     transport.on(EventKind::Disconnected, |_| println!("down"));
//!
//!     // ... later:
//!     transport.close();
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`transport`] | Connection lifecycle state machine and retry policy |
//! | [`heartbeat`] | Restartable keep-alive scheduler |
//! | [`socket`] | Socket primitive seam ([`Connector`], [`SocketHandle`]) |
//! | [`event`] | Lifecycle events and the emitter |
//! | [`reachability`] | Injected online/offline capability |
//! | [`error`] | Error types and [`Result`] alias |
//!
//! # Failure Surface
//!
//! Connection establishment never fails synchronously: a malformed address or
//! an unreachable host surfaces as a `connect-error` event followed by
//! `disconnected`, and the retry policy takes over from there. Errors are
//! returned only from message sends against a dead socket.

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Transport lifecycle events and the emitter that dispatches them.
pub mod event;

/// Restartable keep-alive scheduler.
pub mod heartbeat;

/// Network reachability provider.
pub mod reachability;

/// Socket primitive seam.
///
/// The transport talks to its socket through the [`Connector`] /
/// [`SocketHandle`] pair defined here.
pub mod socket;

/// Connection lifecycle management.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result};

// Event types
pub use event::{Emitter, EventKind, EventListener, TransportEvent};

// Heartbeat types
pub use heartbeat::{DEFAULT_HEARTBEAT_INTERVAL, Heartbeat, HeartbeatHandler, HeartbeatOptions};

// Reachability types
pub use reachability::{NetworkSwitch, Reachability};

// Socket types
pub use socket::{
    CloseEvent, Connector, Message, SocketCommand, SocketEvent, SocketHandle, WsConnector,
    close_code,
};

// Transport types
pub use transport::{
    DEFAULT_RETRY_INTERVAL, MessageHandler, RetryInterval, Transport, TransportBuilder,
    TransportOptions, default_should_reconnect,
};
