//! Socket primitive seam.
//!
//! The transport owns one socket at a time but never touches I/O directly: it
//! talks to the socket through a [`SocketHandle`] (commands) and an event
//! stream of [`SocketEvent`]s (lifecycle). The [`Connector`] trait creates
//! that pair; [`WsConnector`] is the default implementation backed by
//! `tokio-tungstenite`.
//!
//! # Contract
//!
//! ```text
//! ┌───────────┐   SocketCommand    ┌──────────────┐
//! │ Transport │ ─────────────────► │  I/O task    │
//! │           │ ◄───────────────── │  (per socket)│
//! └───────────┘    SocketEvent     └──────────────┘
//! ```
//!
//! A socket's event stream ends with exactly one [`SocketEvent::Closed`];
//! dial failures emit [`SocketEvent::Error`] followed by `Closed`, never a
//! synchronous error.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event` | Socket events, close events and close codes |
//! | `handle` | Command endpoint handed to the socket owner |
//! | `connector` | The `Connector` trait and the tungstenite-backed default |

// ============================================================================
// Submodules
// ============================================================================

/// Socket events, close events and close codes.
pub mod event;

/// Command endpoint handed to the socket owner.
pub mod handle;

/// The `Connector` trait and the tungstenite-backed default.
pub mod connector;

// ============================================================================
// Re-exports
// ============================================================================

pub use connector::{Connector, WsConnector};
pub use event::{CloseEvent, SocketEvent, close_code};
pub use handle::{SocketCommand, SocketHandle};

/// WebSocket message type, re-exported from `tungstenite`.
pub use tokio_tungstenite::tungstenite::Message;
