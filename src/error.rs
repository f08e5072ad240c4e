//! Error types for the resocket transport.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use resocket::{Result, Transport};
//!
//! fn keep_alive(transport: &Transport) -> Result<()> {
//!     transport.send("ping".into())?;
//!     Ok(())
//! }
//! ```
//!
//! Note that connection *establishment* failures are never returned as
//! errors: they surface asynchronously as [`connect-error`] and
//! [`disconnected`] lifecycle events, mirroring the behavior of a browser
//! `WebSocket` whose constructor does not throw for unreachable hosts.
//!
//! [`connect-error`]: crate::event::EventKind::ConnectError
//! [`disconnected`]: crate::event::EventKind::Disconnected

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    /// The target address could not be parsed or used as a WebSocket URL.
    ///
    /// Returned when building a client request from a malformed address or
    /// an invalid subprotocol list.
    #[error("Invalid address: {message}")]
    InvalidAddress {
        /// Description of what was wrong with the address.
        message: String,
    },

    /// No socket is currently attached to the transport.
    ///
    /// Returned from send operations issued before the first socket was
    /// created.
    #[error("Not connected")]
    NotConnected,

    /// The socket this handle points at has terminated.
    ///
    /// Returned when sending into a socket whose I/O task already exited.
    #[error("Connection closed")]
    ConnectionClosed,

    /// WebSocket protocol error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates an invalid address error.
    #[inline]
    pub fn invalid_address(message: impl Into<String>) -> Self {
        Self::InvalidAddress {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::NotConnected | Self::ConnectionClosed | Self::WebSocket(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
