//! Command endpoint for a live socket.
//!
//! A [`SocketHandle`] is the owner-facing half of a socket: a clonable,
//! non-blocking channel into the I/O task. The transport replaces the handle
//! on every connect attempt; a handle whose task has exited simply reports
//! [`Error::ConnectionClosed`] on use.
//!
//! [`Error::ConnectionClosed`]: crate::error::Error::ConnectionClosed

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::error::{Error, Result};

// ============================================================================
// SocketCommand
// ============================================================================

/// A command sent from the socket owner to the I/O task.
#[derive(Debug, Clone)]
pub enum SocketCommand {
    /// Send a message over the socket.
    Send(Message),

    /// Close the socket with the given code and reason.
    Close {
        /// Close code to send in the close frame.
        code: u16,
        /// Close reason, possibly empty.
        reason: String,
    },
}

// ============================================================================
// SocketHandle
// ============================================================================

/// Clonable command endpoint for one socket instance.
///
/// All operations are non-blocking: commands are queued for the I/O task and
/// the call returns immediately.
#[derive(Debug, Clone)]
pub struct SocketHandle {
    /// Channel into the socket's I/O task.
    commands: mpsc::UnboundedSender<SocketCommand>,
}

impl SocketHandle {
    /// Creates a handle over a command channel.
    ///
    /// Called by [`Connector`] implementations when they spawn a socket.
    ///
    /// [`Connector`]: crate::socket::Connector
    #[inline]
    #[must_use]
    pub fn new(commands: mpsc::UnboundedSender<SocketCommand>) -> Self {
        Self { commands }
    }

    /// Sends a message over the socket.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionClosed`] if the socket's I/O task has exited.
    pub fn send(&self, message: Message) -> Result<()> {
        self.commands
            .send(SocketCommand::Send(message))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Sends a text message over the socket.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionClosed`] if the socket's I/O task has exited.
    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.send(Message::Text(text.into().into()))
    }

    /// Requests the socket to close with the given code and reason.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionClosed`] if the socket's I/O task has exited.
    pub fn close(&self, code: u16, reason: impl Into<String>) -> Result<()> {
        self.commands
            .send(SocketCommand::Close {
                code,
                reason: reason.into(),
            })
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Returns `true` while the socket's I/O task is still accepting commands.
    #[inline]
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.commands.is_closed()
    }
}

// ============================================================================
// Tests
// ============================================================================
