//! Socket connectors.
//!
//! A [`Connector`] creates socket instances on behalf of the transport. It
//! returns immediately with a [`SocketHandle`] and the socket's event stream;
//! every failure — malformed address, refused dial, handshake error — is
//! reported through that stream rather than as a synchronous error, so the
//! transport's retry policy sees a uniform sequence of events.
//!
//! [`WsConnector`] is the default implementation. Each socket runs a spawned
//! I/O task that dials with `tokio-tungstenite`, splits the stream, and
//! multiplexes owner commands against inbound frames.

// ============================================================================
// Imports
// ============================================================================

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};

use super::event::{CloseEvent, SocketEvent};
use super::handle::{SocketCommand, SocketHandle};

// ============================================================================
// Connector
// ============================================================================

/// Creates socket instances for the transport.
///
/// Implementations must return immediately; connection failures surface
/// through the returned event stream, which ends with exactly one
/// [`SocketEvent::Closed`].
pub trait Connector: Send + Sync {
    /// Opens a new socket bound to `address`, negotiating `protocols`.
    fn connect(
        &self,
        address: &str,
        protocols: &[String],
    ) -> (SocketHandle, mpsc::UnboundedReceiver<SocketEvent>);
}

// ============================================================================
// WsConnector
// ============================================================================

/// Default connector backed by `tokio-tungstenite`.
///
/// Must be used from within a Tokio runtime: each socket spawns one I/O task.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn connect(
        &self,
        address: &str,
        protocols: &[String],
    ) -> (SocketHandle, mpsc::UnboundedReceiver<SocketEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_socket(
            address.to_owned(),
            protocols.to_vec(),
            command_rx,
            event_tx,
        ));

        (SocketHandle::new(command_tx), event_rx)
    }
}

// ============================================================================
// Request Building
// ============================================================================

/// Builds the client handshake request, joining subprotocols into a
/// `Sec-WebSocket-Protocol` header.
fn build_request(address: &str, protocols: &[String]) -> Result<Request> {
    let url = Url::parse(address).map_err(|e| Error::invalid_address(e.to_string()))?;
    let mut request = url.as_str().into_client_request()?;

    if !protocols.is_empty() {
        let joined = protocols.join(", ");
        let value = HeaderValue::from_str(&joined)
            .map_err(|_| Error::invalid_address(format!("invalid subprotocol list: {joined}")))?;
        request.headers_mut().insert("Sec-WebSocket-Protocol", value);
    }

    Ok(request)
}

// ============================================================================
// I/O Task
// ============================================================================

/// Per-socket I/O task: dial, then multiplex commands against inbound frames.
async fn run_socket(
    address: String,
    protocols: Vec<String>,
    mut commands: mpsc::UnboundedReceiver<SocketCommand>,
    events: mpsc::UnboundedSender<SocketEvent>,
) {
    let request = match build_request(&address, &protocols) {
        Ok(request) => request,
        Err(e) => {
            warn!(address = %address, error = %e, "Invalid WebSocket address");
            let _ = events.send(SocketEvent::Error {
                message: e.to_string(),
            });
            let _ = events.send(SocketEvent::Closed(CloseEvent::abnormal()));
            return;
        }
    };

    // Dial, staying responsive to an early close request.
    let connect = connect_async(request);
    tokio::pin!(connect);

    let stream = loop {
        tokio::select! {
            result = &mut connect => match result {
                Ok((stream, _response)) => break stream,
                Err(e) => {
                    warn!(address = %address, error = %e, "WebSocket dial failed");
                    let _ = events.send(SocketEvent::Error {
                        message: e.to_string(),
                    });
                    let _ = events.send(SocketEvent::Closed(CloseEvent::abnormal()));
                    return;
                }
            },
            command = commands.recv() => match command {
                Some(SocketCommand::Close { code, reason }) => {
                    debug!(address = %address, code, "Socket closed while connecting");
                    let _ = events.send(SocketEvent::Closed(CloseEvent::new(code, reason)));
                    return;
                }
                // No stream to write to yet; messages queued while connecting
                // are dropped, as the underlying primitive would drop them.
                Some(SocketCommand::Send(_)) => {}
                None => {
                    debug!(address = %address, "Owner gone while connecting");
                    let _ = events.send(SocketEvent::Closed(CloseEvent::normal()));
                    return;
                }
            },
        }
    };

    debug!(address = %address, "WebSocket connection established");
    let _ = events.send(SocketEvent::Open);

    let (mut write, mut read) = stream.split();

    // Set when this side initiates the close handshake; the requested code is
    // what the close event reports, not whatever the peer echoes back.
    let mut initiated: Option<CloseEvent> = None;
    let mut commands_open = true;

    loop {
        tokio::select! {
            incoming = read.next() => match incoming {
                Some(Ok(Message::Close(frame))) => {
                    let close = initiated.take().unwrap_or_else(|| match frame {
                        Some(frame) => CloseEvent::new(frame.code.into(), frame.reason.as_str()),
                        None => CloseEvent::normal(),
                    });
                    debug!(code = close.code, reason = %close.reason, "WebSocket closed");
                    let _ = events.send(SocketEvent::Closed(close));
                    break;
                }

                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}

                Some(Ok(message)) => {
                    let _ = events.send(SocketEvent::Message(message));
                }

                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket stream error");
                    let _ = events.send(SocketEvent::Error {
                        message: e.to_string(),
                    });
                    let close = initiated.take().unwrap_or_else(CloseEvent::abnormal);
                    let _ = events.send(SocketEvent::Closed(close));
                    break;
                }

                None => {
                    let close = initiated.take().unwrap_or_else(CloseEvent::abnormal);
                    let _ = events.send(SocketEvent::Closed(close));
                    break;
                }
            },

            command = commands.recv(), if commands_open => match command {
                Some(SocketCommand::Send(message)) => {
                    if initiated.is_none()
                        && let Err(e) = write.send(message).await
                    {
                        warn!(error = %e, "Failed to send message");
                    }
                }

                Some(SocketCommand::Close { code, reason }) => {
                    if initiated.is_none() {
                        initiated = Some(CloseEvent::new(code, reason.clone()));
                        let frame = CloseFrame {
                            code: code.into(),
                            reason: reason.into(),
                        };
                        if let Err(e) = write.send(Message::Close(Some(frame))).await {
                            debug!(error = %e, "Close frame not delivered");
                            let close = initiated.take().unwrap_or_else(CloseEvent::abnormal);
                            let _ = events.send(SocketEvent::Closed(close));
                            break;
                        }
                    }
                }

                // Every handle dropped; tear the socket down.
                None => {
                    commands_open = false;
                    if initiated.is_none() {
                        initiated = Some(CloseEvent::normal());
                        let frame = CloseFrame {
                            code: CloseEvent::normal().code.into(),
                            reason: "".into(),
                        };
                        let _ = write.send(Message::Close(Some(frame))).await;
                    }
                }
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
