//! Test WebSocket server.
//!
//! Loopback server driven by query-string directives, mirroring the harness
//! the transport is usually tested against:
//!
//! | Directive | Effect |
//! |-----------|--------|
//! | `exitCode=<u16>` | close the connection server-side with that code |
//! | `delay=<ms>` | wait before closing (default 500 ms, with `exitCode`) |
//! | `exitMessage=<str>` | close reason (with `exitCode`) |
//! | `echo=true` | echo every text/binary message back |

#![allow(dead_code)]

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tracing::debug;
use url::Url;

/// Initializes test logging; safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Directives
// ============================================================================

/// Behavior requested through the connection URL's query string.
#[derive(Debug, Clone)]
struct Directives {
    exit_code: Option<u16>,
    delay: Duration,
    exit_message: String,
    echo: bool,
}

fn parse_directives(uri: &str) -> Directives {
    let mut directives = Directives {
        exit_code: None,
        delay: Duration::from_millis(500),
        exit_message: String::new(),
        echo: false,
    };

    if let Ok(url) = Url::parse(&format!("ws://localhost{uri}")) {
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "exitCode" => directives.exit_code = value.parse().ok(),
                "delay" => {
                    if let Ok(ms) = value.parse() {
                        directives.delay = Duration::from_millis(ms);
                    }
                }
                "exitMessage" => directives.exit_message = value.into_owned(),
                "echo" => directives.echo = true,
                _ => {}
            }
        }
    }

    directives
}

// ============================================================================
// WsTestServer
// ============================================================================

/// Loopback WebSocket server bound to a random port.
///
/// Accepts any number of connections; each is handled according to the
/// directives in its URL. The accept loop is aborted on drop.
pub struct WsTestServer {
    port: u16,
    accept_task: JoinHandle<()>,
}

impl WsTestServer {
    /// Binds to `127.0.0.1:0` and starts accepting.
    pub async fn spawn() -> Result<Self> {
        init_tracing();

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let port = listener.local_addr()?.port();

        let accept_task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        debug!(?addr, "test server accepted connection");
                        tokio::spawn(async move {
                            let _ = handle_connection(stream).await;
                        });
                    }
                    Err(_) => break,
                }
            }
        });

        debug!(port, "test server started");
        Ok(Self { port, accept_task })
    }

    /// Plain connection URL.
    pub fn url(&self) -> String {
        format!("ws://127.0.0.1:{}/ws", self.port)
    }

    /// Connection URL carrying directives, e.g. `exitCode=1012&delay=100`.
    pub fn url_with(&self, query: &str) -> String {
        format!("ws://127.0.0.1:{}/ws?{query}", self.port)
    }
}

impl Drop for WsTestServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

// ============================================================================
// Connection Handling
// ============================================================================

async fn handle_connection(stream: TcpStream) -> Result<()> {
    let uri: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

    let seen = Arc::clone(&uri);
    let ws = accept_hdr_async(stream, move |request: &Request, mut response: Response| {
        *seen.lock() = Some(request.uri().to_string());
        // Accept any offered subprotocol by echoing the first one back, so the
        // client handshake (which rejects a missing selection) completes.
        if let Some(offered) = request.headers().get("Sec-WebSocket-Protocol") {
            if let Some(first) = offered
                .to_str()
                .ok()
                .and_then(|list| list.split(',').next())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                && let Ok(value) = HeaderValue::from_str(first)
            {
                response
                    .headers_mut()
                    .insert("Sec-WebSocket-Protocol", value);
            }
        }
        Ok(response)
    })
    .await?;

    let directives = {
        let uri = uri.lock();
        parse_directives(uri.as_deref().unwrap_or("/"))
    };
    debug!(?directives, "test server connection configured");

    let (mut write, mut read) = ws.split();

    if let Some(code) = directives.exit_code {
        tokio::time::sleep(directives.delay).await;
        let frame = CloseFrame {
            code: code.into(),
            reason: directives.exit_message.clone().into(),
        };
        let _ = write.send(Message::Close(Some(frame))).await;

        // Drain until the peer acknowledges or hangs up.
        while let Some(message) = read.next().await {
            if matches!(message, Ok(Message::Close(_)) | Err(_)) {
                break;
            }
        }
        return Ok(());
    }

    while let Some(message) = read.next().await {
        match message {
            Ok(msg @ (Message::Text(_) | Message::Binary(_))) => {
                if directives.echo {
                    let _ = write.send(msg).await;
                }
            }
            Ok(Message::Close(_)) | Err(_) => break,
            _ => {}
        }
    }

    Ok(())
}
