//! Transport handle and supervisor task.
//!
//! The [`Transport`] value handed to callers is a cheap handle: shared state
//! plus a control channel. All lifecycle decisions run on a spawned
//! supervisor task that owns the mutable state machine and multiplexes
//! socket events, reachability transitions, the reconnect timer and control
//! commands with `tokio::select!`.
//!
//! # State Machine
//!
//! ```text
//! Connecting ──► Connected ──► Disconnected ──┬─► Reconnecting ──► Connecting
//!                                             ├─► AwaitingNetwork ─► Connecting
//!                                             ├─► MaxRetriesReached (terminal)
//!                                             └─► Closed (terminal)
//! ```
//!
//! Every transition emits exactly one lifecycle event through the emitter;
//! no transition is silent and none emits twice.

// ============================================================================
// Imports
// ============================================================================

use std::future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{self, Sleep};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::event::{Emitter, EventKind, TransportEvent};
use crate::reachability::Reachability;
use crate::socket::{CloseEvent, Connector, Message, SocketEvent, SocketHandle, close_code};

use super::builder::TransportBuilder;
use super::options::TransportOptions;

// ============================================================================
// Types
// ============================================================================

/// Inbound-message callback type.
///
/// Called for each message received on the active socket. Typically used to
/// postpone a keep-alive heartbeat while traffic is still flowing.
pub type MessageHandler = Box<dyn Fn(&Message) + Send + Sync>;

/// Control commands from the handle to the supervisor.
enum Ctrl {
    /// Forced close requested by the owner.
    Close {
        code: u16,
        reason: String,
    },
}

/// Outcome of one reconnect decision.
enum Decision {
    /// Stop automatic recovery permanently.
    Halt,
    /// Defer until the network is reachable again.
    AwaitNetwork,
    /// Schedule a connect attempt after the delay.
    Retry(Duration),
}

// ============================================================================
// Shared State
// ============================================================================

/// State shared between the handle and the supervisor task.
struct Shared {
    /// Immutable target address.
    address: String,
    /// Immutable subprotocol list.
    protocols: Vec<String>,
    /// Resolved configuration.
    options: TransportOptions,
    /// Lifecycle event emitter.
    emitter: Emitter,
    /// Connect attempts since the last successful open.
    attempts: AtomicU32,
    /// Set by an explicit close; suppresses reconnect on the resulting
    /// close event. Cleared at the start of every connect attempt.
    force_closed: AtomicBool,
    /// Handle to the currently owned socket, replaced on every attempt.
    socket: Mutex<Option<SocketHandle>>,
    /// Inbound-message callback.
    message_handler: Mutex<Option<MessageHandler>>,
}

// ============================================================================
// Transport
// ============================================================================

/// Resilient connection manager for one logical WebSocket connection.
///
/// Connects immediately on construction. On socket closure it consults the
/// retry policy and either schedules a delayed reconnect, waits for the
/// network to come back online, or gives up permanently. Lifecycle
/// transitions are announced through [`TransportEvent`]s.
///
/// Dropping the transport closes the active socket and stops all automatic
/// activity.
///
/// # Example
///
/// ```ignore
/// use resocket::{EventKind, Transport, TransportOptions};
///
/// let transport = Transport::builder("wss://example.com/ws")
///     .options(TransportOptions::new().with_max_retries(5))
///     .build();
///
/// transport.on(EventKind::Connected, |_| println!("up"));
/// ```
pub struct Transport {
    /// State shared with the supervisor.
    shared: Arc<Shared>,
    /// Reachability provider, kept for the `is_online` accessor.
    reachability: Arc<dyn Reachability>,
    /// Control channel into the supervisor.
    ctrl_tx: mpsc::UnboundedSender<Ctrl>,
}

// ============================================================================
// Transport - Construction
// ============================================================================

impl Transport {
    /// Connects to `address` with default options.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self::builder(address).build()
    }

    /// Returns a builder for a configured transport.
    #[must_use]
    pub fn builder(address: impl Into<String>) -> TransportBuilder {
        TransportBuilder::new(address)
    }

    /// Spawns the supervisor and performs the first connect attempt.
    ///
    /// The first attempt happens synchronously so the socket handle is
    /// available as soon as construction returns.
    pub(crate) fn spawn(
        address: String,
        protocols: Vec<String>,
        options: TransportOptions,
        connector: Arc<dyn Connector>,
        reachability: Arc<dyn Reachability>,
    ) -> Self {
        let shared = Arc::new(Shared {
            address,
            protocols,
            options,
            emitter: Emitter::new(),
            attempts: AtomicU32::new(0),
            force_closed: AtomicBool::new(false),
            socket: Mutex::new(None),
            message_handler: Mutex::new(None),
        });

        let (ctrl_tx, ctrl_rx) = mpsc::unbounded_channel();

        let supervisor = Supervisor {
            shared: Arc::clone(&shared),
            connector,
            reachability: Arc::clone(&reachability),
            ctrl_rx,
        };

        let events = supervisor.open_socket();
        tokio::spawn(supervisor.run(Some(events)));

        Self {
            shared,
            reachability,
            ctrl_tx,
        }
    }
}

// ============================================================================
// Transport - Accessors
// ============================================================================

impl Transport {
    /// Returns the target address.
    #[inline]
    #[must_use]
    pub fn address(&self) -> &str {
        &self.shared.address
    }

    /// Returns the negotiated subprotocol list.
    #[inline]
    #[must_use]
    pub fn protocols(&self) -> &[String] {
        &self.shared.protocols
    }

    /// Returns the resolved configuration.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &TransportOptions {
        &self.shared.options
    }

    /// Returns a handle to the currently owned socket.
    #[inline]
    #[must_use]
    pub fn socket(&self) -> Option<SocketHandle> {
        self.shared.socket.lock().clone()
    }

    /// Returns the current network reachability.
    #[inline]
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.reachability.is_online()
    }

    /// Returns the connect attempts made since the last successful open.
    #[inline]
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.shared.attempts.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Transport - Events & Messages
// ============================================================================

impl Transport {
    /// Registers a listener for a single lifecycle event kind.
    pub fn on(&self, kind: EventKind, listener: impl Fn(&TransportEvent) + Send + Sync + 'static) {
        self.shared.emitter.on(kind, listener);
    }

    /// Registers a wildcard listener receiving every lifecycle event.
    pub fn on_any(&self, listener: impl Fn(&TransportEvent) + Send + Sync + 'static) {
        self.shared.emitter.on_any(listener);
    }

    /// Sets the inbound-message callback, replacing any previous one.
    pub fn set_message_handler(&self, handler: impl Fn(&Message) + Send + Sync + 'static) {
        *self.shared.message_handler.lock() = Some(Box::new(handler));
    }

    /// Clears the inbound-message callback.
    pub fn clear_message_handler(&self) {
        *self.shared.message_handler.lock() = None;
    }

    /// Sends a message over the active socket.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no socket exists yet
    /// - [`Error::ConnectionClosed`] if the socket has terminated
    pub fn send(&self, message: Message) -> Result<()> {
        let socket = self.shared.socket.lock();
        match socket.as_ref() {
            Some(handle) => handle.send(message),
            None => Err(Error::NotConnected),
        }
    }
}

// ============================================================================
// Transport - Close
// ============================================================================

impl Transport {
    /// Closes the connection with the normal-closure code (1000).
    ///
    /// Cancels any pending reconnect and detaches the reachability
    /// subscription; the resulting close event never triggers a reconnect.
    pub fn close(&self) {
        self.close_with(close_code::NORMAL, "");
    }

    /// Closes the connection with a caller-supplied code and reason.
    pub fn close_with(&self, code: u16, reason: impl Into<String>) {
        // The flag is set before the command is delivered so that a reconnect
        // timer racing this call can never open a new socket.
        self.shared.force_closed.store(true, Ordering::SeqCst);
        let _ = self.ctrl_tx.send(Ctrl::Close {
            code,
            reason: reason.into(),
        });
    }
}

// ============================================================================
// Supervisor
// ============================================================================

/// Owns the state machine; runs until a terminal state is reached.
struct Supervisor {
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    reachability: Arc<dyn Reachability>,
    ctrl_rx: mpsc::UnboundedReceiver<Ctrl>,
}

impl Supervisor {
    /// Starts a connect attempt: emits `connecting`, bumps the attempt
    /// counter, clears the forced-close flag and replaces the active socket.
    fn open_socket(&self) -> mpsc::UnboundedReceiver<SocketEvent> {
        self.shared.emitter.emit(&TransportEvent::Connecting);
        let attempt = self.shared.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.force_closed.store(false, Ordering::SeqCst);

        debug!(address = %self.shared.address, attempt, "Opening socket");

        let (handle, events) = self
            .connector
            .connect(&self.shared.address, &self.shared.protocols);
        *self.shared.socket.lock() = Some(handle);
        events
    }

    /// Reconnect decision for one close event. Checks short-circuit in
    /// policy → retry budget → reachability order.
    fn decide(&self, close: &CloseEvent) -> Decision {
        let options = &self.shared.options;

        if !(options.should_reconnect)(close) {
            debug!(code = close.code, "Close code is not retryable");
            return Decision::Halt;
        }

        let attempts = self.shared.attempts.load(Ordering::SeqCst);
        if let Some(max_retries) = options.max_retries
            && attempts > max_retries
        {
            warn!(attempts, max_retries, "Retry budget exhausted");
            self.shared.emitter.emit(&TransportEvent::MaxRetriesMade);
            return Decision::Halt;
        }

        if !self.reachability.is_online() {
            debug!("Offline, deferring reconnect until the network returns");
            return Decision::AwaitNetwork;
        }

        Decision::Retry(options.retry_interval.evaluate(close, attempts))
    }

    /// Supervisor loop.
    async fn run(mut self, mut events: Option<mpsc::UnboundedReceiver<SocketEvent>>) {
        let mut online_rx = self.reachability.subscribe();
        let mut network_attached = true;
        let mut ctrl_open = true;
        let mut retry_timer: Option<Pin<Box<Sleep>>> = None;
        let mut await_network = false;

        loop {
            tokio::select! {
                biased;

                ctrl = self.ctrl_rx.recv(), if ctrl_open => {
                    let (code, reason) = match ctrl {
                        Some(Ctrl::Close { code, reason }) => (code, reason),
                        // Owner dropped the handle; wind down like a forced close.
                        None => {
                            ctrl_open = false;
                            (close_code::NORMAL, String::from("transport dropped"))
                        }
                    };

                    debug!(code, "Transport close requested");
                    self.shared.force_closed.store(true, Ordering::SeqCst);
                    retry_timer = None;
                    await_network = false;
                    network_attached = false;

                    let delivered = {
                        let socket = self.shared.socket.lock();
                        socket
                            .as_ref()
                            .is_some_and(|handle| handle.close(code, reason.clone()).is_ok())
                    };

                    // With no live socket there is no close event to wait for.
                    if events.is_none() || !delivered {
                        break;
                    }
                }

                incoming = next_event(&mut events), if events.is_some() => match incoming {
                    Some(SocketEvent::Open) => {
                        info!(address = %self.shared.address, "Transport connected");
                        self.shared.attempts.store(0, Ordering::SeqCst);
                        self.shared.emitter.emit(&TransportEvent::Connected);
                    }

                    Some(SocketEvent::Message(message)) => {
                        let handler = self.shared.message_handler.lock();
                        if let Some(handler) = handler.as_ref() {
                            handler(&message);
                        }
                    }

                    Some(SocketEvent::Error { message }) => {
                        warn!(address = %self.shared.address, error = %message, "Transport connect error");
                        self.shared
                            .emitter
                            .emit(&TransportEvent::ConnectError { message });
                    }

                    Some(SocketEvent::Closed(close)) => {
                        events = None;
                        debug!(code = close.code, reason = %close.reason, "Transport disconnected");
                        self.shared
                            .emitter
                            .emit(&TransportEvent::Disconnected { close: close.clone() });

                        if self.shared.force_closed.load(Ordering::SeqCst) {
                            break;
                        }
                        if !self.shared.options.auto_reconnect {
                            debug!("Auto-reconnect disabled, staying down");
                            break;
                        }

                        match self.decide(&close) {
                            Decision::Halt => break,
                            Decision::AwaitNetwork => await_network = true,
                            Decision::Retry(delay) => {
                                debug!(delay_ms = delay.as_millis() as u64, "Reconnect scheduled");
                                retry_timer = Some(Box::pin(time::sleep(delay)));
                            }
                        }
                    }

                    // Stream ended without a close event; nothing more will arrive.
                    None => events = None,
                },

                changed = online_rx.changed(), if network_attached => {
                    if changed.is_err() {
                        // Provider dropped; no further transitions to observe.
                        network_attached = false;
                        continue;
                    }

                    if *online_rx.borrow_and_update() {
                        if await_network {
                            debug!("Network restored, reconnecting");
                            await_network = false;
                            events = Some(self.open_socket());
                        }
                    } else {
                        debug!("Network offline");
                        retry_timer = None;
                        await_network = true;

                        // A socket lingering half-dead while offline is worse
                        // than a closed one.
                        let socket = self.shared.socket.lock();
                        if let Some(handle) = socket.as_ref() {
                            let _ = handle.close(close_code::NORMAL, "network offline");
                        }
                    }
                }

                () = fire_timer(&mut retry_timer), if retry_timer.is_some() => {
                    retry_timer = None;
                    // close() may have raced the timer; its flag wins.
                    if self.shared.force_closed.load(Ordering::SeqCst) {
                        break;
                    }
                    events = Some(self.open_socket());
                }

                // Nothing left that could wake this supervisor.
                else => break,
            }
        }

        debug!(address = %self.shared.address, "Transport supervisor terminated");
    }
}

// ============================================================================
// Select Helpers
// ============================================================================

/// Receives from the active socket's event stream, or parks when none exists.
async fn next_event(
    events: &mut Option<mpsc::UnboundedReceiver<SocketEvent>>,
) -> Option<SocketEvent> {
    match events.as_mut() {
        Some(rx) => rx.recv().await,
        None => future::pending().await,
    }
}

/// Waits for the pending reconnect timer, or parks when none is scheduled.
async fn fire_timer(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer.as_mut() {
        Some(sleep) => sleep.as_mut().await,
        None => future::pending().await,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::task::yield_now;

    use crate::reachability::NetworkSwitch;
    use crate::socket::SocketCommand;

    // ------------------------------------------------------------------
    // Mock connector
    // ------------------------------------------------------------------

    /// One scripted socket: the test drives its events and inspects the
    /// commands the transport issued against it.
    struct MockSocket {
        events: mpsc::UnboundedSender<SocketEvent>,
        commands: Arc<Mutex<Vec<SocketCommand>>>,
    }

    impl MockSocket {
        fn open(&self) {
            let _ = self.events.send(SocketEvent::Open);
        }

        fn fail(&self, close: CloseEvent) {
            let _ = self.events.send(SocketEvent::Error {
                message: "mock failure".into(),
            });
            let _ = self.events.send(SocketEvent::Closed(close));
        }

        fn closed(&self, close: CloseEvent) {
            let _ = self.events.send(SocketEvent::Closed(close));
        }

        fn message(&self, text: &str) {
            let _ = self
                .events
                .send(SocketEvent::Message(Message::Text(text.to_owned().into())));
        }

        fn recorded(&self) -> Vec<SocketCommand> {
            self.commands.lock().clone()
        }
    }

    /// Connector producing scripted sockets. Close commands are echoed back
    /// as close events, like a real socket completing the handshake.
    #[derive(Default)]
    struct MockConnector {
        sockets: Arc<Mutex<Vec<Arc<MockSocket>>>>,
    }

    impl MockConnector {
        fn socket(&self, index: usize) -> Arc<MockSocket> {
            Arc::clone(&self.sockets.lock()[index])
        }

        fn socket_count(&self) -> usize {
            self.sockets.lock().len()
        }
    }

    impl Connector for MockConnector {
        fn connect(
            &self,
            _address: &str,
            _protocols: &[String],
        ) -> (SocketHandle, mpsc::UnboundedReceiver<SocketEvent>) {
            let (command_tx, mut command_rx) = mpsc::unbounded_channel();
            let (event_tx, event_rx) = mpsc::unbounded_channel();
            let commands = Arc::new(Mutex::new(Vec::new()));

            let log = Arc::clone(&commands);
            let echo = event_tx.clone();
            tokio::spawn(async move {
                while let Some(command) = command_rx.recv().await {
                    let terminal = matches!(command, SocketCommand::Close { .. });
                    if let SocketCommand::Close { code, reason } = &command {
                        let _ = echo.send(SocketEvent::Closed(CloseEvent::new(
                            *code,
                            reason.clone(),
                        )));
                    }
                    log.lock().push(command);
                    if terminal {
                        break;
                    }
                }
            });

            self.sockets.lock().push(Arc::new(MockSocket {
                events: event_tx,
                commands,
            }));

            (SocketHandle::new(command_tx), event_rx)
        }
    }

    // ------------------------------------------------------------------
    // Harness helpers
    // ------------------------------------------------------------------

    fn transport_with(
        connector: &Arc<MockConnector>,
        options: TransportOptions,
        reachability: NetworkSwitch,
    ) -> Transport {
        Transport::builder("ws://mock.test/ws")
            .options(options)
            .connector(Arc::clone(connector) as Arc<dyn Connector>)
            .reachability(Arc::new(reachability))
            .build()
    }

    fn watch_events(transport: &Transport) -> mpsc::UnboundedReceiver<EventKind> {
        let (tx, rx) = mpsc::unbounded_channel();
        transport.on_any(move |event| {
            let _ = tx.send(event.kind());
        });
        rx
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<EventKind>) -> Vec<EventKind> {
        let mut seen = Vec::new();
        while let Ok(kind) = rx.try_recv() {
            seen.push(kind);
        }
        seen
    }

    /// Lets the supervisor and mock tasks run until quiescent.
    async fn settle() {
        for _ in 0..16 {
            yield_now().await;
        }
    }

    async fn advance(delay: Duration) {
        time::advance(delay).await;
        settle().await;
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_connects_and_resets_attempts() {
        let connector = Arc::new(MockConnector::default());
        let transport = transport_with(&connector, TransportOptions::new(), NetworkSwitch::new(true));
        let mut events = watch_events(&transport);
        settle().await;

        assert_eq!(transport.attempts(), 1);

        connector.socket(0).open();
        settle().await;

        assert_eq!(transport.attempts(), 0);
        assert_eq!(drain(&mut events), vec![EventKind::Connected]);
        assert!(transport.socket().expect("socket handle").is_alive());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifecycle_events_emit_in_order() {
        let connector = Arc::new(MockConnector::default());
        let options = TransportOptions::new().with_retry_interval(Duration::from_millis(100));
        let transport = transport_with(&connector, options, NetworkSwitch::new(true));
        let mut events = watch_events(&transport);
        settle().await;

        connector.socket(0).fail(CloseEvent::abnormal());
        settle().await;
        advance(Duration::from_millis(100)).await;
        connector.socket(1).open();
        settle().await;

        assert_eq!(
            drain(&mut events),
            vec![
                EventKind::ConnectError,
                EventKind::Disconnected,
                EventKind::Connecting,
                EventKind::Connected,
            ]
        );

        transport.close();
    }

    // ------------------------------------------------------------------
    // Forced close
    // ------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_forced_close_suppresses_reconnect() {
        let connector = Arc::new(MockConnector::default());
        let options = TransportOptions::new().with_retry_interval(Duration::from_millis(50));
        let transport = transport_with(&connector, options, NetworkSwitch::new(true));
        let mut events = watch_events(&transport);
        settle().await;

        connector.socket(0).open();
        settle().await;
        drain(&mut events);

        transport.close();
        settle().await;

        let commands = connector.socket(0).recorded();
        assert!(matches!(
            commands.as_slice(),
            [SocketCommand::Close { code: 1000, reason }] if reason.is_empty()
        ));
        assert_eq!(drain(&mut events), vec![EventKind::Disconnected]);
        assert_eq!(transport.attempts(), 0);

        // No reconnect timer was scheduled; nothing fires no matter how long
        // we wait.
        advance(Duration::from_secs(3600)).await;
        assert_eq!(connector.socket_count(), 1);
        assert_eq!(transport.attempts(), 0);
        assert!(drain(&mut events).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_with_custom_code_and_reason() {
        let connector = Arc::new(MockConnector::default());
        let transport = transport_with(&connector, TransportOptions::new(), NetworkSwitch::new(true));
        settle().await;

        connector.socket(0).open();
        settle().await;

        transport.close_with(4001, "done with you");
        settle().await;

        let commands = connector.socket(0).recorded();
        assert!(matches!(
            commands.as_slice(),
            [SocketCommand::Close { code: 4001, reason }] if reason == "done with you"
        ));
    }

    // ------------------------------------------------------------------
    // Retry policy
    // ------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_abnormal_close_schedules_retry_after_interval() {
        let connector = Arc::new(MockConnector::default());
        let options = TransportOptions::new().with_retry_interval(Duration::from_millis(100));
        let transport = transport_with(&connector, options, NetworkSwitch::new(true));
        settle().await;

        connector.socket(0).closed(CloseEvent::abnormal());
        settle().await;
        assert_eq!(connector.socket_count(), 1);

        advance(Duration::from_millis(99)).await;
        assert_eq!(connector.socket_count(), 1);

        advance(Duration::from_millis(1)).await;
        assert_eq!(connector.socket_count(), 2);
        assert_eq!(transport.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_retries_exhaustion_fires_once() {
        let connector = Arc::new(MockConnector::default());
        let options = TransportOptions::new()
            .with_max_retries(1)
            .with_retry_interval(Duration::from_millis(50));
        let transport = transport_with(&connector, options, NetworkSwitch::new(true));
        let mut events = watch_events(&transport);
        settle().await;

        // Attempt 1 fails: 1 > 1 is false, a retry is scheduled.
        connector.socket(0).closed(CloseEvent::abnormal());
        advance(Duration::from_millis(50)).await;
        assert_eq!(connector.socket_count(), 2);

        // Attempt 2 fails: 2 > 1, recovery stops for good.
        connector.socket(1).closed(CloseEvent::abnormal());
        settle().await;

        let seen = drain(&mut events);
        assert_eq!(
            seen.iter()
                .filter(|kind| **kind == EventKind::MaxRetriesMade)
                .count(),
            1
        );

        advance(Duration::from_secs(3600)).await;
        assert_eq!(connector.socket_count(), 2);
        assert_eq!(transport.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_max_retries_halts_on_first_failure() {
        let connector = Arc::new(MockConnector::default());
        let options = TransportOptions::new()
            .with_max_retries(0)
            .with_retry_interval(Duration::from_millis(50));
        let transport = transport_with(&connector, options, NetworkSwitch::new(true));
        let mut events = watch_events(&transport);
        settle().await;

        connector.socket(0).closed(CloseEvent::abnormal());
        settle().await;

        assert_eq!(transport.attempts(), 1);
        assert_eq!(
            drain(&mut events),
            vec![EventKind::Disconnected, EventKind::MaxRetriesMade]
        );

        advance(Duration::from_secs(3600)).await;
        assert_eq!(connector.socket_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_close_code_halts_without_retry() {
        let connector = Arc::new(MockConnector::default());
        let options = TransportOptions::new().with_retry_interval(Duration::from_millis(50));
        let transport = transport_with(&connector, options, NetworkSwitch::new(true));
        let mut events = watch_events(&transport);
        settle().await;

        connector.socket(0).open();
        settle().await;
        connector
            .socket(0)
            .closed(CloseEvent::new(close_code::POLICY_VIOLATION, "banned"));
        settle().await;

        let seen = drain(&mut events);
        assert!(seen.contains(&EventKind::Disconnected));
        assert!(!seen.contains(&EventKind::MaxRetriesMade));

        advance(Duration::from_secs(3600)).await;
        assert_eq!(connector.socket_count(), 1);
        drop(transport);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_reconnect_disabled_stays_down() {
        let connector = Arc::new(MockConnector::default());
        let options = TransportOptions::new().with_auto_reconnect(false);
        let transport = transport_with(&connector, options, NetworkSwitch::new(true));
        settle().await;

        connector.socket(0).closed(CloseEvent::abnormal());
        settle().await;

        advance(Duration::from_secs(3600)).await;
        assert_eq!(connector.socket_count(), 1);
        drop(transport);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_reset_after_successful_reconnect() {
        let connector = Arc::new(MockConnector::default());
        let options = TransportOptions::new().with_retry_interval(Duration::from_millis(50));
        let transport = transport_with(&connector, options, NetworkSwitch::new(true));
        settle().await;

        connector.socket(0).closed(CloseEvent::abnormal());
        advance(Duration::from_millis(50)).await;

        assert_eq!(transport.attempts(), 2);
        connector.socket(1).open();
        settle().await;
        assert_eq!(transport.attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_retry_interval_sees_close_and_attempts() {
        let connector = Arc::new(MockConnector::default());
        let observed = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&observed);
        let options = TransportOptions::new().with_retry_interval_fn(move |close, attempts| {
            log.lock().push((close.code, attempts));
            Duration::from_millis(10)
        });
        let _transport = transport_with(&connector, options, NetworkSwitch::new(true));
        settle().await;

        connector.socket(0).closed(CloseEvent::new(1001, "going away"));
        settle().await;

        assert_eq!(*observed.lock(), vec![(1001, 1)]);
    }

    // ------------------------------------------------------------------
    // Reachability gating
    // ------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_offline_closes_socket_and_defers_reconnect() {
        let connector = Arc::new(MockConnector::default());
        let network = NetworkSwitch::new(true);
        let options = TransportOptions::new().with_retry_interval(Duration::from_millis(50));
        let transport = transport_with(&connector, options, network.clone());
        let mut events = watch_events(&transport);
        settle().await;

        connector.socket(0).open();
        settle().await;
        drain(&mut events);

        network.set_online(false);
        settle().await;

        // The live socket was proactively closed with the normal code.
        let commands = connector.socket(0).recorded();
        assert!(matches!(
            commands.as_slice(),
            [SocketCommand::Close { code: 1000, reason }] if reason == "network offline"
        ));
        assert_eq!(drain(&mut events), vec![EventKind::Disconnected]);

        // No timer while offline.
        advance(Duration::from_secs(3600)).await;
        assert_eq!(connector.socket_count(), 1);

        // Back online: exactly one new connect attempt.
        network.set_online(true);
        settle().await;
        assert_eq!(connector.socket_count(), 2);
        assert_eq!(drain(&mut events), vec![EventKind::Connecting]);

        connector.socket(1).open();
        settle().await;
        assert_eq!(drain(&mut events), vec![EventKind::Connected]);

        transport.close();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_while_offline_waits_for_network() {
        let connector = Arc::new(MockConnector::default());
        let network = NetworkSwitch::new(false);
        let options = TransportOptions::new().with_retry_interval(Duration::from_millis(50));
        let transport = transport_with(&connector, options, network.clone());
        settle().await;

        // The first attempt happens regardless of reachability; only the
        // reconnect decision is gated.
        assert_eq!(connector.socket_count(), 1);
        connector.socket(0).fail(CloseEvent::abnormal());
        settle().await;

        advance(Duration::from_secs(3600)).await;
        assert_eq!(connector.socket_count(), 1);

        network.set_online(true);
        settle().await;
        assert_eq!(connector.socket_count(), 2);
        drop(transport);
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_message_handler_receives_inbound_traffic() {
        let connector = Arc::new(MockConnector::default());
        let transport = transport_with(&connector, TransportOptions::new(), NetworkSwitch::new(true));

        let received = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&received);
        transport.set_message_handler(move |message| {
            if let Message::Text(text) = message {
                log.lock().push(text.to_string());
            }
        });
        settle().await;

        connector.socket(0).open();
        connector.socket(0).message("pong");
        settle().await;

        assert_eq!(*received.lock(), vec!["pong"]);

        transport.clear_message_handler();
        connector.socket(0).message("ignored");
        settle().await;
        assert_eq!(received.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_forwards_to_active_socket() {
        let connector = Arc::new(MockConnector::default());
        let transport = transport_with(&connector, TransportOptions::new(), NetworkSwitch::new(true));
        settle().await;

        connector.socket(0).open();
        settle().await;

        transport
            .send(Message::Text("ping".to_owned().into()))
            .expect("socket alive");
        settle().await;

        let commands = connector.socket(0).recorded();
        assert!(matches!(
            commands.as_slice(),
            [SocketCommand::Send(Message::Text(text))] if text.as_str() == "ping"
        ));
    }
}
