//! Transport lifecycle events and the emitter that dispatches them.
//!
//! Every state transition of a [`Transport`] is announced through exactly one
//! lifecycle event. Listeners subscribe either to a single [`EventKind`] or to
//! everything at once via the wildcard slot.
//!
//! # Event Kinds
//!
//! | Kind | Emitted when |
//! |------|--------------|
//! | `connecting` | a connect attempt starts |
//! | `connected` | the socket reports open |
//! | `connect-error` | the socket reports a failure (non-fatal by itself) |
//! | `disconnected` | the socket reached its closed state |
//! | `max-retries-made` | the retry budget is exhausted, recovery stops |
//!
//! [`Transport`]: crate::transport::Transport

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::socket::CloseEvent;

// ============================================================================
// EventKind
// ============================================================================

/// Identifies a lifecycle event without its payload.
///
/// Used as the subscription key in [`Emitter::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A connect attempt is starting.
    Connecting,
    /// The socket is open.
    Connected,
    /// The socket reported an error.
    ConnectError,
    /// The socket closed.
    Disconnected,
    /// The retry budget is exhausted; no further attempts will be made.
    MaxRetriesMade,
}

impl EventKind {
    /// Returns the wire name of this event kind.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::ConnectError => "connect-error",
            Self::Disconnected => "disconnected",
            Self::MaxRetriesMade => "max-retries-made",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TransportEvent
// ============================================================================

/// A lifecycle event with its payload.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A connect attempt is starting.
    Connecting,

    /// The socket is open; the attempt counter has been reset.
    Connected,

    /// The socket reported an error.
    ///
    /// Does not trigger reconnect logic by itself; recovery is driven by the
    /// close event that follows.
    ConnectError {
        /// Human-readable failure description.
        message: String,
    },

    /// The socket reached its closed state.
    Disconnected {
        /// The close code and reason the socket terminated with.
        close: CloseEvent,
    },

    /// The retry budget is exhausted; automatic recovery has stopped.
    MaxRetriesMade,
}

impl TransportEvent {
    /// Returns the kind of this event.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Connecting => EventKind::Connecting,
            Self::Connected => EventKind::Connected,
            Self::ConnectError { .. } => EventKind::ConnectError,
            Self::Disconnected { .. } => EventKind::Disconnected,
            Self::MaxRetriesMade => EventKind::MaxRetriesMade,
        }
    }
}

// ============================================================================
// Emitter
// ============================================================================

/// Listener callback type.
pub type EventListener = Box<dyn Fn(&TransportEvent) + Send + Sync>;

/// Dispatches lifecycle events to registered listeners.
///
/// Listeners registered for a specific [`EventKind`] run first, then wildcard
/// listeners. Dispatch is synchronous on the emitting task.
#[derive(Default)]
pub struct Emitter {
    /// Listeners keyed by event kind.
    listeners: Mutex<FxHashMap<EventKind, Vec<EventListener>>>,
    /// Listeners receiving every event.
    wildcard: Mutex<Vec<EventListener>>,
}

impl Emitter {
    /// Creates an emitter with no listeners.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for a single event kind.
    pub fn on(&self, kind: EventKind, listener: impl Fn(&TransportEvent) + Send + Sync + 'static) {
        let mut listeners = self.listeners.lock();
        listeners.entry(kind).or_default().push(Box::new(listener));
    }

    /// Registers a wildcard listener receiving every event.
    pub fn on_any(&self, listener: impl Fn(&TransportEvent) + Send + Sync + 'static) {
        self.wildcard.lock().push(Box::new(listener));
    }

    /// Emits an event to targeted listeners, then wildcard listeners.
    pub fn emit(&self, event: &TransportEvent) {
        {
            let listeners = self.listeners.lock();
            if let Some(targeted) = listeners.get(&event.kind()) {
                for listener in targeted {
                    listener(event);
                }
            }
        }

        let wildcard = self.wildcard.lock();
        for listener in wildcard.iter() {
            listener(event);
        }
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("kinds", &self.listeners.lock().len())
            .field("wildcard", &self.wildcard.lock().len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(EventKind::Connecting.as_str(), "connecting");
        assert_eq!(EventKind::Connected.as_str(), "connected");
        assert_eq!(EventKind::ConnectError.as_str(), "connect-error");
        assert_eq!(EventKind::Disconnected.as_str(), "disconnected");
        assert_eq!(EventKind::MaxRetriesMade.as_str(), "max-retries-made");
    }

    #[test]
    fn test_event_kind_mapping() {
        let event = TransportEvent::Disconnected {
            close: CloseEvent::normal(),
        };
        assert_eq!(event.kind(), EventKind::Disconnected);

        let event = TransportEvent::ConnectError {
            message: "refused".into(),
        };
        assert_eq!(event.kind(), EventKind::ConnectError);
    }

    #[test]
    fn test_targeted_dispatch() {
        let emitter = Emitter::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        emitter.on(EventKind::Connected, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        emitter.emit(&TransportEvent::Connected);
        emitter.emit(&TransportEvent::Connecting);
        emitter.emit(&TransportEvent::Connected);

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_wildcard_receives_every_kind() {
        let emitter = Emitter::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        emitter.on_any(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        emitter.emit(&TransportEvent::Connecting);
        emitter.emit(&TransportEvent::Connected);
        emitter.emit(&TransportEvent::MaxRetriesMade);

        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_targeted_runs_before_wildcard() {
        let emitter = Emitter::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&order);
        emitter.on(EventKind::Connected, move |_| log.lock().push("targeted"));
        let log = Arc::clone(&order);
        emitter.on_any(move |_| log.lock().push("wildcard"));

        emitter.emit(&TransportEvent::Connected);

        assert_eq!(*order.lock(), vec!["targeted", "wildcard"]);
    }
}
