//! Network reachability provider.
//!
//! The transport never reads a process-wide online/offline global. Instead a
//! [`Reachability`] capability is injected at construction: the transport
//! queries the current status when deciding whether to schedule a reconnect,
//! and subscribes to transitions so a deferred reconnect resumes the moment
//! the network returns.
//!
//! [`NetworkSwitch`] is the provided implementation: a manually driven toggle.
//! Hosts bridge whatever platform signal they have (netlink, `SCNetworkReachability`,
//! a captive-portal probe) into [`NetworkSwitch::set_online`].

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::watch;

// ============================================================================
// Reachability
// ============================================================================

/// Capability reporting current network status and its transitions.
pub trait Reachability: Send + Sync {
    /// Returns `true` when the network is currently reachable.
    fn is_online(&self) -> bool;

    /// Subscribes to status transitions.
    ///
    /// The receiver observes the value flipping on each transition; redundant
    /// sets produce no notification.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

// ============================================================================
// NetworkSwitch
// ============================================================================

/// Manually driven [`Reachability`] implementation.
///
/// Clones share the same underlying status: keep one clone to toggle from the
/// host's network monitor and hand another to the transport.
///
/// # Example
///
/// ```ignore
/// let network = NetworkSwitch::new(true);
///
/// let transport = Transport::builder("wss://example.com/ws")
///     .reachability(Arc::new(network.clone()))
///     .build();
///
/// // later, from the platform's connectivity callback:
/// network.set_online(false);
/// ```
#[derive(Clone)]
pub struct NetworkSwitch {
    /// Status channel; the sender is kept alive so receivers never close early.
    status: Arc<watch::Sender<bool>>,
}

impl NetworkSwitch {
    /// Creates a switch with the given initial status.
    #[must_use]
    pub fn new(online: bool) -> Self {
        let (status, _) = watch::channel(online);
        Self {
            status: Arc::new(status),
        }
    }

    /// Updates the status, notifying subscribers only on an actual transition.
    pub fn set_online(&self, online: bool) {
        self.status.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
    }
}

impl Default for NetworkSwitch {
    /// An online switch.
    fn default() -> Self {
        Self::new(true)
    }
}

impl Reachability for NetworkSwitch {
    #[inline]
    fn is_online(&self) -> bool {
        *self.status.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.status.subscribe()
    }
}

impl std::fmt::Debug for NetworkSwitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkSwitch")
            .field("online", &self.is_online())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
