//! Builder pattern for transport construction.
//!
//! Provides a fluent API for configuring and creating [`Transport`] instances,
//! including the injection points for a custom socket [`Connector`] and a
//! [`Reachability`] provider.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use resocket::{NetworkSwitch, Transport, TransportOptions};
//!
//! let network = NetworkSwitch::new(true);
//!
//! let transport = Transport::builder("wss://example.com/ws")
//!     .protocol("chat")
//!     .options(TransportOptions::new().with_max_retries(5))
//!     .reachability(Arc::new(network.clone()))
//!     .build();
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::reachability::{NetworkSwitch, Reachability};
use crate::socket::{Connector, WsConnector};

use super::core::Transport;
use super::options::TransportOptions;

// ============================================================================
// TransportBuilder
// ============================================================================

/// Builder for configuring a [`Transport`] instance.
///
/// Use [`Transport::builder()`] to create a new builder.
pub struct TransportBuilder {
    /// Target address.
    address: String,
    /// Subprotocols negotiated at connect time.
    protocols: Vec<String>,
    /// Transport configuration.
    options: TransportOptions,
    /// Socket factory; defaults to [`WsConnector`].
    connector: Option<Arc<dyn Connector>>,
    /// Reachability provider; defaults to an always-online switch.
    reachability: Option<Arc<dyn Reachability>>,
}

// ============================================================================
// TransportBuilder Implementation
// ============================================================================

impl TransportBuilder {
    /// Creates a builder for the given address.
    pub(crate) fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            protocols: Vec::new(),
            options: TransportOptions::default(),
            connector: None,
            reachability: None,
        }
    }

    /// Adds a subprotocol to negotiate at connect time.
    #[inline]
    #[must_use]
    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocols.push(protocol.into());
        self
    }

    /// Adds multiple subprotocols to negotiate at connect time.
    #[inline]
    #[must_use]
    pub fn protocols(mut self, protocols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.protocols
            .extend(protocols.into_iter().map(Into::into));
        self
    }

    /// Sets the transport configuration.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: TransportOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the socket factory.
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Injects the network reachability provider.
    #[inline]
    #[must_use]
    pub fn reachability(mut self, reachability: Arc<dyn Reachability>) -> Self {
        self.reachability = Some(reachability);
        self
    }

    /// Builds the transport and immediately starts the first connect attempt.
    ///
    /// A malformed address does not fail here; it surfaces asynchronously as
    /// a `connect-error` event. Must be called from within a Tokio runtime.
    #[must_use]
    pub fn build(self) -> Transport {
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(WsConnector) as Arc<dyn Connector>);
        let reachability = self
            .reachability
            .unwrap_or_else(|| Arc::new(NetworkSwitch::new(true)) as Arc<dyn Reachability>);

        Transport::spawn(
            self.address,
            self.protocols,
            self.options,
            connector,
            reachability,
        )
    }
}

impl fmt::Debug for TransportBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportBuilder")
            .field("address", &self.address)
            .field("protocols", &self.protocols)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
