/*
[INPUT]:  Subscription and consumer registration calls from the application
[OUTPUT]: A live market data stream fanned out to registered consumers
[POS]:    Public facade - composes connection, registry, and router
[UPDATE]: When the public API surface changes
*/

use crate::config::StreamConfig;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::error::Result;
use crate::message::{ControlFrame, InboundMessage};
use crate::registry::ChannelRegistry;
use crate::router::{HandlerGuard, MessageRouter};
use crate::transport::{Transport, WsTransport};
use std::sync::Arc;

/// Real-time market data streaming client.
///
/// Maintains one duplex WebSocket connection, multiplexes logical channels
/// over it, routes inbound messages to registered consumers, and recovers
/// from connection loss with bounded retry. Cloning is cheap and shares the
/// same underlying connection; construct one per stream endpoint and pass it
/// to whoever needs it.
///
/// Delivery is best-effort live-view: frames sent while the connection is
/// down are dropped, and tracked channels are re-subscribed automatically
/// after every reconnect.
#[derive(Clone)]
pub struct MarketStreamClient {
    conn: Arc<ConnectionManager>,
    registry: Arc<ChannelRegistry>,
    router: Arc<MessageRouter>,
}

impl MarketStreamClient {
    /// Create a client using the production WebSocket transport
    pub fn new(config: StreamConfig) -> Self {
        Self::with_transport(config, Arc::new(WsTransport))
    }

    /// Create a client over a custom transport (used by tests)
    pub fn with_transport(config: StreamConfig, transport: Arc<dyn Transport>) -> Self {
        let registry = Arc::new(ChannelRegistry::new());
        let router = Arc::new(MessageRouter::new());
        let conn = Arc::new(ConnectionManager::new(
            config,
            transport,
            Arc::clone(&registry),
            Arc::clone(&router),
        ));
        Self {
            conn,
            registry,
            router,
        }
    }

    /// Open the connection. Resolves immediately when already open or
    /// connecting; otherwise resolves once the socket reports open and
    /// errors if it fails before that. Tracked channels are re-subscribed
    /// automatically on success.
    pub async fn connect(&self) -> Result<()> {
        self.conn.connect().await
    }

    /// Close intentionally. Suppresses any pending reconnect and clears all
    /// consumer registrations; tracked channels stay tracked for the next
    /// `connect`.
    pub fn disconnect(&self) {
        self.conn.disconnect();
    }

    /// Track channels and, when open, subscribe to the newly added ones
    pub fn subscribe<I, S>(&self, channels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let added = self.registry.add(channels);
        if !added.is_empty() {
            self.conn.send(ControlFrame::subscribe(added));
        }
    }

    /// Stop tracking channels and, when open, unsubscribe the removed ones
    pub fn unsubscribe<I, S>(&self, channels: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let removed = self.registry.remove(channels);
        if !removed.is_empty() {
            self.conn.send(ControlFrame::unsubscribe(removed));
        }
    }

    /// Register a consumer under a routing key: a bare message type, a
    /// compound `type:symbol` key, or [`crate::router::WILDCARD_KEY`].
    /// The returned guard deregisters exactly this registration.
    pub fn on<F>(&self, key: &str, handler: F) -> HandlerGuard
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        self.router.register(key, handler)
    }

    /// True only while the connection is `Open`
    pub fn is_connected(&self) -> bool {
        self.conn.state() == ConnectionState::Open
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.conn.state()
    }

    /// The currently tracked channel set
    pub fn channels(&self) -> Vec<String> {
        self.registry.snapshot()
    }
}
