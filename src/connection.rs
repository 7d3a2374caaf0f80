/*
[INPUT]:  Connect/disconnect calls, socket events, reconnect timer wakeups
[OUTPUT]: A maintained connection with bounded retry and subscription replay
[POS]:    Connection layer - lifecycle state machine and reconnect policy
[UPDATE]: When changing lifecycle states or the retry policy
*/

use crate::config::StreamConfig;
use crate::error::Result;
use crate::message::{ControlFrame, InboundMessage};
use crate::registry::ChannelRegistry;
use crate::router::MessageRouter;
use crate::transport::{SocketEvent, Transport};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, error, info, warn};

/// Connection lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closing,
    Reconnecting,
}

struct ConnState {
    phase: ConnectionState,
    outbound: Option<mpsc::Sender<String>>,
    retries: u32,
    intentional_close: bool,
    /// Bumped on every successful open so a reader task from a superseded
    /// socket cannot trigger the reconnect path
    epoch: u64,
}

/// Owns the single socket and its lifecycle.
///
/// All state lives behind one mutex that is never held across an await, so
/// every transition happens in one synchronous step. Concurrent `connect`
/// calls are serialized by the `Connecting` check alone.
pub(crate) struct ConnectionManager {
    config: StreamConfig,
    transport: Arc<dyn Transport>,
    registry: Arc<ChannelRegistry>,
    router: Arc<MessageRouter>,
    state: Mutex<ConnState>,
}

impl ConnectionManager {
    pub(crate) fn new(
        config: StreamConfig,
        transport: Arc<dyn Transport>,
        registry: Arc<ChannelRegistry>,
        router: Arc<MessageRouter>,
    ) -> Self {
        Self {
            config,
            transport,
            registry,
            router,
            state: Mutex::new(ConnState {
                phase: ConnectionState::Idle,
                outbound: None,
                retries: 0,
                intentional_close: false,
                epoch: 0,
            }),
        }
    }

    fn state_mut(&self) -> MutexGuard<'_, ConnState> {
        self.state.lock().expect("connection state lock poisoned")
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state_mut().phase
    }

    /// Open the connection. No-op when already `Open` or `Connecting`.
    /// Resets the retry budget, so an explicit call revives a client that
    /// exhausted its automatic reconnects.
    pub(crate) async fn connect(self: &Arc<Self>) -> Result<()> {
        {
            let mut st = self.state_mut();
            if matches!(st.phase, ConnectionState::Open | ConnectionState::Connecting) {
                return Ok(());
            }
            st.phase = ConnectionState::Connecting;
            st.intentional_close = false;
            st.retries = 0;
        }

        if let Err(err) = self.open_socket().await {
            warn!(error = %err, "market stream connect failed");
            self.handle_connection_loss(None);
            return Err(err);
        }
        Ok(())
    }

    /// Dial the transport and, on success, move to `Open`, start the reader,
    /// and replay tracked subscriptions. Callers must have set `Connecting`.
    async fn open_socket(self: &Arc<Self>) -> Result<()> {
        let endpoint = self.config.endpoint()?;
        let socket = self
            .transport
            .connect(endpoint.as_str(), self.config.outbound_capacity)
            .await?;

        let epoch = {
            let mut st = self.state_mut();
            // a disconnect may have raced the dial; drop the fresh socket
            if st.intentional_close {
                st.phase = ConnectionState::Idle;
                return Ok(());
            }
            st.phase = ConnectionState::Open;
            st.retries = 0;
            st.epoch += 1;
            st.outbound = Some(socket.outbound);
            st.epoch
        };

        info!(endpoint = %endpoint, "market stream connected");
        self.spawn_reader(socket.events, epoch);
        self.replay_subscriptions();
        Ok(())
    }

    fn spawn_reader(self: &Arc<Self>, mut events: mpsc::Receiver<SocketEvent>, epoch: u64) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    SocketEvent::Frame(text) => manager.dispatch_frame(&text),
                    SocketEvent::Closed => break,
                }
            }
            manager.handle_connection_loss(Some(epoch));
        });
    }

    fn dispatch_frame(&self, text: &str) {
        match InboundMessage::from_text(text) {
            Ok(message) => self.router.dispatch(&message),
            Err(err) => {
                warn!(error = %err, bytes = text.len(), "dropping malformed inbound frame");
            }
        }
    }

    fn replay_subscriptions(&self) {
        let channels = self.registry.snapshot();
        if channels.is_empty() {
            return;
        }
        info!(channels = channels.len(), "replaying channel subscriptions");
        self.send(ControlFrame::subscribe(channels));
    }

    /// React to an unexpected closure or failed dial: schedule a bounded
    /// reconnect unless the close was intentional or the budget is spent.
    /// `epoch` is set when the loss was reported by a socket reader.
    fn handle_connection_loss(self: &Arc<Self>, epoch: Option<u64>) {
        let (attempt, delay) = {
            let mut st = self.state_mut();
            if let Some(epoch) = epoch
                && st.epoch != epoch
            {
                // stale reader from a connection we already replaced
                return;
            }
            st.outbound = None;
            if st.intentional_close {
                st.phase = ConnectionState::Idle;
                return;
            }
            if st.retries >= self.config.max_reconnect_attempts {
                st.phase = ConnectionState::Idle;
                error!(
                    attempts = st.retries,
                    "max reconnection attempts reached, not retrying until next connect"
                );
                return;
            }
            st.retries += 1;
            st.phase = ConnectionState::Reconnecting;
            (st.retries, self.config.reconnect_delay)
        };

        info!(
            attempt,
            max_attempts = self.config.max_reconnect_attempts,
            delay_ms = delay.as_millis() as u64,
            "scheduling reconnect"
        );

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            time::sleep(delay).await;
            {
                let mut st = manager.state_mut();
                // a disconnect or a fresh explicit connect supersedes this timer
                if st.intentional_close || st.phase != ConnectionState::Reconnecting {
                    return;
                }
                st.phase = ConnectionState::Connecting;
            }
            if let Err(err) = manager.open_socket().await {
                warn!(attempt, error = %err, "reconnect attempt failed");
                manager.handle_connection_loss(None);
            }
        });
    }

    /// Close intentionally: suppress any pending reconnect, drop the socket,
    /// and clear all consumer registrations.
    pub(crate) fn disconnect(&self) {
        let outbound = {
            let mut st = self.state_mut();
            st.intentional_close = true;
            st.phase = ConnectionState::Closing;
            st.outbound.take()
        };
        // dropping the sender makes the socket pump send Close and exit
        drop(outbound);
        self.state_mut().phase = ConnectionState::Idle;
        self.router.clear();
        info!("market stream disconnected");
    }

    /// Best-effort send: the frame is dropped silently unless `Open`
    pub(crate) fn send(&self, frame: ControlFrame) {
        let sender = {
            let st = self.state_mut();
            match st.phase {
                ConnectionState::Open => st.outbound.clone(),
                _ => None,
            }
        };
        let Some(sender) = sender else {
            debug!(action = ?frame.action, "dropping control frame while not open");
            return;
        };

        match serde_json::to_string(&frame) {
            Ok(text) => {
                if sender.try_send(text).is_err() {
                    debug!(action = ?frame.action, "dropping control frame, outbound buffer unavailable");
                }
            }
            Err(err) => warn!(error = %err, "failed to encode control frame"),
        }
    }
}
