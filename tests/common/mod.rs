/*
[INPUT]:  Test configuration and scripted dial outcomes
[OUTPUT]: Shared test utilities and a socket-free mock transport
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for market-stream tests

use async_trait::async_trait;
use market_stream::{Result, Socket, SocketEvent, StreamConfig, StreamError, Transport};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep, timeout};

/// Outcome of one scripted dial attempt
#[derive(Debug, Clone, Copy)]
pub enum DialOutcome {
    Accept,
    Refuse,
}

/// Transport that never touches the network: each `connect` consumes the
/// next scripted outcome, falling back to a default once the script runs
/// out. Accepted dials hand the server end of the socket to the test.
pub struct MockTransport {
    script: Mutex<VecDeque<DialOutcome>>,
    fallback: DialOutcome,
    connected: mpsc::UnboundedSender<SocketHandle>,
    dials: AtomicUsize,
}

impl MockTransport {
    pub fn scripted(
        script: Vec<DialOutcome>,
        fallback: DialOutcome,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<SocketHandle>) {
        let (connected, sockets) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            connected,
            dials: AtomicUsize::new(0),
        });
        (transport, sockets)
    }

    /// Transport that accepts every dial
    pub fn accepting() -> (Arc<Self>, mpsc::UnboundedReceiver<SocketHandle>) {
        Self::scripted(Vec::new(), DialOutcome::Accept)
    }

    /// Transport that refuses every dial
    #[allow(dead_code)]
    pub fn refusing() -> (Arc<Self>, mpsc::UnboundedReceiver<SocketHandle>) {
        Self::scripted(Vec::new(), DialOutcome::Refuse)
    }

    pub fn dial_count(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, _url: &str, outbound_capacity: usize) -> Result<Socket> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .script
            .lock()
            .expect("script lock poisoned")
            .pop_front()
            .unwrap_or(self.fallback);
        match outcome {
            DialOutcome::Refuse => Err(StreamError::Connect("dial refused by mock".to_string())),
            DialOutcome::Accept => {
                let (outbound_tx, outbound_rx) = mpsc::channel(outbound_capacity);
                let (event_tx, event_rx) = mpsc::channel(100);
                let _ = self.connected.send(SocketHandle {
                    sent: outbound_rx,
                    events: event_tx,
                });
                Ok(Socket {
                    outbound: outbound_tx,
                    events: event_rx,
                })
            }
        }
    }
}

/// Server end of one accepted mock socket
pub struct SocketHandle {
    sent: mpsc::Receiver<String>,
    events: mpsc::Sender<SocketEvent>,
}

impl SocketHandle {
    /// Deliver a text frame to the client
    pub async fn push_frame(&self, text: &str) {
        let _ = self.events.send(SocketEvent::Frame(text.to_string())).await;
    }

    /// Close the socket from the server side
    pub async fn close(&self) {
        let _ = self.events.send(SocketEvent::Closed).await;
    }

    /// Await the next frame the client sent
    pub async fn expect_frame(&mut self) -> String {
        timeout(Duration::from_secs(1), self.sent.recv())
            .await
            .expect("timed out waiting for an outbound frame")
            .expect("socket closed before a frame was sent")
    }

    /// Assert the client sends nothing within a short window
    pub async fn assert_no_frame(&mut self) {
        if let Ok(Some(frame)) = timeout(Duration::from_millis(50), self.sent.recv()).await {
            panic!("unexpected outbound frame: {frame}");
        }
    }
}

/// Configuration with a short reconnect delay so tests run quickly
pub fn test_config() -> StreamConfig {
    StreamConfig {
        host: "localhost:9".to_string(),
        secure: false,
        reconnect_delay: Duration::from_millis(20),
        max_reconnect_attempts: 5,
        outbound_capacity: 16,
    }
}

/// Await the next accepted connection
pub async fn next_socket(sockets: &mut mpsc::UnboundedReceiver<SocketHandle>) -> SocketHandle {
    timeout(Duration::from_secs(1), sockets.recv())
        .await
        .expect("timed out waiting for a connection")
        .expect("mock transport dropped")
}

/// Poll a condition until it holds or a one second deadline passes
pub async fn wait_until(cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(1);
    while !cond() {
        if Instant::now() > deadline {
            panic!("condition not met within one second");
        }
        sleep(Duration::from_millis(5)).await;
    }
}
