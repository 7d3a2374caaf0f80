/*
[INPUT]:  WebSocket endpoint URL
[OUTPUT]: An open socket as an outbound text sender plus inbound event stream
[POS]:    Transport layer - the seam between the client and the live socket
[UPDATE]: When changing the socket library or the pump loop
*/

use crate::error::{Result, StreamError};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::debug;

const INBOUND_BUFFER: usize = 100;

/// Inbound event from an open socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// One text frame received
    Frame(String),
    /// The socket closed or errored; no further events follow
    Closed,
}

/// An open socket. Dropping `outbound` closes the connection.
#[derive(Debug)]
pub struct Socket {
    pub outbound: mpsc::Sender<String>,
    pub events: mpsc::Receiver<SocketEvent>,
}

/// Opens sockets. The production implementation is [`WsTransport`]; tests
/// substitute a scripted one to drive the client without a server.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open a socket. Resolves once the socket reports open; errors if it
    /// fails before that.
    async fn connect(&self, url: &str, outbound_capacity: usize) -> Result<Socket>;
}

/// Production transport over tokio-tungstenite
#[derive(Debug, Default)]
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, url: &str, outbound_capacity: usize) -> Result<Socket> {
        let (ws_stream, _response) = connect_async(url)
            .await
            .map_err(|err| StreamError::Connect(err.to_string()))?;
        let (mut write, mut read) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(outbound_capacity);
        let (event_tx, event_rx) = mpsc::channel(INBOUND_BUFFER);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    outbound = outbound_rx.recv() => {
                        match outbound {
                            Some(text) => {
                                if write.send(WsMessage::Text(text.into())).await.is_err() {
                                    break;
                                }
                            }
                            None => {
                                let _ = write.send(WsMessage::Close(None)).await;
                                break;
                            }
                        }
                    }
                    incoming = read.next() => {
                        match incoming {
                            Some(Ok(WsMessage::Close(_))) => {
                                let _ = write.send(WsMessage::Close(None)).await;
                                break;
                            }
                            Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Pong(_))) => {}
                            Some(Ok(WsMessage::Text(text))) => {
                                if event_tx.send(SocketEvent::Frame(text.to_string())).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(WsMessage::Binary(bytes))) => {
                                match String::from_utf8(bytes.to_vec()) {
                                    Ok(text) => {
                                        if event_tx.send(SocketEvent::Frame(text)).await.is_err() {
                                            break;
                                        }
                                    }
                                    Err(_) => debug!(bytes = bytes.len(), "dropping non-utf8 binary frame"),
                                }
                            }
                            Some(Ok(_)) => {}
                            Some(Err(_)) | None => {
                                break;
                            }
                        }
                    }
                }
            }

            let _ = event_tx.send(SocketEvent::Closed).await;
        });

        Ok(Socket {
            outbound: outbound_tx,
            events: event_rx,
        })
    }
}
