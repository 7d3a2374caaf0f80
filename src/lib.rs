/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public market stream client crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod message;
pub mod registry;
pub mod router;
pub mod transport;

// Re-export the public surface
pub use client::MarketStreamClient;
pub use config::StreamConfig;
pub use connection::ConnectionState;
pub use error::{Result, StreamError};
pub use message::{
    ControlAction,
    ControlFrame,
    InboundMessage,
    MarketEvent,
    PredictionUpdate,
    PriceUpdate,
};
pub use router::{HandlerGuard, WILDCARD_KEY};
pub use transport::{Socket, SocketEvent, Transport, WsTransport};
