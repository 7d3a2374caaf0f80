/*
[INPUT]:  Stream configuration (host, origin scheme, reconnect policy)
[OUTPUT]: Validated WebSocket endpoint and tuning knobs
[POS]:    Configuration layer - connection options for the client
[UPDATE]: When adding connection options or changing endpoint conventions
*/

use crate::error::Result;
use std::time::Duration;
use url::Url;

/// Endpoint path for the market data stream
const MARKET_STREAM_PATH: &str = "/api/v1/ws/market";

/// Streaming client configuration
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Host and optional port, e.g. `"dashboard.example.com"` or `"localhost:8000"`
    pub host: String,
    /// Whether the page origin is secure; selects `wss` over `ws`
    pub secure: bool,
    /// Fixed delay between reconnect attempts
    pub reconnect_delay: Duration,
    /// Maximum automatic reconnect attempts before giving up
    pub max_reconnect_attempts: u32,
    /// Buffered outbound control frames per connection
    pub outbound_capacity: usize,
}

impl StreamConfig {
    /// Create a configuration with default reconnect policy
    pub fn new(host: impl Into<String>, secure: bool) -> Self {
        Self {
            host: host.into(),
            secure,
            ..Self::default()
        }
    }

    /// Build the full WebSocket endpoint URL
    pub fn endpoint(&self) -> Result<Url> {
        let scheme = if self.secure { "wss" } else { "ws" };
        let url = Url::parse(&format!("{scheme}://{}{MARKET_STREAM_PATH}", self.host))?;
        Ok(url)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            host: "localhost:8000".to_string(),
            secure: false,
            reconnect_delay: Duration::from_millis(3000),
            max_reconnect_attempts: 5,
            outbound_capacity: 64,
        }
    }
}
