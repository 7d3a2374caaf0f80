/*
[INPUT]:  Raw JSON text frames from the socket, channel lists from callers
[OUTPUT]: Parsed inbound messages and encoded control frames
[POS]:    Wire layer - message parsing and frame encoding
[UPDATE]: When adding new message types or changing the wire format
*/

use crate::error::{Result, StreamError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outbound control frame action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Subscribe,
    Unsubscribe,
}

/// Outbound control frame: `{"action": "...", "channels": [...]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFrame {
    pub action: ControlAction,
    pub channels: Vec<String>,
}

impl ControlFrame {
    pub fn subscribe(channels: Vec<String>) -> Self {
        Self {
            action: ControlAction::Subscribe,
            channels,
        }
    }

    pub fn unsubscribe(channels: Vec<String>) -> Self {
        Self {
            action: ControlAction::Unsubscribe,
            channels,
        }
    }
}

/// One decoded inbound frame.
///
/// The payload is kept verbatim; `type` and `symbol` are the only fields the
/// router interprets, and both are optional. Use [`InboundMessage::event`]
/// for a typed view of recognized message shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    fields: Map<String, Value>,
}

impl InboundMessage {
    /// Decode a text frame. Anything other than a JSON object is rejected.
    pub fn from_text(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(StreamError::InvalidFrame),
        }
    }

    /// The `type` field, if present
    pub fn event_type(&self) -> Option<&str> {
        self.fields.get("type").and_then(Value::as_str)
    }

    /// The `symbol` field, if present
    pub fn symbol(&self) -> Option<&str> {
        self.fields.get("symbol").and_then(Value::as_str)
    }

    /// Access an arbitrary payload field
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The full payload, verbatim
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Typed view of the message. Unrecognized or malformed shapes fall
    /// back to [`MarketEvent::Other`]; the raw payload stays available
    /// through [`InboundMessage::fields`].
    pub fn event(&self) -> MarketEvent {
        serde_json::from_value(Value::Object(self.fields.clone())).unwrap_or(MarketEvent::Other)
    }
}

/// Recognized inbound message shapes, keyed by the `type` field
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum MarketEvent {
    #[serde(rename = "price_update")]
    PriceUpdate { symbol: String, data: PriceUpdate },
    #[serde(rename = "prediction_update")]
    PredictionUpdate { symbol: String, data: PredictionUpdate },
    #[serde(other)]
    Other,
}

/// Live price tick for one symbol
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PriceUpdate {
    pub price: f64,
    pub change_24h: f64,
    pub volume_24h: f64,
    pub timestamp: String,
}

/// Model prediction for one symbol
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PredictionUpdate {
    pub horizon: String,
    pub predicted_price: f64,
    pub confidence: f64,
    pub timestamp: String,
}
