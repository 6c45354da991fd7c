use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::RelayError;

/// Kind of signaling envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    Offer,
    Answer,
    Candidate,
    Join,
    /// Sent by the relay to a joining peer, carrying its id in `to`
    Welcome,
    /// Sent by the relay to the rest of a room when a peer goes away
    Leave,
}

impl SignalType {
    /// Only the relay may send this kind of envelope.
    pub fn is_relay_only(self) -> bool {
        matches!(self, Self::Welcome | Self::Leave)
    }
}

/// Routing envelope around an opaque SDP / ICE payload.
///
/// `data` and `from` are passed through untouched. `to` is carried but not
/// used for routing: delivery is always room-wide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMessage {
    #[serde(rename = "type")]
    pub kind: SignalType,
    /// `None` when absent; an explicit `null` is `Some(Value::Null)`
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl SignalMessage {
    pub fn new(kind: SignalType) -> Self {
        Self {
            kind,
            data: None,
            from: None,
            to: None,
        }
    }

    pub fn welcome(to: impl Into<String>) -> Self {
        Self {
            to: Some(to.into()),
            ..Self::new(SignalType::Welcome)
        }
    }

    pub fn leave(from: impl Into<String>) -> Self {
        Self {
            from: Some(from.into()),
            ..Self::new(SignalType::Leave)
        }
    }

    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn encode(&self) -> Result<String, RelayError> {
        serde_json::to_string(self).map_err(RelayError::Encode)
    }

    pub fn decode(text: &str) -> Result<Self, RelayError> {
        serde_json::from_str(text).map_err(RelayError::Malformed)
    }

    /// Decode a frame sent by a peer. Relay-only kinds are rejected.
    pub fn decode_inbound(text: &str) -> Result<Self, RelayError> {
        let msg = Self::decode(text)?;
        if msg.kind.is_relay_only() {
            return Err(RelayError::Malformed(serde_json::Error::custom(format!(
                "peers may not send {:?} envelopes",
                msg.kind
            ))));
        }
        Ok(msg)
    }
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl FromStr for SignalMessage {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
