use crate::model::peer::PeerId;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Receiver label used in receipts and relay envelopes for room-wide sends.
pub const BROADCAST_RECEIVER: &str = "broadcast";

/// Application data exchanged between peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Payload {
    Text(String),
    Binary(Bytes),
}

impl Payload {
    /// Encode a structured value as a JSON text payload.
    pub fn from_object<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_string(value).map(Self::Text)
    }

    /// Decode a JSON payload produced by [`Payload::from_object`].
    pub fn to_object<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match self {
            Self::Text(text) => serde_json::from_str(text),
            Self::Binary(bytes) => serde_json::from_slice(bytes),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Bytes> for Payload {
    fn from(b: Bytes) -> Self {
        Self::Binary(b)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(b: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(b))
    }
}

impl From<&[u8]> for Payload {
    fn from(b: &[u8]) -> Self {
        Self::Binary(Bytes::copy_from_slice(b))
    }
}

/// Returned synchronously by `broadcast` / `send`. Delivery is fire-and-forget;
/// the receipt only describes what was handed to the mesh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub sender: PeerId,
    pub receiver: String,
    pub message: Payload,
}

impl SendReceipt {
    pub fn broadcast(sender: PeerId, message: Payload) -> Self {
        Self {
            sender,
            receiver: BROADCAST_RECEIVER.to_owned(),
            message,
        }
    }

    /// Receipt for a targeted send; `receiver` lists the requested ids
    /// comma-separated, in the order given.
    pub fn targeted(sender: PeerId, targets: &[PeerId], message: Payload) -> Self {
        let receiver = targets
            .iter()
            .map(PeerId::as_str)
            .collect::<Vec<_>>()
            .join(",");

        Self {
            sender,
            receiver,
            message,
        }
    }
}
