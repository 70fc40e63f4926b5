use crate::model::payload::Payload;
use crate::model::peer::{PeerDescriptor, PeerId};
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

/// Session description produced and consumed by the transport engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_m_line_index: Option<u16>,
}

/// Routing header shared by every peer-addressed signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub sender: PeerId,
    pub receiver: PeerId,
    pub room_id: RoomId,
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn new(sender: PeerId, receiver: PeerId, room_id: RoomId, payload: T) -> Self {
        Self {
            sender,
            receiver,
            room_id,
            payload,
        }
    }
}

/// Every frame exchanged with the signaling server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum SignalMessage {
    #[serde(rename_all = "camelCase")]
    Register { room_id: RoomId, user_id: PeerId },

    #[serde(rename_all = "camelCase")]
    RegisterAccept { room_id: RoomId, id: PeerId },

    #[serde(rename_all = "camelCase")]
    Open {
        room_id: RoomId,
        data: Vec<PeerDescriptor>,
    },

    #[serde(rename_all = "camelCase")]
    Close { room_id: RoomId, data: PeerDescriptor },

    Offer(Envelope<SessionDescription>),

    Answer(Envelope<SessionDescription>),

    Candidate(Envelope<IceCandidate>),

    /// Application data carried by the signaling server itself (relay mode).
    Relay(Envelope<Payload>),
}

impl SignalMessage {
    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::Register { room_id, .. }
            | Self::RegisterAccept { room_id, .. }
            | Self::Open { room_id, .. }
            | Self::Close { room_id, .. } => room_id,
            Self::Offer(env) | Self::Answer(env) => &env.room_id,
            Self::Candidate(env) => &env.room_id,
            Self::Relay(env) => &env.room_id,
        }
    }

    pub fn topic(&self) -> Topic {
        match self {
            Self::Register { .. } => Topic::Register,
            Self::RegisterAccept { .. } => Topic::RegisterAccept,
            Self::Open { .. } => Topic::Open,
            Self::Close { .. } => Topic::Close,
            Self::Offer(_) => Topic::Offer,
            Self::Answer(_) => Topic::Answer,
            Self::Candidate(_) => Topic::Candidate,
            Self::Relay(_) => Topic::Relay,
        }
    }

    /// Sender of a peer-addressed signal.
    pub fn sender(&self) -> Option<&PeerId> {
        match self {
            Self::Offer(env) | Self::Answer(env) => Some(&env.sender),
            Self::Candidate(env) => Some(&env.sender),
            Self::Relay(env) => Some(&env.sender),
            _ => None,
        }
    }
}

/// Event name of a [`SignalMessage`] on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Register,
    RegisterAccept,
    Open,
    Close,
    Offer,
    Answer,
    Candidate,
    Relay,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::RegisterAccept => "register-accept",
            Self::Open => "open",
            Self::Close => "close",
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::Candidate => "candidate",
            Self::Relay => "relay",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
