use meshlink_core::PeerId;
use std::fmt;
use thiserror::Error;

/// Errors reported by a transport engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("negotiation failed: {0}")]
    Negotiation(String),
    #[error("data channel error: {0}")]
    Channel(String),
    #[error("data channel is not open")]
    ChannelNotOpen,
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("transport closed")]
    Closed,
}

/// Errors reported by the signaling channel.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignalingError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("signaling channel is not connected")]
    NotConnected,
    #[error("failed to encode signal: {0}")]
    Encode(String),
    #[error("signaling transport error: {0}")]
    Transport(String),
    #[error("signaling channel closed")]
    Closed,
}

/// Errors surfaced to the application through `on_error` subscribers
/// or returned by `Container::connect`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshError {
    #[error("negotiation with peer {peer} failed: {source}")]
    NegotiationFailure {
        peer: PeerId,
        #[source]
        source: TransportError,
    },
    #[error("peer {0} not found")]
    PeerNotFound(PeerId),
    #[error(transparent)]
    Signaling(#[from] SignalingError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Why an inbound signal was dropped without being surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ignored {
    /// Addressed to another room or another receiver.
    ProtocolMismatch,
    /// Answer or candidate for a peer without a link.
    UnknownPeer,
    /// Not the message the link's handshake state expects next.
    UnexpectedState,
    /// Emitted by a transport engine that has since been replaced or removed.
    StaleLink,
}

impl fmt::Display for Ignored {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::ProtocolMismatch => "protocol mismatch",
            Self::UnknownPeer => "unknown peer",
            Self::UnexpectedState => "unexpected in current handshake state",
            Self::StaleLink => "stale link",
        };
        f.write_str(reason)
    }
}
