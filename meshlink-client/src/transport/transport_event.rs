use crate::error::TransportError;
use meshlink_core::{IceCandidate, Payload, PeerId, SessionDescription};
use tokio::sync::mpsc;

/// Events a transport engine generates for the room's event loop.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Local ICE candidate, to be forwarded to the peer through signaling.
    Candidate(IceCandidate),

    /// The remote side opened a data channel with this label.
    DataChannel(String),

    /// The data channel is open and ready to carry payloads.
    DataChannelOpen,

    /// Payload received on the data channel.
    Message(Payload),

    /// Negotiation or channel failure. The link is closed, no retry.
    Error(TransportError),
}

pub(crate) type LinkId = u64;

/// Everything that flows from a link back into the room.
#[derive(Debug)]
pub(crate) enum LinkEvent {
    Transport(TransportEvent),
    LocalOffer(SessionDescription),
    LocalAnswer(SessionDescription),
    Failed(TransportError),
}

#[derive(Debug)]
pub(crate) struct LinkMessage {
    pub peer_id: PeerId,
    pub link_id: LinkId,
    pub event: LinkEvent,
}

/// Handed to a [`TransportFactory`](crate::TransportFactory) so the engine it builds
/// can report back. Events are tagged with the link they belong to, so
/// anything emitted after the link was replaced or removed is discarded.
#[derive(Debug, Clone)]
pub struct TransportEventSender {
    peer_id: PeerId,
    link_id: LinkId,
    tx: mpsc::UnboundedSender<LinkMessage>,
}

impl TransportEventSender {
    pub(crate) fn new(
        peer_id: PeerId,
        link_id: LinkId,
        tx: mpsc::UnboundedSender<LinkMessage>,
    ) -> Self {
        Self {
            peer_id,
            link_id,
            tx,
        }
    }

    /// Remote peer this engine is linked to.
    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    /// Returns `false` once the room has shut down.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.report(LinkEvent::Transport(event))
    }

    pub(crate) fn report(&self, event: LinkEvent) -> bool {
        self.tx
            .send(LinkMessage {
                peer_id: self.peer_id.clone(),
                link_id: self.link_id,
                event,
            })
            .is_ok()
    }
}
