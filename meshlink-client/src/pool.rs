use crate::transport::link_driver::{EngineOp, LinkDriver};
use crate::transport::{LinkId, LinkMessage, TransportEngine, TransportEventSender};
use meshlink_core::{IceCandidate, Payload, PeerId};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Readiness of a link's data channel. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
}

/// Where a link is in the offer/answer exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeState {
    Idle,
    /// Engine is producing our offer.
    Offering,
    /// Offer sent, waiting for the remote answer.
    AwaitingAnswer,
    /// Remote offer accepted, answer produced or in progress.
    AnsweringOffer,
    Open,
    Closed,
}

/// Point-in-time view of one link, as returned by `Container::links`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSnapshot {
    pub peer_id: PeerId,
    pub channel_state: ChannelState,
    pub handshake_state: HandshakeState,
}

/// Everything the room knows about one remote peer.
pub(crate) struct Link {
    pub(crate) peer_id: PeerId,
    pub(crate) link_id: LinkId,
    pub(crate) channel_state: ChannelState,
    pub(crate) handshake: HandshakeState,
    pending: VecDeque<Payload>,
    remote_applied: bool,
    early_candidates: Vec<IceCandidate>,
    description_sent: bool,
    /// Own candidates gathered before our offer or answer went out.
    local_candidates: Vec<IceCandidate>,
    driver: LinkDriver,
}

impl Link {
    fn spawn<F>(
        peer_id: PeerId,
        link_id: LinkId,
        events_tx: &mpsc::UnboundedSender<LinkMessage>,
        pending: VecDeque<Payload>,
        factory: F,
    ) -> Self
    where
        F: FnOnce(TransportEventSender) -> Arc<dyn TransportEngine>,
    {
        let events = TransportEventSender::new(peer_id.clone(), link_id, events_tx.clone());
        let engine = factory(events.clone());

        Self {
            peer_id,
            link_id,
            channel_state: ChannelState::Connecting,
            handshake: HandshakeState::Idle,
            pending,
            remote_applied: false,
            early_candidates: Vec::new(),
            description_sent: false,
            local_candidates: Vec::new(),
            driver: LinkDriver::spawn(engine, events),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.channel_state == ChannelState::Closed
    }

    pub(crate) fn is_open(&self) -> bool {
        self.channel_state == ChannelState::Open
    }

    /// Whether a remote description has already been queued for the engine.
    pub(crate) fn remote_applied(&self) -> bool {
        self.remote_applied
    }

    pub(crate) fn push(&self, op: EngineOp) {
        self.driver.push(op);
    }

    /// Queue the remote offer or answer, then any candidates that arrived ahead of it.
    pub(crate) fn apply_remote(&mut self, op: EngineOp) {
        self.driver.push(op);
        self.remote_applied = true;
        for candidate in self.early_candidates.drain(..) {
            self.driver.push(EngineOp::Candidate(candidate));
        }
    }

    pub(crate) fn add_remote_candidate(&mut self, candidate: IceCandidate) {
        if self.remote_applied {
            self.driver.push(EngineOp::Candidate(candidate));
        } else {
            self.early_candidates.push(candidate);
        }
    }

    /// Hands an own candidate back if it can be signaled now. Until our
    /// description has been signaled the peer has no link to apply it to, so
    /// it is kept here.
    pub(crate) fn local_candidate(&mut self, candidate: IceCandidate) -> Option<IceCandidate> {
        if self.description_sent {
            return Some(candidate);
        }
        self.local_candidates.push(candidate);
        None
    }

    /// Record that our offer or answer went out and return the candidates
    /// held back until then.
    pub(crate) fn local_description_sent(&mut self) -> Vec<IceCandidate> {
        self.description_sent = true;
        std::mem::take(&mut self.local_candidates)
    }

    /// Send now if the channel is open, queue while it is connecting, drop once closed.
    pub(crate) fn deliver(&mut self, payload: Payload) {
        match self.channel_state {
            ChannelState::Open => self.driver.push(EngineOp::Send(payload)),
            ChannelState::Connecting => self.pending.push_back(payload),
            ChannelState::Closed => {}
        }
    }

    /// Transition to `Open` and drain the pending queue in order.
    ///
    /// Returns `false` if the link was not connecting, in which case nothing happens.
    pub(crate) fn mark_open(&mut self) -> bool {
        if self.channel_state != ChannelState::Connecting {
            return false;
        }

        self.channel_state = ChannelState::Open;
        self.handshake = HandshakeState::Open;
        while let Some(payload) = self.pending.pop_front() {
            self.driver.push(EngineOp::Send(payload));
        }
        true
    }

    /// Terminal. Discards queued payloads and shuts the engine down.
    pub(crate) fn mark_closed(&mut self) {
        self.channel_state = ChannelState::Closed;
        self.handshake = HandshakeState::Closed;
        self.pending.clear();
        self.early_candidates.clear();
        self.local_candidates.clear();
        self.driver.shutdown();
    }

    pub(crate) fn snapshot(&self) -> LinkSnapshot {
        LinkSnapshot {
            peer_id: self.peer_id.clone(),
            channel_state: self.channel_state,
            handshake_state: self.handshake,
        }
    }
}

/// Identity to link map. At most one link per peer.
///
/// A `Closed` link stays in the map as a tombstone until it is removed or
/// replaced; lookups that care about live links skip it.
pub(crate) struct ConnectionPool {
    links: HashMap<PeerId, Link>,
    next_link_id: LinkId,
    events_tx: mpsc::UnboundedSender<LinkMessage>,
}

impl ConnectionPool {
    pub(crate) fn new(events_tx: mpsc::UnboundedSender<LinkMessage>) -> Self {
        Self {
            links: HashMap::new(),
            next_link_id: 1,
            events_tx,
        }
    }

    pub(crate) fn get(&self, peer_id: &PeerId) -> Option<&Link> {
        self.links.get(peer_id)
    }

    pub(crate) fn get_live_mut(&mut self, peer_id: &PeerId) -> Option<&mut Link> {
        self.links.get_mut(peer_id).filter(|link| !link.is_closed())
    }

    pub(crate) fn contains_live(&self, peer_id: &PeerId) -> bool {
        self.links.get(peer_id).is_some_and(|link| !link.is_closed())
    }

    /// Whether `link_id` is the live link currently held for `peer_id`.
    pub(crate) fn is_current(&self, peer_id: &PeerId, link_id: LinkId) -> bool {
        self.links
            .get(peer_id)
            .is_some_and(|link| link.link_id == link_id && !link.is_closed())
    }

    /// Returns the live link for `peer_id`, creating it if there is none.
    ///
    /// The factory runs only when a link is created, and creation completes
    /// before any engine call is made. The flag is `true` for a new link.
    pub(crate) fn get_or_create<F>(&mut self, peer_id: &PeerId, factory: F) -> (&mut Link, bool)
    where
        F: FnOnce(TransportEventSender) -> Arc<dyn TransportEngine>,
    {
        let next_link_id = &mut self.next_link_id;
        let events_tx = &self.events_tx;

        match self.links.entry(peer_id.clone()) {
            Entry::Occupied(entry) if !entry.get().is_closed() => (entry.into_mut(), false),
            Entry::Occupied(mut entry) => {
                let link_id = allocate(next_link_id);
                entry.insert(Link::spawn(
                    peer_id.clone(),
                    link_id,
                    events_tx,
                    VecDeque::new(),
                    factory,
                ));
                (entry.into_mut(), true)
            }
            Entry::Vacant(entry) => {
                let link_id = allocate(next_link_id);
                let link = Link::spawn(
                    peer_id.clone(),
                    link_id,
                    events_tx,
                    VecDeque::new(),
                    factory,
                );
                (entry.insert(link), true)
            }
        }
    }

    /// Swap the engine of an existing live link for a fresh one, keeping its
    /// pending queue. The old engine is shut down and its events become stale.
    pub(crate) fn renew<F>(&mut self, peer_id: &PeerId, factory: F) -> Option<&mut Link>
    where
        F: FnOnce(TransportEventSender) -> Arc<dyn TransportEngine>,
    {
        let link_id = allocate(&mut self.next_link_id);
        let events_tx = &self.events_tx;

        let link = self.links.get_mut(peer_id).filter(|link| !link.is_closed())?;
        let pending = std::mem::take(&mut link.pending);
        *link = Link::spawn(peer_id.clone(), link_id, events_tx, pending, factory);
        Some(link)
    }

    /// Close and drop the link. Removing an absent peer is a no-op.
    pub(crate) fn remove(&mut self, peer_id: &PeerId) -> Option<Link> {
        let mut link = self.links.remove(peer_id)?;
        link.mark_closed();
        Some(link)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Link> {
        self.links.values_mut()
    }

    pub(crate) fn snapshot(&self) -> Vec<LinkSnapshot> {
        let mut links: Vec<_> = self.links.values().map(Link::snapshot).collect();
        links.sort_by(|a, b| a.peer_id.cmp(&b.peer_id));
        links
    }

    pub(crate) fn clear(&mut self) {
        for (_, mut link) in self.links.drain() {
            link.mark_closed();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.links.len()
    }
}

fn allocate(next: &mut LinkId) -> LinkId {
    let id = *next;
    *next += 1;
    id
}
