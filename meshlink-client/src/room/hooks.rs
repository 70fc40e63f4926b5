use crate::error::MeshError;
use crate::subscribers::{Subscribers, SubscriptionId};
use meshlink_core::{Payload, PeerDescriptor, PeerId};
use std::sync::Arc;
use tracing::{error, trace};

pub type BroadcastCallback = dyn Fn(&Payload) + Send + Sync;
pub type JoinCallback = dyn Fn(&[PeerDescriptor]) + Send + Sync;
pub type LeaveCallback = dyn Fn(&PeerDescriptor) + Send + Sync;
pub type ReadyCallback = dyn Fn(&ReadyChannel) + Send + Sync;
pub type ErrorCallback = dyn Fn(&MeshError) + Send + Sync;

/// Which channel became ready to carry application payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReadyChannel {
    /// Data channel to this peer opened.
    Peer(PeerId),
    /// The signaling channel itself carries payloads.
    Relay,
}

pub(crate) enum Hook {
    Broadcast(Arc<BroadcastCallback>),
    Join(Arc<JoinCallback>),
    Leave(Arc<LeaveCallback>),
    Ready(Arc<ReadyCallback>),
    Error(Arc<ErrorCallback>),
}

/// Received payloads waiting for dispatch.
///
/// Every push is dispatched to all current subscribers and the queue is
/// cleared afterwards, so a payload that arrives while nobody listens is lost.
pub(crate) struct InboundBuffer {
    queue: Vec<Payload>,
    subscribers: Subscribers<BroadcastCallback>,
}

impl InboundBuffer {
    fn new() -> Self {
        Self {
            queue: Vec::new(),
            subscribers: Subscribers::new(),
        }
    }

    pub(crate) fn push(&mut self, payload: Payload) {
        self.queue.push(payload);
        self.dispatch();
    }

    fn dispatch(&mut self) {
        if self.subscribers.is_empty() {
            trace!("Dropping {} inbound message(s), no subscribers", self.queue.len());
        }

        let subscribers = self.subscribers.snapshot();
        for payload in &self.queue {
            for cb in &subscribers {
                cb(payload);
            }
        }
        self.queue.clear();
    }
}

/// Every application callback registered on a room.
pub(crate) struct Hooks {
    inbound: InboundBuffer,
    join: Subscribers<JoinCallback>,
    leave: Subscribers<LeaveCallback>,
    ready: Subscribers<ReadyCallback>,
    errors: Subscribers<ErrorCallback>,
}

impl Hooks {
    pub(crate) fn new() -> Self {
        Self {
            inbound: InboundBuffer::new(),
            join: Subscribers::new(),
            leave: Subscribers::new(),
            ready: Subscribers::new(),
            errors: Subscribers::new(),
        }
    }

    pub(crate) fn add(&mut self, id: SubscriptionId, hook: Hook) {
        match hook {
            Hook::Broadcast(cb) => self.inbound.subscribers.add(id, cb),
            Hook::Join(cb) => self.join.add(id, cb),
            Hook::Leave(cb) => self.leave.add(id, cb),
            Hook::Ready(cb) => self.ready.add(id, cb),
            Hook::Error(cb) => self.errors.add(id, cb),
        }
    }

    /// Ids are unique across kinds, so at most one list holds the entry.
    pub(crate) fn remove(&mut self, id: SubscriptionId) {
        let _ = self.inbound.subscribers.remove(id)
            || self.join.remove(id)
            || self.leave.remove(id)
            || self.ready.remove(id)
            || self.errors.remove(id);
    }

    pub(crate) fn receive(&mut self, payload: Payload) {
        self.inbound.push(payload);
    }

    pub(crate) fn joined(&self, peers: &[PeerDescriptor]) {
        for cb in self.join.snapshot() {
            cb(peers);
        }
    }

    pub(crate) fn left(&self, peer: &PeerDescriptor) {
        for cb in self.leave.snapshot() {
            cb(peer);
        }
    }

    pub(crate) fn ready(&self, channel: &ReadyChannel) {
        for cb in self.ready.snapshot() {
            cb(channel);
        }
    }

    pub(crate) fn report(&self, err: MeshError) {
        error!("{}", err);
        for cb in self.errors.snapshot() {
            cb(&err);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.inbound.queue.clear();
        self.inbound.subscribers.clear();
        self.join.clear();
        self.leave.clear();
        self.ready.clear();
        self.errors.clear();
    }
}
