mod handshake;
mod lifecycle;
mod router;

use crate::error::{Ignored, MeshError, SignalingError};
use crate::pool::ConnectionPool;
use crate::room::hooks::{Hook, Hooks, ReadyChannel};
use crate::room::room_command::RoomCommand;
use crate::signaling::{SignalingEvent, SignalingEvents, SignalingSink};
use crate::subscribers::SubscriptionId;
use crate::transport::{LinkEvent, LinkMessage, TransportFactory};
use meshlink_core::{PeerId, RoomId, SignalMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// Event loop of a direct-link container.
///
/// Owns the connection pool and every callback list. Application commands,
/// signaling events and link events are handled one at a time, so none of the
/// state needs locking. Engine calls are handed to each link's driver and
/// never awaited here.
pub(crate) struct DirectRoom {
    local_id: PeerId,
    room_id: RoomId,
    channel_label: String,
    signaling: Arc<dyn SignalingSink>,
    factory: Arc<dyn TransportFactory>,
    pool: ConnectionPool,
    hooks: Hooks,
    command_rx: mpsc::UnboundedReceiver<RoomCommand>,
    signaling_rx: SignalingEvents,
    link_rx: mpsc::UnboundedReceiver<LinkMessage>,
}

impl DirectRoom {
    pub(crate) fn new(
        local_id: PeerId,
        room_id: RoomId,
        channel_label: String,
        signaling: Arc<dyn SignalingSink>,
        signaling_rx: SignalingEvents,
        factory: Arc<dyn TransportFactory>,
        command_rx: mpsc::UnboundedReceiver<RoomCommand>,
    ) -> Self {
        let (link_tx, link_rx) = mpsc::unbounded_channel();

        Self {
            local_id,
            room_id,
            channel_label,
            signaling,
            factory,
            pool: ConnectionPool::new(link_tx),
            hooks: Hooks::new(),
            command_rx,
            signaling_rx,
            link_rx,
        }
    }

    pub(crate) async fn run(mut self) {
        info!("Direct room {} started for {}", self.room_id, self.local_id);

        loop {
            tokio::select! {
                biased;

                cmd = self.command_rx.recv() => match cmd {
                    Some(RoomCommand::Close) | None => {
                        info!("Closing direct room {}", self.room_id);
                        break;
                    }
                    Some(c) => self.handle_command(c),
                },

                evt = self.signaling_rx.recv() => match evt {
                    Some(SignalingEvent::Disconnected) | None => {
                        warn!("Signaling channel lost, closing room {}", self.room_id);
                        break;
                    }
                    Some(e) => self.handle_signaling_event(e),
                },

                Some(msg) = self.link_rx.recv() => self.handle_link_message(msg),
            }
        }

        self.shutdown();
        info!("Direct room {} finished", self.room_id);
    }

    fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Broadcast(message) => self.broadcast(message),
            RoomCommand::Send { targets, message } => self.send_to(&targets, message),
            RoomCommand::Subscribe(id, hook) => self.subscribe(id, hook),
            RoomCommand::Unsubscribe(id) => self.hooks.remove(id),
            RoomCommand::Links(reply) => {
                let _ = reply.send(self.pool.snapshot());
            }
            // Handled by the loop
            RoomCommand::Close => {}
        }
    }

    fn subscribe(&mut self, id: SubscriptionId, hook: Hook) {
        if let Hook::Ready(cb) = &hook {
            for link in self.pool.iter().filter(|link| link.is_open()) {
                cb(&ReadyChannel::Peer(link.peer_id.clone()));
            }
        }
        self.hooks.add(id, hook);
    }

    fn handle_signaling_event(&mut self, event: SignalingEvent) {
        match event {
            SignalingEvent::Connected => self.register(),
            SignalingEvent::Error(e) => self
                .hooks
                .report(MeshError::Signaling(SignalingError::Transport(e))),
            SignalingEvent::Message(msg) => self.handle_signal(msg),
            SignalingEvent::Disconnected => {}
        }
    }

    fn register(&mut self) {
        debug!("Registering {} in room {}", self.local_id, self.room_id);
        self.signal(SignalMessage::Register {
            room_id: self.room_id.clone(),
            user_id: self.local_id.clone(),
        });
    }

    fn handle_signal(&mut self, msg: SignalMessage) {
        if msg.room_id() != &self.room_id {
            trace!("Dropped {} for room {}: {}", msg.topic(), msg.room_id(), Ignored::ProtocolMismatch);
            return;
        }

        match msg {
            SignalMessage::RegisterAccept { id, .. } => {
                info!("Registered in room {} as {}", self.room_id, id);
            }
            SignalMessage::Open { data, .. } => self.peers_opened(data),
            SignalMessage::Close { data, .. } => self.peer_closed(data),
            SignalMessage::Offer(env) if env.receiver == self.local_id => {
                self.offer_received(env.sender, env.payload)
            }
            SignalMessage::Answer(env) if env.receiver == self.local_id => {
                self.answer_received(env.sender, env.payload)
            }
            SignalMessage::Candidate(env) if env.receiver == self.local_id => {
                self.candidate_received(env.sender, env.payload)
            }
            other => {
                trace!("Dropped {}: {}", other.topic(), Ignored::ProtocolMismatch);
            }
        }
    }

    fn handle_link_message(&mut self, msg: LinkMessage) {
        let LinkMessage {
            peer_id,
            link_id,
            event,
        } = msg;

        if self.pool.get(&peer_id).is_none() {
            match event {
                LinkEvent::LocalOffer(_) | LinkEvent::LocalAnswer(_) => {
                    self.hooks.report(MeshError::PeerNotFound(peer_id));
                }
                _ => trace!("Dropped link event from {}: {}", peer_id, Ignored::UnknownPeer),
            }
            return;
        }

        if !self.pool.is_current(&peer_id, link_id) {
            trace!("Dropped link event from {}: {}", peer_id, Ignored::StaleLink);
            return;
        }

        match event {
            LinkEvent::LocalOffer(offer) => self.local_offer_ready(peer_id, offer),
            LinkEvent::LocalAnswer(answer) => self.local_answer_ready(peer_id, answer),
            LinkEvent::Transport(evt) => self.transport_event(peer_id, evt),
            LinkEvent::Failed(e) => self.fail_link(&peer_id, e),
        }
    }

    fn signal(&self, msg: SignalMessage) {
        if let Err(e) = self.signaling.send(msg) {
            self.hooks.report(MeshError::Signaling(e));
        }
    }

    fn shutdown(&mut self) {
        debug!("Closing {} link(s)", self.pool.len());
        self.pool.clear();
        self.hooks.clear();
        self.signaling.close();
    }
}
