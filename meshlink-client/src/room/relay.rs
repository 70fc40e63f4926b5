use crate::error::{Ignored, MeshError, SignalingError};
use crate::room::hooks::{Hook, Hooks, ReadyChannel};
use crate::room::room_command::RoomCommand;
use crate::signaling::{SignalingEvent, SignalingEvents, SignalingSink};
use meshlink_core::{BROADCAST_RECEIVER, Envelope, Payload, PeerId, RoomId, SignalMessage};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// Event loop of a relay-only container. Payloads travel over the
/// signaling channel itself; there are no links.
pub(crate) struct RelayRoom {
    local_id: PeerId,
    room_id: RoomId,
    signaling: Arc<dyn SignalingSink>,
    hooks: Hooks,
    connected: bool,
    pending: VecDeque<Payload>,
    departed: HashSet<PeerId>,
    command_rx: mpsc::UnboundedReceiver<RoomCommand>,
    signaling_rx: SignalingEvents,
}

impl RelayRoom {
    pub(crate) fn new(
        local_id: PeerId,
        room_id: RoomId,
        signaling: Arc<dyn SignalingSink>,
        signaling_rx: SignalingEvents,
        command_rx: mpsc::UnboundedReceiver<RoomCommand>,
    ) -> Self {
        Self {
            local_id,
            room_id,
            signaling,
            hooks: Hooks::new(),
            connected: false,
            pending: VecDeque::new(),
            departed: HashSet::new(),
            command_rx,
            signaling_rx,
        }
    }

    pub(crate) async fn run(mut self) {
        info!("Relay room {} started for {}", self.room_id, self.local_id);

        loop {
            tokio::select! {
                biased;

                cmd = self.command_rx.recv() => match cmd {
                    Some(RoomCommand::Close) | None => {
                        info!("Closing relay room {}", self.room_id);
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
            }
        }

        self.hooks.clear();
        self.pending.clear();
        self.signaling.close();
        info!("Relay room {} finished", self.room_id);
    }

    fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            // Targeted sends are not differentiated from broadcasts here
            RoomCommand::Broadcast(message) | RoomCommand::Send { message, .. } => {
                self.publish(message)
            }
            RoomCommand::Subscribe(id, hook) => {
                if let Hook::Ready(cb) = &hook {
                    if self.connected {
                        cb(&ReadyChannel::Relay);
                    }
                }
                self.hooks.add(id, hook);
            }
            RoomCommand::Unsubscribe(id) => self.hooks.remove(id),
            RoomCommand::Links(reply) => {
                let _ = reply.send(Vec::new());
            }
            RoomCommand::Close => {}
        }
    }

    fn handle_signaling_event(&mut self, event: SignalingEvent) {
        match event {
            SignalingEvent::Connected => {
                debug!("Registering {} in room {}", self.local_id, self.room_id);
                self.signal(SignalMessage::Register {
                    room_id: self.room_id.clone(),
                    user_id: self.local_id.clone(),
                });

                self.connected = true;
                while let Some(message) = self.pending.pop_front() {
                    self.publish(message);
                }
                self.hooks.ready(&ReadyChannel::Relay);
            }
            SignalingEvent::Error(e) => self
                .hooks
                .report(MeshError::Signaling(SignalingError::Transport(e))),
            SignalingEvent::Message(msg) => self.handle_signal(msg),
            SignalingEvent::Disconnected => {}
        }
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
            SignalMessage::Open { data, .. } => {
                for peer in &data {
                    self.departed.remove(&peer.id);
                }
                self.hooks.joined(&data);
            }
            SignalMessage::Close { data, .. } => {
                if data.id == self.local_id || !self.departed.insert(data.id.clone()) {
                    trace!("Repeated close for {}", data.id);
                    return;
                }
                info!("Peer {} left room {}", data.id, self.room_id);
                self.hooks.left(&data);
            }
            SignalMessage::Relay(env) => {
                let addressed = env.receiver.as_str() == BROADCAST_RECEIVER
                    || env.receiver == self.local_id;
                if env.sender == self.local_id || !addressed {
                    trace!("Dropped relay frame from {}: {}", env.sender, Ignored::ProtocolMismatch);
                    return;
                }
                self.hooks.receive(env.payload);
            }
            other => {
                trace!("Dropped {} in relay mode", other.topic());
            }
        }
    }

    /// Send now while connected, otherwise keep for the next connect.
    fn publish(&mut self, message: Payload) {
        if !self.connected {
            self.pending.push_back(message);
            return;
        }

        let envelope = Envelope::new(
            self.local_id.clone(),
            PeerId::from(BROADCAST_RECEIVER),
            self.room_id.clone(),
            message,
        );
        self.signal(SignalMessage::Relay(envelope));
    }

    fn signal(&self, msg: SignalMessage) {
        if let Err(e) = self.signaling.send(msg) {
            self.hooks.report(MeshError::Signaling(e));
        }
    }
}
