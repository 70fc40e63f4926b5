use crate::room::room_command::{ConnectionId, RoomCommand};
use meshlink_core::{PeerDescriptor, PeerId, RoomId, SignalMessage};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

struct Member {
    conn: ConnectionId,
    tx: mpsc::UnboundedSender<SignalMessage>,
}

/// Membership and routing for one room.
///
/// Every member is a registered websocket connection. The room announces
/// arrivals and departures to the others and routes handshake and relay
/// frames between them. It never looks at payloads.
pub struct Room {
    room_id: RoomId,
    members: HashMap<PeerId, Member>,
    command_rx: mpsc::Receiver<RoomCommand>,
}

impl Room {
    pub fn new(room_id: RoomId, command_rx: mpsc::Receiver<RoomCommand>) -> Self {
        Self {
            room_id,
            members: HashMap::new(),
            command_rx,
        }
    }

    pub async fn run(mut self) {
        info!("Room {} event loop started", self.room_id);

        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd);
        }

        info!("Room {} event loop finished", self.room_id);
    }

    fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { peer_id, conn, tx } => self.join(peer_id, conn, tx),
            RoomCommand::Leave { peer_id, conn } => self.leave(&peer_id, conn),
            RoomCommand::Forward {
                from,
                conn,
                message,
            } => self.forward(&from, conn, message),
        }
    }

    /// A same-id member is replaced. The others see it close before it opens
    /// again, so they drop their link to the old connection and offer anew.
    fn join(&mut self, peer_id: PeerId, conn: ConnectionId, tx: mpsc::UnboundedSender<SignalMessage>) {
        if self
            .members
            .insert(peer_id.clone(), Member { conn, tx })
            .is_some()
        {
            info!("{} re-registered in room {}, dropping the old connection", peer_id, self.room_id);
            let departure = SignalMessage::Close {
                room_id: self.room_id.clone(),
                data: PeerDescriptor::new(peer_id.clone()),
            };
            self.fan_out(&peer_id, &departure);
        } else {
            info!("{} joined room {}", peer_id, self.room_id);
        }

        self.deliver(
            &peer_id,
            SignalMessage::RegisterAccept {
                room_id: self.room_id.clone(),
                id: peer_id.clone(),
            },
        );

        let announcement = SignalMessage::Open {
            room_id: self.room_id.clone(),
            data: vec![PeerDescriptor::new(peer_id.clone())],
        };
        self.fan_out(&peer_id, &announcement);
    }

    fn leave(&mut self, peer_id: &PeerId, conn: ConnectionId) {
        match self.members.get(peer_id) {
            Some(member) if member.conn == conn => {}
            Some(_) => {
                trace!("Ignoring leave of a replaced connection for {}", peer_id);
                return;
            }
            None => return,
        }

        self.members.remove(peer_id);
        info!("{} left room {} ({} remaining)", peer_id, self.room_id, self.members.len());

        let announcement = SignalMessage::Close {
            room_id: self.room_id.clone(),
            data: PeerDescriptor::new(peer_id.clone()),
        };
        self.fan_out(peer_id, &announcement);
    }

    fn forward(&mut self, from: &PeerId, conn: ConnectionId, message: SignalMessage) {
        if !self.members.get(from).is_some_and(|m| m.conn == conn) {
            warn!("Dropped {} from unregistered connection {}", message.topic(), from);
            return;
        }

        if message.room_id() != &self.room_id {
            warn!(
                "Dropped {} from {}: addressed to room {}",
                message.topic(),
                from,
                message.room_id()
            );
            return;
        }

        if message.sender().is_some_and(|sender| sender != from) {
            warn!("Dropped {} from {}: spoofed sender", message.topic(), from);
            return;
        }

        match message {
            SignalMessage::Offer(ref env) | SignalMessage::Answer(ref env) => {
                let receiver = env.receiver.clone();
                self.deliver(&receiver, message);
            }
            SignalMessage::Candidate(ref env) => {
                let receiver = env.receiver.clone();
                self.deliver(&receiver, message);
            }
            SignalMessage::Relay(_) => self.fan_out(from, &message),
            other => debug!("Dropped client-sent {} from {}", other.topic(), from),
        }
    }

    fn deliver(&self, to: &PeerId, message: SignalMessage) {
        let Some(member) = self.members.get(to) else {
            trace!("Dropped {} for {}: not in room {}", message.topic(), to, self.room_id);
            return;
        };
        if member.tx.send(message).is_err() {
            debug!("Connection of {} already closed", to);
        }
    }

    fn fan_out(&self, except: &PeerId, message: &SignalMessage) {
        for (id, member) in &self.members {
            if id != except {
                let _ = member.tx.send(message.clone());
            }
        }
    }
}
