use meshlink_client::{SignalingError, SignalingEvent, SignalingEvents, SignalingSink};
use meshlink_core::{PeerDescriptor, PeerId, RoomId, SignalMessage, Topic};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

struct Member {
    room_id: RoomId,
    events: mpsc::UnboundedSender<SignalingEvent>,
    connected: Arc<AtomicBool>,
}

#[derive(Default)]
struct HubState {
    members: HashMap<PeerId, Member>,
    /// Every frame any client sent, in arrival order.
    frames: Vec<SignalMessage>,
}

/// In-memory stand-in for the signaling server.
///
/// Routes frames the way the real server does: `register` is answered with
/// `register-accept` and announced to the room with `open`, handshake frames
/// go to their receiver, relay frames to every other member of the room.
#[derive(Clone, Default)]
pub struct MockHub {
    state: Arc<Mutex<HubState>>,
}

impl MockHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that is online right away.
    pub fn connect(&self) -> (Arc<MockSignaling>, SignalingEvents) {
        let (signaling, events) = self.connect_deferred();
        signaling.go_online();
        (signaling, events)
    }

    /// A sink that stays offline until [`MockSignaling::go_online`].
    pub fn connect_deferred(&self) -> (Arc<MockSignaling>, SignalingEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        let signaling = Arc::new(MockSignaling {
            hub: self.clone(),
            events: tx,
            connected: Arc::new(AtomicBool::new(false)),
            registered: Mutex::new(None),
            close_calls: AtomicUsize::new(0),
        });
        (signaling, rx)
    }

    /// Deliver a frame straight to a registered member, bypassing routing.
    pub fn inject(&self, to: &PeerId, msg: SignalMessage) {
        let state = self.state.lock().unwrap();
        if let Some(member) = state.members.get(to) {
            let _ = member.events.send(SignalingEvent::Message(msg));
        }
    }

    /// Server-side drop of a member's connection.
    pub fn disconnect(&self, id: &PeerId) {
        let mut state = self.state.lock().unwrap();
        if let Some(member) = state.members.remove(id) {
            member.connected.store(false, Ordering::SeqCst);
            let _ = member.events.send(SignalingEvent::Disconnected);
            announce_close(&state, &member.room_id, id);
        }
    }

    pub fn is_member(&self, id: &PeerId) -> bool {
        self.state.lock().unwrap().members.contains_key(id)
    }

    pub fn frames(&self) -> Vec<SignalMessage> {
        self.state.lock().unwrap().frames.clone()
    }

    /// Number of handshake or relay frames of `topic` sent by `from`
    /// addressed to `to`.
    pub fn count(&self, topic: Topic, from: &PeerId, to: &PeerId) -> usize {
        self.frames()
            .iter()
            .filter(|msg| msg.topic() == topic)
            .filter(|msg| match msg {
                SignalMessage::Offer(env) | SignalMessage::Answer(env) => {
                    &env.sender == from && &env.receiver == to
                }
                SignalMessage::Candidate(env) => &env.sender == from && &env.receiver == to,
                SignalMessage::Relay(env) => &env.sender == from && &env.receiver == to,
                _ => false,
            })
            .count()
    }

    fn route(&self, sink: &MockSignaling, msg: SignalMessage) {
        let mut state = self.state.lock().unwrap();
        state.frames.push(msg.clone());

        match msg {
            SignalMessage::Register { room_id, user_id } => {
                *sink.registered.lock().unwrap() = Some(user_id.clone());
                let _ = sink.events.send(SignalingEvent::Message(SignalMessage::RegisterAccept {
                    room_id: room_id.clone(),
                    id: user_id.clone(),
                }));

                // Same id again: the old connection is dropped and announced closed
                if let Some(old) = state.members.remove(&user_id) {
                    old.connected.store(false, Ordering::SeqCst);
                    let _ = old.events.send(SignalingEvent::Disconnected);
                    announce_close(&state, &old.room_id, &user_id);
                }

                for (id, member) in &state.members {
                    if id != &user_id && member.room_id == room_id {
                        let _ = member.events.send(SignalingEvent::Message(SignalMessage::Open {
                            room_id: room_id.clone(),
                            data: vec![PeerDescriptor::new(user_id.clone())],
                        }));
                    }
                }

                state.members.insert(
                    user_id,
                    Member {
                        room_id,
                        events: sink.events.clone(),
                        connected: sink.connected.clone(),
                    },
                );
            }

            SignalMessage::Offer(ref env) | SignalMessage::Answer(ref env) => {
                deliver(&state, &env.receiver, msg.clone());
            }

            SignalMessage::Candidate(ref env) => {
                deliver(&state, &env.receiver, msg.clone());
            }

            SignalMessage::Relay(ref env) => {
                for (id, member) in &state.members {
                    if id != &env.sender && member.room_id == env.room_id {
                        let _ = member.events.send(SignalingEvent::Message(msg.clone()));
                    }
                }
            }

            _ => {}
        }
    }

    fn leave(&self, id: &PeerId) {
        let mut state = self.state.lock().unwrap();
        if let Some(member) = state.members.remove(id) {
            announce_close(&state, &member.room_id, id);
        }
    }
}

fn deliver(state: &HubState, to: &PeerId, msg: SignalMessage) {
    if let Some(member) = state.members.get(to) {
        let _ = member.events.send(SignalingEvent::Message(msg));
    }
}

fn announce_close(state: &HubState, room_id: &RoomId, id: &PeerId) {
    for member in state.members.values() {
        if &member.room_id == room_id {
            let _ = member.events.send(SignalingEvent::Message(SignalMessage::Close {
                room_id: room_id.clone(),
                data: PeerDescriptor::new(id.clone()),
            }));
        }
    }
}

/// One client's connection to the [`MockHub`].
pub struct MockSignaling {
    hub: MockHub,
    events: mpsc::UnboundedSender<SignalingEvent>,
    connected: Arc<AtomicBool>,
    registered: Mutex<Option<PeerId>>,
    close_calls: AtomicUsize,
}

impl MockSignaling {
    pub fn go_online(&self) {
        self.connected.store(true, Ordering::SeqCst);
        let _ = self.events.send(SignalingEvent::Connected);
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

impl SignalingSink for MockSignaling {
    fn send(&self, message: SignalMessage) -> Result<(), SignalingError> {
        if !self.is_connected() {
            return Err(SignalingError::NotConnected);
        }
        tracing::debug!("[MockHub] {}", message.topic());
        self.hub.route(self, message);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }

        let registered = self.registered.lock().unwrap().take();
        if let Some(id) = registered {
            self.hub.leave(&id);
        }
        let _ = self.events.send(SignalingEvent::Disconnected);
    }
}
