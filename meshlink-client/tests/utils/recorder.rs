use meshlink_client::{Container, MeshError, ReadyChannel};
use meshlink_core::{Payload, PeerId};
use std::sync::{Arc, Mutex};

/// Captures every callback a container fires.
#[derive(Clone, Default)]
pub struct Recorder {
    messages: Arc<Mutex<Vec<Payload>>>,
    joins: Arc<Mutex<Vec<Vec<PeerId>>>>,
    leaves: Arc<Mutex<Vec<PeerId>>>,
    ready: Arc<Mutex<Vec<ReadyChannel>>>,
    errors: Arc<Mutex<Vec<MeshError>>>,
}

impl Recorder {
    /// Subscribe to every event of `container`. The callbacks stay
    /// registered for the container's lifetime.
    pub fn attach(container: &Container) -> Self {
        let recorder = Self::default();

        let messages = recorder.messages.clone();
        container.on_broadcast(move |p| messages.lock().unwrap().push(p.clone()));

        let joins = recorder.joins.clone();
        container.on_join(move |peers| {
            let ids = peers.iter().map(|p| p.id.clone()).collect();
            joins.lock().unwrap().push(ids);
        });

        let leaves = recorder.leaves.clone();
        container.on_leave(move |peer| leaves.lock().unwrap().push(peer.id.clone()));

        let ready = recorder.ready.clone();
        container.on_message_channel_ready(move |ch| ready.lock().unwrap().push(ch.clone()));

        let errors = recorder.errors.clone();
        container.on_error(move |e| errors.lock().unwrap().push(e.clone()));

        recorder
    }

    pub fn messages(&self) -> Vec<Payload> {
        self.messages.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.messages()
            .iter()
            .filter_map(|p| p.as_text().map(str::to_owned))
            .collect()
    }

    pub fn joins(&self) -> Vec<Vec<PeerId>> {
        self.joins.lock().unwrap().clone()
    }

    pub fn leaves(&self) -> Vec<PeerId> {
        self.leaves.lock().unwrap().clone()
    }

    pub fn ready(&self) -> Vec<ReadyChannel> {
        self.ready.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<MeshError> {
        self.errors.lock().unwrap().clone()
    }
}
