use crate::room::{Room, RoomCommand};
use dashmap::DashMap;
use meshlink_core::RoomId;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Clone, Default)]
pub struct RoomManager {
    rooms: Arc<DashMap<RoomId, mpsc::Sender<RoomCommand>>>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Command sender of `room_id`, spawning the room on first use.
    pub fn get_room_sender(&self, room_id: &RoomId) -> mpsc::Sender<RoomCommand> {
        if let Some(sender) = self.rooms.get(room_id) {
            return sender.clone();
        }

        self.rooms
            .entry(room_id.clone())
            .or_insert_with(|| {
                info!("Creating new room: {}", room_id);
                let (tx, rx) = mpsc::channel(100);
                tokio::spawn(Room::new(room_id.clone(), rx).run());
                tx
            })
            .clone()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
