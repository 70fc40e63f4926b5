use crate::room::RoomCommand;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

pub(crate) type SubscriptionId = u64;

/// Ordered callback list. Dispatch iterates over a snapshot, so a callback
/// list can change while it is being invoked.
pub(crate) struct Subscribers<T: ?Sized> {
    entries: Vec<(SubscriptionId, Arc<T>)>,
}

impl<T: ?Sized> Subscribers<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn add(&mut self, id: SubscriptionId, callback: Arc<T>) {
        self.entries.push((id, callback));
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<T>> {
        self.entries.iter().map(|(_, cb)| cb.clone()).collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: ?Sized> Default for Subscribers<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancellation handle returned by every `on_*` registration.
///
/// Dropping it keeps the callback registered.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    commands: mpsc::UnboundedSender<RoomCommand>,
    cancelled: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, commands: mpsc::UnboundedSender<RoomCommand>) -> Self {
        Self {
            id,
            commands,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Remove exactly this callback. Calling it again has no effect.
    pub fn unsubscribe(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.commands.send(RoomCommand::Unsubscribe(self.id));
    }

    pub fn is_active(&self) -> bool {
        !self.cancelled.load(Ordering::SeqCst)
    }
}
