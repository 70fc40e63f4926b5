use super::DirectRoom;
use meshlink_core::{Payload, PeerId};
use std::collections::HashSet;
use tracing::trace;

impl DirectRoom {
    /// Queue on every link; open links send immediately.
    pub(super) fn broadcast(&mut self, message: Payload) {
        for link in self.pool.iter_mut() {
            link.deliver(message.clone());
        }
    }

    pub(super) fn send_to(&mut self, targets: &[PeerId], message: Payload) {
        let mut seen = HashSet::new();

        for target in targets {
            if !seen.insert(target) {
                continue;
            }
            match self.pool.get_live_mut(target) {
                Some(link) => link.deliver(message.clone()),
                None => trace!("Skipping send to unlinked peer {}", target),
            }
        }
    }
}
