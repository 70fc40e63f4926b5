use super::DirectRoom;
use meshlink_core::PeerDescriptor;
use tracing::{info, trace};

impl DirectRoom {
    /// New members announced by the server: link to each, then notify join
    /// subscribers once with the whole list.
    pub(super) fn peers_opened(&mut self, peers: Vec<PeerDescriptor>) {
        for peer in &peers {
            if peer.id == self.local_id || self.pool.contains_live(&peer.id) {
                continue;
            }
            info!("Peer {} joined room {}", peer.id, self.room_id);
            self.initiate(&peer.id);
        }

        self.hooks.joined(&peers);
    }

    /// A member left. Only a peer we hold a link for (open, connecting or
    /// failed) produces a leave notification, so repeated closes are no-ops.
    pub(super) fn peer_closed(&mut self, peer: PeerDescriptor) {
        if self.pool.remove(&peer.id).is_none() {
            trace!("Close for unlinked peer {}", peer.id);
            return;
        }

        info!("Peer {} left room {}", peer.id, self.room_id);
        self.hooks.left(&peer);
    }
}
