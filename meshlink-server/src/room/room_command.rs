use meshlink_core::{PeerId, SignalMessage};
use tokio::sync::mpsc;

/// Identifies one websocket connection, so a stale connection cannot evict
/// the member that replaced it.
pub type ConnectionId = u64;

/// Commands sent to a room by the websocket handlers.
#[derive(Debug)]
pub enum RoomCommand {
    /// A connection registered as `peer_id`.
    Join {
        peer_id: PeerId,
        conn: ConnectionId,
        tx: mpsc::UnboundedSender<SignalMessage>,
    },

    /// The connection went away.
    Leave { peer_id: PeerId, conn: ConnectionId },

    /// A frame received from a registered connection.
    Forward {
        from: PeerId,
        conn: ConnectionId,
        message: SignalMessage,
    },
}
