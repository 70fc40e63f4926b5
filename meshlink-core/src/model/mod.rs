mod payload;
mod peer;
mod room;
mod signaling;

pub use payload::{BROADCAST_RECEIVER, Payload, SendReceipt};
pub use peer::{PeerDescriptor, PeerId};
pub use room::RoomId;
pub use signaling::{
    Envelope, IceCandidate, IceServerConfig, SdpKind, SessionDescription, SignalMessage, Topic,
};
