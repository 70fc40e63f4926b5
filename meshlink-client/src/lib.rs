mod container;
mod error;
mod pool;
mod room;
mod signaling;
mod subscribers;
mod transport;

pub use container::{Container, DEFAULT_SIGNALING_URL, MeshConfig, Mode};
pub use error::{MeshError, SignalingError, TransportError};
pub use pool::{ChannelState, HandshakeState, LinkSnapshot};
pub use room::{
    BroadcastCallback, ErrorCallback, JoinCallback, LeaveCallback, ReadyCallback, ReadyChannel,
};
pub use signaling::{SignalingEvent, SignalingEvents, SignalingSink, WsSignaling};
pub use subscribers::Subscription;
pub use transport::{
    TransportConfig, TransportEngine, TransportEvent, TransportEventSender, TransportFactory,
    WebRtcEngine, WebRtcFactory,
};
