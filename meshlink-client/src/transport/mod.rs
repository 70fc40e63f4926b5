pub(crate) mod link_driver;
mod transport_config;
mod transport_engine;
mod transport_event;
mod webrtc_engine;

pub use transport_config::TransportConfig;
pub use transport_engine::{TransportEngine, TransportFactory};
pub use transport_event::{TransportEvent, TransportEventSender};
pub(crate) use transport_event::{LinkEvent, LinkId, LinkMessage};
pub use webrtc_engine::{WebRtcEngine, WebRtcFactory};
