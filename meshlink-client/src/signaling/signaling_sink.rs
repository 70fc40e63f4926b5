use crate::error::SignalingError;
use meshlink_core::SignalMessage;
use tokio::sync::mpsc;

/// Outbound half of the signaling channel.
///
/// Sends are fire-and-forget: the sink only queues the frame, so it can be
/// called from inside the room's event loop.
pub trait SignalingSink: Send + Sync {
    fn send(&self, message: SignalMessage) -> Result<(), SignalingError>;

    fn is_connected(&self) -> bool;

    /// Idempotent.
    fn close(&self);
}

/// Inbound half of the signaling channel.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalingEvent {
    Connected,
    Disconnected,
    Error(String),
    Message(SignalMessage),
}

pub type SignalingEvents = mpsc::UnboundedReceiver<SignalingEvent>;
