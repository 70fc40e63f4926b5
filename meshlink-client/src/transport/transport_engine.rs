use crate::error::TransportError;
use crate::transport::transport_event::TransportEventSender;
use async_trait::async_trait;
use meshlink_core::{IceCandidate, Payload, SessionDescription};
use std::sync::Arc;

/// Per-peer transport capability (NAT traversal, encryption, data channel).
///
/// The mesh never looks inside; it only sequences these calls and reacts to the
/// [`TransportEvent`](crate::TransportEvent)s the engine emits through the
/// sender it was built with. Calls for one peer are never issued concurrently.
#[async_trait]
pub trait TransportEngine: Send + Sync {
    /// Open the local data channel. Called by the initiating side before `create_offer`.
    async fn create_data_channel(&self, label: &str) -> Result<(), TransportError>;

    async fn create_offer(&self) -> Result<SessionDescription, TransportError>;

    async fn create_answer(&self) -> Result<SessionDescription, TransportError>;

    async fn set_remote_description(&self, desc: SessionDescription)
    -> Result<(), TransportError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError>;

    async fn send(&self, payload: Payload) -> Result<(), TransportError>;

    /// Release every resource held by the engine.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Builds one engine per link.
///
/// Must not perform I/O: creation happens inside the room's event loop before
/// any asynchronous call is made on the engine.
pub trait TransportFactory: Send + Sync {
    fn create(&self, events: TransportEventSender) -> Arc<dyn TransportEngine>;
}
