pub mod mock_signaling;
pub mod recorder;

pub use mock_signaling::*;
pub use mock_transport::*;
pub use recorder::*;

use meshlink_client::{ChannelState, Container, LinkSnapshot, MeshConfig};
use meshlink_core::PeerId;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Level;

/// Timeout for anything that crosses the event loops (ms).
pub const WAIT_TIMEOUT_MS: u64 = 2000;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// Poll `condition` every 10ms until it holds or `timeout_ms` passes.
pub async fn wait_for<F>(timeout_ms: u64, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub async fn wait_for_links<F>(container: &Container, timeout_ms: u64, condition: F) -> bool
where
    F: Fn(&[LinkSnapshot]) -> bool,
{
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if condition(&container.links().await) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub async fn wait_for_open(container: &Container, peer: &PeerId) -> bool {
    wait_for_links(container, WAIT_TIMEOUT_MS, |links| {
        links
            .iter()
            .any(|l| &l.peer_id == peer && l.channel_state == ChannelState::Open)
    })
    .await
}

/// Let queued events run through every event loop.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

/// A test participant: its container, its recorded callbacks and its
/// connection to the hub.
pub struct TestPeer {
    pub id: PeerId,
    pub container: Container,
    pub recorder: Recorder,
    pub signaling: Arc<MockSignaling>,
}

impl TestPeer {
    /// Join `room` in direct mode and wait until the hub has registered it.
    pub async fn direct(hub: &MockHub, fabric: &MockFabric, id: &str, room: &str) -> Self {
        let (signaling, events) = hub.connect();
        let container = Container::direct(
            MeshConfig::new(room).with_id(id),
            signaling.clone(),
            events,
            fabric.factory(id),
        );
        Self::registered(hub, id, container, signaling).await
    }

    /// Join `room` in relay mode and wait until the hub has registered it.
    pub async fn relay(hub: &MockHub, id: &str, room: &str) -> Self {
        let (signaling, events) = hub.connect();
        let container = Container::relay(MeshConfig::new(room).with_id(id), signaling.clone(), events);
        Self::registered(hub, id, container, signaling).await
    }

    async fn registered(
        hub: &MockHub,
        id: &str,
        container: Container,
        signaling: Arc<MockSignaling>,
    ) -> Self {
        let recorder = Recorder::attach(&container);
        let peer_id = PeerId::from(id);

        let registered = wait_for(WAIT_TIMEOUT_MS, || hub.is_member(&peer_id)).await;
        assert!(registered, "{} was not registered by the hub", id);

        Self {
            id: peer_id,
            container,
            recorder,
            signaling,
        }
    }
}
