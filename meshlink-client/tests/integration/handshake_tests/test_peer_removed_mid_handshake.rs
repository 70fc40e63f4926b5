use meshlink_client::HandshakeState;
use meshlink_core::{PeerDescriptor, PeerId, RoomId, SignalMessage, Topic};

use crate::integration::ROOM;
use crate::utils::{
    MockFabric, MockHub, TestPeer, WAIT_TIMEOUT_MS, init_tracing, settle, wait_for,
    wait_for_links,
};

#[tokio::test]
async fn test_offer_finished_after_leave_is_dropped_silently() {
    init_tracing();

    let hub = MockHub::new();
    let fabric = MockFabric::new();
    fabric.hold_offers("A");
    let a = TestPeer::direct(&hub, &fabric, "A", ROOM).await;
    let b = PeerId::from("B");

    hub.inject(
        &a.id,
        SignalMessage::Open {
            room_id: RoomId::from(ROOM),
            data: vec![PeerDescriptor::new("B")],
        },
    );
    assert!(
        wait_for_links(&a.container, WAIT_TIMEOUT_MS, |links| {
            links.len() == 1 && links[0].handshake_state == HandshakeState::Offering
        })
        .await
    );

    hub.inject(
        &a.id,
        SignalMessage::Close {
            room_id: RoomId::from(ROOM),
            data: PeerDescriptor::new("B"),
        },
    );
    assert!(wait_for(WAIT_TIMEOUT_MS, || a.recorder.leaves() == vec![b.clone()]).await);
    let engine = fabric.engine(&a.id, &b).unwrap();
    assert!(wait_for(WAIT_TIMEOUT_MS, || engine.is_closed()).await);

    // Removing the peer abandons its handshake, so the offer never completes
    fabric.release_offers();
    settle().await;

    assert!(a.recorder.errors().is_empty());
    assert_eq!(hub.count(Topic::Offer, &a.id, &b), 0);
    assert_eq!(hub.count(Topic::Candidate, &a.id, &b), 0);
    assert!(a.container.links().await.is_empty());
}
