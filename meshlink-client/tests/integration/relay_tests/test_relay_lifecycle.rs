use meshlink_core::{PeerDescriptor, RoomId, SignalMessage};

use crate::integration::ROOM;
use crate::utils::{MockHub, TestPeer, WAIT_TIMEOUT_MS, init_tracing, settle, wait_for};

fn close_of(id: &str) -> SignalMessage {
    SignalMessage::Close {
        room_id: RoomId::from(ROOM),
        data: PeerDescriptor::new(id),
    }
}

#[tokio::test]
async fn test_relay_join_and_single_leave() {
    init_tracing();

    let hub = MockHub::new();
    let a = TestPeer::relay(&hub, "A", ROOM).await;
    let b = TestPeer::relay(&hub, "B", ROOM).await;

    assert!(wait_for(WAIT_TIMEOUT_MS, || a.recorder.joins() == vec![vec![b.id.clone()]]).await);

    b.container.close();
    assert!(wait_for(WAIT_TIMEOUT_MS, || a.recorder.leaves() == vec![b.id.clone()]).await);

    hub.inject(&a.id, close_of("B"));
    settle().await;
    assert_eq!(a.recorder.leaves(), vec![b.id.clone()]);
}

#[tokio::test]
async fn test_relay_peer_can_leave_again_after_rejoining() {
    init_tracing();

    let hub = MockHub::new();
    let a = TestPeer::relay(&hub, "A", ROOM).await;

    hub.inject(&a.id, close_of("B"));
    hub.inject(
        &a.id,
        SignalMessage::Open {
            room_id: RoomId::from(ROOM),
            data: vec![PeerDescriptor::new("B")],
        },
    );
    hub.inject(&a.id, close_of("B"));
    hub.inject(&a.id, close_of("B"));

    assert!(wait_for(WAIT_TIMEOUT_MS, || a.recorder.leaves().len() == 2).await);
    settle().await;
    assert_eq!(a.recorder.leaves().len(), 2);
}
