use meshlink_core::{PeerDescriptor, RoomId, SignalMessage};

use crate::integration::{ROOM, linked_pair};
use crate::utils::{WAIT_TIMEOUT_MS, settle, wait_for};

fn close_of(id: &str) -> SignalMessage {
    SignalMessage::Close {
        room_id: RoomId::from(ROOM),
        data: PeerDescriptor::new(id),
    }
}

#[tokio::test]
async fn test_two_closes_one_leave() {
    let (hub, fabric, a, b) = linked_pair().await;

    hub.inject(&a.id, close_of("B"));
    hub.inject(&a.id, close_of("B"));

    assert!(wait_for(WAIT_TIMEOUT_MS, || !a.recorder.leaves().is_empty()).await);
    settle().await;

    assert_eq!(a.recorder.leaves(), vec![b.id.clone()]);
    assert!(a.recorder.errors().is_empty());
    assert!(a.container.links().await.is_empty());

    let engine = fabric.engine(&a.id, &b.id).unwrap();
    assert!(wait_for(WAIT_TIMEOUT_MS, || engine.is_closed()).await);
    assert_eq!(engine.close_calls(), 1);
}

#[tokio::test]
async fn test_close_for_unknown_peer_is_noop() {
    let (hub, _fabric, a, _b) = linked_pair().await;

    hub.inject(&a.id, close_of("nobody"));
    settle().await;

    assert!(a.recorder.leaves().is_empty());
    assert_eq!(a.container.links().await.len(), 1);
}

#[tokio::test]
async fn test_peer_disconnect_reaches_other_side() {
    let (hub, _fabric, a, b) = linked_pair().await;

    hub.disconnect(&b.id);

    assert!(wait_for(WAIT_TIMEOUT_MS, || a.recorder.leaves() == vec![b.id.clone()]).await);
    assert!(a.container.links().await.is_empty());
}
