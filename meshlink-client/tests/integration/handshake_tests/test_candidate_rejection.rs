use meshlink_client::ChannelState;

use crate::integration::ROOM;
use crate::utils::{
    MockFabric, MockHub, TestPeer, WAIT_TIMEOUT_MS, init_tracing, settle, wait_for, wait_for_open,
};

#[tokio::test]
async fn test_rejected_candidate_keeps_link() {
    init_tracing();

    let hub = MockHub::new();
    let fabric = MockFabric::new();
    fabric.reject_candidates("B");
    let a = TestPeer::direct(&hub, &fabric, "A", ROOM).await;
    let b = TestPeer::direct(&hub, &fabric, "B", ROOM).await;

    assert!(wait_for_open(&a.container, &b.id).await);
    assert!(wait_for_open(&b.container, &a.id).await);
    settle().await;

    let links = b.container.links().await;
    assert_eq!(links[0].channel_state, ChannelState::Open);
    assert!(b.recorder.errors().is_empty());

    a.container.broadcast("still here");
    assert!(wait_for(WAIT_TIMEOUT_MS, || b.recorder.texts() == vec!["still here"]).await);
}
