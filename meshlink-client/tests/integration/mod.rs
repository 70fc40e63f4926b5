pub mod lifecycle_tests;
pub mod messaging_tests;

use crate::utils::{MockFabric, MockHub, TestPeer, init_tracing, wait_for_open};

pub const ROOM: &str = "r1";

/// Two direct-mode peers in [`ROOM`], A registered first, with an open link
/// between them.
pub async fn linked_pair() -> (MockHub, MockFabric, TestPeer, TestPeer) {
    init_tracing();

    let hub = MockHub::new();
    let fabric = MockFabric::new();

    let a = TestPeer::direct(&hub, &fabric, "A", ROOM).await;
    let b = TestPeer::direct(&hub, &fabric, "B", ROOM).await;

    assert!(wait_for_open(&a.container, &b.id).await, "A -> B did not open");
    assert!(wait_for_open(&b.container, &a.id).await, "B -> A did not open");

    (hub, fabric, a, b)
}
