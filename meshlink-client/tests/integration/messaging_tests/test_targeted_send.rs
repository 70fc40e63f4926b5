use meshlink_core::{Payload, PeerId};

use crate::integration::linked_pair;
use crate::utils::{WAIT_TIMEOUT_MS, settle, wait_for};

#[tokio::test]
async fn test_send_skips_unlinked_targets() {
    let (_hub, fabric, a, b) = linked_pair().await;

    let receipt = a
        .container
        .send(&[PeerId::from("B"), PeerId::from("C")], "x");

    assert_eq!(receipt.sender, PeerId::from("A"));
    assert_eq!(receipt.receiver, "B,C");
    assert_eq!(receipt.message, Payload::from("x"));

    assert!(wait_for(WAIT_TIMEOUT_MS, || b.recorder.texts() == vec!["x"]).await);
    assert!(fabric.engine(&a.id, &PeerId::from("C")).is_none());
    assert!(a.recorder.errors().is_empty());
}

#[tokio::test]
async fn test_duplicate_targets_send_once() {
    let (_hub, fabric, a, b) = linked_pair().await;

    a.container.send(&[b.id.clone(), b.id.clone()], "once");

    assert!(wait_for(WAIT_TIMEOUT_MS, || !b.recorder.messages().is_empty()).await);
    settle().await;

    assert_eq!(b.recorder.texts(), vec!["once"]);
    assert_eq!(fabric.engine(&a.id, &b.id).unwrap().sent().len(), 1);
}

#[tokio::test]
async fn test_inbound_reaches_every_subscriber_once() {
    let (_hub, _fabric, a, b) = linked_pair().await;

    let second = crate::utils::Recorder::attach(&b.container);
    a.container.broadcast("fan-out");

    assert!(wait_for(WAIT_TIMEOUT_MS, || second.texts() == vec!["fan-out"]).await);
    settle().await;
    assert_eq!(b.recorder.texts(), vec!["fan-out"]);
}
