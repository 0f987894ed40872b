//! End-to-end flows through the registry, hubs, and the in-memory gateway.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use roomcast::common::time::SystemClock;
use roomcast::domain::OutboundFrame;
use roomcast::gateway::{InMemoryMessageStore, MessageStore, spawn_append_worker};
use roomcast::hub::{HubRegistry, SessionHandle};

fn wiring() -> (Arc<HubRegistry>, Arc<InMemoryMessageStore>) {
    let store = Arc::new(InMemoryMessageStore::new());
    let (appends, _worker) = spawn_append_worker(store.clone());
    (HubRegistry::new(appends, Arc::new(SystemClock)), store)
}

async fn recv_frame(rx: &mut mpsc::Receiver<String>) -> OutboundFrame {
    let raw = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for frame")
        .expect("outbound channel closed");
    serde_json::from_str(&raw).expect("broadcast frames are valid JSON")
}

/// Poll until the store holds `count` messages for the room.
async fn wait_for_appends(store: &InMemoryMessageStore, room: &str, count: usize) {
    for _ in 0..200 {
        if store.recent(room, usize::MAX).await.unwrap().len() == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("store never reached {count} message(s) for room '{room}'");
}

#[tokio::test]
async fn message_reaches_every_member_and_is_persisted_once() {
    // given: alice, bob, and carol in room "general"
    let (registry, store) = wiring();
    let (alice, mut alice_rx) = SessionHandle::new("alice".to_string(), 8);
    let (bob, mut bob_rx) = SessionHandle::new("bob".to_string(), 8);
    let (carol, mut carol_rx) = SessionHandle::new("carol".to_string(), 8);
    let hub = registry.join("general", alice).await.unwrap();
    registry.join("general", bob).await.unwrap();
    registry.join("general", carol).await.unwrap();

    // when: alice sends "hi"
    hub.publish("alice", "hi");

    // then: bob, carol, and alice (echo) each receive it exactly once
    for rx in [&mut alice_rx, &mut bob_rx, &mut carol_rx] {
        let frame = recv_frame(rx).await;
        assert_eq!(frame.room, "general");
        assert_eq!(frame.sender, "alice");
        assert_eq!(frame.body, "hi");
        assert!(!frame.timestamp.is_empty());
    }

    // and: the store received exactly one append with the same content
    wait_for_appends(&store, "general", 1).await;
    let stored = store.recent("general", 10).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].sender, "alice");
    assert_eq!(stored[0].body, "hi");
}

#[tokio::test]
async fn stalled_member_is_disconnected_and_later_joiners_are_served() {
    // given: dave alone in "general" with a capacity-1 buffer and no reader
    let (registry, _store) = wiring();
    let (dave, mut dave_rx) = SessionHandle::new("dave".to_string(), 1);
    let hub = registry.join("general", dave).await.unwrap();

    // when: two rapid publishes overflow dave's buffer
    hub.publish("dave", "one");
    hub.publish("dave", "two");

    // then: dave's session is closed after the buffered frame
    let first = recv_frame(&mut dave_rx).await;
    assert_eq!(first.body, "one");
    let closed = tokio::time::timeout(Duration::from_secs(1), dave_rx.recv())
        .await
        .expect("expected the channel to close, not hang");
    assert!(closed.is_none());

    // and: erin joining afterwards receives subsequent messages normally
    let (erin, mut erin_rx) = SessionHandle::new("erin".to_string(), 8);
    let hub = registry.join("general", erin).await.unwrap();
    hub.publish("erin", "fresh start");
    assert_eq!(recv_frame(&mut erin_rx).await.body, "fresh start");
}

#[tokio::test]
async fn room_retires_when_last_member_leaves_and_rejoin_is_fresh() {
    // given: a single member in room "temp"
    let (registry, _store) = wiring();
    let (alice, _alice_rx) = SessionHandle::new("alice".to_string(), 8);
    let alice_id = alice.id;
    let hub = registry.join("temp", alice).await.unwrap();
    assert_eq!(registry.live_hub_count().await, 1);

    // when: the last member disconnects
    hub.unregister(alice_id);
    for _ in 0..200 {
        if registry.live_hub_count().await == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(registry.live_hub_count().await, 0);

    // then: a subsequent join succeeds with a fresh, empty member set
    let (bob, mut bob_rx) = SessionHandle::new("bob".to_string(), 8);
    let hub = registry.join("temp", bob).await.unwrap();
    hub.publish("bob", "anyone here?");
    let frame = recv_frame(&mut bob_rx).await;
    assert_eq!(frame.body, "anyone here?");
    // Only bob receives it; no stale members survive retirement.
    assert_eq!(registry.live_hub_count().await, 1);
}

#[tokio::test]
async fn rooms_are_isolated_from_each_other() {
    // given: alice in "general" and bob in "random"
    let (registry, store) = wiring();
    let (alice, mut alice_rx) = SessionHandle::new("alice".to_string(), 8);
    let (bob, mut bob_rx) = SessionHandle::new("bob".to_string(), 8);
    let general = registry.join("general", alice).await.unwrap();
    registry.join("random", bob).await.unwrap();

    // when: a message is published in "general"
    general.publish("alice", "general only");

    // then: alice receives it and bob observes nothing
    assert_eq!(recv_frame(&mut alice_rx).await.body, "general only");
    let bob_got = tokio::time::timeout(Duration::from_millis(100), bob_rx.recv()).await;
    assert!(bob_got.is_err());

    // and: the store recorded it under "general" only
    wait_for_appends(&store, "general", 1).await;
    assert!(store.recent("random", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn history_is_ordered_and_newest_bounded() {
    // given: five messages accepted in order
    let (registry, store) = wiring();
    let (alice, mut alice_rx) = SessionHandle::new("alice".to_string(), 32);
    let hub = registry.join("general", alice).await.unwrap();
    for i in 1..=5 {
        hub.publish("alice", format!("msg {i}"));
    }
    for _ in 1..=5 {
        recv_frame(&mut alice_rx).await;
    }
    wait_for_appends(&store, "general", 5).await;

    // when: the three most recent are requested
    let recent = store.recent("general", 3).await.unwrap();

    // then: newest-bounded, oldest first, persistence order == publish order
    let bodies: Vec<&str> = recent.iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, vec!["msg 3", "msg 4", "msg 5"]);
}
