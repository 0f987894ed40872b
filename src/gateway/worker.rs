//! Sequential append worker.
//!
//! Room hubs must never await storage on their hot path, but the per-room
//! broadcast order has to match the persistence order. Both are satisfied by
//! funnelling every accepted message through one ordered channel drained by
//! a single worker task that awaits each append in turn.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::StoredMessage;

use super::MessageStore;

/// Sending side of the append channel, cloned into every room hub.
pub type AppendSender = mpsc::UnboundedSender<StoredMessage>;

/// Handle to the running worker task; awaited during shutdown to let
/// in-flight appends drain.
pub type AppendWorker = JoinHandle<()>;

/// Spawn the append worker for the given store.
///
/// The worker runs until every [`AppendSender`] clone has been dropped and
/// the channel is drained. Append failures are logged and skipped; retry
/// policy, if any, belongs to the store implementation.
pub fn spawn_append_worker(store: Arc<dyn MessageStore>) -> (AppendSender, AppendWorker) {
    let (tx, mut rx) = mpsc::unbounded_channel::<StoredMessage>();

    let worker = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let room = message.room.clone();
            if let Err(e) = store.append(message).await {
                tracing::error!("failed to persist message for room '{}': {}", room, e);
            }
        }
        tracing::debug!("append worker drained, exiting");
    });

    (tx, worker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StoreError;
    use crate::gateway::{InMemoryMessageStore, MockMessageStore};

    fn message(room: &str, body: &str) -> StoredMessage {
        StoredMessage::new(room.to_string(), "alice".to_string(), body.to_string(), 1000)
    }

    #[tokio::test]
    async fn test_appends_preserve_send_order() {
        // given:
        let store = Arc::new(InMemoryMessageStore::new());
        let (tx, worker) = spawn_append_worker(store.clone());

        // when: three messages are queued, then the channel is closed
        tx.send(message("general", "one")).unwrap();
        tx.send(message("general", "two")).unwrap();
        tx.send(message("general", "three")).unwrap();
        drop(tx);
        worker.await.unwrap();

        // then: the store saw them in send order
        let recent = store.recent("general", 10).await.unwrap();
        let bodies: Vec<&str> = recent.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_append_failure_does_not_stop_worker() {
        // given: a store that fails the first append and accepts the second
        let mut store = MockMessageStore::new();
        let mut calls = 0;
        store.expect_append().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(StoreError::Unavailable("down".to_string()))
            } else {
                Ok(())
            }
        });
        let (tx, worker) = spawn_append_worker(Arc::new(store));

        // when:
        tx.send(message("general", "lost")).unwrap();
        tx.send(message("general", "kept")).unwrap();
        drop(tx);

        // then: the worker drains both and exits cleanly
        worker.await.unwrap();
    }
}
