//! Cancellable push streams of query snapshots.

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use super::{Document, DocumentStore, Query, StoreResult};

pub type Snapshot = Vec<Document>;

/// Handle to a live query. Dropping it stops delivery; pending writes issued
/// elsewhere are unaffected.
pub struct Subscription {
    rx: mpsc::Receiver<StoreResult<Snapshot>>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Re-runs `query` every time `changes` reports a write to its
    /// collection. `changes` must be subscribed before the call so no write
    /// between the initial snapshot and the first wait is lost.
    pub(crate) fn spawn<S>(store: S, query: Query, mut changes: broadcast::Receiver<String>) -> Self
    where
        S: DocumentStore + 'static,
    {
        let (tx, rx) = mpsc::channel(16);
        let task = tokio::spawn(async move {
            let mut last: Option<Snapshot> = None;
            loop {
                let snapshot = store.query(&query).await;
                let unchanged = matches!((&snapshot, &last), (Ok(s), Some(l)) if s == l);
                if !unchanged {
                    if let Ok(s) = &snapshot {
                        last = Some(s.clone());
                    }
                    if tx.send(snapshot).await.is_err() {
                        return;
                    }
                }
                loop {
                    match changes.recv().await {
                        Ok(collection) if collection == query.collection => break,
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, collection = %query.collection, "subscription lagged, resnapshotting");
                            break;
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    }
                }
            }
        });
        Self { rx, task }
    }

    /// Next snapshot, or `None` once the store has shut down.
    pub async fn next(&mut self) -> Option<StoreResult<Snapshot>> {
        self.rx.recv().await
    }

    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
