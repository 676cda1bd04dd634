//! Where a running session exposes its growing result set.

use std::sync::Arc;
use tokio::sync::watch;

use crate::models::Snapshot;

pub trait PublishSink: Send + Sync {
    /// Makes `snapshot` the latest visible result set. Must not wait on
    /// readers.
    fn publish(&self, snapshot: Snapshot);
}

/// Single-slot register holding the most recent snapshot. Readers always
/// see the newest value; a slow reader never sees a backlog.
#[derive(Debug, Clone)]
pub struct LatestSnapshot {
    tx: Arc<watch::Sender<Snapshot>>,
}

impl LatestSnapshot {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Snapshot::empty());
        Self { tx: Arc::new(tx) }
    }

    pub fn read_latest(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    /// Receiver that is woken on every publish.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }
}

impl Default for LatestSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl PublishSink for LatestSnapshot {
    fn publish(&self, snapshot: Snapshot) {
        tracing::trace!(items = snapshot.len(), "Publishing snapshot");
        self.tx.send_replace(snapshot);
    }
}
