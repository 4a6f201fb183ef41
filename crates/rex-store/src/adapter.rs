use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    error::StoreResult,
    node::{StoreNode, WatchEvent},
};

/// The shared bookkeeping store, as the executor consumes it.
///
/// All state transitions the executor performs go through
/// [`StoreAdapter::compare_and_swap`]; racing writers are reconciled by the
/// loser observing [`crate::StoreError::CompareFailed`].
#[async_trait]
pub trait StoreAdapter: Send + Sync {
    /// Fetch the leaf at `key`.
    async fn get(&self, key: &str) -> StoreResult<StoreNode>;

    /// Write every node, creating or overwriting leaves. All nodes are
    /// validated against the directory rules before any write happens.
    async fn set_multi(&self, nodes: Vec<StoreNode>) -> StoreResult<()>;

    /// Write a node that must not exist yet.
    async fn create(&self, node: StoreNode) -> StoreResult<()>;

    /// Replace `old` with `new` only if the stored value still equals
    /// `old.value`.
    async fn compare_and_swap(&self, old: StoreNode, new: StoreNode) -> StoreResult<()>;

    /// Delete leaves, or whole subtrees for directory keys.
    async fn delete(&self, keys: &[&str]) -> StoreResult<()>;

    /// All leaves under the directory `key`, sorted by key.
    async fn list_recursively(&self, key: &str) -> StoreResult<Vec<StoreNode>>;

    /// Stream changes under `key` until the subscription is stopped.
    async fn watch(&self, key: &str) -> StoreResult<WatchSubscription>;
}

/// A live watch over a store subtree.
pub struct WatchSubscription {
    events: mpsc::Receiver<WatchEvent>,
    stop: CancellationToken,
}

impl WatchSubscription {
    pub fn new(events: mpsc::Receiver<WatchEvent>, stop: CancellationToken) -> Self {
        Self { events, stop }
    }

    /// Next event, or `None` once the watch has ended.
    pub async fn next(&mut self) -> Option<WatchEvent> {
        self.events.recv().await
    }

    /// End the watch. Events already queued may still be drained.
    pub fn stop(&self) {
        self.stop.cancel();
    }
}

impl Drop for WatchSubscription {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}
