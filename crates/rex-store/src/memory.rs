use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::{
    adapter::{StoreAdapter, WatchSubscription},
    error::{StoreError, StoreResult},
    node::{EventType, StoreNode, WatchEvent},
};

const EVENT_BUFFER: usize = 256;

/// In-process store adapter with the same directory rules as the real one.
///
/// Keys are absolute `/`-separated paths. A key becomes a directory the
/// moment a leaf exists beneath it; writing a value over a directory, or
/// routing a key through an existing leaf, is refused. Watches observe every
/// mutation under their subtree in mutation order.
///
/// State lives in process memory; this is both the single-node deployment
/// story and the fake the tests inject.
pub struct InMemoryStore {
    nodes: Mutex<BTreeMap<String, Vec<u8>>>,
    events: broadcast::Sender<WatchEvent>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            nodes: Mutex::new(BTreeMap::new()),
            events,
        }
    }

    fn normalize(key: &str) -> String {
        let trimmed = key.trim_end_matches('/');
        if trimmed.is_empty() {
            return "/".to_string();
        }
        if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        }
    }

    fn is_directory(nodes: &BTreeMap<String, Vec<u8>>, key: &str) -> bool {
        if key == "/" {
            return true;
        }
        let prefix = format!("{key}/");
        nodes.range(prefix.clone()..).next().is_some_and(|(k, _)| k.starts_with(&prefix))
    }

    /// Refuse writes that would place a value on a directory or route a key
    /// through an existing leaf.
    fn check_writable(nodes: &BTreeMap<String, Vec<u8>>, key: &str) -> StoreResult<()> {
        if nodes.contains_key(key) {
            return Ok(());
        }
        if Self::is_directory(nodes, key) {
            return Err(StoreError::NodeIsDirectory);
        }
        for ancestor in ancestors(key) {
            if nodes.contains_key(ancestor) {
                return Err(StoreError::NodeIsNotDirectory);
            }
        }
        Ok(())
    }

    fn emit(&self, event_type: EventType, node: StoreNode) {
        // Nobody watching is fine; send only fails without receivers.
        let _ = self.events.send(WatchEvent::new(event_type, node));
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Proper ancestors of `/a/b/c`: `/a`, `/a/b`.
fn ancestors(key: &str) -> impl Iterator<Item = &str> {
    key.char_indices()
        .skip(1)
        .filter(|(_, c)| *c == '/')
        .map(|(i, _)| &key[..i])
}

fn in_subtree(watched: &str, key: &str) -> bool {
    watched == "/" || key == watched || key.starts_with(&format!("{watched}/"))
}

#[async_trait]
impl StoreAdapter for InMemoryStore {
    async fn get(&self, key: &str) -> StoreResult<StoreNode> {
        let key = Self::normalize(key);
        let nodes = self.nodes.lock();
        match nodes.get(&key) {
            Some(value) => Ok(StoreNode::new(key, value.clone())),
            None if Self::is_directory(&nodes, &key) => Err(StoreError::NodeIsDirectory),
            None => Err(StoreError::KeyNotFound),
        }
    }

    async fn set_multi(&self, to_set: Vec<StoreNode>) -> StoreResult<()> {
        let mut nodes = self.nodes.lock();
        for node in &to_set {
            Self::check_writable(&nodes, &Self::normalize(&node.key))?;
        }
        for node in to_set {
            let key = Self::normalize(&node.key);
            let event_type = if nodes.contains_key(&key) {
                EventType::Update
            } else {
                EventType::Create
            };
            nodes.insert(key.clone(), node.value.clone());
            self.emit(event_type, StoreNode::new(key, node.value));
        }
        Ok(())
    }

    async fn create(&self, node: StoreNode) -> StoreResult<()> {
        let key = Self::normalize(&node.key);
        let mut nodes = self.nodes.lock();
        if nodes.contains_key(&key) || Self::is_directory(&nodes, &key) {
            return Err(StoreError::KeyExists);
        }
        Self::check_writable(&nodes, &key)?;
        nodes.insert(key.clone(), node.value.clone());
        self.emit(EventType::Create, StoreNode::new(key, node.value));
        Ok(())
    }

    async fn compare_and_swap(&self, old: StoreNode, new: StoreNode) -> StoreResult<()> {
        let key = Self::normalize(&old.key);
        let mut nodes = self.nodes.lock();
        let current = match nodes.get(&key) {
            Some(value) => value,
            None if Self::is_directory(&nodes, &key) => return Err(StoreError::NodeIsDirectory),
            None => return Err(StoreError::KeyNotFound),
        };
        if *current != old.value {
            return Err(StoreError::CompareFailed);
        }
        let new_key = Self::normalize(&new.key);
        nodes.insert(new_key.clone(), new.value.clone());
        self.emit(EventType::Update, StoreNode::new(new_key, new.value));
        Ok(())
    }

    async fn delete(&self, keys: &[&str]) -> StoreResult<()> {
        let mut nodes = self.nodes.lock();

        let mut doomed: Vec<String> = Vec::new();
        for key in keys {
            let key = Self::normalize(key);
            if nodes.contains_key(&key) {
                doomed.push(key);
            } else if Self::is_directory(&nodes, &key) {
                let prefix = format!("{key}/");
                doomed.extend(
                    nodes
                        .range(prefix.clone()..)
                        .take_while(|(k, _)| k.starts_with(&prefix))
                        .map(|(k, _)| k.clone()),
                );
            } else {
                return Err(StoreError::KeyNotFound);
            }
        }

        for key in doomed {
            if let Some(value) = nodes.remove(&key) {
                self.emit(EventType::Delete, StoreNode::new(key, value));
            }
        }
        Ok(())
    }

    async fn list_recursively(&self, key: &str) -> StoreResult<Vec<StoreNode>> {
        let key = Self::normalize(key);
        let nodes = self.nodes.lock();
        if nodes.contains_key(&key) {
            return Err(StoreError::NodeIsNotDirectory);
        }
        if key != "/" && !Self::is_directory(&nodes, &key) {
            return Err(StoreError::KeyNotFound);
        }
        let prefix = if key == "/" {
            "/".to_string()
        } else {
            format!("{key}/")
        };
        Ok(nodes
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .map(|(k, v)| StoreNode::new(k.clone(), v.clone()))
            .collect())
    }

    async fn watch(&self, key: &str) -> StoreResult<WatchSubscription> {
        let watched = Self::normalize(key);
        let mut feed = self.events.subscribe();
        let stop = CancellationToken::new();
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);

        let forwarder_stop = stop.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = forwarder_stop.cancelled() => break,
                    received = feed.recv() => match received {
                        Ok(event) if in_subtree(&watched, &event.node.key) => {
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            trace!(missed, watched = %watched, "watch fell behind, skipping");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        });

        Ok(WatchSubscription::new(rx, stop))
    }
}
