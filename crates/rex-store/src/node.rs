/// A leaf in the shared store's key tree.
///
/// Keys are `/`-separated absolute paths; a key is a directory exactly when
/// other keys live beneath it, so a node can never be both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreNode {
    pub key: String,
    pub value: Vec<u8>,
}

impl StoreNode {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Create,
    Update,
    Delete,
    Expire,
}

/// One change observed by a watch. Ordering is FIFO within a single watch
/// for all keys under the watched subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub event_type: EventType,
    pub node: StoreNode,
}

impl WatchEvent {
    pub fn new(event_type: EventType, node: StoreNode) -> Self {
        Self { event_type, node }
    }
}
