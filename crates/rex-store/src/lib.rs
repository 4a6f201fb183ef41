mod adapter;
mod bbs;
mod error;
mod memory;
mod node;

pub use adapter::{StoreAdapter, WatchSubscription};
pub use bbs::{DesiredWatch, ExecutorBbs, RUN_ONCE_ROOT};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use node::{EventType, StoreNode, WatchEvent};
