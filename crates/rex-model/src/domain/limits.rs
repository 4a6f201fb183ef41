use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

/// Memory and disk requirements in megabytes.
///
/// Used both for a task's reservation and for a node's total capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct Limits {
    #[serde(rename = "memoryMB")]
    pub memory_mb: u64,
    #[serde(rename = "diskMB")]
    pub disk_mb: u64,
}

impl Limits {
    pub fn new(memory_mb: u64, disk_mb: u64) -> Self {
        Self { memory_mb, disk_mb }
    }

    pub fn plus(&self, other: &Limits) -> Limits {
        Limits {
            memory_mb: self.memory_mb.saturating_add(other.memory_mb),
            disk_mb: self.disk_mb.saturating_add(other.disk_mb),
        }
    }

    /// True when both dimensions fit inside `capacity`.
    pub fn fits_within(&self, capacity: &Limits) -> bool {
        self.memory_mb <= capacity.memory_mb && self.disk_mb <= capacity.disk_mb
    }
}
