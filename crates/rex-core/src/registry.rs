use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use rex_model::{Limits, RunOnce};

use crate::{action::ActionResult, error::ActionError};

/// Node-local resource bookkeeping for admitted run-onces.
///
/// The admission read and the reservation write share one critical section,
/// so the sum of live reservations can never exceed capacity. State is in
/// memory only and resets with the process.
pub struct TaskRegistry {
    capacity: Limits,
    reservations: Mutex<HashMap<String, Limits>>,
}

impl TaskRegistry {
    pub fn new(capacity: Limits) -> Self {
        Self {
            capacity,
            reservations: Mutex::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> Limits {
        self.capacity
    }

    /// Sum of live reservations.
    pub fn reserved(&self) -> Limits {
        let table = self.reservations.lock();
        table
            .values()
            .fold(Limits::default(), |acc, limits| acc.plus(limits))
    }

    /// Reserve the task's memory and disk, all or nothing.
    pub fn add_run_once(&self, run_once: &RunOnce) -> ActionResult {
        let requested = run_once.limits();
        let mut table = self.reservations.lock();

        let in_use = table
            .values()
            .fold(Limits::default(), |acc, limits| acc.plus(limits));
        if !in_use.plus(&requested).fits_within(&self.capacity) {
            debug!(
                guid = %run_once.guid,
                requested_memory_mb = requested.memory_mb,
                requested_disk_mb = requested.disk_mb,
                "refusing task over capacity"
            );
            return Err(ActionError::InsufficientResources {
                guid: run_once.guid.clone(),
            });
        }

        table.insert(run_once.guid.clone(), requested);
        Ok(())
    }

    /// Release a guid's reservation. Releasing an unknown guid is a no-op.
    pub fn remove_run_once(&self, guid: &str) {
        self.reservations.lock().remove(guid);
    }
}
