use std::sync::Arc;

use parking_lot::Mutex;

use rex_model::RunOnce;

/// The run-once record shared by the pipeline stages of one task.
///
/// Stages run strictly one at a time, so the lock is never contended; it
/// exists so each stage can write the single field it owns without threading
/// `&mut` through the action list.
#[derive(Clone)]
pub struct SharedRunOnce(Arc<Mutex<RunOnce>>);

impl SharedRunOnce {
    pub fn new(run_once: RunOnce) -> Self {
        Self(Arc::new(Mutex::new(run_once)))
    }

    pub fn guid(&self) -> String {
        self.0.lock().guid.clone()
    }

    pub fn snapshot(&self) -> RunOnce {
        self.0.lock().clone()
    }

    pub fn update<R>(&self, mutate: impl FnOnce(&mut RunOnce) -> R) -> R {
        mutate(&mut self.0.lock())
    }
}
