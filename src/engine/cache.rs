// src/engine/cache.rs

use std::collections::BTreeMap;
use std::sync::Mutex;

use tracing::debug;

use crate::types::UnitName;

/// Captured stdout of successful units, scoped to one run.
///
/// Shared between workers through an `Arc`. Units that did not succeed
/// (including excluded ones) never get an entry.
#[derive(Debug, Default)]
pub struct OutputCache {
    outputs: Mutex<BTreeMap<UnitName, String>>,
}

impl OutputCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, unit: &str) -> Option<String> {
        self.lock().get(unit).cloned()
    }

    pub fn insert(&self, unit: &str, output: String) {
        debug!(unit = %unit, bytes = output.len(), "caching unit output");
        self.lock().insert(unit.to_string(), output);
    }

    pub fn contains(&self, unit: &str) -> bool {
        self.lock().contains_key(unit)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<UnitName, String>> {
        // A poisoned map is still a valid map; keep serving it.
        self.outputs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

