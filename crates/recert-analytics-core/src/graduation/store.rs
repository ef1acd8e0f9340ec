//! Shared graduation-state store.
//!
//! The only cross-run mutable state in the engine. Writes to a category
//! are serialized through a per-category mutex; readers take cloned
//! snapshots and never block writers of other categories.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::graduation::phase::Phase;
use crate::types::CategoryId;

use super::state::CategoryGraduationState;

#[derive(Debug)]
pub struct GraduationStore {
    inner: RwLock<HashMap<CategoryId, Arc<Mutex<CategoryGraduationState>>>>,
    metrics_window: usize,
}

impl Default for GraduationStore {
    fn default() -> Self {
        Self::new(crate::config::GraduationConfig::default().metrics_window_campaigns)
    }
}

impl GraduationStore {
    pub fn new(metrics_window: usize) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            metrics_window,
        }
    }

    /// Snapshot of one category's state, if it has ever been touched.
    pub fn snapshot(&self, category: &CategoryId) -> Option<CategoryGraduationState> {
        let cell = self.inner.read().get(category).cloned()?;
        let state = cell.lock().clone();
        Some(state)
    }

    /// Current phase; untouched categories are in Observation.
    pub fn phase_of(&self, category: &CategoryId) -> Phase {
        self.snapshot(category).map(|s| s.phase).unwrap_or_default()
    }

    /// Sorted snapshot of every category, for status surfaces and output.
    pub fn snapshot_all(&self) -> BTreeMap<CategoryId, CategoryGraduationState> {
        let cells: Vec<(CategoryId, Arc<Mutex<CategoryGraduationState>>)> = self
            .inner
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect();
        cells
            .into_iter()
            .map(|(category, cell)| {
                let state = cell.lock().clone();
                (category, state)
            })
            .collect()
    }

    /// Run `f` under the category's write lock, creating the state on
    /// first touch. Lost updates are impossible: concurrent campaigns on
    /// the same category serialize here.
    pub fn with_state<R>(
        &self,
        category: &CategoryId,
        f: impl FnOnce(&mut CategoryGraduationState) -> R,
    ) -> R {
        let cell = {
            let mut map = self.inner.write();
            Arc::clone(map.entry(category.clone()).or_insert_with(|| {
                Arc::new(Mutex::new(CategoryGraduationState::new(
                    category.clone(),
                    self.metrics_window,
                )))
            }))
        };
        let mut state = cell.lock();
        f(&mut state)
    }
}
