//! In-memory memo of evaluation reports, keyed by snapshot fingerprint.
//!
//! Nothing is persisted: the memo lives as long as the process and only
//! saves work when the same snapshot is evaluated more than once (repeated
//! batch entries, a dashboard polling an unchanged account).

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use propdesk_core::EvaluationReport;

use crate::fingerprint::SnapshotFingerprint;

/// Thread-safe report memo. Shared by reference across rayon workers.
#[derive(Debug, Default)]
pub struct EvaluationMemo {
    entries: Mutex<HashMap<SnapshotFingerprint, Arc<EvaluationReport>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl EvaluationMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &SnapshotFingerprint) -> Option<Arc<EvaluationReport>> {
        let found = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub fn insert(&self, key: SnapshotFingerprint, report: Arc<EvaluationReport>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, report);
    }

    /// Return the memoized report, or compute and remember it.
    ///
    /// The lock is not held while `compute` runs, so two workers racing on
    /// the same key may both compute; the results are identical.
    pub fn get_or_try_insert<E>(
        &self,
        key: &SnapshotFingerprint,
        compute: impl FnOnce() -> Result<EvaluationReport, E>,
    ) -> Result<(Arc<EvaluationReport>, bool), E> {
        if let Some(hit) = self.get(key) {
            return Ok((hit, true));
        }
        let report = Arc::new(compute()?);
        self.insert(key.clone(), Arc::clone(&report));
        Ok((report, false))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
