// Per-backend progress accounting for the dispatch phase.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::translate::BackendKind;

/// Snapshot delivered to the progress callback after each completed
/// paragraph.
#[derive(Debug, Clone, Copy)]
pub struct ProgressUpdate {
    pub backend: BackendKind,
    pub completed: usize,
    pub total: usize,
}

impl ProgressUpdate {
    /// Completed fraction; defined as 1.0 when there is nothing to do.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Shared observer invoked once per completed paragraph per backend.
pub type ProgressFn = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Callback that ignores updates, for callers that render nothing.
pub fn noop_progress() -> ProgressFn {
    Arc::new(|_| {})
}

/// Monotonic per-backend counter. Each completed paragraph increments it
/// exactly once, so the count never exceeds the paragraph total.
#[derive(Debug)]
pub struct ProgressCounter {
    backend: BackendKind,
    total: usize,
    completed: AtomicUsize,
}

impl ProgressCounter {
    pub fn new(backend: BackendKind, total: usize) -> Self {
        Self {
            backend,
            total,
            completed: AtomicUsize::new(0),
        }
    }

    /// Record one completed paragraph and return the resulting snapshot.
    pub fn complete_one(&self) -> ProgressUpdate {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        ProgressUpdate {
            backend: self.backend,
            completed,
            total: self.total,
        }
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_increments_monotonically() {
        let counter = ProgressCounter::new(BackendKind::Cloud, 3);
        assert_eq!(counter.completed(), 0);

        let first = counter.complete_one();
        assert_eq!(first.completed, 1);
        assert_eq!(first.total, 3);

        counter.complete_one();
        let third = counter.complete_one();
        assert_eq!(third.completed, 3);
        assert_eq!(counter.completed(), 3);
    }

    #[test]
    fn test_fraction_is_defined_for_empty_documents() {
        let update = ProgressUpdate {
            backend: BackendKind::Llm,
            completed: 0,
            total: 0,
        };
        assert_eq!(update.fraction(), 1.0);
    }

    #[test]
    fn test_fraction_of_partial_progress() {
        let update = ProgressUpdate {
            backend: BackendKind::LocalModel,
            completed: 1,
            total: 4,
        };
        assert_eq!(update.fraction(), 0.25);
    }
}
