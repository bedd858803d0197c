//! Resource registry: live occupancy of every worker
//!
//! Each slot is written only by the worker that owns it and read by any
//! number of pollers.

use abacus_types::{ExpressionId, WorkerSnapshot, WorkerState};
use std::sync::{PoisonError, RwLock};

/// Ordered per-worker occupancy
#[derive(Debug)]
pub struct ResourceRegistry {
    slots: Vec<RwLock<WorkerSnapshot>>,
}

impl ResourceRegistry {
    pub fn new(worker_count: usize) -> Self {
        Self { slots: (0..worker_count).map(|id| RwLock::new(WorkerSnapshot::idle(id))).collect() }
    }

    pub fn worker_count(&self) -> usize {
        self.slots.len()
    }

    /// Every worker, ordered by id
    pub fn snapshot(&self) -> Vec<WorkerSnapshot> {
        self.slots
            .iter()
            .map(|slot| slot.read().unwrap_or_else(PoisonError::into_inner).clone())
            .collect()
    }

    pub(crate) fn mark_busy(&self, id: usize, expression: Option<ExpressionId>) {
        self.set(id, WorkerState::Busy, expression);
    }

    pub(crate) fn mark_idle(&self, id: usize) {
        self.set(id, WorkerState::Idle, None);
    }

    fn set(&self, id: usize, state: WorkerState, expression: Option<ExpressionId>) {
        if let Some(slot) = self.slots.get(id) {
            let mut worker = slot.write().unwrap_or_else(PoisonError::into_inner);
            worker.state = state;
            worker.current_expression = expression;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occupancy_transitions() {
        let registry = ResourceRegistry::new(3);
        assert_eq!(registry.worker_count(), 3);
        assert!(registry.snapshot().iter().all(|worker| !worker.is_busy()));

        registry.mark_busy(1, Some(ExpressionId(42)));
        let worker = registry.snapshot()[1].clone();
        assert_eq!(worker.state, WorkerState::Busy);
        assert_eq!(worker.current_expression, Some(ExpressionId(42)));
        assert_eq!(registry.snapshot().iter().filter(|worker| worker.is_busy()).count(), 1);

        registry.mark_idle(1);
        assert_eq!(registry.snapshot()[1], WorkerSnapshot::idle(1));
    }

    #[test]
    fn test_snapshot_is_ordered() {
        let registry = ResourceRegistry::new(4);
        registry.mark_busy(2, None);
        let ids: Vec<usize> = registry.snapshot().iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);

        // out-of-range ids are ignored
        registry.mark_busy(7, None);
        assert_eq!(registry.snapshot().len(), 4);
    }
}
