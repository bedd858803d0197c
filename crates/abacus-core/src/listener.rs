//! Lifecycle events delivered to the persistence layer

use crate::expression::Expression;
use abacus_types::ExpressionId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Receives expression lifecycle events
///
/// Calls are made from the submitting thread (`on_created`, parse failures,
/// `Queued`) and from worker threads (`Calculating`, terminal states), so
/// implementations must be cheap and must not block for long.
pub trait ExpressionListener: Send + Sync {
    /// A new expression was submitted; returns the identifier assigned to it
    fn on_created(&self, expression: &Expression) -> ExpressionId;

    /// A non-terminal status change (`Queued`, `Calculating`)
    fn on_status_changed(&self, expression: &Expression);

    /// The expression reached `Done` or `Failed`
    fn on_completed(&self, expression: &Expression);
}

/// Assigns sequential ids and discards every event
#[derive(Debug)]
pub struct NullListener {
    next_id: AtomicU64,
}

impl NullListener {
    pub fn new() -> Self {
        Self { next_id: AtomicU64::new(1) }
    }
}

impl Default for NullListener {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionListener for NullListener {
    fn on_created(&self, _expression: &Expression) -> ExpressionId {
        ExpressionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn on_status_changed(&self, _expression: &Expression) {}

    fn on_completed(&self, _expression: &Expression) {}
}
