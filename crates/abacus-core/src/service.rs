//! Calculation service: the submission inlet of the core
//!
//! Parses submitted text, reports lifecycle events to the listener and hands
//! parsed expressions to the worker pool. Parse failures are finalised here
//! and never reach the pool.

use crate::calculator::Plan;
use crate::costs::{CostRegistry, OperationCosts};
use crate::error::CalcResult;
use crate::expression::Expression;
use crate::listener::ExpressionListener;
use crate::pacing::{Pacer, ThreadPacer};
use crate::pool::{Handoff, WorkerPool};
use abacus_types::WorkerSnapshot;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Settings needed to start a [`CalculationService`]
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub workers: usize,
    pub costs: OperationCosts,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { workers: 10, costs: OperationCosts::default() }
    }
}

/// Front door for submitting expressions and configuring costs
pub struct CalculationService {
    costs: Arc<CostRegistry>,
    pool: WorkerPool,
    listener: Arc<dyn ExpressionListener>,
}

impl std::fmt::Debug for CalculationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalculationService")
            .field("costs", &self.costs.snapshot())
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl CalculationService {
    /// Start a service whose workers really sleep for the configured costs
    pub fn start(config: ServiceConfig, listener: Arc<dyn ExpressionListener>) -> CalcResult<Self> {
        Self::with_pacer(config, listener, Arc::new(ThreadPacer))
    }

    /// Start a service with a custom suspension primitive
    pub fn with_pacer(
        config: ServiceConfig,
        listener: Arc<dyn ExpressionListener>,
        pacer: Arc<dyn Pacer>,
    ) -> CalcResult<Self> {
        let costs = Arc::new(CostRegistry::new(config.costs));
        let pool = WorkerPool::start(config.workers, costs.clone(), listener.clone(), pacer)?;
        Ok(Self { costs, pool, listener })
    }

    /// Parse `text` and, when it parses, enqueue it
    ///
    /// Blocks until a worker accepts the expression. Returns the expression
    /// as it stood at handoff: `Queued`, or `Failed` when parsing failed.
    /// After shutdown the expression is failed before it is ever queued.
    #[instrument(skip(self), fields(expression_id))]
    pub fn submit(&self, text: &str) -> CalcResult<Expression> {
        let mut expression = Expression::new(text);
        let id = self.listener.on_created(&expression);
        expression.id = Some(id);
        tracing::Span::current().record("expression_id", id.get());

        let Some(plan) = self.parse_or_fail(&mut expression)? else {
            return Ok(expression);
        };

        let handoff = match self.pool.reserve() {
            Ok(handoff) => handoff,
            Err(e) => {
                warn!(expression_id = ?expression.id, error = %e, "Submission rejected");
                expression.fail(e.to_string())?;
                self.listener.on_completed(&expression);
                return Err(e);
            }
        };

        self.hand_over(expression, plan, handoff)
    }

    /// Resubmit expressions persisted as `Queued` or `Calculating` before a restart
    ///
    /// Ids are kept. Returns how many were handed to the pool again. When the
    /// pool is shut down part way through, the remaining expressions are left
    /// untouched so a later restart can pick them up.
    pub fn resume(&self, expressions: Vec<Expression>) -> CalcResult<usize> {
        let mut resumed = 0;
        for mut expression in expressions {
            if expression.id.is_none() || !expression.status().is_pending() {
                debug!(text = %expression.text, "Skipping expression that cannot be resumed");
                continue;
            }

            let handoff = self.pool.reserve()?;
            expression.reset_for_resume()?;
            let Some(plan) = self.parse_or_fail(&mut expression)? else {
                continue;
            };
            self.hand_over(expression, plan, handoff)?;
            resumed += 1;
        }

        if resumed > 0 {
            info!(resumed, "Resumed unfinished expressions");
        }
        Ok(resumed)
    }

    /// Parse a `Created` expression, failing and reporting it when the text is malformed
    fn parse_or_fail(&self, expression: &mut Expression) -> CalcResult<Option<Plan>> {
        match Plan::parse(&expression.text) {
            Ok(plan) => Ok(Some(plan)),
            Err(e) => {
                debug!(expression_id = ?expression.id, error = %e, "Expression rejected by parser");
                expression.fail(e.to_string())?;
                self.listener.on_completed(expression);
                Ok(None)
            }
        }
    }

    fn hand_over(
        &self,
        mut expression: Expression,
        plan: Plan,
        handoff: Handoff,
    ) -> CalcResult<Expression> {
        expression.mark_queued(plan)?;
        self.listener.on_status_changed(&expression);
        handoff.send(expression.clone())?;
        Ok(expression)
    }

    /// Validate and atomically replace all four operator costs (milliseconds)
    pub fn set_operation_costs(
        &self,
        plus: i64,
        minus: i64,
        multiply: i64,
        divide: i64,
    ) -> CalcResult<OperationCosts> {
        self.costs.set_millis(plus, minus, multiply, divide)
    }

    pub fn operation_costs(&self) -> OperationCosts {
        self.costs.snapshot()
    }

    pub fn cost_registry(&self) -> &Arc<CostRegistry> {
        &self.costs
    }

    /// Occupancy of every worker
    pub fn list_workers(&self) -> Vec<WorkerSnapshot> {
        self.pool.list_workers()
    }

    pub fn worker_count(&self) -> usize {
        self.pool.worker_count()
    }

    pub fn is_running(&self) -> bool {
        self.pool.is_running()
    }

    /// Stop intake and wait for in-flight expressions
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CalcError;
    use crate::pacing::RecordingPacer;
    use crate::store::MemoryStore;
    use abacus_types::ExpressionStatus;
    use std::time::Duration;

    fn service(store: Arc<MemoryStore>) -> CalculationService {
        CalculationService::with_pacer(
            ServiceConfig { workers: 2, costs: OperationCosts::default() },
            store,
            Arc::new(RecordingPacer::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_malformed_expression_fails_without_queueing() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store.clone());

        let expr = service.submit("2+*3").unwrap();
        assert_eq!(expr.id, Some(abacus_types::ExpressionId(1)));
        assert!(expr.is_terminal());
        assert!(expr.error_message().unwrap().contains("parse error"));

        let stored = store.get(expr.id.unwrap()).unwrap();
        assert_eq!(stored.status(), expr.status());
    }

    #[test]
    fn test_submission_is_queued_then_finished() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store.clone());

        let expr = service.submit("2+2*2").unwrap();
        assert_eq!(expr.status(), &ExpressionStatus::Queued);

        service.shutdown();
        let stored = store.get(expr.id.unwrap()).unwrap();
        assert_eq!(stored.status(), &ExpressionStatus::Done);
        assert_eq!(stored.result(), Some(6.0));
    }

    #[test]
    fn test_submit_after_shutdown_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store.clone());
        service.shutdown();

        assert_eq!(service.submit("1+1").unwrap_err(), CalcError::PoolUnavailable);
        let stored = store.get(abacus_types::ExpressionId(1)).unwrap();
        assert_eq!(stored.error_message(), Some("calculation pool is unavailable"));
    }

    #[test]
    fn test_rejected_submission_is_never_queued() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store.clone());
        service.shutdown();

        // malformed text still fails on its parse error
        let malformed = service.submit("2+").unwrap();
        assert!(malformed.error_message().unwrap().starts_with("parse error"));

        assert_eq!(service.submit("1+1").unwrap_err(), CalcError::PoolUnavailable);
        assert!(store.unfinished().is_empty());
    }

    #[test]
    fn test_set_operation_costs() {
        let service = service(Arc::new(MemoryStore::new()));
        let costs = service.set_operation_costs(10, 20, 30, 40).unwrap();
        assert_eq!(service.operation_costs(), costs);
        assert_eq!(costs.divide, Duration::from_millis(40));

        assert!(service.set_operation_costs(-1, 0, 0, 0).is_err());
        assert_eq!(service.operation_costs(), costs);
    }
}
