//! Fixed-size worker pool
//!
//! ## Architecture Overview
//!
//! ```text
//! submit() ──► rendezvous (zero-capacity channel) ──► worker 0..N
//!   blocks until a          one expression            Calculating → evaluate →
//!   worker accepts          per handoff               Done / Failed → Idle
//! ```
//!
//! Submission blocks the caller until an idle worker takes the expression,
//! so a busy pool pushes back on producers instead of growing a queue. Once
//! `submit` returns `Ok`, exactly one worker owns the expression.
//!
//! Callers that must not queue an expression the pool can no longer accept
//! take a [`Handoff`] first with [`WorkerPool::reserve`]. A held handoff keeps
//! the workers running, so its send always finds a receiver.
//!
//! Shutdown closes the intake; workers finish whatever they hold and exit.

use crate::costs::{CostRegistry, whole_millis};
use crate::error::{CalcError, CalcResult};
use crate::expression::Expression;
use crate::listener::ExpressionListener;
use crate::pacing::Pacer;
use crate::registry::ResourceRegistry;
use abacus_types::{ExpressionStatus, WorkerSnapshot};
use crossbeam::channel::{self, Receiver, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Failure recorded for an expression whose evaluation panicked
pub const PANIC_MESSAGE: &str = "worker panicked during evaluation";

/// Shared state every worker needs
#[derive(Clone)]
struct WorkerContext {
    costs: Arc<CostRegistry>,
    listener: Arc<dyn ExpressionListener>,
    pacer: Arc<dyn Pacer>,
    registry: Arc<ResourceRegistry>,
}

/// Reserved right to hand one expression to the workers
#[derive(Debug)]
pub struct Handoff {
    sender: Sender<Expression>,
}

impl Handoff {
    /// Give a queued expression to the next idle worker, blocking until one accepts it
    pub fn send(self, expression: Expression) -> CalcResult<()> {
        if *expression.status() != ExpressionStatus::Queued {
            return Err(CalcError::transition(expression.status(), "calculating"));
        }

        let id = expression.id;
        self.sender.send(expression).map_err(|_| CalcError::PoolUnavailable)?;
        debug!(expression_id = ?id, "Expression handed to worker");
        Ok(())
    }
}

/// Owns the workers and the submission rendezvous point
pub struct WorkerPool {
    sender: Mutex<Option<Sender<Expression>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    registry: Arc<ResourceRegistry>,
}

impl WorkerPool {
    /// Spawn `worker_count` workers that run until [`WorkerPool::shutdown`]
    pub fn start(
        worker_count: usize,
        costs: Arc<CostRegistry>,
        listener: Arc<dyn ExpressionListener>,
        pacer: Arc<dyn Pacer>,
    ) -> CalcResult<Self> {
        if worker_count == 0 {
            return Err(CalcError::config("workers", "pool needs at least one worker"));
        }

        let (sender, receiver) = channel::bounded::<Expression>(0);
        let registry = Arc::new(ResourceRegistry::new(worker_count));
        let context = WorkerContext { costs, listener, pacer, registry: registry.clone() };

        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let receiver = receiver.clone();
            let context = context.clone();
            let handle = thread::Builder::new()
                .name(format!("abacus-worker-{worker_id}"))
                .spawn(move || run_worker(worker_id, receiver, context))
                .map_err(|e| {
                    error!(worker = worker_id, error = %e, "Failed to spawn worker thread");
                    CalcError::PoolUnavailable
                })?;
            handles.push(handle);
        }

        info!(workers = worker_count, "Worker pool started");

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            handles: Mutex::new(handles),
            registry,
        })
    }

    /// Reserve a handoff, or `PoolUnavailable` once shutdown has begun
    pub fn reserve(&self) -> CalcResult<Handoff> {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .map(|sender| Handoff { sender })
            .ok_or(CalcError::PoolUnavailable)
    }

    /// Hand a queued expression to the next idle worker, blocking until one accepts it
    pub fn submit(&self, expression: Expression) -> CalcResult<()> {
        self.reserve()?.send(expression)
    }

    /// Occupancy of every worker, ordered by id
    pub fn list_workers(&self) -> Vec<WorkerSnapshot> {
        self.registry.snapshot()
    }

    pub fn worker_count(&self) -> usize {
        self.registry.worker_count()
    }

    pub fn is_running(&self) -> bool {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Stop accepting submissions and wait for in-flight expressions to finish
    pub fn shutdown(&self) {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner).take();
        if sender.is_none() {
            return;
        }
        drop(sender);
        info!("Worker pool shutting down");

        let handles: Vec<_> =
            self.handles.lock().unwrap_or_else(PoisonError::into_inner).drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                warn!("Worker thread exited with a panic");
            }
        }

        info!("Worker pool stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.worker_count())
            .field("running", &self.is_running())
            .finish()
    }
}

fn run_worker(worker_id: usize, receiver: Receiver<Expression>, context: WorkerContext) {
    debug!(worker = worker_id, "Worker started");

    for mut expression in receiver.iter() {
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| process(worker_id, &mut expression, &context)));
        if outcome.is_err() {
            error!(worker = worker_id, expression_id = ?expression.id, "Worker recovered from a panic");
            if *expression.status() == ExpressionStatus::Calculating
                && expression.fail(PANIC_MESSAGE).is_ok()
            {
                context.listener.on_completed(&expression);
            }
        }
        context.registry.mark_idle(worker_id);
    }

    debug!(worker = worker_id, "Worker stopped");
}

fn process(worker_id: usize, expression: &mut Expression, context: &WorkerContext) {
    context.registry.mark_busy(worker_id, expression.id);

    if let Err(e) = expression.mark_calculating() {
        warn!(worker = worker_id, expression_id = ?expression.id, error = %e, "Dropping expression");
        return;
    }
    context.listener.on_status_changed(expression);

    let started = Instant::now();
    let outcome = match expression.plan() {
        Some(plan) => plan.evaluate(&context.costs, context.pacer.as_ref()),
        None => Err(CalcError::parse(0, "expression was queued without a plan")),
    };
    let duration_ms = whole_millis(started.elapsed());

    let finished = match outcome {
        Ok(value) => {
            info!(
                worker = worker_id,
                expression_id = ?expression.id,
                result = value,
                duration_ms,
                "Expression calculated"
            );
            expression.complete(value)
        }
        Err(e) => {
            warn!(
                worker = worker_id,
                expression_id = ?expression.id,
                error = %e,
                duration_ms,
                "Expression failed"
            );
            expression.fail(e.to_string())
        }
    };

    if let Err(e) = finished {
        error!(worker = worker_id, expression_id = ?expression.id, error = %e, "Lifecycle violation");
        return;
    }
    context.listener.on_completed(expression);
}
