#![deny(warnings)]
#![allow(missing_docs)]
//! Core of the Abacus distributed arithmetic calculator.
//!
//! Expressions are parsed into plans, handed to a fixed pool of workers and
//! evaluated with a configurable simulated cost per operator. Lifecycle
//! changes are reported to an [`ExpressionListener`], which the bundled
//! [`MemoryStore`] implements.

/// Parser, syntax tree and cost-charging evaluator
pub mod calculator;
/// Per-operator simulated durations
pub mod costs;
/// Error types shared by every component
pub mod error;
/// Expression lifecycle record
pub mod expression;
/// Lifecycle event sink
pub mod listener;
/// Suspension primitive used while charging costs
pub mod pacing;
/// Fixed-size worker pool
pub mod pool;
/// Worker occupancy
pub mod registry;
/// Submission front door
pub mod service;
/// In-memory expression store with JSON snapshots
pub mod store;

pub use abacus_types::{
    ExpressionId, ExpressionStatus, OperatorSymbol, WorkerSnapshot, WorkerState,
};
pub use calculator::Plan;
pub use costs::{CostRegistry, OperationCosts};
pub use error::{CalcError, CalcResult};
pub use expression::Expression;
pub use listener::{ExpressionListener, NullListener};
pub use pacing::{Pacer, RecordingPacer, ThreadPacer};
pub use pool::{Handoff, WorkerPool};
pub use registry::ResourceRegistry;
pub use service::{CalculationService, ServiceConfig};
pub use store::MemoryStore;
