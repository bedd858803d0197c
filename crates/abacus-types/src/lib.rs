//! Abacus Types
//!
//! This crate defines the plain data types shared by the Abacus crates
//! (`abacus-core` and `abacus-api`): expression identifiers and lifecycle
//! states, operator symbols, and worker occupancy snapshots. It holds no
//! scheduling or evaluation logic.

#![deny(warnings)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(missing_docs)]

mod types;
pub use types::{
    ExpressionId, ExpressionStatus, OperatorSymbol, UnknownOperator, WorkerSnapshot, WorkerState,
};
