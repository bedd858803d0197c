//! Expression evaluator
//!
//! Walks the tree post-order on the calling thread. Every operator node reads
//! its cost from the registry when the node is entered, evaluates both
//! operands, then pauses for that cost before producing its value. A cost
//! change that lands while a node is running only affects nodes entered later.

use crate::calculator::ast::Node;
use crate::costs::CostRegistry;
use crate::error::{CalcError, CalcResult};
use crate::pacing::Pacer;
use abacus_types::OperatorSymbol;

/// Evaluate a tree to a number, charging simulated time per operator node
pub fn evaluate_node(node: &Node, costs: &CostRegistry, pacer: &dyn Pacer) -> CalcResult<f64> {
    match node {
        Node::Number(value) => Ok(*value),

        Node::BinaryOp { left, operator, right } => {
            let cost = costs.cost_of(*operator);

            let left_val = evaluate_node(left, costs, pacer)?;
            let right_val = evaluate_node(right, costs, pacer)?;

            if *operator == OperatorSymbol::Divide && right_val == 0.0 {
                return Err(CalcError::DivisionByZero);
            }

            pacer.pause(*operator, cost);
            Ok(apply(*operator, left_val, right_val))
        }
    }
}

fn apply(operator: OperatorSymbol, left: f64, right: f64) -> f64 {
    match operator {
        OperatorSymbol::Plus => left + right,
        OperatorSymbol::Minus => left - right,
        OperatorSymbol::Multiply => left * right,
        OperatorSymbol::Divide => left / right,
    }
}
