//! Arithmetic calculator
//!
//! Turns expression text into a [`Plan`] and evaluates plans against the
//! operation cost registry. The grammar has number literals, the four binary
//! operators `+ - * /` with the usual precedence, and parentheses.

pub mod ast;
pub mod evaluator;
pub mod parser;

use crate::costs::{CostRegistry, OperationCosts};
use crate::error::CalcResult;
use crate::pacing::Pacer;
use std::time::Duration;

pub use parser::{MAX_NESTING, MAX_OPERATORS};

/// Parsed, validated computation ready for evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    root: ast::Node,
}

impl Plan {
    /// Parse expression text into a plan
    pub fn parse(text: &str) -> CalcResult<Self> {
        Ok(Self { root: parser::parse_expression(text)? })
    }

    pub fn root(&self) -> &ast::Node {
        &self.root
    }

    pub fn operator_count(&self) -> usize {
        self.root.operator_count()
    }

    /// Total simulated time the plan costs under the given table
    pub fn estimated_cost(&self, costs: &OperationCosts) -> Duration {
        ast::operators_post_order(&self.root).into_iter().map(|op| costs.get(op)).sum()
    }

    /// Evaluate on the calling thread
    pub fn evaluate(&self, costs: &CostRegistry, pacer: &dyn Pacer) -> CalcResult<f64> {
        evaluator::evaluate_node(&self.root, costs, pacer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pacing::RecordingPacer;
    use proptest::prelude::*;

    #[test]
    fn test_plan_evaluation() {
        let plan = Plan::parse("(1 + 2) * (10 - 4) / 3").unwrap();
        assert_eq!(plan.operator_count(), 4);

        let result = plan.evaluate(&CostRegistry::default(), &RecordingPacer::new()).unwrap();
        assert!((result - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_estimated_cost() {
        let plan = Plan::parse("1+2*3-4").unwrap();
        let costs = OperationCosts::from_millis(100, 30, 50, 0).unwrap();
        assert_eq!(plan.estimated_cost(&costs), Duration::from_millis(180));
    }

    #[test]
    fn test_longest_chain_evaluates() {
        let chain = vec!["1"; MAX_OPERATORS + 1].join("+");
        let plan = Plan::parse(&chain).unwrap();
        let value = plan.evaluate(&CostRegistry::default(), &RecordingPacer::new()).unwrap();
        assert_eq!(value, (MAX_OPERATORS + 1) as f64);
    }

    fn arithmetic() -> impl Strategy<Value = String> {
        let leaf = (0u32..1000).prop_map(|n| n.to_string());
        leaf.prop_recursive(4, 32, 2, |inner| {
            prop_oneof![
                (inner.clone(), prop::sample::select(vec!['+', '-', '*', '/']), inner.clone())
                    .prop_map(|(l, op, r)| format!("{l} {op} {r}")),
                inner.prop_map(|e| format!("({e})")),
            ]
        })
    }

    proptest! {
        #[test]
        fn parsing_is_deterministic(text in arithmetic()) {
            let first = Plan::parse(&text).unwrap();
            let second = Plan::parse(&text).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn rendered_plan_reparses_to_same_tree(text in arithmetic()) {
            let plan = Plan::parse(&text).unwrap();
            let reparsed = Plan::parse(&plan.root().to_string()).unwrap();
            prop_assert_eq!(plan, reparsed);
        }

        #[test]
        fn additive_chains_associate_left(a in 0u32..1000, b in 0u32..1000, c in 0u32..1000) {
            let plan = Plan::parse(&format!("{a} - {b} - {c}")).unwrap();
            let value = plan.evaluate(&CostRegistry::default(), &RecordingPacer::new()).unwrap();
            prop_assert_eq!(value, (f64::from(a) - f64::from(b)) - f64::from(c));
        }
    }
}
