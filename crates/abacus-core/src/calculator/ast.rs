//! Abstract Syntax Tree for arithmetic expressions

use abacus_types::OperatorSymbol;
use std::fmt;

/// AST node of a parsed expression
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Numeric literal
    Number(f64),

    /// Binary operation (a + b, a / b, etc.)
    BinaryOp { left: Box<Node>, operator: OperatorSymbol, right: Box<Node> },
}

impl Node {
    /// Create a literal number
    pub fn number(value: f64) -> Self {
        Self::Number(value)
    }

    /// Create a binary operation
    pub fn binary(left: Node, operator: OperatorSymbol, right: Node) -> Self {
        Self::BinaryOp { left: Box::new(left), operator, right: Box::new(right) }
    }

    /// Number of operator nodes in the tree
    pub fn operator_count(&self) -> usize {
        match self {
            Node::Number(_) => 0,
            Node::BinaryOp { left, right, .. } => 1 + left.operator_count() + right.operator_count(),
        }
    }
}

/// Operators of the tree in post-order, the order in which a worker charges them
pub fn operators_post_order(node: &Node) -> Vec<OperatorSymbol> {
    let mut operators = Vec::new();
    collect_operators(node, &mut operators);
    operators
}

fn collect_operators(node: &Node, operators: &mut Vec<OperatorSymbol>) {
    if let Node::BinaryOp { left, operator, right } = node {
        collect_operators(left, operators);
        collect_operators(right, operators);
        operators.push(*operator);
    }
}

/// Fully parenthesised rendering, used in logs and tests to show grouping
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Number(value) => write!(f, "{value}"),
            Node::BinaryOp { left, operator, right } => write!(f, "({left} {operator} {right})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_creation() {
        let node = Node::binary(Node::number(1.0), OperatorSymbol::Plus, Node::number(2.5));

        match node {
            Node::BinaryOp { left, operator, right } => {
                assert_eq!(left.as_ref(), &Node::Number(1.0));
                assert_eq!(operator, OperatorSymbol::Plus);
                assert_eq!(right.as_ref(), &Node::Number(2.5));
            }
            _ => panic!("Expected binary operation"),
        }
    }

    #[test]
    fn test_tree_metrics() {
        // 1 + 2 * 3
        let node = Node::binary(
            Node::number(1.0),
            OperatorSymbol::Plus,
            Node::binary(Node::number(2.0), OperatorSymbol::Multiply, Node::number(3.0)),
        );

        assert_eq!(node.operator_count(), 2);
        assert_eq!(
            operators_post_order(&node),
            vec![OperatorSymbol::Multiply, OperatorSymbol::Plus]
        );
        assert_eq!(node.to_string(), "(1 + (2 * 3))");
    }
}
