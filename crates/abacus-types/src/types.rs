use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Opaque identifier assigned to an expression by the store that persists it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpressionId(pub u64);

impl ExpressionId {
    /// Raw numeric value of the identifier
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExpressionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ExpressionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self)
    }
}

/// Lifecycle state of a submitted expression
///
/// `Done` and `Failed` are terminal. `Created` only exists between submission
/// and the parse attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum ExpressionStatus {
    /// Submitted, not yet parsed
    Created,
    /// Parsed and waiting for a worker
    Queued,
    /// Owned by a worker and being evaluated
    Calculating,
    /// Evaluated successfully
    Done,
    /// Rejected by the parser or failed during evaluation
    Failed(String),
}

impl ExpressionStatus {
    /// Whether no further transition is permitted
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }

    /// Whether a worker still has to pick up or finish this expression
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Queued | Self::Calculating)
    }

    /// Short label, without the failure message
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Queued => "in queue",
            Self::Calculating => "calculating",
            Self::Done => "done",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for ExpressionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(message) => write!(f, "{message}"),
            other => f.write_str(other.label()),
        }
    }
}

/// The four binary operators an expression may contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorSymbol {
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Multiply,
    /// `/`
    Divide,
}

/// Returned when a character is not one of `+ - * /`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown operator '{0}'")]
pub struct UnknownOperator(pub char);

impl OperatorSymbol {
    /// All operators, in configuration order
    pub const ALL: [Self; 4] = [Self::Plus, Self::Minus, Self::Multiply, Self::Divide];

    /// Source character of the operator
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Plus => '+',
            Self::Minus => '-',
            Self::Multiply => '*',
            Self::Divide => '/',
        }
    }
}

impl TryFrom<char> for OperatorSymbol {
    type Error = UnknownOperator;

    fn try_from(ch: char) -> Result<Self, Self::Error> {
        match ch {
            '+' => Ok(Self::Plus),
            '-' => Ok(Self::Minus),
            '*' => Ok(Self::Multiply),
            '/' => Ok(Self::Divide),
            other => Err(UnknownOperator(other)),
        }
    }
}

impl fmt::Display for OperatorSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Occupancy of a single worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Waiting for the next expression
    #[default]
    Idle,
    /// Evaluating an expression
    Busy,
}

/// Point-in-time view of one worker, as exposed to pollers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSnapshot {
    /// Worker index, `0..N`
    pub id: usize,
    /// Current occupancy
    pub state: WorkerState,
    /// Expression owned by the worker while `Busy`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_expression: Option<ExpressionId>,
}

impl WorkerSnapshot {
    /// Snapshot of an idle worker
    #[must_use]
    pub const fn idle(id: usize) -> Self {
        Self { id, state: WorkerState::Idle, current_expression: None }
    }

    /// Whether the worker is evaluating something
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state == WorkerState::Busy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        let failed = ExpressionStatus::Failed("division by zero".to_string());
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json, serde_json::json!({"state": "failed", "message": "division by zero"}));

        let queued = serde_json::to_value(&ExpressionStatus::Queued).unwrap();
        assert_eq!(queued, serde_json::json!({"state": "queued"}));
    }

    #[test]
    fn test_terminal_states() {
        assert!(ExpressionStatus::Done.is_terminal());
        assert!(ExpressionStatus::Failed(String::new()).is_terminal());
        assert!(!ExpressionStatus::Calculating.is_terminal());
        assert!(ExpressionStatus::Calculating.is_pending());
        assert!(!ExpressionStatus::Created.is_pending());
    }

    #[test]
    fn test_operator_symbols() {
        for op in OperatorSymbol::ALL {
            assert_eq!(OperatorSymbol::try_from(op.symbol()), Ok(op));
        }
        assert_eq!(OperatorSymbol::try_from('%'), Err(UnknownOperator('%')));
    }

    #[test]
    fn test_expression_id_parsing() {
        assert_eq!(" 42 ".parse::<ExpressionId>().unwrap(), ExpressionId(42));
        assert!("abc".parse::<ExpressionId>().is_err());
    }
}
