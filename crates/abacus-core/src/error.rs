//! Error taxonomy for the Abacus core
//!
//! Parse and evaluation errors end up as the failure message of the expression
//! they belong to. Configuration, pool-lifecycle and storage errors are returned
//! to the caller that triggered them.

use abacus_types::ExpressionStatus;
use thiserror::Error;

/// Error type for core evaluation and scheduling operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    /// Malformed input; the expression never reaches the worker pool
    #[error("parse error at position {position}: {message}")]
    Parse { message: String, position: usize },

    /// A `/` node's right operand evaluated to exactly zero
    #[error("division by zero")]
    DivisionByZero,

    /// Rejected configuration update; the previous configuration stays in effect
    #[error("invalid configuration for '{setting}': {message}")]
    ConfigValidation { message: String, setting: String },

    /// Submission attempted after the pool was shut down
    #[error("calculation pool is unavailable")]
    PoolUnavailable,

    /// A lifecycle transition that skips or reorders the state machine
    #[error("invalid status transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    /// Snapshot persistence failures
    #[error("storage error: {message}")]
    Storage { message: String },
}

/// Result type alias for core operations
pub type CalcResult<T> = Result<T, CalcError>;

impl CalcError {
    /// Create a parse error at the given character offset
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse { message: message.into(), position }
    }

    /// Create a configuration validation error
    pub fn config(setting: &str, message: impl Into<String>) -> Self {
        Self::ConfigValidation { message: message.into(), setting: setting.to_string() }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage { message: message.into() }
    }

    pub(crate) fn transition(from: &ExpressionStatus, to: &str) -> Self {
        Self::InvalidTransition { from: from.label().to_string(), to: to.to_string() }
    }

    /// Error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            CalcError::Parse { .. } => "parse",
            CalcError::DivisionByZero => "evaluation",
            CalcError::ConfigValidation { .. } => "configuration",
            CalcError::PoolUnavailable => "pool",
            CalcError::InvalidTransition { .. } => "lifecycle",
            CalcError::Storage { .. } => "storage",
        }
    }

    /// Whether the error only affects the request that produced it
    pub fn is_recoverable(&self) -> bool {
        match self {
            CalcError::Parse { .. } => true,
            CalcError::DivisionByZero => true,
            CalcError::ConfigValidation { .. } => true,
            CalcError::PoolUnavailable => false, // pool is gone for good
            CalcError::InvalidTransition { .. } => false,
            CalcError::Storage { .. } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(CalcError::DivisionByZero.to_string(), "division by zero");
        assert_eq!(
            CalcError::parse(3, "unexpected token '*'").to_string(),
            "parse error at position 3: unexpected token '*'"
        );
        assert_eq!(
            CalcError::config("plus", "must not be negative").to_string(),
            "invalid configuration for 'plus': must not be negative"
        );
    }

    #[test]
    fn test_error_classification() {
        assert_eq!(CalcError::PoolUnavailable.category(), "pool");
        assert!(!CalcError::PoolUnavailable.is_recoverable());
        assert!(CalcError::DivisionByZero.is_recoverable());
        assert_eq!(
            CalcError::transition(&ExpressionStatus::Done, "calculating").to_string(),
            "invalid status transition from 'done' to 'calculating'"
        );
    }
}
