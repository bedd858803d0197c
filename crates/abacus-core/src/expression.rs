//! Expression lifecycle record
//!
//! ```text
//! Created --parse ok--> Queued --picked up--> Calculating --ok---> Done
//!                                                         --err--> Failed
//! Created --parse fails-----------------------------------------> Failed
//! ```

use crate::calculator::Plan;
use crate::error::{CalcError, CalcResult};
use abacus_types::{ExpressionId, ExpressionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A submitted arithmetic formula together with its lifecycle state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expression {
    /// Assigned by the store when the expression is created
    pub id: Option<ExpressionId>,
    pub text: String,
    #[serde(skip)]
    plan: Option<Plan>,
    result: Option<f64>,
    status: ExpressionStatus,
    pub created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl Expression {
    /// Fresh expression in the `Created` state
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            plan: None,
            result: None,
            status: ExpressionStatus::Created,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn status(&self) -> &ExpressionStatus {
        &self.status
    }

    pub fn result(&self) -> Option<f64> {
        self.result
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Failure message, when the expression failed
    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            ExpressionStatus::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// `Created -> Queued`, attaching the parsed plan
    pub fn mark_queued(&mut self, plan: Plan) -> CalcResult<()> {
        if self.status != ExpressionStatus::Created {
            return Err(CalcError::transition(&self.status, "in queue"));
        }
        self.plan = Some(plan);
        self.status = ExpressionStatus::Queued;
        Ok(())
    }

    /// `Queued -> Calculating`
    pub fn mark_calculating(&mut self) -> CalcResult<()> {
        if self.status != ExpressionStatus::Queued {
            return Err(CalcError::transition(&self.status, "calculating"));
        }
        self.status = ExpressionStatus::Calculating;
        Ok(())
    }

    /// `Calculating -> Done` with the computed value
    pub fn complete(&mut self, value: f64) -> CalcResult<()> {
        if self.status != ExpressionStatus::Calculating {
            return Err(CalcError::transition(&self.status, "done"));
        }
        self.result = Some(value);
        self.status = ExpressionStatus::Done;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// `Created -> Failed` or `Calculating -> Failed`
    ///
    /// A queued expression can only fail once a worker owns it.
    pub fn fail(&mut self, message: impl Into<String>) -> CalcResult<()> {
        match self.status {
            ExpressionStatus::Created | ExpressionStatus::Calculating => {
                self.result = None;
                self.status = ExpressionStatus::Failed(message.into());
                self.finished_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(CalcError::transition(&self.status, "failed")),
        }
    }

    /// Return a persisted pending expression to `Created` so it can be parsed
    /// and queued again after a restart
    pub(crate) fn reset_for_resume(&mut self) -> CalcResult<()> {
        if !self.status.is_pending() {
            return Err(CalcError::transition(&self.status, "created"));
        }
        self.plan = None;
        self.result = None;
        self.status = ExpressionStatus::Created;
        Ok(())
    }
}
