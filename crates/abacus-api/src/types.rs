//! Request and response bodies

use abacus_core::{Expression, ExpressionId, WorkerSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub expression: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    /// Fragment of the decimal id
    #[serde(default)]
    pub id: Option<String>,
}

/// All four operator costs in milliseconds; negatives are rejected
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CostsUpdate {
    pub plus: i64,
    pub minus: i64,
    pub multiply: i64,
    pub divide: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ExpressionId>,
    pub expression: String,
    /// `created`, `in queue`, `calculating`, `done` or `failed`
    pub status: String,
    pub result: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<&Expression> for ExpressionView {
    fn from(expression: &Expression) -> Self {
        Self {
            id: expression.id,
            expression: expression.text.clone(),
            status: expression.status().label().to_string(),
            result: expression.result(),
            error: expression.error_message().map(str::to_string),
            created_at: expression.created_at,
            finished_at: expression.finished_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcesResponse {
    pub total: usize,
    pub busy: usize,
    pub workers: Vec<WorkerSnapshot>,
}

impl From<Vec<WorkerSnapshot>> for ResourcesResponse {
    fn from(workers: Vec<WorkerSnapshot>) -> Self {
        let busy = workers.iter().filter(|w| w.is_busy()).count();
        Self { total: workers.len(), busy, workers }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub workers: usize,
    pub uptime_seconds: u64,
}
