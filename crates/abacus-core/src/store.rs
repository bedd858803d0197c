//! In-memory expression store
//!
//! Keeps the latest copy of every expression it hears about through the
//! [`ExpressionListener`] events, assigns identifiers, and answers the
//! queries a presentation layer needs. The whole store can be written to and
//! restored from a JSON snapshot file.

use crate::costs::OperationCosts;
use crate::error::{CalcError, CalcResult};
use crate::expression::Expression;
use crate::listener::ExpressionListener;
use abacus_types::ExpressionId;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info};

/// On-disk form of a [`MemoryStore`]
#[derive(Debug, Serialize, Deserialize)]
struct StoreSnapshot {
    next_id: u64,
    costs: Option<OperationCosts>,
    expressions: Vec<Expression>,
}

/// Concurrent map of expressions keyed by id
#[derive(Debug)]
pub struct MemoryStore {
    expressions: DashMap<ExpressionId, Expression>,
    next_id: AtomicU64,
    costs: RwLock<Option<OperationCosts>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { expressions: DashMap::new(), next_id: AtomicU64::new(1), costs: RwLock::new(None) }
    }

    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    pub fn get(&self, id: ExpressionId) -> Option<Expression> {
        self.expressions.get(&id).map(|entry| entry.value().clone())
    }

    /// Expressions whose id contains `fragment`, ascending by id
    ///
    /// An empty fragment returns everything, newest id first.
    pub fn search(&self, fragment: &str) -> Vec<Expression> {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            let mut all = self.collect(|_| true);
            all.reverse();
            return all;
        }
        self.collect(|expr| expr.id.is_some_and(|id| id.to_string().contains(fragment)))
    }

    /// Most recently created expressions, newest first
    pub fn latest(&self, limit: usize) -> Vec<Expression> {
        let mut all = self.collect(|_| true);
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        all.truncate(limit);
        all
    }

    /// Expressions still waiting for or owned by a worker, ascending by id
    pub fn unfinished(&self) -> Vec<Expression> {
        self.collect(|expr| expr.status().is_pending())
    }

    /// Last cost table recorded through [`MemoryStore::record_costs`]
    pub fn operation_costs(&self) -> Option<OperationCosts> {
        *self.costs.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_costs(&self, costs: OperationCosts) {
        *self.costs.write().unwrap_or_else(PoisonError::into_inner) = Some(costs);
    }

    fn collect(&self, filter: impl Fn(&Expression) -> bool) -> Vec<Expression> {
        let mut matching: Vec<Expression> = self
            .expressions
            .iter()
            .filter(|entry| filter(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        matching.sort_by_key(|expr| expr.id);
        matching
    }

    /// Store the latest copy, never overwriting a terminal record
    fn upsert(&self, expression: &Expression) {
        let Some(id) = expression.id else {
            debug!(text = %expression.text, "Ignoring event for expression without id");
            return;
        };

        self.expressions
            .entry(id)
            .and_modify(|stored| {
                if !stored.is_terminal() {
                    *stored = expression.clone();
                }
            })
            .or_insert_with(|| expression.clone());
    }

    /// Write every expression, the id counter and the cost table as JSON
    pub fn save_snapshot(&self, path: &Path) -> CalcResult<()> {
        let snapshot = StoreSnapshot {
            next_id: self.next_id.load(Ordering::SeqCst),
            costs: self.operation_costs(),
            expressions: self.collect(|_| true),
        };

        let json = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| CalcError::storage(format!("failed to encode snapshot: {e}")))?;
        fs::write(path, json).map_err(|e| {
            CalcError::storage(format!("failed to write snapshot '{}': {e}", path.display()))
        })?;

        info!(path = %path.display(), expressions = snapshot.expressions.len(), "Store snapshot saved");
        Ok(())
    }

    /// Restore a store written by [`MemoryStore::save_snapshot`]
    pub fn load_snapshot(path: &Path) -> CalcResult<Self> {
        let bytes = fs::read(path).map_err(|e| {
            CalcError::storage(format!("failed to read snapshot '{}': {e}", path.display()))
        })?;
        let snapshot: StoreSnapshot = serde_json::from_slice(&bytes)
            .map_err(|e| CalcError::storage(format!("failed to decode snapshot: {e}")))?;

        let store = Self::new();
        let mut highest = 0;
        for expression in snapshot.expressions {
            if let Some(id) = expression.id {
                highest = highest.max(id.get());
                store.expressions.insert(id, expression);
            }
        }
        store.next_id.store(snapshot.next_id.max(highest + 1), Ordering::SeqCst);
        if let Some(costs) = snapshot.costs {
            store.record_costs(costs);
        }

        info!(path = %path.display(), expressions = store.len(), "Store snapshot loaded");
        Ok(store)
    }
}

impl ExpressionListener for MemoryStore {
    fn on_created(&self, expression: &Expression) -> ExpressionId {
        let id = ExpressionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut stored = expression.clone();
        stored.id = Some(id);
        self.expressions.insert(id, stored);
        id
    }

    fn on_status_changed(&self, expression: &Expression) {
        self.upsert(expression);
    }

    fn on_completed(&self, expression: &Expression) {
        self.upsert(expression);
    }
}
