#![deny(warnings)]
#![allow(missing_docs)]
//! Abacus HTTP API
//!
//! JSON endpoints for submitting arithmetic expressions, reading their
//! status, tuning operator costs and watching worker occupancy.

use std::sync::Arc;
use std::time::Duration;

use abacus_core::{CalcResult, CalculationService, MemoryStore};
use axum::{
    Router,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod config;
pub mod error;
pub mod handlers;
pub mod tracing_setup;
pub mod types;

use config::AbacusConfig;

/// Shared application state
#[derive(Debug)]
pub struct AppState {
    pub start_time: DateTime<Utc>,
    pub service: Arc<CalculationService>,
    pub store: Arc<MemoryStore>,
    pub max_body_bytes: usize,
}

impl AppState {
    /// Start the calculation service against `store`
    ///
    /// Costs previously recorded in the store win over the configured ones.
    pub fn new(config: &AbacusConfig, store: Arc<MemoryStore>) -> CalcResult<Self> {
        let mut service_config = config.service_config()?;
        let max_body_bytes = config.max_body_bytes()?;
        if let Some(costs) = store.operation_costs() {
            info!("Using operation costs restored from the store");
            service_config.costs = costs;
        }
        store.record_costs(service_config.costs);

        let service = Arc::new(CalculationService::start(service_config, store.clone())?);
        info!(workers = service.worker_count(), "Application state initialized");

        Ok(Self {
            start_time: Utc::now(),
            service,
            store,
            max_body_bytes,
        })
    }

    pub fn elapsed(&self) -> Duration {
        (Utc::now() - self.start_time).to_std().unwrap_or_default()
    }
}

/// Build the router with every endpoint, request tracing and a body size limit
pub fn create_app(state: Arc<AppState>) -> Router {
    let max_body_bytes = state.max_body_bytes;

    Router::new()
        .route(
            "/expressions",
            post(handlers::submit_expression).get(handlers::search_expressions),
        )
        .route("/expressions/latest", get(handlers::latest_expressions))
        .route("/expressions/{id}", get(handlers::get_expression))
        .route(
            "/configuration",
            get(handlers::get_configuration).put(handlers::update_configuration),
        )
        .route("/computing-resources", get(handlers::computing_resources))
        .route("/health", get(handlers::health_check))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
