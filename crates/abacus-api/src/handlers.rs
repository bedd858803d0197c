//! Request handlers
//!
//! Submission blocks until a worker accepts the expression, so it runs on the
//! blocking thread pool instead of a runtime worker.

use axum::{
    Json,
    extract::{FromRequest, Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::{info, instrument};

use abacus_core::{ExpressionId, OperationCosts};

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::types::{
    CostsUpdate, ExpressionView, HealthResponse, ResourcesResponse, SearchParams, SubmitRequest,
};

/// Number of expressions returned by the latest-submissions endpoint
pub const LATEST_LIMIT: usize = 10;

/// `Json` body extractor that rejects with the API error body
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[instrument(skip_all)]
pub async fn submit_expression(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<SubmitRequest>,
) -> ApiResult<(StatusCode, Json<ExpressionView>)> {
    let service = state.service.clone();
    let expression =
        tokio::task::spawn_blocking(move || service.submit(&request.expression)).await??;

    info!(expression_id = ?expression.id, status = expression.status().label(), "Expression accepted");
    Ok((StatusCode::ACCEPTED, Json(ExpressionView::from(&expression))))
}

pub async fn search_expressions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<ExpressionView>> {
    let fragment = params.id.unwrap_or_default();
    Json(state.store.search(&fragment).iter().map(ExpressionView::from).collect())
}

pub async fn latest_expressions(State(state): State<Arc<AppState>>) -> Json<Vec<ExpressionView>> {
    Json(state.store.latest(LATEST_LIMIT).iter().map(ExpressionView::from).collect())
}

pub async fn get_expression(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ExpressionView>> {
    let id: ExpressionId =
        id.parse().map_err(|_| ApiError::validation(format!("invalid expression id '{id}'")))?;
    state
        .store
        .get(id)
        .map(|expression| Json(ExpressionView::from(&expression)))
        .ok_or_else(|| ApiError::not_found(format!("expression {id}")))
}

pub async fn get_configuration(State(state): State<Arc<AppState>>) -> Json<OperationCosts> {
    Json(state.service.operation_costs())
}

#[instrument(skip_all)]
pub async fn update_configuration(
    State(state): State<Arc<AppState>>,
    ApiJson(update): ApiJson<CostsUpdate>,
) -> ApiResult<Json<OperationCosts>> {
    let costs = state.service.set_operation_costs(
        update.plus,
        update.minus,
        update.multiply,
        update.divide,
    )?;
    state.store.record_costs(costs);
    Ok(Json(costs))
}

pub async fn computing_resources(State(state): State<Arc<AppState>>) -> Json<ResourcesResponse> {
    Json(ResourcesResponse::from(state.service.list_workers()))
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let status = if state.service.is_running() { "ok" } else { "stopping" };
    Json(HealthResponse {
        status: status.to_string(),
        workers: state.service.worker_count(),
        uptime_seconds: state.elapsed().as_secs(),
    })
}
