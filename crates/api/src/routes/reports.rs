//! Read-only report endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use event_store::EventStore;
use reporting::{
    ClientSummary, CompletionTimeQuery, CompletionTimeReport, DashboardSummary, RevenueQuery,
    RevenueReport, StatusBreakdown, StatusBreakdownQuery, TopClientsQuery,
};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{ApiQuery, CurrentActor};

/// GET /reports/summary
pub async fn summary<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _actor: CurrentActor,
) -> Result<Json<DashboardSummary>, ApiError> {
    Ok(Json(state.reports.summary().await?))
}

/// GET /reports/status
pub async fn status<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _actor: CurrentActor,
    ApiQuery(query): ApiQuery<StatusBreakdownQuery>,
) -> Result<Json<StatusBreakdown>, ApiError> {
    Ok(Json(state.reports.status_breakdown(&query).await?))
}

/// GET /reports/revenue
pub async fn revenue<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _actor: CurrentActor,
    ApiQuery(query): ApiQuery<RevenueQuery>,
) -> Result<Json<RevenueReport>, ApiError> {
    Ok(Json(state.reports.revenue(&query).await?))
}

/// GET /reports/completion-time
pub async fn completion_time<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _actor: CurrentActor,
    ApiQuery(query): ApiQuery<CompletionTimeQuery>,
) -> Result<Json<CompletionTimeReport>, ApiError> {
    Ok(Json(state.reports.completion_time(&query).await?))
}

/// GET /reports/top-clients
pub async fn top_clients<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _actor: CurrentActor,
    ApiQuery(query): ApiQuery<TopClientsQuery>,
) -> Result<Json<Vec<ClientSummary>>, ApiError> {
    Ok(Json(state.reports.top_clients(&query).await?))
}
