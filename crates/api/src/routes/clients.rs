//! Client endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{Aggregate, Client, ClientDetails, ClientDetailsPatch, Money};
use event_store::EventStore;
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{ApiJson, CurrentActor, parse_id};

#[derive(Serialize)]
pub struct ClientResponse {
    pub id: Option<AggregateId>,
    #[serde(flatten)]
    pub details: ClientDetails,
    pub total_orders: u64,
    pub total_spent: Money,
    pub last_order_date: Option<DateTime<Utc>>,
    pub registered_at: Option<DateTime<Utc>>,
}

impl From<&Client> for ClientResponse {
    fn from(client: &Client) -> Self {
        Self {
            id: client.id(),
            details: client.details().clone(),
            total_orders: client.total_orders(),
            total_spent: client.total_spent(),
            last_order_date: client.last_order_date(),
            registered_at: client.registered_at(),
        }
    }
}

/// POST /clients
#[tracing::instrument(skip_all)]
pub async fn register<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    ApiJson(details): ApiJson<ClientDetails>,
) -> Result<(StatusCode, Json<ClientResponse>), ApiError> {
    let client = state.office.clients.register_client(details, &actor).await?;
    Ok((StatusCode::CREATED, Json(ClientResponse::from(&client))))
}

/// GET /clients/{id}
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _actor: CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<ClientResponse>, ApiError> {
    let client = state.office.clients.get_client(parse_id(&id)?).await?;
    Ok(Json(ClientResponse::from(&client)))
}

/// PATCH /clients/{id}
#[tracing::instrument(skip_all)]
pub async fn update<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<ClientDetailsPatch>,
) -> Result<Json<ClientResponse>, ApiError> {
    let client = state
        .office
        .clients
        .update_client(parse_id(&id)?, patch, &actor)
        .await?;
    Ok(Json(ClientResponse::from(&client)))
}

/// DELETE /clients/{id}. Refused with 409 while the client has orders.
#[tracing::instrument(skip_all)]
pub async fn delete<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .office
        .clients
        .delete_client(parse_id(&id)?, &actor)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
