//! Order endpoints, including the payments recorded against an order.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{
    Aggregate, Balance, LineItem, Money, NewOrder, NewPayment, Order, OrderPatch, OrderStatus,
    PaymentStatus, Pricing, Priority, StatusHistoryEntry, clamp_non_negative,
};
use event_store::EventStore;
use reporting::{OrderListQuery, OrderSummary};
use serde::{Deserialize, Serialize};

use super::payments::PaymentResponse;
use crate::AppState;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery, CurrentActor, parse_id};

#[derive(Deserialize)]
pub struct ChangeStatusRequest {
    pub status: OrderStatus,
    pub comment: Option<String>,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: Option<AggregateId>,
    pub order_number: String,
    pub client_id: Option<AggregateId>,
    pub items: Vec<LineItem>,
    pub pricing: Pricing,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_paid: Money,
    pub balance: Money,
    pub priority: Priority,
    pub status_history: Vec<StatusHistoryEntry>,
    pub order_date: Option<DateTime<Utc>>,
    pub expected_delivery: Option<DateTime<Utc>>,
    pub completed_date: Option<DateTime<Utc>>,
    pub delivered_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub payment_ids: Vec<AggregateId>,
    pub created_by: String,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id(),
            order_number: order.order_number().as_str().to_string(),
            client_id: order.client_id(),
            items: order.items().to_vec(),
            pricing: order.pricing(),
            status: order.status(),
            payment_status: order.payment_status(),
            total_paid: order.total_paid(),
            balance: clamp_non_negative(order.total() - order.total_paid()),
            priority: order.priority(),
            status_history: order.status_history().to_vec(),
            order_date: order.order_date(),
            expected_delivery: order.expected_delivery(),
            completed_date: order.completed_date(),
            delivered_date: order.delivered_date(),
            notes: order.notes().map(str::to_string),
            payment_ids: order.payment_ids().to_vec(),
            created_by: order.created_by().to_string(),
        }
    }
}

/// POST /orders
#[tracing::instrument(skip_all)]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    ApiJson(new): ApiJson<NewOrder>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = state.office.orders.create_order(new, &actor).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /orders
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _actor: CurrentActor,
    ApiQuery(query): ApiQuery<OrderListQuery>,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    Ok(Json(state.reports.list_orders(&query).await?))
}

/// GET /orders/{id}
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _actor: CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.office.orders.get_order(parse_id(&id)?).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// PATCH /orders/{id}
#[tracing::instrument(skip_all)]
pub async fn update<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<OrderPatch>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .office
        .orders
        .update_order(parse_id(&id)?, patch, &actor)
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// DELETE /orders/{id}
#[tracing::instrument(skip_all)]
pub async fn delete<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.office.orders.delete_order(parse_id(&id)?, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /orders/{id}/status
#[tracing::instrument(skip_all)]
pub async fn change_status<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ChangeStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .office
        .orders
        .change_status(parse_id(&id)?, req.status, req.comment, &actor)
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// GET /orders/{id}/balance
pub async fn balance<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _actor: CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<Balance>, ApiError> {
    Ok(Json(state.office.orders.get_balance(parse_id(&id)?).await?))
}

/// GET /orders/{id}/payments
pub async fn list_payments<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _actor: CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<Vec<PaymentResponse>>, ApiError> {
    let payments = state.office.orders.list_payments(parse_id(&id)?).await?;
    Ok(Json(payments.iter().map(PaymentResponse::from).collect()))
}

/// POST /orders/{id}/payments
#[tracing::instrument(skip_all)]
pub async fn record_payment<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    ApiJson(new): ApiJson<NewPayment>,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError> {
    let payment = state
        .office
        .payments
        .record_payment(parse_id(&id)?, new, &actor)
        .await?;
    Ok((StatusCode::CREATED, Json(PaymentResponse::from(&payment))))
}
