//! Payment endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{Aggregate, Money, Payment, PaymentMethod, PaymentState, Refund, RefundRequest};
use event_store::EventStore;
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{ApiJson, CurrentActor, parse_id};

#[derive(Serialize)]
pub struct PaymentResponse {
    pub id: Option<AggregateId>,
    pub order_id: Option<AggregateId>,
    pub client_id: Option<AggregateId>,
    pub amount: Money,
    pub method: Option<PaymentMethod>,
    pub state: PaymentState,
    pub refund: Option<Refund>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub recorded_by: String,
    pub recorded_at: Option<DateTime<Utc>>,
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        Self {
            id: payment.id(),
            order_id: payment.order_id(),
            client_id: payment.client_id(),
            amount: payment.amount(),
            method: payment.method(),
            state: payment.state(),
            refund: payment.refund().cloned(),
            reference: payment.reference().map(str::to_string),
            notes: payment.notes().map(str::to_string),
            recorded_by: payment.recorded_by().to_string(),
            recorded_at: payment.recorded_at(),
        }
    }
}

/// GET /payments/{id}
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _actor: CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let payment = state.office.payments.get_payment(parse_id(&id)?).await?;
    Ok(Json(PaymentResponse::from(&payment)))
}

/// POST /payments/{id}/refund
#[tracing::instrument(skip_all)]
pub async fn refund<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<RefundRequest>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let payment = state
        .office
        .payments
        .refund_payment(parse_id(&id)?, request, &actor)
        .await?;
    Ok(Json(PaymentResponse::from(&payment)))
}
