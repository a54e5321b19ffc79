//! Payment rows for revenue reports.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{Money, PaymentEvent, PaymentMethod, PaymentState};
use event_store::EventEnvelope;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::{
    Result,
    projection::{Projection, ProjectionPosition, decode_for},
    read_model::ReadModel,
};

#[derive(Debug, Clone, Serialize)]
pub struct PaymentSummary {
    pub payment_id: AggregateId,
    pub order_id: AggregateId,
    pub client_id: AggregateId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub state: PaymentState,
    pub recorded_at: DateTime<Utc>,
    pub refunded_amount: Option<Money>,
    pub refunded_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Default)]
pub struct PaymentsView {
    payments: Arc<RwLock<HashMap<AggregateId, PaymentSummary>>>,
    position: Arc<RwLock<ProjectionPosition>>,

    /// Entry count as of the last completed write.
    size: Arc<AtomicUsize>,
}

impl PaymentsView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, payment_id: AggregateId) -> Option<PaymentSummary> {
        self.payments.read().await.get(&payment_id).cloned()
    }

    /// Completed payments recorded within `[from, to]`, oldest first.
    /// Missing bounds are open.
    pub async fn completed_between(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Vec<PaymentSummary> {
        let payments = self.payments.read().await;
        let mut completed: Vec<_> = payments
            .values()
            .filter(|p| p.state == PaymentState::Completed)
            .filter(|p| from.is_none_or(|from| p.recorded_at >= from))
            .filter(|p| to.is_none_or(|to| p.recorded_at <= to))
            .cloned()
            .collect();
        completed.sort_by_key(|p| p.recorded_at);
        completed
    }
}

#[async_trait]
impl Projection for PaymentsView {
    fn name(&self) -> &'static str {
        "payments"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        if let Some(payment_event) = decode_for::<PaymentEvent>(event, "Payment")? {
            let mut payments = self.payments.write().await;
            match payment_event {
                PaymentEvent::PaymentRecorded(data) => {
                    payments.insert(
                        event.aggregate_id,
                        PaymentSummary {
                            payment_id: data.payment_id,
                            order_id: data.order_id,
                            client_id: data.client_id,
                            amount: data.amount,
                            method: data.method,
                            state: data.state,
                            recorded_at: data.recorded_at,
                            refunded_amount: None,
                            refunded_at: None,
                        },
                    );
                }
                PaymentEvent::PaymentRefunded(data) => {
                    if let Some(payment) = payments.get_mut(&event.aggregate_id) {
                        payment.state = PaymentState::Refunded;
                        payment.refunded_amount = Some(data.amount);
                        payment.refunded_at = Some(data.refunded_at);
                    }
                }
            }
            self.size.store(payments.len(), Ordering::Relaxed);
        }

        let mut position = self.position.write().await;
        *position = position.advance_to(event.position);
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        *self.position.read().await
    }

    async fn reset(&self) -> Result<()> {
        self.payments.write().await.clear();
        self.size.store(0, Ordering::Relaxed);
        *self.position.write().await = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for PaymentsView {
    fn name(&self) -> &'static str {
        "payments"
    }

    fn count(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }
}
