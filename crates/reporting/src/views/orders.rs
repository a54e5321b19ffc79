//! Order summaries for listings, breakdowns and completion times.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{Money, OrderEvent, OrderStatus, PaymentStatus, Priority};
use event_store::EventEnvelope;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::{
    Result,
    projection::{Projection, ProjectionPosition, decode_for},
    read_model::ReadModel,
};

/// Denormalized view of one live order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub order_id: AggregateId,
    pub order_number: String,
    pub client_id: AggregateId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub priority: Priority,
    pub item_count: usize,
    pub total: Money,
    pub total_paid: Money,
    pub order_date: DateTime<Utc>,
    pub expected_delivery: Option<DateTime<Utc>>,
    pub completed_date: Option<DateTime<Utc>>,
    pub delivered_date: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl OrderSummary {
    /// Amount still owed; never negative.
    pub fn outstanding(&self) -> Money {
        domain::clamp_non_negative(self.total - self.total_paid)
    }

    /// Hours from order to completion, if the order has completed.
    pub fn completion_hours(&self) -> Option<f64> {
        self.completed_date
            .map(|done| (done - self.order_date).num_seconds() as f64 / 3600.0)
    }
}

/// Orders keyed by id. Deleted orders drop out of the view.
#[derive(Clone, Default)]
pub struct OrdersView {
    orders: Arc<RwLock<HashMap<AggregateId, OrderSummary>>>,
    position: Arc<RwLock<ProjectionPosition>>,

    /// Entry count as of the last completed write.
    size: Arc<AtomicUsize>,
}

impl OrdersView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, order_id: AggregateId) -> Option<OrderSummary> {
        self.orders.read().await.get(&order_id).cloned()
    }

    /// All live orders, newest first.
    pub async fn all(&self) -> Vec<OrderSummary> {
        let mut orders: Vec<_> = self.orders.read().await.values().cloned().collect();
        orders.sort_by(|a, b| {
            b.order_date
                .cmp(&a.order_date)
                .then_with(|| b.order_number.cmp(&a.order_number))
        });
        orders
    }

    fn apply(orders: &mut HashMap<AggregateId, OrderSummary>, id: AggregateId, event: OrderEvent) {
        match event {
            OrderEvent::OrderCreated(data) => {
                orders.insert(
                    id,
                    OrderSummary {
                        order_id: id,
                        order_number: data.order_number.as_str().to_string(),
                        client_id: data.client_id,
                        status: OrderStatus::Pending,
                        payment_status: data.payment_status,
                        priority: data.priority,
                        item_count: data.items.len(),
                        total: data.pricing.total,
                        total_paid: Money::zero(),
                        order_date: data.created_at,
                        expected_delivery: data.expected_delivery,
                        completed_date: None,
                        delivered_date: None,
                        updated_at: data.created_at,
                    },
                );
            }
            OrderEvent::OrderUpdated(data) => {
                let Some(order) = orders.get_mut(&id) else { return };
                if let Some(items) = data.items {
                    order.item_count = items.len();
                }
                if let Some(pricing) = data.pricing {
                    order.total = pricing.total;
                }
                if let Some(priority) = data.priority {
                    order.priority = priority;
                }
                if let Some(expected) = data.expected_delivery {
                    order.expected_delivery = expected;
                }
                order.updated_at = data.updated_at;
            }
            OrderEvent::OrderStatusChanged(data) => {
                let Some(order) = orders.get_mut(&id) else { return };
                order.status = data.to;
                match data.to {
                    OrderStatus::Completed => order.completed_date = Some(data.changed_at),
                    OrderStatus::Delivered => order.delivered_date = Some(data.changed_at),
                    status if status.is_active() => order.completed_date = None,
                    _ => {}
                }
                order.updated_at = data.changed_at;
            }
            OrderEvent::PaymentLinked(_) => {}
            OrderEvent::PaymentStatusRecomputed(data) => {
                let Some(order) = orders.get_mut(&id) else { return };
                order.payment_status = data.payment_status;
                order.total_paid = data.total_paid;
                order.updated_at = data.recomputed_at;
            }
            OrderEvent::OrderDeleted(_) => {
                orders.remove(&id);
            }
        }
    }
}

#[async_trait]
impl Projection for OrdersView {
    fn name(&self) -> &'static str {
        "orders"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        if let Some(order_event) = decode_for::<OrderEvent>(event, "Order")? {
            let mut orders = self.orders.write().await;
            Self::apply(&mut orders, event.aggregate_id, order_event);
            self.size.store(orders.len(), Ordering::Relaxed);
        }

        let mut position = self.position.write().await;
        *position = position.advance_to(event.position);
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        *self.position.read().await
    }

    async fn reset(&self) -> Result<()> {
        self.orders.write().await.clear();
        self.size.store(0, Ordering::Relaxed);
        *self.position.write().await = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for OrdersView {
    fn name(&self) -> &'static str {
        "orders"
    }

    fn count(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }
}
