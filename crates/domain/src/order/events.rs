//! Order domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::money::Money;
use crate::settlement::PaymentStatus;

use super::{LineItem, OrderNumber, OrderStatus, Pricing, Priority};

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    OrderCreated(OrderCreatedData),

    /// Editable fields changed.
    OrderUpdated(OrderUpdatedData),

    OrderStatusChanged(OrderStatusChangedData),

    /// A payment was recorded against the order.
    PaymentLinked(PaymentLinkedData),

    /// The derived payment status or paid total changed.
    PaymentStatusRecomputed(PaymentStatusRecomputedData),

    OrderDeleted(OrderDeletedData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated(_) => "OrderCreated",
            OrderEvent::OrderUpdated(_) => "OrderUpdated",
            OrderEvent::OrderStatusChanged(_) => "OrderStatusChanged",
            OrderEvent::PaymentLinked(_) => "PaymentLinked",
            OrderEvent::PaymentStatusRecomputed(_) => "PaymentStatusRecomputed",
            OrderEvent::OrderDeleted(_) => "OrderDeleted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedData {
    pub order_id: AggregateId,
    pub order_number: OrderNumber,
    pub client_id: AggregateId,
    pub items: Vec<LineItem>,
    pub pricing: Pricing,
    pub priority: Priority,
    pub expected_delivery: Option<DateTime<Utc>>,
    pub notes: Option<String>,

    /// Payment status at creation; `paid` for a zero-total order.
    pub payment_status: PaymentStatus,

    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Only the fields that changed are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderUpdatedData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<LineItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<Pricing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::patch::clearable"
    )]
    pub expected_delivery: Option<Option<DateTime<Utc>>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::patch::clearable"
    )]
    pub notes: Option<Option<String>>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
}

impl OrderUpdatedData {
    pub fn changes_nothing(&self) -> bool {
        self.items.is_none()
            && self.pricing.is_none()
            && self.priority.is_none()
            && self.expected_delivery.is_none()
            && self.notes.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusChangedData {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub comment: Option<String>,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentLinkedData {
    pub payment_id: AggregateId,
    pub amount: Money,
    pub linked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusRecomputedData {
    pub payment_status: PaymentStatus,
    pub total_paid: Money,
    pub recomputed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDeletedData {
    pub deleted_by: String,
    pub deleted_at: DateTime<Utc>,
}
