//! Payment domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::money::Money;

use super::{PaymentMethod, PaymentState};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PaymentEvent {
    PaymentRecorded(PaymentRecordedData),
    PaymentRefunded(PaymentRefundedData),
}

impl DomainEvent for PaymentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PaymentEvent::PaymentRecorded(_) => "PaymentRecorded",
            PaymentEvent::PaymentRefunded(_) => "PaymentRefunded",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecordedData {
    pub payment_id: AggregateId,
    pub order_id: AggregateId,

    /// Copied from the order when the payment is recorded.
    pub client_id: AggregateId,

    pub amount: Money,
    pub method: PaymentMethod,
    pub state: PaymentState,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub recorded_by: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRefundedData {
    pub amount: Money,
    pub reason: String,
    pub refunded_by: String,
    pub refunded_at: DateTime<Utc>,
}
