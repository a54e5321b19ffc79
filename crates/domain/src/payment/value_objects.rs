//! Value objects for the payment ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    MobileMoney,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank-transfer",
            PaymentMethod::MobileMoney => "mobile-money",
            PaymentMethod::Other => "other",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a single payment.
///
/// Payments recorded by staff are `Completed` on arrival. Only completed
/// payments count toward an order's paid total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentState {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
    Cancelled,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Pending => "pending",
            PaymentState::Completed => "completed",
            PaymentState::Failed => "failed",
            PaymentState::Refunded => "refunded",
            PaymentState::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for PaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Refund sub-record attached to a refunded payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    pub amount: Money,
    pub reason: String,
    pub refunded_by: String,
    pub refunded_at: DateTime<Utc>,
}

/// Input for recording a payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub amount: Money,
    pub method: PaymentMethod,

    /// External reference (card slip, transfer id, ...).
    pub reference: Option<String>,
    pub notes: Option<String>,
}

impl NewPayment {
    pub fn new(amount: Money, method: PaymentMethod) -> Self {
        Self {
            amount,
            method,
            reference: None,
            notes: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    pub amount: Money,
    pub reason: String,
}

impl RefundRequest {
    pub fn new(amount: Money, reason: impl Into<String>) -> Self {
        Self {
            amount,
            reason: reason.into(),
        }
    }
}
