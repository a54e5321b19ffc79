//! Payment ledger aggregate and related types.

mod aggregate;
mod events;
mod value_objects;

pub use aggregate::Payment;
pub use events::{PaymentEvent, PaymentRecordedData, PaymentRefundedData};
pub use value_objects::{NewPayment, PaymentMethod, PaymentState, Refund, RefundRequest};

use thiserror::Error;

use crate::error::ErrorKind;
use crate::money::Money;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment does not exist")]
    NotRecorded,

    #[error("Payment already recorded")]
    AlreadyRecorded,

    #[error("Invalid payment amount: {0} (must be greater than 0)")]
    NonPositiveAmount(Money),

    #[error("Payment cannot be refunded while {state}")]
    NotRefundable { state: PaymentState },

    #[error("Invalid refund amount: {0} (must be greater than 0)")]
    NonPositiveRefund(Money),

    #[error("Refund of {requested} exceeds payment amount {available}")]
    RefundExceedsPayment { requested: Money, available: Money },

    #[error("Completed payments on the order would overflow")]
    LedgerOverflow,
}

impl PaymentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaymentError::NotRecorded => ErrorKind::NotFound,
            PaymentError::AlreadyRecorded => ErrorKind::Conflict,
            PaymentError::NotRefundable { .. } => ErrorKind::InvalidState,
            PaymentError::NonPositiveAmount(_)
            | PaymentError::NonPositiveRefund(_)
            | PaymentError::RefundExceedsPayment { .. }
            | PaymentError::LedgerOverflow => ErrorKind::InvalidAmount,
        }
    }
}
