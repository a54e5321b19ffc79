//! Order aggregate and related types.

mod aggregate;
mod events;
mod number;
mod status;
mod value_objects;

pub use aggregate::{CREATED_COMMENT, Order};
pub use events::{
    OrderCreatedData, OrderDeletedData, OrderEvent, OrderStatusChangedData, OrderUpdatedData,
    PaymentLinkedData, PaymentStatusRecomputedData,
};
pub use number::{OrderNumberIssuedData, OrderNumberSequence, SequenceEvent, sequence_stream_id};
pub use status::OrderStatus;
pub use value_objects::{
    LineItem, NewOrder, OrderNumber, OrderPatch, Pricing, Priority, StatusHistoryEntry,
};

use thiserror::Error;

use crate::error::ErrorKind;
use crate::money::Money;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order does not exist")]
    NotCreated,

    #[error("Order already created")]
    AlreadyCreated,

    #[error("Order has been deleted")]
    Deleted,

    #[error("Order has no items")]
    NoItems,

    #[error("Invalid quantity on item {index} (must be at least 1)")]
    InvalidQuantity { index: usize },

    #[error("Invalid unit price {price} on item {index} (must not be negative)")]
    InvalidUnitPrice { index: usize, price: Money },

    #[error("Invalid {field}: {amount} (must not be negative)")]
    NegativeAmount { field: &'static str, amount: Money },

    #[error("Order amount is too large")]
    AmountOverflow,

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order cannot be edited while {status}")]
    NotEditable { status: OrderStatus },

    #[error("Sequence for period {expected} cannot issue numbers for {actual}")]
    SequencePeriodMismatch { expected: String, actual: String },
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::NotCreated | OrderError::Deleted => ErrorKind::NotFound,
            OrderError::AlreadyCreated => ErrorKind::Conflict,
            OrderError::NoItems
            | OrderError::InvalidQuantity { .. }
            | OrderError::InvalidUnitPrice { .. }
            | OrderError::NegativeAmount { .. }
            | OrderError::AmountOverflow => ErrorKind::InvalidAmount,
            OrderError::InvalidTransition { .. } | OrderError::NotEditable { .. } => {
                ErrorKind::InvalidState
            }
            OrderError::SequencePeriodMismatch { .. } => ErrorKind::Internal,
        }
    }
}
