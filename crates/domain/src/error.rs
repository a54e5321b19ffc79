//! Domain error types.

use common::AggregateId;
use event_store::EventStoreError;
use thiserror::Error;

use crate::client::ClientError;
use crate::order::OrderError;
use crate::payment::PaymentError;

/// Coarse classification callers use to decide how to report a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced entity does not exist (or was deleted).
    NotFound,
    /// The entity's current state forbids the operation.
    InvalidState,
    /// A numeric constraint was violated.
    InvalidAmount,
    /// The operation conflicts with other data (or a concurrent writer).
    Conflict,
    /// Storage or serialization failure.
    Internal,
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: AggregateId,
    },

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: AggregateId) -> Self {
        DomainError::NotFound { entity, id }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::Client(e) => e.kind(),
            DomainError::Order(e) => e.kind(),
            DomainError::Payment(e) => e.kind(),
            DomainError::EventStore(EventStoreError::ConcurrencyConflict { .. }) => {
                ErrorKind::Conflict
            }
            DomainError::EventStore(_) | DomainError::Serialization(_) => ErrorKind::Internal,
        }
    }
}
