//! Order fulfillment and payment reconciliation core.
//!
//! This crate keeps four things consistent with each other:
//! - an order's status and its append-only status history,
//! - the order's payment status, always derived from its payment ledger,
//! - the order's running balance,
//! - the owning client's rollups (`total_orders`, `total_spent`,
//!   `last_order_date`).
//!
//! Every entity is an event-sourced [`Aggregate`]. Operations that touch more
//! than one entity stage their events in a [`UnitOfWork`] and land as one
//! atomic commit.

pub mod aggregate;
pub mod client;
pub mod error;
pub mod locks;
pub mod money;
pub mod order;
mod patch;
pub mod payment;
pub mod repository;
pub mod services;
pub mod settlement;

pub use aggregate::{Aggregate, DomainEvent};
pub use client::{Client, ClientDetails, ClientDetailsPatch, ClientError, ClientEvent};
pub use error::{DomainError, ErrorKind};
pub use locks::StreamLocks;
pub use money::Money;
pub use order::{
    LineItem, NewOrder, Order, OrderError, OrderEvent, OrderNumber, OrderNumberSequence,
    OrderPatch, OrderStatus, Pricing, Priority, StatusHistoryEntry,
};
pub use payment::{
    NewPayment, Payment, PaymentError, PaymentEvent, PaymentMethod, PaymentState, Refund,
    RefundRequest,
};
pub use repository::{CommandResult, Loaded, Repository, UnitOfWork};
pub use services::{BackOffice, ClientStatistics, OrderManager, PaymentLedger};
pub use settlement::{
    Balance, PaymentStatus, clamp_non_negative, compute_balance, compute_subtotal,
    compute_total, derive_payment_status, settle_payment_status,
};
