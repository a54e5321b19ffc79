//! Read models and report queries for the atelier back office.
//!
//! - [`Projection`] trait for folding committed events into read models
//! - [`ProjectionProcessor`] replays the store by global position
//! - Views over orders, payments and clients
//! - [`Reports`] answers the typed queries in [`queries`]
//!
//! Projections only read from the store; they never append.

pub mod error;
pub mod processor;
pub mod projection;
pub mod queries;
pub mod read_model;
pub mod reports;
pub mod views;

pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition};
pub use queries::{
    CompletionTimeQuery, CompletionTimeReport, DashboardSummary, DateRange, Granularity,
    OrderListQuery, PriorityCount, RevenueBucket, RevenueQuery, RevenueReport, StatusBreakdown,
    StatusBreakdownQuery, StatusCount, TopClientsQuery,
};
pub use read_model::ReadModel;
pub use reports::Reports;
pub use views::{ClientSummary, ClientsView, OrderSummary, OrdersView, PaymentSummary, PaymentsView};
