//! Event persistence for the atelier ledger.
//!
//! Every entity (client, order, payment, order-number sequence) is an event
//! stream. Writers hand the store a [`Commit`] that may span several streams;
//! the store applies it atomically or not at all, checking each stream's
//! expected version for optimistic concurrency.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventId, Position, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use query::EventQuery;
pub use store::{Commit, EventStore, EventStoreExt, EventStream, StreamAppend};
