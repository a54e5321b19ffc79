//! Core aggregate and domain event traits.

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::DomainError;

/// Trait for domain events.
///
/// Domain events are immutable facts, named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name stored alongside the payload.
    fn event_type(&self) -> &'static str;
}

/// Trait for event-sourced entities.
///
/// An aggregate is rebuilt by replaying its events through [`apply`], which
/// must be pure and infallible. Command methods live on the concrete types and
/// return the events a command would produce, or an error.
///
/// [`apply`]: Aggregate::apply
pub trait Aggregate: Default + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors this aggregate's commands can produce.
    type Error: std::error::Error + Send + Sync + Into<DomainError>;

    /// Stream type name, stored on every envelope.
    fn aggregate_type() -> &'static str;

    /// Returns the stream id, or `None` before the first event.
    fn id(&self) -> Option<AggregateId>;

    /// Version of the last applied event (0 for a fresh aggregate).
    fn version(&self) -> Version;

    fn set_version(&mut self, version: Version);

    /// Applies an event to the aggregate, updating its state.
    fn apply(&mut self, event: Self::Event);

    /// Returns true while the entity exists and has not been deleted.
    fn is_live(&self) -> bool {
        self.id().is_some()
    }

    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}
