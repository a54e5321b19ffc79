//! Core projection trait and position tracking.

use async_trait::async_trait;
use domain::DomainEvent;
use event_store::{EventEnvelope, Position};

use crate::{ProjectionError, Result};

/// How far a projection has read through the global event order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionPosition {
    /// Position of the last event handled.
    pub last: Position,

    pub events_processed: u64,
}

impl ProjectionPosition {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Records that the event at `position` has been handled.
    pub fn advance_to(&self, position: Position) -> Self {
        Self {
            last: position.max(self.last),
            events_processed: self.events_processed + 1,
        }
    }

    /// Returns true if the event at `position` has not been handled yet.
    pub fn is_behind(&self, position: Position) -> bool {
        self.last < position
    }
}

impl std::fmt::Display for ProjectionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} events)", self.last, self.events_processed)
    }
}

/// A projection that processes events and updates a read model.
#[async_trait]
pub trait Projection: Send + Sync {
    fn name(&self) -> &'static str;

    /// Handles one committed event. Events of other aggregate types are
    /// skipped but still advance the position.
    async fn handle(&self, event: &EventEnvelope) -> Result<()>;

    async fn position(&self) -> ProjectionPosition;

    /// Clears the read model and rewinds to the start of the store.
    async fn reset(&self) -> Result<()>;
}

/// Decodes `event` into `E` if it belongs to `aggregate_type`.
pub(crate) fn decode_for<E: DomainEvent>(
    event: &EventEnvelope,
    aggregate_type: &str,
) -> Result<Option<E>> {
    if event.aggregate_type != aggregate_type {
        return Ok(None);
    }
    event
        .decode::<E>()
        .map(Some)
        .map_err(|source| ProjectionError::Deserialization {
            event_type: event.event_type.clone(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_to_event_position() {
        let pos = ProjectionPosition::zero().advance_to(Position::new(3));
        assert_eq!(pos.last, Position::new(3));
        assert_eq!(pos.events_processed, 1);
        assert!(pos.is_behind(Position::new(4)));
        assert!(!pos.is_behind(Position::new(3)));
    }

    #[test]
    fn never_moves_backwards() {
        let pos = ProjectionPosition::zero()
            .advance_to(Position::new(9))
            .advance_to(Position::new(2));
        assert_eq!(pos.last, Position::new(9));
    }

    #[test]
    fn display() {
        let pos = ProjectionPosition {
            last: Position::new(42),
            events_processed: 40,
        };
        assert_eq!(pos.to_string(), "#42 (40 events)");
    }
}
