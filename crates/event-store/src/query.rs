use chrono::{DateTime, Utc};

use crate::{AggregateId, EventEnvelope, Position};

/// Filter for [`EventStore::query_events`](crate::EventStore::query_events).
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub aggregate_id: Option<AggregateId>,

    pub aggregate_type: Option<String>,

    /// Any of these event types.
    pub event_types: Option<Vec<String>>,

    /// Only events strictly after this position.
    pub after_position: Option<Position>,

    /// Inclusive lower bound on the event timestamp.
    pub from_timestamp: Option<DateTime<Utc>>,

    /// Inclusive upper bound on the event timestamp.
    pub to_timestamp: Option<DateTime<Utc>>,

    pub limit: Option<usize>,
}

impl EventQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_aggregate(aggregate_id: AggregateId) -> Self {
        Self {
            aggregate_id: Some(aggregate_id),
            ..Default::default()
        }
    }

    pub fn aggregate_type(mut self, aggregate_type: impl Into<String>) -> Self {
        self.aggregate_type = Some(aggregate_type.into());
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_types
            .get_or_insert_with(Vec::new)
            .push(event_type.into());
        self
    }

    pub fn after(mut self, position: Position) -> Self {
        self.after_position = Some(position);
        self
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from_timestamp = Some(from);
        self.to_timestamp = Some(to);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if `event` passes every filter except `limit`.
    pub fn matches(&self, event: &EventEnvelope) -> bool {
        if self.aggregate_id.is_some_and(|id| id != event.aggregate_id) {
            return false;
        }
        if let Some(ref agg_type) = self.aggregate_type
            && &event.aggregate_type != agg_type
        {
            return false;
        }
        if let Some(ref types) = self.event_types
            && !types.contains(&event.event_type)
        {
            return false;
        }
        if self.after_position.is_some_and(|p| event.position <= p) {
            return false;
        }
        if self.from_timestamp.is_some_and(|from| event.timestamp < from) {
            return false;
        }
        if self.to_timestamp.is_some_and(|to| event.timestamp > to) {
            return false;
        }
        true
    }
}
