use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AggregateId;

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an event ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-stream version number, used for optimistic concurrency control.
///
/// A stream with no events is at version 0; its first event is version 1.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// The version of a stream that has no events yet.
    pub fn initial() -> Self {
        Self(0)
    }

    /// The version carried by a stream's first event.
    pub fn first() -> Self {
        Self(1)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Global, store-assigned position of an event across all streams.
///
/// Positions strictly increase in commit order, so replaying by position
/// reproduces the exact order in which multi-stream commits landed. Events
/// that have not been committed yet sit at position 0.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Position(i64);

impl Position {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Position before the first committed event.
    pub fn start() -> Self {
        Self(0)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A stored event together with its stream metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: EventId,

    /// The type of the event (e.g. "OrderCreated", "PaymentRefunded").
    pub event_type: String,

    /// The stream this event belongs to.
    pub aggregate_id: AggregateId,

    /// The kind of stream (e.g. "Order", "Client").
    pub aggregate_type: String,

    /// Version of the stream after this event.
    pub version: Version,

    /// Global position, assigned by the store on commit.
    #[serde(default)]
    pub position: Position,

    pub timestamp: DateTime<Utc>,

    /// The event payload as JSON.
    pub payload: serde_json::Value,

    /// Free-form metadata (acting staff member, correlation ids, ...).
    pub metadata: HashMap<String, serde_json::Value>,
}

impl EventEnvelope {
    /// Wraps a raw JSON payload. The timestamp defaults to now.
    pub fn new(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event_type: impl Into<String>,
        version: Version,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            event_type: event_type.into(),
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            version,
            position: Position::start(),
            timestamp: Utc::now(),
            payload,
            metadata: HashMap::new(),
        }
    }

    /// Serializes `payload` and wraps it.
    pub fn from_payload<T: Serialize>(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event_type: impl Into<String>,
        version: Version,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(
            aggregate_id,
            aggregate_type,
            event_type,
            version,
            serde_json::to_value(payload)?,
        ))
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Deserializes the payload into a concrete event type.
    pub fn decode<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_ordering() {
        let v1 = Version::new(1);
        let v2 = Version::new(2);
        assert!(v1 < v2);
        assert_eq!(v1.next(), v2);
        assert_eq!(Version::initial().next(), Version::first());
    }

    #[test]
    fn position_display() {
        assert_eq!(Position::new(7).to_string(), "#7");
        assert_eq!(Position::start().next(), Position::new(1));
    }

    #[test]
    fn envelope_from_payload_and_decode() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Paid {
            cents: i64,
        }

        let id = AggregateId::new();
        let envelope =
            EventEnvelope::from_payload(id, "Payment", "PaymentRecorded", Version::first(), &Paid {
                cents: 4000,
            })
            .unwrap()
            .with_metadata("actor", serde_json::json!("u-1"));

        assert_eq!(envelope.aggregate_id, id);
        assert_eq!(envelope.position, Position::start());
        assert_eq!(envelope.metadata.get("actor"), Some(&serde_json::json!("u-1")));
        assert_eq!(envelope.decode::<Paid>().unwrap(), Paid { cents: 4000 });
    }
}
