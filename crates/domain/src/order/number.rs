//! Monthly order-number sequences.
//!
//! Each `YYYYMM` period has its own stream. Issuing a number appends to that
//! stream in the same commit that creates the order, so two creates racing on
//! one period cannot both succeed with the same number.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::{Aggregate, DomainEvent};

use super::{OrderError, OrderNumber};

/// Namespace for deriving sequence stream ids from their period.
const SEQUENCE_NAMESPACE: Uuid = Uuid::from_u128(0x4f52_4453_4551_4e53_8000_0000_0000_0001);

/// Stream id of the sequence for `period`.
pub fn sequence_stream_id(period: &str) -> AggregateId {
    AggregateId::named(AggregateId::from_uuid(SEQUENCE_NAMESPACE), period)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SequenceEvent {
    OrderNumberIssued(OrderNumberIssuedData),
}

impl DomainEvent for SequenceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SequenceEvent::OrderNumberIssued(_) => "OrderNumberIssued",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderNumberIssuedData {
    pub sequence_id: AggregateId,
    pub period: String,
    pub sequence: u32,
    pub order_id: AggregateId,
    pub issued_at: DateTime<Utc>,
}

/// Counter of order numbers issued within one month.
#[derive(Debug, Clone, Default)]
pub struct OrderNumberSequence {
    id: Option<AggregateId>,
    version: Version,
    period: String,
    last: u32,
}

impl Aggregate for OrderNumberSequence {
    type Event = SequenceEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "OrderNumberSequence"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            SequenceEvent::OrderNumberIssued(data) => {
                self.id = Some(data.sequence_id);
                self.period = data.period;
                self.last = data.sequence;
            }
        }
    }
}

impl OrderNumberSequence {
    pub fn period(&self) -> &str {
        &self.period
    }

    /// Number of orders issued so far in this period.
    pub fn issued(&self) -> u32 {
        self.last
    }

    /// The most recently issued number, if any.
    pub fn last_number(&self) -> Option<OrderNumber> {
        (self.last > 0).then(|| OrderNumber::new(&self.period, self.last))
    }

    /// Issues the next number of `period` to `order_id`.
    pub fn issue(
        &self,
        period: &str,
        order_id: AggregateId,
        at: DateTime<Utc>,
    ) -> Result<Vec<SequenceEvent>, OrderError> {
        if self.id.is_some() && self.period != period {
            return Err(OrderError::SequencePeriodMismatch {
                expected: self.period.clone(),
                actual: period.to_string(),
            });
        }

        Ok(vec![SequenceEvent::OrderNumberIssued(OrderNumberIssuedData {
            sequence_id: sequence_stream_id(period),
            period: period.to_string(),
            sequence: self.last + 1,
            order_id,
            issued_at: at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_id_is_stable_per_period() {
        assert_eq!(sequence_stream_id("202405"), sequence_stream_id("202405"));
        assert_ne!(sequence_stream_id("202405"), sequence_stream_id("202406"));
    }

    #[test]
    fn issues_consecutive_numbers() {
        let mut sequence = OrderNumberSequence::default();
        assert_eq!(sequence.last_number(), None);

        for _ in 0..3 {
            let events = sequence.issue("202405", AggregateId::new(), Utc::now()).unwrap();
            sequence.apply_events(events);
        }

        assert_eq!(sequence.issued(), 3);
        assert_eq!(sequence.last_number().unwrap().as_str(), "ORD-2024050003");
    }

    #[test]
    fn rejects_foreign_period() {
        let mut sequence = OrderNumberSequence::default();
        sequence.apply_events(sequence.issue("202405", AggregateId::new(), Utc::now()).unwrap());
        assert!(matches!(
            sequence.issue("202406", AggregateId::new(), Utc::now()),
            Err(OrderError::SequencePeriodMismatch { .. })
        ));
    }
}
