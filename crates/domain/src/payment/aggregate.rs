//! Payment aggregate implementation.

use chrono::{DateTime, Utc};
use common::{Actor, AggregateId};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::money::Money;

use super::{
    NewPayment, PaymentError, PaymentEvent, PaymentMethod, PaymentState, Refund, RefundRequest,
    events::{PaymentRecordedData, PaymentRefundedData},
};

/// A single payment against an order. Payments are never deleted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Payment {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    order_id: Option<AggregateId>,
    client_id: Option<AggregateId>,
    amount: Money,
    method: Option<PaymentMethod>,
    state: PaymentState,
    refund: Option<Refund>,
    reference: Option<String>,
    notes: Option<String>,
    recorded_by: String,
    recorded_at: Option<DateTime<Utc>>,
}

impl Aggregate for Payment {
    type Event = PaymentEvent;
    type Error = PaymentError;

    fn aggregate_type() -> &'static str {
        "Payment"
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
            PaymentEvent::PaymentRecorded(data) => {
                self.id = Some(data.payment_id);
                self.order_id = Some(data.order_id);
                self.client_id = Some(data.client_id);
                self.amount = data.amount;
                self.method = Some(data.method);
                self.state = data.state;
                self.reference = data.reference;
                self.notes = data.notes;
                self.recorded_by = data.recorded_by;
                self.recorded_at = Some(data.recorded_at);
            }
            PaymentEvent::PaymentRefunded(data) => {
                self.state = PaymentState::Refunded;
                self.refund = Some(Refund {
                    amount: data.amount,
                    reason: data.reason,
                    refunded_by: data.refunded_by,
                    refunded_at: data.refunded_at,
                });
            }
        }
    }
}

impl Payment {
    pub fn order_id(&self) -> Option<AggregateId> {
        self.order_id
    }

    pub fn client_id(&self) -> Option<AggregateId> {
        self.client_id
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn method(&self) -> Option<PaymentMethod> {
        self.method
    }

    pub fn state(&self) -> PaymentState {
        self.state
    }

    pub fn refund(&self) -> Option<&Refund> {
        self.refund.as_ref()
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn recorded_by(&self) -> &str {
        &self.recorded_by
    }

    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        self.recorded_at
    }

    /// Records a completed payment.
    pub fn record(
        &self,
        payment_id: AggregateId,
        order_id: AggregateId,
        client_id: AggregateId,
        new: NewPayment,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<Vec<PaymentEvent>, PaymentError> {
        if self.id.is_some() {
            return Err(PaymentError::AlreadyRecorded);
        }
        if !new.amount.is_positive() {
            return Err(PaymentError::NonPositiveAmount(new.amount));
        }

        Ok(vec![PaymentEvent::PaymentRecorded(PaymentRecordedData {
            payment_id,
            order_id,
            client_id,
            amount: new.amount,
            method: new.method,
            state: PaymentState::Completed,
            reference: new.reference,
            notes: new.notes,
            recorded_by: actor.id.clone(),
            recorded_at: at,
        })])
    }

    /// Refunds the payment. Any refund, partial or full, moves the whole
    /// payment to `refunded`.
    pub fn refund_payment(
        &self,
        request: RefundRequest,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<Vec<PaymentEvent>, PaymentError> {
        if self.id.is_none() {
            return Err(PaymentError::NotRecorded);
        }
        if self.state != PaymentState::Completed {
            return Err(PaymentError::NotRefundable { state: self.state });
        }
        if !request.amount.is_positive() {
            return Err(PaymentError::NonPositiveRefund(request.amount));
        }
        if request.amount > self.amount {
            return Err(PaymentError::RefundExceedsPayment {
                requested: request.amount,
                available: self.amount,
            });
        }

        Ok(vec![PaymentEvent::PaymentRefunded(PaymentRefundedData {
            amount: request.amount,
            reason: request.reason,
            refunded_by: actor.id.clone(),
            refunded_at: at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorded(cents: i64) -> Payment {
        let mut payment = Payment::default();
        let events = payment
            .record(
                AggregateId::new(),
                AggregateId::new(),
                AggregateId::new(),
                NewPayment::new(Money::from_cents(cents), PaymentMethod::Cash).with_reference("R-1"),
                &Actor::system(),
                Utc::now(),
            )
            .unwrap();
        payment.apply_events(events);
        payment
    }

    #[test]
    fn recorded_payment_is_completed() {
        let payment = recorded(4000);
        assert_eq!(payment.state(), PaymentState::Completed);
        assert_eq!(payment.amount(), Money::from_cents(4000));
        assert_eq!(payment.reference(), Some("R-1"));
        assert_eq!(payment.recorded_by(), "system");
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        for cents in [0, -100] {
            let err = Payment::default()
                .record(
                    AggregateId::new(),
                    AggregateId::new(),
                    AggregateId::new(),
                    NewPayment::new(Money::from_cents(cents), PaymentMethod::Card),
                    &Actor::system(),
                    Utc::now(),
                )
                .unwrap_err();
            assert!(matches!(err, PaymentError::NonPositiveAmount(_)));
        }
    }

    #[test]
    fn partial_refund_flips_whole_payment() {
        let mut payment = recorded(4000);
        let events = payment
            .refund_payment(RefundRequest::new(Money::from_cents(1000), "Fabric flaw"), &Actor::system(), Utc::now())
            .unwrap();
        payment.apply_events(events);

        assert_eq!(payment.state(), PaymentState::Refunded);
        let refund = payment.refund().unwrap();
        assert_eq!(refund.amount, Money::from_cents(1000));
        assert_eq!(refund.reason, "Fabric flaw");
    }

    #[test]
    fn refund_bounds() {
        let payment = recorded(4000);

        let err = payment
            .refund_payment(RefundRequest::new(Money::from_cents(4001), "x"), &Actor::system(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, PaymentError::RefundExceedsPayment { .. }));

        let err = payment
            .refund_payment(RefundRequest::new(Money::zero(), "x"), &Actor::system(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, PaymentError::NonPositiveRefund(_)));

        assert!(payment
            .refund_payment(RefundRequest::new(Money::from_cents(4000), "x"), &Actor::system(), Utc::now())
            .is_ok());
    }

    #[test]
    fn refunded_payment_cannot_be_refunded_again() {
        let mut payment = recorded(4000);
        payment.apply_events(
            payment
                .refund_payment(RefundRequest::new(Money::from_cents(4000), "x"), &Actor::system(), Utc::now())
                .unwrap(),
        );

        let err = payment
            .refund_payment(RefundRequest::new(Money::from_cents(1), "again"), &Actor::system(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, PaymentError::NotRefundable { state: PaymentState::Refunded }));
    }

    #[test]
    fn missing_payment_cannot_be_refunded() {
        let err = Payment::default()
            .refund_payment(RefundRequest::new(Money::from_cents(1), "x"), &Actor::system(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, PaymentError::NotRecorded));
    }
}
