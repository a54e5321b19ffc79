//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{Actor, AggregateId};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::money::Money;
use crate::settlement::{Balance, PaymentStatus, settle_payment_status};

use super::value_objects::validate_items;
use super::{
    LineItem, NewOrder, OrderError, OrderEvent, OrderNumber, OrderPatch, OrderStatus, Pricing,
    Priority, StatusHistoryEntry,
    events::{
        OrderCreatedData, OrderDeletedData, OrderStatusChangedData, OrderUpdatedData,
        PaymentLinkedData, PaymentStatusRecomputedData,
    },
};

/// Comment on the history entry every order starts with.
pub const CREATED_COMMENT: &str = "Order created";

/// Order aggregate root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Order {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    order_number: OrderNumber,
    client_id: Option<AggregateId>,
    items: Vec<LineItem>,
    pricing: Pricing,
    status: OrderStatus,
    payment_status: PaymentStatus,

    /// Completed-payment total as of the last recompute.
    total_paid: Money,

    priority: Priority,
    status_history: Vec<StatusHistoryEntry>,
    order_date: Option<DateTime<Utc>>,
    expected_delivery: Option<DateTime<Utc>>,
    completed_date: Option<DateTime<Utc>>,
    delivered_date: Option<DateTime<Utc>>,
    notes: Option<String>,
    payment_ids: Vec<AggregateId>,
    created_by: String,
    deleted: bool,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
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

    fn is_live(&self) -> bool {
        self.id.is_some() && !self.deleted
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            OrderEvent::OrderCreated(data) => self.apply_created(data),
            OrderEvent::OrderUpdated(data) => self.apply_updated(data),
            OrderEvent::OrderStatusChanged(data) => self.apply_status_changed(data),
            OrderEvent::PaymentLinked(data) => self.payment_ids.push(data.payment_id),
            OrderEvent::PaymentStatusRecomputed(data) => {
                self.payment_status = data.payment_status;
                self.total_paid = data.total_paid;
            }
            OrderEvent::OrderDeleted(_) => self.deleted = true,
        }
    }
}

// Query methods
impl Order {
    pub fn order_number(&self) -> &OrderNumber {
        &self.order_number
    }

    pub fn client_id(&self) -> Option<AggregateId> {
        self.client_id
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn pricing(&self) -> Pricing {
        self.pricing
    }

    pub fn total(&self) -> Money {
        self.pricing.total
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn total_paid(&self) -> Money {
        self.total_paid
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Status changes in chronological order; the last entry is the current status.
    pub fn status_history(&self) -> &[StatusHistoryEntry] {
        &self.status_history
    }

    pub fn order_date(&self) -> Option<DateTime<Utc>> {
        self.order_date
    }

    pub fn expected_delivery(&self) -> Option<DateTime<Utc>> {
        self.expected_delivery
    }

    pub fn completed_date(&self) -> Option<DateTime<Utc>> {
        self.completed_date
    }

    pub fn delivered_date(&self) -> Option<DateTime<Utc>> {
        self.delivered_date
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn payment_ids(&self) -> &[AggregateId] {
        &self.payment_ids
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

// Command methods (return events)
impl Order {
    pub fn create(
        &self,
        order_id: AggregateId,
        order_number: OrderNumber,
        new: NewOrder,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.id.is_some() {
            return Err(OrderError::AlreadyCreated);
        }
        validate_items(&new.items)?;
        Pricing::validate_adjustments(new.tax, new.discount)?;

        let pricing = Pricing::from_items(&new.items, new.tax, new.discount)?;
        let payment_status = settle_payment_status(pricing.total, Money::zero(), false);

        Ok(vec![OrderEvent::OrderCreated(OrderCreatedData {
            order_id,
            order_number,
            client_id: new.client_id,
            items: new.items,
            pricing,
            priority: new.priority,
            expected_delivery: new.expected_delivery,
            notes: new.notes,
            payment_status,
            created_by: actor.id.clone(),
            created_at: at,
        })])
    }

    /// Applies a field patch. Fields equal to their current value are dropped;
    /// if nothing is left no event is produced.
    pub fn update(
        &self,
        patch: OrderPatch,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_live()?;
        if patch.is_empty() {
            return Ok(vec![]);
        }
        if !self.status.is_editable() {
            return Err(OrderError::NotEditable {
                status: self.status,
            });
        }

        if let Some(items) = &patch.items {
            validate_items(items)?;
        }
        let tax = patch.tax.unwrap_or(self.pricing.tax);
        let discount = patch.discount.unwrap_or(self.pricing.discount);
        Pricing::validate_adjustments(tax, discount)?;

        let items = patch.items.filter(|items| *items != self.items);
        let pricing = Pricing::from_items(
            items.as_deref().unwrap_or(self.items.as_slice()),
            tax,
            discount,
        )?;

        let data = OrderUpdatedData {
            items,
            pricing: Some(pricing).filter(|p| *p != self.pricing),
            priority: patch.priority.filter(|p| *p != self.priority),
            expected_delivery: patch
                .expected_delivery
                .filter(|d| *d != self.expected_delivery),
            notes: patch.notes.filter(|n| *n != self.notes),
            updated_by: actor.id.clone(),
            updated_at: at,
        };

        if data.changes_nothing() {
            return Ok(vec![]);
        }
        Ok(vec![OrderEvent::OrderUpdated(data)])
    }

    pub fn change_status(
        &self,
        to: OrderStatus,
        comment: Option<String>,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_live()?;
        if !self.status.can_transition_to(to) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to,
            });
        }

        Ok(vec![OrderEvent::OrderStatusChanged(OrderStatusChangedData {
            from: self.status,
            to,
            comment,
            changed_by: actor.id.clone(),
            changed_at: at,
        })])
    }

    pub fn link_payment(
        &self,
        payment_id: AggregateId,
        amount: Money,
        at: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_live()?;
        if self.payment_ids.contains(&payment_id) {
            return Ok(vec![]);
        }
        Ok(vec![OrderEvent::PaymentLinked(PaymentLinkedData {
            payment_id,
            amount,
            linked_at: at,
        })])
    }

    /// Writes a freshly derived settlement. Produces nothing when the stored
    /// status and paid total already match.
    pub fn record_settlement(
        &self,
        balance: &Balance,
        at: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_live()?;
        if balance.payment_status == self.payment_status && balance.total_paid == self.total_paid {
            return Ok(vec![]);
        }
        Ok(vec![OrderEvent::PaymentStatusRecomputed(
            PaymentStatusRecomputedData {
                payment_status: balance.payment_status,
                total_paid: balance.total_paid,
                recomputed_at: at,
            },
        )])
    }

    pub fn delete(&self, actor: &Actor, at: DateTime<Utc>) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_live()?;
        Ok(vec![OrderEvent::OrderDeleted(OrderDeletedData {
            deleted_by: actor.id.clone(),
            deleted_at: at,
        })])
    }

    fn ensure_live(&self) -> Result<(), OrderError> {
        if self.id.is_none() {
            return Err(OrderError::NotCreated);
        }
        if self.deleted {
            return Err(OrderError::Deleted);
        }
        Ok(())
    }
}

// Apply event helpers
impl Order {
    fn apply_created(&mut self, data: OrderCreatedData) {
        self.id = Some(data.order_id);
        self.order_number = data.order_number;
        self.client_id = Some(data.client_id);
        self.items = data.items;
        self.pricing = data.pricing;
        self.priority = data.priority;
        self.expected_delivery = data.expected_delivery;
        self.notes = data.notes;
        self.payment_status = data.payment_status;
        self.status = OrderStatus::Pending;
        self.order_date = Some(data.created_at);
        self.status_history = vec![StatusHistoryEntry {
            status: OrderStatus::Pending,
            comment: Some(CREATED_COMMENT.to_string()),
            changed_by: data.created_by.clone(),
            changed_at: data.created_at,
        }];
        self.created_by = data.created_by;
    }

    fn apply_updated(&mut self, data: OrderUpdatedData) {
        if let Some(items) = data.items {
            self.items = items;
        }
        if let Some(pricing) = data.pricing {
            self.pricing = pricing;
        }
        if let Some(priority) = data.priority {
            self.priority = priority;
        }
        if let Some(expected) = data.expected_delivery {
            self.expected_delivery = expected;
        }
        if let Some(notes) = data.notes {
            self.notes = notes;
        }
    }

    fn apply_status_changed(&mut self, data: OrderStatusChangedData) {
        self.status = data.to;
        match data.to {
            OrderStatus::Completed => self.completed_date = Some(data.changed_at),
            OrderStatus::Delivered => self.delivered_date = Some(data.changed_at),
            // Reopened for rework.
            status if status.is_active() => self.completed_date = None,
            _ => {}
        }
        self.status_history.push(StatusHistoryEntry {
            status: data.to,
            comment: data.comment,
            changed_by: data.changed_by,
            changed_at: data.changed_at,
        });
    }
}

#[cfg(test)]
mod tests {
    use common::StaffRole;

    use super::*;
    use crate::payment::{NewPayment, Payment, PaymentMethod};

    fn actor() -> Actor {
        Actor::new("staff-7", StaffRole::Staff)
    }

    fn suit() -> LineItem {
        LineItem::new("suit", "Navy two-piece", 1, Money::from_cents(100_000))
    }

    fn created_order() -> Order {
        let mut order = Order::default();
        let events = order
            .create(
                AggregateId::new(),
                OrderNumber::new("202401", 1),
                NewOrder::new(AggregateId::new(), vec![suit()]),
                &actor(),
                Utc::now(),
            )
            .unwrap();
        order.apply_events(events);
        order
    }

    fn transition(order: &mut Order, to: OrderStatus) {
        let events = order.change_status(to, None, &actor(), Utc::now()).unwrap();
        order.apply_events(events);
    }

    #[test]
    fn create_starts_pending_with_history() {
        let order = created_order();

        assert!(order.is_live());
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.payment_status(), PaymentStatus::Pending);
        assert_eq!(order.total(), Money::from_cents(100_000));
        assert_eq!(order.status_history().len(), 1);
        assert_eq!(order.status_history()[0].comment.as_deref(), Some(CREATED_COMMENT));
        assert_eq!(order.status_history()[0].changed_by, "staff-7");
    }

    #[test]
    fn zero_total_order_starts_paid() {
        let mut order = Order::default();
        let events = order
            .create(
                AggregateId::new(),
                OrderNumber::new("202401", 1),
                NewOrder::new(
                    AggregateId::new(),
                    vec![LineItem::new("repair", "Button", 1, Money::zero())],
                ),
                &actor(),
                Utc::now(),
            )
            .unwrap();
        order.apply_events(events);
        assert_eq!(order.payment_status(), PaymentStatus::Paid);
    }

    #[test]
    fn create_rejects_bad_input() {
        let order = Order::default();
        let client = AggregateId::new();
        let number = OrderNumber::new("202401", 1);

        let err = order
            .create(AggregateId::new(), number.clone(), NewOrder::new(client, vec![]), &actor(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, OrderError::NoItems));

        let err = order
            .create(
                AggregateId::new(),
                number,
                NewOrder::new(client, vec![suit()]).with_tax(Money::from_cents(-1)),
                &actor(),
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, OrderError::NegativeAmount { field: "tax", .. }));
    }

    #[test]
    fn create_twice_fails() {
        let order = created_order();
        let err = order
            .create(
                AggregateId::new(),
                OrderNumber::new("202401", 2),
                NewOrder::new(AggregateId::new(), vec![suit()]),
                &actor(),
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, OrderError::AlreadyCreated));
    }

    #[test]
    fn status_changes_stamp_milestones_and_history() {
        let mut order = created_order();
        transition(&mut order, OrderStatus::InProgress);
        transition(&mut order, OrderStatus::ReadyForFitting);
        transition(&mut order, OrderStatus::Completed);
        assert!(order.completed_date().is_some());
        transition(&mut order, OrderStatus::Delivered);
        assert!(order.delivered_date().is_some());

        let history: Vec<_> = order.status_history().iter().map(|e| e.status).collect();
        assert_eq!(
            history,
            vec![
                OrderStatus::Pending,
                OrderStatus::InProgress,
                OrderStatus::ReadyForFitting,
                OrderStatus::Completed,
                OrderStatus::Delivered,
            ]
        );
        assert_eq!(order.status_history().last().unwrap().status, order.status());
    }

    #[test]
    fn reopening_clears_completed_date() {
        let mut order = created_order();
        transition(&mut order, OrderStatus::InProgress);
        transition(&mut order, OrderStatus::Completed);
        assert!(order.completed_date().is_some());

        transition(&mut order, OrderStatus::InProgress);
        assert_eq!(order.completed_date(), None);

        transition(&mut order, OrderStatus::Completed);
        assert!(order.completed_date().is_some());
    }

    #[test]
    fn illegal_and_same_status_transitions_fail() {
        let mut order = created_order();
        assert!(matches!(
            order.change_status(OrderStatus::Pending, None, &actor(), Utc::now()),
            Err(OrderError::InvalidTransition { .. })
        ));
        assert!(matches!(
            order.change_status(OrderStatus::Delivered, None, &actor(), Utc::now()),
            Err(OrderError::InvalidTransition { .. })
        ));

        transition(&mut order, OrderStatus::Cancelled);
        assert!(matches!(
            order.change_status(OrderStatus::InProgress, None, &actor(), Utc::now()),
            Err(OrderError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn update_reprices_and_skips_unchanged_fields() {
        let order = created_order();

        let events = order
            .update(
                OrderPatch {
                    items: Some(vec![suit()]),
                    discount: Some(Money::from_cents(10_000)),
                    ..Default::default()
                },
                &actor(),
                Utc::now(),
            )
            .unwrap();

        let [OrderEvent::OrderUpdated(data)] = events.as_slice() else {
            panic!("expected one update, got {events:?}");
        };
        assert!(data.items.is_none());
        assert_eq!(data.pricing.unwrap().total, Money::from_cents(90_000));
    }

    #[test]
    fn update_with_same_values_is_noop() {
        let order = created_order();
        let events = order
            .update(
                OrderPatch {
                    priority: Some(Priority::Normal),
                    ..Default::default()
                },
                &actor(),
                Utc::now(),
            )
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn update_clears_optional_fields() {
        let mut order = Order::default();
        let new = NewOrder::new(AggregateId::new(), vec![suit()])
            .with_notes("Client prefers horn buttons")
            .with_expected_delivery(Utc::now());
        let events = order
            .create(AggregateId::new(), OrderNumber::new("202401", 1), new, &actor(), Utc::now())
            .unwrap();
        order.apply_events(events);

        let patch: OrderPatch =
            serde_json::from_str(r#"{"notes": null, "expected_delivery": null}"#).unwrap();
        let events = order.update(patch, &actor(), Utc::now()).unwrap();

        // The cleared fields survive a trip through the stored payload.
        let stored = serde_json::to_value(&events[0]).unwrap();
        let replayed: OrderEvent = serde_json::from_value(stored).unwrap();
        order.apply(replayed);

        assert_eq!(order.notes(), None);
        assert_eq!(order.expected_delivery(), None);
    }

    #[test]
    fn update_refused_after_delivery() {
        let mut order = created_order();
        transition(&mut order, OrderStatus::Cancelled);
        let err = order
            .update(
                OrderPatch {
                    notes: Some(Some("late change".to_string())),
                    ..Default::default()
                },
                &actor(),
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, OrderError::NotEditable { .. }));
    }

    #[test]
    fn settlement_is_idempotent() {
        let mut order = created_order();
        let order_id = order.id().unwrap();
        let mut payment = Payment::default();
        payment.apply_events(
            payment
                .record(
                    AggregateId::new(),
                    order_id,
                    order.client_id().unwrap(),
                    NewPayment::new(Money::from_cents(40_000), PaymentMethod::Card),
                    &actor(),
                    Utc::now(),
                )
                .unwrap(),
        );

        let balance = Balance::settle(order.total(), [&payment]);
        let events = order.record_settlement(&balance, Utc::now()).unwrap();
        assert_eq!(events.len(), 1);
        order.apply_events(events);
        assert_eq!(order.payment_status(), PaymentStatus::Partial);
        assert_eq!(order.total_paid(), Money::from_cents(40_000));

        assert!(order.record_settlement(&balance, Utc::now()).unwrap().is_empty());
    }

    #[test]
    fn deleted_order_rejects_commands() {
        let mut order = created_order();
        order.apply_events(order.delete(&actor(), Utc::now()).unwrap());

        assert!(!order.is_live());
        assert!(matches!(
            order.change_status(OrderStatus::InProgress, None, &actor(), Utc::now()),
            Err(OrderError::Deleted)
        ));
        assert!(matches!(order.delete(&actor(), Utc::now()), Err(OrderError::Deleted)));
    }
}
