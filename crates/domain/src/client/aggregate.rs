//! Client aggregate implementation.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use common::{Actor, AggregateId};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::money::Money;
use crate::settlement::clamp_non_negative;

use super::{
    ClientError, ClientEvent,
    events::{
        ClientDeletedData, ClientOrderRecordedData, ClientOrderRemovedData,
        ClientOrderRepricedData, ClientRegisteredData, ClientUpdatedData,
    },
};

/// Contact information kept for a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDetails {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl ClientDetails {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

/// Partial edit of [`ClientDetails`]. A contact field set to `Some(None)`
/// (`null` in JSON) is cleared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientDetailsPatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "crate::patch::clearable")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::patch::clearable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::patch::clearable")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::patch::clearable")]
    pub notes: Option<Option<String>>,
}

impl ClientDetailsPatch {
    fn apply_to(self, details: &ClientDetails) -> ClientDetails {
        ClientDetails {
            name: self.name.unwrap_or_else(|| details.name.clone()),
            email: self.email.unwrap_or_else(|| details.email.clone()),
            phone: self.phone.unwrap_or_else(|| details.phone.clone()),
            address: self.address.unwrap_or_else(|| details.address.clone()),
            notes: self.notes.unwrap_or_else(|| details.notes.clone()),
        }
    }
}

/// Client aggregate root.
///
/// Rollups (`total_orders`, `total_spent`, `last_order_date`) only move in
/// response to order creation, deletion and repricing, each of which lands in
/// the same commit as the order change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Client {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    details: ClientDetails,
    total_orders: u64,
    total_spent: Money,
    last_order_date: Option<DateTime<Utc>>,

    /// Non-deleted orders referencing this client.
    order_ids: BTreeSet<AggregateId>,

    registered_at: Option<DateTime<Utc>>,
    deleted: bool,
}

impl Aggregate for Client {
    type Event = ClientEvent;
    type Error = ClientError;

    fn aggregate_type() -> &'static str {
        "Client"
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
            ClientEvent::ClientRegistered(data) => {
                self.id = Some(data.client_id);
                self.details = data.details;
                self.registered_at = Some(data.registered_at);
            }
            ClientEvent::ClientUpdated(data) => self.details = data.details,
            ClientEvent::ClientOrderRecorded(data) => {
                self.order_ids.insert(data.order_id);
                self.total_orders += 1;
                self.total_spent += data.order_total;
                self.last_order_date = Some(data.ordered_at);
            }
            ClientEvent::ClientOrderRepriced(data) => {
                self.total_spent = clamp_non_negative(
                    self.total_spent - data.previous_total + data.current_total,
                );
            }
            ClientEvent::ClientOrderRemoved(data) => {
                self.order_ids.remove(&data.order_id);
                self.total_orders = self.total_orders.saturating_sub(1);
                self.total_spent = clamp_non_negative(self.total_spent - data.order_total);
            }
            ClientEvent::ClientDeleted(_) => self.deleted = true,
        }
    }
}

// Query methods
impl Client {
    pub fn details(&self) -> &ClientDetails {
        &self.details
    }

    pub fn name(&self) -> &str {
        &self.details.name
    }

    pub fn total_orders(&self) -> u64 {
        self.total_orders
    }

    pub fn total_spent(&self) -> Money {
        self.total_spent
    }

    pub fn last_order_date(&self) -> Option<DateTime<Utc>> {
        self.last_order_date
    }

    pub fn order_ids(&self) -> impl Iterator<Item = AggregateId> + '_ {
        self.order_ids.iter().copied()
    }

    pub fn has_orders(&self) -> bool {
        !self.order_ids.is_empty()
    }

    pub fn registered_at(&self) -> Option<DateTime<Utc>> {
        self.registered_at
    }
}

// Command methods (return events)
impl Client {
    pub fn register(
        &self,
        client_id: AggregateId,
        details: ClientDetails,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<Vec<ClientEvent>, ClientError> {
        if self.id.is_some() {
            return Err(ClientError::AlreadyRegistered);
        }
        if details.name.trim().is_empty() {
            return Err(ClientError::NameRequired);
        }

        Ok(vec![ClientEvent::ClientRegistered(ClientRegisteredData {
            client_id,
            details,
            registered_by: actor.id.clone(),
            registered_at: at,
        })])
    }

    pub fn update_details(
        &self,
        patch: ClientDetailsPatch,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<Vec<ClientEvent>, ClientError> {
        self.ensure_live()?;
        let details = patch.apply_to(&self.details);
        if details.name.trim().is_empty() {
            return Err(ClientError::NameRequired);
        }
        if details == self.details {
            return Ok(vec![]);
        }

        Ok(vec![ClientEvent::ClientUpdated(ClientUpdatedData {
            details,
            updated_by: actor.id.clone(),
            updated_at: at,
        })])
    }

    /// Rollup for a newly created order.
    pub fn order_created(
        &self,
        order_id: AggregateId,
        order_total: Money,
        at: DateTime<Utc>,
    ) -> Result<Vec<ClientEvent>, ClientError> {
        self.ensure_live()?;
        if self.order_ids.contains(&order_id) {
            return Ok(vec![]);
        }
        self.total_spent
            .checked_add(order_total)
            .ok_or(ClientError::TotalSpentOverflow)?;
        Ok(vec![ClientEvent::ClientOrderRecorded(ClientOrderRecordedData {
            order_id,
            order_total,
            ordered_at: at,
        })])
    }

    /// Rollup delta for an order whose total changed.
    pub fn order_repriced(
        &self,
        order_id: AggregateId,
        previous_total: Money,
        current_total: Money,
    ) -> Result<Vec<ClientEvent>, ClientError> {
        self.ensure_live()?;
        if previous_total == current_total || !self.order_ids.contains(&order_id) {
            return Ok(vec![]);
        }
        self.total_spent
            .checked_sub(previous_total)
            .and_then(|spent| spent.checked_add(current_total))
            .ok_or(ClientError::TotalSpentOverflow)?;
        Ok(vec![ClientEvent::ClientOrderRepriced(ClientOrderRepricedData {
            order_id,
            previous_total,
            current_total,
        })])
    }

    /// Rollup for a deleted order. Orders the client does not know are ignored.
    ///
    /// Allowed on a deleted client so that stray orders can still be removed.
    pub fn order_deleted(
        &self,
        order_id: AggregateId,
        order_total: Money,
    ) -> Result<Vec<ClientEvent>, ClientError> {
        if self.id.is_none() {
            return Err(ClientError::NotRegistered);
        }
        if !self.order_ids.contains(&order_id) {
            return Ok(vec![]);
        }
        Ok(vec![ClientEvent::ClientOrderRemoved(ClientOrderRemovedData {
            order_id,
            order_total,
        })])
    }

    /// Fails with `HasOrders` while any live order references the client.
    pub fn ensure_deletable(&self) -> Result<(), ClientError> {
        self.ensure_live()?;
        if self.has_orders() {
            return Err(ClientError::HasOrders {
                count: self.order_ids.len(),
            });
        }
        Ok(())
    }

    pub fn delete(&self, actor: &Actor, at: DateTime<Utc>) -> Result<Vec<ClientEvent>, ClientError> {
        self.ensure_deletable()?;
        Ok(vec![ClientEvent::ClientDeleted(ClientDeletedData {
            deleted_by: actor.id.clone(),
            deleted_at: at,
        })])
    }

    fn ensure_live(&self) -> Result<(), ClientError> {
        if self.id.is_none() {
            return Err(ClientError::NotRegistered);
        }
        if self.deleted {
            return Err(ClientError::Deleted);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registered() -> Client {
        let mut client = Client::default();
        client.apply_events(
            client
                .register(
                    AggregateId::new(),
                    ClientDetails::named("Amara Osei").with_phone("+233 20 000 0000"),
                    &Actor::system(),
                    Utc::now(),
                )
                .unwrap(),
        );
        client
    }

    fn with_order(client: &mut Client, cents: i64) -> AggregateId {
        let order_id = AggregateId::new();
        let events = client
            .order_created(order_id, Money::from_cents(cents), Utc::now())
            .unwrap();
        client.apply_events(events);
        order_id
    }

    #[test]
    fn register_requires_name() {
        let err = Client::default()
            .register(AggregateId::new(), ClientDetails::named("  "), &Actor::system(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, ClientError::NameRequired));
    }

    #[test]
    fn rollups_follow_orders() {
        let mut client = registered();
        let first = with_order(&mut client, 10_000);
        with_order(&mut client, 25_000);

        assert_eq!(client.total_orders(), 2);
        assert_eq!(client.total_spent(), Money::from_cents(35_000));
        assert!(client.last_order_date().is_some());

        client.apply_events(client.order_deleted(first, Money::from_cents(10_000)).unwrap());
        assert_eq!(client.total_orders(), 1);
        assert_eq!(client.total_spent(), Money::from_cents(25_000));
    }

    #[test]
    fn removal_of_unknown_order_is_ignored() {
        let mut client = registered();
        with_order(&mut client, 5_000);
        let events = client
            .order_deleted(AggregateId::new(), Money::from_cents(5_000))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn reprice_applies_delta_and_clamps() {
        let mut client = registered();
        let order = with_order(&mut client, 10_000);

        client.apply_events(
            client
                .order_repriced(order, Money::from_cents(10_000), Money::from_cents(12_500))
                .unwrap(),
        );
        assert_eq!(client.total_spent(), Money::from_cents(12_500));

        // A stale previous total larger than the tally floors at zero.
        client.apply(ClientEvent::ClientOrderRepriced(ClientOrderRepricedData {
            order_id: order,
            previous_total: Money::from_cents(50_000),
            current_total: Money::zero(),
        }));
        assert_eq!(client.total_spent(), Money::zero());
    }

    #[test]
    fn removal_clamps_at_zero() {
        let mut client = registered();
        let order = with_order(&mut client, 1_000);
        client.apply(ClientEvent::ClientOrderRemoved(ClientOrderRemovedData {
            order_id: order,
            order_total: Money::from_cents(9_000),
        }));
        assert_eq!(client.total_spent(), Money::zero());
        assert_eq!(client.total_orders(), 0);
    }

    #[test]
    fn rollup_overflow_is_rejected() {
        let mut client = registered();
        let order = with_order(&mut client, i64::MAX - 10);

        assert!(matches!(
            client.order_created(AggregateId::new(), Money::from_cents(11), Utc::now()),
            Err(ClientError::TotalSpentOverflow)
        ));
        assert!(matches!(
            client.order_repriced(order, Money::from_cents(1), Money::from_cents(i64::MAX)),
            Err(ClientError::TotalSpentOverflow)
        ));
        assert_eq!(client.total_orders(), 1);
    }

    #[test]
    fn delete_guard() {
        let mut client = registered();
        let order = with_order(&mut client, 1_000);
        assert!(matches!(client.ensure_deletable(), Err(ClientError::HasOrders { count: 1 })));

        client.apply_events(client.order_deleted(order, Money::from_cents(1_000)).unwrap());
        client.apply_events(client.delete(&Actor::system(), Utc::now()).unwrap());
        assert!(!client.is_live());
        assert!(matches!(
            client.order_created(AggregateId::new(), Money::zero(), Utc::now()),
            Err(ClientError::Deleted)
        ));
    }

    #[test]
    fn update_merges_patch() {
        let client = registered();
        let events = client
            .update_details(
                ClientDetailsPatch {
                    email: Some(Some("amara@example.com".to_string())),
                    ..Default::default()
                },
                &Actor::system(),
                Utc::now(),
            )
            .unwrap();
        let [ClientEvent::ClientUpdated(data)] = events.as_slice() else {
            panic!("expected update, got {events:?}");
        };
        assert_eq!(data.details.name, "Amara Osei");
        assert_eq!(data.details.email.as_deref(), Some("amara@example.com"));
        assert!(data.details.phone.is_some());

        let unchanged = client
            .update_details(ClientDetailsPatch::default(), &Actor::system(), Utc::now())
            .unwrap();
        assert!(unchanged.is_empty());
    }

    #[test]
    fn update_clears_contact_field() {
        let mut client = registered();
        let patch: ClientDetailsPatch = serde_json::from_str(r#"{"phone": null}"#).unwrap();
        client.apply_events(client.update_details(patch, &Actor::system(), Utc::now()).unwrap());

        assert_eq!(client.details().phone, None);
        assert_eq!(client.name(), "Amara Osei");
    }
}
