//! Client domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::money::Money;

use super::ClientDetails;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientEvent {
    ClientRegistered(ClientRegisteredData),
    ClientUpdated(ClientUpdatedData),

    /// An order was created for the client.
    ClientOrderRecorded(ClientOrderRecordedData),

    /// One of the client's orders changed total.
    ClientOrderRepriced(ClientOrderRepricedData),

    /// One of the client's orders was deleted.
    ClientOrderRemoved(ClientOrderRemovedData),

    ClientDeleted(ClientDeletedData),
}

impl DomainEvent for ClientEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ClientEvent::ClientRegistered(_) => "ClientRegistered",
            ClientEvent::ClientUpdated(_) => "ClientUpdated",
            ClientEvent::ClientOrderRecorded(_) => "ClientOrderRecorded",
            ClientEvent::ClientOrderRepriced(_) => "ClientOrderRepriced",
            ClientEvent::ClientOrderRemoved(_) => "ClientOrderRemoved",
            ClientEvent::ClientDeleted(_) => "ClientDeleted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRegisteredData {
    pub client_id: AggregateId,
    pub details: ClientDetails,
    pub registered_by: String,
    pub registered_at: DateTime<Utc>,
}

/// Carries the full details after the edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientUpdatedData {
    pub details: ClientDetails,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientOrderRecordedData {
    pub order_id: AggregateId,
    pub order_total: Money,
    pub ordered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientOrderRepricedData {
    pub order_id: AggregateId,
    pub previous_total: Money,
    pub current_total: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientOrderRemovedData {
    pub order_id: AggregateId,
    pub order_total: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientDeletedData {
    pub deleted_by: String,
    pub deleted_at: DateTime<Utc>,
}
