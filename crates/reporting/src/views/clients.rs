//! Client rollups for the top-clients report.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{ClientEvent, Money, clamp_non_negative};
use event_store::EventEnvelope;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::{
    Result,
    projection::{Projection, ProjectionPosition, decode_for},
    read_model::ReadModel,
};

#[derive(Debug, Clone, Serialize)]
pub struct ClientSummary {
    pub client_id: AggregateId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub total_orders: u64,
    pub total_spent: Money,
    pub last_order_date: Option<DateTime<Utc>>,
    pub registered_at: DateTime<Utc>,
}

#[derive(Clone, Default)]
pub struct ClientsView {
    clients: Arc<RwLock<HashMap<AggregateId, ClientSummary>>>,
    position: Arc<RwLock<ProjectionPosition>>,

    /// Entry count as of the last completed write.
    size: Arc<AtomicUsize>,
}

impl ClientsView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, client_id: AggregateId) -> Option<ClientSummary> {
        self.clients.read().await.get(&client_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Clients by total spent, highest first. Ties go to the earlier client.
    pub async fn top(&self, limit: usize) -> Vec<ClientSummary> {
        let mut clients: Vec<_> = self.clients.read().await.values().cloned().collect();
        clients.sort_by(|a, b| {
            b.total_spent
                .cmp(&a.total_spent)
                .then_with(|| a.registered_at.cmp(&b.registered_at))
        });
        clients.truncate(limit);
        clients
    }

    fn apply(clients: &mut HashMap<AggregateId, ClientSummary>, id: AggregateId, event: ClientEvent) {
        if let ClientEvent::ClientRegistered(data) = event {
            clients.insert(
                id,
                ClientSummary {
                    client_id: id,
                    name: data.details.name,
                    email: data.details.email,
                    phone: data.details.phone,
                    total_orders: 0,
                    total_spent: Money::zero(),
                    last_order_date: None,
                    registered_at: data.registered_at,
                },
            );
            return;
        }

        if let ClientEvent::ClientDeleted(_) = event {
            clients.remove(&id);
            return;
        }

        let Some(client) = clients.get_mut(&id) else { return };
        match event {
            ClientEvent::ClientUpdated(data) => {
                client.name = data.details.name;
                client.email = data.details.email;
                client.phone = data.details.phone;
            }
            ClientEvent::ClientOrderRecorded(data) => {
                client.total_orders += 1;
                client.total_spent += data.order_total;
                client.last_order_date = client.last_order_date.max(Some(data.ordered_at));
            }
            ClientEvent::ClientOrderRepriced(data) => {
                client.total_spent = clamp_non_negative(
                    client.total_spent - data.previous_total + data.current_total,
                );
            }
            ClientEvent::ClientOrderRemoved(data) => {
                client.total_orders = client.total_orders.saturating_sub(1);
                client.total_spent = clamp_non_negative(client.total_spent - data.order_total);
            }
            ClientEvent::ClientRegistered(_) | ClientEvent::ClientDeleted(_) => {}
        }
    }
}

#[async_trait]
impl Projection for ClientsView {
    fn name(&self) -> &'static str {
        "clients"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        if let Some(client_event) = decode_for::<ClientEvent>(event, "Client")? {
            let mut clients = self.clients.write().await;
            Self::apply(&mut clients, event.aggregate_id, client_event);
            self.size.store(clients.len(), Ordering::Relaxed);
        }

        let mut position = self.position.write().await;
        *position = position.advance_to(event.position);
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        *self.position.read().await
    }

    async fn reset(&self) -> Result<()> {
        self.clients.write().await.clear();
        self.size.store(0, Ordering::Relaxed);
        *self.position.write().await = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for ClientsView {
    fn name(&self) -> &'static str {
        "clients"
    }

    fn count(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }
}
