//! Client registration and order rollups.

use chrono::{DateTime, Utc};
use common::{Actor, AggregateId};
use event_store::EventStore;

use crate::aggregate::Aggregate;
use crate::client::{Client, ClientDetails, ClientDetailsPatch};
use crate::error::DomainError;
use crate::money::Money;
use crate::repository::{Loaded, Repository, UnitOfWork};

/// Keeps client rollups in step with the client's orders.
///
/// The `stage_*` hooks never commit on their own: the order manager calls
/// them while building the unit of work for an order change, so the rollup
/// and the order land together.
pub struct ClientStatistics<S> {
    repo: Repository<S>,
}

impl<S: Clone> Clone for ClientStatistics<S> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
        }
    }
}

impl<S: EventStore> ClientStatistics<S> {
    pub fn new(repo: Repository<S>) -> Self {
        Self { repo }
    }

    #[tracing::instrument(skip_all, fields(actor = %actor.id))]
    pub async fn register_client(
        &self,
        details: ClientDetails,
        actor: &Actor,
    ) -> Result<Client, DomainError> {
        let client_id = AggregateId::new();
        let result = self
            .repo
            .execute::<Client, _>(client_id, actor, |client, at| {
                client.register(client_id, details, actor, at)
            })
            .await?;

        metrics::counter!("clients_registered_total").increment(1);
        tracing::info!(%client_id, "client registered");
        Ok(result.aggregate)
    }

    #[tracing::instrument(skip_all, fields(%client_id, actor = %actor.id))]
    pub async fn update_client(
        &self,
        client_id: AggregateId,
        patch: ClientDetailsPatch,
        actor: &Actor,
    ) -> Result<Client, DomainError> {
        let result = self
            .repo
            .execute::<Client, _>(client_id, actor, |client, at| {
                client.update_details(patch, actor, at)
            })
            .await?;
        Ok(result.aggregate)
    }

    /// Deletes a client that no live order references.
    #[tracing::instrument(skip_all, fields(%client_id, actor = %actor.id))]
    pub async fn delete_client(
        &self,
        client_id: AggregateId,
        actor: &Actor,
    ) -> Result<(), DomainError> {
        self.repo
            .execute::<Client, _>(client_id, actor, |client, at| client.delete(actor, at))
            .await?;
        tracing::info!(%client_id, "client deleted");
        Ok(())
    }

    /// `Conflict` while any live order references the client.
    pub async fn delete_guard(&self, client_id: AggregateId) -> Result<(), DomainError> {
        let client = self.repo.load_live::<Client>(client_id).await?;
        client.ensure_deletable()?;
        Ok(())
    }

    pub async fn get_client(&self, client_id: AggregateId) -> Result<Client, DomainError> {
        Ok(self.repo.load_live::<Client>(client_id).await?.into_inner())
    }

    pub(crate) fn stage_order_created(
        &self,
        uow: &mut UnitOfWork,
        client: &mut Loaded<Client>,
        order_id: AggregateId,
        order_total: Money,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let client_id = live_id(client)?;
        let events = client.order_created(order_id, order_total, at)?;
        uow.record(client_id, client, events)
    }

    pub(crate) fn stage_order_repriced(
        &self,
        uow: &mut UnitOfWork,
        client: &mut Loaded<Client>,
        order_id: AggregateId,
        previous_total: Money,
        current_total: Money,
    ) -> Result<(), DomainError> {
        let client_id = live_id(client)?;
        let events = client.order_repriced(order_id, previous_total, current_total)?;
        uow.record(client_id, client, events)
    }

    pub(crate) fn stage_order_deleted(
        &self,
        uow: &mut UnitOfWork,
        client: &mut Loaded<Client>,
        order_id: AggregateId,
        order_total: Money,
    ) -> Result<(), DomainError> {
        let Some(client_id) = client.id() else {
            tracing::warn!(%order_id, "deleted order references unknown client");
            return Ok(());
        };
        let events = client.order_deleted(order_id, order_total)?;
        uow.record(client_id, client, events)
    }
}

fn live_id(client: &Loaded<Client>) -> Result<AggregateId, DomainError> {
    match client.id() {
        Some(id) if client.is_live() => Ok(id),
        Some(id) => Err(DomainError::not_found("Client", id)),
        None => Err(crate::client::ClientError::NotRegistered.into()),
    }
}
