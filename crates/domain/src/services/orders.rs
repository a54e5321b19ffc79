//! Order lifecycle: creation, edits, status changes and deletion.

use std::time::Instant;

use chrono::Utc;
use common::{Actor, AggregateId};
use event_store::EventStore;

use crate::aggregate::Aggregate;
use crate::client::Client;
use crate::error::DomainError;
use crate::order::{
    NewOrder, Order, OrderNumber, OrderNumberSequence, OrderPatch, OrderStatus,
    sequence_stream_id,
};
use crate::payment::Payment;
use crate::repository::{Loaded, Repository, UnitOfWork};
use crate::settlement::Balance;

use super::{ClientStatistics, PaymentLedger};

/// Manages orders and keeps their client rollups and payment status in step.
pub struct OrderManager<S> {
    repo: Repository<S>,
    clients: ClientStatistics<S>,
    ledger: PaymentLedger<S>,
}

impl<S: Clone> Clone for OrderManager<S> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            clients: self.clients.clone(),
            ledger: self.ledger.clone(),
        }
    }
}

impl<S: EventStore + Clone> OrderManager<S> {
    pub fn new(repo: Repository<S>) -> Self {
        Self {
            clients: ClientStatistics::new(repo.clone()),
            ledger: PaymentLedger::new(repo.clone()),
            repo,
        }
    }

    /// Creates an order, issues its number and updates the client rollup in
    /// one commit.
    #[tracing::instrument(skip_all, fields(client_id = %new.client_id, actor = %actor.id))]
    pub async fn create_order(&self, new: NewOrder, actor: &Actor) -> Result<Order, DomainError> {
        let started = Instant::now();
        let at = Utc::now();
        let client_id = new.client_id;
        let period = OrderNumber::period_of(at);
        let sequence_id = sequence_stream_id(&period);

        let _guard = self.repo.locks().acquire(&[client_id, sequence_id]).await;

        let mut client = self.repo.load_live::<Client>(client_id).await?;
        let mut sequence = self.repo.load::<OrderNumberSequence>(sequence_id).await?;

        let order_id = AggregateId::new();
        let mut uow = UnitOfWork::new(actor, at);

        let issued = sequence.issue(&period, order_id, at)?;
        uow.record(sequence_id, &mut sequence, issued)?;
        let order_number = sequence
            .last_number()
            .unwrap_or_else(|| OrderNumber::new(&period, 1));

        let mut order = Loaded::<Order>::fresh();
        let created = order.create(order_id, order_number, new, actor, at)?;
        uow.record(order_id, &mut order, created)?;

        self.clients
            .stage_order_created(&mut uow, &mut client, order_id, order.total(), at)?;
        self.repo.commit(uow).await?;

        metrics::counter!("orders_created_total").increment(1);
        metrics::histogram!("command_duration_seconds", "command" => "create_order")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(%order_id, order_number = %order.order_number(), total = %order.total(), "order created");
        Ok(order.into_inner())
    }

    /// Applies a field patch. A changed total adjusts the client's spend and
    /// re-settles the order against its payments in the same commit.
    #[tracing::instrument(skip_all, fields(%order_id, actor = %actor.id))]
    pub async fn update_order(
        &self,
        order_id: AggregateId,
        patch: OrderPatch,
        actor: &Actor,
    ) -> Result<Order, DomainError> {
        let client_id = self.owning_client(order_id).await?;
        let _guard = self.repo.locks().acquire(&[order_id, client_id]).await;

        let mut order = self.repo.load_live::<Order>(order_id).await?;
        let at = Utc::now();
        let events = order.update(patch, actor, at)?;
        if events.is_empty() {
            return Ok(order.into_inner());
        }

        let previous_total = order.total();
        let mut uow = UnitOfWork::new(actor, at);
        uow.record(order_id, &mut order, events)?;

        if order.total() != previous_total {
            let mut client = self.repo.load::<Client>(client_id).await?;
            if client.is_live() {
                self.clients.stage_order_repriced(
                    &mut uow,
                    &mut client,
                    order_id,
                    previous_total,
                    order.total(),
                )?;
            }
            let payments = self.ledger.load_payments(&order).await?;
            self.ledger.stage_settlement(&mut uow, &mut order, &payments)?;
            tracing::info!(previous = %previous_total, current = %order.total(), "order repriced");
        }

        self.repo.commit(uow).await?;
        Ok(order.into_inner())
    }

    #[tracing::instrument(skip_all, fields(%order_id, to = %status, actor = %actor.id))]
    pub async fn change_status(
        &self,
        order_id: AggregateId,
        status: OrderStatus,
        comment: Option<String>,
        actor: &Actor,
    ) -> Result<Order, DomainError> {
        let _guard = self.repo.locks().acquire(&[order_id]).await;

        let mut order = self.repo.load_live::<Order>(order_id).await?;
        let from = order.status();
        let at = Utc::now();
        let events = order.change_status(status, comment, actor, at)?;

        let mut uow = UnitOfWork::new(actor, at);
        uow.record(order_id, &mut order, events)?;
        self.repo.commit(uow).await?;

        metrics::counter!("order_status_changes_total", "to" => status.as_str()).increment(1);
        tracing::info!(%from, "order status changed");
        Ok(order.into_inner())
    }

    /// Deletes an order and removes it from the client's rollup. Payments are
    /// left in the ledger.
    #[tracing::instrument(skip_all, fields(%order_id, actor = %actor.id))]
    pub async fn delete_order(&self, order_id: AggregateId, actor: &Actor) -> Result<(), DomainError> {
        let client_id = self.owning_client(order_id).await?;
        let _guard = self.repo.locks().acquire(&[order_id, client_id]).await;

        let mut order = self.repo.load_live::<Order>(order_id).await?;
        let mut client = self.repo.load::<Client>(client_id).await?;
        let total = order.total();
        let at = Utc::now();
        let events = order.delete(actor, at)?;

        let mut uow = UnitOfWork::new(actor, at);
        uow.record(order_id, &mut order, events)?;
        self.clients
            .stage_order_deleted(&mut uow, &mut client, order_id, total)?;
        self.repo.commit(uow).await?;

        metrics::counter!("orders_deleted_total").increment(1);
        tracing::info!(%client_id, %total, "order deleted");
        Ok(())
    }

    pub async fn get_order(&self, order_id: AggregateId) -> Result<Order, DomainError> {
        Ok(self.repo.load_live::<Order>(order_id).await?.into_inner())
    }

    pub async fn get_balance(&self, order_id: AggregateId) -> Result<Balance, DomainError> {
        self.ledger.order_balance(order_id).await
    }

    pub async fn list_payments(&self, order_id: AggregateId) -> Result<Vec<Payment>, DomainError> {
        self.ledger.list_payments(order_id).await
    }

    async fn owning_client(&self, order_id: AggregateId) -> Result<AggregateId, DomainError> {
        self.repo
            .load_live::<Order>(order_id)
            .await?
            .client_id()
            .ok_or_else(|| DomainError::not_found("Order", order_id))
    }
}
