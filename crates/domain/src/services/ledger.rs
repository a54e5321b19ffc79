//! Payment ledger: recording, refunding and settling payments.

use std::time::Instant;

use chrono::Utc;
use common::{Actor, AggregateId};
use event_store::EventStore;

use crate::aggregate::Aggregate;
use crate::error::DomainError;
use crate::order::Order;
use crate::payment::{NewPayment, Payment, PaymentError, PaymentState, RefundRequest};
use crate::repository::{Loaded, Repository, UnitOfWork};
use crate::settlement::{Balance, PaymentStatus};

/// Owns payments and the derived payment status of orders.
///
/// Every path that changes an order's total or its payments ends in
/// [`stage_settlement`](Self::stage_settlement), which re-derives the status
/// from the full ledger rather than adjusting it incrementally.
pub struct PaymentLedger<S> {
    repo: Repository<S>,
}

impl<S: Clone> Clone for PaymentLedger<S> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
        }
    }
}

impl<S: EventStore> PaymentLedger<S> {
    pub fn new(repo: Repository<S>) -> Self {
        Self { repo }
    }

    /// Records a completed payment against an order and settles the order in
    /// the same commit.
    #[tracing::instrument(skip_all, fields(%order_id, amount = %new.amount, actor = %actor.id))]
    pub async fn record_payment(
        &self,
        order_id: AggregateId,
        new: NewPayment,
        actor: &Actor,
    ) -> Result<Payment, DomainError> {
        let started = Instant::now();
        let _guard = self.repo.locks().acquire(&[order_id]).await;

        let mut order = self.repo.load_live::<Order>(order_id).await?;
        let client_id = order
            .client_id()
            .ok_or_else(|| DomainError::not_found("Order", order_id))?;
        let mut payments = self.load_payments(&order).await?;
        payments
            .iter()
            .filter(|p| p.state() == PaymentState::Completed)
            .try_fold(new.amount, |paid, p| paid.checked_add(p.amount()))
            .ok_or(PaymentError::LedgerOverflow)?;

        let at = Utc::now();
        let payment_id = AggregateId::new();
        let mut payment = Loaded::<Payment>::fresh();
        let amount = new.amount;
        let events = payment.record(payment_id, order_id, client_id, new, actor, at)?;

        let mut uow = UnitOfWork::new(actor, at);
        uow.record(payment_id, &mut payment, events)?;
        let linked = order.link_payment(payment_id, amount, at)?;
        uow.record(order_id, &mut order, linked)?;

        let payment = payment.into_inner();
        payments.push(payment.clone());
        self.stage_settlement(&mut uow, &mut order, &payments)?;
        self.repo.commit(uow).await?;

        metrics::counter!("payments_recorded_total").increment(1);
        metrics::histogram!("command_duration_seconds", "command" => "record_payment")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(%payment_id, payment_status = %order.payment_status(), "payment recorded");
        Ok(payment)
    }

    /// Re-derives and stores an order's payment status. Writes nothing when
    /// the stored status already matches.
    #[tracing::instrument(skip_all, fields(%order_id))]
    pub async fn recompute_order_payment_status(
        &self,
        order_id: AggregateId,
        actor: &Actor,
    ) -> Result<PaymentStatus, DomainError> {
        let _guard = self.repo.locks().acquire(&[order_id]).await;

        let mut order = self.repo.load_live::<Order>(order_id).await?;
        let payments = self.load_payments(&order).await?;

        let mut uow = UnitOfWork::new(actor, Utc::now());
        self.stage_settlement(&mut uow, &mut order, &payments)?;
        self.repo.commit(uow).await?;

        Ok(order.payment_status())
    }

    /// Refunds a completed payment and settles its order in the same commit.
    #[tracing::instrument(skip_all, fields(%payment_id, amount = %request.amount, actor = %actor.id))]
    pub async fn refund_payment(
        &self,
        payment_id: AggregateId,
        request: RefundRequest,
        actor: &Actor,
    ) -> Result<Payment, DomainError> {
        let started = Instant::now();

        // The owning order never changes, so it can be read before locking.
        let order_id = self
            .get_payment(payment_id)
            .await?
            .order_id()
            .ok_or_else(|| DomainError::not_found("Payment", payment_id))?;
        let _guard = self.repo.locks().acquire(&[payment_id, order_id]).await;

        let mut payment = self.repo.load_live::<Payment>(payment_id).await?;
        let at = Utc::now();
        let events = payment.refund_payment(request, actor, at)?;

        let mut uow = UnitOfWork::new(actor, at);
        uow.record(payment_id, &mut payment, events)?;

        let mut order = self.repo.load::<Order>(order_id).await?;
        if order.is_live() {
            let payments: Vec<Payment> = self
                .load_payments(&order)
                .await?
                .into_iter()
                .map(|p| if p.id() == Some(payment_id) { (*payment).clone() } else { p })
                .collect();
            self.stage_settlement(&mut uow, &mut order, &payments)?;
        }
        self.repo.commit(uow).await?;

        metrics::counter!("payments_refunded_total").increment(1);
        metrics::histogram!("command_duration_seconds", "command" => "refund_payment")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(%order_id, payment_status = %order.payment_status(), "payment refunded");
        Ok(payment.into_inner())
    }

    pub async fn get_payment(&self, payment_id: AggregateId) -> Result<Payment, DomainError> {
        Ok(self.repo.load_live::<Payment>(payment_id).await?.into_inner())
    }

    /// Payments recorded against an order, oldest first.
    pub async fn list_payments(&self, order_id: AggregateId) -> Result<Vec<Payment>, DomainError> {
        let order = self.repo.load_live::<Order>(order_id).await?;
        self.load_payments(&order).await
    }

    /// Balance computed from the live ledger.
    pub async fn order_balance(&self, order_id: AggregateId) -> Result<Balance, DomainError> {
        let order = self.repo.load_live::<Order>(order_id).await?;
        let payments = self.load_payments(&order).await?;
        Ok(Balance::settle(order.total(), &payments))
    }

    pub(crate) async fn load_payments(&self, order: &Order) -> Result<Vec<Payment>, DomainError> {
        let mut payments = Vec::with_capacity(order.payment_ids().len());
        for payment_id in order.payment_ids() {
            let payment = self.repo.load::<Payment>(*payment_id).await?;
            if payment.is_live() {
                payments.push(payment.into_inner());
            }
        }
        Ok(payments)
    }

    /// Stages the settlement of `order` against `payments`, if it changed.
    pub(crate) fn stage_settlement(
        &self,
        uow: &mut UnitOfWork,
        order: &mut Loaded<Order>,
        payments: &[Payment],
    ) -> Result<(), DomainError> {
        let Some(order_id) = order.id() else {
            return Ok(());
        };
        let balance = Balance::settle(order.total(), payments);
        let events = order.record_settlement(&balance, uow.at())?;
        if !events.is_empty() {
            tracing::debug!(%order_id, status = %balance.payment_status, "payment status recomputed");
        }
        uow.record(order_id, order, events)
    }
}
