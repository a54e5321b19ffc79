//! Report queries answered from the read models.

use std::collections::BTreeMap;

use common::AggregateId;
use domain::{Money, OrderStatus, Priority};
use event_store::EventStore;

use crate::{
    ProjectionProcessor, ReadModel, Result,
    queries::{
        CompletionTimeQuery, CompletionTimeReport, DashboardSummary, DateRange, OrderListQuery,
        PriorityCount, RevenueBucket, RevenueQuery, RevenueReport, StatusBreakdown,
        StatusBreakdownQuery, StatusCount, TopClientsQuery,
    },
    views::{ClientSummary, ClientsView, OrderSummary, OrdersView, PaymentSummary, PaymentsView},
};

/// Read-only reporting over the committed event stream.
///
/// Every query first catches the views up with the store, so results reflect
/// all commits that finished before the call.
pub struct Reports<S: EventStore> {
    processor: ProjectionProcessor<S>,
    orders: OrdersView,
    payments: PaymentsView,
    clients: ClientsView,
}

impl<S: EventStore> Reports<S> {
    pub fn new(store: S) -> Self {
        let orders = OrdersView::new();
        let payments = PaymentsView::new();
        let clients = ClientsView::new();

        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(orders.clone()));
        processor.register(Box::new(payments.clone()));
        processor.register(Box::new(clients.clone()));

        Self {
            processor,
            orders,
            payments,
            clients,
        }
    }

    /// Catches the views up with the store.
    pub async fn refresh(&self) -> Result<u64> {
        self.processor.run_catch_up().await
    }

    /// Drops the views and replays the whole store.
    pub async fn rebuild(&self) -> Result<u64> {
        self.processor.rebuild_all().await
    }

    /// Current size of each view, without catching up.
    pub fn view_counts(&self) -> BTreeMap<&'static str, usize> {
        let views: [&dyn ReadModel; 3] = [&self.orders, &self.payments, &self.clients];
        views.iter().map(|v| (v.name(), v.count())).collect()
    }

    pub async fn order(&self, order_id: AggregateId) -> Result<Option<OrderSummary>> {
        self.refresh().await?;
        Ok(self.orders.get(order_id).await)
    }

    pub async fn payment(&self, payment_id: AggregateId) -> Result<Option<PaymentSummary>> {
        self.refresh().await?;
        Ok(self.payments.get(payment_id).await)
    }

    pub async fn client(&self, client_id: AggregateId) -> Result<Option<ClientSummary>> {
        self.refresh().await?;
        Ok(self.clients.get(client_id).await)
    }

    /// Orders matching every given filter, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, query: &OrderListQuery) -> Result<Vec<OrderSummary>> {
        self.refresh().await?;
        let range = query.range();

        let matching = self.orders.all().await.into_iter().filter(|o| {
            query.status.is_none_or(|s| o.status == s)
                && query.payment_status.is_none_or(|s| o.payment_status == s)
                && query.priority.is_none_or(|p| o.priority == p)
                && query.client_id.is_none_or(|c| o.client_id == c)
                && range.contains(o.order_date)
        });

        let page = matching.skip(query.offset.unwrap_or(0));
        Ok(match query.limit {
            Some(limit) => page.take(limit).collect(),
            None => page.collect(),
        })
    }

    /// Order counts per status and per priority over orders placed in range.
    #[tracing::instrument(skip(self))]
    pub async fn status_breakdown(&self, query: &StatusBreakdownQuery) -> Result<StatusBreakdown> {
        self.refresh().await?;
        let range = DateRange::new(query.from, query.to);
        let orders: Vec<_> = self
            .orders
            .all()
            .await
            .into_iter()
            .filter(|o| range.contains(o.order_date))
            .collect();

        let by_status = OrderStatus::ALL
            .into_iter()
            .map(|status| StatusCount {
                status,
                count: orders.iter().filter(|o| o.status == status).count(),
            })
            .collect();
        let by_priority = Priority::ALL
            .into_iter()
            .map(|priority| PriorityCount {
                priority,
                count: orders.iter().filter(|o| o.priority == priority).count(),
            })
            .collect();

        Ok(StatusBreakdown {
            total: orders.len(),
            by_status,
            by_priority,
        })
    }

    /// Revenue from completed payments, bucketed by day or month.
    #[tracing::instrument(skip(self))]
    pub async fn revenue(&self, query: &RevenueQuery) -> Result<RevenueReport> {
        self.refresh().await?;
        let payments = self.payments.completed_between(query.from, query.to).await;

        let mut buckets: BTreeMap<String, (Money, usize)> = BTreeMap::new();
        for payment in &payments {
            let bucket = buckets
                .entry(query.granularity.bucket(payment.recorded_at))
                .or_insert((Money::zero(), 0));
            bucket.0 += payment.amount;
            bucket.1 += 1;
        }

        let total = payments.iter().map(|p| p.amount).sum();
        Ok(RevenueReport {
            granularity: query.granularity,
            buckets: buckets
                .into_iter()
                .map(|(period, (revenue, payments))| RevenueBucket {
                    period,
                    revenue,
                    payments,
                })
                .collect(),
            total,
        })
    }

    /// Average time from order to completion for orders completed in range.
    #[tracing::instrument(skip(self))]
    pub async fn completion_time(&self, query: &CompletionTimeQuery) -> Result<CompletionTimeReport> {
        self.refresh().await?;
        let range = DateRange::new(query.from, query.to);

        let hours: Vec<f64> = self
            .orders
            .all()
            .await
            .iter()
            .filter(|o| o.completed_date.is_some_and(|done| range.contains(done)))
            .filter_map(OrderSummary::completion_hours)
            .collect();

        let average_hours = if hours.is_empty() {
            None
        } else {
            Some(hours.iter().sum::<f64>() / hours.len() as f64)
        };

        Ok(CompletionTimeReport {
            average_hours,
            sample_size: hours.len(),
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn top_clients(&self, query: &TopClientsQuery) -> Result<Vec<ClientSummary>> {
        self.refresh().await?;
        Ok(self.clients.top(query.limit).await)
    }

    #[tracing::instrument(skip(self))]
    pub async fn summary(&self) -> Result<DashboardSummary> {
        self.refresh().await?;
        let orders = self.orders.all().await;

        let active_orders = orders.iter().filter(|o| o.status.is_active()).count();
        let outstanding_balance = orders
            .iter()
            .filter(|o| o.status != OrderStatus::Cancelled)
            .map(OrderSummary::outstanding)
            .sum();
        let total_revenue = self
            .payments
            .completed_between(None, None)
            .await
            .iter()
            .map(|p| p.amount)
            .sum();

        Ok(DashboardSummary {
            total_clients: self.clients.len().await,
            total_orders: orders.len(),
            active_orders,
            total_revenue,
            outstanding_balance,
        })
    }
}
