//! Reports driven by real back-office commands against an in-memory store.

use chrono::{Duration, Utc};
use common::{Actor, AggregateId, StaffRole};
use domain::{
    Aggregate, BackOffice, ClientDetails, LineItem, Money, NewOrder, NewPayment, OrderPatch,
    OrderStatus, PaymentMethod, PaymentStatus, Priority, RefundRequest,
};
use event_store::InMemoryEventStore;
use reporting::{
    CompletionTimeQuery, Granularity, OrderListQuery, Reports, RevenueQuery, StatusBreakdownQuery,
    TopClientsQuery,
};

fn cents(n: i64) -> Money {
    Money::from_cents(n)
}

fn manager() -> Actor {
    Actor::new("mgr-1", StaffRole::Manager)
}

struct Shop {
    office: BackOffice<InMemoryEventStore>,
    reports: Reports<InMemoryEventStore>,
}

impl Shop {
    fn new() -> Self {
        let store = InMemoryEventStore::new();
        Self {
            office: BackOffice::new(store.clone()),
            reports: Reports::new(store),
        }
    }

    async fn client(&self, name: &str) -> AggregateId {
        self.office
            .clients
            .register_client(ClientDetails::named(name), &manager())
            .await
            .unwrap()
            .id()
            .unwrap()
    }

    async fn order(&self, client_id: AggregateId, total: i64, priority: Priority) -> AggregateId {
        self.office
            .orders
            .create_order(
                NewOrder::new(client_id, vec![LineItem::new("dress", "Evening dress", 1, cents(total))])
                    .with_priority(priority),
                &manager(),
            )
            .await
            .unwrap()
            .id()
            .unwrap()
    }

    async fn pay(&self, order_id: AggregateId, amount: i64) -> AggregateId {
        self.office
            .payments
            .record_payment(order_id, NewPayment::new(cents(amount), PaymentMethod::Card), &manager())
            .await
            .unwrap()
            .id()
            .unwrap()
    }

    async fn advance(&self, order_id: AggregateId, statuses: &[OrderStatus]) {
        for status in statuses {
            self.office
                .orders
                .change_status(order_id, *status, None, &manager())
                .await
                .unwrap();
        }
    }
}

#[tokio::test]
async fn order_listing_reflects_commands() {
    let shop = Shop::new();
    let ana = shop.client("Ana").await;
    let ben = shop.client("Ben").await;

    let first = shop.order(ana, 1000, Priority::High).await;
    let second = shop.order(ben, 500, Priority::Normal).await;
    shop.pay(first, 400).await;

    let all = shop.reports.list_orders(&OrderListQuery::default()).await.unwrap();
    assert_eq!(all.len(), 2);

    let summary = shop.reports.order(first).await.unwrap().unwrap();
    assert_eq!(summary.payment_status, PaymentStatus::Partial);
    assert_eq!(summary.total_paid, cents(400));
    assert_eq!(summary.outstanding(), cents(600));
    assert!(summary.order_number.starts_with("ORD-"));

    let for_ben = shop
        .reports
        .list_orders(&OrderListQuery {
            client_id: Some(ben),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(for_ben.len(), 1);
    assert_eq!(for_ben[0].order_id, second);

    let partial = shop
        .reports
        .list_orders(&OrderListQuery {
            payment_status: Some(PaymentStatus::Partial),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(partial.len(), 1);

    let paged = shop
        .reports
        .list_orders(&OrderListQuery {
            limit: Some(1),
            offset: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(paged.len(), 1);

    let future = shop
        .reports
        .list_orders(&OrderListQuery {
            from: Some(Utc::now() + Duration::days(1)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(future.is_empty());
}

#[tokio::test]
async fn updates_and_deletes_flow_into_views() {
    let shop = Shop::new();
    let ana = shop.client("Ana").await;
    let order_id = shop.order(ana, 1000, Priority::Normal).await;
    let doomed = shop.order(ana, 300, Priority::Low).await;

    shop.office
        .orders
        .update_order(
            order_id,
            OrderPatch {
                priority: Some(Priority::Urgent),
                discount: Some(cents(200)),
                ..Default::default()
            },
            &manager(),
        )
        .await
        .unwrap();
    shop.office.orders.delete_order(doomed, &manager()).await.unwrap();

    let summary = shop.reports.order(order_id).await.unwrap().unwrap();
    assert_eq!(summary.priority, Priority::Urgent);
    assert_eq!(summary.total, cents(800));
    assert!(shop.reports.order(doomed).await.unwrap().is_none());

    let client = shop.reports.client(ana).await.unwrap().unwrap();
    assert_eq!(client.total_orders, 1);
    assert_eq!(client.total_spent, cents(800));
}

#[tokio::test]
async fn status_breakdown_includes_every_status() {
    let shop = Shop::new();
    let ana = shop.client("Ana").await;
    let a = shop.order(ana, 100, Priority::Normal).await;
    let b = shop.order(ana, 200, Priority::Urgent).await;
    shop.order(ana, 300, Priority::Urgent).await;

    shop.advance(a, &[OrderStatus::InProgress]).await;
    shop.advance(b, &[OrderStatus::Cancelled]).await;

    let breakdown = shop
        .reports
        .status_breakdown(&StatusBreakdownQuery::default())
        .await
        .unwrap();

    assert_eq!(breakdown.total, 3);
    assert_eq!(breakdown.by_status.len(), OrderStatus::ALL.len());
    assert_eq!(breakdown.count_for(OrderStatus::Pending), 1);
    assert_eq!(breakdown.count_for(OrderStatus::InProgress), 1);
    assert_eq!(breakdown.count_for(OrderStatus::Cancelled), 1);
    assert_eq!(breakdown.count_for(OrderStatus::Delivered), 0);

    let urgent = breakdown
        .by_priority
        .iter()
        .find(|c| c.priority == Priority::Urgent)
        .unwrap();
    assert_eq!(urgent.count, 2);
}

#[tokio::test]
async fn revenue_counts_completed_payments_only() {
    let shop = Shop::new();
    let ana = shop.client("Ana").await;
    let order_id = shop.order(ana, 1000, Priority::Normal).await;

    shop.pay(order_id, 300).await;
    let refunded = shop.pay(order_id, 200).await;
    shop.office
        .payments
        .refund_payment(refunded, RefundRequest::new(cents(200), "Wrong card"), &manager())
        .await
        .unwrap();

    let daily = shop.reports.revenue(&RevenueQuery::default()).await.unwrap();
    assert_eq!(daily.total, cents(300));
    assert_eq!(daily.buckets.len(), 1);
    assert_eq!(daily.buckets[0].period, Granularity::Day.bucket(Utc::now()));
    assert_eq!(daily.buckets[0].payments, 1);

    let monthly = shop
        .reports
        .revenue(&RevenueQuery {
            granularity: Granularity::Month,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(monthly.buckets[0].period, Granularity::Month.bucket(Utc::now()));

    let before = shop
        .reports
        .revenue(&RevenueQuery {
            to: Some(Utc::now() - Duration::days(1)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(before.total, Money::zero());
    assert!(before.buckets.is_empty());
}

#[tokio::test]
async fn completion_time_averages_completed_orders() {
    let shop = Shop::new();
    let ana = shop.client("Ana").await;
    let done = shop.order(ana, 100, Priority::Normal).await;
    shop.order(ana, 100, Priority::Normal).await;

    let empty = shop
        .reports
        .completion_time(&CompletionTimeQuery::default())
        .await
        .unwrap();
    assert_eq!(empty.sample_size, 0);
    assert!(empty.average_hours.is_none());

    shop.advance(done, &[OrderStatus::InProgress, OrderStatus::Completed])
        .await;

    let report = shop
        .reports
        .completion_time(&CompletionTimeQuery::default())
        .await
        .unwrap();
    assert_eq!(report.sample_size, 1);
    let hours = report.average_hours.unwrap();
    assert!((0.0..1.0).contains(&hours));
}

#[tokio::test]
async fn reopened_orders_leave_completion_time() {
    let shop = Shop::new();
    let ana = shop.client("Ana").await;
    let reworked = shop.order(ana, 100, Priority::Normal).await;

    shop.advance(
        reworked,
        &[OrderStatus::InProgress, OrderStatus::Completed, OrderStatus::InProgress],
    )
    .await;

    let summary = shop.reports.order(reworked).await.unwrap().unwrap();
    assert_eq!(summary.status, OrderStatus::InProgress);
    assert!(summary.completed_date.is_none());

    let report = shop
        .reports
        .completion_time(&CompletionTimeQuery::default())
        .await
        .unwrap();
    assert_eq!(report.sample_size, 0);
    assert!(report.average_hours.is_none());

    let order = shop.office.orders.get_order(reworked).await.unwrap();
    assert!(order.completed_date().is_none());

    shop.advance(reworked, &[OrderStatus::Completed]).await;
    let report = shop
        .reports
        .completion_time(&CompletionTimeQuery::default())
        .await
        .unwrap();
    assert_eq!(report.sample_size, 1);
}

#[tokio::test]
async fn top_clients_and_summary() {
    let shop = Shop::new();
    let ana = shop.client("Ana").await;
    let ben = shop.client("Ben").await;
    shop.client("Cleo").await;

    let big = shop.order(ana, 5000, Priority::Normal).await;
    shop.order(ben, 1500, Priority::Normal).await;
    let small = shop.order(ben, 700, Priority::Normal).await;

    shop.pay(big, 5000).await;
    shop.pay(small, 200).await;
    shop.advance(small, &[OrderStatus::Cancelled]).await;

    let top = shop
        .reports
        .top_clients(&TopClientsQuery { limit: 2 })
        .await
        .unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].client_id, ana);
    assert_eq!(top[0].total_spent, cents(5000));
    assert_eq!(top[1].client_id, ben);
    assert_eq!(top[1].total_orders, 2);

    let summary = shop.reports.summary().await.unwrap();
    assert_eq!(summary.total_clients, 3);
    assert_eq!(summary.total_orders, 3);
    assert_eq!(summary.active_orders, 2);
    assert_eq!(summary.total_revenue, cents(5200));
    // Only the unpaid 1500 order is outstanding; the cancelled one is excluded.
    assert_eq!(summary.outstanding_balance, cents(1500));

    let counts = shop.reports.view_counts();
    assert_eq!(counts.get("orders"), Some(&3));
    assert_eq!(counts.get("clients"), Some(&3));
}

#[tokio::test]
async fn rebuild_matches_incremental_state() {
    let shop = Shop::new();
    let ana = shop.client("Ana").await;
    let order_id = shop.order(ana, 900, Priority::Normal).await;
    shop.pay(order_id, 900).await;

    let before = shop.reports.summary().await.unwrap();
    shop.reports.rebuild().await.unwrap();
    let after = shop.reports.summary().await.unwrap();

    assert_eq!(before.total_orders, after.total_orders);
    assert_eq!(before.total_revenue, after.total_revenue);
    assert_eq!(
        shop.reports.order(order_id).await.unwrap().unwrap().payment_status,
        PaymentStatus::Paid
    );
}
