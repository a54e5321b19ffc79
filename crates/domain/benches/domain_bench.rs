use std::hint::black_box;

use common::{Actor, AggregateId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    Aggregate, BackOffice, Balance, ClientDetails, LineItem, Money, NewOrder, NewPayment, Order,
    PaymentMethod, Repository,
};
use event_store::InMemoryEventStore;

fn items() -> Vec<LineItem> {
    vec![
        LineItem::new("suit", "Charcoal three-piece", 1, Money::from_cents(120_000)),
        LineItem::new("shirt", "Poplin, french cuff", 3, Money::from_cents(9_500)),
    ]
}

fn setup(rt: &tokio::runtime::Runtime) -> (BackOffice<InMemoryEventStore>, AggregateId) {
    let office = BackOffice::new(InMemoryEventStore::new());
    let client_id = rt.block_on(async {
        office
            .clients
            .register_client(ClientDetails::named("Bench Client"), &Actor::system())
            .await
            .unwrap()
            .id()
            .unwrap()
    });
    (office, client_id)
}

fn bench_create_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (office, client_id) = setup(&rt);

    c.bench_function("domain/create_order", |b| {
        b.iter(|| {
            rt.block_on(async {
                office
                    .orders
                    .create_order(NewOrder::new(client_id, items()), &Actor::system())
                    .await
                    .unwrap()
            })
        });
    });
}

fn bench_record_payment(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (office, client_id) = setup(&rt);
    let order_id = rt.block_on(async {
        office
            .orders
            .create_order(NewOrder::new(client_id, items()), &Actor::system())
            .await
            .unwrap()
            .id()
            .unwrap()
    });

    // Every iteration settles against a growing ledger.
    c.bench_function("domain/record_payment", |b| {
        b.iter(|| {
            rt.block_on(async {
                office
                    .payments
                    .record_payment(
                        order_id,
                        NewPayment::new(Money::from_cents(100), PaymentMethod::Card),
                        &Actor::system(),
                    )
                    .await
                    .unwrap()
            })
        });
    });
}

fn bench_replay_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let office = BackOffice::new(store.clone());
    let repo = Repository::new(store);
    let client_id = rt.block_on(async {
        office
            .clients
            .register_client(ClientDetails::named("Replay"), &Actor::system())
            .await
            .unwrap()
            .id()
            .unwrap()
    });
    let order_id = rt.block_on(async {
        let order_id = office
            .orders
            .create_order(NewOrder::new(client_id, items()), &Actor::system())
            .await
            .unwrap()
            .id()
            .unwrap();
        for _ in 0..50 {
            office
                .payments
                .record_payment(
                    order_id,
                    NewPayment::new(Money::from_cents(10), PaymentMethod::Cash),
                    &Actor::system(),
                )
                .await
                .unwrap();
        }
        order_id
    });

    c.bench_function("domain/replay_order_100_events", |b| {
        b.iter(|| rt.block_on(async { repo.load::<Order>(black_box(order_id)).await.unwrap() }));
    });
}

fn bench_settle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (office, client_id) = setup(&rt);
    let payments = rt.block_on(async {
        let order_id = office
            .orders
            .create_order(NewOrder::new(client_id, items()), &Actor::system())
            .await
            .unwrap()
            .id()
            .unwrap();
        for _ in 0..100 {
            office
                .payments
                .record_payment(
                    order_id,
                    NewPayment::new(Money::from_cents(50), PaymentMethod::Cash),
                    &Actor::system(),
                )
                .await
                .unwrap();
        }
        office.orders.list_payments(order_id).await.unwrap()
    });

    c.bench_function("domain/settle_100_payments", |b| {
        b.iter(|| Balance::settle(black_box(Money::from_cents(148_500)), &payments));
    });
}

criterion_group!(
    benches,
    bench_create_order,
    bench_record_payment,
    bench_replay_order,
    bench_settle
);
criterion_main!(benches);
