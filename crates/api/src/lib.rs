//! HTTP API for the atelier order and payment ledger.
//!
//! Staff identity arrives in request headers, commands go to the domain
//! services, and listings and reports are served from the read models.
//! Structured logging comes from `tracing` and metrics are exported for
//! Prometheus on `/metrics`.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::BackOffice;
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use reporting::Reports;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: EventStore> {
    pub office: BackOffice<S>,
    pub reports: Reports<S>,
}

impl<S: EventStore + Clone> AppState<S> {
    /// Wires the services and the read models to one store.
    pub fn new(store: S) -> Self {
        Self {
            office: BackOffice::new(store.clone()),
            reports: Reports::new(store),
        }
    }
}

/// Creates the router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    use routes::{clients, health, metrics, orders, payments, reports};

    let metrics_router = Router::new()
        .route("/metrics", get(metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(health::check::<S>))
        .route("/clients", post(clients::register::<S>))
        .route(
            "/clients/{id}",
            get(clients::get::<S>)
                .patch(clients::update::<S>)
                .delete(clients::delete::<S>),
        )
        .route("/orders", post(orders::create::<S>).get(orders::list::<S>))
        .route(
            "/orders/{id}",
            get(orders::get::<S>)
                .patch(orders::update::<S>)
                .delete(orders::delete::<S>),
        )
        .route("/orders/{id}/status", post(orders::change_status::<S>))
        .route("/orders/{id}/balance", get(orders::balance::<S>))
        .route(
            "/orders/{id}/payments",
            get(orders::list_payments::<S>).post(orders::record_payment::<S>),
        )
        .route("/payments/{id}", get(payments::get::<S>))
        .route("/payments/{id}/refund", post(payments::refund::<S>))
        .route("/reports/summary", get(reports::summary::<S>))
        .route("/reports/status", get(reports::status::<S>))
        .route("/reports/revenue", get(reports::revenue::<S>))
        .route("/reports/completion-time", get(reports::completion_time::<S>))
        .route("/reports/top-clients", get(reports::top_clients::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
