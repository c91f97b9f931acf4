//! HTTP API server for the order-inventory consistency engine.
//!
//! A thin adapter: handlers extract the caller and request, delegate to
//! [`OrderService`], and map engine errors to status codes. Structured
//! logging comes from `tracing`, metrics are exported for Prometheus.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use engine::OrderService;
use metrics_exporter_prometheus::PrometheusHandle;
use store::{InMemoryOrderRepository, InMemoryStockStore, OrderRepository, PostgresStore, StockStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<R: OrderRepository, S: StockStore> {
    pub service: OrderService<R, S>,

    /// Name of the storage backend, reported by `/health`.
    pub storage: &'static str,
}

impl AppState<InMemoryOrderRepository, InMemoryStockStore> {
    /// State backed by empty in-memory stores.
    pub fn in_memory() -> Arc<Self> {
        Arc::new(Self {
            service: OrderService::new(InMemoryOrderRepository::new(), InMemoryStockStore::new()),
            storage: "memory",
        })
    }
}

impl AppState<PostgresStore, PostgresStore> {
    /// State backed by PostgreSQL for both orders and stock.
    pub fn postgres(store: PostgresStore) -> Arc<Self> {
        Arc::new(Self {
            service: OrderService::new(store.clone(), store),
            storage: "postgres",
        })
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<R, S>(state: Arc<AppState<R, S>>, metrics_handle: PrometheusHandle) -> Router
where
    R: OrderRepository + 'static,
    S: StockStore + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::system::health::<R, S>))
        .route(
            "/orders",
            post(routes::orders::create::<R, S>).get(routes::orders::list::<R, S>),
        )
        .route("/orders/checkout", post(routes::orders::checkout::<R, S>))
        .route(
            "/orders/{id}",
            get(routes::orders::get::<R, S>)
                .patch(routes::orders::update::<R, S>)
                .delete(routes::orders::delete::<R, S>),
        )
        .route(
            "/products/{id}/stock",
            get(routes::products::get_stock::<R, S>).put(routes::products::set_stock::<R, S>),
        )
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
