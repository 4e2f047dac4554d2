//! Order and payment orchestration for an SMM storefront: PIX charges
//! through pluggable gateways, webhook-driven confirmation, and
//! at-most-once dispatch to the fulfillment panel.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod services;
pub mod settings;
pub mod store;
pub mod supplier;
mod utils;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post, put},
    Router,
};
use reqwest::Client;
use tower_http::cors::CorsLayer;

use crate::catalog::CatalogStore;
use crate::services::ReconciliationEngine;
use crate::settings::SettingsStore;
use crate::store::OrderStore;

/// Shared outbound HTTP client. Gateways and the supplier panel get no
/// explicit deadline from their protocols, so the client enforces one.
pub fn http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
        .unwrap_or_default()
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReconciliationEngine>,
    pub settings: Arc<SettingsStore>,
    pub catalog: Arc<CatalogStore>,
    pub store: Arc<dyn OrderStore>,
    pub http: Client,
}

impl AppState {
    pub fn new(
        store: Arc<dyn OrderStore>,
        catalog: Arc<CatalogStore>,
        settings: Arc<SettingsStore>,
        http: Client,
    ) -> Self {
        let engine = Arc::new(ReconciliationEngine::new(
            store.clone(),
            catalog.clone(),
            settings.clone(),
            http.clone(),
        ));
        Self {
            engine,
            settings,
            catalog,
            store,
            http,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/packages", get(handlers::orders::list_packages))
        .route("/orders", post(handlers::orders::create_order))
        .route("/orders/:id/payment", post(handlers::orders::start_payment))
        .route("/orders/:id/status", get(handlers::orders::order_status))
        .route("/webhooks/pushinpay", post(handlers::webhooks::pushinpay))
        .route("/webhooks/mercadopago", post(handlers::webhooks::mercadopago))
        .route("/admin/orders", get(handlers::admin::list_orders))
        .route(
            "/admin/orders/:id/refresh-status",
            post(handlers::admin::refresh_order_status),
        )
        .route(
            "/admin/config/payment",
            get(handlers::admin::get_payment_config).put(handlers::admin::update_payment_config),
        )
        .route(
            "/admin/config/supplier",
            get(handlers::admin::get_supplier_config).put(handlers::admin::update_supplier_config),
        )
        .route(
            "/admin/supplier/balance",
            get(handlers::admin::supplier_balance),
        )
        .route(
            "/admin/supplier/services",
            get(handlers::admin::supplier_services),
        )
        .route("/admin/packages", put(handlers::admin::replace_packages))
        .route("/admin/dashboard", get(handlers::admin::dashboard))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
