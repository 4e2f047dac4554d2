pub mod admin;
pub mod orders;
pub mod webhooks;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::settings::OperatingMode;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub mode: OperatingMode,
    pub store: &'static str,
    pub tracked_orders: u64,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    // The order store is the only backing service; listing it doubles as
    // the reachability probe.
    let tracked_orders = match state.store.list().await {
        Ok(orders) => Some(orders.len() as u64),
        Err(e) => {
            tracing::error!(error = %e, "order store unreachable");
            None
        }
    };

    let settings = state.settings.current();
    let response = HealthStatus {
        status: if tracked_orders.is_some() {
            "healthy"
        } else {
            "unhealthy"
        },
        version: env!("CARGO_PKG_VERSION"),
        mode: settings.mode,
        store: if tracked_orders.is_some() {
            "available"
        } else {
            "unavailable"
        },
        tracked_orders: tracked_orders.unwrap_or(0),
    };

    let status_code = if tracked_orders.is_some() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
