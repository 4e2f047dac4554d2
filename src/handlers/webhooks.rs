//! Inbound payment notifications.
//!
//! Both routes acknowledge with HTTP 200 no matter what the payload
//! contained. Providers retry on failure statuses, and a replayed
//! delivery is cheaper to absorb than a retry storm over data that was
//! merely unrecognized. The body reports what the event amounted to so
//! provider dashboards stay debuggable.

use axum::{body::Bytes, extract::State, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::gateway;
use crate::gateway::webhook::{self, OrderLookupKey, PaymentEvent};
use crate::utils::body_snippet;
use crate::AppState;

fn acknowledge(outcome: &str) -> Json<Value> {
    Json(json!({ "received": true, "outcome": outcome }))
}

async fn apply_event(state: &AppState, event: PaymentEvent) -> Json<Value> {
    match state.engine.on_payment_event(event).await {
        Ok(outcome) => acknowledge(outcome.as_str()),
        Err(e) => {
            tracing::error!(error = %e, "payment event processing failed");
            acknowledge("internal_error")
        }
    }
}

/// PushinPay pushes the final charge status directly; the payload alone
/// decides whether the payment is approved.
pub async fn pushinpay(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let text = String::from_utf8_lossy(&body);
    let payload = match serde_json::from_str::<webhook::PushinPayWebhook>(&text) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, body = %body_snippet(&text), "unreadable pushinpay webhook");
            return acknowledge("ignored");
        }
    };

    let Some(event) = webhook::normalize_pushinpay(payload) else {
        tracing::warn!(body = %body_snippet(&text), "pushinpay webhook carried no charge reference");
        return acknowledge("ignored");
    };

    apply_event(&state, event).await
}

/// Mercado Pago notifications only point at a payment id. The payment is
/// verified against the provider before any order state moves; the
/// notification itself is never trusted.
pub async fn mercadopago(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let text = String::from_utf8_lossy(&body);
    let notification = match serde_json::from_str::<webhook::MercadoPagoNotification>(&text) {
        Ok(notification) => notification,
        Err(e) => {
            tracing::warn!(error = %e, body = %body_snippet(&text), "unreadable mercadopago webhook");
            return acknowledge("ignored");
        }
    };

    let Some(payment_id) = webhook::mercadopago_payment_id(notification) else {
        return acknowledge("ignored");
    };

    let settings = state.settings.current();
    let verifier = gateway::resolve_mercadopago_verifier(&settings, &state.http);
    let verification = match verifier.verify_charge(&payment_id).await {
        Ok(verification) => verification,
        Err(e) => {
            tracing::error!(error = %e, payment_id = %payment_id, "payment verification failed");
            return acknowledge("verification_failed");
        }
    };

    if !verification.approved {
        tracing::info!(
            payment_id = %payment_id,
            status = %verification.raw_status,
            "verified payment not approved"
        );
        return acknowledge("not_approved");
    }

    let Some(order_id) = verification
        .external_reference
        .as_deref()
        .and_then(|reference| reference.trim().parse::<u64>().ok())
    else {
        tracing::warn!(payment_id = %payment_id, "approved payment carries no order reference");
        return acknowledge("no_matching_order");
    };

    apply_event(
        &state,
        PaymentEvent {
            key: OrderLookupKey::OrderId(order_id),
            approved: true,
            raw_status: verification.raw_status,
        },
    )
    .await
}
