//! Live-mode flows against mocked provider endpoints: charge creation,
//! webhook confirmation, pull verification and supplier calls all hit a
//! local mock server instead of the real APIs.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use mockito::Matcher;
use serde_json::{json, Value};
use tower::ServiceExt;

use vitrine_core::catalog::{default_catalog, CatalogStore};
use vitrine_core::settings::{OperatingMode, Settings, SettingsStore};
use vitrine_core::store::InMemoryOrderStore;
use vitrine_core::{create_app, http_client, AppState};

fn app_with(settings: Settings) -> Router {
    let state = AppState::new(
        Arc::new(InMemoryOrderStore::new()),
        Arc::new(CatalogStore::in_memory(default_catalog())),
        Arc::new(SettingsStore::in_memory(settings)),
        http_client(),
    );
    create_app(state)
}

/// Live settings pointing both PushinPay and the supplier panel at the
/// mock server.
fn pushinpay_settings(server: &mockito::ServerGuard) -> Settings {
    let mut settings = Settings::default();
    settings.mode = OperatingMode::Live;
    settings.pushinpay.api_url = format!("{}/api/pix/cashIn", server.url());
    settings.pushinpay.api_token = "test-token".to_string();
    settings.supplier.api_url = format!("{}/api/v2", server.url());
    settings.supplier.api_key = "panel-key".to_string();
    settings.supplier.default_service = Some("77".to_string());
    settings
}

fn mercadopago_settings(server: &mockito::ServerGuard) -> Settings {
    let mut settings = pushinpay_settings(server);
    settings.active_gateway = "mercadopago".to_string();
    settings.mercadopago.api_url = server.url();
    settings.mercadopago.access_token = "mp-token".to_string();
    settings
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(body) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_order(app: &Router) -> u64 {
    let (status, body) = send(
        app,
        "POST",
        "/orders",
        Some(json!({ "packageId": 101, "link": "https://instagram.com/someone" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["orderId"].as_u64().unwrap()
}

#[tokio::test]
async fn test_pushinpay_charge_webhook_and_single_dispatch() {
    let mut server = mockito::Server::new_async().await;

    let charge_mock = server
        .mock("POST", "/api/pix/cashIn")
        .match_header("authorization", "Bearer test-token")
        .match_body(Matcher::PartialJson(json!({ "value": 1990 })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "ch_123",
                "qr_code": "br-code",
                "qr_code_base64": "b64-img",
                "status": "created"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let add_mock = server
        .mock("POST", "/api/v2")
        .match_body(Matcher::PartialJson(json!({
            "key": "panel-key",
            "action": "add",
            "service": "77",
            "quantity": 1000,
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"order": 777}"#)
        .expect(1)
        .create_async()
        .await;

    let app = app_with(pushinpay_settings(&server));
    let order_id = create_order(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/payment"),
        Some(json!({ "method": "pix" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["gateway"], "pushinpay");
    assert_eq!(body["pixCode"], "br-code");
    assert_eq!(body["qrCodeImage"], "b64-img");
    charge_mock.assert_async().await;

    let payload = json!({ "id": "ch_123", "status": "PAID" });
    let (_, body) = send(&app, "POST", "/webhooks/pushinpay", Some(payload.clone())).await;
    assert_eq!(body["outcome"], "dispatched");

    // provider replay is absorbed without a second panel call
    let (_, body) = send(&app, "POST", "/webhooks/pushinpay", Some(payload)).await;
    assert_eq!(body["outcome"], "already_processed");
    add_mock.assert_async().await;

    let (_, body) = send(&app, "GET", "/admin/orders", None).await;
    let order = &body.as_array().unwrap()[0];
    assert_eq!(order["status"], "dispatched_to_supplier");
    assert_eq!(order["fulfillment"]["supplierOrderId"], "777");
}

#[tokio::test]
async fn test_concurrent_webhook_deliveries_dispatch_once() {
    let mut server = mockito::Server::new_async().await;

    server
        .mock("POST", "/api/pix/cashIn")
        .with_status(200)
        .with_body(r#"{"id": "ch_9", "qr_code": "c", "qr_code_base64": "i", "status": "created"}"#)
        .create_async()
        .await;
    let add_mock = server
        .mock("POST", "/api/v2")
        .match_body(Matcher::PartialJson(json!({ "action": "add" })))
        .with_status(200)
        .with_body(r#"{"order": 4242}"#)
        .expect(1)
        .create_async()
        .await;

    let app = app_with(pushinpay_settings(&server));
    let order_id = create_order(&app).await;
    let (status, _) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/payment"),
        Some(json!({ "method": "pix" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let payload = json!({ "id": "ch_9", "status": "paid" });
    let first = send(&app, "POST", "/webhooks/pushinpay", Some(payload.clone()));
    let second = send(&app, "POST", "/webhooks/pushinpay", Some(payload.clone()));
    let (first, second) = tokio::join!(first, second);

    let mut outcomes = vec![
        first.1["outcome"].as_str().unwrap().to_string(),
        second.1["outcome"].as_str().unwrap().to_string(),
    ];
    outcomes.sort();
    assert_eq!(outcomes, vec!["already_processed", "dispatched"]);
    add_mock.assert_async().await;
}

#[tokio::test]
async fn test_gateway_rejection_leaves_order_retryable() {
    let mut server = mockito::Server::new_async().await;
    let failing = server
        .mock("POST", "/api/pix/cashIn")
        .with_status(500)
        .with_body("internal failure")
        .create_async()
        .await;

    let app = app_with(pushinpay_settings(&server));
    let order_id = create_order(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/payment"),
        Some(json!({ "method": "pix" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "gateway_rejected");

    // no reference was attached and the charge can simply be retried
    let (_, body) = send(&app, "GET", &format!("/orders/{order_id}/status"), None).await;
    assert_eq!(body["orderStatus"], "awaiting_payment");
    assert_eq!(body["paymentStatus"], "awaiting_charge");

    failing.remove_async().await;
    server
        .mock("POST", "/api/pix/cashIn")
        .with_status(200)
        .with_body(r#"{"id": "ch_2", "qr_code": "c2", "qr_code_base64": "i2", "status": "created"}"#)
        .create_async()
        .await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/payment"),
        Some(json!({ "method": "pix" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pixCode"], "c2");
}

#[tokio::test]
async fn test_unconfigured_gateway_is_reported_distinctly() {
    let mut settings = Settings::default();
    settings.mode = OperatingMode::Live;
    // active gateway stays pushinpay, but no token was ever configured
    let app = app_with(settings);
    let order_id = create_order(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/payment"),
        Some(json!({ "method": "pix" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "gateway_unconfigured");
}

#[tokio::test]
async fn test_mercadopago_charge_and_pull_verification() {
    let mut server = mockito::Server::new_async().await;
    let app = app_with(mercadopago_settings(&server));
    let order_id = create_order(&app).await;

    let create_mock = server
        .mock("POST", "/v1/payments")
        .match_header("authorization", "Bearer mp-token")
        .match_body(Matcher::PartialJson(json!({
            "payment_method_id": "pix",
            "external_reference": order_id.to_string(),
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": 555,
                "status": "pending",
                "point_of_interaction": {
                    "transaction_data": { "qr_code": "mp-code", "qr_code_base64": "mp-b64" }
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/payment"),
        Some(json!({ "method": "pix" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["gateway"], "mercadopago");
    assert_eq!(body["pixCode"], "mp-code");
    create_mock.assert_async().await;

    let verify_mock = server
        .mock("GET", "/v1/payments/555")
        .match_header("authorization", "Bearer mp-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "status": "approved", "external_reference": order_id.to_string() })
                .to_string(),
        )
        .create_async()
        .await;
    let add_mock = server
        .mock("POST", "/api/v2")
        .match_body(Matcher::PartialJson(json!({ "action": "add" })))
        .with_status(200)
        .with_body(r#"{"order": 888}"#)
        .expect(1)
        .create_async()
        .await;

    let (status, body) = send(
        &app,
        "POST",
        "/webhooks/mercadopago",
        Some(json!({ "type": "payment", "data": { "id": 555 } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "dispatched");
    verify_mock.assert_async().await;
    add_mock.assert_async().await;

    let (_, body) = send(&app, "GET", &format!("/orders/{order_id}/status"), None).await;
    assert_eq!(body["orderStatus"], "dispatched_to_supplier");
}

#[tokio::test]
async fn test_mercadopago_unapproved_verification_keeps_order_waiting() {
    let mut server = mockito::Server::new_async().await;
    let app = app_with(mercadopago_settings(&server));
    let order_id = create_order(&app).await;

    server
        .mock("POST", "/v1/payments")
        .with_status(201)
        .with_body(json!({ "id": 556, "status": "pending" }).to_string())
        .create_async()
        .await;
    let (status, _) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/payment"),
        Some(json!({ "method": "pix" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    server
        .mock("GET", "/v1/payments/556")
        .with_status(200)
        .with_body(json!({ "status": "cancelled" }).to_string())
        .create_async()
        .await;

    let (status, body) = send(
        &app,
        "POST",
        "/webhooks/mercadopago",
        Some(json!({ "type": "payment", "data": { "id": 556 } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "not_approved");

    let (_, body) = send(&app, "GET", &format!("/orders/{order_id}/status"), None).await;
    assert_eq!(body["orderStatus"], "awaiting_payment");
}

#[tokio::test]
async fn test_supplier_status_poll_stores_verbatim_answer() {
    let mut server = mockito::Server::new_async().await;

    server
        .mock("POST", "/api/pix/cashIn")
        .with_status(200)
        .with_body(r#"{"id": "ch_7", "qr_code": "c", "qr_code_base64": "i", "status": "created"}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/api/v2")
        .match_body(Matcher::PartialJson(json!({ "action": "add" })))
        .with_status(200)
        .with_body(r#"{"order": 777}"#)
        .create_async()
        .await;

    let app = app_with(pushinpay_settings(&server));
    let order_id = create_order(&app).await;
    send(
        &app,
        "POST",
        &format!("/orders/{order_id}/payment"),
        Some(json!({ "method": "pix" })),
    )
    .await;
    let (_, body) = send(
        &app,
        "POST",
        "/webhooks/pushinpay",
        Some(json!({ "id": "ch_7", "status": "paid" })),
    )
    .await;
    assert_eq!(body["outcome"], "dispatched");

    let status_mock = server
        .mock("POST", "/api/v2")
        .match_body(Matcher::PartialJson(json!({ "action": "status", "order": "777" })))
        .with_status(200)
        .with_body(r#"{"status": "In progress", "remains": "250"}"#)
        .create_async()
        .await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/admin/orders/{order_id}/refresh-status"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["supplierStatus"], "In progress");

    let (_, body) = send(&app, "GET", "/admin/orders", None).await;
    let order = &body.as_array().unwrap()[0];
    assert_eq!(order["fulfillment"]["supplierStatus"], "In progress");
    // the lifecycle state is not touched by a poll
    assert_eq!(order["status"], "dispatched_to_supplier");

    // a panel answering with an unknown shape maps to a distinct error
    status_mock.remove_async().await;
    server
        .mock("POST", "/api/v2")
        .match_body(Matcher::PartialJson(json!({ "action": "status" })))
        .with_status(200)
        .with_body(r#"{"weird": true}"#)
        .create_async()
        .await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/admin/orders/{order_id}/refresh-status"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "supplier_unrecognized_response");
}

#[tokio::test]
async fn test_supplier_balance_and_upstream_error_mapping() {
    let mut server = mockito::Server::new_async().await;
    let app = app_with(pushinpay_settings(&server));

    let balance_mock = server
        .mock("POST", "/api/v2")
        .match_body(Matcher::PartialJson(json!({ "key": "panel-key", "action": "balance" })))
        .with_status(200)
        .with_body(r#"{"balance": "123.45", "currency": "USD"}"#)
        .create_async()
        .await;

    let (status, body) = send(&app, "GET", "/admin/supplier/balance", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], "123.45");

    balance_mock.remove_async().await;
    server
        .mock("POST", "/api/v2")
        .with_status(200)
        .with_body(r#"{"error": "Invalid API key"}"#)
        .create_async()
        .await;

    let (status, body) = send(&app, "GET", "/admin/supplier/balance", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "supplier_rejected");
}

#[tokio::test]
async fn test_supplier_services_listing_includes_catalog() {
    let mut server = mockito::Server::new_async().await;
    let app = app_with(pushinpay_settings(&server));

    server
        .mock("POST", "/api/v2")
        .match_body(Matcher::PartialJson(json!({ "action": "services" })))
        .with_status(200)
        .with_body(
            json!([
                { "service": 2044, "name": "Followers", "rate": "1.20", "min": 100, "max": 10000 }
            ])
            .to_string(),
        )
        .create_async()
        .await;

    let (status, body) = send(&app, "GET", "/admin/supplier/services", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["services"][0]["service"], "2044");
    assert_eq!(body["services"][0]["name"], "Followers");
    // current packages ride along so the operator can map services
    assert_eq!(body["packages"].as_array().unwrap().len(), 2);
}
