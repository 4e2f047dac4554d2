//! Customer-facing checkout flow: browse packages, create an order,
//! request a PIX charge, poll its status.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub package_id: Option<u64>,
    pub link: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StartPaymentRequest {
    pub method: Option<String>,
}

pub async fn list_packages(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.catalog.categories().as_ref().clone())
}

pub async fn create_order(
    State(state): State<AppState>,
    Json(body): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let package_id = body
        .package_id
        .ok_or_else(|| AppError::Validation("packageId is required".to_string()))?;
    let link = body
        .link
        .ok_or_else(|| AppError::Validation("link is required".to_string()))?;

    let order = state
        .engine
        .create_order(package_id, &link, body.email)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "orderId": order.id, "status": order.status })),
    ))
}

pub async fn start_payment(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    body: Option<Json<StartPaymentRequest>>,
) -> Result<impl IntoResponse, AppError> {
    // PIX is the only method; an absent body means the same thing.
    let body = body.map(|Json(body)| body).unwrap_or_default();
    if let Some(method) = body.method.as_deref() {
        if !method.eq_ignore_ascii_case("pix") {
            return Err(AppError::Validation(format!(
                "unsupported payment method: {method}"
            )));
        }
    }

    let order = state.engine.start_charge(id).await?;
    Ok(Json(json!({
        "orderId": order.id,
        "gateway": order.payment.gateway_name,
        "qrCodeImage": order.payment.presented_image,
        "pixCode": order.payment.presented_code,
        "amount": order.price,
        "status": order.status,
    })))
}

pub async fn order_status(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.engine.order(id).await?;
    Ok(Json(json!({
        "paymentStatus": order.payment.status,
        "orderStatus": order.status,
    })))
}
