//! Operator surface: order list, gateway and supplier configuration,
//! catalog management, reporting. Secrets are never echoed back, and
//! saves merge so a blank secret keeps the stored one.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;

use crate::domain::Category;
use crate::error::AppError;
use crate::settings::{OperatingMode, Settings};
use crate::supplier;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfigView {
    pub mode: OperatingMode,
    pub active_gateway: String,
    pub pushinpay: PushinPayView,
    pub mercadopago: MercadoPagoView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushinPayView {
    pub api_url: String,
    pub api_token_exists: bool,
    pub webhook_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MercadoPagoView {
    pub api_url: String,
    pub access_token_exists: bool,
    pub notification_url: Option<String>,
}

impl PaymentConfigView {
    fn from_settings(settings: &Settings) -> Self {
        Self {
            mode: settings.mode,
            active_gateway: settings.active_gateway.clone(),
            pushinpay: PushinPayView {
                api_url: settings.pushinpay.api_url.clone(),
                api_token_exists: !settings.pushinpay.api_token.trim().is_empty(),
                webhook_url: settings.pushinpay.webhook_url.clone(),
            },
            mercadopago: MercadoPagoView {
                api_url: settings.mercadopago.api_url.clone(),
                access_token_exists: !settings.mercadopago.access_token.trim().is_empty(),
                notification_url: settings.mercadopago.notification_url.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierConfigView {
    pub api_url: String,
    pub api_key_exists: bool,
    pub default_service: Option<String>,
    pub default_quantity: u32,
    pub status_field: Option<String>,
}

impl SupplierConfigView {
    fn from_settings(settings: &Settings) -> Self {
        Self {
            api_url: settings.supplier.api_url.clone(),
            api_key_exists: !settings.supplier.api_key.trim().is_empty(),
            default_service: settings.supplier.default_service.clone(),
            default_quantity: settings.supplier.default_quantity,
            status_field: settings.supplier.status_field.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdatePaymentConfigRequest {
    pub mode: Option<OperatingMode>,
    pub active_gateway: Option<String>,
    pub pushinpay: Option<PushinPayPatch>,
    pub mercadopago: Option<MercadoPagoPatch>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PushinPayPatch {
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub webhook_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MercadoPagoPatch {
    pub api_url: Option<String>,
    pub access_token: Option<String>,
    pub notification_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateSupplierConfigRequest {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub default_service: Option<String>,
    pub default_quantity: Option<u32>,
    pub status_field: Option<String>,
}

/// Absent keeps the stored value; blank clears it.
fn set_optional(target: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value {
        let trimmed = value.trim();
        *target = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }
}

/// Secrets merge: absent or blank keeps the stored value, so the admin
/// UI can round-trip the masked view without wiping credentials.
fn set_secret(target: &mut String, value: Option<String>) {
    if let Some(value) = value {
        if !value.trim().is_empty() {
            *target = value;
        }
    }
}

fn set_text(target: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *target = value.trim().to_string();
    }
}

pub async fn list_orders(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let orders = state.engine.list_orders().await?;
    Ok(Json(orders))
}

pub async fn refresh_order_status(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, AppError> {
    let status = state.engine.refresh_supplier_status(id).await?;
    Ok(Json(json!({ "orderId": id, "supplierStatus": status })))
}

pub async fn get_payment_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(PaymentConfigView::from_settings(&state.settings.current()))
}

pub async fn update_payment_config(
    State(state): State<AppState>,
    Json(body): Json<UpdatePaymentConfigRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut settings = state.settings.current().as_ref().clone();

    if let Some(mode) = body.mode {
        settings.mode = mode;
    }
    if let Some(active) = body.active_gateway {
        settings.active_gateway = active.trim().to_lowercase();
    }
    if let Some(patch) = body.pushinpay {
        set_text(&mut settings.pushinpay.api_url, patch.api_url);
        set_secret(&mut settings.pushinpay.api_token, patch.api_token);
        set_optional(&mut settings.pushinpay.webhook_url, patch.webhook_url);
    }
    if let Some(patch) = body.mercadopago {
        set_text(&mut settings.mercadopago.api_url, patch.api_url);
        set_secret(&mut settings.mercadopago.access_token, patch.access_token);
        set_optional(
            &mut settings.mercadopago.notification_url,
            patch.notification_url,
        );
    }

    state.settings.save(settings.clone()).await?;
    tracing::info!(active_gateway = %settings.active_gateway, "payment configuration updated");
    Ok(Json(PaymentConfigView::from_settings(&settings)))
}

pub async fn get_supplier_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(SupplierConfigView::from_settings(&state.settings.current()))
}

pub async fn update_supplier_config(
    State(state): State<AppState>,
    Json(body): Json<UpdateSupplierConfigRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut settings = state.settings.current().as_ref().clone();

    set_text(&mut settings.supplier.api_url, body.api_url);
    set_secret(&mut settings.supplier.api_key, body.api_key);
    set_optional(&mut settings.supplier.default_service, body.default_service);
    if let Some(quantity) = body.default_quantity {
        settings.supplier.default_quantity = quantity;
    }
    set_optional(&mut settings.supplier.status_field, body.status_field);

    // A panel URL without a key cannot be used; catch the broken
    // half-save here instead of at dispatch time.
    if !settings.supplier.api_url.trim().is_empty() && settings.supplier.api_key.trim().is_empty() {
        return Err(AppError::Validation(
            "supplier apiKey is required when an apiUrl is set".to_string(),
        ));
    }

    state.settings.save(settings.clone()).await?;
    tracing::info!("supplier configuration updated");
    Ok(Json(SupplierConfigView::from_settings(&settings)))
}

pub async fn supplier_balance(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let settings = state.settings.current();
    let supplier = supplier::resolve_supplier(&settings, &state.http);
    let balance = supplier.balance().await?;
    Ok(Json(json!({ "balance": balance })))
}

pub async fn supplier_services(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let settings = state.settings.current();
    let supplier = supplier::resolve_supplier(&settings, &state.http);
    let services = supplier.list_services().await?;
    Ok(Json(json!({
        "services": services,
        "packages": state.catalog.categories().as_ref().clone(),
    })))
}

pub async fn replace_packages(
    State(state): State<AppState>,
    Json(categories): Json<Vec<Category>>,
) -> Result<impl IntoResponse, AppError> {
    let mut seen = HashSet::new();
    for category in &categories {
        for package in &category.packages {
            if !seen.insert(package.id) {
                return Err(AppError::Validation(format!(
                    "duplicate package id {}",
                    package.id
                )));
            }
        }
    }

    state.catalog.replace(categories.clone()).await?;
    tracing::info!(categories = categories.len(), "catalog replaced");
    Ok(Json(categories))
}

pub async fn dashboard(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.engine.dashboard().await?))
}
