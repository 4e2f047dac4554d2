use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::settings::SettingsError;
use crate::store::StoreError;
use crate::supplier::SupplierError;

/// Top-level error for HTTP handlers. Boundary errors from the gateway,
/// supplier and store layers convert into this and map onto a status code
/// plus a stable machine-readable `code` in the JSON body.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Supplier(#[from] SupplierError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Gateway(e) => match e {
                GatewayError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            },
            AppError::Supplier(e) => match e {
                SupplierError::Unconfigured(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            },
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Settings(e) => match e {
                SettingsError::Invalid(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not_found",
            AppError::Gateway(e) => match e {
                GatewayError::Unconfigured(_) => "gateway_unconfigured",
                GatewayError::Unsupported(_) => "unsupported_gateway",
                GatewayError::InvalidAmount(_) => "invalid_amount",
                GatewayError::Rejected { .. } => "gateway_rejected",
                GatewayError::Transport { .. } => "gateway_unreachable",
                GatewayError::VerifyUnsupported(_) => "gateway_verify_unsupported",
            },
            AppError::Supplier(e) => match e {
                SupplierError::Unconfigured(_) => "supplier_unconfigured",
                SupplierError::Upstream(_) => "supplier_rejected",
                SupplierError::Transport(_) => "supplier_unreachable",
                SupplierError::UnrecognizedResponse(_) => "supplier_unrecognized_response",
            },
            AppError::Store(_) => "storage",
            AppError::Settings(e) => match e {
                SettingsError::Invalid(_) => "invalid_settings",
                _ => "settings",
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "code": self.error_code(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
