//! Payment gateway port and adapters.
//!
//! Both PIX providers are driven through one trait: charge creation at
//! checkout and, where the provider supports it, charge verification for
//! pull-style confirmation. Handlers never see provider-specific shapes.

pub mod mercadopago;
pub mod pushinpay;
pub mod simulated;
pub mod webhook;

pub use mercadopago::MercadoPagoGateway;
pub use pushinpay::PushinPayGateway;
pub use simulated::SimulatedGateway;

use async_trait::async_trait;
use bigdecimal::{BigDecimal, ToPrimitive};
use thiserror::Error;

use crate::settings::{OperatingMode, Settings};

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Gateway '{0}' is not configured")]
    Unconfigured(&'static str),

    #[error("Unsupported gateway: {0}")]
    Unsupported(String),

    #[error("Amount not chargeable: {0}")]
    InvalidAmount(String),

    #[error("{gateway} rejected the request: {message}")]
    Rejected {
        gateway: &'static str,
        message: String,
    },

    #[error("Could not reach {gateway}: {message}")]
    Transport {
        gateway: &'static str,
        message: String,
    },

    #[error("Gateway '{0}' does not support charge verification")]
    VerifyUnsupported(&'static str),
}

/// What the engine asks a gateway to charge.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub amount: BigDecimal,
    pub description: String,
    pub payer_email: String,
    /// Local order id, echoed back by providers for correlation.
    pub external_reference: String,
}

/// A created charge, normalized across providers.
#[derive(Debug, Clone)]
pub struct PixCharge {
    pub gateway_reference: String,
    /// Copy-paste PIX code.
    pub code: String,
    /// QR image as base64, exactly as the provider hands it over.
    pub qr_code_base64: String,
    pub raw_status: String,
}

/// Answer to asking a provider about a charge it issued earlier.
#[derive(Debug, Clone)]
pub struct ChargeVerification {
    pub approved: bool,
    pub raw_status: String,
    /// Local order id the provider stored with the charge, when echoed.
    pub external_reference: Option<String>,
}

#[async_trait]
pub trait PixGateway: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_charge(&self, request: &ChargeRequest) -> Result<PixCharge, GatewayError>;

    /// Pull-style confirmation. Push-only providers keep the default.
    async fn verify_charge(&self, _reference: &str) -> Result<ChargeVerification, GatewayError> {
        Err(GatewayError::VerifyUnsupported(self.name()))
    }
}

/// Picks the adapter handling new charges for this settings snapshot.
pub fn resolve_active(
    settings: &Settings,
    http: &reqwest::Client,
) -> Result<Box<dyn PixGateway>, GatewayError> {
    if settings.mode == OperatingMode::Simulated {
        return Ok(Box::new(SimulatedGateway::new()));
    }

    match settings.active_gateway.to_lowercase().as_str() {
        pushinpay::GATEWAY_NAME => Ok(Box::new(PushinPayGateway::new(
            http.clone(),
            settings.pushinpay.clone(),
        ))),
        mercadopago::GATEWAY_NAME => Ok(Box::new(MercadoPagoGateway::new(
            http.clone(),
            settings.mercadopago.clone(),
        ))),
        other => Err(GatewayError::Unsupported(other.to_string())),
    }
}

/// Adapter used to verify charges referenced by Mercado Pago
/// notifications. Keyed by the route the notification arrived on rather
/// than the active gateway, so a late notification still verifies after
/// the operator switches providers.
pub fn resolve_mercadopago_verifier(
    settings: &Settings,
    http: &reqwest::Client,
) -> Box<dyn PixGateway> {
    if settings.mode == OperatingMode::Simulated {
        Box::new(SimulatedGateway::new())
    } else {
        Box::new(MercadoPagoGateway::new(
            http.clone(),
            settings.mercadopago.clone(),
        ))
    }
}

pub(crate) fn ensure_positive(amount: &BigDecimal) -> Result<(), GatewayError> {
    if amount <= &BigDecimal::from(0) {
        return Err(GatewayError::InvalidAmount(amount.to_string()));
    }
    Ok(())
}

/// Converts a decimal amount in BRL to whole centavos.
pub(crate) fn amount_to_centavos(amount: &BigDecimal) -> Result<i64, GatewayError> {
    ensure_positive(amount)?;
    let centavos = (amount * BigDecimal::from(100))
        .round(0)
        .to_i64()
        .ok_or_else(|| GatewayError::InvalidAmount(amount.to_string()))?;
    if centavos <= 0 {
        return Err(GatewayError::InvalidAmount(amount.to_string()));
    }
    Ok(centavos)
}
