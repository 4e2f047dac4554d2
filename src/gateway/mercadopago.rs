//! Mercado Pago adapter.
//!
//! Pull-style provider: notifications only say a payment changed, so
//! confirmation goes back through `verify_charge` against the payments
//! API. Amounts go over the wire in BRL as JSON numbers.

use async_trait::async_trait;
use bigdecimal::ToPrimitive;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ensure_positive, ChargeRequest, ChargeVerification, GatewayError, PixCharge, PixGateway};
use crate::settings::MercadoPagoSettings;
use crate::utils::{body_snippet, scalar_to_string};

pub const GATEWAY_NAME: &str = "mercadopago";

#[derive(Debug)]
pub struct MercadoPagoGateway {
    http: Client,
    settings: MercadoPagoSettings,
}

#[derive(Serialize)]
struct CreatePaymentBody<'a> {
    transaction_amount: f64,
    description: &'a str,
    payment_method_id: &'static str,
    external_reference: &'a str,
    payer: PayerBody<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification_url: Option<&'a str>,
    installments: u32,
}

#[derive(Serialize)]
struct PayerBody<'a> {
    email: &'a str,
    first_name: &'static str,
    last_name: &'static str,
}

#[derive(Deserialize)]
struct CreatePaymentResponse {
    /// Numeric in practice, but tolerated as a string too.
    id: Value,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    point_of_interaction: Option<PointOfInteraction>,
}

#[derive(Deserialize)]
struct PointOfInteraction {
    #[serde(default)]
    transaction_data: Option<TransactionData>,
}

#[derive(Deserialize)]
struct TransactionData {
    #[serde(default)]
    qr_code: Option<String>,
    #[serde(default)]
    qr_code_base64: Option<String>,
}

#[derive(Deserialize)]
struct PaymentResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    external_reference: Option<String>,
}

impl MercadoPagoGateway {
    pub fn new(http: Client, settings: MercadoPagoSettings) -> Self {
        Self { http, settings }
    }

    fn transport(e: reqwest::Error) -> GatewayError {
        GatewayError::Transport {
            gateway: GATEWAY_NAME,
            message: e.to_string(),
        }
    }

    fn payments_url(&self, suffix: &str) -> String {
        format!(
            "{}/v1/payments{}",
            self.settings.api_url.trim_end_matches('/'),
            suffix
        )
    }
}

#[async_trait]
impl PixGateway for MercadoPagoGateway {
    fn name(&self) -> &'static str {
        GATEWAY_NAME
    }

    async fn create_charge(&self, request: &ChargeRequest) -> Result<PixCharge, GatewayError> {
        if !self.settings.is_configured() {
            return Err(GatewayError::Unconfigured(GATEWAY_NAME));
        }
        ensure_positive(&request.amount)?;
        let transaction_amount = request
            .amount
            .to_f64()
            .ok_or_else(|| GatewayError::InvalidAmount(request.amount.to_string()))?;

        let body = CreatePaymentBody {
            transaction_amount,
            description: &request.description,
            payment_method_id: "pix",
            external_reference: &request.external_reference,
            payer: PayerBody {
                email: &request.payer_email,
                first_name: "Customer",
                last_name: "Storefront",
            },
            notification_url: self.settings.notification_url.as_deref(),
            installments: 1,
        };

        let response = self
            .http
            .post(self.payments_url(""))
            .bearer_auth(&self.settings.access_token)
            .json(&body)
            .send()
            .await
            .map_err(Self::transport)?;

        let status = response.status();
        let raw = response.text().await.map_err(Self::transport)?;
        if !status.is_success() {
            return Err(GatewayError::Rejected {
                gateway: GATEWAY_NAME,
                message: format!("HTTP {}: {}", status.as_u16(), body_snippet(&raw)),
            });
        }

        let parsed: CreatePaymentResponse = serde_json::from_str(&raw).map_err(|e| {
            GatewayError::Rejected {
                gateway: GATEWAY_NAME,
                message: format!("unreadable response: {e}"),
            }
        })?;

        let gateway_reference = scalar_to_string(&parsed.id).ok_or_else(|| {
            GatewayError::Rejected {
                gateway: GATEWAY_NAME,
                message: "payment id missing from response".to_string(),
            }
        })?;

        let transaction_data = parsed
            .point_of_interaction
            .and_then(|poi| poi.transaction_data);
        let (code, qr_code_base64) = match transaction_data {
            Some(data) => (
                data.qr_code.unwrap_or_default(),
                data.qr_code_base64.unwrap_or_default(),
            ),
            None => (String::new(), String::new()),
        };

        Ok(PixCharge {
            gateway_reference,
            code,
            qr_code_base64,
            raw_status: parsed.status.unwrap_or_else(|| "pending".to_string()),
        })
    }

    async fn verify_charge(&self, reference: &str) -> Result<ChargeVerification, GatewayError> {
        if !self.settings.is_configured() {
            return Err(GatewayError::Unconfigured(GATEWAY_NAME));
        }

        let response = self
            .http
            .get(self.payments_url(&format!("/{reference}")))
            .bearer_auth(&self.settings.access_token)
            .send()
            .await
            .map_err(Self::transport)?;

        let status = response.status();
        let raw = response.text().await.map_err(Self::transport)?;
        if !status.is_success() {
            return Err(GatewayError::Rejected {
                gateway: GATEWAY_NAME,
                message: format!("HTTP {}: {}", status.as_u16(), body_snippet(&raw)),
            });
        }

        let parsed: PaymentResponse = serde_json::from_str(&raw).map_err(|e| {
            GatewayError::Rejected {
                gateway: GATEWAY_NAME,
                message: format!("unreadable response: {e}"),
            }
        })?;

        let raw_status = parsed.status.unwrap_or_default();
        Ok(ChargeVerification {
            approved: raw_status.eq_ignore_ascii_case("approved"),
            raw_status,
            external_reference: parsed.external_reference,
        })
    }
}
