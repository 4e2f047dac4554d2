//! PushinPay adapter.
//!
//! Push-style provider: the charge reply carries the PIX code and QR
//! image, and confirmation arrives later on our webhook route. Amounts go
//! over the wire in centavos.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{amount_to_centavos, ChargeRequest, GatewayError, PixCharge, PixGateway};
use crate::settings::PushinPaySettings;
use crate::utils::body_snippet;

pub const GATEWAY_NAME: &str = "pushinpay";

#[derive(Debug)]
pub struct PushinPayGateway {
    http: Client,
    settings: PushinPaySettings,
}

#[derive(Serialize)]
struct CreateChargeBody<'a> {
    /// Amount in centavos.
    value: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    webhook_url: Option<&'a str>,
    external_id: &'a str,
}

#[derive(Deserialize)]
struct CreateChargeResponse {
    id: String,
    #[serde(default)]
    qr_code: Option<String>,
    #[serde(default)]
    qr_code_base64: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl PushinPayGateway {
    pub fn new(http: Client, settings: PushinPaySettings) -> Self {
        Self { http, settings }
    }

    fn transport(e: reqwest::Error) -> GatewayError {
        GatewayError::Transport {
            gateway: GATEWAY_NAME,
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl PixGateway for PushinPayGateway {
    fn name(&self) -> &'static str {
        GATEWAY_NAME
    }

    async fn create_charge(&self, request: &ChargeRequest) -> Result<PixCharge, GatewayError> {
        if !self.settings.is_configured() {
            return Err(GatewayError::Unconfigured(GATEWAY_NAME));
        }
        let value = amount_to_centavos(&request.amount)?;

        let body = CreateChargeBody {
            value,
            webhook_url: self.settings.webhook_url.as_deref(),
            external_id: &request.external_reference,
        };

        let response = self
            .http
            .post(&self.settings.api_url)
            .bearer_auth(&self.settings.api_token)
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

        let parsed: CreateChargeResponse = serde_json::from_str(&raw).map_err(|e| {
            GatewayError::Rejected {
                gateway: GATEWAY_NAME,
                message: format!("unreadable response: {e}"),
            }
        })?;

        Ok(PixCharge {
            gateway_reference: parsed.id,
            code: parsed.qr_code.unwrap_or_default(),
            qr_code_base64: parsed.qr_code_base64.unwrap_or_default(),
            raw_status: parsed.status.unwrap_or_else(|| "created".to_string()),
        })
    }
}
