//! Synthetic gateway for simulated mode.
//!
//! Produces deterministic charges without touching the network, so the
//! whole checkout and confirmation path can run on a fresh install or in
//! tests. References carry the order id and verification parses it back.

use async_trait::async_trait;

use super::{ensure_positive, ChargeRequest, ChargeVerification, GatewayError, PixCharge, PixGateway};

pub const GATEWAY_NAME: &str = "simulated";

const REFERENCE_PREFIX: &str = "SIM-";
/// Tiny placeholder image so clients always get something renderable.
const PLACEHOLDER_QR_BASE64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAA=";

#[derive(Debug, Default)]
pub struct SimulatedGateway;

impl SimulatedGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PixGateway for SimulatedGateway {
    fn name(&self) -> &'static str {
        GATEWAY_NAME
    }

    async fn create_charge(&self, request: &ChargeRequest) -> Result<PixCharge, GatewayError> {
        ensure_positive(&request.amount)?;

        let gateway_reference = format!("{REFERENCE_PREFIX}{}", request.external_reference);
        Ok(PixCharge {
            code: format!("SIMULATED-PIX-{}", request.external_reference),
            qr_code_base64: PLACEHOLDER_QR_BASE64.to_string(),
            raw_status: "created".to_string(),
            gateway_reference,
        })
    }

    async fn verify_charge(&self, reference: &str) -> Result<ChargeVerification, GatewayError> {
        let order_id = reference
            .get(..REFERENCE_PREFIX.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(REFERENCE_PREFIX))
            .map(|_| &reference[REFERENCE_PREFIX.len()..]);

        match order_id {
            Some(order_id) if !order_id.is_empty() => Ok(ChargeVerification {
                approved: true,
                raw_status: "approved".to_string(),
                external_reference: Some(order_id.to_string()),
            }),
            _ => Ok(ChargeVerification {
                approved: false,
                raw_status: "unknown".to_string(),
                external_reference: None,
            }),
        }
    }
}
