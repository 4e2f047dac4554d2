//! Webhook payload normalization.
//!
//! Raw provider payloads are reduced to one canonical [`PaymentEvent`]
//! before any order state machinery runs. Payloads that cannot be
//! normalized yield `None`; webhook routes still acknowledge those with
//! 200 and only log what happened.

use serde::Deserialize;
use serde_json::Value;

use crate::utils::scalar_to_string;

/// How a payment event locates its order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderLookupKey {
    /// Provider-side charge id, matched case-insensitively.
    GatewayReference(String),
    /// Local order id echoed back by the provider.
    OrderId(u64),
}

/// Canonical payment notification, independent of which provider sent it.
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    pub key: OrderLookupKey,
    pub approved: bool,
    pub raw_status: String,
}

/// Statuses PushinPay uses for a settled charge.
const PUSHINPAY_APPROVED: &[&str] = &["APPROVED", "CONFIRMED", "PAID"];

/// Raw PushinPay webhook body. Ids are tolerated as numbers or strings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PushinPayWebhook {
    pub id: Option<Value>,
    pub external_id: Option<Value>,
    pub status: Option<String>,
}

/// Builds the canonical event for a PushinPay delivery. The merchant-side
/// `external_id` wins over the provider charge id when both are present
/// and non-empty.
pub fn normalize_pushinpay(payload: PushinPayWebhook) -> Option<PaymentEvent> {
    let reference = [payload.external_id, payload.id]
        .into_iter()
        .flatten()
        .filter_map(|value| scalar_to_string(&value))
        .find(|value| !value.trim().is_empty())?;

    let raw_status = payload.status.unwrap_or_default();
    let approved = PUSHINPAY_APPROVED
        .iter()
        .any(|candidate| raw_status.eq_ignore_ascii_case(candidate));

    Some(PaymentEvent {
        key: OrderLookupKey::GatewayReference(reference),
        approved,
        raw_status,
    })
}

/// Raw Mercado Pago notification. The IPN channel sends `topic`, the
/// webhook channel sends `type`; ids arrive as numbers or strings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MercadoPagoNotification {
    pub topic: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub data: Option<MercadoPagoNotificationData>,
    pub id: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MercadoPagoNotificationData {
    pub id: Option<Value>,
}

/// Extracts the payment id a Mercado Pago notification points at. `None`
/// when the notification is not about a payment or carries no usable id.
/// The notification itself proves nothing; the caller must verify the
/// payment with the provider before treating it as approved.
pub fn mercadopago_payment_id(notification: MercadoPagoNotification) -> Option<String> {
    let is_payment = notification.topic.as_deref() == Some("payment")
        || notification.kind.as_deref() == Some("payment");
    if !is_payment {
        return None;
    }

    let data_id = notification.data.and_then(|data| data.id);
    [data_id, notification.id]
        .into_iter()
        .flatten()
        .filter_map(|value| scalar_to_string(&value))
        .find(|value| !value.trim().is_empty())
}
