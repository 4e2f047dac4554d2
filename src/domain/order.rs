//! Order domain entities.
//! Framework-agnostic representation of a storefront order together with
//! its payment and fulfillment sub-records.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::package::Package;

/// Lifecycle of an order from checkout to supplier dispatch.
///
/// Transitions only ever move forward. `DispatchedToSupplier` and
/// `FulfillmentFailed` are terminal and absorb any further payment
/// notification for the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingPayment,
    AwaitingPayment,
    PaymentConfirmed,
    DispatchedToSupplier,
    FulfillmentFailed,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::DispatchedToSupplier | OrderStatus::FulfillmentFailed
        )
    }

    /// Charge creation is only meaningful before a payment was confirmed.
    pub fn can_start_charge(&self) -> bool {
        matches!(
            self,
            OrderStatus::PendingPayment | OrderStatus::AwaitingPayment
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    AwaitingCharge,
    AwaitingConfirmation,
    Confirmed,
}

/// Payment sub-record. `gateway_reference` is the provider-side id used to
/// correlate incoming webhooks back to the order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub status: PaymentStatus,
    pub gateway_name: Option<String>,
    pub gateway_reference: Option<String>,
    pub presented_code: Option<String>,
    pub presented_image: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl Default for PaymentDetails {
    fn default() -> Self {
        Self {
            status: PaymentStatus::AwaitingCharge,
            gateway_name: None,
            gateway_reference: None,
            presented_code: None,
            presented_image: None,
            confirmed_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentDetails {
    pub supplier_order_id: Option<String>,
    pub supplier_status: Option<String>,
    pub dispatched_at: Option<DateTime<Utc>>,
}

/// A customer order. Package name, quantity, supplier service and price are
/// captured from the catalog at creation time; later catalog edits must not
/// change what an existing order charges or dispatches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub package_id: u64,
    pub package_name: String,
    pub destination_link: String,
    pub quantity: u32,
    pub supplier_service_id: Option<String>,
    pub customer_email: Option<String>,
    pub price: BigDecimal,
    pub status: OrderStatus,
    pub payment: PaymentDetails,
    pub fulfillment: FulfillmentDetails,
}

impl Order {
    pub fn new(
        id: u64,
        package: &Package,
        destination_link: String,
        customer_email: Option<String>,
    ) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            package_id: package.id,
            package_name: package.name.clone(),
            destination_link,
            quantity: package.min,
            supplier_service_id: package.service_id.clone(),
            customer_email,
            price: package.price.clone(),
            status: OrderStatus::PendingPayment,
            payment: PaymentDetails::default(),
            fulfillment: FulfillmentDetails::default(),
        }
    }
}
