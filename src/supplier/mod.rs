//! SMM supplier port and adapters.

pub mod panel;
pub mod simulated;

pub use panel::PanelClient;
pub use simulated::SimulatedSupplier;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::{OperatingMode, Settings};

#[derive(Error, Debug)]
pub enum SupplierError {
    #[error("Supplier not configured: {0}")]
    Unconfigured(String),

    #[error("Could not reach the supplier: {0}")]
    Transport(String),

    #[error("Supplier reported an error: {0}")]
    Upstream(String),

    #[error("Unrecognized supplier response: {0}")]
    UnrecognizedResponse(String),
}

/// A dispatch, fully resolved from the order and settings snapshot.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub order_id: u64,
    pub service: String,
    pub link: String,
    pub quantity: u32,
}

#[derive(Debug, Clone)]
pub struct DispatchReceipt {
    pub supplier_order_id: String,
    /// Initial status, when the supplier reports one right away.
    pub supplier_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierService {
    pub service: String,
    pub name: String,
    pub rate: String,
    pub min: u64,
    pub max: u64,
}

#[async_trait]
pub trait SupplierClient: Send + Sync {
    async fn submit_order(
        &self,
        request: &DispatchRequest,
    ) -> Result<DispatchReceipt, SupplierError>;

    async fn order_status(&self, supplier_order_id: &str) -> Result<String, SupplierError>;

    async fn balance(&self) -> Result<BigDecimal, SupplierError>;

    async fn list_services(&self) -> Result<Vec<SupplierService>, SupplierError>;
}

pub fn resolve_supplier(settings: &Settings, http: &reqwest::Client) -> Box<dyn SupplierClient> {
    if settings.mode == OperatingMode::Simulated {
        Box::new(SimulatedSupplier::new())
    } else {
        Box::new(PanelClient::new(http.clone(), settings.supplier.clone()))
    }
}
