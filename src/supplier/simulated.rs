//! Synthetic supplier for simulated mode.

use async_trait::async_trait;
use bigdecimal::BigDecimal;

use super::{DispatchReceipt, DispatchRequest, SupplierClient, SupplierError, SupplierService};

#[derive(Default)]
pub struct SimulatedSupplier;

impl SimulatedSupplier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SupplierClient for SimulatedSupplier {
    async fn submit_order(
        &self,
        request: &DispatchRequest,
    ) -> Result<DispatchReceipt, SupplierError> {
        Ok(DispatchReceipt {
            supplier_order_id: format!("SMM-{}", request.order_id),
            supplier_status: Some("Processing (Simulated)".to_string()),
        })
    }

    async fn order_status(&self, _supplier_order_id: &str) -> Result<String, SupplierError> {
        Ok("Completed (Simulated)".to_string())
    }

    async fn balance(&self) -> Result<BigDecimal, SupplierError> {
        Ok(BigDecimal::new(99_999.into(), 2))
    }

    async fn list_services(&self) -> Result<Vec<SupplierService>, SupplierError> {
        Ok(vec![
            SupplierService {
                service: "2001".to_string(),
                name: "Followers [Simulated]".to_string(),
                rate: "1.50".to_string(),
                min: 100,
                max: 10_000,
            },
            SupplierService {
                service: "2002".to_string(),
                name: "Likes [Simulated]".to_string(),
                rate: "0.90".to_string(),
                min: 50,
                max: 5_000,
            },
            SupplierService {
                service: "2003".to_string(),
                name: "Views [Simulated]".to_string(),
                rate: "0.30".to_string(),
                min: 500,
                max: 100_000,
            },
        ])
    }
}
