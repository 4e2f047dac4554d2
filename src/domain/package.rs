//! Catalog entities: categories of purchasable packages.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// A purchasable catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: u64,
    pub name: String,
    pub price: BigDecimal,
    pub min: u32,
    pub max: u32,
    /// Supplier service this package maps to. When absent, dispatch falls
    /// back to the operator-configured default service.
    #[serde(default)]
    pub service_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub packages: Vec<Package>,
}
