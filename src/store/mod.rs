//! Order persistence port and its adapters.

pub mod file;
pub mod memory;

pub use file::FileOrderStore;
pub use memory::InMemoryOrderStore;

use async_trait::async_trait;
use serde::Serialize;
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::domain::Order;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown order: {0}")]
    UnknownOrder(u64),

    #[error("Order {0} already exists")]
    DuplicateOrder(u64),

    #[error("Gateway reference '{0}' already belongs to another order")]
    ReferenceConflict(String),
}

/// Persistence port for orders.
///
/// Gateway references identify at most one order and lookups by reference
/// are case-insensitive, matching how providers echo ids back in webhooks.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: Order) -> Result<(), StoreError>;

    /// Replaces the stored order with the same id.
    async fn update(&self, order: Order) -> Result<(), StoreError>;

    async fn get(&self, id: u64) -> Result<Option<Order>, StoreError>;

    async fn find_by_gateway_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, StoreError>;

    async fn list(&self) -> Result<Vec<Order>, StoreError>;
}

/// Writes `value` as pretty JSON via a sibling temp file and rename, so a
/// crash mid-write never leaves a truncated file behind.
pub(crate) async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let raw = serde_json::to_vec_pretty(value).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, raw).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
