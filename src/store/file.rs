//! JSON-file order store.
//!
//! Loads the whole order book at open and writes it back after every
//! change. This suits the storefront volumes the service targets; larger
//! deployments can put a database behind the same trait.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;

use super::{write_json_atomic, OrderStore, StoreError};
use crate::domain::Order;

#[derive(Debug)]
pub struct FileOrderStore {
    path: PathBuf,
    inner: Mutex<HashMap<u64, Order>>,
}

impl FileOrderStore {
    /// Opens the store at `path`, starting empty when the file is missing.
    pub async fn open(path: PathBuf) -> Result<Self, StoreError> {
        let orders = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                let list: Vec<Order> = serde_json::from_str(&raw)?;
                list.into_iter().map(|order| (order.id, order)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            inner: Mutex::new(orders),
        })
    }

    async fn persist(&self, orders: &HashMap<u64, Order>) -> Result<(), StoreError> {
        let mut list: Vec<&Order> = orders.values().collect();
        list.sort_by_key(|order| order.id);
        write_json_atomic(&self.path, &list).await?;
        Ok(())
    }
}

fn check_reference_conflict(
    orders: &HashMap<u64, Order>,
    candidate: &Order,
) -> Result<(), StoreError> {
    let Some(reference) = candidate.payment.gateway_reference.as_deref() else {
        return Ok(());
    };
    let needle = reference.to_lowercase();
    for other in orders.values() {
        if other.id == candidate.id {
            continue;
        }
        let taken = other
            .payment
            .gateway_reference
            .as_deref()
            .is_some_and(|r| r.to_lowercase() == needle);
        if taken {
            return Err(StoreError::ReferenceConflict(reference.to_string()));
        }
    }
    Ok(())
}

#[async_trait]
impl OrderStore for FileOrderStore {
    async fn insert(&self, order: Order) -> Result<(), StoreError> {
        let mut orders = self.inner.lock().await;
        if orders.contains_key(&order.id) {
            return Err(StoreError::DuplicateOrder(order.id));
        }
        check_reference_conflict(&orders, &order)?;
        orders.insert(order.id, order);
        self.persist(&orders).await
    }

    async fn update(&self, order: Order) -> Result<(), StoreError> {
        let mut orders = self.inner.lock().await;
        if !orders.contains_key(&order.id) {
            return Err(StoreError::UnknownOrder(order.id));
        }
        check_reference_conflict(&orders, &order)?;
        orders.insert(order.id, order);
        self.persist(&orders).await
    }

    async fn get(&self, id: u64) -> Result<Option<Order>, StoreError> {
        let orders = self.inner.lock().await;
        Ok(orders.get(&id).cloned())
    }

    async fn find_by_gateway_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, StoreError> {
        let orders = self.inner.lock().await;
        let needle = reference.to_lowercase();
        Ok(orders
            .values()
            .find(|order| {
                order
                    .payment
                    .gateway_reference
                    .as_deref()
                    .is_some_and(|r| r.to_lowercase() == needle)
            })
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        let orders = self.inner.lock().await;
        Ok(orders.values().cloned().collect())
    }
}
