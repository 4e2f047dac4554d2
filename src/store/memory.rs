//! In-memory order store for tests and ephemeral runs.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{OrderStore, StoreError};
use crate::domain::Order;

#[derive(Default)]
struct Inner {
    orders: HashMap<u64, Order>,
    /// Lowercased gateway reference to order id.
    by_reference: HashMap<String, u64>,
}

/// Order map plus a reference index behind a single lock, so the index can
/// never drift from the orders it points into.
#[derive(Default)]
pub struct InMemoryOrderStore {
    inner: RwLock<Inner>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn claim_reference(inner: &mut Inner, order: &Order) -> Result<(), StoreError> {
    if let Some(reference) = order.payment.gateway_reference.as_deref() {
        let key = reference.to_lowercase();
        if let Some(&owner) = inner.by_reference.get(&key) {
            if owner != order.id {
                return Err(StoreError::ReferenceConflict(reference.to_string()));
            }
        }
        inner.by_reference.insert(key, order.id);
    }
    Ok(())
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.orders.contains_key(&order.id) {
            return Err(StoreError::DuplicateOrder(order.id));
        }
        claim_reference(&mut inner, &order)?;
        inner.orders.insert(order.id, order);
        Ok(())
    }

    async fn update(&self, order: Order) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let previous = inner
            .orders
            .get(&order.id)
            .ok_or(StoreError::UnknownOrder(order.id))?;
        let previous_reference = previous.payment.gateway_reference.clone();

        if let Some(reference) = order.payment.gateway_reference.as_deref() {
            let key = reference.to_lowercase();
            if let Some(&owner) = inner.by_reference.get(&key) {
                if owner != order.id {
                    return Err(StoreError::ReferenceConflict(reference.to_string()));
                }
            }
        }

        if let Some(old) = previous_reference {
            inner.by_reference.remove(&old.to_lowercase());
        }
        claim_reference(&mut inner, &order)?;
        inner.orders.insert(order.id, order);
        Ok(())
    }

    async fn get(&self, id: u64) -> Result<Option<Order>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.orders.get(&id).cloned())
    }

    async fn find_by_gateway_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, StoreError> {
        let inner = self.inner.read().await;
        let id = match inner.by_reference.get(&reference.to_lowercase()) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(inner.orders.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.orders.values().cloned().collect())
    }
}
