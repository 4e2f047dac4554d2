//! Order reconciliation engine.
//!
//! Owns every order state transition. Payment confirmations arrive here
//! as canonical events regardless of provider, and fulfillment dispatch
//! happens at most once per order: confirm-and-dispatch is serialized per
//! order id and terminal states absorb replays.

use bigdecimal::BigDecimal;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::catalog::CatalogStore;
use crate::domain::{Order, OrderStatus, PaymentStatus};
use crate::error::AppError;
use crate::gateway::{self, ChargeRequest};
use crate::gateway::webhook::{OrderLookupKey, PaymentEvent};
use crate::settings::SettingsStore;
use crate::store::OrderStore;
use crate::supplier::{self, DispatchRequest, SupplierError};

/// Payer address used when checkout did not collect one. Some providers
/// require a payer on every charge.
const FALLBACK_PAYER_EMAIL: &str = "customer@example.com";

/// Flat margin the dashboard assumes over confirmed revenue.
const ESTIMATED_MARGIN_PERCENT: i64 = 50;

/// What processing a payment event amounted to. Webhook routes report
/// this in their always-200 body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Dispatched,
    FulfillmentFailed,
    AlreadyProcessed,
    NotApproved,
    NoMatchingOrder,
}

impl EventOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventOutcome::Dispatched => "dispatched",
            EventOutcome::FulfillmentFailed => "fulfillment_failed",
            EventOutcome::AlreadyProcessed => "already_processed",
            EventOutcome::NotApproved => "not_approved",
            EventOutcome::NoMatchingOrder => "no_matching_order",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_orders: u64,
    pub paid_orders: u64,
    pub revenue: BigDecimal,
    pub estimated_profit: BigDecimal,
}

pub struct ReconciliationEngine {
    store: Arc<dyn OrderStore>,
    catalog: Arc<CatalogStore>,
    settings: Arc<SettingsStore>,
    http: Client,
    next_order_id: AtomicU64,
    /// One async mutex per order id, taken for confirm-and-dispatch.
    order_locks: Mutex<HashMap<u64, Arc<Mutex<()>>>>,
}

impl ReconciliationEngine {
    pub fn new(
        store: Arc<dyn OrderStore>,
        catalog: Arc<CatalogStore>,
        settings: Arc<SettingsStore>,
        http: Client,
    ) -> Self {
        // Ids are seeded from the clock so restarts keep counting upward
        // without reading the store first.
        let seed = Utc::now().timestamp_millis().max(1) as u64;
        Self {
            store,
            catalog,
            settings,
            http,
            next_order_id: AtomicU64::new(seed),
            order_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_for(&self, order_id: u64) -> Arc<Mutex<()>> {
        let mut locks = self.order_locks.lock().await;
        locks
            .entry(order_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn require_order(&self, order_id: u64) -> Result<Order, AppError> {
        self.store
            .get(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))
    }

    /// Creates an order for a catalog package, snapshotting its name,
    /// price, quantity and supplier service.
    pub async fn create_order(
        &self,
        package_id: u64,
        destination_link: &str,
        customer_email: Option<String>,
    ) -> Result<Order, AppError> {
        let link = destination_link.trim();
        if link.is_empty() {
            return Err(AppError::Validation("link is required".to_string()));
        }

        let package = self
            .catalog
            .find_package(package_id)
            .ok_or_else(|| AppError::NotFound(format!("package {package_id}")))?;

        let id = self.next_order_id.fetch_add(1, Ordering::Relaxed);
        let order = Order::new(id, &package, link.to_string(), customer_email);
        self.store.insert(order.clone()).await?;

        tracing::info!(order_id = order.id, package_id, "order created");
        Ok(order)
    }

    /// Creates a PIX charge for the order with the gateway active in the
    /// current settings snapshot.
    ///
    /// The order moves to `AwaitingPayment` before the gateway is called,
    /// so a failed call leaves it retryable with no reference attached.
    pub async fn start_charge(&self, order_id: u64) -> Result<Order, AppError> {
        let mut order = self.require_order(order_id).await?;
        if !order.status.can_start_charge() {
            return Err(AppError::Validation(format!(
                "order {order_id} already has a confirmed payment"
            )));
        }

        if order.status == OrderStatus::PendingPayment {
            order.status = OrderStatus::AwaitingPayment;
            self.store.update(order.clone()).await?;
        }

        let settings = self.settings.current();
        let gateway = gateway::resolve_active(&settings, &self.http)?;
        let request = ChargeRequest {
            amount: order.price.clone(),
            description: format!("Order #{} ({})", order.id, order.package_name),
            payer_email: order
                .customer_email
                .clone()
                .unwrap_or_else(|| FALLBACK_PAYER_EMAIL.to_string()),
            external_reference: order.id.to_string(),
        };
        let charge = gateway.create_charge(&request).await?;

        order.payment.status = PaymentStatus::AwaitingConfirmation;
        order.payment.gateway_name = Some(gateway.name().to_string());
        order.payment.gateway_reference = Some(charge.gateway_reference);
        order.payment.presented_code = Some(charge.code);
        order.payment.presented_image = Some(charge.qr_code_base64);
        self.store.update(order.clone()).await?;

        tracing::info!(order_id, gateway = gateway.name(), "charge created");
        Ok(order)
    }

    /// Applies a canonical payment event: confirm the payment, then
    /// dispatch to the supplier exactly once.
    pub async fn on_payment_event(&self, event: PaymentEvent) -> Result<EventOutcome, AppError> {
        if !event.approved {
            tracing::info!(status = %event.raw_status, "payment event not approved, ignoring");
            return Ok(EventOutcome::NotApproved);
        }

        let Some(order) = self.locate(&event.key).await? else {
            tracing::warn!(key = ?event.key, "payment event matches no order");
            return Ok(EventOutcome::NoMatchingOrder);
        };

        let lock = self.lock_for(order.id).await;
        let _guard = lock.lock().await;

        // Reload under the lock; a concurrent delivery may have won.
        let Some(mut order) = self.store.get(order.id).await? else {
            return Ok(EventOutcome::NoMatchingOrder);
        };
        if order.status.is_terminal() {
            tracing::info!(
                order_id = order.id,
                status = ?order.status,
                "payment event for settled order, ignoring"
            );
            return Ok(EventOutcome::AlreadyProcessed);
        }

        order.status = OrderStatus::PaymentConfirmed;
        order.payment.status = PaymentStatus::Confirmed;
        if order.payment.confirmed_at.is_none() {
            order.payment.confirmed_at = Some(Utc::now());
        }

        let outcome = self.dispatch(&mut order).await;
        self.store.update(order).await?;
        Ok(outcome)
    }

    /// Asks the supplier for the current status of a dispatched order and
    /// stores the verbatim answer. Never changes the order lifecycle.
    pub async fn refresh_supplier_status(&self, order_id: u64) -> Result<String, AppError> {
        let mut order = self.require_order(order_id).await?;
        let Some(supplier_order_id) = order.fulfillment.supplier_order_id.clone() else {
            return Err(AppError::NotFound(format!(
                "order {order_id} has no supplier order"
            )));
        };

        let settings = self.settings.current();
        let supplier = supplier::resolve_supplier(&settings, &self.http);
        let status = supplier.order_status(&supplier_order_id).await?;

        order.fulfillment.supplier_status = Some(status.clone());
        self.store.update(order).await?;
        Ok(status)
    }

    pub async fn order(&self, order_id: u64) -> Result<Order, AppError> {
        self.require_order(order_id).await
    }

    /// All orders, newest first.
    pub async fn list_orders(&self) -> Result<Vec<Order>, AppError> {
        let mut orders = self.store.list().await?;
        orders.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(orders)
    }

    pub async fn dashboard(&self) -> Result<DashboardSummary, AppError> {
        let orders = self.store.list().await?;
        let total_orders = orders.len() as u64;

        let mut paid_orders = 0u64;
        let mut revenue = BigDecimal::from(0);
        for order in &orders {
            if order.payment.status == PaymentStatus::Confirmed {
                paid_orders += 1;
                revenue += order.price.clone();
            }
        }

        let estimated_profit =
            (&revenue * BigDecimal::from(ESTIMATED_MARGIN_PERCENT)) / BigDecimal::from(100);
        Ok(DashboardSummary {
            total_orders,
            paid_orders,
            revenue,
            estimated_profit,
        })
    }

    async fn locate(&self, key: &OrderLookupKey) -> Result<Option<Order>, AppError> {
        let order = match key {
            OrderLookupKey::GatewayReference(reference) => {
                self.store.find_by_gateway_reference(reference).await?
            }
            OrderLookupKey::OrderId(id) => self.store.get(*id).await?,
        };
        Ok(order)
    }

    /// Submits the order to the supplier resolved from the current
    /// settings snapshot. A failure marks the order `FulfillmentFailed`
    /// rather than bubbling up, and stores no synthetic supplier data.
    async fn dispatch(&self, order: &mut Order) -> EventOutcome {
        let settings = self.settings.current();
        let supplier = supplier::resolve_supplier(&settings, &self.http);

        let service = order
            .supplier_service_id
            .clone()
            .or_else(|| settings.supplier.default_service.clone());
        let quantity = if order.quantity > 0 {
            order.quantity
        } else {
            settings.supplier.default_quantity
        };

        let result = match service {
            Some(service) => {
                let request = DispatchRequest {
                    order_id: order.id,
                    service,
                    link: order.destination_link.clone(),
                    quantity,
                };
                supplier.submit_order(&request).await
            }
            None => Err(SupplierError::Unconfigured(
                "package has no supplier service and no default is set".to_string(),
            )),
        };

        match result {
            Ok(receipt) => {
                order.status = OrderStatus::DispatchedToSupplier;
                order.fulfillment.supplier_order_id = Some(receipt.supplier_order_id);
                order.fulfillment.supplier_status = receipt.supplier_status;
                order.fulfillment.dispatched_at = Some(Utc::now());
                tracing::info!(order_id = order.id, "order dispatched to supplier");
                EventOutcome::Dispatched
            }
            Err(e) => {
                order.status = OrderStatus::FulfillmentFailed;
                tracing::error!(order_id = order.id, error = %e, "supplier dispatch failed");
                EventOutcome::FulfillmentFailed
            }
        }
    }
}
