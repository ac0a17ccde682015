//! Order placement and the status lifecycle.
//!
//! Placing an order prices the cart the customer is looking at, writes the
//! order with its lines in one transaction and only then clears the cart. Status changes are
//! compare-and-swap so two actors racing on the same order cannot both win.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use rand::Rng;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use ahmed_mart_core::access::Role;
use ahmed_mart_core::order::{
    AddressSnapshot, AssemblyError, OrderDraft, OrderNumber, actor_may_set,
};
use ahmed_mart_core::service_area::{EmptyAreaPolicy, ServiceAreaResolver};
use ahmed_mart_core::{
    AddressId, DeliveryPartnerId, OrderId, OrderStatus, PaymentMethod, UserId, VendorId,
};

use crate::db::{AddressRepository, OrderRepository, RepositoryError, ServiceAreaRepository};
use crate::models::{CurrentUser, Order, OrderWithItems};
use crate::services::cart::{CartSnapshotStore, CartStore, CartTable, RemoteSync};

/// Attempts at a fresh order number before giving up.
const ORDER_NUMBER_ATTEMPTS: usize = 3;

/// Per-customer order history cache.
pub type OrderCache = Cache<UserId, Arc<Vec<OrderWithItems>>>;

/// Build the order history cache.
#[must_use]
pub fn order_cache() -> OrderCache {
    Cache::builder()
        .max_capacity(10_000)
        .time_to_live(Duration::from_secs(60))
        .build()
}

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("delivery address not found")]
    AddressNotFound,

    #[error("delivery address is outside our service area")]
    OutsideServiceArea,

    #[error("order not found")]
    NotFound,

    /// The order left `pending` before the cancel landed.
    #[error("order can no longer be cancelled")]
    NotCancellable,

    /// Someone else changed the status first.
    #[error("order status changed concurrently")]
    StatusConflict,

    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("not allowed to change this order")]
    Forbidden,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<AssemblyError> for OrderError {
    fn from(err: AssemblyError) -> Self {
        match err {
            AssemblyError::EmptyCart => Self::EmptyCart,
        }
    }
}

/// Checkout payload.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub address_id: AddressId,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub customer_notes: Option<String>,
}

/// Who is changing an order's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderActor {
    Vendor(VendorId),
    DeliveryPartner(DeliveryPartnerId),
    Admin,
}

impl OrderActor {
    #[must_use]
    pub const fn role(self) -> Role {
        match self {
            Self::Vendor(_) => Role::Vendor,
            Self::DeliveryPartner(_) => Role::DeliveryPartner,
            Self::Admin => Role::Admin,
        }
    }

    /// Whether the order is routed to this actor.
    #[must_use]
    pub fn owns(self, order: &Order) -> bool {
        match self {
            Self::Vendor(id) => order.vendor_id == Some(id),
            Self::DeliveryPartner(id) => order.delivery_partner_id == Some(id),
            Self::Admin => true,
        }
    }
}

/// Generate a fresh order number from the clock and a random suffix.
#[must_use]
pub fn next_order_number() -> OrderNumber {
    let millis = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
    let suffix = rand::rng().random_range(0..OrderNumber::SUFFIX_SPACE);
    OrderNumber::from_parts(millis, suffix)
}

/// Order operations.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    cache: &'a OrderCache,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a OrderCache) -> Self {
        Self { pool, cache }
    }

    /// Place an order from the customer's cart.
    ///
    /// The order is priced from the local cart, which is what the customer
    /// confirmed; the durable replica may lag behind after a failed write.
    /// Once the order has committed, clean-up failures are only logged.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyCart` for an empty cart,
    /// `OrderError::AddressNotFound` if the address is not the customer's, or
    /// `OrderError::OutsideServiceArea` if it cannot be delivered to.
    #[instrument(skip(self, user, cart, request), fields(user_id = %user.id))]
    pub async fn create_order<L: CartSnapshotStore, R: CartTable>(
        &self,
        user: &CurrentUser,
        cart: &mut CartStore<L, R>,
        request: &CreateOrderRequest,
        policy: EmptyAreaPolicy,
    ) -> Result<OrderWithItems, OrderError> {
        let address = AddressRepository::new(self.pool)
            .get(user.id, request.address_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => OrderError::AddressNotFound,
                other => OrderError::Repository(other),
            })?;

        if let (Some(lat), Some(lng)) = (address.latitude, address.longitude) {
            let areas = ServiceAreaRepository::new(self.pool).list_active().await?;
            if !ServiceAreaResolver::new(areas, policy).is_location_serviceable(lat, lng) {
                return Err(OrderError::OutsideServiceArea);
            }
        }

        let draft = draft_order(cart, address.snapshot(), request)?;

        let repo = OrderRepository::new(self.pool);
        let mut attempt = 0;
        let order = loop {
            attempt += 1;
            let number = next_order_number();
            match repo.create(user.id, &number, &draft).await {
                Ok(order) => break order,
                Err(RepositoryError::Conflict(_)) if attempt < ORDER_NUMBER_ATTEMPTS => {
                    tracing::debug!(order_number = %number, "Order number collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        };

        tracing::info!(
            order_number = %order.order.order_number,
            total = %order.order.total_amount,
            "Order placed"
        );

        settle_checkout(self.cache, user.id, cart).await;

        Ok(order)
    }

    /// A customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn list_for_customer(
        &self,
        customer_id: UserId,
    ) -> Result<Arc<Vec<OrderWithItems>>, OrderError> {
        if let Some(orders) = self.cache.get(&customer_id).await {
            return Ok(orders);
        }

        let orders = Arc::new(
            OrderRepository::new(self.pool)
                .list_for_customer(customer_id)
                .await?,
        );
        self.cache.insert(customer_id, Arc::clone(&orders)).await;
        Ok(orders)
    }

    /// One of a customer's orders.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if it is missing or someone else's.
    pub async fn get_for_customer(
        &self,
        customer_id: UserId,
        id: OrderId,
    ) -> Result<OrderWithItems, OrderError> {
        OrderRepository::new(self.pool)
            .get_for_customer(customer_id, id)
            .await
            .map_err(not_found)
    }

    /// Cancel a pending order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotCancellable` if the order has moved past
    /// `pending`, or `OrderError::NotFound` if it is not the customer's.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, customer_id: UserId, id: OrderId) -> Result<Order, OrderError> {
        let repo = OrderRepository::new(self.pool);

        let Some(order) = repo.cancel_pending(customer_id, id).await? else {
            return Err(cancel_miss(repo.get_for_customer(customer_id, id).await));
        };

        self.cache.invalidate(&customer_id).await;
        tracing::info!(order_number = %order.order_number, "Order cancelled");
        Ok(order)
    }

    /// Orders routed to a vendor.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn list_for_vendor(
        &self,
        vendor_id: VendorId,
    ) -> Result<Vec<OrderWithItems>, OrderError> {
        Ok(OrderRepository::new(self.pool)
            .list_for_vendor(vendor_id)
            .await?)
    }

    /// Orders assigned to a delivery partner.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn list_for_delivery_partner(
        &self,
        partner_id: DeliveryPartnerId,
    ) -> Result<Vec<OrderWithItems>, OrderError> {
        Ok(OrderRepository::new(self.pool)
            .list_for_delivery_partner(partner_id)
            .await?)
    }

    /// Move an order one step along its lifecycle.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Forbidden` if the actor may not touch this order
    /// or set this status, `OrderError::InvalidTransition` for an illegal
    /// step, or `OrderError::StatusConflict` if the status changed meanwhile.
    #[instrument(skip(self))]
    pub async fn advance_status(
        &self,
        actor: OrderActor,
        id: OrderId,
        target: OrderStatus,
    ) -> Result<Order, OrderError> {
        let repo = OrderRepository::new(self.pool);
        let order = repo.get(id).await.map_err(not_found)?;

        check_status_change(actor, &order, target)?;

        let updated = repo
            .compare_and_set_status(id, order.status, target)
            .await?
            .ok_or(OrderError::StatusConflict)?;

        self.cache.invalidate(&updated.customer_id).await;
        tracing::info!(
            order_number = %updated.order_number,
            from = %order.status,
            to = %target,
            "Order status changed"
        );
        Ok(updated)
    }

    /// Hand a ready order to a delivery partner.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidTransition` if the order is not
    /// `ready_for_pickup`, or `OrderError::NotFound` if it does not exist.
    #[instrument(skip(self))]
    pub async fn assign_delivery_partner(
        &self,
        id: OrderId,
        partner_id: DeliveryPartnerId,
    ) -> Result<Order, OrderError> {
        let repo = OrderRepository::new(self.pool);

        let Some(order) = repo.assign_delivery_partner(id, partner_id).await? else {
            let current = repo.get(id).await.map_err(not_found)?;
            return Err(OrderError::InvalidTransition {
                from: current.status,
                to: OrderStatus::AssignedToDelivery,
            });
        };

        self.cache.invalidate(&order.customer_id).await;
        Ok(order)
    }
}

/// Price the local cart for checkout.
fn draft_order<L: CartSnapshotStore, R: CartTable>(
    cart: &CartStore<L, R>,
    address: AddressSnapshot,
    request: &CreateOrderRequest,
) -> Result<OrderDraft, OrderError> {
    Ok(OrderDraft::assemble(
        cart.cart(),
        address,
        request.payment_method,
        request.customer_notes.clone(),
    )?)
}

/// Drop cached history and empty the cart after an order has committed.
async fn settle_checkout<L: CartSnapshotStore, R: CartTable>(
    cache: &OrderCache,
    customer_id: UserId,
    cart: &mut CartStore<L, R>,
) {
    cache.invalidate(&customer_id).await;

    match cart.clear_cart().await {
        Ok(RemoteSync::Failed(reason)) => {
            tracing::warn!(%reason, "Order placed but remote cart was not cleared");
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(error = %e, "Order placed but cart snapshot was not cleared");
        }
    }
}

/// Why a pending-only cancel matched no row.
fn cancel_miss<T>(lookup: Result<T, RepositoryError>) -> OrderError {
    match lookup {
        Ok(_) => OrderError::NotCancellable,
        Err(e) => not_found(e),
    }
}

/// Permission and lifecycle checks for a status change.
fn check_status_change(
    actor: OrderActor,
    order: &Order,
    target: OrderStatus,
) -> Result<(), OrderError> {
    if !actor.owns(order) || !actor_may_set(actor.role(), target) {
        return Err(OrderError::Forbidden);
    }
    if !order.status.can_transition_to(target) {
        return Err(OrderError::InvalidTransition {
            from: order.status,
            to: target,
        });
    }
    Ok(())
}

fn not_found(err: RepositoryError) -> OrderError {
    match err {
        RepositoryError::NotFound => OrderError::NotFound,
        other => OrderError::Repository(other),
    }
}
