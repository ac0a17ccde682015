//! Order repository.
//!
//! Orders and their lines are written in a single transaction. Status writes
//! are compare-and-swap on the current status so concurrent actors cannot
//! both win.

use std::collections::HashMap;

use sqlx::PgPool;
use sqlx::types::Json;

use ahmed_mart_core::order::{OrderDraft, OrderNumber};
use ahmed_mart_core::{DeliveryPartnerId, OrderId, OrderStatus, UserId, VendorId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{Order, OrderItem, OrderWithItems};

const ORDER_COLUMNS: &str = "id, order_number, customer_id, vendor_id, delivery_partner_id, \
     delivery_address, subtotal, delivery_fee, platform_fee, discount_amount, total_amount, \
     payment_method, payment_status, status, customer_notes, placed_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, product_snapshot, quantity, unit_price, \
     mrp, discount_amount, total_price";

/// Repository for `orders` and `order_items`.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order and all of its lines atomically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order number is taken.
    /// Returns `RepositoryError::DataCorruption` if a line quantity overflows.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        customer_id: UserId,
        order_number: &OrderNumber,
        draft: &OrderDraft,
    ) -> Result<OrderWithItems, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            r"
            INSERT INTO orders (
                order_number, customer_id, vendor_id, delivery_address,
                subtotal, delivery_fee, platform_fee, discount_amount, total_amount,
                payment_method, payment_status, status, customer_notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(order_number.as_str())
        .bind(customer_id)
        .bind(draft.vendor_id)
        .bind(Json(&draft.delivery_address))
        .bind(draft.subtotal)
        .bind(draft.delivery_fee)
        .bind(draft.platform_fee)
        .bind(draft.discount_amount)
        .bind(draft.total_amount)
        .bind(draft.payment_method)
        .bind(draft.payment_status)
        .bind(draft.status)
        .bind(draft.customer_notes.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "order number"))?;

        let mut items = Vec::with_capacity(draft.items.len());
        for line in &draft.items {
            let quantity = i32::try_from(line.quantity).map_err(|_| {
                RepositoryError::DataCorruption(format!("quantity {} out of range", line.quantity))
            })?;

            let item = sqlx::query_as::<_, OrderItem>(&format!(
                r"
                INSERT INTO order_items (
                    order_id, product_id, product_snapshot, quantity,
                    unit_price, mrp, discount_amount, total_price
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING {ITEM_COLUMNS}
                "
            ))
            .bind(order.id)
            .bind(line.product_id)
            .bind(Json(&line.product_snapshot))
            .bind(quantity)
            .bind(line.unit_price)
            .bind(line.mrp)
            .bind(line.discount_amount)
            .bind(line.total_price)
            .fetch_one(&mut *tx)
            .await?;
            items.push(item);
        }

        tx.commit().await?;
        Ok(OrderWithItems { order, items })
    }

    /// A customer's orders with their lines, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_customer(
        &self,
        customer_id: UserId,
    ) -> Result<Vec<OrderWithItems>, RepositoryError> {
        self.list_where("customer_id = $1", customer_id).await
    }

    /// Orders routed to a vendor, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_vendor(
        &self,
        vendor_id: VendorId,
    ) -> Result<Vec<OrderWithItems>, RepositoryError> {
        self.list_where("vendor_id = $1", vendor_id).await
    }

    /// Orders assigned to a delivery partner, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_delivery_partner(
        &self,
        partner_id: DeliveryPartnerId,
    ) -> Result<Vec<OrderWithItems>, RepositoryError> {
        self.list_where("delivery_partner_id = $1", partner_id)
            .await
    }

    async fn list_where<T>(
        &self,
        predicate: &str,
        value: T,
    ) -> Result<Vec<OrderWithItems>, RepositoryError>
    where
        T: for<'q> sqlx::Encode<'q, sqlx::Postgres> + sqlx::Type<sqlx::Postgres> + Send,
    {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE {predicate} ORDER BY placed_at DESC"
        ))
        .bind(value)
        .fetch_all(self.pool)
        .await?;

        self.attach_items(orders).await
    }

    async fn attach_items(&self, orders: Vec<Order>) -> Result<Vec<OrderWithItems>, RepositoryError> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<uuid::Uuid> = orders.iter().map(|o| o.id.as_uuid()).collect();
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY id"
        ))
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item);
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let items = by_order.remove(&order.id).unwrap_or_default();
                OrderWithItems { order, items }
            })
            .collect())
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn get(&self, id: OrderId) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Get one of a customer's orders with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order is missing or belongs
    /// to another customer.
    pub async fn get_for_customer(
        &self,
        customer_id: UserId,
        id: OrderId,
    ) -> Result<OrderWithItems, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND customer_id = $2"
        ))
        .bind(id)
        .bind(customer_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        self.attach_items(vec![order])
            .await?
            .pop()
            .ok_or(RepositoryError::NotFound)
    }

    /// Cancel a customer's order if it is still pending.
    ///
    /// Returns `None` when no pending order matched; the caller decides
    /// whether that means "not found" or "too late".
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn cancel_pending(
        &self,
        customer_id: UserId,
        id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r"
            UPDATE orders SET status = 'cancelled', updated_at = now()
            WHERE id = $1 AND customer_id = $2 AND status = 'pending'
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(customer_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Move an order from `from` to `to`, only if it is still at `from`.
    ///
    /// Returns `None` when the status had already changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn compare_and_set_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r"
            UPDATE orders SET status = $3, updated_at = now()
            WHERE id = $1 AND status = $2
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Hand a ready order to a delivery partner.
    ///
    /// Returns `None` when the order was not `ready_for_pickup`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn assign_delivery_partner(
        &self,
        id: OrderId,
        partner_id: DeliveryPartnerId,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r"
            UPDATE orders
            SET delivery_partner_id = $2, status = 'assigned_to_delivery', updated_at = now()
            WHERE id = $1 AND status = 'ready_for_pickup'
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(partner_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }
}
