//! Cart item repository.
//!
//! The durable per-user replica of the cart. Every write is scoped to
//! `(user_id, product_id)`; reads join against live products so a resync
//! always reflects current prices and availability.

use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use ahmed_mart_core::cart::CartItem;
use ahmed_mart_core::{ProductId, UserId, VendorId};

use super::RepositoryError;

/// Repository for the `cart_items` table.
pub struct CartItemRepository<'a> {
    pool: &'a PgPool,
}

#[derive(Debug, FromRow)]
struct CartLineRow {
    product_id: ProductId,
    name: String,
    image_url: Option<String>,
    unit_value: String,
    unit_type: String,
    selling_price: Decimal,
    mrp: Decimal,
    quantity: i32,
    max_quantity: i32,
    vendor_id: Option<VendorId>,
}

impl From<CartLineRow> for CartItem {
    fn from(row: CartLineRow) -> Self {
        Self {
            product_id: row.product_id,
            name: row.name,
            image_url: row.image_url,
            unit_value: row.unit_value,
            unit_type: row.unit_type,
            selling_price: row.selling_price,
            mrp: row.mrp,
            quantity: u32::try_from(row.quantity).unwrap_or(1),
            max_quantity: u32::try_from(row.max_quantity).unwrap_or(1),
            vendor_id: row.vendor_id,
        }
    }
}

fn to_db_quantity(quantity: u32) -> i32 {
    i32::try_from(quantity).unwrap_or(i32::MAX)
}

impl<'a> CartItemRepository<'a> {
    /// Create a new cart item repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert the line or overwrite its quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO cart_items (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = now()
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(to_db_quantity(quantity))
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Update the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line does not exist remotely.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE cart_items
            SET quantity = $3, updated_at = now()
            WHERE user_id = $1 AND product_id = $2
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(to_db_quantity(quantity))
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Delete a line. Deleting a missing line is not an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, user_id: UserId, product_id: ProductId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Delete every line for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// The user's cart joined against live products.
    ///
    /// Lines whose product is gone or no longer available are left out.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn fetch(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT p.id AS product_id, p.name, p.image_url, p.unit_value, p.unit_type,
                   p.selling_price, p.mrp, c.quantity, p.max_quantity, p.vendor_id
            FROM cart_items c
            JOIN products p ON p.id = c.product_id
            WHERE c.user_id = $1 AND p.is_available
            ORDER BY c.created_at
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(CartItem::from).collect())
    }
}
