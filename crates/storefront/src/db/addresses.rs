//! Address book repository.
//!
//! A user has at most one default address. Promoting an address demotes the
//! others inside the same transaction, and a user's first address becomes
//! the default regardless of what was asked. Writes that can touch the
//! default hold a per-user advisory lock, so concurrent requests for the same
//! user queue up instead of tripping the one-default index.

use sqlx::{PgConnection, PgPool};

use ahmed_mart_core::{AddressId, Pincode, UserId};

use super::RepositoryError;
use crate::models::address::non_blank;
use crate::models::{Address, AddressInput};

const ADDRESS_COLUMNS: &str = "id, user_id, address_type, address_line1, address_line2, \
     landmark, city, state, pincode, latitude, longitude, is_default, created_at, updated_at";

/// Repository for the `user_addresses` table.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

/// Serialize default-changing writes for one user until the transaction ends.
async fn lock_address_book(conn: &mut PgConnection, user_id: UserId) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}

async fn clear_default(conn: &mut PgConnection, user_id: UserId) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE user_addresses SET is_default = FALSE, updated_at = now() \
         WHERE user_id = $1 AND is_default",
    )
    .bind(user_id)
    .execute(conn)
    .await?;
    Ok(())
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's addresses, default first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let addresses = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM user_addresses \
             WHERE user_id = $1 ORDER BY is_default DESC, created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(addresses)
    }

    /// Get one of the user's addresses.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address does not exist or
    /// belongs to someone else.
    pub async fn get(&self, user_id: UserId, id: AddressId) -> Result<Address, RepositoryError> {
        sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM user_addresses WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Save a new address from validated input.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn create(
        &self,
        user_id: UserId,
        input: &AddressInput,
        pincode: &Pincode,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_address_book(&mut tx, user_id).await?;

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM user_addresses WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;
        let is_default = input.is_default || existing == 0;
        if is_default {
            clear_default(&mut tx, user_id).await?;
        }

        let address = sqlx::query_as::<_, Address>(&format!(
            r"
            INSERT INTO user_addresses (
                user_id, address_type, address_line1, address_line2, landmark,
                city, state, pincode, latitude, longitude, is_default
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {ADDRESS_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(input.address_type)
        .bind(input.address_line1.trim())
        .bind(non_blank(input.address_line2.as_deref()))
        .bind(non_blank(input.landmark.as_deref()))
        .bind(input.city.trim())
        .bind(input.state.trim())
        .bind(pincode.as_str())
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(is_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(address)
    }

    /// Replace an address's fields.
    ///
    /// Asking for `is_default = false` never demotes the current default;
    /// only promoting another address does.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address is not the user's.
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn update(
        &self,
        user_id: UserId,
        id: AddressId,
        input: &AddressInput,
        pincode: &Pincode,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if input.is_default {
            lock_address_book(&mut tx, user_id).await?;
            clear_default(&mut tx, user_id).await?;
        }

        let address = sqlx::query_as::<_, Address>(&format!(
            r"
            UPDATE user_addresses SET
                address_type = $3,
                address_line1 = $4,
                address_line2 = $5,
                landmark = $6,
                city = $7,
                state = $8,
                pincode = $9,
                latitude = $10,
                longitude = $11,
                is_default = is_default OR $12,
                updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING {ADDRESS_COLUMNS}
            "
        ))
        .bind(id)
        .bind(user_id)
        .bind(input.address_type)
        .bind(input.address_line1.trim())
        .bind(non_blank(input.address_line2.as_deref()))
        .bind(non_blank(input.landmark.as_deref()))
        .bind(input.city.trim())
        .bind(input.state.trim())
        .bind(pincode.as_str())
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(input.is_default)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(address)
    }

    /// Make an address the user's default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address is not the user's.
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn set_default(&self, user_id: UserId, id: AddressId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_address_book(&mut tx, user_id).await?;

        clear_default(&mut tx, user_id).await?;

        let result = sqlx::query(
            "UPDATE user_addresses SET is_default = TRUE, updated_at = now() \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls back the demotion.
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    /// Delete an address. Past orders keep their own snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address is not the user's.
    pub async fn delete(&self, user_id: UserId, id: AddressId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM user_addresses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
