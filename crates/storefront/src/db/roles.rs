//! Role registry repository.
//!
//! Non-customer roles are pre-registered by email in one table per role.
//! Every lookup takes an already-normalized [`Email`].

use sqlx::PgPool;

use ahmed_mart_core::access::{RegistryRecord, Role};
use ahmed_mart_core::{DeliveryPartnerId, Email, RegistryStatus, UserId, VendorId};

use super::{RepositoryError, conflict_on_unique};

/// Registry table backing a role, if it has one.
#[must_use]
pub const fn registry_table(role: Role) -> Option<&'static str> {
    match role {
        Role::Customer => None,
        Role::Vendor => Some("vendors"),
        Role::DeliveryPartner => Some("delivery_partners"),
        Role::Admin => Some("admins"),
    }
}

/// Repository for role registries and granted roles.
pub struct RoleRegistryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RoleRegistryRepository<'a> {
    /// Create a new role registry repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look up the registry row for `email` in `role`'s registry.
    ///
    /// Always `None` for customers, who have no registry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_record(
        &self,
        role: Role,
        email: &Email,
    ) -> Result<Option<RegistryRecord>, RepositoryError> {
        let Some(table) = registry_table(role) else {
            return Ok(None);
        };

        let status: Option<Option<RegistryStatus>> =
            sqlx::query_scalar(&format!("SELECT status FROM {table} WHERE email = $1"))
                .bind(email.as_str())
                .fetch_optional(self.pool)
                .await?;

        Ok(status.map(|status| RegistryRecord { status }))
    }

    /// Roles previously granted to a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn granted_roles(&self, user_id: UserId) -> Result<Vec<Role>, RepositoryError> {
        let roles = sqlx::query_scalar::<_, Role>(
            "SELECT role FROM user_roles WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(roles)
    }

    /// Record that a user holds a role. Granting twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn grant(&self, user_id: UserId, role: Role) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO user_roles (user_id, role)
            VALUES ($1, $2)
            ON CONFLICT (user_id, role) DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(role)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Vendor row ID for a registered vendor email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn vendor_id_for(&self, email: &Email) -> Result<Option<VendorId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, VendorId>("SELECT id FROM vendors WHERE email = $1")
            .bind(email.as_str())
            .fetch_optional(self.pool)
            .await?;

        Ok(id)
    }

    /// Delivery partner row ID for a registered email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delivery_partner_id_for(
        &self,
        email: &Email,
    ) -> Result<Option<DeliveryPartnerId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, DeliveryPartnerId>(
            "SELECT id FROM delivery_partners WHERE email = $1",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        Ok(id)
    }

    /// Pre-register an email in a role registry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for roles without a registry.
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn register(
        &self,
        role: Role,
        email: &Email,
        name: &str,
        status: RegistryStatus,
    ) -> Result<(), RepositoryError> {
        let Some(table) = registry_table(role) else {
            return Err(RepositoryError::NotFound);
        };
        let name_column = if role == Role::Vendor {
            "business_name"
        } else {
            "name"
        };

        sqlx::query(&format!(
            "INSERT INTO {table} (email, {name_column}, status) VALUES ($1, $2, $3)"
        ))
        .bind(email.as_str())
        .bind(name)
        .bind(status)
        .execute(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "registry entry"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customers_have_no_registry() {
        assert_eq!(registry_table(Role::Customer), None);
        assert_eq!(registry_table(Role::Admin), Some("admins"));
        assert_eq!(
            registry_table(Role::DeliveryPartner),
            Some("delivery_partners")
        );
    }
}
