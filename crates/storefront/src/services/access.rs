//! Role resolution against the registries.
//!
//! A role granted in `user_roles` only counts while the registry still
//! admits the identity's email, so suspending a vendor takes effect on their
//! next request without touching their grants.

use sqlx::PgPool;
use tracing::instrument;

use ahmed_mart_core::access::{Role, RoleFlags, RoleValidation, validate_role};
use ahmed_mart_core::{Email, UserId};

use crate::db::{RepositoryError, RoleRegistryRepository};
use crate::models::CurrentUser;

/// Role admission and resolution.
pub struct AccessService<'a> {
    registries: RoleRegistryRepository<'a>,
}

impl<'a> AccessService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            registries: RoleRegistryRepository::new(pool),
        }
    }

    /// Check whether `email` may act as `role`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the registry lookup fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn validate_role(
        &self,
        email: &Email,
        role: Role,
    ) -> Result<RoleValidation, RepositoryError> {
        let record = self.registries.find_record(role, email).await?;
        Ok(validate_role(role, record.as_ref()))
    }

    /// Current role flags for a signed-in user.
    ///
    /// Every identity is a customer; other granted roles are re-validated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a lookup fails.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn resolve_roles(&self, user: &CurrentUser) -> Result<RoleFlags, RepositoryError> {
        let mut flags = RoleFlags::customer();

        for role in self.registries.granted_roles(user.id).await? {
            if role == Role::Customer {
                continue;
            }
            let validation = self.validate_role(&user.email, role).await?;
            flags.set(role, validation.is_valid);
        }

        Ok(flags)
    }

    /// Record a role for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the insert fails.
    pub async fn grant_role(&self, user_id: UserId, role: Role) -> Result<(), RepositoryError> {
        self.registries.grant(user_id, role).await
    }

    /// Validate and, when admitted, grant in one step.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a lookup or the grant fails.
    pub async fn admit(
        &self,
        user_id: UserId,
        email: &Email,
        role: Role,
    ) -> Result<RoleValidation, RepositoryError> {
        let validation = self.validate_role(email, role).await?;
        if validation.is_valid {
            self.grant_role(user_id, role).await?;
        }
        Ok(validation)
    }
}
