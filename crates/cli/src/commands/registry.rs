//! Role registry commands.
//!
//! Vendors, delivery partners and admins must be registered by email before
//! they can sign in under that role.
//!
//! # Usage
//!
//! ```bash
//! am-cli registry add -r vendor -e shop@example.in -n "Fresh Basket" -s active
//! am-cli registry add -r delivery_partner -e rider@example.in -n "Imran"
//! ```

use ahmed_mart_core::access::Role;
use ahmed_mart_core::{Email, RegistryStatus};
use ahmed_mart_storefront::db::RoleRegistryRepository;

use super::{CommandError, connect};

/// Parse registry arguments without touching the database.
fn parse_entry(role: &str, email: &str, status: &str) -> Result<(Role, Email, RegistryStatus), CommandError> {
    let role: Role = role.parse().map_err(CommandError::InvalidArgument)?;
    if role == Role::Customer {
        return Err(CommandError::InvalidArgument(
            "customers are not registered; every signed-in user is one".to_string(),
        ));
    }
    let email = Email::parse(email).map_err(|e| CommandError::InvalidArgument(e.to_string()))?;
    let status: RegistryStatus = status.parse().map_err(CommandError::InvalidArgument)?;
    Ok((role, email, status))
}

/// Register an email in a role registry.
///
/// # Errors
///
/// Returns `CommandError::InvalidArgument` for a bad role, email or status,
/// or `CommandError::Repository` if the email is already registered.
pub async fn add(role: &str, email: &str, name: &str, status: &str) -> Result<(), CommandError> {
    let (role, email, status) = parse_entry(role, email, status)?;

    let pool = connect().await?;
    RoleRegistryRepository::new(&pool)
        .register(role, &email, name.trim(), status)
        .await?;

    tracing::info!(%role, email = %email, %status, "Registry entry created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entry_normalizes_email() {
        let parsed = parse_entry("vendor", "  Shop@Example.IN ", "active");
        assert!(matches!(
            parsed,
            Ok((Role::Vendor, ref email, RegistryStatus::Active)) if email.as_str() == "shop@example.in"
        ));
    }

    #[test]
    fn test_parse_entry_rejects_customer_and_bad_status() {
        assert!(parse_entry("customer", "a@example.in", "active").is_err());
        assert!(parse_entry("admin", "a@example.in", "enabled").is_err());
        assert!(parse_entry("rider", "a@example.in", "active").is_err());
    }
}
