//! Roles, registry-backed role admission, and route-guard decisions.
//!
//! Every signed-in identity is a customer. The other roles require a
//! pre-registration row, keyed by normalized email, in a role-specific
//! registry. The functions here are pure predicates over what the registries
//! returned, so they can be tested without a database.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::RegistryStatus;

/// How long a guarded route waits for role resolution before giving up.
pub const ROLE_RESOLUTION_TIMEOUT: Duration = Duration::from_secs(6);

/// Where unauthenticated visitors are sent.
pub const SIGN_IN_PATH: &str = "/auth/login";

/// Where authenticated visitors without a required role are sent.
pub const DEFAULT_LANDING_PATH: &str = "/";

/// An application role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "app_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Customer,
    Vendor,
    DeliveryPartner,
    Admin,
}

impl Role {
    pub const ALL: [Self; 4] = [
        Self::Customer,
        Self::Vendor,
        Self::DeliveryPartner,
        Self::Admin,
    ];

    /// Human-readable name used in user-facing messages.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Customer => "Customer",
            Self::Vendor => "Vendor",
            Self::DeliveryPartner => "Delivery Partner",
            Self::Admin => "Admin",
        }
    }

    /// Home route for this role after sign-in.
    #[must_use]
    pub const fn landing_path(self) -> &'static str {
        match self {
            Self::Customer => "/",
            Self::Vendor => "/vendor",
            Self::DeliveryPartner => "/delivery",
            Self::Admin => "/admin",
        }
    }

    /// Whether the registry's status column gates admission for this role.
    #[must_use]
    pub const fn requires_active_status(self) -> bool {
        matches!(self, Self::Admin | Self::Vendor)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Vendor => write!(f, "vendor"),
            Self::DeliveryPartner => write!(f, "delivery_partner"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "vendor" => Ok(Self::Vendor),
            "delivery_partner" => Ok(Self::DeliveryPartner),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// What a role registry knows about an email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRecord {
    /// `None` for registries without a status column.
    pub status: Option<RegistryStatus>,
}

/// Outcome of checking whether an identity may take on a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleValidation {
    pub is_valid: bool,
    pub error: Option<String>,
}

impl RoleValidation {
    #[must_use]
    pub const fn valid() -> Self {
        Self {
            is_valid: true,
            error: None,
        }
    }

    #[must_use]
    pub const fn invalid(error: String) -> Self {
        Self {
            is_valid: false,
            error: Some(error),
        }
    }
}

/// Decide whether a registry lookup admits `role`.
///
/// - customers are always admitted and never looked up;
/// - admins and vendors need a row whose status is `active`;
/// - delivery partners only need a row to exist.
#[must_use]
pub fn validate_role(role: Role, record: Option<&RegistryRecord>) -> RoleValidation {
    if role == Role::Customer {
        return RoleValidation::valid();
    }

    let Some(record) = record else {
        return RoleValidation::invalid(format!(
            "This email is not registered as a {}",
            role.display_name()
        ));
    };

    if role.requires_active_status() && record.status != Some(RegistryStatus::Active) {
        return RoleValidation::invalid(format!(
            "Your {} account is not active",
            role.display_name()
        ));
    }

    RoleValidation::valid()
}

/// The set of roles an identity currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleFlags {
    pub customer: bool,
    pub vendor: bool,
    pub delivery_partner: bool,
    pub admin: bool,
}

impl RoleFlags {
    /// Flags for a plain signed-in shopper.
    #[must_use]
    pub const fn customer() -> Self {
        Self {
            customer: true,
            vendor: false,
            delivery_partner: false,
            admin: false,
        }
    }

    #[must_use]
    pub const fn has(&self, role: Role) -> bool {
        match role {
            Role::Customer => self.customer,
            Role::Vendor => self.vendor,
            Role::DeliveryPartner => self.delivery_partner,
            Role::Admin => self.admin,
        }
    }

    pub const fn set(&mut self, role: Role, value: bool) {
        match role {
            Role::Customer => self.customer = value,
            Role::Vendor => self.vendor = value,
            Role::DeliveryPartner => self.delivery_partner = value,
            Role::Admin => self.admin = value,
        }
    }

    /// Whether at least one of `roles` is held.
    #[must_use]
    pub fn has_any(&self, roles: &[Role]) -> bool {
        roles.iter().any(|r| self.has(*r))
    }

    /// Held roles, in [`Role::ALL`] order.
    #[must_use]
    pub fn roles(&self) -> Vec<Role> {
        Role::ALL.into_iter().filter(|r| self.has(*r)).collect()
    }
}

/// What a route demands of its visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRequirement<'a> {
    pub require_auth: bool,
    /// Empty means any authenticated identity is admitted.
    pub allowed_roles: &'a [Role],
}

impl<'a> RouteRequirement<'a> {
    /// Open to everyone.
    pub const PUBLIC: RouteRequirement<'static> = RouteRequirement {
        require_auth: false,
        allowed_roles: &[],
    };

    /// Any signed-in identity.
    pub const AUTHENTICATED: RouteRequirement<'static> = RouteRequirement {
        require_auth: true,
        allowed_roles: &[],
    };

    /// Signed in and holding at least one of `roles`.
    #[must_use]
    pub const fn roles(roles: &'a [Role]) -> Self {
        Self {
            require_auth: true,
            allowed_roles: roles,
        }
    }
}

/// Where role resolution stands for the current visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated(RoleFlags),
    /// Resolution stalled past [`ROLE_RESOLUTION_TIMEOUT`] or failed outright.
    TimedOut,
}

/// What a guarded route should do with the visitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Admit,
    /// Send to sign-in, returning to `return_to` afterwards.
    SignIn { return_to: String },
    /// Send to [`DEFAULT_LANDING_PATH`].
    Landing,
    /// Show the authorization-failed page; the visitor retries manually.
    AuthorizationFailed,
}

/// Route-guard decision for a visitor requesting `origin`.
#[must_use]
pub fn guard(state: AuthState, requirement: RouteRequirement<'_>, origin: &str) -> GuardDecision {
    match state {
        AuthState::TimedOut => GuardDecision::AuthorizationFailed,
        AuthState::Anonymous if requirement.require_auth => GuardDecision::SignIn {
            return_to: origin.to_string(),
        },
        AuthState::Anonymous => GuardDecision::Admit,
        AuthState::Authenticated(flags) => {
            if requirement.allowed_roles.is_empty() || flags.has_any(requirement.allowed_roles) {
                GuardDecision::Admit
            } else {
                GuardDecision::Landing
            }
        }
    }
}

/// Only accept same-site relative paths as post-login destinations.
#[must_use]
pub fn safe_return_path(candidate: Option<&str>) -> Option<&str> {
    candidate.filter(|p| p.starts_with('/') && !p.starts_with("//") && !p.contains('\\'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTIVE: RegistryRecord = RegistryRecord {
        status: Some(RegistryStatus::Active),
    };

    #[test]
    fn test_customer_always_valid() {
        assert!(validate_role(Role::Customer, None).is_valid);
    }

    #[test]
    fn test_admin_without_registry_row() {
        let result = validate_role(Role::Admin, None);
        assert!(!result.is_valid);
        let message = result.error.unwrap_or_default();
        assert!(message.contains("not registered as a Admin"), "{message}");
    }

    #[test]
    fn test_admin_and_vendor_need_active_status() {
        let suspended = RegistryRecord {
            status: Some(RegistryStatus::Suspended),
        };
        let missing_status = RegistryRecord { status: None };

        for role in [Role::Admin, Role::Vendor] {
            assert!(validate_role(role, Some(&ACTIVE)).is_valid);
            assert!(!validate_role(role, Some(&suspended)).is_valid);
            assert!(!validate_role(role, Some(&missing_status)).is_valid);
        }
        assert_eq!(
            validate_role(Role::Vendor, Some(&suspended)).error.as_deref(),
            Some("Your Vendor account is not active")
        );
    }

    #[test]
    fn test_delivery_partner_only_needs_a_row() {
        let pending = RegistryRecord {
            status: Some(RegistryStatus::Pending),
        };
        assert!(validate_role(Role::DeliveryPartner, Some(&pending)).is_valid);
        assert!(validate_role(Role::DeliveryPartner, Some(&RegistryRecord { status: None })).is_valid);

        let missing = validate_role(Role::DeliveryPartner, None);
        assert_eq!(
            missing.error.as_deref(),
            Some("This email is not registered as a Delivery Partner")
        );
    }

    #[test]
    fn test_guard_redirects_anonymous_to_sign_in() {
        assert_eq!(
            guard(AuthState::Anonymous, RouteRequirement::AUTHENTICATED, "/orders/42"),
            GuardDecision::SignIn {
                return_to: "/orders/42".to_string()
            }
        );
        assert_eq!(
            guard(AuthState::Anonymous, RouteRequirement::PUBLIC, "/"),
            GuardDecision::Admit
        );
    }

    #[test]
    fn test_guard_allow_list() {
        let mut flags = RoleFlags::customer();
        let vendor_only = RouteRequirement::roles(&[Role::Vendor]);
        let staff = RouteRequirement::roles(&[Role::Vendor, Role::Admin]);

        assert_eq!(
            guard(AuthState::Authenticated(flags), vendor_only, "/vendor"),
            GuardDecision::Landing
        );

        flags.set(Role::Admin, true);
        assert_eq!(
            guard(AuthState::Authenticated(flags), staff, "/vendor"),
            GuardDecision::Admit
        );
        assert_eq!(
            guard(AuthState::Authenticated(flags), RouteRequirement::AUTHENTICATED, "/x"),
            GuardDecision::Admit
        );
    }

    #[test]
    fn test_guard_timeout_is_distinct_failure() {
        assert_eq!(
            guard(AuthState::TimedOut, RouteRequirement::PUBLIC, "/"),
            GuardDecision::AuthorizationFailed
        );
    }

    #[test]
    fn test_role_flags_roles_listing() {
        let mut flags = RoleFlags::customer();
        flags.set(Role::DeliveryPartner, true);
        assert_eq!(flags.roles(), vec![Role::Customer, Role::DeliveryPartner]);
        assert!(!flags.has_any(&[Role::Admin, Role::Vendor]));
    }

    #[test]
    fn test_safe_return_path() {
        assert_eq!(safe_return_path(Some("/cart")), Some("/cart"));
        assert_eq!(safe_return_path(Some("//evil.example")), None);
        assert_eq!(safe_return_path(Some("https://evil.example")), None);
        assert_eq!(safe_return_path(None), None);
    }
}
