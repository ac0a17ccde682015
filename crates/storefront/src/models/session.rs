//! Session-related types.
//!
//! The session stands in for browser-local storage: besides the signed-in
//! identity it carries the cart snapshot and the last resolved location.

use serde::{Deserialize, Serialize};

use ahmed_mart_core::access::Role;
use ahmed_mart_core::{Email, UserId};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the signed-in user.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Identity ID issued by the auth provider.
    pub id: UserId,
    /// Normalized email address.
    pub email: Email,
    /// Role the user signed in as.
    pub signed_in_as: Role,
    /// Provider access token, used to revoke the session on logout.
    access_token: String,
}

impl CurrentUser {
    #[must_use]
    pub const fn new(id: UserId, email: Email, signed_in_as: Role, access_token: String) -> Self {
        Self {
            id,
            email,
            signed_in_as,
            access_token,
        }
    }

    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("signed_in_as", &self.signed_in_as)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Last resolved location, cached per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub lat: f64,
    pub lng: f64,
    pub city: String,
    pub state: String,
    pub full_address: String,
}

/// Pending OAuth sign-in, stored between redirect and callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOAuth {
    /// PKCE code verifier.
    pub code_verifier: String,
    /// Role the user asked to sign in as.
    pub role: Role,
    /// Where to go after sign-in, if it was a guarded page.
    pub return_to: Option<String>,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the serialized cart snapshot.
    pub const CART: &str = "ahmed-mart-cart";

    /// Key for the cached location record.
    pub const LOCATION: &str = "ahmed-mart-location";

    /// Key for the in-flight OAuth sign-in.
    pub const PENDING_OAUTH: &str = "pending_oauth";

    /// Key for a sign-in failure to show once on the login page.
    pub const AUTH_ERROR: &str = "auth_error";
}
