//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a signed-in user, optionally reading
//! one, and gating a handler on role flags. Role flags are resolved on every
//! guarded request, bounded by [`ROLE_RESOLUTION_TIMEOUT`].

use std::marker::PhantomData;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, Uri, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use tower_sessions::Session;

use ahmed_mart_core::access::{
    AuthState, DEFAULT_LANDING_PATH, GuardDecision, ROLE_RESOLUTION_TIMEOUT, Role, RoleFlags,
    RouteRequirement, SIGN_IN_PATH, guard,
};

use crate::filters;
use crate::models::{CurrentUser, session_keys};
use crate::services::access::AccessService;
use crate::state::AppState;

/// Page shown when role resolution stalls or fails.
#[derive(Template, WebTemplate)]
#[template(path = "auth/failed.html")]
pub struct AuthFailedTemplate {
    /// Where "try again" sends the visitor.
    pub retry_path: String,
}

/// Sign-in URL that returns to `return_to` afterwards.
#[must_use]
pub fn sign_in_url(return_to: &str) -> String {
    format!(
        "{SIGN_IN_PATH}?redirect_to={}",
        urlencoding::encode(return_to)
    )
}

/// Error returned when a guarded handler turns the visitor away.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthRejection {
    /// Redirect to sign-in (for HTML requests).
    RedirectToLogin { return_to: String },
    /// Unauthorized response (for API requests).
    Unauthorized,
    /// Redirect to the default landing page (for HTML requests).
    RedirectToLanding,
    /// Forbidden response (for API requests).
    Forbidden,
    /// Role resolution timed out or failed.
    AuthorizationFailed { retry_path: String, is_api: bool },
}

impl AuthRejection {
    fn from_decision(decision: GuardDecision, origin: &str, is_api: bool) -> Option<Self> {
        match decision {
            GuardDecision::Admit => None,
            GuardDecision::SignIn { .. } if is_api => Some(Self::Unauthorized),
            GuardDecision::SignIn { return_to } => Some(Self::RedirectToLogin { return_to }),
            GuardDecision::Landing if is_api => Some(Self::Forbidden),
            GuardDecision::Landing => Some(Self::RedirectToLanding),
            GuardDecision::AuthorizationFailed => Some(Self::AuthorizationFailed {
                retry_path: origin.to_string(),
                is_api,
            }),
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { return_to } => Redirect::to(&sign_in_url(&return_to)).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::RedirectToLanding => Redirect::to(DEFAULT_LANDING_PATH).into_response(),
            Self::Forbidden => StatusCode::FORBIDDEN.into_response(),
            Self::AuthorizationFailed { is_api: true, .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "Authorization check failed, please retry" })),
            )
                .into_response(),
            Self::AuthorizationFailed { retry_path, .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                AuthFailedTemplate { retry_path },
            )
                .into_response(),
        }
    }
}

/// The request URI as the client sent it; nested routers strip their prefix
/// from `parts.uri`.
fn request_uri(parts: &Parts) -> &Uri {
    parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |original| &original.0)
}

fn origin(parts: &Parts) -> String {
    let uri = request_uri(parts);
    uri.path_and_query()
        .map_or_else(|| uri.path(), |pq| pq.as_str())
        .to_string()
}

fn is_api(parts: &Parts) -> bool {
    request_uri(parts).path().starts_with("/api/")
}

async fn session_user(parts: &Parts) -> Option<CurrentUser> {
    parts
        .extensions
        .get::<Session>()?
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// Extractor that requires a signed-in user.
///
/// If no one is signed in, HTML requests are redirected to sign-in with the
/// current path preserved; API requests get `401`.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = session_user(parts).await {
            return Ok(Self(user));
        }

        let origin = origin(parts);
        let decision = guard(AuthState::Anonymous, RouteRequirement::AUTHENTICATED, &origin);
        Err(AuthRejection::from_decision(decision, &origin, is_api(parts))
            .unwrap_or(AuthRejection::Unauthorized))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if no one is signed in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await))
    }
}

/// Allow-list of roles for [`RequireRole`].
pub trait RoleRequirement {
    const ROLES: &'static [Role];
}

/// Vendors only.
pub struct VendorOnly;

impl RoleRequirement for VendorOnly {
    const ROLES: &'static [Role] = &[Role::Vendor];
}

/// Delivery partners only.
pub struct DeliveryOnly;

impl RoleRequirement for DeliveryOnly {
    const ROLES: &'static [Role] = &[Role::DeliveryPartner];
}

/// Admins only.
pub struct AdminOnly;

impl RoleRequirement for AdminOnly {
    const ROLES: &'static [Role] = &[Role::Admin];
}

/// Extractor that requires a signed-in user holding one of `R::ROLES`.
///
/// # Example
///
/// ```rust,ignore
/// async fn vendor_orders(
///     RequireRole { user, .. }: RequireRole<VendorOnly>,
/// ) -> impl IntoResponse { ... }
/// ```
pub struct RequireRole<R> {
    pub user: CurrentUser,
    pub roles: RoleFlags,
    _requirement: PhantomData<R>,
}

impl<R> FromRequestParts<AppState> for RequireRole<R>
where
    R: RoleRequirement + Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let origin = origin(parts);
        let requirement = RouteRequirement::roles(R::ROLES);
        let user = session_user(parts).await;

        let auth_state = match &user {
            None => AuthState::Anonymous,
            Some(user) => {
                let access = AccessService::new(state.pool());
                match tokio::time::timeout(ROLE_RESOLUTION_TIMEOUT, access.resolve_roles(user))
                    .await
                {
                    Ok(Ok(flags)) => AuthState::Authenticated(flags),
                    Ok(Err(e)) => {
                        tracing::error!(error = %e, user_id = %user.id, "Role resolution failed");
                        AuthState::TimedOut
                    }
                    Err(_) => {
                        tracing::warn!(user_id = %user.id, "Role resolution timed out");
                        AuthState::TimedOut
                    }
                }
            }
        };

        let decision = guard(auth_state, requirement, &origin);
        if let Some(rejection) = AuthRejection::from_decision(decision, &origin, is_api(parts)) {
            return Err(rejection);
        }

        match (user, auth_state) {
            (Some(user), AuthState::Authenticated(roles)) => Ok(Self {
                user,
                roles,
                _requirement: PhantomData,
            }),
            _ => Err(AuthRejection::Unauthorized),
        }
    }
}

/// Helper to set the current user in the session.
///
/// The session ID is cycled first so a pre-login session cannot be fixed.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(
    session: &Session,
) -> Result<Option<CurrentUser>, tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_url_encodes_return_path() {
        assert_eq!(
            sign_in_url("/vendor?tab=orders"),
            "/auth/login?redirect_to=%2Fvendor%3Ftab%3Dorders"
        );
    }

    #[test]
    fn test_html_rejections() {
        let sign_in = GuardDecision::SignIn {
            return_to: "/admin".to_string(),
        };
        assert_eq!(
            AuthRejection::from_decision(sign_in, "/admin", false),
            Some(AuthRejection::RedirectToLogin {
                return_to: "/admin".to_string()
            })
        );
        assert_eq!(
            AuthRejection::from_decision(GuardDecision::Landing, "/admin", false),
            Some(AuthRejection::RedirectToLanding)
        );
        assert_eq!(
            AuthRejection::from_decision(GuardDecision::Admit, "/admin", false),
            None
        );
    }

    #[test]
    fn test_api_rejections() {
        let sign_in = GuardDecision::SignIn {
            return_to: "/api/vendor/orders".to_string(),
        };
        assert_eq!(
            AuthRejection::from_decision(sign_in, "/api/vendor/orders", true),
            Some(AuthRejection::Unauthorized)
        );
        assert_eq!(
            AuthRejection::from_decision(GuardDecision::Landing, "/api/vendor/orders", true),
            Some(AuthRejection::Forbidden)
        );
    }

    #[test]
    fn test_authorization_failed_status() {
        let rejection = AuthRejection::from_decision(
            GuardDecision::AuthorizationFailed,
            "/delivery",
            false,
        );
        let Some(rejection) = rejection else {
            panic!("expected a rejection");
        };
        assert_eq!(
            rejection.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_redirect_statuses() {
        let response = AuthRejection::RedirectToLanding.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            AuthRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
