//! Authentication route handlers.
//!
//! Sign-in asks for the role the user wants to act as. The identity comes
//! from the hosted auth provider; the role is checked against the registries
//! before the session is established, and a rejected sign-in is revoked at
//! the provider straight away.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use ahmed_mart_core::Email;
use ahmed_mart_core::access::{Role, safe_return_path};

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::{CurrentUser, PendingOAuth, session_keys};
use crate::services::access::AccessService;
use crate::services::auth::{
    AuthError, AuthSession, OAUTH_PROVIDERS, SignUpOutcome, generate_code_verifier,
};
use crate::services::cart;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login and registration form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
    pub redirect_to: Option<String>,
}

/// Query parameters for the login page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub error: Option<String>,
    pub redirect_to: Option<String>,
    pub role: Option<Role>,
}

/// Query parameters for starting OAuth.
#[derive(Debug, Deserialize)]
pub struct OAuthStartQuery {
    #[serde(default)]
    pub role: Role,
    pub redirect_to: Option<String>,
}

/// Query parameters on the OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// ID-token sign-in payload.
#[derive(Debug, Deserialize)]
pub struct IdTokenRequest {
    pub provider: String,
    pub id_token: String,
    #[serde(default)]
    pub role: Role,
    pub redirect_to: Option<String>,
}

/// Where the client should go after a JSON sign-in.
#[derive(Debug, Serialize)]
pub struct SignedIn {
    pub redirect_to: String,
}

// =============================================================================
// Templates
// =============================================================================

/// One entry in the role picker.
pub struct RoleOption {
    pub value: String,
    pub label: &'static str,
    pub selected: bool,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub notice: Option<String>,
    pub redirect_to: Option<String>,
    pub roles: Vec<RoleOption>,
    pub selected_role: Role,
    pub providers: &'static [&'static str],
}

impl LoginTemplate {
    fn new(role: Role, redirect_to: Option<String>) -> Self {
        Self {
            error: None,
            notice: None,
            redirect_to,
            roles: Role::ALL
                .into_iter()
                .map(|r| RoleOption {
                    value: r.to_string(),
                    label: r.display_name(),
                    selected: r == role,
                })
                .collect(),
            selected_role: role,
            providers: OAUTH_PROVIDERS,
        }
    }

    fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Message for a login-page error code.
fn error_message(code: &str) -> &'static str {
    match code {
        "credentials" => "Invalid email or password",
        "session" => "Your sign-in expired, please try again",
        "oauth" => "Sign-in with the provider was cancelled or failed",
        _ => "Sign-in failed, please try again",
    }
}

// =============================================================================
// Sign-in Completion
// =============================================================================

/// Admit a provider session in `role` and establish the local session.
///
/// Returns the path to continue to.
async fn complete_sign_in(
    state: &AppState,
    session: &Session,
    auth: AuthSession,
    role: Role,
    return_to: Option<&str>,
) -> Result<String, AppError> {
    let email = match auth.user.email() {
        Ok(email) => email,
        // Some token responses omit the email; the user endpoint has it.
        Err(AuthError::MissingEmail) => state.auth().get_user(&auth.access_token).await?.email()?,
        Err(e) => return Err(e.into()),
    };
    let access = AccessService::new(state.pool());
    let validation = access.admit(auth.user.id, &email, role).await?;

    if !validation.is_valid {
        if let Err(e) = state.auth().sign_out(&auth.access_token).await {
            tracing::warn!(error = %e, "Failed to revoke rejected sign-in");
        }
        let message = validation
            .error
            .unwrap_or_else(|| format!("Not allowed to sign in as {}", role.display_name()));
        tracing::info!(user_id = %auth.user.id, %role, "Sign-in rejected for role");
        return Err(AuthError::RoleNotPermitted(message).into());
    }

    let user = CurrentUser::new(auth.user.id, email, role, auth.access_token);
    set_current_user(session, &user).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    // Start the signed-in session from the durable cart.
    let mut store = cart::open(session, state.pool(), Some(&user)).await?;
    store.fetch_cart().await?;

    tracing::info!(user_id = %user.id, %role, "User signed in");

    Ok(safe_return_path(return_to)
        .unwrap_or(role.landing_path())
        .to_string())
}

/// Show a rejected sign-in on the login page.
fn login_failure(err: &AppError, role: Role, redirect_to: Option<String>) -> Response {
    let (status, message) = match err {
        AppError::Auth(AuthError::RoleNotPermitted(msg)) => (StatusCode::FORBIDDEN, msg.clone()),
        AppError::Auth(AuthError::InvalidCredentials) => (
            StatusCode::UNAUTHORIZED,
            error_message("credentials").to_string(),
        ),
        AppError::Auth(AuthError::UserAlreadyExists) => (
            StatusCode::CONFLICT,
            "An account with this email already exists".to_string(),
        ),
        AppError::Auth(AuthError::WeakPassword(msg)) => (StatusCode::BAD_REQUEST, msg.clone()),
        AppError::Auth(AuthError::InvalidEmail(_)) => (
            StatusCode::BAD_REQUEST,
            "Invalid email address".to_string(),
        ),
        other => {
            tracing::error!(error = %other, "Sign-in failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Sign-in failed, please try again".to_string(),
            )
        }
    };

    (
        status,
        LoginTemplate::new(role, redirect_to).with_error(message),
    )
        .into_response()
}

// =============================================================================
// Password Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(session: Session, Query(query): Query<LoginQuery>) -> impl IntoResponse {
    let flash: Option<String> = session
        .remove(session_keys::AUTH_ERROR)
        .await
        .ok()
        .flatten();

    let mut page = LoginTemplate::new(query.role.unwrap_or_default(), query.redirect_to);
    page.error = flash.or_else(|| query.error.as_deref().map(|c| error_message(c).to_string()));
    page
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(role = %form.role))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let result = async {
        let email = Email::parse(&form.email).map_err(AuthError::from)?;
        let auth = state
            .auth()
            .sign_in_with_password(&email, &form.password)
            .await?;
        complete_sign_in(
            &state,
            &session,
            auth,
            form.role,
            form.redirect_to.as_deref(),
        )
        .await
    }
    .await;

    match result {
        Ok(path) => Redirect::to(&path).into_response(),
        Err(e) => login_failure(&e, form.role, form.redirect_to),
    }
}

/// Handle registration form submission.
///
/// Signs the user in directly when the provider does not require email
/// confirmation.
#[instrument(skip(state, session, form), fields(role = %form.role))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let result = async {
        let email = Email::parse(&form.email).map_err(AuthError::from)?;
        match state.auth().sign_up(&email, &form.password).await? {
            SignUpOutcome::SignedIn(auth) => complete_sign_in(
                &state,
                &session,
                auth,
                form.role,
                form.redirect_to.as_deref(),
            )
            .await
            .map(Some),
            SignUpOutcome::ConfirmationRequired(_) => Ok(None),
        }
    }
    .await;

    match result {
        Ok(Some(path)) => Redirect::to(&path).into_response(),
        Ok(None) => {
            let mut page = LoginTemplate::new(form.role, form.redirect_to);
            page.notice = Some("Check your email to confirm your account, then sign in.".to_string());
            page.into_response()
        }
        Err(e) => login_failure(&e, form.role, form.redirect_to),
    }
}

// =============================================================================
// OAuth Routes
// =============================================================================

/// Start an OAuth sign-in.
///
/// Stores the PKCE verifier, requested role and return path in the session,
/// then redirects to the provider.
#[instrument(skip(state, session, query))]
pub async fn oauth_start(
    State(state): State<AppState>,
    session: Session,
    Path(provider): Path<String>,
    Query(query): Query<OAuthStartQuery>,
) -> Response {
    let code_verifier = generate_code_verifier();
    let url = match state.auth().authorize_url(
        &provider,
        &state.config().auth_callback_url(),
        &code_verifier,
    ) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected OAuth provider");
            return Redirect::to("/auth/login?error=oauth").into_response();
        }
    };

    let pending = PendingOAuth {
        code_verifier,
        role: query.role,
        return_to: safe_return_path(query.redirect_to.as_deref()).map(String::from),
    };
    if let Err(e) = session.insert(session_keys::PENDING_OAUTH, &pending).await {
        tracing::error!(error = %e, "Failed to store OAuth state in session");
        return Redirect::to("/auth/login?error=session").into_response();
    }

    Redirect::to(&url).into_response()
}

/// Handle the OAuth callback.
///
/// Exchanges the code, validates the requested role and either establishes
/// the session or sends the user back to sign-in with the reason.
#[instrument(skip(state, session, query))]
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let pending: Option<PendingOAuth> = session
        .remove(session_keys::PENDING_OAUTH)
        .await
        .ok()
        .flatten();
    let Some(pending) = pending else {
        tracing::warn!("OAuth callback without pending sign-in");
        return Redirect::to("/auth/login?error=session").into_response();
    };

    if let Some(error) = query.error {
        let description = query.error_description.unwrap_or_default();
        tracing::warn!(%error, %description, "OAuth provider returned an error");
        return Redirect::to("/auth/login?error=oauth").into_response();
    }

    let Some(code) = query.code else {
        tracing::warn!("OAuth callback missing code");
        return Redirect::to("/auth/login?error=oauth").into_response();
    };

    let result = async {
        let auth = state
            .auth()
            .exchange_code(&code, &pending.code_verifier)
            .await?;
        complete_sign_in(
            &state,
            &session,
            auth,
            pending.role,
            pending.return_to.as_deref(),
        )
        .await
    }
    .await;

    match result {
        Ok(path) => Redirect::to(&path).into_response(),
        Err(AppError::Auth(AuthError::RoleNotPermitted(message))) => {
            if let Err(e) = session.insert(session_keys::AUTH_ERROR, &message).await {
                tracing::error!(error = %e, "Failed to store sign-in error");
            }
            let url = format!("/auth/login?error=role&role={}", pending.role);
            Redirect::to(&url).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "OAuth sign-in failed");
            Redirect::to("/auth/login?error=oauth").into_response()
        }
    }
}

/// Sign in with a provider-issued ID token (native and one-tap clients).
#[instrument(skip(state, session, request), fields(provider = %request.provider))]
pub async fn id_token(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<IdTokenRequest>,
) -> Result<Json<SignedIn>, AppError> {
    let auth = state
        .auth()
        .exchange_id_token(&request.provider, &request.id_token)
        .await?;
    let redirect_to = complete_sign_in(
        &state,
        &session,
        auth,
        request.role,
        request.redirect_to.as_deref(),
    )
    .await?;

    Ok(Json(SignedIn { redirect_to }))
}

/// Sign out.
///
/// Revokes the provider session and drops the local cart snapshot; the
/// durable cart stays with the account.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    match clear_current_user(&session).await {
        Ok(Some(user)) => {
            if let Err(e) = state.auth().sign_out(user.access_token()).await {
                tracing::warn!(error = %e, "Failed to revoke provider session");
            }
            tracing::info!(user_id = %user.id, "User signed out");
        }
        Ok(None) => {}
        Err(e) => tracing::error!(error = %e, "Failed to clear session user"),
    }

    if let Err(e) = session
        .remove::<serde_json::Value>(session_keys::CART)
        .await
    {
        tracing::warn!(error = %e, "Failed to drop cart snapshot");
    }
    clear_sentry_user();

    Redirect::to("/").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_template_selects_role() {
        let page = LoginTemplate::new(Role::Vendor, Some("/vendor".to_string()));
        let selected: Vec<_> = page.roles.iter().filter(|r| r.selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected.first().map(|r| r.label), Some("Vendor"));
    }

    #[test]
    fn test_login_page_renders_error_and_return_path() {
        let page = LoginTemplate::new(Role::Customer, Some("/cart".to_string()))
            .with_error("Invalid email or password");
        let html = page.render().unwrap_or_default();
        assert!(html.contains("Invalid email or password"));
        assert!(html.contains(r#"name="redirect_to""#));
        assert!(html.contains("/auth/oauth/google"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(error_message("credentials"), "Invalid email or password");
        assert_eq!(error_message("anything"), "Sign-in failed, please try again");
    }
}
