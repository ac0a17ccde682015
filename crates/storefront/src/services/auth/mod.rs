//! Authentication session provider.
//!
//! Identities live in a hosted auth service with a GoTrue-style REST API.
//! This client covers password sign-in and sign-up, the OAuth authorization
//! code flow with PKCE, ID-token exchange, user lookup and sign-out.
//!
//! # OAuth Flow
//!
//! 1. Generate a code verifier with [`generate_code_verifier`]
//! 2. Redirect to [`AuthClient::authorize_url`]
//! 3. The provider redirects back with `?code=...`
//! 4. Exchange it with [`AuthClient::exchange_code`]

mod error;

pub use error::AuthError;

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use ahmed_mart_core::{Email, UserId};

use crate::config::AuthProviderConfig;

/// Minimum password length accepted before calling the provider.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// OAuth providers offered on the sign-in page.
pub const OAUTH_PROVIDERS: &[&str] = &["google", "apple"];

/// Length of generated PKCE code verifiers.
const CODE_VERIFIER_LENGTH: usize = 64;

/// Upper bound on any single auth provider call.
const AUTH_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Identity as reported by the auth provider.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    pub email: Option<String>,
}

impl AuthUser {
    /// The identity's normalized email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingEmail` if the identity has none, or
    /// `AuthError::InvalidEmail` if it does not parse.
    pub fn email(&self) -> Result<Email, AuthError> {
        let raw = self.email.as_deref().ok_or(AuthError::MissingEmail)?;
        Ok(Email::parse(raw)?)
    }
}

/// A signed-in provider session.
#[derive(Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub user: AuthUser,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Result of a sign-up.
///
/// Providers that require email confirmation return only the user.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpOutcome {
    SignedIn(AuthSession),
    ConfirmationRequired(AuthUser),
}

#[derive(Debug, Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct PkceGrant<'a> {
    auth_code: &'a str,
    code_verifier: &'a str,
}

#[derive(Debug, Serialize)]
struct IdTokenGrant<'a> {
    provider: &'a str,
    id_token: &'a str,
}

/// Error body shapes the provider uses.
#[derive(Debug, Default, Deserialize)]
struct ProviderErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

impl ProviderErrorBody {
    fn text(&self) -> String {
        self.error_description
            .as_deref()
            .or(self.msg.as_deref())
            .or(self.message.as_deref())
            .or(self.error.as_deref())
            .unwrap_or("unknown error")
            .to_string()
    }
}

/// Which call failed, for mapping provider errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Grant,
    SignUp,
    Other,
}

fn classify_error(call: Call, status: u16, body: &ProviderErrorBody) -> AuthError {
    let message = body.text();
    let lower = message.to_lowercase();

    match (call, status) {
        (Call::Grant, 400 | 401) => AuthError::InvalidCredentials,
        (Call::SignUp, 400 | 422) if lower.contains("already") => AuthError::UserAlreadyExists,
        (Call::SignUp, 400 | 422) if lower.contains("password") => {
            AuthError::WeakPassword(message)
        }
        _ => AuthError::Provider { status, message },
    }
}

/// Generate a random PKCE code verifier.
#[must_use]
pub fn generate_code_verifier() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";
    let mut rng = rand::rng();
    (0..CODE_VERIFIER_LENGTH)
        .filter_map(|_| CHARSET.get(rng.random_range(0..CHARSET.len())))
        .map(|b| char::from(*b))
        .collect()
}

/// Check a password locally before sending it anywhere.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if it is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Client for the hosted auth REST API.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<AuthClientInner>,
}

struct AuthClientInner {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl AuthClient {
    /// Create a new auth client.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Http` if the HTTP client cannot be built.
    pub fn new(config: &AuthProviderConfig) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(AUTH_REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(AuthClientInner {
                client,
                base_url: config.url.trim_end_matches('/').to_string(),
                anon_key: config.anon_key.expose_secret().to_string(),
            }),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.inner.base_url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        call: Call,
        request: reqwest::RequestBuilder,
    ) -> Result<T, AuthError> {
        let response = request
            .header("apikey", &self.inner.anon_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: ProviderErrorBody = response.json().await.unwrap_or_default();
            return Err(classify_error(call, status.as_u16(), &body));
        }

        Ok(response.json().await?)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the provider rejects them.
    pub async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let request = self
            .inner
            .client
            .post(self.endpoint("token"))
            .query(&[("grant_type", "password")])
            .json(&PasswordCredentials {
                email: email.as_str(),
                password,
            });

        self.send(Call::Grant, request).await
    }

    /// Create an identity with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the password is too short, or
    /// `AuthError::UserAlreadyExists` if the email is taken.
    pub async fn sign_up(&self, email: &Email, password: &str) -> Result<SignUpOutcome, AuthError> {
        validate_password(password)?;

        let request = self
            .inner
            .client
            .post(self.endpoint("signup"))
            .json(&PasswordCredentials {
                email: email.as_str(),
                password,
            });

        self.send(Call::SignUp, request).await
    }

    /// Authorization URL for an OAuth provider.
    ///
    /// Uses the `plain` PKCE method, so the challenge is the verifier itself.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnsupportedProvider` for providers not offered.
    pub fn authorize_url(
        &self,
        provider: &str,
        redirect_to: &str,
        code_verifier: &str,
    ) -> Result<String, AuthError> {
        if !OAUTH_PROVIDERS.contains(&provider) {
            return Err(AuthError::UnsupportedProvider(provider.to_string()));
        }

        Ok(format!(
            "{}?provider={}&redirect_to={}&code_challenge={}&code_challenge_method=plain",
            self.endpoint("authorize"),
            urlencoding::encode(provider),
            urlencoding::encode(redirect_to),
            urlencoding::encode(code_verifier),
        ))
    }

    /// Exchange an authorization code for a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the code or verifier is rejected.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, AuthError> {
        let request = self
            .inner
            .client
            .post(self.endpoint("token"))
            .query(&[("grant_type", "pkce")])
            .json(&PkceGrant {
                auth_code: code,
                code_verifier,
            });

        self.send(Call::Grant, request).await
    }

    /// Exchange a provider-issued ID token for a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnsupportedProvider` for providers not offered, or
    /// `AuthError::InvalidCredentials` if the token is rejected.
    pub async fn exchange_id_token(
        &self,
        provider: &str,
        id_token: &str,
    ) -> Result<AuthSession, AuthError> {
        if !OAUTH_PROVIDERS.contains(&provider) {
            return Err(AuthError::UnsupportedProvider(provider.to_string()));
        }

        let request = self
            .inner
            .client
            .post(self.endpoint("token"))
            .query(&[("grant_type", "id_token")])
            .json(&IdTokenGrant { provider, id_token });

        self.send(Call::Grant, request).await
    }

    /// Look up the identity behind an access token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Provider` if the token is expired or revoked.
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let request = self
            .inner
            .client
            .get(self.endpoint("user"))
            .bearer_auth(access_token);

        self.send(Call::Other, request).await
    }

    /// Revoke a session at the provider.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Provider` if the provider refuses.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .inner
            .client
            .post(self.endpoint("logout"))
            .header("apikey", &self.inner.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: ProviderErrorBody = response.json().await.unwrap_or_default();
            return Err(classify_error(Call::Other, status.as_u16(), &body));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn client() -> AuthClient {
        AuthClient::new(&AuthProviderConfig {
            url: "https://auth.example.in/".to_string(),
            anon_key: SecretString::from("anon-key"),
        })
        .unwrap()
    }

    #[test]
    fn test_authorize_url() {
        let url = client()
            .authorize_url("google", "https://ahmedmart.in/auth/callback", "abc123")
            .unwrap();
        assert!(url.starts_with("https://auth.example.in/auth/v1/authorize?provider=google"));
        assert!(url.contains("redirect_to=https%3A%2F%2Fahmedmart.in%2Fauth%2Fcallback"));
        assert!(url.contains("code_challenge=abc123&code_challenge_method=plain"));
    }

    #[test]
    fn test_authorize_url_rejects_unknown_provider() {
        assert!(matches!(
            client().authorize_url("myspace", "/", "v"),
            Err(AuthError::UnsupportedProvider(_))
        ));
    }

    #[test]
    fn test_code_verifier() {
        let a = generate_code_verifier();
        let b = generate_code_verifier();
        assert_eq!(a.len(), CODE_VERIFIER_LENGTH);
        assert_ne!(a, b);
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn test_classify_error() {
        let body = ProviderErrorBody {
            error: Some("invalid_grant".to_string()),
            error_description: Some("Invalid login credentials".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            classify_error(Call::Grant, 400, &body),
            AuthError::InvalidCredentials
        ));

        let body = ProviderErrorBody {
            msg: Some("User already registered".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            classify_error(Call::SignUp, 422, &body),
            AuthError::UserAlreadyExists
        ));

        assert!(matches!(
            classify_error(Call::Other, 500, &ProviderErrorBody::default()),
            AuthError::Provider { status: 500, .. }
        ));
    }

    #[test]
    fn test_sign_up_outcome_shapes() {
        let user_id = UserId::generate();
        let session: SignUpOutcome = serde_json::from_value(serde_json::json!({
            "access_token": "t",
            "refresh_token": "r",
            "expires_in": 3600,
            "user": { "id": user_id, "email": "a@b.in" }
        }))
        .unwrap();
        assert!(matches!(session, SignUpOutcome::SignedIn(_)));

        let pending: SignUpOutcome =
            serde_json::from_value(serde_json::json!({ "id": user_id, "email": "a@b.in" }))
                .unwrap();
        assert!(matches!(pending, SignUpOutcome::ConfirmationRequired(_)));
    }
}
