//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] ahmed_mart_core::EmailError),

    /// Wrong password, unknown user or rejected grant.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Sign-up for an email that already has an identity.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// The identity may not act in the requested role.
    #[error("{0}")]
    RoleNotPermitted(String),

    /// OAuth session state missing or invalid.
    #[error("invalid session state")]
    InvalidSessionState,

    /// Provider is not supported for OAuth or ID-token sign-in.
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// The provider identity carries no email address.
    #[error("identity has no email address")]
    MissingEmail,

    /// The auth provider answered with an unexpected error.
    #[error("auth provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    /// HTTP request to the auth provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
