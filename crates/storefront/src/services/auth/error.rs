//! Authentication error types.

use thiserror::Error;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] zona_gamer_core::EmailError),

    /// Wrong password, unknown email or disabled account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Sign-up with an email that already has an account.
    #[error("email already registered")]
    EmailAlreadyExists,

    /// Password rejected by the provider's policy.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// The HTTP request could not be completed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Any other provider failure.
    #[error("auth provider error: {0}")]
    Provider(String),
}
