//! Unified error handling.
//!
//! Provides a unified `AppError` type for every service operation. Callers
//! that show errors to end users should use [`AppError::user_message`], which
//! hides internal details.

use thiserror::Error;

use crate::config::ConfigError;
use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::whatsapp::ComposeError;
use crate::storage::StorageError;

/// Application-level error type for the storefront data layer.
#[derive(Debug, Error)]
pub enum AppError {
    /// Document store operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Local storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// The message composer rejected the account.
    #[error("Compose error: {0}")]
    Compose(#[from] ComposeError),

    /// An item with the same id already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Input rejected before reaching the store.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Whether the error comes from a security-rule denial.
    #[must_use]
    pub const fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Database(RepositoryError::PermissionDenied(_)))
    }

    /// Message safe to show to an end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::PermissionDenied(_)) => {
                "No tienes permisos para realizar esta acción".to_string()
            }
            Self::Database(_) | Self::Storage(_) | Self::Config(_) => {
                "Error interno, intenta de nuevo".to_string()
            }
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Credenciales inválidas".to_string(),
                AuthError::EmailAlreadyExists => {
                    "Ya existe una cuenta con este correo".to_string()
                }
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Correo inválido".to_string(),
                _ => "Error de autenticación".to_string(),
            },
            Self::Compose(err) => err.to_string(),
            Self::AlreadyExists(msg) | Self::NotFound(msg) | Self::Validation(msg) => msg.clone(),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
