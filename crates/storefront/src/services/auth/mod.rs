//! Authentication service.
//!
//! Email/password sign-in and sign-up go through an [`AuthProvider`]. The
//! service remembers the day of the last successful sign-in in local storage
//! so the operator can be prompted again once the day changes.

mod error;
mod identity_toolkit;
mod memory;

pub use error::AuthError;
pub use identity_toolkit::IdentityToolkitClient;
pub use memory::InMemoryAuthProvider;

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};

use zona_gamer_core::Email;

use crate::clock::Clock;
use crate::models::session::keys;
use crate::models::{AuthSession, CurrentUser};
use crate::storage::LocalStorage;

/// Minimum password length accepted at sign-up.
pub const MIN_PASSWORD_LENGTH: usize = 6;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Hosted identity provider.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Sign in with an existing account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for a wrong email or password.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    /// Create an account and sign in with it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::EmailAlreadyExists` or `AuthError::WeakPassword`
    /// when the provider rejects the registration.
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    /// End the current session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the provider cannot end the session.
    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// Authentication service.
///
/// Wraps an [`AuthProvider`] and tracks the signed-in user and the session
/// date.
pub struct AuthService {
    provider: Arc<dyn AuthProvider>,
    storage: Arc<dyn LocalStorage>,
    clock: Arc<dyn Clock>,
    current: RwLock<Option<CurrentUser>>,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("current", &self.current_user())
            .finish_non_exhaustive()
    }
}

impl AuthService {
    #[must_use]
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        storage: Arc<dyn LocalStorage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            storage,
            clock,
            current: RwLock::new(None),
        }
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::InvalidCredentials` if the provider rejects the
    /// credentials.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let email = Email::parse(email)?;

        let session = self
            .provider
            .sign_in(email.as_str(), password)
            .await
            .inspect_err(|e| warn!(error = %e, "Sign-in failed"))?;

        info!(uid = %session.user.uid, "Signed in");
        Ok(self.start_session(session))
    }

    /// Register a new account and sign in with it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password is shorter than
    /// [`MIN_PASSWORD_LENGTH`] or the provider rejects it.
    /// Returns `AuthError::EmailAlreadyExists` if the email is registered.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        let session = self
            .provider
            .sign_up(email.as_str(), password)
            .await
            .inspect_err(|e| warn!(error = %e, "Sign-up failed"))?;

        info!(uid = %session.user.uid, "Account created");
        Ok(self.start_session(session))
    }

    /// Sign out and forget the session date.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the provider cannot end the session. The local
    /// state is cleared either way.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let result = self.provider.sign_out().await;
        self.set_current(None);
        if let Err(e) = self.storage.remove_item(keys::SESSION_DATE) {
            warn!(error = %e, "Failed to clear session date");
        }
        result.inspect_err(|e| error!(error = %e, "Sign-out failed"))
    }

    /// Whether the calendar day differs from the day of the last sign-in.
    ///
    /// Also true when no sign-in date is recorded or it cannot be read.
    #[must_use]
    pub fn has_day_changed(&self) -> bool {
        let today = self.today();
        match self.storage.get_item(keys::SESSION_DATE) {
            Ok(Some(saved)) => saved != today,
            Ok(None) => true,
            Err(e) => {
                warn!(error = %e, "Failed to read session date");
                true
            }
        }
    }

    /// The user of the last successful sign-in or sign-up.
    #[must_use]
    pub fn current_user(&self) -> Option<CurrentUser> {
        self.current.read().ok().and_then(|user| user.clone())
    }

    /// Forget the in-memory user without touching the provider or storage.
    pub fn reset(&self) {
        self.set_current(None);
    }

    fn start_session(&self, session: AuthSession) -> CurrentUser {
        if let Err(e) = self.storage.set_item(keys::SESSION_DATE, &self.today()) {
            warn!(error = %e, "Failed to save session date");
        }
        self.set_current(Some(session.user.clone()));
        session.user
    }

    fn today(&self) -> String {
        self.clock.today().format(DATE_FORMAT).to_string()
    }

    fn set_current(&self, user: Option<CurrentUser>) {
        if let Ok(mut current) = self.current.write() {
            *current = user;
        }
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "La contraseña debe tener al menos {MIN_PASSWORD_LENGTH} caracteres"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStorage;

    struct Fixture {
        clock: Arc<ManualClock>,
        storage: Arc<MemoryStorage>,
        auth: AuthService,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 10, 14, 0, 0).unwrap(),
        ));
        let storage = Arc::new(MemoryStorage::new());
        let provider = Arc::new(InMemoryAuthProvider::new().with_account(
            "admin-uid",
            "admin@zonagamer.com",
            "secreto123",
        ));
        let auth = AuthService::new(provider, storage.clone(), clock.clone());
        Fixture {
            clock,
            storage,
            auth,
        }
    }

    #[tokio::test]
    async fn test_sign_in_records_session_date() {
        let f = fixture();
        assert!(f.auth.has_day_changed());

        let user = f
            .auth
            .sign_in(" admin@zonagamer.com ", "secreto123")
            .await
            .unwrap();

        assert_eq!(user.uid.as_str(), "admin-uid");
        assert_eq!(
            f.storage.get_item(keys::SESSION_DATE).unwrap().as_deref(),
            Some("2025-03-10")
        );
        assert!(!f.auth.has_day_changed());
        assert_eq!(f.auth.current_user(), Some(user));
    }

    #[tokio::test]
    async fn test_day_change_is_detected() {
        let f = fixture();
        f.auth
            .sign_in("admin@zonagamer.com", "secreto123")
            .await
            .unwrap();

        f.clock.advance(Duration::hours(1));
        assert!(!f.auth.has_day_changed());

        f.clock.advance(Duration::days(1));
        assert!(f.auth.has_day_changed());
    }

    #[tokio::test]
    async fn test_sign_out_clears_session_date() {
        let f = fixture();
        f.auth
            .sign_in("admin@zonagamer.com", "secreto123")
            .await
            .unwrap();

        f.auth.sign_out().await.unwrap();

        assert!(f.storage.get_item(keys::SESSION_DATE).unwrap().is_none());
        assert!(f.auth.current_user().is_none());
        assert!(f.auth.has_day_changed());
    }

    #[tokio::test]
    async fn test_wrong_password_leaves_no_session() {
        let f = fixture();
        let err = f
            .auth
            .sign_in("admin@zonagamer.com", "otra")
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(f.storage.get_item(keys::SESSION_DATE).unwrap().is_none());
        assert!(f.auth.current_user().is_none());
    }

    #[tokio::test]
    async fn test_sign_up_validates_before_calling_provider() {
        let f = fixture();
        assert!(matches!(
            f.auth.sign_up("no-es-correo", "secreto123").await,
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            f.auth.sign_up("nuevo@zonagamer.com", "12345").await,
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            f.auth.sign_up("ADMIN@zonagamer.com", "secreto123").await,
            Err(AuthError::EmailAlreadyExists)
        ));

        let user = f
            .auth
            .sign_up("nuevo@zonagamer.com", "123456")
            .await
            .unwrap();
        assert_eq!(user.email.as_deref(), Some("nuevo@zonagamer.com"));
        assert!(!f.auth.has_day_changed());
    }

    #[tokio::test]
    async fn test_storage_failure_does_not_fail_sign_in() {
        let f = fixture();
        f.storage.reject_writes(true);

        let user = f
            .auth
            .sign_in("admin@zonagamer.com", "secreto123")
            .await
            .unwrap();

        assert_eq!(user.uid.as_str(), "admin-uid");
        assert!(f.auth.has_day_changed());
    }
}
