//! In-memory auth provider for tests and offline use.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use secrecy::SecretString;
use uuid::Uuid;

use zona_gamer_core::UserUid;

use super::{AuthError, AuthProvider, MIN_PASSWORD_LENGTH};
use crate::models::{AuthSession, CurrentUser};

struct Account {
    uid: UserUid,
    email: String,
    password: String,
}

/// [`AuthProvider`] backed by a map of registered accounts.
///
/// Emails are matched case-insensitively, like the hosted provider does.
#[derive(Default)]
pub struct InMemoryAuthProvider {
    accounts: RwLock<HashMap<String, Account>>,
}

impl std::fmt::Debug for InMemoryAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.accounts.read().map_or(0, |a| a.len());
        f.debug_struct("InMemoryAuthProvider")
            .field("accounts", &count)
            .finish()
    }
}

impl InMemoryAuthProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account with a fixed uid.
    #[must_use]
    pub fn with_account(self, uid: &str, email: &str, password: &str) -> Self {
        if let Ok(mut accounts) = self.accounts.write() {
            accounts.insert(
                email.to_lowercase(),
                Account {
                    uid: UserUid::new(uid),
                    email: email.to_owned(),
                    password: password.to_owned(),
                },
            );
        }
        self
    }

    fn session(account: &Account) -> AuthSession {
        AuthSession {
            user: CurrentUser {
                uid: account.uid.clone(),
                email: Some(account.email.clone()),
                display_name: None,
            },
            id_token: SecretString::from(Uuid::new_v4().simple().to_string()),
        }
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuthProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| AuthError::Provider("account table poisoned".into()))?;
        match accounts.get(&email.to_lowercase()) {
            Some(account) if account.password == password => Ok(Self::session(account)),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword(format!(
                "Password should be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| AuthError::Provider("account table poisoned".into()))?;
        let key = email.to_lowercase();
        if accounts.contains_key(&key) {
            return Err(AuthError::EmailAlreadyExists);
        }

        let account = Account {
            uid: UserUid::new(Uuid::new_v4().simple().to_string()),
            email: email.to_owned(),
            password: password.to_owned(),
        };
        let session = Self::session(&account);
        accounts.insert(key, account);
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        Ok(())
    }
}
