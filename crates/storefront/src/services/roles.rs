//! Role resolution and role administration (`users/{uid}`).
//!
//! A signed-in user without a role document is a client. The resolved
//! [`AppUser`] is kept as the current user until the next load or reset.

use std::sync::{Arc, RwLock};

use tracing::{debug, error, instrument, warn};

use zona_gamer_core::{UserRole, UserUid};

use crate::clock::Clock;
use crate::db::{DocumentStore, Fields, UserRepository, Value, sparse};
use crate::error::Result;
use crate::models::{AppUser, CurrentUser};

/// Resolves the current user's role and manages other users' roles.
pub struct RoleService {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    current: RwLock<Option<AppUser>>,
}

impl std::fmt::Debug for RoleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleService")
            .field("current", &self.current_user())
            .finish_non_exhaustive()
    }
}

impl RoleService {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            current: RwLock::new(None),
        }
    }

    fn repo(&self) -> UserRepository<'_> {
        UserRepository::new(self.store.as_ref())
    }

    /// Resolve the role of `user` and make it the current user.
    ///
    /// Returns `None` when signed out or when the role document cannot be
    /// read; the read error is logged, not returned.
    #[instrument(skip(self, user), fields(uid = user.map(|u| u.uid.as_str())))]
    pub async fn load(&self, user: Option<&CurrentUser>) -> Option<AppUser> {
        let resolved = match user {
            None => None,
            Some(user) => match self.repo().get(&user.uid).await {
                Ok(Some(doc)) => Some(AppUser {
                    uid: user.uid.clone(),
                    email: user.email.clone().unwrap_or_default(),
                    role: doc.role.unwrap_or_default(),
                    display_name: doc.display_name,
                    created_at: doc.created_at.unwrap_or_else(|| self.clock.now()),
                    created_by: doc.created_by,
                }),
                Ok(None) => {
                    debug!("No role document, defaulting to client");
                    Some(AppUser {
                        uid: user.uid.clone(),
                        email: user.email.clone().unwrap_or_default(),
                        role: UserRole::Client,
                        display_name: None,
                        created_at: self.clock.now(),
                        created_by: None,
                    })
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load user role");
                    None
                }
            },
        };

        self.set_current(resolved.clone());
        resolved
    }

    /// Write a user's role document, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the write fails.
    #[instrument(skip(self, display_name))]
    pub async fn create_user_with_role(
        &self,
        uid: &UserUid,
        email: &str,
        role: UserRole,
        created_by: &UserUid,
        display_name: Option<&str>,
    ) -> Result<()> {
        let mut fields = Fields::new();
        fields.insert("uid".into(), Value::from(uid.as_str()));
        fields.insert("email".into(), Value::from(email));
        fields.insert("role".into(), Value::from(role.as_str()));
        if let Some(name) = display_name {
            fields.insert("displayName".into(), Value::from(name));
        }
        fields.insert("createdAt".into(), Value::Timestamp(self.clock.now()));
        fields.insert("createdBy".into(), Value::from(created_by.as_str()));

        self.repo()
            .create(uid, sparse(fields))
            .await
            .inspect_err(|e| error!(error = %e, "Failed to create user role"))?;
        Ok(())
    }

    /// Change a user's role, leaving the rest of the document untouched.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the write fails.
    #[instrument(skip(self))]
    pub async fn update_user_role(&self, uid: &UserUid, role: UserRole) -> Result<()> {
        let mut fields = Fields::new();
        fields.insert("role".into(), Value::from(role.as_str()));
        self.repo()
            .merge(uid, fields)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to update user role"))?;
        Ok(())
    }

    /// Merge the given profile fields into a user's document.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the write fails.
    #[instrument(skip(self, display_name, email))]
    pub async fn update_user_data(
        &self,
        uid: &UserUid,
        display_name: Option<&str>,
        email: Option<&str>,
    ) -> Result<()> {
        let mut fields = Fields::new();
        if let Some(name) = display_name {
            fields.insert("displayName".into(), Value::from(name));
        }
        if let Some(email) = email {
            fields.insert("email".into(), Value::from(email));
        }
        self.repo()
            .merge(uid, fields)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to update user data"))?;
        Ok(())
    }

    /// Delete a user's role document. The user becomes a client again.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the delete fails.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, uid: &UserUid) -> Result<()> {
        self.repo()
            .delete(uid)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to delete user role"))?;
        Ok(())
    }

    /// The user resolved by the last [`load`](Self::load).
    #[must_use]
    pub fn current_user(&self) -> Option<AppUser> {
        self.current.read().ok().and_then(|user| user.clone())
    }

    fn current_role(&self) -> Option<UserRole> {
        self.current
            .read()
            .ok()
            .and_then(|user| user.as_ref().map(|u| u.role))
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.current_role() == Some(UserRole::Admin)
    }

    #[must_use]
    pub fn is_employee(&self) -> bool {
        self.current_role() == Some(UserRole::Employee)
    }

    #[must_use]
    pub fn is_client(&self) -> bool {
        self.current_role() == Some(UserRole::Client)
    }

    /// Access to role management and inventory.
    #[must_use]
    pub fn has_admin_access(&self) -> bool {
        self.is_admin()
    }

    /// Access to message generation.
    #[must_use]
    pub fn has_employee_access(&self) -> bool {
        self.is_admin() || self.is_employee()
    }

    /// Forget the current user.
    pub fn reset(&self) {
        self.set_current(None);
    }

    fn set_current(&self, user: Option<AppUser>) {
        if let Ok(mut current) = self.current.write() {
            *current = user;
        }
    }
}
