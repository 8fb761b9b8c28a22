//! User repository: role documents under `users/{uid}`.

use zona_gamer_core::UserUid;

use super::{CollectionPath, DocumentPath, DocumentStore, Fields, RepositoryError, SetMode, decode};
use crate::models::user::UserDocument;

const USERS_COLLECTION: &str = "users";

/// Repository for user role documents.
pub struct UserRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    fn path(uid: &UserUid) -> Result<DocumentPath, RepositoryError> {
        CollectionPath::root(USERS_COLLECTION)?.doc(uid.as_str())
    }

    /// Get a user's role document.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the read fails.
    pub(crate) async fn get(&self, uid: &UserUid) -> Result<Option<UserDocument>, RepositoryError> {
        self.store
            .get(&Self::path(uid)?)
            .await?
            .map(|doc| decode(&doc.fields))
            .transpose()
    }

    /// Write a user document, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the write fails.
    pub async fn create(&self, uid: &UserUid, fields: Fields) -> Result<(), RepositoryError> {
        self.store
            .set(&Self::path(uid)?, fields, SetMode::Overwrite)
            .await
    }

    /// Merge fields into a user document.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the write fails.
    pub async fn merge(&self, uid: &UserUid, fields: Fields) -> Result<(), RepositoryError> {
        self.store
            .set(&Self::path(uid)?, fields, SetMode::Merge)
            .await
    }

    /// Delete a user's role document.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the delete fails.
    pub async fn delete(&self, uid: &UserUid) -> Result<(), RepositoryError> {
        self.store.delete(&Self::path(uid)?).await
    }
}
