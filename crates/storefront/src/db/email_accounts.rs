//! Email account repository: the `correos` sub-collection of each item.

use zona_gamer_core::{ItemId, ItemKind, Platform};

use super::{
    CollectionPath, DocumentPath, DocumentStore, Fields, ItemRepository, RepositoryError,
    SetMode, Value, decode,
};
use crate::models::EmailAccountDocument;

/// Name of the account sub-collection below every item.
pub const ACCOUNTS_COLLECTION: &str = "correos";

/// Field holding the unused verification codes.
const CODES_FIELD: &str = "codigosGenerados";

/// Repository for `{item}/correos/{email}`.
pub struct EmailAccountRepository<'a> {
    store: &'a dyn DocumentStore,
    items: ItemRepository<'a>,
}

impl<'a> EmailAccountRepository<'a> {
    /// Create a repository for the accounts of one catalog.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore, kind: ItemKind) -> Self {
        Self {
            store,
            items: ItemRepository::new(store, kind),
        }
    }

    /// Collection holding the accounts of one item.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidPath` if a segment is malformed.
    pub fn collection(
        &self,
        platform: Platform,
        item: &ItemId,
    ) -> Result<CollectionPath, RepositoryError> {
        self.items
            .path(platform, item)?
            .collection(ACCOUNTS_COLLECTION)
    }

    /// Path of one account document.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidPath` if `email` is empty or contains `/`.
    pub fn path(
        &self,
        platform: Platform,
        item: &ItemId,
        email: &str,
    ) -> Result<DocumentPath, RepositoryError> {
        self.collection(platform, item)?.doc(email)
    }

    /// Every account of an item as `(email, document)`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::PermissionDenied` for callers the security
    /// rules reject, or another `RepositoryError` if the listing fails.
    pub async fn list(
        &self,
        platform: Platform,
        item: &ItemId,
    ) -> Result<Vec<(String, EmailAccountDocument)>, RepositoryError> {
        let documents = self.store.list(&self.collection(platform, item)?).await?;
        documents
            .into_iter()
            .map(|doc| Ok((doc.id().to_owned(), decode(&doc.fields)?)))
            .collect()
    }

    /// Document ids (emails) of every account of an item.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the listing fails.
    pub async fn list_paths(
        &self,
        platform: Platform,
        item: &ItemId,
    ) -> Result<Vec<DocumentPath>, RepositoryError> {
        let documents = self.store.list(&self.collection(platform, item)?).await?;
        Ok(documents.into_iter().map(|doc| doc.path).collect())
    }

    /// One account document.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the read fails.
    pub async fn get(
        &self,
        platform: Platform,
        item: &ItemId,
        email: &str,
    ) -> Result<Option<EmailAccountDocument>, RepositoryError> {
        self.store
            .get(&self.path(platform, item, email)?)
            .await?
            .map(|doc| decode(&doc.fields))
            .transpose()
    }

    /// Write a new account document, replacing anything at that email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the write fails.
    pub async fn create(
        &self,
        platform: Platform,
        item: &ItemId,
        email: &str,
        fields: Fields,
    ) -> Result<(), RepositoryError> {
        self.store
            .set(&self.path(platform, item, email)?, fields, SetMode::Overwrite)
            .await
    }

    /// Replace the given fields of an existing account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    pub async fn update(
        &self,
        platform: Platform,
        item: &ItemId,
        email: &str,
        fields: Fields,
    ) -> Result<(), RepositoryError> {
        self.store
            .update(&self.path(platform, item, email)?, fields)
            .await
    }

    /// Delete one account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the delete fails.
    pub async fn delete(
        &self,
        platform: Platform,
        item: &ItemId,
        email: &str,
    ) -> Result<(), RepositoryError> {
        self.store.delete(&self.path(platform, item, email)?).await
    }

    /// Remove consumed verification codes from an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    pub async fn remove_codes(
        &self,
        platform: Platform,
        item: &ItemId,
        email: &str,
        codes: &[String],
    ) -> Result<(), RepositoryError> {
        let values = codes.iter().map(|c| Value::from(c.as_str())).collect();
        self.store
            .array_remove(&self.path(platform, item, email)?, CODES_FIELD, values)
            .await
    }
}
