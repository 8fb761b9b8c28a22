//! Item repository: games and combos documents.

use zona_gamer_core::{ItemId, ItemKind, Platform};

use super::{
    CollectionPath, DocumentPath, DocumentStore, Fields, RepositoryError, SetMode, decode,
};
use crate::models::ItemDocument;

/// Repository for `games/{platform}/juegos` and `combos/{platform}/combos`.
pub struct ItemRepository<'a> {
    store: &'a dyn DocumentStore,
    kind: ItemKind,
}

impl<'a> ItemRepository<'a> {
    /// Create a repository for one catalog.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore, kind: ItemKind) -> Self {
        Self { store, kind }
    }

    /// Collection holding every item of `platform`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidPath` if a segment is malformed.
    pub fn collection(&self, platform: Platform) -> Result<CollectionPath, RepositoryError> {
        CollectionPath::root(self.kind.root_collection())?
            .doc(platform.as_str())?
            .collection(self.kind.item_collection())
    }

    /// Path of one item document.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidPath` if `id` is empty or contains `/`.
    pub fn path(&self, platform: Platform, id: &ItemId) -> Result<DocumentPath, RepositoryError> {
        self.collection(platform)?.doc(id.as_str())
    }

    /// Every item document of a platform, keyed by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the listing fails.
    pub async fn list(
        &self,
        platform: Platform,
    ) -> Result<Vec<(ItemId, ItemDocument)>, RepositoryError> {
        let documents = self.store.list(&self.collection(platform)?).await?;
        documents
            .into_iter()
            .map(|doc| Ok((ItemId::new(doc.id()), decode(&doc.fields)?)))
            .collect()
    }

    /// One item document.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the read fails.
    pub async fn get(
        &self,
        platform: Platform,
        id: &ItemId,
    ) -> Result<Option<ItemDocument>, RepositoryError> {
        self.store
            .get(&self.path(platform, id)?)
            .await?
            .map(|doc| decode(&doc.fields))
            .transpose()
    }

    /// Whether the item document exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the read fails.
    pub async fn exists(&self, platform: Platform, id: &ItemId) -> Result<bool, RepositoryError> {
        Ok(self.store.get(&self.path(platform, id)?).await?.is_some())
    }

    /// Write a new item document, replacing anything at that id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the write fails.
    pub async fn create(
        &self,
        platform: Platform,
        id: &ItemId,
        fields: Fields,
    ) -> Result<(), RepositoryError> {
        self.store
            .set(&self.path(platform, id)?, fields, SetMode::Overwrite)
            .await
    }

    /// Merge top-level fields into an item document, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the write fails.
    pub async fn merge(
        &self,
        platform: Platform,
        id: &ItemId,
        fields: Fields,
    ) -> Result<(), RepositoryError> {
        self.store
            .set(&self.path(platform, id)?, fields, SetMode::Merge)
            .await
    }

    /// Delete the item document. Nested accounts are not touched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the delete fails.
    pub async fn delete(&self, platform: Platform, id: &ItemId) -> Result<(), RepositoryError> {
        self.store.delete(&self.path(platform, id)?).await
    }
}
