//! In-memory document store.
//!
//! Behaves like the remote store for everything the storefront relies on:
//! merge and overwrite writes, `update` on a missing document failing,
//! server timestamps, array removal, single-filter queries and no cascade on
//! delete. Tests can also deny reads of a collection (to mimic security rules
//! for anonymous callers) and make writes fail.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::debug;

use super::{
    CollectionPath, Document, DocumentPath, DocumentStore, Fields, Query, RepositoryError,
    SetMode, Value,
};
use crate::clock::{Clock, SystemClock};

/// Map-backed [`DocumentStore`].
pub struct InMemoryStore {
    documents: RwLock<BTreeMap<DocumentPath, Fields>>,
    denied_reads: RwLock<HashSet<String>>,
    failing_writes: RwLock<HashSet<String>>,
    list_calls: AtomicUsize,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("documents", &self.len())
            .field("list_calls", &self.list_calls())
            .finish_non_exhaustive()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Empty store stamping server timestamps with the wall clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Empty store stamping server timestamps with `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
            denied_reads: RwLock::new(HashSet::new()),
            failing_writes: RwLock::new(HashSet::new()),
            list_calls: AtomicUsize::new(0),
            clock,
        }
    }

    /// Reject reads of every collection named `name` with `PermissionDenied`.
    pub fn deny_reads(&self, name: &str) {
        if let Ok(mut denied) = self.denied_reads.write() {
            denied.insert(name.to_owned());
        }
    }

    /// Make writes to every collection named `name` fail with a backend error.
    pub fn fail_writes(&self, name: &str) {
        if let Ok(mut failing) = self.failing_writes.write() {
            failing.insert(name.to_owned());
        }
    }

    /// Lift every read denial and write failure.
    pub fn reset_rules(&self) {
        if let Ok(mut denied) = self.denied_reads.write() {
            denied.clear();
        }
        if let Ok(mut failing) = self.failing_writes.write() {
            failing.clear();
        }
    }

    /// Number of `list` calls served so far.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().map_or(0, |docs| docs.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store a document directly, bypassing rules. Server timestamps are
    /// resolved.
    pub fn insert(&self, path: DocumentPath, fields: Fields) {
        let fields = self.resolve(fields);
        if let Ok(mut docs) = self.documents.write() {
            docs.insert(path, fields);
        }
    }

    /// Fields of a stored document, bypassing rules.
    #[must_use]
    pub fn fields(&self, path: &DocumentPath) -> Option<Fields> {
        self.documents
            .read()
            .ok()
            .and_then(|docs| docs.get(path).cloned())
    }

    #[must_use]
    pub fn contains(&self, path: &DocumentPath) -> bool {
        self.fields(path).is_some()
    }

    fn check_read(&self, collection: &CollectionPath) -> Result<(), RepositoryError> {
        let denied = self
            .denied_reads
            .read()
            .is_ok_and(|denied| denied.contains(collection.name()));
        if denied {
            return Err(RepositoryError::PermissionDenied(format!(
                "read of {collection} denied"
            )));
        }
        Ok(())
    }

    fn check_write(&self, collection: &CollectionPath) -> Result<(), RepositoryError> {
        let failing = self
            .failing_writes
            .read()
            .is_ok_and(|failing| failing.contains(collection.name()));
        if failing {
            return Err(RepositoryError::Backend {
                status: 503,
                message: format!("write to {collection} unavailable"),
            });
        }
        Ok(())
    }

    fn resolve(&self, fields: Fields) -> Fields {
        let now = self.clock.now();
        fields
            .into_iter()
            .map(|(k, v)| (k, resolve_value(v, now)))
            .collect()
    }

    fn read_docs(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<DocumentPath, Fields>>, RepositoryError>
    {
        self.documents
            .read()
            .map_err(|_| RepositoryError::Backend {
                status: 500,
                message: "store lock poisoned".to_owned(),
            })
    }

    fn write_docs(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<DocumentPath, Fields>>, RepositoryError>
    {
        self.documents
            .write()
            .map_err(|_| RepositoryError::Backend {
                status: 500,
                message: "store lock poisoned".to_owned(),
            })
    }
}

fn resolve_value(value: Value, now: chrono::DateTime<chrono::Utc>) -> Value {
    match value {
        Value::ServerTimestamp => Value::Timestamp(now),
        Value::Array(values) => Value::Array(
            values
                .into_iter()
                .map(|v| resolve_value(v, now))
                .collect(),
        ),
        Value::Map(fields) => Value::Map(
            fields
                .into_iter()
                .map(|(k, v)| (k, resolve_value(v, now)))
                .collect(),
        ),
        other => other,
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, RepositoryError> {
        self.check_read(&path.parent())?;
        let docs = self.read_docs()?;
        Ok(docs.get(path).map(|fields| Document {
            path: path.clone(),
            fields: fields.clone(),
        }))
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, RepositoryError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_read(collection)?;
        let docs = self.read_docs()?;
        Ok(docs
            .iter()
            .filter(|(path, _)| path.parent() == *collection)
            .map(|(path, fields)| Document {
                path: path.clone(),
                fields: fields.clone(),
            })
            .collect())
    }

    async fn query(
        &self,
        collection: &CollectionPath,
        query: &Query,
    ) -> Result<Vec<Document>, RepositoryError> {
        self.check_read(collection)?;
        let docs = self.read_docs()?;

        let mut matched: Vec<Document> = docs
            .iter()
            .filter(|(path, _)| path.parent() == *collection)
            .filter(|(_, fields)| {
                query
                    .filter
                    .as_ref()
                    .is_none_or(|(field, wanted)| fields.get(field) == Some(wanted))
            })
            .filter(|(_, fields)| {
                query
                    .order_by_desc
                    .as_ref()
                    .is_none_or(|field| fields.contains_key(field))
            })
            .map(|(path, fields)| Document {
                path: path.clone(),
                fields: fields.clone(),
            })
            .collect();

        if let Some(field) = &query.order_by_desc {
            matched.sort_by(|a, b| match (b.fields.get(field), a.fields.get(field)) {
                (Some(x), Some(y)) => x.order(y),
                _ => std::cmp::Ordering::Equal,
            });
        }
        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }

        debug!(collection = %collection, results = matched.len(), "In-memory query");
        Ok(matched)
    }

    async fn set(
        &self,
        path: &DocumentPath,
        fields: Fields,
        mode: SetMode,
    ) -> Result<(), RepositoryError> {
        self.check_write(&path.parent())?;
        let fields = self.resolve(fields);
        let mut docs = self.write_docs()?;
        match mode {
            SetMode::Overwrite => {
                docs.insert(path.clone(), fields);
            }
            SetMode::Merge => {
                docs.entry(path.clone()).or_default().extend(fields);
            }
        }
        Ok(())
    }

    async fn update(&self, path: &DocumentPath, fields: Fields) -> Result<(), RepositoryError> {
        self.check_write(&path.parent())?;
        let fields = self.resolve(fields);
        let mut docs = self.write_docs()?;
        let existing = docs
            .get_mut(path)
            .ok_or_else(|| RepositoryError::NotFound(path.to_string()))?;
        existing.extend(fields);
        Ok(())
    }

    async fn add(
        &self,
        collection: &CollectionPath,
        fields: Fields,
    ) -> Result<String, RepositoryError> {
        self.check_write(collection)?;
        let id = uuid::Uuid::new_v4().simple().to_string();
        let path = collection.doc(&id)?;
        let fields = self.resolve(fields);
        self.write_docs()?.insert(path, fields);
        Ok(id)
    }

    async fn delete(&self, path: &DocumentPath) -> Result<(), RepositoryError> {
        self.check_write(&path.parent())?;
        self.write_docs()?.remove(path);
        Ok(())
    }

    async fn array_remove(
        &self,
        path: &DocumentPath,
        field: &str,
        values: Vec<Value>,
    ) -> Result<(), RepositoryError> {
        self.check_write(&path.parent())?;
        let mut docs = self.write_docs()?;
        let existing = docs
            .get_mut(path)
            .ok_or_else(|| RepositoryError::NotFound(path.to_string()))?;

        let remaining = match existing.remove(field) {
            Some(Value::Array(current)) => current
                .into_iter()
                .filter(|v| !values.contains(v))
                .collect(),
            _ => Vec::new(),
        };
        existing.insert(field.to_owned(), Value::Array(remaining));
        Ok(())
    }
}
