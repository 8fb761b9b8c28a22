//! Remote document store access.
//!
//! # Collections
//!
//! ```text
//! games/{platform}/juegos/{itemId}                  game documents
//! games/{platform}/juegos/{itemId}/correos/{email}  email accounts of a game
//! combos/{platform}/combos/{itemId}                 combo documents
//! combos/{platform}/combos/{itemId}/correos/{email} email accounts of a combo
//! reportes/{id}                                     message generation audit log
//! users/{uid}                                       user roles
//! ```
//!
//! Field names are written exactly as the web client writes them, so both
//! clients can share the same project.
//!
//! # Layout
//!
//! - [`DocumentStore`] is the seam every repository talks to.
//! - [`FirestoreClient`] implements it over the Firestore REST API.
//! - [`InMemoryStore`] implements it in memory for tests and offline use.
//! - The repositories ([`ItemRepository`], [`EmailAccountRepository`],
//!   [`ReportRepository`], [`UserRepository`]) own the paths and payloads of
//!   one collection family each.

pub mod email_accounts;
pub mod firestore;
pub mod items;
pub mod memory;
pub mod reports;
pub mod sparse;
pub mod users;
pub mod value;

use core::fmt;

use async_trait::async_trait;
use thiserror::Error;

pub use email_accounts::EmailAccountRepository;
pub use firestore::FirestoreClient;
pub use items::ItemRepository;
pub use memory::InMemoryStore;
pub use reports::ReportRepository;
pub use sparse::sparse;
pub use users::UserRepository;
pub use value::{Fields, Value, decode, encode};

/// Errors that can occur while talking to the document store.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Security rules rejected the call (for example an anonymous read of
    /// email accounts).
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The document does not exist.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The HTTP request could not be completed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with an error status.
    #[error("backend error: {status} - {message}")]
    Backend { status: u16, message: String },

    /// A document could not be converted to or from a model.
    #[error("decode error: {0}")]
    Decode(String),

    /// A path segment is empty or contains `/`.
    #[error("invalid document path: {0}")]
    InvalidPath(String),
}

impl RepositoryError {
    /// Whether this is an expected security-rule denial.
    #[must_use]
    pub const fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

fn validate_segment(segment: &str) -> Result<(), RepositoryError> {
    if segment.is_empty() || segment.contains('/') {
        return Err(RepositoryError::InvalidPath(format!(
            "invalid segment {segment:?}"
        )));
    }
    Ok(())
}

/// Path to a collection: an odd number of segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    segments: Vec<String>,
}

impl CollectionPath {
    /// A top-level collection.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidPath` if `name` is empty or contains `/`.
    pub fn root(name: &str) -> Result<Self, RepositoryError> {
        validate_segment(name)?;
        Ok(Self {
            segments: vec![name.to_owned()],
        })
    }

    /// Document `id` inside this collection.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidPath` if `id` is empty or contains `/`.
    pub fn doc(&self, id: &str) -> Result<DocumentPath, RepositoryError> {
        validate_segment(id)?;
        let mut segments = self.segments.clone();
        segments.push(id.to_owned());
        Ok(DocumentPath { segments })
    }

    /// The collection's own name (last segment).
    #[must_use]
    pub fn name(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// Document that owns this collection, `None` for top-level collections.
    #[must_use]
    pub fn parent(&self) -> Option<DocumentPath> {
        self.segments
            .split_last()
            .filter(|(_, rest)| !rest.is_empty())
            .map(|(_, rest)| DocumentPath {
                segments: rest.to_vec(),
            })
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Path to a document: an even number of segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath {
    segments: Vec<String>,
}

impl DocumentPath {
    /// Parse a slash-separated document path such as `users/abc`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidPath` if the path has an odd number of
    /// segments or an empty segment.
    pub fn parse(path: &str) -> Result<Self, RepositoryError> {
        let segments: Vec<String> = path.split('/').map(str::to_owned).collect();
        if segments.len() % 2 != 0 {
            return Err(RepositoryError::InvalidPath(format!(
                "{path} does not name a document"
            )));
        }
        for segment in &segments {
            validate_segment(segment)?;
        }
        Ok(Self { segments })
    }

    /// Sub-collection `name` below this document.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidPath` if `name` is empty or contains `/`.
    pub fn collection(&self, name: &str) -> Result<CollectionPath, RepositoryError> {
        validate_segment(name)?;
        let mut segments = self.segments.clone();
        segments.push(name.to_owned());
        Ok(CollectionPath { segments })
    }

    /// The document id (last segment).
    #[must_use]
    pub fn id(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// Collection containing this document.
    #[must_use]
    pub fn parent(&self) -> CollectionPath {
        CollectionPath {
            segments: self
                .segments
                .split_last()
                .map_or_else(Vec::new, |(_, rest)| rest.to_vec()),
        }
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// A document read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: DocumentPath,
    pub fields: Fields,
}

impl Document {
    #[must_use]
    pub fn id(&self) -> &str {
        self.path.id()
    }
}

/// How `set` treats fields already on the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    /// Replace the whole document.
    Overwrite,
    /// Replace only the given top-level fields, creating the document if
    /// needed.
    Merge,
}

/// A single-collection query: one equality filter, one descending order, a
/// limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Option<(String, Value)>,
    pub order_by_desc: Option<String>,
    pub limit: Option<usize>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filter = Some((field.to_owned(), value.into()));
        self
    }

    #[must_use]
    pub fn order_by_desc(mut self, field: &str) -> Self {
        self.order_by_desc = Some(field.to_owned());
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Remote document database.
///
/// Implementations resolve [`Value::ServerTimestamp`] to the commit time.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document, `None` if it does not exist.
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, RepositoryError>;

    /// Read every document of a collection.
    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, RepositoryError>;

    /// Run a filtered, ordered, limited query over one collection.
    async fn query(
        &self,
        collection: &CollectionPath,
        query: &Query,
    ) -> Result<Vec<Document>, RepositoryError>;

    /// Create or replace a document.
    async fn set(
        &self,
        path: &DocumentPath,
        fields: Fields,
        mode: SetMode,
    ) -> Result<(), RepositoryError>;

    /// Replace the given top-level fields of an existing document.
    ///
    /// Fails with `RepositoryError::NotFound` if the document is absent.
    async fn update(&self, path: &DocumentPath, fields: Fields) -> Result<(), RepositoryError>;

    /// Create a document with a generated id and return the id.
    async fn add(
        &self,
        collection: &CollectionPath,
        fields: Fields,
    ) -> Result<String, RepositoryError>;

    /// Delete a document. Sub-collections are not touched.
    async fn delete(&self, path: &DocumentPath) -> Result<(), RepositoryError>;

    /// Remove every occurrence of `values` from the array `field`.
    async fn array_remove(
        &self,
        path: &DocumentPath,
        field: &str,
        values: Vec<Value>,
    ) -> Result<(), RepositoryError>;
}
