//! Report repository (`reportes`).

use zona_gamer_core::ReportId;

use super::{CollectionPath, DocumentStore, Fields, Query, RepositoryError, decode};
use crate::models::Report;

const REPORTS_COLLECTION: &str = "reportes";

/// Repository for the message generation audit log.
pub struct ReportRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> ReportRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    fn collection() -> Result<CollectionPath, RepositoryError> {
        CollectionPath::root(REPORTS_COLLECTION)
    }

    /// Append a report and return its generated id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the write fails.
    pub async fn add(&self, fields: Fields) -> Result<ReportId, RepositoryError> {
        self.store
            .add(&Self::collection()?, fields)
            .await
            .map(ReportId::new)
    }

    /// Replace the given fields of an existing report.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the report does not exist.
    pub async fn update(&self, id: &ReportId, fields: Fields) -> Result<(), RepositoryError> {
        self.store
            .update(&Self::collection()?.doc(id.as_str())?, fields)
            .await
    }

    /// Run a query over the reports.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    pub async fn query(&self, query: &Query) -> Result<Vec<Report>, RepositoryError> {
        let documents = self.store.query(&Self::collection()?, query).await?;
        documents
            .into_iter()
            .map(|doc| {
                let mut report: Report = decode(&doc.fields)?;
                report.id = ReportId::new(doc.id());
                Ok(report)
            })
            .collect()
    }
}
