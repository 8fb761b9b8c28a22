//! Firestore REST client.
//!
//! Uses `reqwest` 0.13 against the v1 REST surface:
//!
//! - reads: `GET .../documents/{path}` and paginated collection listing
//! - queries: `POST .../{parent}:runQuery` with a structured query
//! - writes: `POST .../documents:commit` with one write per call, so update
//!   masks, preconditions and server-side transforms apply atomically
//!
//! Every request carries the project API key; when a user is signed in the
//! shared [`SessionToken`] is sent as a bearer token so security rules see
//! the caller.

mod codec;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, instrument};
use url::Url;

use crate::config::FirebaseConfig;
use crate::models::session::SessionToken;

use super::{
    CollectionPath, Document, DocumentPath, DocumentStore, Fields, Query, RepositoryError,
    SetMode, Value,
};
use codec::{
    RawDocument, decode_document, encode_fields, encode_value, quote_field,
    split_server_timestamps,
};

/// Page size used when listing a collection.
const LIST_PAGE_SIZE: &str = "300";

// =============================================================================
// FirestoreClient
// =============================================================================

/// Client for the Firestore REST API.
#[derive(Clone)]
pub struct FirestoreClient {
    inner: Arc<FirestoreClientInner>,
}

struct FirestoreClientInner {
    client: reqwest::Client,
    base_url: Url,
    project_id: String,
    database: String,
    api_key: SecretString,
    token: SessionToken,
}

impl std::fmt::Debug for FirestoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("project_id", &self.inner.project_id)
            .field("database", &self.inner.database)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunQueryResponse {
    document: Option<RawDocument>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl FirestoreClient {
    /// Create a client for the configured project.
    #[must_use]
    pub fn new(config: &FirebaseConfig, token: SessionToken) -> Self {
        Self {
            inner: Arc::new(FirestoreClientInner {
                client: reqwest::Client::new(),
                base_url: config.firestore_base_url.clone(),
                project_id: config.project_id.clone(),
                database: config.database.clone(),
                api_key: config.api_key.clone(),
                token,
            }),
        }
    }

    /// `projects/{p}/databases/{d}/documents`
    fn root_name(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.inner.project_id, self.inner.database
        )
    }

    fn document_name(&self, path: &DocumentPath) -> String {
        format!("{}/{path}", self.root_name())
    }

    /// Endpoint for `segments` below the documents root.
    ///
    /// `suffix` (for example `:runQuery`) is appended to the last segment.
    fn endpoint(&self, segments: &[String], suffix: Option<&str>) -> Result<Url, RepositoryError> {
        let mut parts: Vec<String> = vec![
            "projects".to_owned(),
            self.inner.project_id.clone(),
            "databases".to_owned(),
            self.inner.database.clone(),
            "documents".to_owned(),
        ];
        parts.extend(segments.iter().cloned());
        if let (Some(suffix), Some(last)) = (suffix, parts.last_mut()) {
            last.push_str(suffix);
        }

        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                RepositoryError::InvalidPath(format!(
                    "base url {} cannot hold a path",
                    self.inner.base_url
                ))
            })?
            .pop_if_empty()
            .extend(&parts);
        url.query_pairs_mut()
            .append_pair("key", self.inner.api_key.expose_secret());
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.inner.client.request(method, url);
        match self.inner.token.get() {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    async fn commit(&self, write: serde_json::Value) -> Result<(), RepositoryError> {
        let url = self.endpoint(&[], Some(":commit"))?;
        let response = self
            .request(Method::POST, url)
            .json(&json!({ "writes": [write] }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

/// Turn a non-success response into a `RepositoryError`, logging it.
async fn check(response: Response) -> Result<Response, RepositoryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body).map_or_else(
        |_| body.chars().take(200).collect::<String>(),
        |envelope| envelope.error.message,
    );

    let err = match status {
        StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
            RepositoryError::PermissionDenied(message)
        }
        StatusCode::NOT_FOUND => RepositoryError::NotFound(message),
        _ => RepositoryError::Backend {
            status: status.as_u16(),
            message,
        },
    };

    if err.is_permission_denied() {
        debug!(status = %status, error = %err, "Firestore denied the request");
    } else {
        error!(status = %status, error = %err, "Firestore returned non-success status");
    }
    Err(err)
}

/// An `update` write: replaces `fields`, restricted to `mask` when given.
fn update_write(
    name: String,
    fields: Fields,
    mask: bool,
    exists: Option<bool>,
) -> serde_json::Value {
    let (fields, transforms) = split_server_timestamps(fields);

    let mut write = serde_json::Map::new();
    if mask {
        let paths: Vec<String> = fields.keys().map(|k| quote_field(k)).collect();
        write.insert("updateMask".into(), json!({ "fieldPaths": paths }));
    }
    write.insert(
        "update".into(),
        json!({ "name": name, "fields": encode_fields(&fields) }),
    );
    if !transforms.is_empty() {
        let transforms: Vec<_> = transforms
            .into_iter()
            .map(|path| json!({ "fieldPath": path, "setToServerValue": "REQUEST_TIME" }))
            .collect();
        write.insert("updateTransforms".into(), serde_json::Value::Array(transforms));
    }
    if let Some(exists) = exists {
        write.insert("currentDocument".into(), json!({ "exists": exists }));
    }
    serde_json::Value::Object(write)
}

fn structured_query(collection: &CollectionPath, query: &Query) -> serde_json::Value {
    let mut structured = serde_json::Map::new();
    structured.insert(
        "from".into(),
        json!([{ "collectionId": collection.name() }]),
    );
    if let Some((field, value)) = &query.filter {
        structured.insert(
            "where".into(),
            json!({
                "fieldFilter": {
                    "field": { "fieldPath": quote_field(field) },
                    "op": "EQUAL",
                    "value": encode_value(value),
                }
            }),
        );
    }
    if let Some(field) = &query.order_by_desc {
        structured.insert(
            "orderBy".into(),
            json!([{ "field": { "fieldPath": quote_field(field) }, "direction": "DESCENDING" }]),
        );
    }
    if let Some(limit) = query.limit {
        structured.insert("limit".into(), json!(limit));
    }
    json!({ "structuredQuery": structured })
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    #[instrument(skip(self), fields(path = %path))]
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, RepositoryError> {
        let url = self.endpoint(path.segments(), None)?;
        let response = self.request(Method::GET, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let raw: RawDocument = check(response).await?.json().await?;
        decode_document(&raw).map(Some)
    }

    #[instrument(skip(self), fields(collection = %collection))]
    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, RepositoryError> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.endpoint(collection.segments(), None)?;
            {
                let mut pairs = url.query_pairs_mut();
                pairs.append_pair("pageSize", LIST_PAGE_SIZE);
                if let Some(token) = &page_token {
                    pairs.append_pair("pageToken", token);
                }
            }

            let response = self.request(Method::GET, url).send().await?;
            let page: ListResponse = check(response).await?.json().await?;
            for raw in &page.documents {
                documents.push(decode_document(raw)?);
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = documents.len(), "Listed collection");
        Ok(documents)
    }

    #[instrument(skip(self, query), fields(collection = %collection))]
    async fn query(
        &self,
        collection: &CollectionPath,
        query: &Query,
    ) -> Result<Vec<Document>, RepositoryError> {
        let parent = collection
            .parent()
            .map(|doc| doc.segments().to_vec())
            .unwrap_or_default();
        let url = self.endpoint(&parent, Some(":runQuery"))?;

        let response = self
            .request(Method::POST, url)
            .json(&structured_query(collection, query))
            .send()
            .await?;
        let rows: Vec<RunQueryResponse> = check(response).await?.json().await?;

        rows.iter()
            .filter_map(|row| row.document.as_ref())
            .map(decode_document)
            .collect()
    }

    #[instrument(skip(self, fields), fields(path = %path, mode = ?mode))]
    async fn set(
        &self,
        path: &DocumentPath,
        fields: Fields,
        mode: SetMode,
    ) -> Result<(), RepositoryError> {
        let write = update_write(
            self.document_name(path),
            fields,
            mode == SetMode::Merge,
            None,
        );
        self.commit(write).await
    }

    #[instrument(skip(self, fields), fields(path = %path))]
    async fn update(&self, path: &DocumentPath, fields: Fields) -> Result<(), RepositoryError> {
        let write = update_write(self.document_name(path), fields, true, Some(true));
        self.commit(write).await
    }

    #[instrument(skip(self, fields), fields(collection = %collection))]
    async fn add(
        &self,
        collection: &CollectionPath,
        fields: Fields,
    ) -> Result<String, RepositoryError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let path = collection.doc(&id)?;
        let write = update_write(self.document_name(&path), fields, false, Some(false));
        self.commit(write).await?;
        Ok(id)
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn delete(&self, path: &DocumentPath) -> Result<(), RepositoryError> {
        let url = self.endpoint(path.segments(), None)?;
        let response = self.request(Method::DELETE, url).send().await?;
        check(response).await?;
        Ok(())
    }

    #[instrument(skip(self, values), fields(path = %path, field = %field))]
    async fn array_remove(
        &self,
        path: &DocumentPath,
        field: &str,
        values: Vec<Value>,
    ) -> Result<(), RepositoryError> {
        let values: Vec<_> = values.iter().map(encode_value).collect();
        let write = json!({
            "transform": {
                "document": self.document_name(path),
                "fieldTransforms": [{
                    "fieldPath": quote_field(field),
                    "removeAllFromArray": { "values": values },
                }],
            },
            "currentDocument": { "exists": true },
        });
        self.commit(write).await
    }
}
