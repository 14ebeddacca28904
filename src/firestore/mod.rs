//! Cloud Firestore REST client.
//!
//! Documents are addressed by their path relative to the database root (`users/alice`,
//! `users/alice/posts/1`). Models are any `Serialize`/`DeserializeOwned` type; the
//! [`codec`] maps them to and from the typed wire values.

pub mod codec;
pub mod models;
pub mod reference;
pub mod types;


use self::codec::{to_fields, DecodeError, EncodeError, FieldMask};
use self::models::{Document, DocumentPage, Fields, ListDocumentsResponse};
use self::reference::{CollectionReference, DocumentReference};
use self::types::Reference;
use crate::auth::{AuthError, TokenProvider};
use crate::config::FirestoreConfig;
use crate::core::{build_client, parse_error_response};
use reqwest::{header, StatusCode};
use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::RetryError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

const FIRESTORE_V1_API: &str =
    "https://firestore.googleapis.com/v1/projects/{project_id}/databases/(default)/documents";

/// Errors that can occur during Firestore operations.
#[derive(Error, Debug)]
pub enum FirestoreError {
    /// No bearer token could be obtained.
    #[error("Authentication failed: {0}")]
    Authentication(#[from] AuthError),
    /// Wrapper for `reqwest::Error`.
    #[error("HTTP Request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    /// A middleware failed for a reason other than authentication.
    #[error("Middleware error: {0}")]
    MiddlewareError(anyhow::Error),
    /// Errors returned by the Firestore API.
    #[error("API error: {0}")]
    ApiError(String),
    /// The document does not exist.
    #[error("Document not found: {0}")]
    NotFound(String),
    /// The path or arguments cannot form a request.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),
    /// Wrapper for `serde_json::Error`.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<reqwest_middleware::Error> for FirestoreError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(err) => FirestoreError::RequestError(err),
            reqwest_middleware::Error::Middleware(err) => {
                // The retry layer wraps whatever the inner middleware returned
                let err = match err.downcast::<RetryError>() {
                    Ok(RetryError::WithRetries { err, .. }) | Ok(RetryError::Error(err)) => {
                        return err.into()
                    }
                    Err(err) => err,
                };

                let auth = err
                    .chain()
                    .find_map(|cause| cause.downcast_ref::<AuthError>())
                    .cloned();
                match auth {
                    Some(auth) => FirestoreError::Authentication(auth),
                    None => FirestoreError::MiddlewareError(err),
                }
            }
        }
    }
}

#[derive(Serialize)]
struct WriteRequest<'a> {
    fields: &'a Fields,
}

/// Client for the documents of one project's default database.
#[derive(Clone)]
pub struct FirestoreClient {
    client: ClientWithMiddleware,
    base_url: String,
    project_id: String,
    tokens: TokenProvider,
}

impl FirestoreClient {
    /// Creates a client authenticating through `tokens`.
    ///
    /// This is typically called via `FirestoreApp::firestore()`.
    pub fn new(config: &FirestoreConfig, tokens: TokenProvider) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| FIRESTORE_V1_API.replace("{project_id}", &config.project_id));

        Self::new_with_url(config, tokens, base_url)
    }

    /// Creates a client against a custom documents endpoint (emulators, tests).
    pub fn new_with_url(
        config: &FirestoreConfig,
        tokens: TokenProvider,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: build_client(tokens.clone(), config.max_retries),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            tokens,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// The bearer token requests are currently sent with.
    pub async fn token(&self) -> Result<String, FirestoreError> {
        Ok(self.tokens.token().await?)
    }

    /// A reference value pointing at `path` in this project.
    pub fn reference(&self, path: &str) -> Reference {
        Reference::new(&self.project_id, path)
    }

    /// Gets a `CollectionReference` for the collection at `collection_path`.
    pub fn collection(&self, collection_path: &str) -> CollectionReference<'_> {
        CollectionReference::new(self, collection_path)
    }

    /// Gets a `DocumentReference` for the document at `document_path`.
    pub fn doc(&self, document_path: &str) -> DocumentReference<'_> {
        DocumentReference::new(self, document_path)
    }

    /// Creates a document in the collection at `path`.
    ///
    /// The server picks the document id unless `name` is given.
    pub async fn create_document<T>(
        &self,
        path: &str,
        name: Option<&str>,
        fields: &T,
    ) -> Result<Document<T>, FirestoreError>
    where
        T: Serialize + DeserializeOwned,
    {
        let fields = to_fields(fields)?;
        let url = self.url(path, name.map(|name| ("documentId", name)))?;

        debug!(%path, ?name, "creating document");
        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&WriteRequest { fields: &fields })?)
            .send()
            .await?;

        let response = ensure_success(response, path, "Create document failed").await?;
        let document: Document = response.json().await?;
        Ok(document.decode()?)
    }

    /// Reads the document at `path`.
    pub async fn get_document<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Document<T>, FirestoreError> {
        let url = self.url(path, None)?;

        debug!(%path, "getting document");
        let response = self.client.get(url).send().await?;

        let response = ensure_success(response, path, "Get document failed").await?;
        let document: Document = response.json().await?;
        Ok(document.decode()?)
    }

    /// Lists every document in the collection at `path`, following page tokens.
    pub async fn list_documents<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Vec<Document<T>>, FirestoreError> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .list_documents_page(path, None, page_token.as_deref())
                .await?;
            documents.extend(page.documents);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(documents)
    }

    /// Lists one page of the collection at `path`.
    pub async fn list_documents_page<T: DeserializeOwned>(
        &self,
        path: &str,
        page_size: Option<u32>,
        page_token: Option<&str>,
    ) -> Result<DocumentPage<T>, FirestoreError> {
        let page_size = page_size.map(|size| size.to_string());
        let query = page_size
            .as_deref()
            .map(|size| ("pageSize", size))
            .into_iter()
            .chain(page_token.map(|token| ("pageToken", token)));
        let url = self.url(path, query)?;

        debug!(%path, ?page_token, "listing documents");
        let response = self.client.get(url).send().await?;

        let response = ensure_success(response, path, "List documents failed").await?;
        let list: ListDocumentsResponse = response.json().await?;

        let documents = list
            .documents
            .into_iter()
            .map(|document| document.decode())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DocumentPage {
            documents,
            next_page_token: list.next_page_token.filter(|token| !token.is_empty()),
        })
    }

    /// Writes `fields` to the document at `path`.
    ///
    /// Without a mask the stored document is replaced. With a mask only the named fields
    /// are sent and overwritten; other stored fields are left as they are.
    pub async fn update_document<T>(
        &self,
        path: &str,
        fields: &T,
        update_mask: Option<&[&str]>,
    ) -> Result<Document<T>, FirestoreError>
    where
        T: Serialize + DeserializeOwned,
    {
        let mask = update_mask.map(|paths| FieldMask::new(paths.iter().copied()));
        if mask.as_ref().is_some_and(FieldMask::is_empty) {
            return Err(FirestoreError::InvalidArgument(
                "update mask names no fields".to_string(),
            ));
        }

        let mut fields = to_fields(fields)?;
        if let Some(mask) = &mask {
            fields = mask.apply(&fields);
        }

        let field_paths = mask.as_ref().map(FieldMask::field_paths).unwrap_or_default();
        let query = field_paths
            .iter()
            .map(|field_path| ("updateMask.fieldPaths", field_path.as_str()));
        let url = self.url(path, query)?;

        debug!(%path, mask = ?mask.as_ref().map(FieldMask::paths), "updating document");
        let response = self
            .client
            .patch(url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&WriteRequest { fields: &fields })?)
            .send()
            .await?;

        let response = ensure_success(response, path, "Update document failed").await?;
        let document: Document = response.json().await?;
        Ok(document.decode()?)
    }

    /// Deletes the document at `path`. Deleting a missing document succeeds.
    pub async fn delete_document(&self, path: &str) -> Result<(), FirestoreError> {
        let url = self.url(path, None)?;

        debug!(%path, "deleting document");
        let response = self.client.delete(url).send().await?;

        ensure_success(response, path, "Delete document failed").await?;
        Ok(())
    }

    fn url<'a>(
        &self,
        path: &str,
        query: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Url, FirestoreError> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Err(FirestoreError::InvalidArgument(
                "document path is empty".to_string(),
            ));
        }
        if let Some(segment) = segments.iter().find(|s| **s == "." || **s == "..") {
            return Err(FirestoreError::InvalidArgument(format!(
                "invalid path segment '{}' in {}",
                segment, path
            )));
        }

        let mut url = Url::parse(&self.base_url)
            .map_err(|e| FirestoreError::InvalidArgument(format!("{}: {}", self.base_url, e)))?;

        // Each segment is percent-encoded, so ids may contain '#', '?' or '%'
        url.path_segments_mut()
            .map_err(|_| {
                FirestoreError::InvalidArgument(format!("{} cannot take a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);

        let mut query = query.into_iter().peekable();
        if query.peek().is_some() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }
}

async fn ensure_success(
    response: reqwest::Response,
    path: &str,
    default_msg: &str,
) -> Result<reqwest::Response, FirestoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::NOT_FOUND {
        debug!(%path, "document not found");
        return Err(FirestoreError::NotFound(path.trim_matches('/').to_string()));
    }

    let message = parse_error_response(response, default_msg).await;
    warn!(%path, status = status.as_u16(), %message, "firestore request failed");
    Err(FirestoreError::ApiError(message))
}
