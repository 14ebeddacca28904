use super::models::{Document, DocumentPage};
use super::types::Reference;
use super::{FirestoreClient, FirestoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;

fn join(parent: &str, child: &str) -> String {
    format!(
        "{}/{}",
        parent.trim_matches('/'),
        child.trim_matches('/')
    )
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// A reference to a document.
#[derive(Clone)]
pub struct DocumentReference<'a> {
    client: &'a FirestoreClient,
    path: String,
}

impl<'a> DocumentReference<'a> {
    pub(crate) fn new(client: &'a FirestoreClient, path: &str) -> Self {
        Self {
            client,
            path: path.trim_matches('/').to_string(),
        }
    }

    pub fn id(&self) -> &str {
        last_segment(&self.path)
    }

    /// Path relative to the database root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The reference value pointing at this document.
    pub fn reference(&self) -> Reference {
        self.client.reference(&self.path)
    }

    /// A subcollection of this document.
    pub fn collection(&self, collection_id: &str) -> CollectionReference<'a> {
        CollectionReference::new(self.client, &join(&self.path, collection_id))
    }

    /// Reads the document, returning `None` when it does not exist.
    pub async fn get<T: DeserializeOwned>(&self) -> Result<Option<Document<T>>, FirestoreError> {
        match self.client.get_document(&self.path).await {
            Ok(document) => Ok(Some(document)),
            Err(FirestoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Replaces the stored document with `value`, creating it if missing.
    pub async fn set<T>(&self, value: &T) -> Result<Document<T>, FirestoreError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.client.update_document(&self.path, value, None).await
    }

    /// Overwrites only the fields named by `update_mask`.
    pub async fn update<T>(
        &self,
        value: &T,
        update_mask: &[&str],
    ) -> Result<Document<T>, FirestoreError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.client
            .update_document(&self.path, value, Some(update_mask))
            .await
    }

    pub async fn delete(&self) -> Result<(), FirestoreError> {
        self.client.delete_document(&self.path).await
    }
}

/// A reference to a collection.
#[derive(Clone)]
pub struct CollectionReference<'a> {
    client: &'a FirestoreClient,
    path: String,
}

impl<'a> CollectionReference<'a> {
    pub(crate) fn new(client: &'a FirestoreClient, path: &str) -> Self {
        Self {
            client,
            path: path.trim_matches('/').to_string(),
        }
    }

    pub fn id(&self) -> &str {
        last_segment(&self.path)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn doc(&self, document_id: &str) -> DocumentReference<'a> {
        DocumentReference::new(self.client, &join(&self.path, document_id))
    }

    /// Adds a document with a server-assigned id.
    pub async fn add<T>(&self, value: &T) -> Result<Document<T>, FirestoreError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.client.create_document(&self.path, None, value).await
    }

    /// Adds a document with the given id. Fails if it already exists.
    pub async fn add_with_id<T>(
        &self,
        document_id: &str,
        value: &T,
    ) -> Result<Document<T>, FirestoreError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.client
            .create_document(&self.path, Some(document_id), value)
            .await
    }

    pub async fn list_documents<T: DeserializeOwned>(
        &self,
    ) -> Result<Vec<Document<T>>, FirestoreError> {
        self.client.list_documents(&self.path).await
    }

    pub async fn list_documents_page<T: DeserializeOwned>(
        &self,
        page_size: Option<u32>,
        page_token: Option<&str>,
    ) -> Result<DocumentPage<T>, FirestoreError> {
        self.client
            .list_documents_page(&self.path, page_size, page_token)
            .await
    }
}
