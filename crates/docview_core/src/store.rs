use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use shared::{
    domain::DocumentId,
    error::StoreErrorBody,
    protocol::{
        CountResponse, DeleteBatchRequest, Document, MessageResponse, SearchHit, SearchRequest,
    },
};
use tracing::debug;
use url::Url;

use crate::error::StoreError;

/// A file chosen locally and held until it is uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl PendingFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    pub fn mime_type(&self) -> String {
        mime_guess::from_path(&self.filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }
}

/// Remote document store operations used by the view.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Document>, StoreError>;
    async fn upload(&self, file: PendingFile) -> Result<(), StoreError>;
    async fn delete(&self, id: &DocumentId) -> Result<(), StoreError>;
    /// Removes several documents in one request and returns the store's
    /// acknowledgement message.
    async fn delete_batch(&self, ids: &[DocumentId]) -> Result<String, StoreError>;
    async fn detail(&self, id: &DocumentId) -> Result<Document, StoreError>;
    async fn search(&self, text: &str) -> Result<Vec<SearchHit>, StoreError>;
    async fn count(&self) -> Result<u64, StoreError>;
}

pub struct HttpDocumentStore {
    http: Client,
    api_base: String,
}

impl HttpDocumentStore {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_base: api_base.into(),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let display = format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            segments.join("/")
        );
        let mut url = Url::parse(&self.api_base)
            .map_err(|err| StoreError::network(&display, format!("invalid API base: {err}")))?;
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                StoreError::network(&display, "API base cannot carry a path")
            })?;
            // Segments are percent-encoded, so opaque ids cannot escape the route.
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn send(&self, endpoint: &Url, request: RequestBuilder) -> Result<Vec<u8>, StoreError> {
        debug!(endpoint = %endpoint, "dispatching store request");
        let response = request
            .send()
            .await
            .map_err(|err| StoreError::network(endpoint.as_str(), err))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| StoreError::network(endpoint.as_str(), err))?;

        if !status.is_success() {
            return Err(StoreError::NonSuccessStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                detail: StoreErrorBody::parse(&body).map(|body| body.detail),
            });
        }
        Ok(body.to_vec())
    }

    fn decode<T: DeserializeOwned>(endpoint: &Url, body: &[u8]) -> Result<T, StoreError> {
        serde_json::from_slice(body).map_err(|source| StoreError::MalformedPayload {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn list(&self) -> Result<Vec<Document>, StoreError> {
        let endpoint = self.endpoint(&["list"])?;
        let body = self
            .send(&endpoint, self.http.get(endpoint.clone()))
            .await?;
        Self::decode(&endpoint, &body)
    }

    async fn upload(&self, file: PendingFile) -> Result<(), StoreError> {
        let endpoint = self.endpoint(&["upload"])?;
        let mime_type = file.mime_type();
        let part = multipart::Part::bytes(file.bytes)
            .file_name(file.filename)
            .mime_str(&mime_type)
            .map_err(|err| StoreError::network(endpoint.as_str(), err))?;
        let form = multipart::Form::new().part("file", part);

        self.send(&endpoint, self.http.post(endpoint.clone()).multipart(form))
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &DocumentId) -> Result<(), StoreError> {
        let endpoint = self.endpoint(&["delete", id.as_str()])?;
        self.send(&endpoint, self.http.delete(endpoint.clone()))
            .await?;
        Ok(())
    }

    async fn delete_batch(&self, ids: &[DocumentId]) -> Result<String, StoreError> {
        let endpoint = self.endpoint(&["delete-batch"])?;
        let request = self.http.delete(endpoint.clone()).json(&DeleteBatchRequest {
            ids: ids.to_vec(),
        });
        let body = self.send(&endpoint, request).await?;
        let response: MessageResponse = Self::decode(&endpoint, &body)?;
        Ok(response.message)
    }

    async fn detail(&self, id: &DocumentId) -> Result<Document, StoreError> {
        let endpoint = self.endpoint(&["detail", id.as_str()])?;
        let body = self
            .send(&endpoint, self.http.get(endpoint.clone()))
            .await?;
        Self::decode(&endpoint, &body)
    }

    async fn search(&self, text: &str) -> Result<Vec<SearchHit>, StoreError> {
        let endpoint = self.endpoint(&["search"])?;
        let request = self.http.post(endpoint.clone()).json(&SearchRequest {
            text: text.to_string(),
        });
        let body = self.send(&endpoint, request).await?;
        Self::decode(&endpoint, &body)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let endpoint = self.endpoint(&["count"])?;
        let body = self
            .send(&endpoint, self.http.get(endpoint.clone()))
            .await?;
        let response: CountResponse = Self::decode(&endpoint, &body)?;
        Ok(response.count)
    }
}
