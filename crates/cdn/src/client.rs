//! HTTP client for the CDN upload endpoint.
//!
//! `POST {base_url}/cdn/upload?resource={tag}` with a multipart body holding
//! one `file` part. The CDN answers `{"message": ..., "data": <url>, "ts": ...}`.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use roster_core::attachment::{UploadError, UploadPort};
use roster_core::profile::ImageContent;

use crate::config::CdnConfig;

/// Body returned by the CDN upload endpoint.
#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub message: Option<String>,
    /// URL of the stored object.
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub ts: Option<serde_json::Value>,
}

/// Errors from the CDN client.
#[derive(Debug, thiserror::Error)]
pub enum CdnError {
    /// Invalid or missing configuration.
    #[error("CDN configuration error: {0}")]
    Config(String),

    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The CDN returned a non-2xx status code.
    #[error("CDN API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The CDN accepted the upload but returned no URL.
    #[error("Upload failed, no URL returned")]
    MissingUrl,
}

impl From<CdnError> for UploadError {
    fn from(err: CdnError) -> Self {
        match err {
            CdnError::ApiError { status, body } => UploadError::Rejected { status, body },
            CdnError::MissingUrl => UploadError::MissingUrl,
            other => UploadError::Transport(other.to_string()),
        }
    }
}

/// HTTP client for a single CDN.
#[derive(Clone)]
pub struct CdnClient {
    client: reqwest::Client,
    base_url: String,
}

impl CdnClient {
    /// Build a client honouring the configured request timeout.
    pub fn new(config: &CdnConfig) -> Result<Self, CdnError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self::with_client(client, config.base_url.clone()))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Upload one file under the `resource` tag and return its URL.
    ///
    /// The original file name and content type are forwarded. A file without
    /// a name is sent under a random one so the CDN can still store it.
    pub async fn upload_file(
        &self,
        content: &ImageContent,
        resource: &str,
    ) -> Result<String, CdnError> {
        let file_name = if content.file_name.trim().is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            content.file_name.clone()
        };

        let part = Part::bytes(content.bytes.clone())
            .file_name(file_name)
            .mime_str(&content.content_type)?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/cdn/upload", self.base_url))
            .query(&[("resource", resource)])
            .multipart(form)
            .send()
            .await?;

        let body: UploadResponse = Self::ensure_success(response).await?.json().await?;
        match body.data {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(CdnError::MissingUrl),
        }
    }

    // ---- private helpers ----

    /// Return the response unchanged on success, or an
    /// [`CdnError::ApiError`] carrying the status and body text.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, CdnError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(CdnError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl UploadPort for CdnClient {
    async fn upload(&self, content: &ImageContent, resource: &str) -> Result<String, UploadError> {
        let url = self.upload_file(content, resource).await?;
        tracing::debug!(%url, resource, file_name = %content.file_name, "Stored file on CDN");
        Ok(url)
    }
}
