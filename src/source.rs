//! Region data sources.
//!
//! A [`RegionSource`] supplies the two kinds of upstream data the pipeline
//! consumes: boundary documents (GeoJSON) and precomputed model blobs. The
//! trait exists for dependency injection; production code uses
//! [`HttpRegionSource`], tools and tests use [`FileRegionSource`] or an
//! in-memory fake.

use crate::geojson::RegionDocument;
use std::future::Future;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from fetching region data.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SourceError {
    /// Transport failed
    #[error("request failed: {0}")]
    Http(String),

    /// The source has no data for the code
    #[error("no data for region {0}")]
    NotFound(String),

    /// The payload was not a usable boundary document
    #[error("invalid region document: {0}")]
    InvalidDocument(String),
}

/// Async supplier of region boundary documents and model blobs.
pub trait RegionSource: Send + Sync {
    /// Fetch and parse the boundary document for a region code.
    fn fetch_region(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<RegionDocument, SourceError>> + Send;

    /// Fetch the raw precomputed model blob for a region code.
    fn fetch_model(&self, code: &str) -> impl Future<Output = Result<Vec<u8>, SourceError>> + Send;

    /// Source name for logging.
    fn name(&self) -> &str;
}

const DEFAULT_USER_AGENT: &str = concat!("globemesh/", env!("CARGO_PKG_VERSION"));

/// HTTP-backed region source using convention-based paths under a base URL:
/// `{base}/country/{CODE}.json` for documents, `{base}/data/{CODE}.mesh` for
/// model blobs.
#[derive(Clone)]
pub struct HttpRegionSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRegionSource {
    pub fn new(base_url: &str) -> Result<Self, SourceError> {
        Self::with_timeout(base_url, std::time::Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: &str, timeout: std::time::Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .map_err(|e| SourceError::Http(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_bytes(&self, url: &str, code: &str) -> Result<Vec<u8>, SourceError> {
        debug!(url, "fetching region data");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Http(format!("request failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(code.to_string()));
        }
        if !response.status().is_success() {
            return Err(SourceError::Http(format!(
                "HTTP {} from {url}",
                response.status()
            )));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| SourceError::Http(format!("failed to read response: {e}")))
    }
}

impl RegionSource for HttpRegionSource {
    async fn fetch_region(&self, code: &str) -> Result<RegionDocument, SourceError> {
        let code = code.to_ascii_uppercase();
        let url = format!("{}/country/{code}.json", self.base_url);
        let bytes = self.get_bytes(&url, &code).await?;
        RegionDocument::from_slice(&bytes).map_err(|e| {
            warn!(code, error = %e, "region document failed to parse");
            SourceError::InvalidDocument(e.to_string())
        })
    }

    async fn fetch_model(&self, code: &str) -> Result<Vec<u8>, SourceError> {
        let code = code.to_ascii_uppercase();
        let url = format!("{}/data/{code}.mesh", self.base_url);
        self.get_bytes(&url, &code).await
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Directory-backed region source with the same layout as
/// [`HttpRegionSource`]: `country/{CODE}.json` and `data/{CODE}.mesh` under
/// a root directory.
#[derive(Clone)]
pub struct FileRegionSource {
    root: PathBuf,
}

impl FileRegionSource {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    async fn read_file(&self, relative: &str, code: &str) -> Result<Vec<u8>, SourceError> {
        let path = self.root.join(relative);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SourceError::NotFound(code.to_string()))
            }
            Err(e) => Err(SourceError::Http(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }
}

impl RegionSource for FileRegionSource {
    async fn fetch_region(&self, code: &str) -> Result<RegionDocument, SourceError> {
        let code = code.to_ascii_uppercase();
        let bytes = self.read_file(&format!("country/{code}.json"), &code).await?;
        RegionDocument::from_slice(&bytes).map_err(|e| SourceError::InvalidDocument(e.to_string()))
    }

    async fn fetch_model(&self, code: &str) -> Result<Vec<u8>, SourceError> {
        let code = code.to_ascii_uppercase();
        self.read_file(&format!("data/{code}.mesh"), &code).await
    }

    fn name(&self) -> &str {
        "file"
    }
}
