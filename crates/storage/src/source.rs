//! Where dataset payloads come from.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use climate_common::{ClimateError, ClimateResult};
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};

/// Byte-level access to a dataset, addressed by layout-relative paths.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Human-readable location, for logs.
    fn describe(&self) -> String;

    /// Fetch the payload at `path`. A missing document is
    /// [`ClimateError::DataUnavailable`].
    async fn fetch(&self, path: &str) -> ClimateResult<Bytes>;
}

/// Dataset in a local directory.
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl DataSource for LocalSource {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    #[instrument(skip(self), fields(root = %self.root.display()))]
    async fn fetch(&self, path: &str) -> ClimateResult<Bytes> {
        let full = self.root.join(path.trim_start_matches('/'));
        match tokio::fs::read(&full).await {
            Ok(bytes) => {
                debug!(size = bytes.len(), "Read payload");
                Ok(Bytes::from(bytes))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ClimateError::data_unavailable(path, "not found"))
            }
            Err(e) => Err(ClimateError::data_unavailable(path, e)),
        }
    }
}

/// Dataset served over HTTP below a base URL.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> ClimateResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| ClimateError::InitializationFailure(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl DataSource for HttpSource {
    fn describe(&self) -> String {
        self.base_url.clone()
    }

    #[instrument(skip(self), fields(base = %self.base_url))]
    async fn fetch(&self, path: &str) -> ClimateResult<Bytes> {
        let response = self
            .client
            .get(self.url_for(path))
            .send()
            .await
            .map_err(|e| ClimateError::data_unavailable(path, e))?;

        match response.status() {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => return Err(ClimateError::data_unavailable(path, "HTTP 404")),
            s => return Err(ClimateError::data_unavailable(path, format!("HTTP {}", s))),
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClimateError::data_unavailable(path, e))?;
        debug!(size = bytes.len(), "Fetched payload");
        Ok(bytes)
    }
}

/// `http://` and `https://` roots are served by [`HttpSource`], anything
/// else is a directory.
pub fn open_source(root: &str) -> ClimateResult<Arc<dyn DataSource>> {
    if root.starts_with("http://") || root.starts_with("https://") {
        Ok(Arc::new(HttpSource::new(root)?))
    } else {
        Ok(Arc::new(LocalSource::new(root)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_missing_is_data_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("present.json"), b"{}").unwrap();
        let source = LocalSource::new(dir.path());

        assert_eq!(&source.fetch("present.json").await.unwrap()[..], b"{}");
        let err = source.fetch("images/2022/07.png").await.unwrap_err();
        assert!(matches!(err, ClimateError::DataUnavailable { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_open_source_picks_by_scheme() {
        assert_eq!(open_source("https://example.org/data/").unwrap().describe(), "https://example.org/data");
        assert_eq!(open_source("/srv/climate").unwrap().describe(), "/srv/climate");
    }

    #[test]
    fn test_http_url_join() {
        let source = HttpSource::new("http://localhost:8000/data/").unwrap();
        assert_eq!(
            source.url_for("/leaflet_data/rain/2022_07.json.gz"),
            "http://localhost:8000/data/leaflet_data/rain/2022_07.json.gz"
        );
    }
}
