//! Byte fetchers for manifests and rasters.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::error::{OverlayError, Result};

/// Source of raw bytes for a location string.
#[async_trait]
pub trait RasterFetcher: Send + Sync {
    /// Fetch the full contents at `location`.
    async fn fetch(&self, location: &str) -> Result<Bytes>;
}

/// Fetches over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(30)))
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| OverlayError::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl RasterFetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, location: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(location)
            .send()
            .await
            .map_err(|e| OverlayError::fetch(location, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OverlayError::fetch(location, format!("HTTP {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| OverlayError::fetch(location, e.to_string()))?;

        debug!(size = bytes.len(), "Fetched over HTTP");
        Ok(bytes)
    }
}

/// Reads from the local filesystem, optionally under a root directory.
#[derive(Debug, Clone, Default)]
pub struct FileFetcher {
    root: Option<PathBuf>,
}

impl FileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative locations against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn path_for(&self, location: &str) -> PathBuf {
        let location = location.strip_prefix("file://").unwrap_or(location);
        match &self.root {
            Some(root) if !location.starts_with('/') => root.join(location),
            _ => PathBuf::from(location),
        }
    }
}

#[async_trait]
impl RasterFetcher for FileFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, location: &str) -> Result<Bytes> {
        let path = self.path_for(location);
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| OverlayError::fetch(path.display().to_string(), e.to_string()))?;

        debug!(size = data.len(), path = %path.display(), "Read from disk");
        Ok(Bytes::from(data))
    }
}

/// Routes `http://` and `https://` locations to HTTP, everything else to disk.
#[derive(Debug, Clone)]
pub struct AutoFetcher {
    http: HttpFetcher,
    file: FileFetcher,
}

impl AutoFetcher {
    /// Local paths are read as given; relative manifest paths are expected
    /// to be joined onto a base first.
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: HttpFetcher::new(timeout)?,
            file: FileFetcher::new(),
        })
    }
}

fn is_http(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

#[async_trait]
impl RasterFetcher for AutoFetcher {
    async fn fetch(&self, location: &str) -> Result<Bytes> {
        if is_http(location) {
            self.http.fetch(location).await
        } else {
            self.file.fetch(location).await
        }
    }
}
