//! In-memory [`RasterFetcher`] with controllable completion order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use overlay_core::{OverlayError, RasterFetcher};
use tokio::sync::Semaphore;

#[derive(Debug, Clone)]
enum Response {
    Bytes(Bytes),
    Error(String),
}

#[derive(Debug, Default)]
struct Inner {
    responses: HashMap<String, Response>,
    gates: HashMap<String, Arc<Semaphore>>,
    requests: Vec<String>,
}

/// Serves canned responses by location.
///
/// Unknown locations fail with [`OverlayError::Fetch`]. A location put on
/// [`hold`](StaticFetcher::hold) does not answer until its [`Gate`] is
/// released, which lets a test decide which of two loads finishes first.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    inner: Mutex<Inner>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, location: impl Into<String>, bytes: impl Into<Bytes>) {
        self.lock()
            .responses
            .insert(location.into(), Response::Bytes(bytes.into()));
    }

    /// Make `location` fail with a fetch error.
    pub fn insert_error(&self, location: impl Into<String>, message: impl Into<String>) {
        self.lock()
            .responses
            .insert(location.into(), Response::Error(message.into()));
    }

    /// Block fetches of `location` until the returned gate is released.
    pub fn hold(&self, location: impl Into<String>) -> Gate {
        let semaphore = Arc::new(Semaphore::new(0));
        self.lock()
            .gates
            .insert(location.into(), Arc::clone(&semaphore));
        Gate { semaphore }
    }

    /// Every location requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl RasterFetcher for StaticFetcher {
    async fn fetch(&self, location: &str) -> overlay_core::Result<Bytes> {
        let gate = {
            let mut inner = self.lock();
            inner.requests.push(location.to_string());
            inner.gates.get(location).cloned()
        };

        if let Some(gate) = gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| OverlayError::fetch(location, e.to_string()))?;
        }

        match self.lock().responses.get(location).cloned() {
            Some(Response::Bytes(bytes)) => Ok(bytes),
            Some(Response::Error(message)) => Err(OverlayError::fetch(location, message)),
            None => Err(OverlayError::fetch(location, "not found")),
        }
    }
}

/// Releases a held location.
#[derive(Debug, Clone)]
pub struct Gate {
    semaphore: Arc<Semaphore>,
}

impl Gate {
    /// Let fetches of the held location through. Each fetch returns its
    /// permit, so one release serves every later fetch as well.
    pub fn release(&self) {
        self.semaphore.add_permits(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_inserted_bytes() {
        let fetcher = StaticFetcher::new();
        fetcher.insert("a.tif", vec![1u8, 2, 3]);
        assert_eq!(fetcher.fetch("a.tif").await.unwrap(), Bytes::from(vec![1u8, 2, 3]));
        assert!(fetcher.fetch("b.tif").await.is_err());
        assert_eq!(fetcher.requests(), vec!["a.tif", "b.tif"]);
    }

    #[tokio::test]
    async fn test_inserted_error_is_retryable() {
        let fetcher = StaticFetcher::new();
        fetcher.insert_error("a.tif", "connection reset");
        let err = fetcher.fetch("a.tif").await.unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_hold_until_released() {
        let fetcher = Arc::new(StaticFetcher::new());
        fetcher.insert("a.tif", vec![7u8]);
        let gate = fetcher.hold("a.tif");

        let task = {
            let fetcher = Arc::clone(&fetcher);
            tokio::spawn(async move { fetcher.fetch("a.tif").await })
        };
        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        gate.release();
        assert_eq!(task.await.unwrap().unwrap(), Bytes::from(vec![7u8]));
    }
}
