use std::time::Duration;

use spdlog::trace;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FetchError {
    #[error("HTTP {0}: {1}")]
    Status(u16, String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

/// Source of remote documents. Only successful (2xx) responses yield a body.
#[allow(async_fn_in_trait)]
pub trait Fetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

/// Bounds every request of the wrapped fetcher. Without a limit requests
/// may stay pending forever.
pub struct WithTimeout<F> {
    inner: F,
    limit: Option<Duration>,
}

impl<F: Fetcher> WithTimeout<F> {
    pub fn new(inner: F, limit: Option<Duration>) -> WithTimeout<F> {
        WithTimeout { inner, limit }
    }
}

impl<F: Fetcher> Fetcher for WithTimeout<F> {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let Some(limit) = self.limit else {
            return self.inner.fetch_text(url).await;
        };

        match tokio::time::timeout(limit, self.inner.fetch_text(url)).await {
            Ok(res) => res,
            Err(_elapsed) => Err(FetchError::Timeout(limit)),
        }
    }
}

/// Fetches over HTTP, resolving site-relative URLs against `base_url`.
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: &str) -> HttpFetcher {
        HttpFetcher {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let target = self.resolve(url);
        trace!("GET {}", target);

        let response = self.client.get(&target)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or_default().to_string();
            return Err(FetchError::Status(status.as_u16(), reason));
        }

        response.text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))
    }
}
