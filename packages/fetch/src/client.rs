//! The HTTP seam.
//!
//! Every stage issues plain GETs and needs only the status code and the
//! body, so the trait models nothing else. [`ReqwestClient`] shares one
//! connection pool across the whole run.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::FetchError;

/// A GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute URL to fetch.
    pub url: String,
    /// Extra headers to send.
    pub headers: BTreeMap<String, String>,
    /// Timeout covering the whole attempt, body included.
    pub timeout: Duration,
}

impl HttpRequest {
    /// Creates a GET for `url` with no extra headers.
    #[must_use]
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            url: url.to_owned(),
            headers: BTreeMap::new(),
            timeout,
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_owned(), value.to_owned());
        self
    }
}

/// A fully-read response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Whether the status is exactly 200.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// The body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Issues GET requests.
///
/// Implementations are shared across concurrently running rows, so they
/// must be `Send + Sync` and their futures `Send`.
pub trait HttpClient: Send + Sync {
    /// Sends `request` and reads the full response body.
    ///
    /// A response with any status code is `Ok`; only transport failures
    /// (connect, timeout, body read) are errors.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if no complete response was received.
    fn get(
        &self,
        request: &HttpRequest,
    ) -> impl std::future::Future<Output = Result<HttpResponse, FetchError>> + Send;
}

/// [`HttpClient`] backed by a pooled [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Builds a client with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the TLS backend cannot be
    /// initialised.
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
        let mut builder = self.client.get(request.url.as_str()).timeout(request.timeout);
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_replaces_invalid_utf8() {
        let response = HttpResponse {
            status: 200,
            body: b"<p>caf\xe9</p>".to_vec(),
        };
        assert_eq!(response.text(), "<p>caf\u{fffd}</p>");
        assert!(response.is_ok());
    }

    #[test]
    fn only_200_is_ok() {
        let response = HttpResponse {
            status: 204,
            body: Vec::new(),
        };
        assert!(!response.is_ok());
    }

    #[test]
    fn request_builder_collects_headers() {
        let request = HttpRequest::new("http://a.test/p", Duration::from_secs(30))
            .with_header("User-Agent", "test-agent");
        assert_eq!(
            request.headers.get("User-Agent").map(String::as_str),
            Some("test-agent")
        );
    }
}
