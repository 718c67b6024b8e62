//! HTTP client abstraction for testability

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Errors from the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    /// The client could not be built.
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    /// Connection, TLS or timeout failure.
    #[error("request failed: {0}")]
    Request(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The body could not be read.
    #[error("failed to read response: {0}")]
    Body(String),
}

/// A GET request with optional headers and timeout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Trait for async HTTP client operations.
///
/// Adapters are generic over this trait so tests can inject canned payloads.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs the request and returns the body of a 2xx response.
    fn get(&self, request: &HttpRequest) -> impl Future<Output = Result<Vec<u8>, HttpError>> + Send;
}

/// Real HTTP client implementation using reqwest.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
}

impl AsyncReqwestClient {
    /// Creates a client with a 30 second overall timeout.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Creates a client with a custom overall timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("skytrack/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    async fn get(&self, request: &HttpRequest) -> Result<Vec<u8>, HttpError> {
        let mut builder = self
            .client
            .get(&request.url)
            .header(reqwest::header::ACCEPT, "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| HttpError::Request(e.to_string()))?;

        // Check HTTP status
        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                url: request.url.clone(),
            });
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| HttpError::Body(e.to_string()))
    }
}
