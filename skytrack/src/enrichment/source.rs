//! Enrichment sources.

use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::provider::{AsyncHttpClient, HttpRequest};

/// Placeholder replaced by the flight identifier in URL templates.
pub const IDENT_PLACEHOLDER: &str = "{ident}";

/// Errors from an enrichment lookup. `Clone` so coalesced callers share them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrichmentError {
    /// No enrichment source is configured.
    #[error("enrichment is not configured")]
    NotConfigured,

    /// The source failed or returned an unusable body.
    #[error("enrichment fetch failed: {0}")]
    Fetch(String),
}

/// Something that can describe a flight.
pub trait EnrichmentSource: Send + Sync {
    fn fetch<'a>(&'a self, identifier: &'a str)
        -> BoxFuture<'a, Result<serde_json::Value, EnrichmentError>>;
}

/// Fetches a JSON document from a URL template such as
/// `https://api.example.com/route/{ident}`.
pub struct HttpEnrichmentSource<C: AsyncHttpClient> {
    url_template: String,
    timeout: Duration,
    http_client: C,
}

impl<C: AsyncHttpClient> HttpEnrichmentSource<C> {
    pub fn new(url_template: impl Into<String>, timeout: Duration, http_client: C) -> Self {
        Self {
            url_template: url_template.into(),
            timeout,
            http_client,
        }
    }

    fn build_url(&self, identifier: &str) -> String {
        self.url_template.replace(IDENT_PLACEHOLDER, identifier)
    }
}

impl<C: AsyncHttpClient> EnrichmentSource for HttpEnrichmentSource<C> {
    fn fetch<'a>(
        &'a self,
        identifier: &'a str,
    ) -> BoxFuture<'a, Result<serde_json::Value, EnrichmentError>> {
        Box::pin(async move {
            let request = HttpRequest::get(self.build_url(identifier)).timeout(self.timeout);
            let body = self
                .http_client
                .get(&request)
                .await
                .map_err(|e| EnrichmentError::Fetch(e.to_string()))?;

            serde_json::from_slice(&body)
                .map_err(|e| EnrichmentError::Fetch(format!("invalid JSON: {}", e)))
        })
    }
}
