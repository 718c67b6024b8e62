//! Engine construction and session start errors.

use thiserror::Error;

use crate::cache::CacheError;
use crate::provider::{HttpError, ProviderError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no telemetry providers configured")]
    NoProviders,

    #[error("duplicate provider name '{0}'")]
    DuplicateProvider(String),

    #[error("flight identifier is empty")]
    EmptyIdentifier,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("failed to open enrichment cache: {0}")]
    Cache(#[from] CacheError),
}
