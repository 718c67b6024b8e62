//! Telemetry provider abstraction
//!
//! Each provider translates one third-party payload into the common
//! [`TelemetrySample`](crate::telemetry::TelemetrySample). Providers are
//! unreliable by nature: an empty or malformed answer is `NotFound` (try the
//! next provider), while network failures and non-2xx statuses are
//! `Unavailable` and count against the provider's health.
//!
//! # Factory Pattern
//!
//! ```ignore
//! use skytrack::provider::{AsyncReqwestClient, ProviderDescriptor, ProviderFactory, ProviderKind};
//!
//! let factory = ProviderFactory::new(AsyncReqwestClient::new()?);
//! let provider = factory.create(&ProviderDescriptor::new(
//!     "adsb_lol",
//!     ProviderKind::AdsbExchange,
//!     "https://api.adsb.lol",
//! ))?;
//! let sample = provider.fetch("BAW123").await?;
//! ```

mod adsb;
mod aviationstack;
mod factory;
mod http;
mod opensky;
mod types;

pub use adsb::AdsbExchangeProvider;
pub use aviationstack::AviationStackProvider;
pub use factory::ProviderFactory;
pub use http::{AsyncHttpClient, AsyncReqwestClient, HttpError, HttpRequest};
pub use opensky::OpenSkyProvider;
pub use types::{
    FlightQuery, ProviderDescriptor, ProviderError, ProviderKind, TelemetryProvider,
    DEFAULT_PROVIDER_TIMEOUT,
};

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;
