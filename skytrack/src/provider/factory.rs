//! Provider factory for centralized adapter creation.

use std::sync::Arc;

use crate::provider::{
    AdsbExchangeProvider, AsyncHttpClient, AviationStackProvider, OpenSkyProvider,
    ProviderDescriptor, ProviderError, ProviderKind, TelemetryProvider,
};

/// Builds adapters from descriptors, sharing one HTTP client between them.
pub struct ProviderFactory<C> {
    http_client: C,
}

impl<C> ProviderFactory<C>
where
    C: AsyncHttpClient + Clone + 'static,
{
    pub fn new(http_client: C) -> Self {
        Self { http_client }
    }

    /// Creates the adapter matching `descriptor.kind`.
    pub fn create(
        &self,
        descriptor: &ProviderDescriptor,
    ) -> Result<Arc<dyn TelemetryProvider>, ProviderError> {
        let client = self.http_client.clone();
        let provider: Arc<dyn TelemetryProvider> = match descriptor.kind {
            ProviderKind::AdsbExchange => {
                Arc::new(AdsbExchangeProvider::new(descriptor.clone(), client))
            }
            ProviderKind::OpenSky => Arc::new(OpenSkyProvider::new(descriptor.clone(), client)),
            ProviderKind::AviationStack => {
                Arc::new(AviationStackProvider::new(descriptor.clone(), client)?)
            }
        };

        tracing::debug!(
            provider = %descriptor.name,
            kind = %descriptor.kind,
            base_url = %descriptor.base_url,
            "Created telemetry provider"
        );
        Ok(provider)
    }

    /// Creates every adapter, failing on the first invalid descriptor.
    pub fn create_all(
        &self,
        descriptors: &[ProviderDescriptor],
    ) -> Result<Vec<Arc<dyn TelemetryProvider>>, ProviderError> {
        descriptors.iter().map(|d| self.create(d)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockAsyncHttpClient;

    #[test]
    fn test_creates_each_kind() {
        let factory = ProviderFactory::new(MockAsyncHttpClient::ok("{}"));
        let descriptors = vec![
            ProviderDescriptor::new("a", ProviderKind::AdsbExchange, "http://a"),
            ProviderDescriptor::new("b", ProviderKind::OpenSky, "http://b"),
            ProviderDescriptor::new("c", ProviderKind::AviationStack, "http://c").with_api_key("k"),
        ];

        let providers = factory.create_all(&descriptors).unwrap();
        let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_invalid_descriptor_fails() {
        let factory = ProviderFactory::new(MockAsyncHttpClient::ok("{}"));
        let d = ProviderDescriptor::new("c", ProviderKind::AviationStack, "http://c");
        assert!(matches!(
            factory.create(&d),
            Err(ProviderError::Configuration(_))
        ));
    }
}
