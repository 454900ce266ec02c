use serde::de::DeserializeOwned;
use slide_protocol::{
    endpoints, Deck, DownloadLink, ExportResult, GenerationRequest, HealthStatus, Outline,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::client::HttpTransport;
use crate::transport::{join_url, Transport, TransportError};

/// The three deck operations over a [`Transport`]. Stateless; cheap to clone
/// into spawned tasks.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    base_url: String,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
        }
    }

    /// Client over a fresh [`HttpTransport`].
    pub fn http(base_url: &str, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(base_url, timeout)?;
        Ok(Self::new(Arc::new(transport), base_url))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn propose_outline(&self, request: &GenerationRequest) -> Result<Outline, TransportError> {
        self.call(endpoints::PROPOSE_OUTLINE, request).await
    }

    pub async fn generate_deck(&self, request: &GenerationRequest) -> Result<Deck, TransportError> {
        self.call(endpoints::GENERATE_DECK, request).await
    }

    pub async fn export_deck(&self, request: &GenerationRequest) -> Result<ExportResult, TransportError> {
        self.call(endpoints::EXPORT_PPTX, request).await
    }

    pub async fn health(&self) -> Result<HealthStatus, TransportError> {
        let value = self.transport.get_json(endpoints::HEALTH).await?;
        serde_json::from_value(value).map_err(TransportError::invalid_response)
    }

    /// Resolves the server-relative path of an export against the base URL.
    pub fn download_link(&self, export: &ExportResult) -> DownloadLink {
        DownloadLink {
            url: join_url(&self.base_url, &export.download_url),
            filename: export.filename.clone(),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: &GenerationRequest,
    ) -> Result<T, TransportError> {
        debug!(endpoint, topic = %request.topic, slides = request.slide_count, "calling deck service");
        let payload = serde_json::to_value(request)
            .map_err(|e| TransportError::new(format!("failed to encode request: {e}")))?;
        let value = self.transport.post_json(endpoint, payload).await?;
        serde_json::from_value(value).map_err(TransportError::invalid_response)
    }
}
