//! Upload strategies and the platform-driven selector.

use async_trait::async_trait;
use bytes::Bytes;
use fieldcap_core::PlatformCapabilities;

use crate::api::strip_query;
use crate::{ApiClient, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStrategy {
    /// Multipart POST through the backend
    Proxied,
    /// Presigned URL from the backend, then PUT straight to storage
    Direct,
}

/// Moves one blob to remote storage and returns its public URL.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn upload(
        &self,
        auth_token: &str,
        data: Bytes,
        file_name: &str,
        mime_type: &str,
    ) -> Result<String, TransportError>;
}

/// Backend-proxied multipart upload, for platforms where direct storage
/// writes are blocked.
#[derive(Clone, Debug)]
pub struct ProxiedTransport {
    client: ApiClient,
}

impl ProxiedTransport {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UploadTransport for ProxiedTransport {
    async fn upload(
        &self,
        auth_token: &str,
        data: Bytes,
        file_name: &str,
        mime_type: &str,
    ) -> Result<String, TransportError> {
        tracing::debug!(file_name, bytes = data.len(), "Uploading through backend");
        let url = self
            .client
            .upload_file(auth_token, data, file_name, mime_type)
            .await?;
        tracing::info!(file_name, url = %url, "Proxied upload complete");
        Ok(url)
    }
}

/// Direct-to-storage upload through a presigned write URL.
#[derive(Clone, Debug)]
pub struct DirectTransport {
    client: ApiClient,
}

impl DirectTransport {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UploadTransport for DirectTransport {
    async fn upload(
        &self,
        auth_token: &str,
        data: Bytes,
        file_name: &str,
        mime_type: &str,
    ) -> Result<String, TransportError> {
        let presigned_url = self
            .client
            .get_presigned_url(auth_token, file_name, mime_type)
            .await?;

        tracing::debug!(file_name, bytes = data.len(), "Uploading to presigned URL");
        // The presigned URL carries its own authorization.
        self.client
            .put_unauthenticated(&presigned_url, data, mime_type)
            .await?;

        let url = strip_query(&presigned_url).to_string();
        tracing::info!(file_name, url = %url, "Direct upload complete");
        Ok(url)
    }
}

/// Chooses proxied or direct upload from the resolved platform capabilities.
#[derive(Clone, Debug)]
pub struct TransportSelector {
    proxied: ProxiedTransport,
    direct: DirectTransport,
    capabilities: PlatformCapabilities,
}

impl TransportSelector {
    pub fn new(client: ApiClient, capabilities: PlatformCapabilities) -> Self {
        Self {
            proxied: ProxiedTransport::new(client.clone()),
            direct: DirectTransport::new(client),
            capabilities,
        }
    }

    pub fn strategy(&self) -> UploadStrategy {
        if self.capabilities.supports_direct_upload {
            UploadStrategy::Direct
        } else {
            UploadStrategy::Proxied
        }
    }
}

#[async_trait]
impl UploadTransport for TransportSelector {
    async fn upload(
        &self,
        auth_token: &str,
        data: Bytes,
        file_name: &str,
        mime_type: &str,
    ) -> Result<String, TransportError> {
        match self.strategy() {
            UploadStrategy::Direct => {
                self.direct
                    .upload(auth_token, data, file_name, mime_type)
                    .await
            }
            UploadStrategy::Proxied => {
                self.proxied
                    .upload(auth_token, data, file_name, mime_type)
                    .await
            }
        }
    }
}
