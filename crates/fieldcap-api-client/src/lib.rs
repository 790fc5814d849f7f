//! HTTP client for the capture backend.
//!
//! Provides a small client with per-request bearer auth and the two upload
//! strategies: proxied multipart through the backend, and direct writes to
//! storage through a presigned URL. [`TransportSelector`] picks one from the
//! platform capabilities.

pub mod api;
pub mod error;
pub mod transport;

use fieldcap_core::CaptureConfig;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub use error::TransportError;
pub use transport::{
    DirectTransport, ProxiedTransport, TransportSelector, UploadStrategy, UploadTransport,
};

/// `Authorization` value for a session token. Tokens already carrying the
/// scheme are passed through unchanged.
pub fn bearer_value(token: &str) -> String {
    let token = token.trim();
    let has_scheme = token
        .get(..7)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("bearer "));
    if has_scheme {
        token.to_string()
    } else {
        format!("Bearer {}", token)
    }
}

/// HTTP client for the capture backend.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::InvalidRequest(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &CaptureConfig) -> Result<Self, TransportError> {
        Self::new(&config.api_url, config.upload_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(
        &self,
        request: reqwest::RequestBuilder,
        auth_token: &str,
    ) -> reqwest::RequestBuilder {
        request.header(AUTHORIZATION, bearer_value(auth_token))
    }

    /// GET request with query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        auth_token: &str,
        query: &[(&str, &str)],
    ) -> Result<T, TransportError> {
        let url = self.build_url(path);
        let mut request = self.apply_auth(self.client.get(&url), auth_token);

        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await?;
        Self::json_body(response).await
    }

    /// POST multipart form and deserialize response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        auth_token: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, TransportError> {
        let url = self.build_url(path);
        let request = self.apply_auth(self.client.post(&url).multipart(form), auth_token);

        let response = request.send().await?;
        Self::json_body(response).await
    }

    /// PUT a raw body to an absolute URL without backend credentials.
    pub async fn put_unauthenticated(
        &self,
        url: &str,
        data: bytes::Bytes,
        content_type: &str,
    ) -> Result<(), TransportError> {
        let response = self
            .client
            .put(url)
            .header(CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn ensure_success(response: Response) -> Result<Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::from_status(status, &body))
    }

    async fn json_body<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
        let response = Self::ensure_success(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            TransportError::InvalidResponse(format!("Failed to parse response as JSON: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_value_adds_scheme() {
        assert_eq!(bearer_value("abc"), "Bearer abc");
        assert_eq!(bearer_value("Bearer abc"), "Bearer abc");
        assert_eq!(bearer_value("bearer abc"), "bearer abc");
    }

    #[test]
    fn test_build_url_trims_trailing_slash() {
        let client = ApiClient::new("http://backend/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://backend");
        assert_eq!(
            client.build_url("/api/s3/upload-file"),
            "http://backend/api/s3/upload-file"
        );
    }

    #[test]
    fn test_from_config_uses_api_url() {
        let config = CaptureConfig {
            api_url: "https://api.example.com".to_string(),
            ..CaptureConfig::default()
        };
        let client = ApiClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "https://api.example.com");
    }
}
