//! Backend storage endpoints.

use bytes::Bytes;
use fieldcap_core::constants::{PRESIGNED_URL_PATH, UPLOAD_FILE_PATH};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;

use crate::{ApiClient, TransportError};

/// Presigned URL response. Only `url` is read.
#[derive(Debug, Deserialize)]
pub struct PresignedUrlResponse {
    #[serde(default)]
    pub url: Option<String>,
}

/// Public file URL from a proxied upload response: `fileUrl`, then
/// `data.fileUrl`, then `url`.
pub fn extract_file_url(body: &Value) -> Option<String> {
    [
        body.get("fileUrl"),
        body.get("data").and_then(|data| data.get("fileUrl")),
        body.get("url"),
    ]
    .into_iter()
    .flatten()
    .filter_map(Value::as_str)
    .find(|url| !url.trim().is_empty())
    .map(str::to_string)
}

/// Remote object URL of a presigned write URL (query string removed).
pub fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

impl ApiClient {
    /// Upload through the backend as multipart (`file`, `fileName`, `fileType`).
    pub async fn upload_file(
        &self,
        auth_token: &str,
        data: Bytes,
        file_name: &str,
        file_type: &str,
    ) -> Result<String, TransportError> {
        let part = Part::bytes(data.to_vec())
            .file_name(file_name.to_string())
            .mime_str(file_type)
            .map_err(|e| TransportError::InvalidRequest(format!("Invalid file type: {}", e)))?;

        let form = Form::new()
            .part("file", part)
            .text("fileName", file_name.to_string())
            .text("fileType", file_type.to_string());

        let body: Value = self
            .post_multipart(UPLOAD_FILE_PATH, auth_token, form)
            .await?;

        extract_file_url(&body).ok_or(TransportError::MissingFileUrl)
    }

    /// Ask the backend for a short-lived direct-write URL.
    pub async fn get_presigned_url(
        &self,
        auth_token: &str,
        file_name: &str,
        file_type: &str,
    ) -> Result<String, TransportError> {
        let response: PresignedUrlResponse = self
            .get(
                PRESIGNED_URL_PATH,
                auth_token,
                &[("fileName", file_name), ("fileType", file_type)],
            )
            .await?;

        response
            .url
            .filter(|url| !url.trim().is_empty())
            .ok_or(TransportError::MissingPresignedUrl)
    }
}
