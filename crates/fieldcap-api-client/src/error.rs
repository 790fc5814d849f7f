//! Transport error taxonomy

use reqwest::StatusCode;
use serde_json::Value;

/// Longest plain-text body that is still shown to the operator as-is
const MAX_PLAIN_MESSAGE_LEN: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Request failed with status {status}")]
    Status {
        status: u16,
        message: Option<String>,
    },

    #[error("Upload response did not contain a file URL")]
    MissingFileUrl,

    #[error("Failed to get presigned URL")]
    MissingPresignedUrl,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_decode() {
            TransportError::InvalidResponse(err.to_string())
        } else if err.is_builder() {
            TransportError::InvalidRequest(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

impl TransportError {
    /// Build a status error, pulling a readable message out of the body when
    /// the backend provides one.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        TransportError::Status {
            status: status.as_u16(),
            message: message_from_body(body),
        }
    }

    /// Human-readable message recorded on the slot
    pub fn user_message(&self) -> String {
        match self {
            TransportError::Status {
                message: Some(message),
                ..
            } => message.clone(),
            TransportError::Status {
                status,
                message: None,
            } => format!("Upload failed with status {}", status),
            TransportError::Network(_) => "Network error, check your connection".to_string(),
            TransportError::Timeout => "Upload timed out".to_string(),
            TransportError::MissingFileUrl => "Upload response did not contain a file URL".to_string(),
            TransportError::MissingPresignedUrl => "Failed to get presigned URL".to_string(),
            TransportError::InvalidRequest(_) | TransportError::InvalidResponse(_) => {
                "Upload failed".to_string()
            }
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn message_from_body(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(json) = serde_json::from_str::<Value>(trimmed) {
        let candidates = [
            json.get("error"),
            json.get("message"),
            json.get("error").and_then(|e| e.get("message")),
        ];
        return candidates
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string);
    }

    if trimmed.len() <= MAX_PLAIN_MESSAGE_LEN && !trimmed.starts_with('<') {
        return Some(trimmed.to_string());
    }
    None
}
