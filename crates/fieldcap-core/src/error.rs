//! Error types module
//!
//! All failures surfaced by the capture layer are unified under [`CaptureError`].
//! Components never let these escape as panics: the upload pipeline and the
//! scanner controller convert them into a typed state transition plus a
//! human-readable message (see [`ErrorMetadata::client_message`]).

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like missing form input
    Debug,
    /// Warning level - for recoverable issues like a denied permission
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented to the operator
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "MISSING_CONTEXT")
    fn error_code(&self) -> &'static str;

    /// Whether the operator can recover by retrying
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the operator
    fn suggested_action(&self) -> Option<&'static str>;

    /// User-facing message
    fn client_message(&self) -> String;

    /// Whether this error is raised before any work starts
    fn is_precondition(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Missing identifying context: {0}")]
    MissingContext(String),

    #[error("Missing auth token")]
    MissingAuthToken,

    #[error("Missing file")]
    MissingFile,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for CaptureError {
    fn from(err: anyhow::Error) -> Self {
        CaptureError::Internal(format!("{:#}", err))
    }
}

impl From<serde_json::Error> for CaptureError {
    fn from(err: serde_json::Error) -> Self {
        CaptureError::Internal(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, precondition, log_level).
fn capture_error_static_metadata(
    err: &CaptureError,
) -> (&'static str, bool, Option<&'static str>, bool, LogLevel) {
    match err {
        CaptureError::MissingContext(_) => (
            "MISSING_CONTEXT",
            false,
            Some("Enter or scan the device identifier first"),
            true,
            LogLevel::Debug,
        ),
        CaptureError::MissingAuthToken => (
            "MISSING_AUTH_TOKEN",
            false,
            Some("Sign in again"),
            true,
            LogLevel::Debug,
        ),
        CaptureError::MissingFile => (
            "MISSING_FILE",
            false,
            Some("Choose a file to upload"),
            true,
            LogLevel::Debug,
        ),
        CaptureError::PermissionDenied(_) => (
            "PERMISSION_DENIED",
            true,
            Some("Grant camera access and retry"),
            false,
            LogLevel::Warn,
        ),
        CaptureError::Device(_) => (
            "DEVICE_ERROR",
            true,
            Some("Retry the scan"),
            false,
            LogLevel::Warn,
        ),
        CaptureError::Upload(_) => (
            "UPLOAD_FAILED",
            true,
            Some("Retry the upload"),
            false,
            LogLevel::Warn,
        ),
        CaptureError::InvalidState(_) => (
            "INVALID_STATE",
            false,
            None,
            false,
            LogLevel::Debug,
        ),
        CaptureError::InvalidConfig(_) => (
            "INVALID_CONFIG",
            false,
            Some("Check the environment configuration"),
            false,
            LogLevel::Error,
        ),
        CaptureError::Internal(_) => (
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            false,
            LogLevel::Error,
        ),
    }
}

impl CaptureError {
    /// Get the error type name
    pub fn error_type(&self) -> &str {
        match self {
            CaptureError::MissingContext(_) => "MissingContext",
            CaptureError::MissingAuthToken => "MissingAuthToken",
            CaptureError::MissingFile => "MissingFile",
            CaptureError::PermissionDenied(_) => "PermissionDenied",
            CaptureError::Device(_) => "Device",
            CaptureError::Upload(_) => "Upload",
            CaptureError::InvalidState(_) => "InvalidState",
            CaptureError::InvalidConfig(_) => "InvalidConfig",
            CaptureError::Internal(_) => "Internal",
        }
    }
}

/// Log `error` at the level its metadata asks for.
pub fn log_error(error: &CaptureError, message: &str) {
    let error_type = error.error_type();
    let code = error.error_code();
    let suggested_action = error.suggested_action().unwrap_or("none");
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type, code, suggested_action, "{}", message);
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type, code, suggested_action, "{}", message);
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type, code, suggested_action, "{}", message);
        }
    }
}

impl ErrorMetadata for CaptureError {
    fn error_code(&self) -> &'static str {
        capture_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        capture_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        capture_error_static_metadata(self).2
    }

    fn is_precondition(&self) -> bool {
        capture_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        capture_error_static_metadata(self).4
    }

    fn client_message(&self) -> String {
        match self {
            CaptureError::MissingContext(ref msg) => msg.clone(),
            CaptureError::MissingAuthToken => "Session expired, please sign in again".to_string(),
            CaptureError::MissingFile => "Please choose a file first".to_string(),
            CaptureError::PermissionDenied(ref msg) => msg.clone(),
            CaptureError::Device(ref msg) => msg.clone(),
            CaptureError::Upload(ref msg) => msg.clone(),
            CaptureError::InvalidState(ref msg) => msg.clone(),
            CaptureError::InvalidConfig(_) => "Application is misconfigured".to_string(),
            CaptureError::Internal(_) => "Something went wrong, please try again".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_missing_context() {
        let err = CaptureError::MissingContext("Please enter the device identifier first".into());
        assert_eq!(err.error_code(), "MISSING_CONTEXT");
        assert!(err.is_precondition());
        assert!(!err.is_recoverable());
        assert_eq!(
            err.client_message(),
            "Please enter the device identifier first"
        );
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_upload() {
        let err = CaptureError::Upload("disk full".to_string());
        assert_eq!(err.error_code(), "UPLOAD_FAILED");
        assert!(err.is_recoverable());
        assert!(!err.is_precondition());
        assert_eq!(err.client_message(), "disk full");
        assert_eq!(err.suggested_action(), Some("Retry the upload"));
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = CaptureError::from(anyhow::anyhow!("decoder exploded"));
        assert_eq!(err.error_type(), "Internal");
        assert!(!err.client_message().contains("decoder"));
        assert!(err.to_string().contains("decoder exploded"));
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_preconditions_are_not_pipeline_failures() {
        assert!(CaptureError::MissingAuthToken.is_precondition());
        assert!(CaptureError::MissingFile.is_precondition());
        assert!(!CaptureError::PermissionDenied("denied".into()).is_precondition());
        assert!(!CaptureError::Device("no stream".into()).is_precondition());
    }
}
