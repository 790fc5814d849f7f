//! Default values shared by configuration and components.

/// Default backend base URL when `FIELDCAP_API_URL` is not set
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Upper bound for a single upload request (large files on slow links)
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_MAX_WIDTH: u32 = 1920;
pub const DEFAULT_MAX_HEIGHT: u32 = 1920;
pub const DEFAULT_QUALITY: f32 = 0.8;
pub const DEFAULT_MAX_SIZE_MB: u64 = 1;

/// Delay between configuring a file input and activating it
pub const DEFAULT_SOURCE_CHOOSER_DELAY_MS: u64 = 100;

/// Backend endpoint for proxied multipart uploads
pub const UPLOAD_FILE_PATH: &str = "/api/s3/upload-file";

/// Backend endpoint issuing presigned write URLs
pub const PRESIGNED_URL_PATH: &str = "/api/s3/get-presigned-url";

/// Display surface the decode engine renders into
pub const SCANNER_TARGET_ID: &str = "interactive";

pub const BYTES_PER_MB: u64 = 1024 * 1024;
