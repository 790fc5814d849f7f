//! Configuration module
//!
//! Runtime configuration for the capture layer: backend endpoint, platform,
//! transport timeout, compression limits and the source chooser delay.

use std::env;
use std::time::Duration;

use crate::constants::{
    BYTES_PER_MB, DEFAULT_API_URL, DEFAULT_MAX_HEIGHT, DEFAULT_MAX_SIZE_MB, DEFAULT_MAX_WIDTH,
    DEFAULT_QUALITY, DEFAULT_SOURCE_CHOOSER_DELAY_MS, DEFAULT_UPLOAD_TIMEOUT_SECS,
};
use crate::error::CaptureError;
use crate::platform::{Platform, PlatformCapabilities};

/// Capture layer configuration
#[derive(Clone, Debug)]
pub struct CaptureConfig {
    pub api_url: String,
    pub platform: Platform,
    pub upload_timeout_secs: u64,
    // Compression limits
    pub image_max_width: u32,
    pub image_max_height: u32,
    pub image_quality: f32,
    pub image_max_size_mb: u64,
    pub source_chooser_delay_ms: u64,
    pub environment: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            platform: Platform::Web,
            upload_timeout_secs: DEFAULT_UPLOAD_TIMEOUT_SECS,
            image_max_width: DEFAULT_MAX_WIDTH,
            image_max_height: DEFAULT_MAX_HEIGHT,
            image_quality: DEFAULT_QUALITY,
            image_max_size_mb: DEFAULT_MAX_SIZE_MB,
            source_chooser_delay_ms: DEFAULT_SOURCE_CHOOSER_DELAY_MS,
            environment: "development".to_string(),
        }
    }
}

impl CaptureConfig {
    pub fn from_env() -> Result<Self, CaptureError> {
        dotenvy::dotenv().ok();

        let platform = match env::var("FIELDCAP_PLATFORM") {
            Ok(value) => value
                .parse::<Platform>()
                .map_err(|e| CaptureError::InvalidConfig(e.to_string()))?,
            Err(_) => Platform::Web,
        };

        let config = Self {
            api_url: env::var("FIELDCAP_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            platform,
            upload_timeout_secs: env::var("UPLOAD_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_UPLOAD_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(DEFAULT_UPLOAD_TIMEOUT_SECS),
            image_max_width: env::var("IMAGE_MAX_WIDTH")
                .unwrap_or_else(|_| DEFAULT_MAX_WIDTH.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_WIDTH),
            image_max_height: env::var("IMAGE_MAX_HEIGHT")
                .unwrap_or_else(|_| DEFAULT_MAX_HEIGHT.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_HEIGHT),
            image_quality: env::var("IMAGE_QUALITY")
                .unwrap_or_else(|_| DEFAULT_QUALITY.to_string())
                .parse()
                .unwrap_or(DEFAULT_QUALITY),
            image_max_size_mb: env::var("IMAGE_MAX_SIZE_MB")
                .unwrap_or_else(|_| DEFAULT_MAX_SIZE_MB.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_SIZE_MB),
            source_chooser_delay_ms: env::var("SOURCE_CHOOSER_DELAY_MS")
                .unwrap_or_else(|_| DEFAULT_SOURCE_CHOOSER_DELAY_MS.to_string())
                .parse()
                .unwrap_or(DEFAULT_SOURCE_CHOOSER_DELAY_MS),
            environment: env::var("ENVIRONMENT")
                .or_else(|_| env::var("APP_ENV"))
                .unwrap_or_else(|_| "development".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(CaptureError::InvalidConfig(format!(
                "FIELDCAP_API_URL must be an http(s) URL, got '{}'",
                self.api_url
            )));
        }
        if self.upload_timeout_secs == 0 {
            return Err(CaptureError::InvalidConfig(
                "UPLOAD_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        if self.image_max_width == 0 || self.image_max_height == 0 {
            return Err(CaptureError::InvalidConfig(
                "IMAGE_MAX_WIDTH and IMAGE_MAX_HEIGHT must be greater than zero".to_string(),
            ));
        }
        if !(self.image_quality > 0.0 && self.image_quality <= 1.0) {
            return Err(CaptureError::InvalidConfig(format!(
                "IMAGE_QUALITY must be in (0, 1], got {}",
                self.image_quality
            )));
        }
        if self.image_max_size_mb == 0 {
            return Err(CaptureError::InvalidConfig(
                "IMAGE_MAX_SIZE_MB must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn capabilities(&self) -> PlatformCapabilities {
        self.platform.capabilities()
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn image_max_size_bytes(&self) -> u64 {
        self.image_max_size_mb * BYTES_PER_MB
    }

    pub fn source_chooser_delay(&self) -> Duration {
        Duration::from_millis(self.source_chooser_delay_ms)
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.to_lowercase().as_str(), "production" | "prod")
    }
}
