//! Collaborator seams of the scanner: the platform permission API and the
//! barcode decode engine.

use async_trait::async_trait;
use fieldcap_core::constants::SCANNER_TARGET_ID;
use fieldcap_core::PlatformCapabilities;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Camera access was refused by the platform
    #[error("Permission error: {0}")]
    Permission(String),

    /// Storage access was refused. Live scanning does not need storage.
    #[error("External storage permission denied: {0}")]
    StoragePermission(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Engine is not running")]
    NotRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantStatus {
    Granted,
    Denied,
    Prompt,
}

/// Grant status per capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermissionGrant {
    pub camera: GrantStatus,
    /// `None` on platforms without a separate storage permission
    pub storage: Option<GrantStatus>,
}

impl PermissionGrant {
    pub fn camera_granted(&self) -> bool {
        self.camera == GrantStatus::Granted
    }

    pub fn storage_denied(&self) -> bool {
        self.storage == Some(GrantStatus::Denied)
    }
}

#[async_trait]
pub trait PermissionApi: Send + Sync {
    async fn check_permissions(&self) -> Result<PermissionGrant, EngineError>;
    async fn request_permissions(&self) -> Result<PermissionGrant, EngineError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    Environment,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Range<T> {
    pub min: T,
    pub ideal: T,
    pub max: T,
}

/// Resolution, aspect ratio and focus hints for platforms that benefit
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StreamHints {
    pub width: Range<u32>,
    pub height: Range<u32>,
    pub aspect_ratio_min: f32,
    pub aspect_ratio_max: f32,
    pub continuous_focus: bool,
}

impl Default for StreamHints {
    fn default() -> Self {
        Self {
            width: Range {
                min: 640,
                ideal: 1280,
                max: 1920,
            },
            height: Range {
                min: 480,
                ideal: 720,
                max: 1080,
            },
            aspect_ratio_min: 1.0,
            aspect_ratio_max: 2.0,
            continuous_focus: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamConstraints {
    pub facing_mode: FacingMode,
    pub hints: Option<StreamHints>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbology {
    Code128,
}

/// Everything the engine needs to open a live stream and decode it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodeConfig {
    /// Display surface the stream renders into
    pub target: String,
    pub constraints: StreamConstraints,
    pub symbologies: Vec<Symbology>,
    /// Stop at the first candidate instead of aggregating several symbols
    pub single_match: bool,
    pub locate: bool,
    pub workers: u8,
}

impl DecodeConfig {
    pub fn for_capabilities(capabilities: PlatformCapabilities) -> Self {
        Self {
            target: SCANNER_TARGET_ID.to_string(),
            constraints: StreamConstraints {
                facing_mode: FacingMode::Environment,
                hints: capabilities
                    .tuned_stream_hints
                    .then(StreamHints::default),
            },
            symbologies: vec![Symbology::Code128],
            single_match: true,
            locate: true,
            workers: 2,
        }
    }
}

/// Outcome of processing one frame. Present only when the engine located
/// something it could not decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameResult {
    pub candidates: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(pub u64);

pub type DetectedCallback = Box<dyn Fn(&str) + Send + Sync>;
pub type ProcessedCallback = Box<dyn Fn(Option<&FrameResult>) + Send + Sync>;

/// Live barcode decoder bound to a camera stream.
///
/// `stop` may be called at any time, including before `init`; an error from it
/// is informational only.
#[async_trait]
pub trait DecodeEngine: Send + Sync {
    async fn init(&self, config: &DecodeConfig) -> Result<(), EngineError>;
    async fn start(&self) -> Result<(), EngineError>;
    fn stop(&self) -> Result<(), EngineError>;

    fn on_detected(&self, callback: DetectedCallback) -> CallbackId;
    fn on_processed(&self, callback: ProcessedCallback) -> CallbackId;
    /// Unregister a callback. Unknown ids are ignored.
    fn off(&self, id: CallbackId);
}
