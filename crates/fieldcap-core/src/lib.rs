//! Field Capture Core Library
//!
//! This crate provides the domain models, error types, configuration and
//! platform capability resolution shared by the capture components.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod platform;

// Re-export commonly used types
pub use config::CaptureConfig;
pub use error::{CaptureError, ErrorMetadata, LogLevel};
pub use models::{
    ArtifactSlot, RawFile, ScannerState, SlotKey, UploadJob, UploadStatus, VisualStatus,
};
pub use platform::{Platform, PlatformCapabilities};
