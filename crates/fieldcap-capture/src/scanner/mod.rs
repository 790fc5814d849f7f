//! Live barcode scanning.

pub mod controller;
pub mod engine;

pub use controller::{ScannerController, ScannerEvent};
pub use engine::{
    CallbackId, DecodeConfig, DecodeEngine, DetectedCallback, EngineError, FacingMode,
    FrameResult, GrantStatus, PermissionApi, PermissionGrant, ProcessedCallback, StreamConstraints,
    StreamHints, Symbology,
};
