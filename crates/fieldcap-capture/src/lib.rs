//! Capture-and-upload orchestration.
//!
//! Two independent subsystems share only the form session:
//!
//! - the upload pipeline ([`UploadPipeline`]) drives one artifact at a time
//!   through compression and transport, tracking every slot in a
//!   [`SlotStore`], optionally fed by a [`SourceSelector`];
//! - the barcode scanner ([`ScannerController`]) owns the live-scan lifecycle
//!   and hands the decoded device identifier to the form.

pub mod context;
pub mod pipeline;
pub mod scanner;
pub mod source;
pub mod store;
pub mod telemetry;

pub use context::{FormContext, FormSession};
pub use pipeline::{SubmitOutcome, UploadEvent, UploadPipeline};
pub use scanner::{
    DecodeConfig, DecodeEngine, EngineError, PermissionApi, ScannerController, ScannerEvent,
};
pub use source::{FileInput, SourceOption, SourceSelector};
pub use store::SlotStore;
