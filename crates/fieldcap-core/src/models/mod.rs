//! Domain models for the capture layer

pub mod artifact;
pub mod scanner;
pub mod slot;

pub use artifact::{RawFile, UploadJob};
pub use scanner::{ScannerState, VisualStatus};
pub use slot::{ArtifactSlot, SlotKey, UploadStatus};
