//! Artifact processing applied before transmission.
//!
//! Image artifacts are normalized under size and dimension limits; anything
//! else passes through untouched.

pub mod compression;

pub use compression::{
    ArtifactCompressor, CompressedArtifact, Compress, CompressionOptions, FormatSelector,
    ImageCompressor, OutputFormat,
};
