use anyhow::{Context, Result};
use bytes::Bytes;
use fieldcap_core::constants::{
    BYTES_PER_MB, DEFAULT_MAX_HEIGHT, DEFAULT_MAX_SIZE_MB, DEFAULT_MAX_WIDTH, DEFAULT_QUALITY,
};
use fieldcap_core::models::artifact::is_image_mime_type;
use fieldcap_core::CaptureConfig;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, GenericImageView, ImageDecoder, ImageFormat, ImageReader};
use std::io::Cursor;

/// Lowest quality the size search will go down to
const MIN_QUALITY: f32 = 0.1;
const QUALITY_STEP: f32 = 0.1;
/// Dimension floor for the downscale fallback
const MIN_DIMENSION: u32 = 64;
/// Each downscale round keeps this fraction of width and height
const DOWNSCALE_FACTOR: f32 = 0.75;

/// Size and dimension limits applied before an artifact is transmitted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionOptions {
    pub max_width: u32,
    pub max_height: u32,
    /// Re-encode quality factor in (0, 1]
    pub quality: f32,
    pub max_size_bytes: u64,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
            quality: DEFAULT_QUALITY,
            max_size_bytes: DEFAULT_MAX_SIZE_MB * BYTES_PER_MB,
        }
    }
}

impl From<&CaptureConfig> for CompressionOptions {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            max_width: config.image_max_width,
            max_height: config.image_max_height,
            quality: config.image_quality,
            max_size_bytes: config.image_max_size_bytes(),
        }
    }
}

/// Output format for compressed images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn to_mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }
}

/// Picks the output format from image properties
pub struct FormatSelector;

impl FormatSelector {
    /// PNG keeps transparency (signatures drawn on a transparent canvas);
    /// everything else is re-encoded as JPEG.
    pub fn select_format(img: &DynamicImage) -> OutputFormat {
        if Self::has_meaningful_alpha(img) {
            OutputFormat::Png
        } else {
            OutputFormat::Jpeg
        }
    }

    /// Check if image has meaningful alpha channel (not fully opaque)
    fn has_meaningful_alpha(img: &DynamicImage) -> bool {
        match img {
            DynamicImage::ImageRgba8(_)
            | DynamicImage::ImageRgba16(_)
            | DynamicImage::ImageRgba32F(_)
            | DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageLumaA16(_) => {
                let rgba = img.to_rgba8();
                let (width, height) = img.dimensions();

                // Sample alpha channel (every 10th pixel for performance)
                for y in (0..height).step_by(10) {
                    for x in (0..width).step_by(10) {
                        if rgba.get_pixel(x, y)[3] < 255 {
                            return true;
                        }
                    }
                }
                false
            }
            _ => false,
        }
    }
}

/// Result of compressing one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedArtifact {
    pub data: Bytes,
    pub mime_type: String,
    /// False when the original blob is passed through unchanged
    pub compressed: bool,
}

impl CompressedArtifact {
    fn original(data: Bytes, mime_type: &str) -> Self {
        Self {
            data,
            mime_type: mime_type.to_string(),
            compressed: false,
        }
    }
}

/// Seam between the upload pipeline and the compressor. An `Err` tells the
/// caller to continue with the original blob.
pub trait Compress: Send + Sync {
    fn compress(&self, data: Bytes, mime_type: &str) -> Result<CompressedArtifact>;
}

/// Normalizes image artifacts under size/dimension constraints
#[derive(Debug, Clone, Default)]
pub struct ArtifactCompressor {
    options: CompressionOptions,
}

impl ArtifactCompressor {
    pub fn new(options: CompressionOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompressionOptions {
        &self.options
    }

    /// Compress an artifact. Non-image input passes through byte-identical and
    /// undecodable images fall back to the original blob.
    pub fn compress_artifact(&self, data: Bytes, mime_type: &str) -> CompressedArtifact {
        if !is_image_mime_type(mime_type) {
            return CompressedArtifact::original(data, mime_type);
        }

        match self.try_compress(&data) {
            Ok(Some(out)) => {
                tracing::debug!(
                    original_bytes = data.len(),
                    compressed_bytes = out.data.len(),
                    mime_type = %out.mime_type,
                    "Image compressed"
                );
                out
            }
            Ok(None) => CompressedArtifact::original(data, mime_type),
            Err(e) => {
                tracing::warn!(error = %e, mime_type, "Image compression failed, using original");
                CompressedArtifact::original(data, mime_type)
            }
        }
    }

    /// Returns `None` when the original is already the better result.
    fn try_compress(&self, data: &[u8]) -> Result<Option<CompressedArtifact>> {
        let mut decoder = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .context("Failed to guess image format")?
            .into_decoder()
            .context("Failed to create image decoder")?;
        let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
        let mut img = DynamicImage::from_decoder(decoder).context("Failed to decode image")?;

        // The re-encode drops EXIF, so bake the camera rotation into the pixels
        if orientation != Orientation::NoTransforms {
            tracing::debug!(orientation = ?orientation, "Applying EXIF orientation");
            img.apply_orientation(orientation);
        }

        let (orig_width, orig_height) = img.dimensions();
        let fits = orig_width <= self.options.max_width && orig_height <= self.options.max_height;
        let img = if fits {
            img
        } else {
            img.resize(
                self.options.max_width,
                self.options.max_height,
                FilterType::Triangle,
            )
        };

        let format = FormatSelector::select_format(&img);
        let encoded = ImageCompressor::compress_within(
            &img,
            format,
            self.options.quality,
            self.options.max_size_bytes,
        )?;

        if fits && encoded.len() >= data.len() {
            return Ok(None);
        }

        Ok(Some(CompressedArtifact {
            data: encoded,
            mime_type: format.to_mime_type().to_string(),
            compressed: true,
        }))
    }
}

impl Compress for ArtifactCompressor {
    fn compress(&self, data: Bytes, mime_type: &str) -> Result<CompressedArtifact> {
        Ok(self.compress_artifact(data, mime_type))
    }
}

/// Encoding primitives
pub struct ImageCompressor;

impl ImageCompressor {
    /// Encode at `quality`, stepping quality down and then dimensions down until
    /// the output fits `max_size_bytes`. Returns the smallest encoding seen when
    /// nothing fits.
    pub fn compress_within(
        img: &DynamicImage,
        format: OutputFormat,
        quality: f32,
        max_size_bytes: u64,
    ) -> Result<Bytes> {
        let mut quality = quality.clamp(MIN_QUALITY, 1.0);
        let mut current = img.clone();
        let mut best = Self::compress(&current, format, quality)?;

        while best.len() as u64 > max_size_bytes {
            let (width, height) = current.dimensions();
            if format == OutputFormat::Jpeg && quality > MIN_QUALITY + f32::EPSILON {
                quality = (quality - QUALITY_STEP).max(MIN_QUALITY);
            } else if width.max(height) > MIN_DIMENSION {
                let new_width = ((width as f32 * DOWNSCALE_FACTOR) as u32).max(1);
                let new_height = ((height as f32 * DOWNSCALE_FACTOR) as u32).max(1);
                current = current.resize_exact(new_width, new_height, FilterType::Triangle);
            } else {
                break;
            }

            let candidate = Self::compress(&current, format, quality)?;
            if candidate.len() < best.len() {
                best = candidate;
            }
        }

        Ok(best)
    }

    pub fn compress(img: &DynamicImage, format: OutputFormat, quality: f32) -> Result<Bytes> {
        match format {
            OutputFormat::Jpeg => Self::compress_jpeg(img, quality),
            OutputFormat::Png => Self::compress_png(img),
        }
    }

    fn compress_jpeg(img: &DynamicImage, quality: f32) -> Result<Bytes> {
        let rgb_img = img.to_rgb8();
        let quality = (quality * 100.0).round().clamp(1.0, 100.0) as u8;

        let mut buffer = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        encoder
            .encode_image(&rgb_img)
            .context("Failed to encode JPEG")?;

        Ok(Bytes::from(buffer))
    }

    fn compress_png(img: &DynamicImage) -> Result<Bytes> {
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);

        img.write_to(&mut cursor, ImageFormat::Png)
            .context("Failed to encode PNG")?;

        Ok(Bytes::from(buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn noise_image(width: u32, height: u32) -> DynamicImage {
        let mut state: u32 = 0x9e37_79b9;
        let mut img = RgbImage::new(width, height);
        for pixel in img.pixels_mut() {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            *pixel = Rgb([state as u8, (state >> 8) as u8, (state >> 16) as u8]);
        }
        DynamicImage::ImageRgb8(img)
    }

    fn encode(img: &DynamicImage, format: ImageFormat) -> Bytes {
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
        Bytes::from(buffer)
    }

    fn encode_jpeg(img: &DynamicImage, quality: u8) -> Bytes {
        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, quality)
            .encode_image(&img.to_rgb8())
            .unwrap();
        Bytes::from(buffer)
    }

    #[test]
    fn test_non_image_passes_through() {
        let compressor = ArtifactCompressor::default();
        let data = Bytes::from_static(b"%PDF-1.7 not an image");
        let out = compressor.compress_artifact(data.clone(), "application/pdf");
        assert_eq!(out.data, data);
        assert_eq!(out.mime_type, "application/pdf");
        assert!(!out.compressed);
    }

    #[test]
    fn test_undecodable_image_falls_back_to_original() {
        let compressor = ArtifactCompressor::default();
        let data = Bytes::from_static(b"definitely not a jpeg");
        let out = compressor.compress_artifact(data.clone(), "image/jpeg");
        assert_eq!(out.data, data);
        assert_eq!(out.mime_type, "image/jpeg");
        assert!(!out.compressed);
    }

    #[test]
    fn test_large_image_fits_size_cap() {
        let options = CompressionOptions {
            max_size_bytes: 200 * 1024,
            ..CompressionOptions::default()
        };
        let compressor = ArtifactCompressor::new(options);
        let input = encode_jpeg(&noise_image(800, 600), 100);
        assert!(input.len() as u64 > options.max_size_bytes);

        let out = compressor.compress_artifact(input.clone(), "image/jpeg");
        assert!(out.compressed);
        assert!(out.data.len() as u64 <= options.max_size_bytes);
        assert!(out.data.len() <= input.len());
        assert_eq!(out.mime_type, "image/jpeg");
    }

    #[test]
    fn test_oversized_dimensions_are_scaled_preserving_aspect() {
        let options = CompressionOptions {
            max_width: 200,
            max_height: 200,
            ..CompressionOptions::default()
        };
        let compressor = ArtifactCompressor::new(options);
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(800, 200, Rgb([10, 120, 200])));
        let out = compressor.compress_artifact(encode(&img, ImageFormat::Png), "image/png");

        let decoded = image::load_from_memory(&out.data).unwrap();
        assert_eq!(decoded.dimensions(), (200, 50));
    }

    /// Splice an EXIF APP1 segment carrying `orientation` right after SOI.
    fn with_exif_orientation(jpeg: &[u8], orientation: u16) -> Bytes {
        let mut tiff = b"MM\x00\x2a\x00\x00\x00\x08".to_vec();
        tiff.extend_from_slice(&1u16.to_be_bytes());
        tiff.extend_from_slice(&0x0112u16.to_be_bytes());
        tiff.extend_from_slice(&3u16.to_be_bytes());
        tiff.extend_from_slice(&1u32.to_be_bytes());
        tiff.extend_from_slice(&orientation.to_be_bytes());
        tiff.extend_from_slice(&[0, 0]);
        tiff.extend_from_slice(&0u32.to_be_bytes());

        let mut payload = b"Exif\x00\x00".to_vec();
        payload.extend_from_slice(&tiff);

        let mut out = jpeg[..2].to_vec();
        out.extend_from_slice(&[0xff, 0xe1]);
        out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(&payload);
        out.extend_from_slice(&jpeg[2..]);
        Bytes::from(out)
    }

    #[test]
    fn test_exif_rotation_is_applied_before_fitting() {
        let options = CompressionOptions {
            max_width: 200,
            max_height: 200,
            ..CompressionOptions::default()
        };
        let compressor = ArtifactCompressor::new(options);
        let landscape = DynamicImage::ImageRgb8(RgbImage::from_pixel(400, 200, Rgb([90, 90, 90])));
        let input = with_exif_orientation(&encode_jpeg(&landscape, 90), 6);

        let mut decoder = ImageReader::new(Cursor::new(&input[..]))
            .with_guessed_format()
            .unwrap()
            .into_decoder()
            .unwrap();
        assert_eq!(decoder.orientation().unwrap(), Orientation::Rotate90);
        drop(decoder);

        let out = compressor.compress_artifact(input, "image/jpeg");
        assert!(out.compressed);

        // Portrait after rotation, and the output carries no rotation flag
        let decoded = image::load_from_memory(&out.data).unwrap();
        assert_eq!(decoded.dimensions(), (100, 200));
        let mut decoder = ImageReader::new(Cursor::new(&out.data[..]))
            .with_guessed_format()
            .unwrap()
            .into_decoder()
            .unwrap();
        assert_eq!(decoder.orientation().unwrap(), Orientation::NoTransforms);
    }

    #[test]
    fn test_output_never_larger_than_fitting_input() {
        let compressor = ArtifactCompressor::default();
        let input = encode_jpeg(&noise_image(64, 64), 10);
        let out = compressor.compress_artifact(input.clone(), "image/jpeg");
        assert!(out.data.len() <= input.len());
    }

    #[test]
    fn test_transparent_image_stays_png() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 0])));
        assert_eq!(FormatSelector::select_format(&img), OutputFormat::Png);

        let opaque =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(100, 100, Rgba([255, 0, 0, 255])));
        assert_eq!(FormatSelector::select_format(&opaque), OutputFormat::Jpeg);
    }

    #[test]
    fn test_compress_within_returns_best_effort_when_cap_unreachable() {
        let img = noise_image(128, 128);
        let out = ImageCompressor::compress_within(&img, OutputFormat::Jpeg, 0.8, 1).unwrap();
        assert!(!out.is_empty());
        let decoded = image::load_from_memory(&out).unwrap();
        assert!(decoded.width() <= MIN_DIMENSION);
    }

    #[test]
    fn test_output_format_to_mime_type() {
        assert_eq!(OutputFormat::Jpeg.to_mime_type(), "image/jpeg");
        assert_eq!(OutputFormat::Png.to_mime_type(), "image/png");
    }

    #[test]
    fn test_options_from_config() {
        let config = CaptureConfig {
            image_max_width: 1024,
            image_quality: 0.6,
            image_max_size_mb: 2,
            ..CaptureConfig::default()
        };
        let options = CompressionOptions::from(&config);
        assert_eq!(options.max_width, 1024);
        assert_eq!(options.max_height, 1920);
        assert_eq!(options.quality, 0.6);
        assert_eq!(options.max_size_bytes, 2 * 1024 * 1024);
    }
}
