use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

/// Deterministic RGB noise. Noise compresses badly, so small images still
/// produce large files.
pub fn noise_image(width: u32, height: u32) -> DynamicImage {
    let mut state: u32 = 0x2545_f491;
    let mut img = RgbImage::new(width, height);
    for pixel in img.pixels_mut() {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        *pixel = Rgb([state as u8, (state >> 8) as u8, (state >> 16) as u8]);
    }
    DynamicImage::ImageRgb8(img)
}

pub fn noise_jpeg(width: u32, height: u32, quality: u8) -> Vec<u8> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .encode_image(&noise_image(width, height).to_rgb8())
        .expect("encode jpeg");
    buffer
}

pub fn small_png() -> Vec<u8> {
    let mut buffer = Vec::new();
    noise_image(16, 16)
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .expect("encode png");
    buffer
}

pub fn image_dimensions(data: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(data).expect("decode");
    (img.width(), img.height())
}
