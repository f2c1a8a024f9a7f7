//! In-memory fixture images for unit tests.

use std::io::Cursor;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::core::{PixelBuffer, SourceImage};

/// Smooth gradient with deterministic grain, close enough to a photo for size checks.
pub fn noise_image(width: u32, height: u32, seed: u32) -> RgbaImage {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    RgbaImage::from_fn(width, height, |x, y| {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let grain = (state >> 24) as i32 / 8 - 16;
        let r = (x * 255 / width.max(1)) as i32 + grain;
        let g = (y * 255 / height.max(1)) as i32 - grain;
        let b = ((x + y) * 127 / (width + height).max(1)) as i32 + grain / 2;
        image::Rgba([
            r.clamp(0, 255) as u8,
            g.clamp(0, 255) as u8,
            b.clamp(0, 255) as u8,
            255,
        ])
    })
}

pub fn noise_buffer(width: u32, height: u32, seed: u32) -> PixelBuffer {
    PixelBuffer::new(width, height, noise_image(width, height, seed).into_raw())
}

pub fn png_bytes(width: u32, height: u32, seed: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(noise_image(width, height, seed))
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

pub fn jpeg_bytes(width: u32, height: u32, seed: u32) -> Vec<u8> {
    let rgb = DynamicImage::ImageRgba8(noise_image(width, height, seed)).to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 100)
        .encode_image(&rgb)
        .unwrap();
    out
}

pub fn png_source(name: &str, size: u32, seed: u32) -> SourceImage {
    SourceImage::new(name, png_bytes(size, size, seed))
}
