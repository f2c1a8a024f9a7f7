//! Source decoding into the canonical RGBA8 buffer.

use std::io::Cursor;
use image::{ImageError, ImageFormat, ImageReader, Limits};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{PixelBuffer, SourceImage};
use crate::utils::{ConverterError, ConverterResult, SourceFormat};

const CODEC_ALLOC_FLOOR: u64 = 64 * 1024 * 1024;

/// Upper bounds on what the decoder will materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecodeLimits {
    /// Widest accepted image in pixels
    pub max_width: u32,
    /// Tallest accepted image in pixels
    pub max_height: u32,
    /// Budget for the decoded RGBA8 buffer in bytes
    pub max_pixel_bytes: u64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_width: 16_383,
            max_height: 16_383,
            max_pixel_bytes: 512 * 1024 * 1024,
        }
    }
}

/// Turns raster source bytes into a [`PixelBuffer`].
///
/// Side-effect free and deterministic for identical input bytes.
#[derive(Debug, Clone)]
pub struct Decoder {
    limits: DecodeLimits,
}

impl Decoder {
    pub fn new(limits: DecodeLimits) -> Self {
        Self { limits }
    }

    /// Identifies the encoding from magic bytes, ignoring the file name.
    pub fn sniff(bytes: &[u8]) -> ConverterResult<SourceFormat> {
        Self::sniff_formats(bytes).map(|(source, _)| source)
    }

    fn sniff_formats(bytes: &[u8]) -> ConverterResult<(SourceFormat, ImageFormat)> {
        let format = image::guess_format(bytes)
            .map_err(|_| ConverterError::unsupported("Unrecognized image encoding"))?;
        let source = SourceFormat::from_image_format(format).ok_or_else(|| {
            ConverterError::unsupported(format!("{:?} sources are not supported", format))
        })?;
        Ok((source, format))
    }

    pub fn decode_source(&self, source: &SourceImage) -> ConverterResult<PixelBuffer> {
        let buffer = self.decode(source.bytes())?;
        debug!("Decoded '{}': {}×{}", source.name(), buffer.width, buffer.height);
        Ok(buffer)
    }

    pub fn decode(&self, bytes: &[u8]) -> ConverterResult<PixelBuffer> {
        let (_, format) = Self::sniff_formats(bytes)?;

        // Header pass: reject oversized images before allocating pixel memory.
        let (width, height) = ImageReader::with_format(Cursor::new(bytes), format)
            .into_dimensions()
            .map_err(map_image_error)?;
        self.check_dimensions(width, height)?;

        let mut reader = ImageReader::with_format(Cursor::new(bytes), format);
        reader.limits(self.image_limits());
        let image = reader.decode().map_err(map_image_error)?;

        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let buffer = PixelBuffer::new(width, height, rgba.into_raw());

        if !buffer.is_well_formed() {
            return Err(ConverterError::corrupt(format!(
                "Decoded buffer has unexpected shape {}×{} ({} bytes)",
                width,
                height,
                buffer.data.len()
            )));
        }

        Ok(buffer)
    }

    fn check_dimensions(&self, width: u32, height: u32) -> ConverterResult<()> {
        if width == 0 || height == 0 {
            return Err(ConverterError::corrupt(format!(
                "Image reports empty dimensions {}×{}", width, height
            )));
        }

        if width > self.limits.max_width || height > self.limits.max_height {
            return Err(ConverterError::too_large(format!(
                "{}×{} exceeds the {}×{} limit",
                width, height, self.limits.max_width, self.limits.max_height
            )));
        }

        let pixel_bytes = PixelBuffer::expected_len(width, height)
            .map(|len| len as u64)
            .unwrap_or(u64::MAX);
        if pixel_bytes > self.limits.max_pixel_bytes {
            return Err(ConverterError::too_large(format!(
                "{}×{} needs {} bytes, budget is {}",
                width, height, pixel_bytes, self.limits.max_pixel_bytes
            )));
        }

        Ok(())
    }

    /// Limits handed to the codec itself. The exact pixel budget is enforced by
    /// the header pass; the allocation cap leaves room for codec scratch buffers.
    fn image_limits(&self) -> Limits {
        let mut limits = Limits::default();
        limits.max_image_width = Some(self.limits.max_width);
        limits.max_image_height = Some(self.limits.max_height);
        limits.max_alloc = Some(self.limits.max_pixel_bytes.max(CODEC_ALLOC_FLOOR));
        limits
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(DecodeLimits::default())
    }
}

fn map_image_error(err: ImageError) -> ConverterError {
    match err {
        ImageError::Unsupported(e) => ConverterError::unsupported(e.to_string()),
        ImageError::Limits(e) => ConverterError::too_large(e.to_string()),
        ImageError::Decoding(e) => ConverterError::corrupt(e.to_string()),
        // Truncated streams surface as IO errors from the in-memory cursor
        ImageError::IoError(e) => ConverterError::corrupt(e.to_string()),
        other => ConverterError::corrupt(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{jpeg_bytes, png_bytes};

    #[test]
    fn test_decodes_png_to_rgba() {
        let buffer = Decoder::default().decode(&png_bytes(24, 16, 1)).unwrap();
        assert_eq!((buffer.width, buffer.height), (24, 16));
        assert_eq!(buffer.data.len(), 24 * 16 * 4);
    }

    #[test]
    fn test_decodes_jpeg_to_rgba() {
        let buffer = Decoder::default().decode(&jpeg_bytes(32, 8, 2)).unwrap();
        assert_eq!((buffer.width, buffer.height), (32, 8));
        assert!(buffer.is_well_formed());
    }

    #[test]
    fn test_decode_is_deterministic() {
        let bytes = png_bytes(16, 16, 3);
        let decoder = Decoder::default();
        assert_eq!(decoder.decode(&bytes).unwrap(), decoder.decode(&bytes).unwrap());
    }

    #[test]
    fn test_unrecognized_bytes() {
        let err = Decoder::default().decode(b"definitely not pixels").unwrap_err();
        assert!(matches!(err, ConverterError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_truncated_png_is_corrupt() {
        let bytes = png_bytes(64, 64, 4);
        let truncated = &bytes[..bytes.len() / 2];
        let err = Decoder::default().decode(truncated).unwrap_err();
        assert!(matches!(err, ConverterError::CorruptImage(_)), "got {err:?}");
    }

    #[test]
    fn test_dimension_limit() {
        let decoder = Decoder::new(DecodeLimits {
            max_width: 8,
            max_height: 8,
            ..DecodeLimits::default()
        });
        let err = decoder.decode(&png_bytes(16, 4, 5)).unwrap_err();
        assert!(matches!(err, ConverterError::DimensionsTooLarge(_)));
    }

    #[test]
    fn test_pixel_budget() {
        let decoder = Decoder::new(DecodeLimits {
            max_pixel_bytes: 10 * 10 * 4,
            ..DecodeLimits::default()
        });
        assert!(decoder.decode(&png_bytes(10, 10, 6)).is_ok());
        let err = decoder.decode(&png_bytes(11, 10, 6)).unwrap_err();
        assert!(matches!(err, ConverterError::DimensionsTooLarge(_)));
    }

    #[test]
    fn test_sniff_ignores_name() {
        assert_eq!(Decoder::sniff(&png_bytes(2, 2, 7)).unwrap(), SourceFormat::Png);
        assert_eq!(Decoder::sniff(&jpeg_bytes(2, 2, 7)).unwrap(), SourceFormat::Jpeg);
    }
}
