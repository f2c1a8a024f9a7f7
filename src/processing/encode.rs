//! Quality-parameterized lossy encoding of the canonical buffer.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{EncodedResult, PixelBuffer};
use crate::processing::Quality;
use crate::utils::{ConverterError, ConverterResult};

/// Largest side libwebp accepts.
pub const WEBP_MAX_DIMENSION: u32 = 16_383;

/// Output encoding produced by the converter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    #[default]
    WebP,
}

impl TargetFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::WebP => "webp",
        }
    }
}

/// Turns a [`PixelBuffer`] into target-format bytes at a given quality.
///
/// The quality is used exactly as passed; clamping is the caller's job.
/// Output is byte-stable for identical `(buffer, quality)` within one build of
/// the encoder library, not across versions.
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    target: TargetFormat,
}

impl Encoder {
    pub fn new(target: TargetFormat) -> Self {
        Self { target }
    }

    pub fn target(&self) -> TargetFormat {
        self.target
    }

    pub fn encode(&self, buffer: &PixelBuffer, quality: Quality) -> ConverterResult<EncodedResult> {
        if !buffer.is_well_formed() {
            return Err(ConverterError::encode(format!(
                "Cannot encode a {}×{} buffer holding {} bytes",
                buffer.width,
                buffer.height,
                buffer.data.len()
            )));
        }

        if buffer.width > WEBP_MAX_DIMENSION || buffer.height > WEBP_MAX_DIMENSION {
            return Err(ConverterError::encode(format!(
                "{}×{} exceeds the WebP maximum of {}",
                buffer.width, buffer.height, WEBP_MAX_DIMENSION
            )));
        }

        let encoded = match self.target {
            TargetFormat::WebP => {
                webp::Encoder::from_rgba(&buffer.data, buffer.width, buffer.height)
                    .encode_simple(false, quality.as_factor())
                    .map_err(|e| ConverterError::encode(format!("WebP encode failed: {:?}", e)))?
                    .to_vec()
            }
        };

        if encoded.is_empty() {
            return Err(ConverterError::encode("Encoder produced no output"));
        }

        debug!(
            "Encoded {}×{} at quality {} → {} bytes",
            buffer.width,
            buffer.height,
            quality,
            encoded.len()
        );

        Ok(EncodedResult::new(encoded, quality))
    }
}
