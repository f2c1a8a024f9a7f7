//! Core data types flowing between the decoder, encoder, session and archiver.

use std::fmt;
use std::sync::Arc;
use serde::Serialize;
use crate::core::RecordId;
use crate::processing::Quality;
use crate::utils::ConverterError;

/// Bytes channels per pixel of the canonical buffer (RGBA, 8 bits each).
pub const CHANNELS: usize = 4;

/// A file as handed over by the collaborator.
///
/// Immutable after creation; the byte buffer is shared with snapshots and
/// dropped with its owning record.
#[derive(Clone)]
pub struct SourceImage {
    name: String,
    bytes: Arc<[u8]>,
}

impl SourceImage {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: Arc::from(bytes.into()),
        }
    }

    /// Original name, extension included.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn byte_length(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceImage")
            .field("name", &self.name)
            .field("byte_length", &self.bytes.len())
            .finish()
    }
}

/// Canonical decoded form: RGBA8, row-major, no padding.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self { width, height, data }
    }

    /// `width * height * 4`, or `None` on overflow.
    pub fn expected_len(width: u32, height: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(CHANNELS)
    }

    pub fn is_well_formed(&self) -> bool {
        self.width > 0
            && self.height > 0
            && Self::expected_len(self.width, self.height) == Some(self.data.len())
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// Compressed output of one encode at one quality.
#[derive(Clone)]
pub struct EncodedResult {
    bytes: Arc<[u8]>,
    quality: Quality,
}

impl EncodedResult {
    pub fn new(bytes: Vec<u8>, quality: Quality) -> Self {
        Self {
            bytes: Arc::from(bytes),
            quality,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the compressed buffer.
    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn byte_length(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Debug for EncodedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedResult")
            .field("quality", &self.quality)
            .field("byte_length", &self.bytes.len())
            .finish()
    }
}

/// Bytes plus the file name a collaborator should save them under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Size table row for one record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionSummary {
    pub id: RecordId,
    /// Original file name
    pub name: String,
    /// Source size in bytes
    pub original_size: u64,
    /// Committed encoding size in bytes
    pub converted_size: u64,
    /// Quality of the committed encoding
    pub quality: f32,
    /// Bytes saved (negative if the output grew)
    pub saved_bytes: i64,
    /// Saved bytes as a percentage of the original
    pub compression_ratio: f64,
    pub selected: bool,
}

impl ConversionSummary {
    pub fn new(
        id: RecordId,
        name: &str,
        original_size: usize,
        converted_size: usize,
        quality: Quality,
        selected: bool,
    ) -> Self {
        let saved_bytes = original_size as i64 - converted_size as i64;
        let compression_ratio = if original_size > 0 {
            saved_bytes as f64 / original_size as f64 * 100.0
        } else {
            0.0
        };

        Self {
            id,
            name: name.to_string(),
            original_size: original_size as u64,
            converted_size: converted_size as u64,
            quality: quality.value(),
            saved_bytes,
            compression_ratio,
            selected,
        }
    }
}

/// A file skipped during batch ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestFailure {
    pub name: String,
    pub error: ConverterError,
}

/// Per-file outcome of a batch ingestion, in completion order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub ingested: Vec<RecordId>,
    pub failed: Vec<IngestFailure>,
}

impl IngestReport {
    pub fn total(&self) -> usize {
        self.ingested.len() + self.failed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_buffer_shape() {
        assert!(PixelBuffer::new(2, 3, vec![0; 24]).is_well_formed());
        assert!(!PixelBuffer::new(2, 3, vec![0; 23]).is_well_formed());
        assert!(!PixelBuffer::new(0, 3, Vec::new()).is_well_formed());
        assert_eq!(PixelBuffer::expected_len(u32::MAX, u32::MAX), None);
    }

    #[test]
    fn test_summary_ratio() {
        let summary = ConversionSummary::new(RecordId::new(1), "cat.png", 1000, 250, Quality::DEFAULT, true);
        assert_eq!(summary.saved_bytes, 750);
        assert!((summary.compression_ratio - 75.0).abs() < f64::EPSILON);

        let grown = ConversionSummary::new(RecordId::new(2), "tiny.png", 100, 150, Quality::DEFAULT, false);
        assert_eq!(grown.saved_bytes, -50);
        assert!(grown.compression_ratio < 0.0);
    }
}
