//! Non-committing size previews.

use serde::Serialize;
use tracing::debug;

use crate::core::ConversionRecord;
use crate::processing::{Pipeline, Quality};
use crate::utils::{ConverterResult, format_kb};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AdvisoryNote {
    /// Projected output is no larger than the source
    Gain,
    /// Projected output exceeds the source; the original size is displayed
    NoGain,
}

impl AdvisoryNote {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Gain => "smaller than original",
            Self::NoGain => "no gain, falls back to original size",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    pub quality: Quality,
    /// Size the encoder actually produced at `quality`
    pub projected_bytes: usize,
    pub original_bytes: usize,
    pub note: AdvisoryNote,
}

impl Estimate {
    pub fn from_sizes(quality: Quality, projected_bytes: usize, original_bytes: usize) -> Self {
        let note = if projected_bytes > original_bytes {
            AdvisoryNote::NoGain
        } else {
            AdvisoryNote::Gain
        };
        Self { quality, projected_bytes, original_bytes, note }
    }

    /// Size to show the user: never more than the original.
    pub fn displayed_bytes(&self) -> usize {
        match self.note {
            AdvisoryNote::Gain => self.projected_bytes,
            AdvisoryNote::NoGain => self.original_bytes,
        }
    }

    /// `12.34 KB`, or `56.78 KB (no gain)` when the encode would inflate.
    pub fn display(&self) -> String {
        let size = format_kb(self.displayed_bytes() as u64);
        match self.note {
            AdvisoryNote::Gain => size,
            AdvisoryNote::NoGain => format!("{} (no gain)", size),
        }
    }
}

/// Re-encodes a record at a candidate quality and reports the size.
///
/// The record is only read; the produced bytes are dropped on return.
#[derive(Clone)]
pub struct QualityEstimator {
    pipeline: Pipeline,
}

impl QualityEstimator {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    pub async fn estimate(
        &self,
        record: &ConversionRecord,
        candidate: Quality,
    ) -> ConverterResult<Estimate> {
        let preview = self.pipeline.reencode(record, candidate).await?;
        let estimate = Estimate::from_sizes(
            candidate,
            preview.byte_length(),
            record.source().byte_length(),
        );
        debug!(
            "Estimate for '{}' at {}: {} ({})",
            record.name(),
            candidate,
            estimate.display(),
            estimate.note.message()
        );
        Ok(estimate)
    }
}
