//! One ingested file and its committed encoding.

use std::fmt;
use std::sync::Arc;
use serde::{Deserialize, Serialize};

use crate::core::{ConversionSummary, EncodedResult, PixelBuffer, SourceImage};
use crate::processing::TargetFormat;
use crate::utils::output_name;

/// Session-unique record id, assigned in append order.
///
/// Names are not unique within a session, so the id never depends on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    pub fn new(seq: u64) -> Self {
        Self(seq)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct ConversionRecord {
    id: RecordId,
    source: SourceImage,
    committed: EncodedResult,
    /// Decoded pixels kept around when caching is enabled
    cached: Option<Arc<PixelBuffer>>,
}

impl ConversionRecord {
    pub(crate) fn new(
        id: RecordId,
        source: SourceImage,
        committed: EncodedResult,
        cached: Option<Arc<PixelBuffer>>,
    ) -> Self {
        Self { id, source, committed, cached }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn source(&self) -> &SourceImage {
        &self.source
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn committed(&self) -> &EncodedResult {
        &self.committed
    }

    pub fn cached_buffer(&self) -> Option<Arc<PixelBuffer>> {
        self.cached.clone()
    }

    /// `<baseName>.<ext>` for a single-file download.
    pub fn output_name(&self, target: TargetFormat) -> String {
        output_name(self.source.name(), target.extension())
    }

    pub fn summary(&self, selected: bool) -> ConversionSummary {
        ConversionSummary::new(
            self.id,
            self.source.name(),
            self.source.byte_length(),
            self.committed.byte_length(),
            self.committed.quality(),
            selected,
        )
    }

    /// Swaps in a new committed result and hands back the previous one.
    pub(crate) fn replace_committed(&mut self, result: EncodedResult) -> EncodedResult {
        std::mem::replace(&mut self.committed, result)
    }
}
