//! Conversion engine: decode once, re-encode at any quality, package results.

mod archive;
mod decode;
mod encode;
mod estimate;
mod pipeline;
mod quality;

pub use archive::{ArchiveSettings, BatchArchiver, PendingArchive};
pub use decode::{DecodeLimits, Decoder};
pub use encode::{Encoder, TargetFormat, WEBP_MAX_DIMENSION};
pub use estimate::{AdvisoryNote, Estimate, QualityEstimator};
pub use pipeline::Pipeline;
pub use quality::{Quality, QualityPolicy};
