// Module declarations in dependency order
pub mod commands;
pub mod core;
pub mod processing;
pub mod utils;
pub mod worker;

#[cfg(test)]
mod test_support;

// Public exports for external consumers
pub use core::{
    ConversionRecord, ConversionSummary, ConverterConfig, Download, IngestReport, Progress,
    RecordId, SessionHandle, SourceImage,
};
pub use processing::{Estimate, Quality, QualityPolicy};
pub use utils::{ConverterError, ConverterResult};

// The command-line entry point lives in main.rs.
