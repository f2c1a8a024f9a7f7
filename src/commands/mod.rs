//! Entry points for collaborators that work with files on disk.
//!
//! - [`collect_inputs`]: expand directories into supported image files
//! - [`convert_files`]: read and ingest a set of files
//! - [`apply_quality_all`]: re-commit every record at one quality
//! - [`estimate_sweep`]: preview every slider stop for one record
//! - [`export_archive`] / [`export_separate`]: write the results out

mod convert;

pub use convert::*;
