//! Core types and session management.
//!
//! - [`SessionHandle`]: the owned, shareable session object with `create`/`destroy`
//! - [`Session`]: ordered records plus the selection, mutated under one lock
//! - [`ConversionRecord`]: one ingested file and its committed encoding
//! - [`ConverterConfig`]: settings for a session
//! - [`Progress`]: batch ingestion progress events

mod config;
mod handles;
mod progress;
mod record;
mod session;
mod state;
mod types;

pub use config::ConverterConfig;
pub use handles::{HandleRegistry, ObjectHandle};
pub use progress::{Progress, ProgressType};
pub use record::{ConversionRecord, RecordId};
pub use session::Session;
pub use state::SessionHandle;
pub use types::{
    CHANNELS, ConversionSummary, Download, EncodedResult, IngestFailure, IngestReport, PixelBuffer,
    SourceImage,
};
