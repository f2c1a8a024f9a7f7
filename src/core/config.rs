//! Converter settings, loadable from a camelCase JSON file.

use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::processing::{ArchiveSettings, DecodeLimits, Quality, QualityPolicy};
use crate::utils::{ConverterError, ConverterResult, validate_config};

/// Settings for one session. Every field has a default, so a partial file is fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConverterConfig {
    /// Quality of the initial encode at ingestion
    pub default_quality: f32,
    /// Clamp applied to every candidate quality
    pub quality_policy: QualityPolicy,
    /// Decoder memory bounds
    pub limits: DecodeLimits,
    /// Concurrent decode/encode jobs
    pub worker_count: usize,
    /// Budget for a single decode, encode or archive job
    pub operation_timeout_ms: u64,
    /// Keep decoded pixels on the record instead of re-decoding for previews
    pub cache_decoded: bool,
    /// Batch export layout
    pub archive: ArchiveSettings,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            default_quality: 0.9,
            quality_policy: QualityPolicy::default(),
            limits: DecodeLimits::default(),
            worker_count: 4,
            operation_timeout_ms: 30_000,
            cache_decoded: false,
            archive: ArchiveSettings::default(),
        }
    }
}

impl ConverterConfig {
    pub fn from_json(json: &str) -> ConverterResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        validate_config(&config)?;
        Ok(config)
    }

    pub async fn load(path: impl AsRef<Path>) -> ConverterResult<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            ConverterError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_json(&json)?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Ingestion quality after the policy clamp.
    pub fn ingest_quality(&self) -> Quality {
        self.quality_policy.clamp(self.default_quality)
    }
}
