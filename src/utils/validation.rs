use crate::core::{ConverterConfig, SourceImage};
use crate::processing::QualityPolicy;
use crate::utils::{ConverterError, ConverterResult};

/// Validates an ingestion input before it is handed to the decoder
pub fn validate_source(source: &SourceImage) -> ConverterResult<()> {
    if source.name().trim().is_empty() {
        return Err(ConverterError::validation("Source name cannot be empty"));
    }

    if source.byte_length() == 0 {
        return Err(ConverterError::validation(
            format!("Source file is empty: {}", source.name())
        ));
    }

    Ok(())
}

/// Validates converter settings
pub fn validate_config(config: &ConverterConfig) -> ConverterResult<()> {
    let q = config.default_quality;
    if !q.is_finite() || q < QualityPolicy::MIN || q > 1.0 {
        return Err(ConverterError::config(
            format!("Invalid default quality: {}. Must be between {} and 1.0", q, QualityPolicy::MIN)
        ));
    }

    if config.limits.max_width == 0 || config.limits.max_height == 0 {
        return Err(ConverterError::config("Maximum dimensions cannot be 0"));
    }

    if config.limits.max_pixel_bytes < 4 {
        return Err(ConverterError::config("Pixel memory budget must hold at least one pixel"));
    }

    if config.worker_count == 0 {
        return Err(ConverterError::config("Worker count cannot be 0"));
    }

    if config.operation_timeout_ms == 0 {
        return Err(ConverterError::config("Operation timeout cannot be 0"));
    }

    let folder = config.archive.folder.trim_matches('/');
    if folder.is_empty() || folder.contains("..") {
        return Err(ConverterError::config(
            format!("Invalid archive folder: {:?}", config.archive.folder)
        ));
    }

    if config.archive.file_name.trim().is_empty() {
        return Err(ConverterError::config("Archive file name cannot be empty"));
    }

    Ok(())
}
