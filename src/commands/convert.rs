use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::core::{ConversionSummary, IngestFailure, IngestReport, RecordId, SessionHandle};
use crate::processing::Estimate;
use crate::utils::{ConverterError, ConverterResult, SourceFormat, read_source, write_download};

/// Expands directories (one level) into the supported image files they hold.
///
/// Explicit file paths are kept as given, even with an unknown extension, so
/// the decoder can report them.
pub async fn collect_inputs(paths: &[PathBuf]) -> ConverterResult<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for path in paths {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| ConverterError::IO(format!("Failed to stat {}: {}", path.display(), e)))?;

        if !metadata.is_dir() {
            inputs.push(path.clone());
            continue;
        }

        let mut found = Vec::new();
        let mut entries = tokio::fs::read_dir(path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let candidate = entry.path();
            if entry.file_type().await?.is_file() && has_supported_extension(&candidate) {
                found.push(candidate);
            }
        }
        found.sort();
        debug!("Found {} image(s) in {}", found.len(), path.display());
        inputs.extend(found);
    }
    Ok(inputs)
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.parse::<SourceFormat>().is_ok())
}

/// Reads every path and ingests the readable ones concurrently.
///
/// Unreadable files are reported alongside decode failures; they never
/// abort the batch.
pub async fn convert_files(session: &SessionHandle, paths: &[PathBuf]) -> ConverterResult<IngestReport> {
    let mut sources = Vec::with_capacity(paths.len());
    let mut unreadable = Vec::new();

    for path in paths {
        match read_source(path).await {
            Ok(source) => sources.push(source),
            Err(error) => {
                warn!("Skipping {}: {}", path.display(), error);
                unreadable.push(IngestFailure {
                    name: path.display().to_string(),
                    error,
                });
            }
        }
    }

    let mut report = session.ingest_batch(sources).await?;
    report.failed.extend(unreadable);
    Ok(report)
}

/// Commits `quality` to every record, in session order.
pub async fn apply_quality_all(session: &SessionHandle, quality: f32) -> ConverterResult<Vec<ConversionSummary>> {
    let ids: Vec<RecordId> = session.records().await.iter().map(|r| r.id()).collect();
    let mut summaries = Vec::with_capacity(ids.len());
    for id in ids {
        summaries.push(session.apply_quality(id, quality).await?);
    }
    info!("Applied quality {:.2} to {} record(s)", quality, summaries.len());
    Ok(summaries)
}

/// Estimates `id` at every stop of the session's quality policy, ascending.
pub async fn estimate_sweep(session: &SessionHandle, id: RecordId) -> ConverterResult<Vec<Estimate>> {
    let steps = session.config().quality_policy.steps();
    let mut estimates = Vec::with_capacity(steps.len());
    for quality in steps {
        estimates.push(session.estimate(id, quality.value()).await?);
    }
    Ok(estimates)
}

/// Writes the session archive into `dir`.
pub async fn export_archive(session: &SessionHandle, dir: impl AsRef<Path>) -> ConverterResult<PathBuf> {
    let download = session.export().await?;
    let path = write_download(dir, &download).await?;
    info!("Wrote {} ({} bytes)", path.display(), download.bytes.len());
    Ok(path)
}

/// Writes one file per record into `dir`.
pub async fn export_separate(session: &SessionHandle, dir: impl AsRef<Path>) -> ConverterResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut written = Vec::new();
    for download in session.downloads().await {
        written.push(write_download(dir, &download).await?);
    }
    info!("Wrote {} file(s) to {}", written.len(), dir.display());
    Ok(written)
}
