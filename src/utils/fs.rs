use std::path::{Path, PathBuf};
use tokio::fs;
use crate::core::{Download, SourceImage};
use crate::utils::{ConverterError, ConverterResult};

/// Reads a file from disk into a [`SourceImage`] named after its final path component.
pub async fn read_source(path: impl AsRef<Path>) -> ConverterResult<SourceImage> {
    let path = path.as_ref();
    let bytes = fs::read(path)
        .await
        .map_err(|e| ConverterError::IO(format!("Failed to read {}: {}", path.display(), e)))?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| ConverterError::validation(
            format!("Path has no file name: {}", path.display())
        ))?;

    Ok(SourceImage::new(name, bytes))
}

/// Writes a download into `dir` under its suggested file name.
pub async fn write_download(dir: impl AsRef<Path>, download: &Download) -> ConverterResult<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).await?;
    let target = dir.join(&download.file_name);
    fs::write(&target, &download.bytes)
        .await
        .map_err(|e| ConverterError::IO(format!("Failed to write {}: {}", target.display(), e)))?;
    Ok(target)
}
