//! ZIP packaging of a session's committed encodings.

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Write};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::core::{ConversionRecord, Download};
use crate::processing::TargetFormat;
use crate::utils::{ConverterError, ConverterResult, base_name};
use crate::worker::{Stage, WorkerPool};

/// Layout of the exported archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArchiveSettings {
    /// Single top-level folder holding every entry
    pub folder: String,
    /// Suggested download name of the archive
    pub file_name: String,
    /// Append `-2`, `-3`, ... to colliding entry names instead of overwriting
    pub deduplicate_names: bool,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            folder: "converted".to_string(),
            file_name: "converted_images.zip".to_string(),
            deduplicate_names: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchArchiver {
    settings: ArchiveSettings,
    target: TargetFormat,
}

impl BatchArchiver {
    pub fn new(settings: ArchiveSettings, target: TargetFormat) -> Self {
        Self { settings, target }
    }

    pub fn settings(&self) -> &ArchiveSettings {
        &self.settings
    }

    /// Entry file names, one per record and in record order.
    ///
    /// Without de-duplication, colliding names repeat and the later record
    /// wins when the archive is written.
    pub fn entry_names(&self, records: &[ConversionRecord]) -> Vec<String> {
        let ext = self.target.extension();
        if !self.settings.deduplicate_names {
            return records
                .iter()
                .map(|r| format!("{}.{}", base_name(r.name()), ext))
                .collect();
        }

        let mut taken = HashSet::new();
        records
            .iter()
            .map(|r| {
                let base = base_name(r.name());
                let mut candidate = format!("{}.{}", base, ext);
                let mut n = 2;
                while taken.contains(&candidate) {
                    candidate = format!("{}-{}.{}", base, n, ext);
                    n += 1;
                }
                taken.insert(candidate.clone());
                candidate
            })
            .collect()
    }

    /// Builds the archive from an already-taken snapshot.
    ///
    /// Every record is checked before anything is written, so a failure never
    /// yields a partial archive.
    pub fn archive(&self, records: &[ConversionRecord]) -> ConverterResult<Download> {
        if let Some(missing) = records.iter().find(|r| r.committed().byte_length() == 0) {
            return Err(ConverterError::archive(format!(
                "No committed bytes for '{}' ({})",
                missing.name(),
                missing.id()
            )));
        }

        let entries = self.collapse_entries(records);
        let folder = format!("{}/", self.settings.folder.trim_matches('/'));

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.add_directory(folder.as_str(), entry_options())?;
        for (name, record) in &entries {
            writer.start_file(format!("{}{}", folder, name), entry_options())?;
            writer
                .write_all(record.committed().bytes())
                .map_err(|e| ConverterError::archive(format!("Failed to write '{}': {}", name, e)))?;
        }
        let bytes = writer.finish()?.into_inner();

        info!(
            "Archived {} entr{} into '{}' ({} bytes)",
            entries.len(),
            if entries.len() == 1 { "y" } else { "ies" },
            self.settings.file_name,
            bytes.len()
        );

        Ok(Download {
            file_name: self.settings.file_name.clone(),
            bytes,
        })
    }

    /// Pairs names with records. Repeated names keep the first position and the
    /// last record's bytes.
    fn collapse_entries<'a>(&self, records: &'a [ConversionRecord]) -> Vec<(String, &'a ConversionRecord)> {
        let mut entries: Vec<(String, &ConversionRecord)> = Vec::with_capacity(records.len());
        let mut positions: HashMap<String, usize> = HashMap::new();

        for (name, record) in self.entry_names(records).into_iter().zip(records) {
            match positions.get(&name) {
                Some(&idx) => {
                    debug!("Entry '{}' overwritten by '{}'", name, record.name());
                    entries[idx].1 = record;
                }
                None => {
                    positions.insert(name.clone(), entries.len());
                    entries.push((name, record));
                }
            }
        }
        entries
    }
}

/// Entries are stored as-is: the payload is already compressed, and a fixed
/// timestamp keeps identical snapshots byte-identical.
fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(DateTime::default())
}

/// A snapshot taken at export start, built into an archive off the async runtime.
///
/// Later session mutations do not reach the snapshot.
pub struct PendingArchive {
    records: Vec<ConversionRecord>,
    archiver: BatchArchiver,
    pool: WorkerPool,
    shutdown: watch::Receiver<bool>,
}

impl PendingArchive {
    pub fn new(
        records: Vec<ConversionRecord>,
        archiver: BatchArchiver,
        pool: WorkerPool,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self { records, archiver, pool, shutdown }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub async fn finish(self) -> ConverterResult<Download> {
        let Self { records, archiver, pool, mut shutdown } = self;
        let subject = archiver.settings.file_name.clone();
        let build = pool.run(Stage::Archive, &subject, move || archiver.archive(&records));

        tokio::select! {
            biased;
            _ = shutdown.wait_for(|closed| *closed) => {
                Err(ConverterError::cancelled("Session closed during export"))
            }
            result = build => Ok(result?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EncodedResult, RecordId, SourceImage};
    use crate::processing::Quality;
    use std::io::Read;
    use zip::ZipArchive;

    fn record(seq: u64, name: &str, payload: &[u8]) -> ConversionRecord {
        ConversionRecord::new(
            RecordId::new(seq),
            SourceImage::new(name, vec![0; 16]),
            EncodedResult::new(payload.to_vec(), Quality::DEFAULT),
            None,
        )
    }

    fn entries_of(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut data = Vec::new();
                file.read_to_end(&mut data).unwrap();
                (file.name().to_string(), data)
            })
            .collect()
    }

    #[test]
    fn test_layout_and_order() {
        let archiver = BatchArchiver::new(ArchiveSettings::default(), TargetFormat::WebP);
        let records = vec![record(1, "cat.png", b"meow"), record(2, "dog.jpg", b"woof")];

        let download = archiver.archive(&records).unwrap();
        assert_eq!(download.file_name, "converted_images.zip");

        let entries = entries_of(&download.bytes);
        let names: Vec<_> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["converted/", "converted/cat.webp", "converted/dog.webp"]);
        assert_eq!(entries[1].1, b"meow");
        assert_eq!(entries[2].1, b"woof");
    }

    #[test]
    fn test_collisions_get_numeric_suffix() {
        let archiver = BatchArchiver::new(ArchiveSettings::default(), TargetFormat::WebP);
        let records = vec![
            record(1, "photo.png", b"a"),
            record(2, "photo.jpg", b"b"),
            record(3, "photo-2.png", b"c"),
        ];
        assert_eq!(
            archiver.entry_names(&records),
            vec!["photo.webp", "photo-2.webp", "photo-2-2.webp"]
        );

        let entries = entries_of(&archiver.archive(&records).unwrap().bytes);
        assert_eq!(entries.len(), 4);
    }

    #[test]
    fn test_collisions_overwrite_without_dedup() {
        let settings = ArchiveSettings {
            deduplicate_names: false,
            ..ArchiveSettings::default()
        };
        let archiver = BatchArchiver::new(settings, TargetFormat::WebP);
        let records = vec![
            record(1, "photo.png", b"first"),
            record(2, "other.png", b"other"),
            record(3, "photo.jpg", b"second"),
        ];

        let entries = entries_of(&archiver.archive(&records).unwrap().bytes);
        let names: Vec<_> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["converted/", "converted/photo.webp", "converted/other.webp"]);
        assert_eq!(entries[1].1, b"second");
    }

    #[test]
    fn test_missing_bytes_aborts_whole_archive() {
        let archiver = BatchArchiver::new(ArchiveSettings::default(), TargetFormat::WebP);
        let records = vec![record(1, "cat.png", b"meow"), record(2, "dog.png", b"")];
        let err = archiver.archive(&records).unwrap_err();
        assert!(matches!(err, ConverterError::Archive(msg) if msg.contains("dog.png")));
    }

    #[test]
    fn test_empty_snapshot_has_only_folder() {
        let archiver = BatchArchiver::new(ArchiveSettings::default(), TargetFormat::WebP);
        let entries = entries_of(&archiver.archive(&[]).unwrap().bytes);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "converted/");
    }

    #[test]
    fn test_identical_snapshots_are_byte_identical() {
        let archiver = BatchArchiver::new(ArchiveSettings::default(), TargetFormat::WebP);
        let records = vec![record(1, "cat.png", b"meow")];
        assert_eq!(
            archiver.archive(&records).unwrap().bytes,
            archiver.archive(&records).unwrap().bytes
        );
    }

    #[tokio::test]
    async fn test_pending_archive_cancelled_on_shutdown() {
        let archiver = BatchArchiver::new(ArchiveSettings::default(), TargetFormat::WebP);
        let (tx, rx) = watch::channel(false);
        let pending = PendingArchive::new(vec![record(1, "cat.png", b"meow")], archiver, WorkerPool::default(), rx);
        assert_eq!(pending.len(), 1);
        tx.send(true).unwrap();
        let err = pending.finish().await.unwrap_err();
        assert!(matches!(err, ConverterError::Cancelled(_)));
    }
}
