//! Owned session object shared by every collaborator.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::core::{
    ConversionRecord, ConversionSummary, ConverterConfig, Download, EncodedResult, IngestFailure,
    IngestReport, ObjectHandle, Progress, ProgressType, RecordId, Session, SourceImage,
};
use crate::processing::{BatchArchiver, Estimate, PendingArchive, Pipeline, QualityEstimator};
use crate::utils::{ConverterError, ConverterResult, validate_config, validate_source};

struct Inner {
    session: Mutex<Session>,
    pipeline: Pipeline,
    estimator: QualityEstimator,
    archiver: BatchArchiver,
    config: ConverterConfig,
    /// Flips to `true` once on destroy
    shutdown: watch::Sender<bool>,
}

/// Cheaply cloneable handle to one conversion session.
///
/// All mutations of the record list and the selection go through a single
/// lock, so no caller observes a half-applied change. Decode and encode work
/// happens outside the lock; results are applied only if the session is still
/// open when the work finishes.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Inner>,
}

impl SessionHandle {
    /// Creates an empty session from validated settings.
    pub fn create(config: ConverterConfig) -> ConverterResult<Self> {
        validate_config(&config)?;

        let pipeline = Pipeline::from_config(&config);
        let estimator = QualityEstimator::new(pipeline.clone());
        let archiver = BatchArchiver::new(config.archive.clone(), pipeline.encoder().target());
        let (shutdown, _) = watch::channel(false);

        debug!(
            "Session created (quality {}, policy {:?}, {} workers)",
            config.ingest_quality(),
            config.quality_policy,
            config.worker_count
        );

        Ok(Self {
            inner: Arc::new(Inner {
                session: Mutex::new(Session::new()),
                pipeline,
                estimator,
                archiver,
                config,
                shutdown,
            }),
        })
    }

    /// Tears the session down.
    ///
    /// In-flight operations resolve to `Cancelled` without touching the
    /// session; every record and preview handle is released.
    pub async fn destroy(&self) {
        if self.inner.shutdown.send_replace(true) {
            return;
        }
        self.inner.pipeline.pool().close();

        let mut session = self.inner.session.lock().await;
        let dropped = session.len();
        session.clear();
        info!("Session destroyed ({} record(s) released)", dropped);
    }

    pub fn is_closed(&self) -> bool {
        *self.inner.shutdown.borrow()
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.inner.config
    }

    fn ensure_open(&self) -> ConverterResult<()> {
        if self.is_closed() {
            return Err(ConverterError::cancelled("Session is closed"));
        }
        Ok(())
    }

    /// Runs `work` unless the session is destroyed first.
    async fn cancellable<T>(
        &self,
        work: impl Future<Output = ConverterResult<T>>,
    ) -> ConverterResult<T> {
        let mut shutdown = self.inner.shutdown.subscribe();
        tokio::select! {
            biased;
            _ = shutdown.wait_for(|closed| *closed) => {
                Err(ConverterError::cancelled("Session closed during operation"))
            }
            result = work => result,
        }
    }

    /// Decodes and encodes `source` at the default quality, then appends it.
    ///
    /// The first record of an empty session becomes the selection.
    pub async fn ingest(&self, source: SourceImage) -> ConverterResult<RecordId> {
        self.ensure_open()?;
        validate_source(&source)?;

        let quality = self.inner.config.ingest_quality();
        debug!("Ingesting '{}' ({} bytes) at {}", source.name(), source.byte_length(), quality);

        let (buffer, encoded) = self
            .cancellable(self.inner.pipeline.convert(&source, quality))
            .await?;
        let cached = self.inner.config.cache_decoded.then_some(buffer);

        let mut session = self.inner.session.lock().await;
        self.ensure_open()?;
        let name = source.name().to_string();
        let (original, converted) = (source.byte_length(), encoded.byte_length());
        let id = session.add(source, encoded, cached);
        info!("Ingested '{}' as {}: {} -> {} bytes", name, id, original, converted);
        Ok(id)
    }

    /// Ingests every source concurrently. See [`Self::ingest_batch_with_progress`].
    pub async fn ingest_batch(&self, sources: Vec<SourceImage>) -> ConverterResult<IngestReport> {
        self.ingest_batch_with_progress(sources, |_| {}).await
    }

    /// Ingests every source concurrently.
    ///
    /// Records are appended in completion order, not submission order, and
    /// the report lists outcomes in that same order. A file failing with a
    /// per-file error is reported and skipped; the rest of the batch is
    /// unaffected. Any other error, such as the session being destroyed,
    /// aborts the remaining files and is returned.
    pub async fn ingest_batch_with_progress<F>(
        &self,
        sources: Vec<SourceImage>,
        mut on_progress: F,
    ) -> ConverterResult<IngestReport>
    where
        F: FnMut(Progress),
    {
        self.ensure_open()?;
        let total = sources.len();
        info!("Ingesting batch of {} file(s)", total);
        on_progress(Progress::new(ProgressType::Start, 0, total, "Converting"));

        let mut tasks = JoinSet::new();
        for source in sources {
            let handle = self.clone();
            tasks.spawn(async move {
                let name = source.name().to_string();
                (name, handle.ingest(source).await)
            });
        }

        let mut report = IngestReport::default();
        while let Some(joined) = tasks.join_next().await {
            let (name, outcome) = joined.unwrap_or_else(|e| {
                (
                    "<unknown>".to_string(),
                    Err(ConverterError::cancelled(format!("Ingestion task failed: {}", e))),
                )
            });

            match outcome {
                Ok(id) => {
                    report.ingested.push(id);
                    on_progress(
                        Progress::new(ProgressType::Progress, report.total(), total, "Converted")
                            .with_file(&name)
                            .with_record(id),
                    );
                }
                Err(error) if !error.is_per_file() => {
                    warn!("Batch aborted at '{}': {}", name, error);
                    tasks.abort_all();
                    return Err(error);
                }
                Err(error) => {
                    warn!("Skipping '{}': {}", name, error);
                    report.failed.push(IngestFailure { name: name.clone(), error: error.clone() });
                    on_progress(
                        Progress::new(ProgressType::Error, report.total(), total, "Failed")
                            .with_file(&name)
                            .with_error(&error),
                    );
                }
            }
        }

        info!(
            "Batch finished: {} ingested, {} failed",
            report.ingested.len(),
            report.failed.len()
        );
        on_progress(Progress::new(ProgressType::Complete, total, total, "Complete"));
        Ok(report)
    }

    /// Selects `id`. A stale id leaves the selection as it was and is reported.
    pub async fn select(&self, id: RecordId) -> ConverterResult<()> {
        self.ensure_open()?;
        let mut session = self.inner.session.lock().await;
        if !session.select(id) {
            return Err(ConverterError::not_found(id.to_string()));
        }
        debug!("Selected {}", id);
        Ok(())
    }

    /// Removes `id`; `false` if it was not present.
    pub async fn remove(&self, id: RecordId) -> bool {
        let mut session = self.inner.session.lock().await;
        session.remove(id).is_some()
    }

    pub async fn commit(&self, id: RecordId, result: EncodedResult) -> ConverterResult<()> {
        self.ensure_open()?;
        let mut session = self.inner.session.lock().await;
        let previous = session.commit(id, result)?;
        debug!("Committed {} (replaced {} bytes at {})", id, previous.byte_length(), previous.quality());
        Ok(())
    }

    /// Re-encodes `id` at the clamped `candidate` and commits the result.
    ///
    /// Applying the same quality twice leaves the record in the same state.
    pub async fn apply_quality(&self, id: RecordId, candidate: f32) -> ConverterResult<ConversionSummary> {
        self.ensure_open()?;
        let quality = self.inner.config.quality_policy.clamp(candidate);
        let record = self.record(id).await?;

        let encoded = self
            .cancellable(self.inner.pipeline.reencode(&record, quality))
            .await?;

        let mut session = self.inner.session.lock().await;
        self.ensure_open()?;
        session.commit(id, encoded)?;

        let selected = session.selected_id() == Some(id);
        let summary = session
            .get(id)
            .map(|r| r.summary(selected))
            .ok_or_else(|| ConverterError::not_found(id.to_string()))?;
        info!(
            "Applied quality {} to '{}': {} -> {} bytes",
            quality, summary.name, summary.original_size, summary.converted_size
        );
        Ok(summary)
    }

    /// Projected size of `id` at the clamped `candidate`. Nothing is committed.
    pub async fn estimate(&self, id: RecordId, candidate: f32) -> ConverterResult<Estimate> {
        self.ensure_open()?;
        let quality = self.inner.config.quality_policy.clamp(candidate);
        let record = self.record(id).await?;
        self.cancellable(self.inner.estimator.estimate(&record, quality)).await
    }

    /// Estimate for the selected record, if any.
    pub async fn estimate_selected(&self, candidate: f32) -> ConverterResult<Option<Estimate>> {
        match self.selected_id().await {
            Some(id) => self.estimate(id, candidate).await.map(Some),
            None => Ok(None),
        }
    }

    /// Copy of one record; shares byte buffers with the session.
    pub async fn record(&self, id: RecordId) -> ConverterResult<ConversionRecord> {
        let session = self.inner.session.lock().await;
        session
            .get(id)
            .cloned()
            .ok_or_else(|| ConverterError::not_found(id.to_string()))
    }

    pub async fn records(&self) -> Vec<ConversionRecord> {
        self.inner.session.lock().await.snapshot()
    }

    pub async fn summaries(&self) -> Vec<ConversionSummary> {
        self.inner.session.lock().await.summaries()
    }

    pub async fn selected_id(&self) -> Option<RecordId> {
        self.inner.session.lock().await.selected_id()
    }

    pub async fn len(&self) -> usize {
        self.inner.session.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.session.lock().await.is_empty()
    }

    /// Issues a handle to the committed bytes of `id`.
    ///
    /// The handle stops resolving when `id` is committed again, removed, or
    /// the session is destroyed.
    pub async fn preview_handle(&self, id: RecordId) -> ConverterResult<ObjectHandle> {
        self.ensure_open()?;
        self.inner.session.lock().await.issue_handle(id)
    }

    pub async fn resolve_handle(&self, handle: ObjectHandle) -> Option<Arc<[u8]>> {
        self.inner.session.lock().await.resolve_handle(handle)
    }

    pub async fn release_handle(&self, handle: ObjectHandle) -> bool {
        self.inner.session.lock().await.revoke_handle(handle)
    }

    pub async fn live_handles(&self) -> usize {
        self.inner.session.lock().await.live_handles()
    }

    /// Committed bytes of `id` named `<baseName>.<ext>`.
    pub async fn download(&self, id: RecordId) -> ConverterResult<Download> {
        let record = self.record(id).await?;
        Ok(Download {
            file_name: record.output_name(self.inner.pipeline.encoder().target()),
            bytes: record.committed().bytes().to_vec(),
        })
    }

    /// One download per record, named as the archive would name them.
    pub async fn downloads(&self) -> Vec<Download> {
        let records = self.records().await;
        self.inner
            .archiver
            .entry_names(&records)
            .into_iter()
            .zip(&records)
            .map(|(file_name, record)| Download {
                file_name,
                bytes: record.committed().bytes().to_vec(),
            })
            .collect()
    }

    /// Snapshots the records now; the archive is built when the result is finished.
    pub async fn begin_export(&self) -> ConverterResult<PendingArchive> {
        self.ensure_open()?;
        let snapshot = self.inner.session.lock().await.snapshot();
        debug!("Export snapshot taken ({} record(s))", snapshot.len());
        Ok(PendingArchive::new(
            snapshot,
            self.inner.archiver.clone(),
            self.inner.pipeline.pool().clone(),
            self.inner.shutdown.subscribe(),
        ))
    }

    pub async fn export(&self) -> ConverterResult<Download> {
        self.begin_export().await?.finish().await
    }
}
