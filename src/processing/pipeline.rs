//! Decode/encode jobs scheduled on the worker pool.

use std::sync::Arc;

use crate::core::{ConversionRecord, ConverterConfig, EncodedResult, PixelBuffer, SourceImage};
use crate::processing::{Decoder, Encoder, Quality};
use crate::utils::ConverterResult;
use crate::worker::{Stage, WorkerPool};

#[derive(Clone)]
pub struct Pipeline {
    decoder: Decoder,
    encoder: Encoder,
    pool: WorkerPool,
}

impl Pipeline {
    pub fn new(decoder: Decoder, encoder: Encoder, pool: WorkerPool) -> Self {
        Self { decoder, encoder, pool }
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(
            Decoder::new(config.limits),
            Encoder::default(),
            WorkerPool::new(Some(config.worker_count), Some(config.operation_timeout())),
        )
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub async fn decode(&self, source: &SourceImage) -> ConverterResult<Arc<PixelBuffer>> {
        let decoder = self.decoder.clone();
        let job_source = source.clone();
        let buffer = self
            .pool
            .run(Stage::Decode, source.name(), move || decoder.decode_source(&job_source))
            .await?;
        Ok(Arc::new(buffer))
    }

    pub async fn encode(
        &self,
        name: &str,
        buffer: Arc<PixelBuffer>,
        quality: Quality,
    ) -> ConverterResult<EncodedResult> {
        let encoder = self.encoder.clone();
        let result = self
            .pool
            .run(Stage::Encode, name, move || encoder.encode(&buffer, quality))
            .await?;
        Ok(result)
    }

    /// Decode then encode; the buffer is returned so the caller may cache it.
    pub async fn convert(
        &self,
        source: &SourceImage,
        quality: Quality,
    ) -> ConverterResult<(Arc<PixelBuffer>, EncodedResult)> {
        let buffer = self.decode(source).await?;
        let encoded = self.encode(source.name(), Arc::clone(&buffer), quality).await?;
        Ok((buffer, encoded))
    }

    /// The record's cached pixels, or a fresh decode of its source.
    pub async fn buffer_for(&self, record: &ConversionRecord) -> ConverterResult<Arc<PixelBuffer>> {
        match record.cached_buffer() {
            Some(buffer) => Ok(buffer),
            None => self.decode(record.source()).await,
        }
    }

    /// Re-encodes a record at `quality` without touching it.
    pub async fn reencode(
        &self,
        record: &ConversionRecord,
        quality: Quality,
    ) -> ConverterResult<EncodedResult> {
        let buffer = self.buffer_for(record).await?;
        self.encode(record.name(), buffer, quality).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::png_source;
    use crate::utils::ConverterError;

    #[tokio::test]
    async fn test_convert_png() {
        let pipeline = Pipeline::from_config(&ConverterConfig::default());
        let source = png_source("cat.png", 48, 1);
        let (buffer, encoded) = pipeline.convert(&source, Quality::DEFAULT).await.unwrap();
        assert_eq!((buffer.width, buffer.height), (48, 48));
        assert_eq!(encoded.quality(), Quality::DEFAULT);
        assert!(encoded.byte_length() > 0);
    }

    #[tokio::test]
    async fn test_convert_rejects_garbage() {
        let pipeline = Pipeline::from_config(&ConverterConfig::default());
        let source = SourceImage::new("notes.png", b"hello".to_vec());
        let err = pipeline.convert(&source, Quality::DEFAULT).await.unwrap_err();
        assert!(matches!(err, ConverterError::UnsupportedFormat(_)));
    }
}
