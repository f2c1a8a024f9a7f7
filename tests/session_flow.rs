//! End-to-end flow over the public API: ingest, select, estimate, apply, export.

use std::io::{Cursor, Read};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use webp_converter_lib::core::ProgressType;
use webp_converter_lib::{ConverterConfig, ConverterError, SessionHandle, SourceImage};
use zip::ZipArchive;

/// Gradient with grain, so lossy encoders behave as on a photo.
fn photo(width: u32, height: u32, seed: u32) -> RgbaImage {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(7);
    RgbaImage::from_fn(width, height, |x, y| {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let grain = (state >> 24) as i32 / 10 - 12;
        image::Rgba([
            ((x * 255 / width) as i32 + grain).clamp(0, 255) as u8,
            ((y * 255 / height) as i32 - grain).clamp(0, 255) as u8,
            (((x + y) * 255 / (width + height)) as i32 + grain).clamp(0, 255) as u8,
            255,
        ])
    })
}

fn cat_png() -> SourceImage {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(photo(160, 120, 1))
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    SourceImage::new("cat.png", out.into_inner())
}

fn dog_jpg() -> SourceImage {
    let rgb = DynamicImage::ImageRgba8(photo(200, 150, 2)).to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 100).encode_image(&rgb).unwrap();
    SourceImage::new("dog.jpg", out)
}

fn entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
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

#[tokio::test]
async fn test_cat_and_dog_scenario() {
    let session = SessionHandle::create(ConverterConfig::default()).unwrap();

    let report = session.ingest_batch(vec![cat_png(), dog_jpg()]).await.unwrap();
    assert_eq!(report.ingested.len(), 2);
    assert!(report.failed.is_empty());

    let records = session.records().await;
    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record.committed().quality().value(), 0.9);
        assert!(
            record.committed().byte_length() < record.source().byte_length(),
            "{} did not shrink",
            record.name()
        );
    }

    // The first record by insertion is selected, whichever file it is.
    let first = records[0].id();
    assert_eq!(session.selected_id().await, Some(first));

    let estimate = session.estimate_selected(0.2).await.unwrap().unwrap();
    assert!(estimate.projected_bytes < records[0].committed().byte_length());

    let download = session.export().await.unwrap();
    assert_eq!(download.file_name, "converted_images.zip");

    let mut names: Vec<_> = entries(&download.bytes).into_iter().map(|(n, _)| n).collect();
    assert_eq!(names.remove(0), "converted/");
    names.sort();
    assert_eq!(names, vec!["converted/cat.webp", "converted/dog.webp"]);

    session.destroy().await;
}

#[tokio::test]
async fn test_archive_follows_insertion_order_and_commits() {
    let session = SessionHandle::create(ConverterConfig::default()).unwrap();
    let cat = session.ingest(cat_png()).await.unwrap();
    let dog = session.ingest(dog_jpg()).await.unwrap();

    let summary = session.apply_quality(dog, 0.3).await.unwrap();
    let committed = session.record(dog).await.unwrap().committed().bytes().to_vec();
    assert_eq!(summary.converted_size as usize, committed.len());

    let archived = entries(&session.export().await.unwrap().bytes);
    let names: Vec<_> = archived.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["converted/", "converted/cat.webp", "converted/dog.webp"]);
    assert_eq!(archived[2].1, committed);

    let single = session.download(cat).await.unwrap();
    assert_eq!(single.file_name, "cat.webp");
    assert_eq!(archived[1].1, single.bytes);
}

#[tokio::test]
async fn test_bad_file_does_not_abort_batch() {
    let session = SessionHandle::create(ConverterConfig::default()).unwrap();
    let mut kinds = Vec::new();

    let report = session
        .ingest_batch_with_progress(
            vec![
                cat_png(),
                SourceImage::new("broken.png", b"\x89PNG\r\n\x1a\n garbage".to_vec()),
                dog_jpg(),
            ],
            |progress| kinds.push(progress.progress_type),
        )
        .await
        .unwrap();

    assert_eq!(report.ingested.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].name, "broken.png");
    assert!(report.failed[0].error.is_per_file());
    assert_eq!(kinds.first(), Some(&ProgressType::Start));
    assert_eq!(kinds.last(), Some(&ProgressType::Complete));
    assert_eq!(session.len().await, 2);
}

#[tokio::test]
async fn test_destroyed_session_rejects_work() {
    let session = SessionHandle::create(ConverterConfig::default()).unwrap();
    let id = session.ingest(cat_png()).await.unwrap();
    session.destroy().await;

    assert!(matches!(session.apply_quality(id, 0.5).await, Err(ConverterError::Cancelled(_))));
    assert!(matches!(session.export().await, Err(ConverterError::Cancelled(_))));
    assert!(session.records().await.is_empty());
}
