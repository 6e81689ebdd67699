// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end tests: documents in, extraction results and job records out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use docsift_core::config::PipelineConfig;
use docsift_core::progress::JobStore;
use docsift_core::types::{JobRecord, RecognitionParams};
use docsift_document::{FnRecognizer, PixelBuffer, RawRecognition};
use docsift_pipeline::{
    DocsiftError, Document, InMemoryJobStore, JobId, JobStatus, LopdfBackend, Pipeline, Result,
};
use lopdf::{Document as PdfDocument, Object, Stream, dictionary};

// -- Fixtures --------------------------------------------------------------------

/// Job store that remembers every stored progress value.
#[derive(Default)]
struct RecordingStore {
    inner: InMemoryJobStore,
    history: Mutex<Vec<u8>>,
}

impl RecordingStore {
    fn history(&self) -> Vec<u8> {
        self.history.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobStore for RecordingStore {
    async fn create(&self, id: JobId) -> Result<JobRecord> {
        self.inner.create(id).await
    }

    async fn start(&self, id: JobId) -> Result<()> {
        self.inner.start(id).await
    }

    async fn get(&self, id: JobId) -> Result<Option<JobRecord>> {
        self.inner.get(id).await
    }

    async fn advance_progress(&self, id: JobId, proposed: f32) -> Result<u8> {
        let stored = self.inner.advance_progress(id, proposed).await?;
        self.history.lock().unwrap().push(stored);
        Ok(stored)
    }

    async fn complete(&self, id: JobId) -> Result<()> {
        self.inner.complete(id).await?;
        self.history.lock().unwrap().push(100);
        Ok(())
    }

    async fn fail(&self, id: JobId, message: &str) -> Result<()> {
        self.inner.fail(id, message).await
    }
}

fn png(buffer: image::DynamicImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    buffer
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// 400x600 white page with ten dark horizontal bands.
fn banded_png() -> Vec<u8> {
    let mut page = image::GrayImage::from_pixel(400, 600, image::Luma([255]));
    for band in 0..10 {
        let top = 20 + 55 * band;
        for y in top..top + 25 {
            for x in 40..360 {
                page.put_pixel(x, y, image::Luma([0]));
            }
        }
    }
    png(image::DynamicImage::ImageLuma8(page))
}

fn single_page_pdf(resources: lopdf::Dictionary, content: &[u8], doc: PdfDocument) -> Vec<u8> {
    let mut doc = doc;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        "Contents" => content_id,
        "Resources" => resources,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn text_pdf(text: &str) -> Vec<u8> {
    let mut doc = PdfDocument::with_version("1.5");
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources = dictionary! { "Font" => dictionary! { "F1" => font_id } };
    let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
    single_page_pdf(resources, content.as_bytes(), doc)
}

fn scanned_pdf() -> Vec<u8> {
    let mut doc = PdfDocument::with_version("1.5");
    let mut scan = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 60,
            "Height" => 80,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        vec![255u8; 60 * 80],
    );
    scan.allows_compression = false;
    let scan_id = doc.add_object(scan);
    let resources = dictionary! { "XObject" => dictionary! { "Scan" => scan_id } };
    single_page_pdf(resources, b"q 595 0 0 842 0 0 cm /Scan Do Q", doc)
}

fn confident() -> impl Fn(&PixelBuffer, &RecognitionParams) -> Result<RawRecognition> + Send + Sync
{
    |_: &PixelBuffer, _: &RecognitionParams| {
        Ok(RawRecognition {
            text: "株式会社サンプル info@example.com".into(),
            confidence: 91.0,
        })
    }
}

fn pipeline(
    recognize: impl Fn(&PixelBuffer, &RecognitionParams) -> Result<RawRecognition>
    + Send
    + Sync
    + 'static,
    store: Arc<dyn JobStore>,
) -> Pipeline {
    Pipeline::with_defaults(Arc::new(FnRecognizer::new("fake", recognize)), store).unwrap()
}

// -- Properties ------------------------------------------------------------------

#[tokio::test]
async fn progress_rises_monotonically_and_ends_at_100() {
    let store = Arc::new(RecordingStore::default());
    let pipeline = pipeline(confident(), store.clone());
    let id = JobId::new();

    let result = pipeline
        .extract(id, Document::Image(banded_png()))
        .await
        .unwrap();
    assert_eq!(result.engine_used, "fake/structured");

    let history = store.history();
    assert!(history.len() > 3, "{history:?}");
    assert!(history.windows(2).all(|pair| pair[0] <= pair[1]), "{history:?}");
    assert_eq!(history.last(), Some(&100));
    assert!(history[..history.len() - 1].iter().all(|&value| value <= 99));
}

#[tokio::test]
async fn layout_blocks_win_over_weak_passes() {
    let config = PipelineConfig {
        orientation: docsift_core::config::OrientationConfig {
            enabled: false,
            ..Default::default()
        },
        ..PipelineConfig::default()
    };
    let coarse_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&coarse_calls);
    let recognizer = FnRecognizer::new("fake", move |buffer: &PixelBuffer, params: &RecognitionParams| {
        // The structure profile pads the 400x600 page by 24 px on each side.
        let (text, confidence) = if params.min_char_size == 6 {
            counter.fetch_add(1, Ordering::SeqCst);
            ("coarse", 55.0)
        } else if (buffer.width(), buffer.height()) == (448, 648) {
            ("whole page", 40.0)
        } else {
            ("block", 80.0)
        };
        Ok(RawRecognition {
            text: text.into(),
            confidence,
        })
    });
    let pipeline = Pipeline::new(
        Arc::new(recognizer),
        Arc::new(LopdfBackend),
        Arc::new(InMemoryJobStore::new()),
        config,
    )
    .unwrap();

    let result = pipeline
        .extract(JobId::new(), Document::Image(banded_png()))
        .await
        .unwrap();
    assert_eq!(result.engine_used, "fake/layout");
    assert_eq!(result.confidence, 70.0);
    assert!(result.text.contains("block"));
    assert!(!result.text.contains("coarse"));
    assert_eq!(coarse_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn every_attempt_failing_yields_the_placeholder() {
    let store = Arc::new(InMemoryJobStore::new());
    let pipeline = pipeline(
        |_: &PixelBuffer, _: &RecognitionParams| Err(DocsiftError::RecognitionFailed("boom".into())),
        store.clone(),
    );
    let id = JobId::new();

    let result = pipeline
        .extract(id, Document::Image(banded_png()))
        .await
        .unwrap();
    assert_eq!(result.text, "text could not be recognized");
    assert_eq!(result.engine_used, "fake/none");
    assert_eq!(result.confidence, 0.0);
    assert!(result.entities.is_empty());

    let record = store.get(id).await.unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Succeeded);
    assert_eq!(record.progress, 100);
}

#[tokio::test]
async fn pdf_text_layer_never_touches_the_recognizer() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let pipeline = pipeline(
        move |_: &PixelBuffer, _: &RecognitionParams| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(RawRecognition {
                text: "ocr".into(),
                confidence: 99.0,
            })
        },
        Arc::new(InMemoryJobStore::new()),
    );

    let result = pipeline
        .extract(JobId::new(), Document::Pdf(text_pdf("Hello from the text layer")))
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(result.engine_used, "pdf-text-layer");
    assert_eq!(result.confidence, 100.0);
    assert!(result.text.starts_with("=== page 1 ===\n"));
    assert_eq!(result.pages.len(), 1);
    assert!(!result.pages[0].ocr);
    assert!(result.pages[0].text.contains("Hello"));
    assert_eq!(result.pdf_metadata.map(|metadata| metadata.page_count), Some(1));
}

#[tokio::test]
async fn scanned_pdf_is_recognized_page_by_page() {
    let pipeline = pipeline(confident(), Arc::new(InMemoryJobStore::new()));

    let result = pipeline
        .extract(JobId::new(), Document::Pdf(scanned_pdf()))
        .await
        .unwrap();
    assert_eq!(result.engine_used, "fake/pdf-ocr");
    assert!(result.text.starts_with("=== page 1 (OCR) ===\n"));
    assert_eq!(result.pages.len(), 1);
    assert!(result.pages[0].ocr);
    assert_eq!(result.entities.emails, vec!["info@example.com".to_owned()]);
    assert!(result.entities.companies.iter().any(|company| company.contains("株式会社")));
}

#[tokio::test]
async fn corrupt_pdf_marks_the_job_failed() {
    let store = Arc::new(InMemoryJobStore::new());
    let pipeline = pipeline(confident(), store.clone());
    let id = JobId::new();

    let err = pipeline
        .extract(id, Document::Pdf(b"%PDF-1.4 truncated".to_vec()))
        .await
        .unwrap_err();
    assert!(matches!(err, DocsiftError::Decode(_)));
    assert_eq!(store.get(id).await.unwrap().unwrap().status, JobStatus::Failed);
}

#[tokio::test]
async fn full_width_text_is_normalized() {
    let pipeline = pipeline(confident(), Arc::new(InMemoryJobStore::new()));
    let result = pipeline
        .extract(JobId::new(), Document::Text("０１２-３４５６".into()))
        .await
        .unwrap();
    assert_eq!(result.text, "012-3456");
}

#[tokio::test]
async fn html_contact_yields_tag() {
    let pipeline = pipeline(confident(), Arc::new(InMemoryJobStore::new()));
    let document =
        Document::from_bytes(b"<div>Mail <b>a@b.com</b></div>".to_vec(), "text/html").unwrap();
    let result = pipeline.extract(JobId::new(), document).await.unwrap();
    assert_eq!(result.entities.emails, vec!["a@b.com".to_owned()]);
    assert!(result.tags.contains(&"contact info".to_owned()));
}

#[tokio::test]
async fn concurrent_jobs_are_independent() {
    let store = Arc::new(InMemoryJobStore::new());
    let pipeline = pipeline(confident(), store.clone());

    let mut handles = Vec::new();
    for index in 0..6 {
        let pipeline = pipeline.clone();
        handles.push(tokio::spawn(async move {
            let id = JobId::new();
            let document = match index % 3 {
                0 => Document::Image(banded_png()),
                1 => Document::Pdf(text_pdf("Concurrent")),
                _ => Document::Text(format!("job {index} info@example.com")),
            };
            let result = pipeline.extract(id, document).await;
            (id, result)
        }));
    }

    for handle in handles {
        let (id, result) = handle.await.unwrap();
        assert!(result.is_ok(), "{result:?}");
        let record = store.get(id).await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Succeeded);
        assert_eq!(record.progress, 100);
    }
    assert_eq!(store.len(), 6);
}

#[tokio::test]
async fn results_serialize_to_json() {
    let pipeline = pipeline(confident(), Arc::new(InMemoryJobStore::new()));
    let result = pipeline
        .extract(JobId::new(), Document::Text("株式会社サンプル".into()))
        .await
        .unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["engine_used"], "plain-text");
    assert!(json["tags"].as_array().is_some());
}

#[tokio::test]
async fn config_file_can_disable_pdf_ocr() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docsift.json");
    std::fs::write(&path, r#"{ "pdf": { "ocr_fallback": false } }"#).unwrap();
    let config = PipelineConfig::load(&path).unwrap();
    assert!(!config.pdf.ocr_fallback);

    let pipeline = Pipeline::new(
        Arc::new(FnRecognizer::new("fake", confident())),
        Arc::new(LopdfBackend),
        Arc::new(InMemoryJobStore::new()),
        config,
    )
    .unwrap();
    let result = pipeline
        .extract(JobId::new(), Document::Pdf(scanned_pdf()))
        .await
        .unwrap();
    assert!(result.is_unrecognized());
    assert_eq!(result.engine_used, "fake/none");
    assert_eq!(result.confidence, 0.0);
}
