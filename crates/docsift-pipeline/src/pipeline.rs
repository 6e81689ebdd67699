// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline orchestration: one document in, one `ExtractionResult` out.
//
// Images go through the page recognizer, PDFs through the page source, and
// text or HTML straight to post-processing. Every branch then shares the same
// tail: normalization, quality review, entities, tags, and page splitting.
//
// Progress for the job: 5 once running, 10 after decoding, 10..90 for
// recognition, 95 after post-processing, and 100 on completion.

use std::sync::Arc;
use std::time::Instant;

use docsift_core::config::PipelineConfig;
use docsift_core::error::{DocsiftError, Result};
use docsift_core::progress::{JobStore, ProgressSink, ScaledProgress};
use docsift_core::types::{
    DocumentKind, EntitySet, ExtractionResult, JobId, PdfMetadata, QualityLevel,
    UNRECOGNIZED_TEXT,
};
use docsift_document::{
    LopdfBackend, PageRecognizer, PdfBackend, PdfPageSource, PdfTextOrigin, PixelBuffer,
    TextRecognizer, decode_image,
};
use docsift_text::{
    QualityChecker, QualityReport, extract_entities, generate_tags, html_to_text, normalize,
    split_pages,
};
use tracing::{debug, error, info, instrument, warn};

use crate::document::Document;
use crate::progress::JobProgress;

/// Text produced by one input branch, before post-processing.
struct RawText {
    text: String,
    confidence: f32,
    engine_used: String,
    pdf_metadata: Option<PdfMetadata>,
}

impl RawText {
    /// Placeholder for input where no attempt produced text. The engine is
    /// reported as `<engine>/none`.
    fn unrecognized(engine: &str, pdf_metadata: Option<PdfMetadata>) -> Self {
        Self {
            text: UNRECOGNIZED_TEXT.to_owned(),
            confidence: 0.0,
            engine_used: format!("{engine}/none"),
            pdf_metadata,
        }
    }
}

/// Extraction pipeline with its collaborators.
///
/// Cheap to clone; clones share the recognizer, PDF backend, and job store,
/// so independent documents can run concurrently from one instance.
#[derive(Clone)]
pub struct Pipeline {
    pages: PageRecognizer,
    pdf: Arc<dyn PdfBackend>,
    store: Arc<dyn JobStore>,
    config: Arc<PipelineConfig>,
    quality: QualityChecker,
}

impl Pipeline {
    /// Build a pipeline after validating `config`.
    pub fn new(
        recognizer: Arc<dyn TextRecognizer>,
        pdf: Arc<dyn PdfBackend>,
        store: Arc<dyn JobStore>,
        config: PipelineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        info!(
            engine = recognizer.name(),
            orientation = config.orientation.enabled,
            ocr_fallback = config.pdf.ocr_fallback,
            "pipeline ready"
        );
        Ok(Self {
            pages: PageRecognizer::new(recognizer, Arc::clone(&config)),
            pdf,
            store,
            quality: QualityChecker::new(config.quality.clone()),
            config,
        })
    }

    /// Default configuration and the `lopdf` backend. Build with
    /// [`Pipeline::new`] and a PDFium backend to rasterize vector pages.
    pub fn with_defaults(
        recognizer: Arc<dyn TextRecognizer>,
        store: Arc<dyn JobStore>,
    ) -> Result<Self> {
        Self::new(recognizer, Arc::new(LopdfBackend), store, PipelineConfig::default())
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    // -- Entry point -----------------------------------------------------------

    /// Extract text from `document` as job `job_id`.
    ///
    /// Low-quality or unrecognizable input still yields a result (possibly the
    /// unrecognized-text placeholder). Only unreadable bytes and internal
    /// failures return an error, after the job is marked failed.
    #[instrument(
        skip(self, document),
        fields(job_id = %job_id, kind = ?document.kind(), len = document.len())
    )]
    pub async fn extract(&self, job_id: JobId, document: Document) -> Result<ExtractionResult> {
        let started = Instant::now();
        self.store.start(job_id).await?;
        let progress = JobProgress::new(self.store.as_ref(), job_id);
        progress.report(5.0).await;

        match self.run(document, &progress, started).await {
            Ok(result) => {
                self.store.complete(job_id).await?;
                info!(
                    engine = %result.engine_used,
                    confidence = result.confidence,
                    quality = ?result.quality,
                    elapsed_ms = result.processing_time_ms,
                    "extraction complete"
                );
                Ok(result)
            }
            Err(err) => {
                error!(%err, "extraction failed");
                if let Err(store_err) = self.store.fail(job_id, &err.to_string()).await {
                    warn!(%store_err, "could not record job failure");
                }
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        document: Document,
        progress: &dyn ProgressSink,
        started: Instant,
    ) -> Result<ExtractionResult> {
        let source_kind = document.kind();
        let recognition = ScaledProgress::new(progress, 10.0, 80.0);

        let raw = match document {
            Document::Image(bytes) => {
                let page = tokio::task::spawn_blocking(move || decode_image(&bytes))
                    .await
                    .map_err(|err| {
                        DocsiftError::Task(format!("image decode did not finish: {err}"))
                    })??;
                progress.report(10.0).await;
                self.recognize_image(page, &recognition).await?
            }
            Document::Pdf(bytes) => {
                progress.report(10.0).await;
                self.recognize_pdf(&bytes, &recognition).await?
            }
            Document::Text(text) => RawText {
                text,
                confidence: 100.0,
                engine_used: "plain-text".to_owned(),
                pdf_metadata: None,
            },
            Document::Html(html) => RawText {
                text: html_to_text(&html),
                confidence: 100.0,
                engine_used: "html".to_owned(),
                pdf_metadata: None,
            },
        };
        progress.report(90.0).await;

        let result = self.finish(raw, source_kind, started);
        progress.report(95.0).await;
        Ok(result)
    }

    // -- Branches --------------------------------------------------------------

    async fn recognize_image(
        &self,
        page: PixelBuffer,
        progress: &dyn ProgressSink,
    ) -> Result<RawText> {
        let engine = self.pages.recognizer_name().to_owned();
        match self.pages.recognize(page, progress).await {
            Ok(outcome) => Ok(RawText {
                text: outcome.candidate.text,
                confidence: outcome.candidate.confidence,
                engine_used: format!("{engine}/{}", outcome.tier),
                pdf_metadata: None,
            }),
            Err(DocsiftError::NoCandidateFound) => {
                warn!("no recognition attempt produced text");
                Ok(RawText::unrecognized(&engine, None))
            }
            Err(err) => Err(err),
        }
    }

    async fn recognize_pdf(&self, bytes: &[u8], progress: &dyn ProgressSink) -> Result<RawText> {
        let extraction = PdfPageSource::new(self.pdf.as_ref(), &self.pages, &self.config.pdf)
            .extract(bytes, progress)
            .await?;

        Ok(match extraction.origin {
            PdfTextOrigin::TextLayer { .. } => RawText {
                text: extraction.text,
                confidence: extraction.confidence,
                engine_used: "pdf-text-layer".to_owned(),
                pdf_metadata: extraction.metadata,
            },
            PdfTextOrigin::Ocr { .. } => RawText {
                text: extraction.text,
                confidence: extraction.confidence,
                engine_used: format!("{}/pdf-ocr", self.pages.recognizer_name()),
                pdf_metadata: extraction.metadata,
            },
            PdfTextOrigin::Empty => {
                warn!("PDF produced no text");
                RawText::unrecognized(self.pages.recognizer_name(), extraction.metadata)
            }
        })
    }

    // -- Post-processing ---------------------------------------------------------

    fn finish(&self, raw: RawText, source_kind: DocumentKind, started: Instant) -> ExtractionResult {
        let elapsed_ms = || started.elapsed().as_millis() as u64;

        if raw.text == UNRECOGNIZED_TEXT {
            let (text, report) = self.quality.review(&raw.text);
            return ExtractionResult {
                text,
                confidence: 0.0,
                engine_used: raw.engine_used,
                processing_time_ms: elapsed_ms(),
                quality: report.level,
                quality_issues: report.issues,
                entities: EntitySet::default(),
                tags: Vec::new(),
                source_kind,
                pages: Vec::new(),
                pdf_metadata: raw.pdf_metadata,
            };
        }

        let normalized = normalize(&raw.text);
        let (text, report) = if normalized.is_empty() {
            let report = QualityReport {
                level: QualityLevel::Low,
                issues: vec!["document contains no text".to_owned()],
            };
            (normalized, report)
        } else {
            self.quality.review(&normalized)
        };
        let entities = extract_entities(&text);
        let tags = generate_tags(&entities, &text);
        let pages = if source_kind == DocumentKind::Pdf {
            split_pages(&text)
        } else {
            Vec::new()
        };
        debug!(
            chars = text.chars().count(),
            emails = entities.emails.len(),
            companies = entities.companies.len(),
            tags = tags.len(),
            pages = pages.len(),
            "post-processing finished"
        );

        ExtractionResult {
            text,
            confidence: raw.confidence.clamp(0.0, 100.0),
            engine_used: raw.engine_used,
            processing_time_ms: elapsed_ms(),
            quality: report.level,
            quality_issues: report.issues,
            entities,
            tags,
            source_kind,
            pages,
            pdf_metadata: raw.pdf_metadata,
        }
    }
}
