// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF text: embedded text layer when present, otherwise rendered pages fed
// through the image pipeline one at a time.

use docsift_core::config::PdfConfig;
use docsift_core::error::{DocsiftError, Result};
use docsift_core::progress::{ProgressSink, ScaledProgress};
use docsift_core::types::PdfMetadata;
use docsift_text::push_page;
use tracing::{debug, info, instrument, warn};

use super::backend::PdfBackend;
use crate::page::PageRecognizer;

/// Where the PDF text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfTextOrigin {
    TextLayer { pages: u32 },
    Ocr { pages: u32 },
    /// Neither the text layer nor OCR produced anything.
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdfExtraction {
    /// Page sections, each headed by a page marker.
    pub text: String,
    /// 100 for the text layer, the mean page confidence for OCR.
    pub confidence: f32,
    pub origin: PdfTextOrigin,
    /// `None` when the document info could not be read.
    pub metadata: Option<PdfMetadata>,
}

pub struct PdfPageSource<'a> {
    backend: &'a dyn PdfBackend,
    pages: &'a PageRecognizer,
    config: &'a PdfConfig,
}

impl<'a> PdfPageSource<'a> {
    pub fn new(backend: &'a dyn PdfBackend, pages: &'a PageRecognizer, config: &'a PdfConfig) -> Self {
        Self {
            backend,
            pages,
            config,
        }
    }

    /// Extract text from `bytes`. Only an unreadable document is an error;
    /// any page that fails to render or recognize is logged and skipped.
    ///
    /// Progress: the text layer ends at 20, then OCR page `i` of `n` fills
    /// `20 + 80·i/n .. 20 + 80·(i+1)/n`.
    #[instrument(skip_all, fields(bytes_len = bytes.len()))]
    pub async fn extract(&self, bytes: &[u8], progress: &dyn ProgressSink) -> Result<PdfExtraction> {
        let layer = self
            .backend
            .text_layer(bytes, self.config.text_layer_max_pages)
            .await?;
        let metadata = match self.backend.metadata(bytes).await {
            Ok(metadata) => Some(metadata),
            Err(err) => {
                warn!(%err, "PDF metadata unavailable");
                None
            }
        };
        progress.report(20.0).await;

        if !layer.is_empty() {
            let mut text = String::new();
            for (page_number, page_text) in &layer {
                push_page(&mut text, *page_number, false, page_text);
            }
            info!(pages = layer.len(), "text layer found, skipping rasterization");
            progress.report(100.0).await;
            return Ok(PdfExtraction {
                text: text.trim_end().to_owned(),
                confidence: 100.0,
                origin: PdfTextOrigin::TextLayer {
                    pages: layer.len() as u32,
                },
                metadata,
            });
        }

        if !self.config.ocr_fallback {
            info!("no text layer and OCR fallback disabled");
            progress.report(100.0).await;
            return Ok(empty(metadata));
        }

        let page_count = match &metadata {
            Some(metadata) => metadata.page_count,
            None => self.backend.page_count(bytes).await?,
        };
        let ocr_pages = page_count.min(self.config.ocr_max_pages);
        info!(page_count, ocr_pages, dpi = self.config.render_dpi, "rasterizing pages for OCR");

        let mut text = String::new();
        let mut confidences = Vec::new();
        let span = 80.0 / ocr_pages.max(1) as f32;
        for index in 0..ocr_pages {
            let page_number = index + 1;
            let page_progress = ScaledProgress::new(progress, 20.0 + span * index as f32, span);

            let raster = match self.backend.render_page(bytes, index, self.config.render_dpi).await {
                Ok(raster) => raster,
                Err(err) => {
                    warn!(page_number, %err, "page could not be rendered, skipped");
                    page_progress.report(100.0).await;
                    continue;
                }
            };

            match self.pages.recognize(raster, &page_progress).await {
                Ok(outcome) => {
                    let page_text = outcome.candidate.text.trim();
                    debug!(
                        page_number,
                        tier = %outcome.tier,
                        confidence = outcome.candidate.confidence,
                        "page recognized"
                    );
                    if !page_text.is_empty() {
                        push_page(&mut text, page_number, true, page_text);
                        confidences.push(outcome.candidate.confidence);
                    }
                }
                Err(DocsiftError::NoCandidateFound) => {
                    warn!(page_number, "page produced no text");
                }
                Err(err) => {
                    warn!(page_number, %err, "page recognition failed, skipped");
                }
            }
            page_progress.report(100.0).await;
        }
        progress.report(100.0).await;

        if confidences.is_empty() {
            return Ok(empty(metadata));
        }
        let confidence = confidences.iter().sum::<f32>() / confidences.len() as f32;
        info!(pages = confidences.len(), confidence, "OCR pages combined");
        Ok(PdfExtraction {
            text: text.trim_end().to_owned(),
            confidence,
            origin: PdfTextOrigin::Ocr {
                pages: confidences.len() as u32,
            },
            metadata,
        })
    }
}

fn empty(metadata: Option<PdfMetadata>) -> PdfExtraction {
    PdfExtraction {
        text: String::new(),
        confidence: 0.0,
        origin: PdfTextOrigin::Empty,
        metadata,
    }
}
