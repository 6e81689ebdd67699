// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docsift-pipeline: turns a `Document` into an `ExtractionResult`.
//
// `Pipeline` owns the collaborators (recognizer, PDF backend, job store) and
// sequences the image, PDF, and text branches into the shared normalization,
// quality, entity, and tag tail while reporting job progress.

pub mod document;
pub mod pipeline;
pub mod progress;

pub use document::Document;
pub use pipeline::Pipeline;
pub use progress::JobProgress;

// Re-exported so embedders need only this crate for the common case.
pub use docsift_core::config::PipelineConfig;
pub use docsift_core::error::{DocsiftError, Result};
pub use docsift_core::logging::init_tracing;
pub use docsift_core::progress::{InMemoryJobStore, JobStore};
pub use docsift_core::types::{ExtractionResult, JobId, JobStatus};
pub use docsift_document::{
    LopdfBackend, PdfBackend, TesseractConfig, TesseractRecognizer, TextRecognizer,
};

#[cfg(feature = "pdfium")]
pub use docsift_document::{PdfiumBackend, PdfiumConfig};
