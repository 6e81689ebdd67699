// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Docsift.

use thiserror::Error;

/// Top-level error type for all Docsift operations.
///
/// Only [`DocsiftError::Decode`] is fatal for a document. The recognition,
/// render, and candidate variants are recovered inside the pipeline and only
/// surface through logs and `quality_issues`.
#[derive(Debug, Error)]
pub enum DocsiftError {
    // -- Input errors --
    #[error("unreadable document bytes: {0}")]
    Decode(String),

    #[error("unsupported document type: {0}")]
    UnsupportedDocument(String),

    // -- Raster errors --
    #[error("pixel buffer invalid: {0}")]
    InvalidBuffer(String),

    #[error("region {x},{y} {width}x{height} exceeds source {source_width}x{source_height}")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        source_width: u32,
        source_height: u32,
    },

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Recognition errors --
    #[error("recognition attempt failed: {0}")]
    RecognitionFailed(String),

    #[error("no recognition candidate produced text")]
    NoCandidateFound,

    // -- PDF errors --
    #[error("PDF page {page} could not be rendered: {reason}")]
    PdfRender { page: u32, reason: String },

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    // -- Jobs / configuration --
    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("background task failed: {0}")]
    Task(String),

    // -- Storage / serialization --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DocsiftError {
    /// Whether this error aborts the whole document rather than a single
    /// attempt or page.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::RecognitionFailed(_) | Self::NoCandidateFound | Self::PdfRender { .. }
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocsiftError>;
