// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Input documents accepted by the pipeline.

use std::fmt;

use docsift_core::error::{DocsiftError, Result};
use docsift_core::types::DocumentKind;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// One document to extract text from.
#[derive(Clone, PartialEq, Eq)]
pub enum Document {
    /// Encoded image bytes (PNG, JPEG, TIFF, ...).
    Image(Vec<u8>),
    Pdf(Vec<u8>),
    Text(String),
    Html(String),
}

impl Document {
    /// Classify `bytes` by MIME type. Unknown types fall back to PDF magic
    /// bytes; text types must be valid UTF-8.
    pub fn from_bytes(bytes: Vec<u8>, mime: &str) -> Result<Self> {
        let kind = match DocumentKind::from_mime(mime) {
            Some(kind) => kind,
            None if bytes.starts_with(PDF_MAGIC) => DocumentKind::Pdf,
            None => return Err(DocsiftError::UnsupportedDocument(mime.to_owned())),
        };
        Self::from_kind(kind, bytes)
    }

    /// Classify a file by extension, as [`Document::from_bytes`] does by
    /// MIME type.
    pub fn from_extension(bytes: Vec<u8>, extension: &str) -> Result<Self> {
        let kind = DocumentKind::from_extension(extension)
            .ok_or_else(|| DocsiftError::UnsupportedDocument(format!(".{extension}")))?;
        Self::from_kind(kind, bytes)
    }

    fn from_kind(kind: DocumentKind, bytes: Vec<u8>) -> Result<Self> {
        let utf8 = |bytes: Vec<u8>| {
            String::from_utf8(bytes)
                .map_err(|err| DocsiftError::Decode(format!("text document is not UTF-8: {err}")))
        };
        Ok(match kind {
            DocumentKind::Image => Self::Image(bytes),
            DocumentKind::Pdf => Self::Pdf(bytes),
            DocumentKind::PlainText => Self::Text(utf8(bytes)?),
            DocumentKind::Html => Self::Html(utf8(bytes)?),
        })
    }

    pub fn kind(&self) -> DocumentKind {
        match self {
            Self::Image(_) => DocumentKind::Image,
            Self::Pdf(_) => DocumentKind::Pdf,
            Self::Text(_) => DocumentKind::PlainText,
            Self::Html(_) => DocumentKind::Html,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Image(bytes) | Self::Pdf(bytes) => bytes.len(),
            Self::Text(text) | Self::Html(text) => text.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Payloads can be megabytes; show the kind and size only.
impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("kind", &self.kind())
            .field("len", &self.len())
            .finish()
    }
}
