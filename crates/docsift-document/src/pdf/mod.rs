// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF input: the backend collaborator and the page source built on it.

pub mod backend;
pub mod source;

#[cfg(feature = "pdfium")]
pub mod pdfium;

pub use backend::{LopdfBackend, PdfBackend};
pub use source::{PdfExtraction, PdfPageSource, PdfTextOrigin};

#[cfg(feature = "pdfium")]
pub use pdfium::{PdfiumBackend, PdfiumConfig};
