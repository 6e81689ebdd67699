// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docsift-document: the image side of Docsift.
//
// Provides raster operations and the two preprocessing profiles, recognition
// engines behind `TextRecognizer`, orientation probing, projection-profile
// layout analysis, the confidence-arbitration ladder, and the PDF page source
// that feeds rendered pages back through the same image pipeline.

pub mod image;
pub mod layout;
pub mod orientation;
pub mod page;
pub mod pdf;
pub mod recognize;
pub mod strategy;

mod task;

// Re-export the primary types so callers can use `docsift_document::PageRecognizer` etc.
pub use image::{ImageProcessor, PixelBuffer, decode_image, encode_png, preprocess};
pub use layout::analyze;
pub use orientation::{OrientationOutcome, OrientationResolver};
pub use page::PageRecognizer;
pub use pdf::{LopdfBackend, PdfBackend, PdfExtraction, PdfPageSource, PdfTextOrigin};
pub use recognize::{
    FnRecognizer, RawRecognition, TesseractConfig, TesseractRecognizer, TextRecognizer,
};
pub use strategy::{LadderOutcome, RecognitionStrategy, RecognitionTier};

#[cfg(feature = "ocr")]
pub use recognize::{OcrsConfig, OcrsRecognizer};

#[cfg(feature = "pdfium")]
pub use pdf::{PdfiumBackend, PdfiumConfig};
