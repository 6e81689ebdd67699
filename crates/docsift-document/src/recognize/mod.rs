// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text-recognition engines behind one async trait.

pub mod tesseract;

#[cfg(feature = "ocr")]
pub mod ocrs_engine;

use async_trait::async_trait;
use docsift_core::error::Result;
use docsift_core::types::RecognitionParams;
use serde::{Deserialize, Serialize};

use crate::image::PixelBuffer;

pub use tesseract::{TesseractConfig, TesseractRecognizer};

#[cfg(feature = "ocr")]
pub use ocrs_engine::{OcrsConfig, OcrsRecognizer};

/// Text and engine-reported confidence (0–100) for one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecognition {
    pub text: String,
    pub confidence: f32,
}

/// A recognition engine. Implementations must tolerate concurrent calls.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Short engine name, used in `engine_used`.
    fn name(&self) -> &str;

    /// Recognize `buffer` with `params`. Fails with `RecognitionFailed`.
    async fn recognize(&self, buffer: &PixelBuffer, params: &RecognitionParams)
    -> Result<RawRecognition>;
}

/// Adapts a plain function into a [`TextRecognizer`].
///
/// Handy for deterministic engines in tests and for wrapping synchronous
/// engines that are cheap enough to run inline.
pub struct FnRecognizer<F> {
    name: String,
    recognize: F,
}

impl<F> FnRecognizer<F>
where
    F: Fn(&PixelBuffer, &RecognitionParams) -> Result<RawRecognition> + Send + Sync,
{
    pub fn new(name: impl Into<String>, recognize: F) -> Self {
        Self {
            name: name.into(),
            recognize,
        }
    }
}

#[async_trait]
impl<F> TextRecognizer for FnRecognizer<F>
where
    F: Fn(&PixelBuffer, &RecognitionParams) -> Result<RawRecognition> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn recognize(
        &self,
        buffer: &PixelBuffer,
        params: &RecognitionParams,
    ) -> Result<RawRecognition> {
        (self.recognize)(buffer, params)
    }
}
