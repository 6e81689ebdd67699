// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pure-Rust recognition via the `ocrs` crate, with neural network models
// executed by `rten`.
//
// # Feature Gate
//
// Only compiled with the `ocr` feature:
//
// ```toml
// docsift-document = { path = "crates/docsift-document", features = ["ocr"] }
// ```
//
// # Model Setup
//
// Two model files are required: `text-detection.rten` and
// `text-recognition.rten`. Running `ocrs-cli` once downloads them into
// `$XDG_CACHE_HOME/ocrs` (typically `~/.cache/ocrs`), the default directory
// used here.
//
// The engine ignores language and segmentation hints, and reports the share
// of detected lines that produced text as its confidence.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use docsift_core::error::{DocsiftError, Result};
use docsift_core::types::RecognitionParams;
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams};
use rten::Model;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::{RawRecognition, TextRecognizer};
use crate::image::PixelBuffer;
use crate::task::blocking;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Highest confidence the line-share proxy may report.
const MAX_PROXY_CONFIDENCE: f32 = 90.0;

fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Model locations for [`OcrsRecognizer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrsConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrsConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrsConfig {
    /// Expect both model files inside `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (role, path) in [
            ("detection", &self.detection_model_path),
            ("recognition", &self.recognition_model_path),
        ] {
            if !path.exists() {
                return Err(DocsiftError::Config(format!(
                    "{role} model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// [`TextRecognizer`] backed by an in-process `ocrs` engine.
///
/// Model loading is the expensive step; build one recognizer and share it.
pub struct OcrsRecognizer {
    engine: Arc<OcrsEngine>,
}

impl OcrsRecognizer {
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn new(config: OcrsConfig) -> Result<Self> {
        config.validate()?;

        let load = |path: &Path| {
            Model::load_file(path).map_err(|err| {
                DocsiftError::Config(format!("failed to load model from {}: {err}", path.display()))
            })
        };
        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(load(&config.detection_model_path)?),
            recognition_model: Some(load(&config.recognition_model_path)?),
            ..Default::default()
        })
        .map_err(|err| DocsiftError::Config(format!("failed to initialise ocrs engine: {err}")))?;

        info!("ocrs engine initialised");
        Ok(Self {
            engine: Arc::new(engine),
        })
    }
}

#[async_trait]
impl TextRecognizer for OcrsRecognizer {
    fn name(&self) -> &str {
        "ocrs"
    }

    async fn recognize(
        &self,
        buffer: &PixelBuffer,
        params: &RecognitionParams,
    ) -> Result<RawRecognition> {
        debug!(psm = params.page_seg_mode.as_number(), "ocrs ignores segmentation hints");
        let engine = Arc::clone(&self.engine);
        let rgb = buffer.to_dynamic()?.to_rgb8();

        blocking(move || {
            let failed = |stage: &str, err: &dyn std::fmt::Display| {
                DocsiftError::RecognitionFailed(format!("ocrs {stage} failed: {err}"))
            };
            let source = ImageSource::from_bytes(rgb.as_raw(), rgb.dimensions())
                .map_err(|err| failed("image source", &err))?;
            let input = engine
                .prepare_input(source)
                .map_err(|err| failed("preprocessing", &err))?;
            let words = engine
                .detect_words(&input)
                .map_err(|err| failed("word detection", &err))?;
            let line_rects = engine.find_text_lines(&input, &words);
            let lines = engine
                .recognize_text(&input, &line_rects)
                .map_err(|err| failed("line recognition", &err))?;

            let texts: Vec<String> = lines
                .iter()
                .flatten()
                .map(|line| line.to_string())
                .filter(|line| !line.trim().is_empty())
                .collect();
            let confidence = if line_rects.is_empty() {
                0.0
            } else {
                MAX_PROXY_CONFIDENCE * texts.len() as f32 / line_rects.len() as f32
            };
            Ok(RawRecognition {
                text: texts.join("\n"),
                confidence,
            })
        })
        .await
    }
}
