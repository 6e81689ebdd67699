// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tesseract command-line binding.
//
// Each attempt writes the buffer to a scoped temporary PNG, runs the
// `tesseract` binary with TSV output, and averages the word confidences.
// The temporary file is removed when the attempt returns, on every path.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use docsift_core::error::{DocsiftError, Result};
use docsift_core::types::RecognitionParams;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, instrument};

use super::{RawRecognition, TextRecognizer};
use crate::image::{PixelBuffer, encode_png};
use crate::task::blocking;

/// TSV row level for a single word.
const WORD_LEVEL: u32 = 5;

/// Settings for [`TesseractRecognizer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractConfig {
    /// Executable to run; resolved through `PATH` when relative.
    pub binary: PathBuf,
    /// Passed as `--tessdata-dir` when set.
    pub tessdata_dir: Option<PathBuf>,
    /// Per-attempt limit. `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            tessdata_dir: None,
            timeout_secs: Some(120),
        }
    }
}

/// [`TextRecognizer`] backed by the `tesseract` CLI (LSTM engine).
#[derive(Debug, Clone, Default)]
pub struct TesseractRecognizer {
    config: TesseractConfig,
}

impl TesseractRecognizer {
    pub fn new(config: TesseractConfig) -> Self {
        Self { config }
    }

    /// Command-line arguments for recognizing `image_path` with `params`.
    pub fn command_args(&self, image_path: &Path, params: &RecognitionParams) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            image_path.as_os_str().to_owned(),
            "stdout".into(),
            "-l".into(),
            params.language.as_str().into(),
            "--oem".into(),
            "1".into(),
            "--psm".into(),
            params.page_seg_mode.as_number().to_string().into(),
        ];
        if let Some(dir) = &self.config.tessdata_dir {
            args.push("--tessdata-dir".into());
            args.push(dir.as_os_str().to_owned());
        }

        let mut variables = Vec::new();
        if let Some(whitelist) = &params.char_whitelist {
            variables.push(format!("tessedit_char_whitelist={whitelist}"));
        }
        if params.min_char_size > 0 {
            variables.push(format!("tessedit_min_char_size={}", params.min_char_size));
        }
        if params.max_char_size > 0 {
            variables.push(format!("tessedit_max_char_size={}", params.max_char_size));
        }
        if params.preserve_interword_spaces {
            variables.push("preserve_interword_spaces=1".to_owned());
        }
        for variable in variables {
            args.push("-c".into());
            args.push(variable.into());
        }

        args.push("tsv".into());
        args
    }

    async fn run(&self, args: Vec<OsString>) -> Result<std::process::Output> {
        let mut command = Command::new(&self.config.binary);
        command.args(args).kill_on_drop(true);

        let spawn_failed = |err: std::io::Error| {
            DocsiftError::RecognitionFailed(format!(
                "failed to run {} (is it installed?): {err}",
                self.config.binary.display()
            ))
        };

        match self.config.timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), command.output())
                .await
                .map_err(|_| {
                    DocsiftError::RecognitionFailed(format!("tesseract timed out after {secs}s"))
                })?
                .map_err(spawn_failed),
            None => command.output().await.map_err(spawn_failed),
        }
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    #[instrument(skip_all, fields(lang = %params.language, psm = params.page_seg_mode.as_number()))]
    async fn recognize(
        &self,
        buffer: &PixelBuffer,
        params: &RecognitionParams,
    ) -> Result<RawRecognition> {
        let owned = buffer.clone();
        let png = blocking(move || encode_png(&owned)).await?;

        let mut input = tempfile::Builder::new()
            .prefix("docsift-")
            .suffix(".png")
            .tempfile()
            .map_err(|err| DocsiftError::RecognitionFailed(format!("temp file: {err}")))?;
        input
            .write_all(&png)
            .and_then(|()| input.flush())
            .map_err(|err| DocsiftError::RecognitionFailed(format!("temp file write: {err}")))?;

        let output = self.run(self.command_args(input.path(), params)).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DocsiftError::RecognitionFailed(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let recognition = parse_tsv(&String::from_utf8_lossy(&output.stdout));
        debug!(
            chars = recognition.text.chars().count(),
            confidence = recognition.confidence,
            "tesseract attempt finished"
        );
        Ok(recognition)
    }
}

/// Rebuild text from Tesseract TSV word rows.
///
/// Words on one line are joined by a space, lines by a newline, and blocks by
/// an empty line. The confidence is the mean of the word confidences; rows
/// with a negative confidence carry no word and are skipped.
pub fn parse_tsv(tsv: &str) -> RawRecognition {
    let mut text = String::new();
    let mut previous: Option<(u32, u32, u32, u32)> = None;
    let mut confidence_sum = 0.0f64;
    let mut words = 0usize;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }
        let level: u32 = cols[0].parse().unwrap_or(0);
        if level != WORD_LEVEL {
            continue;
        }
        let confidence: f32 = cols[10].trim().parse().unwrap_or(-1.0);
        let word = cols[11].trim();
        if word.is_empty() || confidence < 0.0 {
            continue;
        }

        let number = |index: usize| cols[index].parse::<u32>().unwrap_or(0);
        let key = (number(1), number(2), number(3), number(4));
        match previous {
            None => {}
            Some(prev) if prev == key => text.push(' '),
            Some(prev) if (prev.0, prev.1) == (key.0, key.1) => text.push('\n'),
            Some(_) => text.push_str("\n\n"),
        }
        text.push_str(word);
        previous = Some(key);

        confidence_sum += confidence as f64;
        words += 1;
    }

    let confidence = if words == 0 {
        0.0
    } else {
        (confidence_sum / words as f64) as f32
    };
    RawRecognition { text, confidence }
}
