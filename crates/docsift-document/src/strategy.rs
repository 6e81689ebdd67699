// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Confidence-arbitration ladder.
//
// Stage A runs every configured (language, mode) pass over the structure
// buffer. Stage B recognizes layout blocks one by one when A is weak. Stage C
// makes one coarse pass over the recognition buffer when everything so far is
// very weak. The best candidate with text wins.

use std::fmt;

use docsift_core::config::{LayoutConfig, StrategyConfig};
use docsift_core::error::{DocsiftError, Result};
use docsift_core::progress::ProgressSink;
use docsift_core::types::{
    LanguageSet, LayoutBlock, Margins, PageSegMode, RecognitionCandidate, RecognitionParams,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::image::{PixelBuffer, extract, pad};
use crate::layout::analyze;
use crate::recognize::TextRecognizer;
use crate::task::blocking;

/// Ladder stage a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognitionTier {
    Structured,
    Layout,
    Fallback,
}

impl fmt::Display for RecognitionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Structured => "structured",
            Self::Layout => "layout",
            Self::Fallback => "fallback",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LadderOutcome {
    pub candidate: RecognitionCandidate,
    pub tier: RecognitionTier,
    /// Recognizer calls made, failed ones included.
    pub attempts: u32,
}

/// Best candidate so far. A missing candidate scores below every real one.
#[derive(Default)]
struct Best {
    current: Option<(RecognitionCandidate, RecognitionTier)>,
}

impl Best {
    fn confidence(&self) -> f32 {
        self.current
            .as_ref()
            .map_or(f32::NEG_INFINITY, |(candidate, _)| candidate.confidence)
    }

    /// Keep `candidate` when it has text and strictly beats the current best.
    fn offer(&mut self, candidate: RecognitionCandidate, tier: RecognitionTier) -> bool {
        if candidate.has_text() && candidate.confidence > self.confidence() {
            self.current = Some((candidate, tier));
            true
        } else {
            false
        }
    }
}

pub struct RecognitionStrategy<'a> {
    recognizer: &'a dyn TextRecognizer,
    config: &'a StrategyConfig,
    layout: &'a LayoutConfig,
}

impl<'a> RecognitionStrategy<'a> {
    pub fn new(
        recognizer: &'a dyn TextRecognizer,
        config: &'a StrategyConfig,
        layout: &'a LayoutConfig,
    ) -> Self {
        Self {
            recognizer,
            config,
            layout,
        }
    }

    /// Climb the ladder. Fails only with `NoCandidateFound`.
    ///
    /// `progress` receives 0..=100 for the ladder alone; callers scale it.
    #[instrument(skip_all, fields(engine = self.recognizer.name()))]
    pub async fn run(
        &self,
        structure: &PixelBuffer,
        recognition: &PixelBuffer,
        progress: &dyn ProgressSink,
    ) -> Result<LadderOutcome> {
        let mut best = Best::default();
        let mut attempts = 0u32;

        // -- Stage A: structured passes ------------------------------------------

        let passes: Vec<(&LanguageSet, PageSegMode)> = self
            .config
            .structured_passes
            .iter()
            .flat_map(|group| group.modes.iter().map(move |&mode| (&group.language, mode)))
            .collect();
        for (index, (language, mode)) in passes.iter().enumerate() {
            let params = RecognitionParams::new((*language).clone(), *mode);
            attempts += 1;
            if let Some(candidate) = self.attempt(structure, &params).await {
                best.offer(candidate, RecognitionTier::Structured);
            }
            progress
                .report(60.0 * (index + 1) as f32 / passes.len() as f32)
                .await;
            if best.confidence() >= self.config.early_accept {
                debug!(confidence = best.confidence(), "early accept");
                break;
            }
        }
        info!(confidence = best.confidence(), "structured passes finished");

        // -- Stage B: layout blocks ------------------------------------------------

        if best.confidence() < self.config.low_confidence {
            let (candidate, calls) = self.layout_pass(structure, best.confidence()).await;
            attempts += calls;
            if let Some(candidate) = candidate {
                if best.offer(candidate, RecognitionTier::Layout) {
                    info!(confidence = best.confidence(), "layout blocks accepted");
                }
            }
        }
        progress.report(90.0).await;

        // -- Stage C: coarse fallback ------------------------------------------------

        if best.confidence() < self.config.very_low_confidence {
            let params = RecognitionParams::new(
                self.config.fallback_language.clone(),
                self.config.fallback_mode,
            )
            .with_min_char_size(self.config.fallback_min_char_size);
            attempts += 1;
            if let Some(candidate) = self.attempt(recognition, &params).await {
                if best.offer(candidate, RecognitionTier::Fallback) {
                    info!(confidence = best.confidence(), "coarse fallback accepted");
                }
            }
        }
        progress.report(100.0).await;

        match best.current {
            Some((candidate, tier)) => {
                info!(%tier, confidence = candidate.confidence, attempts, "ladder finished");
                Ok(LadderOutcome {
                    candidate,
                    tier,
                    attempts,
                })
            }
            None => {
                warn!(attempts, "no recognition attempt produced text");
                Err(DocsiftError::NoCandidateFound)
            }
        }
    }

    /// One recognizer call. Failures are logged and yield no candidate.
    async fn attempt(
        &self,
        buffer: &PixelBuffer,
        params: &RecognitionParams,
    ) -> Option<RecognitionCandidate> {
        match self.recognizer.recognize(buffer, params).await {
            Ok(raw) => {
                debug!(
                    lang = %params.language,
                    psm = params.page_seg_mode.as_number(),
                    confidence = raw.confidence,
                    "attempt finished"
                );
                Some(RecognitionCandidate {
                    text: raw.text,
                    confidence: raw.confidence,
                    page_seg_mode: params.page_seg_mode,
                    language: params.language.clone(),
                })
            }
            Err(err) => {
                warn!(
                    lang = %params.language,
                    psm = params.page_seg_mode.as_number(),
                    %err,
                    "recognition attempt failed"
                );
                None
            }
        }
    }

    /// Recognize each layout block on its own and combine the texts.
    ///
    /// The combined confidence credits every block that produced text on top
    /// of the Stage A best (a missing best counts as 0), capped. The candidate
    /// carries the hint of the first block that produced text. Never fails: a
    /// broken analysis skips the stage and a broken crop skips its block.
    async fn layout_pass(
        &self,
        structure: &PixelBuffer,
        stage_a: f32,
    ) -> (Option<RecognitionCandidate>, u32) {
        let owned = structure.clone();
        let layout = self.layout.clone();
        let padding = self.config.block_padding;
        let crops = match blocking(move || {
            let blocks = analyze(&owned, &layout);
            Ok(crop_blocks(&owned, &blocks, padding))
        })
        .await
        {
            Ok(crops) => crops,
            Err(err) => {
                warn!(%err, "layout analysis failed, skipping layout blocks");
                return (None, 0);
            }
        };
        debug!(blocks = crops.len(), "layout blocks cropped");

        let mut texts = Vec::new();
        let mut first_hint = None;
        let mut calls = 0u32;
        for (hint, crop) in &crops {
            let params = RecognitionParams::new(self.config.block_language.clone(), *hint);
            calls += 1;
            if let Some(candidate) = self.attempt(crop, &params).await {
                let text = candidate.text.trim();
                if !text.is_empty() {
                    first_hint.get_or_insert(*hint);
                    texts.push(text.to_owned());
                }
            }
        }
        let Some(page_seg_mode) = first_hint else {
            return (None, calls);
        };

        let combined = (stage_a.max(0.0) + self.config.block_credit * texts.len() as f32)
            .round()
            .min(self.config.block_confidence_cap);
        debug!(blocks_with_text = texts.len(), combined, "layout pass combined");
        (
            Some(RecognitionCandidate {
                text: texts.join("\n\n"),
                confidence: combined,
                page_seg_mode,
                language: self.config.block_language.clone(),
            }),
            calls,
        )
    }
}

/// Cut out and pad every block, in order, skipping any that cannot be cut.
fn crop_blocks(
    structure: &PixelBuffer,
    blocks: &[LayoutBlock],
    padding: u32,
) -> Vec<(PageSegMode, PixelBuffer)> {
    blocks
        .iter()
        .filter_map(|block| {
            let cropped = extract(structure, block.rect())
                .and_then(|crop| pad(&crop, Margins::uniform(padding), 255));
            match cropped {
                Ok(crop) => Some((block.page_seg_hint, crop)),
                Err(err) => {
                    warn!(left = block.left, top = block.top, %err, "layout block skipped");
                    None
                }
            }
        })
        .collect()
}
