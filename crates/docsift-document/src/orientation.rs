// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Orientation probing: recognize the page at each quarter turn and keep the
// rotation the recognizer is most confident about.

use docsift_core::config::OrientationConfig;
use docsift_core::error::Result;
use docsift_core::types::RecognitionParams;
use tracing::{debug, info, instrument, warn};

use crate::image::{ImageProcessor, PixelBuffer, rotate};
use crate::recognize::TextRecognizer;
use crate::task::blocking;

/// Clockwise rotations tried, in order.
pub const PROBE_ANGLES: [u16; 4] = [0, 90, 180, 270];

/// The chosen rotation.
#[derive(Debug, Clone)]
pub struct OrientationOutcome {
    /// Source rotated by `angle`.
    pub buffer: PixelBuffer,
    pub angle: u16,
    /// Probe confidence at `angle`; −1 when every probe failed.
    pub confidence: f32,
    /// Other angles that scored exactly `confidence`.
    pub tied_angles: Vec<u16>,
}

pub struct OrientationResolver<'a> {
    recognizer: &'a dyn TextRecognizer,
    config: &'a OrientationConfig,
}

impl<'a> OrientationResolver<'a> {
    pub fn new(recognizer: &'a dyn TextRecognizer, config: &'a OrientationConfig) -> Self {
        Self { recognizer, config }
    }

    /// Probe every quarter turn of `source`.
    ///
    /// Only a strictly higher confidence replaces the current choice, so ties
    /// keep the smallest angle. A rotation that cannot be prepared or probed is
    /// skipped; when none succeeds the source comes back with confidence −1.
    #[instrument(skip_all, fields(width = source.width(), height = source.height()))]
    pub async fn resolve(&self, source: &PixelBuffer) -> OrientationOutcome {
        let params = RecognitionParams::probe(self.config.language.clone(), self.config.page_seg_mode);
        let mut best: Option<OrientationOutcome> = None;

        for angle in PROBE_ANGLES {
            let rotated = if angle == 0 {
                source.clone()
            } else {
                let owned = source.clone();
                match blocking(move || rotate(&owned, angle as f32, 255)).await {
                    Ok(rotated) => rotated,
                    Err(err) => {
                        warn!(angle, %err, "rotation failed, skipping angle");
                        continue;
                    }
                }
            };
            let probe = match self.probe_buffer(&rotated).await {
                Ok(probe) => probe,
                Err(err) => {
                    warn!(angle, %err, "probe downscale failed, skipping angle");
                    continue;
                }
            };

            let confidence = match self.recognizer.recognize(&probe, &params).await {
                Ok(raw) => raw.confidence,
                Err(err) => {
                    warn!(angle, %err, "orientation probe failed");
                    continue;
                }
            };
            debug!(angle, confidence, "orientation probed");

            match &mut best {
                Some(current) if confidence > current.confidence => {
                    *current = OrientationOutcome {
                        buffer: rotated,
                        angle,
                        confidence,
                        tied_angles: Vec::new(),
                    };
                }
                Some(current) => {
                    if confidence == current.confidence {
                        current.tied_angles.push(angle);
                    }
                }
                None => {
                    best = Some(OrientationOutcome {
                        buffer: rotated,
                        angle,
                        confidence,
                        tied_angles: Vec::new(),
                    });
                }
            }
        }

        let outcome = best.unwrap_or_else(|| {
            warn!("every orientation probe failed, keeping the source orientation");
            OrientationOutcome {
                buffer: source.clone(),
                angle: 0,
                confidence: -1.0,
                tied_angles: Vec::new(),
            }
        });
        info!(
            angle = outcome.angle,
            confidence = outcome.confidence,
            tied = ?outcome.tied_angles,
            "orientation resolved"
        );
        outcome
    }

    /// The buffer handed to the recognizer, downscaled when configured.
    async fn probe_buffer(&self, rotated: &PixelBuffer) -> Result<PixelBuffer> {
        match self.config.probe_max_height {
            Some(max_height) if rotated.height() > max_height => {
                let owned = rotated.clone();
                blocking(move || {
                    Ok(ImageProcessor::from_buffer(&owned)?
                        .fit_height(max_height)
                        .into_buffer())
                })
                .await
            }
            _ => Ok(rotated.clone()),
        }
    }
}
