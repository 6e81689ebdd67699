// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image-side pipeline for one page: orientation, the two preprocessing
// profiles, then the recognition ladder.

use std::sync::Arc;

use docsift_core::config::PipelineConfig;
use docsift_core::error::Result;
use docsift_core::progress::{ProgressSink, ScaledProgress};
use tracing::{debug, instrument};

use crate::image::{PixelBuffer, preprocess};
use crate::orientation::OrientationResolver;
use crate::recognize::TextRecognizer;
use crate::strategy::{LadderOutcome, RecognitionStrategy};
use crate::task::blocking;

/// Recognizes decoded page images. Cheap to clone; shared by PDF pages and
/// image documents alike.
#[derive(Clone)]
pub struct PageRecognizer {
    recognizer: Arc<dyn TextRecognizer>,
    config: Arc<PipelineConfig>,
}

impl PageRecognizer {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, config: Arc<PipelineConfig>) -> Self {
        Self { recognizer, config }
    }

    pub fn recognizer_name(&self) -> &str {
        self.recognizer.name()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the page through orientation, preprocessing, and the ladder.
    ///
    /// Progress: orientation ends at 15, preprocessing at 25, and the ladder
    /// fills 25..=100. Orientation never fails the page; this fails only with
    /// `NoCandidateFound` or a preprocessing task error.
    #[instrument(skip_all, fields(width = page.width(), height = page.height()))]
    pub async fn recognize(
        &self,
        page: PixelBuffer,
        progress: &dyn ProgressSink,
    ) -> Result<LadderOutcome> {
        let upright = if self.config.orientation.enabled {
            OrientationResolver::new(self.recognizer.as_ref(), &self.config.orientation)
                .resolve(&page)
                .await
                .buffer
        } else {
            page
        };
        progress.report(15.0).await;

        let upright = Arc::new(upright);
        let (structure, recognition) = {
            let (page_a, page_b) = (Arc::clone(&upright), Arc::clone(&upright));
            let (profile_a, profile_b) = (
                self.config.structure_profile.clone(),
                self.config.recognition_profile.clone(),
            );
            tokio::join!(
                blocking(move || preprocess(&page_a, &profile_a)),
                blocking(move || preprocess(&page_b, &profile_b)),
            )
        };
        let (structure, recognition) = (structure?, recognition?);
        debug!(
            structure = ?(structure.width(), structure.height()),
            recognition = ?(recognition.width(), recognition.height()),
            "profiles prepared"
        );
        progress.report(25.0).await;

        let ladder_progress = ScaledProgress::new(progress, 25.0, 75.0);
        RecognitionStrategy::new(
            self.recognizer.as_ref(),
            &self.config.strategy,
            &self.config.layout,
        )
        .run(&structure, &recognition, &ladder_progress)
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use docsift_core::error::DocsiftError;
    use docsift_core::types::RecognitionParams;

    use super::*;
    use crate::recognize::{FnRecognizer, RawRecognition};
    use crate::strategy::RecognitionTier;

    #[derive(Default)]
    struct Recorded(Mutex<Vec<f32>>);

    #[async_trait]
    impl ProgressSink for Recorded {
        async fn report(&self, percent: f32) {
            self.0.lock().unwrap().push(percent);
        }
    }

    fn page_recognizer(
        recognize: impl Fn(&PixelBuffer, &RecognitionParams) -> Result<RawRecognition>
        + Send
        + Sync
        + 'static,
    ) -> PageRecognizer {
        PageRecognizer::new(
            Arc::new(FnRecognizer::new("fake", recognize)),
            Arc::new(PipelineConfig::default()),
        )
    }

    #[tokio::test]
    async fn confident_page_is_recognized_with_rising_progress() {
        let pages = page_recognizer(|_, _| {
            Ok(RawRecognition {
                text: "株式会社サンプル".into(),
                confidence: 93.0,
            })
        });
        let progress = Recorded::default();
        let outcome = pages
            .recognize(PixelBuffer::filled(120, 80, 3, 255), &progress)
            .await
            .unwrap();

        assert_eq!(outcome.tier, RecognitionTier::Structured);
        assert_eq!(outcome.candidate.text, "株式会社サンプル");
        let reported = progress.0.lock().unwrap().clone();
        assert!(reported.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(reported.first().copied(), Some(15.0));
        assert_eq!(reported.last().copied(), Some(100.0));
    }

    #[tokio::test]
    async fn failing_engine_surfaces_no_candidate() {
        let pages = page_recognizer(|_, _| Err(DocsiftError::RecognitionFailed("down".into())));
        let err = pages
            .recognize(PixelBuffer::filled(64, 64, 1, 255), &Recorded::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DocsiftError::NoCandidateFound));
    }

    #[tokio::test]
    async fn orientation_failures_do_not_fail_the_page() {
        // Probes run without a whitelist; every one of them fails.
        let config = PipelineConfig {
            orientation: docsift_core::config::OrientationConfig {
                probe_max_height: Some(40),
                ..Default::default()
            },
            ..PipelineConfig::default()
        };
        let pages = PageRecognizer::new(
            Arc::new(FnRecognizer::new("fake", |_: &PixelBuffer, params: &RecognitionParams| {
                if params.char_whitelist.is_none() {
                    return Err(DocsiftError::RecognitionFailed("probe rejected".into()));
                }
                Ok(RawRecognition {
                    text: "本文".into(),
                    confidence: 95.0,
                })
            })),
            Arc::new(config),
        );

        let outcome = pages
            .recognize(PixelBuffer::filled(90, 120, 1, 255), &Recorded::default())
            .await
            .unwrap();
        assert_eq!(outcome.candidate.text, "本文");
        assert_eq!(outcome.tier, RecognitionTier::Structured);
    }

    #[test]
    fn name_comes_from_the_engine() {
        let pages = page_recognizer(|_, _| {
            Ok(RawRecognition {
                text: String::new(),
                confidence: 0.0,
            })
        });
        assert_eq!(pages.recognizer_name(), "fake");
    }
}
