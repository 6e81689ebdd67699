// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration. Every threshold the extraction ladder, layout
// analyzer, and PDF source use lives here so it can be tuned without code
// changes.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{DocsiftError, Result};
use crate::types::{LanguageSet, PageSegMode};

/// Top-level settings for one `Pipeline`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Preprocessing used for the coarse fallback pass.
    pub recognition_profile: ProfileConfig,
    /// Preprocessing used for the structured passes and layout analysis.
    pub structure_profile: ProfileConfig,
    pub orientation: OrientationConfig,
    pub layout: LayoutConfig,
    pub strategy: StrategyConfig,
    pub pdf: PdfConfig,
    pub quality: QualityConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            recognition_profile: ProfileConfig::recognition(),
            structure_profile: ProfileConfig::structure(),
            orientation: OrientationConfig::default(),
            layout: LayoutConfig::default(),
            strategy: StrategyConfig::default(),
            pdf: PdfConfig::default(),
            quality: QualityConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse a JSON document. Missing sections fall back to defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&raw)?;
        debug!("pipeline config loaded");
        Ok(config)
    }

    /// Reject settings that would make the ladder or the page limits
    /// meaningless.
    pub fn validate(&self) -> Result<()> {
        self.recognition_profile.validate("recognition_profile")?;
        self.structure_profile.validate("structure_profile")?;
        self.strategy.validate()?;
        self.layout.validate()?;

        if self.pdf.render_dpi == 0 {
            return Err(DocsiftError::Config("pdf.render_dpi must be positive".into()));
        }
        Ok(())
    }
}

// -- Preprocessing profiles ----------------------------------------------------

/// Linear contrast `gain * p + offset`, applied per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearStretch {
    pub gain: f32,
    pub offset: f32,
}

/// One named preprocessing parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub name: String,
    /// Images taller than this are downscaled to it; smaller ones are kept.
    pub max_height: u32,
    /// Lower/upper percentiles mapped to black/white during normalization.
    pub normalize_percentiles: (f32, f32),
    /// Median filter radius. 0 disables denoising.
    pub median_radius: u32,
    pub linear: Option<LinearStretch>,
    pub sharpen_sigma: f32,
    pub sharpen_amount: f32,
    pub binarize: bool,
    /// White border added on every side.
    pub padding: u32,
}

impl ProfileConfig {
    /// Tuned for raw character accuracy.
    pub fn recognition() -> Self {
        Self {
            name: "recognition".into(),
            max_height: 2000,
            normalize_percentiles: (1.0, 99.0),
            median_radius: 1,
            linear: Some(LinearStretch {
                gain: 1.1,
                offset: -10.0,
            }),
            sharpen_sigma: 1.0,
            sharpen_amount: 0.6,
            binarize: false,
            padding: 16,
        }
    }

    /// Tuned for layout segmentation.
    pub fn structure() -> Self {
        Self {
            name: "structure".into(),
            max_height: 2200,
            normalize_percentiles: (1.0, 99.0),
            median_radius: 2,
            linear: None,
            sharpen_sigma: 2.0,
            sharpen_amount: 1.0,
            binarize: true,
            padding: 24,
        }
    }

    fn validate(&self, field: &str) -> Result<()> {
        if self.max_height == 0 {
            return Err(DocsiftError::Config(format!("{field}.max_height must be positive")));
        }
        let (low, high) = self.normalize_percentiles;
        if !(0.0..=100.0).contains(&low) || !(0.0..=100.0).contains(&high) || low >= high {
            return Err(DocsiftError::Config(format!(
                "{field}.normalize_percentiles must satisfy 0 <= low < high <= 100"
            )));
        }
        if self.sharpen_sigma < 0.0 {
            return Err(DocsiftError::Config(format!("{field}.sharpen_sigma must not be negative")));
        }
        Ok(())
    }
}

// -- Orientation ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    /// When false, images are used as decoded.
    pub enabled: bool,
    pub language: LanguageSet,
    pub page_seg_mode: PageSegMode,
    /// Downscale probe images taller than this before recognition.
    pub probe_max_height: Option<u32>,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            language: LanguageSet::japanese_english(),
            page_seg_mode: PageSegMode::Auto,
            probe_max_height: None,
        }
    }
}

// -- Layout --------------------------------------------------------------------

/// Projection-profile segmentation thresholds. Each `*_floor`/`*_ratio` pair
/// resolves to `max(floor, floor(ratio * extent))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// First-channel values below this count as ink.
    pub dark_threshold: u8,
    pub row_count_floor: u32,
    pub row_count_ratio: f32,
    pub row_length_floor: u32,
    pub row_length_ratio: f32,
    pub column_count_floor: u32,
    pub column_count_ratio: f32,
    pub column_length_floor: u32,
    pub column_length_ratio: f32,
    /// Pixels added on each side of a detected run.
    pub run_margin: u32,
    pub min_block_width_floor: u32,
    pub min_block_width_ratio: f32,
    pub min_block_height_floor: u32,
    pub min_block_height_ratio: f32,
    /// Blocks at most this tall are single lines.
    pub line_max_height: u32,
    pub paragraph_min_aspect: f32,
    pub vertical_max_aspect: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            dark_threshold: 200,
            row_count_floor: 8,
            row_count_ratio: 0.015,
            row_length_floor: 6,
            row_length_ratio: 0.01,
            column_count_floor: 6,
            column_count_ratio: 0.02,
            column_length_floor: 12,
            column_length_ratio: 0.03,
            run_margin: 1,
            min_block_width_floor: 16,
            min_block_width_ratio: 0.015,
            min_block_height_floor: 12,
            min_block_height_ratio: 0.01,
            line_max_height: 60,
            paragraph_min_aspect: 2.2,
            vertical_max_aspect: 0.7,
        }
    }
}

impl LayoutConfig {
    fn validate(&self) -> Result<()> {
        if self.vertical_max_aspect >= self.paragraph_min_aspect {
            return Err(DocsiftError::Config(
                "layout.vertical_max_aspect must be below layout.paragraph_min_aspect".into(),
            ));
        }
        Ok(())
    }
}

// -- Recognition ladder ----------------------------------------------------------

/// One language set tried with several segmentation modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassGroup {
    pub language: LanguageSet,
    pub modes: Vec<PageSegMode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Structured passes stop once a candidate reaches this confidence.
    pub early_accept: f32,
    /// Below this, layout blocks are recognized individually.
    pub low_confidence: f32,
    /// Below this, one coarse pass on the recognition profile is tried.
    pub very_low_confidence: f32,
    /// Confidence credited per non-empty block.
    pub block_credit: f32,
    /// Upper bound on the combined block confidence.
    pub block_confidence_cap: f32,
    /// White border added around each cropped block.
    pub block_padding: u32,
    pub block_language: LanguageSet,
    pub structured_passes: Vec<PassGroup>,
    pub fallback_language: LanguageSet,
    pub fallback_mode: PageSegMode,
    pub fallback_min_char_size: u32,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            early_accept: 90.0,
            low_confidence: 65.0,
            very_low_confidence: 50.0,
            block_credit: 3.0,
            block_confidence_cap: 98.0,
            block_padding: 4,
            block_language: LanguageSet::japanese_mixed(),
            structured_passes: vec![
                PassGroup {
                    language: LanguageSet::japanese_mixed(),
                    modes: vec![
                        PageSegMode::AutoOsd,
                        PageSegMode::Auto,
                        PageSegMode::SingleColumn,
                        PageSegMode::SingleBlock,
                        PageSegMode::SparseText,
                    ],
                },
                PassGroup {
                    language: LanguageSet::japanese_vertical(),
                    modes: vec![PageSegMode::SingleBlockVertical, PageSegMode::SingleColumn],
                },
            ],
            fallback_language: LanguageSet::japanese_mixed(),
            fallback_mode: PageSegMode::SingleBlock,
            fallback_min_char_size: 6,
        }
    }
}

impl StrategyConfig {
    fn validate(&self) -> Result<()> {
        if self.very_low_confidence > self.low_confidence {
            return Err(DocsiftError::Config(
                "strategy.very_low_confidence must not exceed strategy.low_confidence".into(),
            ));
        }
        if self.low_confidence > self.early_accept {
            return Err(DocsiftError::Config(
                "strategy.low_confidence must not exceed strategy.early_accept".into(),
            ));
        }
        if self.structured_passes.iter().all(|group| group.modes.is_empty()) {
            return Err(DocsiftError::Config(
                "strategy.structured_passes must name at least one mode".into(),
            ));
        }
        Ok(())
    }
}

// -- PDF -------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Pages read for the embedded text layer.
    pub text_layer_max_pages: u32,
    /// Pages rasterized when the text layer is empty.
    pub ocr_max_pages: u32,
    pub render_dpi: u32,
    /// Rasterize and recognize pages when no text layer exists.
    pub ocr_fallback: bool,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            text_layer_max_pages: 20,
            ocr_max_pages: 10,
            render_dpi: 400,
            ocr_fallback: true,
        }
    }
}

// -- Quality -----------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Rewrite known recognizer garbles when quality is low.
    pub repair_garbles: bool,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            repair_garbles: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        PipelineConfig::default().validate().expect("defaults are valid");
    }

    #[test]
    fn only_structure_profile_binarizes() {
        let config = PipelineConfig::default();
        assert!(config.structure_profile.binarize);
        assert!(!config.recognition_profile.binarize);
        assert_eq!(config.structure_profile.padding, 24);
        assert_eq!(config.recognition_profile.padding, 16);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config = PipelineConfig::from_json_str(
            r#"{ "pdf": { "ocr_max_pages": 3 }, "strategy": { "block_credit": 5.0 } }"#,
        )
        .expect("parse");
        assert_eq!(config.pdf.ocr_max_pages, 3);
        assert_eq!(config.pdf.text_layer_max_pages, 20);
        assert_eq!(config.strategy.block_credit, 5.0);
        assert_eq!(config.strategy.low_confidence, 65.0);
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let mut config = PipelineConfig::default();
        config.strategy.very_low_confidence = 80.0;
        assert!(matches!(config.validate(), Err(DocsiftError::Config(_))));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("docsift.json");
        std::fs::write(&path, r#"{ "pdf": { "render_dpi": 300 } }"#).expect("write");
        let config = PipelineConfig::load(&path).expect("load");
        assert_eq!(config.pdf.render_dpi, 300);
    }
}
