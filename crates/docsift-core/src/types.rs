// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Docsift extraction pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Text substituted when no recognition attempt produced any text.
pub const UNRECOGNIZED_TEXT: &str = "text could not be recognized";

/// Characters the recognizer is allowed to emit: ASCII alphanumerics,
/// hiragana, and the Japanese punctuation seen on printed handouts.
pub const DEFAULT_CHAR_WHITELIST: &str = concat!(
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789",
    "あいうえおかきくけこさしすせそたちつてとなにぬねのはひふへほまみむめもやゆよらりるれろわをん",
    "がぎぐげござじずぜぞだぢづでどばびぶべぼぱぴぷぺぽゃゅょっ",
    "ー・、。！？（）「」『』【】〈〉《》〔〕［］｛｝",
);

/// Unique identifier for an extraction job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle states of an extraction job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Registered, pipeline not yet started.
    Queued,
    /// Pipeline is running; progress is in `[0, 99]`.
    Running,
    /// Finished with a result; progress is 100.
    Succeeded,
    /// Aborted by a fatal error; the record carries the message.
    Failed,
}

/// Progress snapshot for one job, as kept by a [`crate::progress::JobStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub status: JobStatus,
    /// Completion percentage. Never decreases over the life of the job.
    pub progress: u8,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn new(id: JobId) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Queued,
            progress: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Supported input document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    Image,
    Pdf,
    PlainText,
    Html,
}

impl DocumentKind {
    /// Infer the document kind from a MIME type such as `image/png`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(Self::Pdf),
            "text/plain" => Some(Self::PlainText),
            "text/html" | "application/xhtml+xml" => Some(Self::Html),
            other if other.starts_with("image/") => Some(Self::Image),
            _ => None,
        }
    }

    /// Infer the document kind from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "jpg" | "jpeg" | "png" | "tif" | "tiff" | "bmp" | "gif" | "webp" => Some(Self::Image),
            "txt" => Some(Self::PlainText),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }
}

// -- Recognition parameters -------------------------------------------------

/// Page-segmentation hint passed to the recognition engine.
///
/// Discriminants match Tesseract's `--psm` numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageSegMode {
    /// Automatic segmentation with orientation and script detection.
    AutoOsd = 1,
    /// Fully automatic segmentation.
    Auto = 3,
    /// A single column of text of variable sizes.
    SingleColumn = 4,
    /// A single uniform block of vertically aligned text.
    SingleBlockVertical = 5,
    /// A single uniform block of text.
    SingleBlock = 6,
    /// A single text line.
    SingleLine = 7,
    /// As much text as possible, in no particular order.
    SparseText = 11,
}

impl PageSegMode {
    pub fn as_number(self) -> u8 {
        self as u8
    }

    pub fn from_number(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::AutoOsd),
            3 => Some(Self::Auto),
            4 => Some(Self::SingleColumn),
            5 => Some(Self::SingleBlockVertical),
            6 => Some(Self::SingleBlock),
            7 => Some(Self::SingleLine),
            11 => Some(Self::SparseText),
            _ => None,
        }
    }
}

impl std::fmt::Display for PageSegMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "psm{}", self.as_number())
    }
}

/// A `+`-joined set of recognizer language packs, e.g. `jpn+jpn_vert+eng`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageSet(String);

impl LanguageSet {
    pub fn new(spec: impl Into<String>) -> Self {
        Self(spec.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Individual language codes in order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.0.split('+').filter(|code| !code.is_empty())
    }

    /// Horizontal and vertical Japanese plus English.
    pub fn japanese_mixed() -> Self {
        Self::new("jpn+jpn_vert+eng")
    }

    /// Vertical Japanese plus English.
    pub fn japanese_vertical() -> Self {
        Self::new("jpn_vert+eng")
    }

    /// Horizontal Japanese plus English, used for orientation probes.
    pub fn japanese_english() -> Self {
        Self::new("jpn+eng")
    }
}

impl std::fmt::Display for LanguageSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The full set of options a recognizer understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionParams {
    pub language: LanguageSet,
    pub page_seg_mode: PageSegMode,
    /// Restrict output to these characters. `None` lets the engine emit anything.
    pub char_whitelist: Option<String>,
    /// Smallest glyph height, in pixels, the engine should accept.
    pub min_char_size: u32,
    /// Largest glyph height, in pixels, the engine should accept.
    pub max_char_size: u32,
    pub preserve_interword_spaces: bool,
}

impl RecognitionParams {
    /// Parameters with the default whitelist and glyph-size window.
    pub fn new(language: LanguageSet, page_seg_mode: PageSegMode) -> Self {
        Self {
            language,
            page_seg_mode,
            char_whitelist: Some(DEFAULT_CHAR_WHITELIST.to_owned()),
            min_char_size: 4,
            max_char_size: 90,
            preserve_interword_spaces: true,
        }
    }

    /// Bare parameters for quick probe passes: no whitelist, no size window.
    pub fn probe(language: LanguageSet, page_seg_mode: PageSegMode) -> Self {
        Self {
            language,
            page_seg_mode,
            char_whitelist: None,
            min_char_size: 0,
            max_char_size: 0,
            preserve_interword_spaces: false,
        }
    }

    pub fn with_page_seg_mode(mut self, page_seg_mode: PageSegMode) -> Self {
        self.page_seg_mode = page_seg_mode;
        self
    }

    pub fn with_min_char_size(mut self, min_char_size: u32) -> Self {
        self.min_char_size = min_char_size;
        self
    }
}

/// Output of one recognition attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionCandidate {
    pub text: String,
    /// Engine-reported confidence, 0–100.
    pub confidence: f32,
    pub page_seg_mode: PageSegMode,
    pub language: LanguageSet,
}

impl RecognitionCandidate {
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

// -- Geometry -----------------------------------------------------------------

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether the rectangle lies entirely inside a `width` x `height` canvas.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }
}

/// Padding added around a buffer, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Margins {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl Margins {
    pub fn uniform(size: u32) -> Self {
        Self {
            top: size,
            right: size,
            bottom: size,
            left: size,
        }
    }
}

// -- Layout -------------------------------------------------------------------

/// Shape class of a layout block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    Line,
    Paragraph,
    Block,
}

/// One segmented region of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutBlock {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
    pub kind: BlockKind,
    pub page_seg_hint: PageSegMode,
    /// Fraction of dark pixels inside the rectangle.
    pub density: f32,
}

impl LayoutBlock {
    pub fn rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.width, self.height)
    }
}

// -- Results ------------------------------------------------------------------

/// Entities found in normalized text. Each list holds distinct values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySet {
    pub companies: Vec<String>,
    pub products: Vec<String>,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub urls: Vec<String>,
}

impl EntitySet {
    pub fn has_contact(&self) -> bool {
        !(self.emails.is_empty() && self.phones.is_empty() && self.urls.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        !self.has_contact() && self.companies.is_empty() && self.products.is_empty()
    }
}

/// Coarse quality grade of recognized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityLevel {
    Low,
    Medium,
    High,
}

/// Text attributed to one PDF page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    /// 1-based page number.
    pub page_number: u32,
    pub text: String,
    /// Whether the text came from recognition rather than the text layer.
    pub ocr: bool,
    pub word_count: usize,
}

/// Document-level facts read from a PDF's trailer and page tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfMetadata {
    pub page_count: u32,
    /// Page sizes in PDF points (width, height).
    pub page_sizes: Vec<(f32, f32)>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
}

/// Terminal artifact of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub text: String,
    /// 0–100.
    pub confidence: f32,
    pub engine_used: String,
    pub processing_time_ms: u64,
    pub quality: QualityLevel,
    pub quality_issues: Vec<String>,
    pub entities: EntitySet,
    pub tags: Vec<String>,
    pub source_kind: DocumentKind,
    /// Per-page breakdown; empty for single-image and text inputs.
    pub pages: Vec<PageText>,
    pub pdf_metadata: Option<PdfMetadata>,
}

impl ExtractionResult {
    /// Whether every recognition attempt failed and the text is the fallback.
    pub fn is_unrecognized(&self) -> bool {
        self.text == UNRECOGNIZED_TEXT
    }
}
