// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition quality heuristics and known-garble repair.

use std::sync::LazyLock;

use docsift_core::config::QualityConfig;
use docsift_core::types::{QualityLevel, UNRECOGNIZED_TEXT};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

static GIBBERISH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Z]{4,}[^a-z\s]{2,}|[A-Z]{2,}[^a-z\s]{4,}").expect("gibberish pattern compiles")
});
static UPPERCASE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z]{5,}").expect("uppercase pattern compiles"));

/// Words whose presence suggests the recognizer produced real language.
const COMMON_WORDS: &[&str] = &[
    "株式会社", "有限会社", "合同会社", "the", "and", "or", "of", "in", "to", "for",
];

/// Garbles the recognizer is known to emit for Japanese company suffixes.
const KNOWN_GARBLES: &[(&str, &str)] = &[
    ("BOLAHHERII", "株式会社"),
    ("FEDRIOEETR", "有限会社"),
    ("RORKEMHFLI", "合同会社"),
    ("ZELRENR", "株式会社"),
    ("BRRSh", "株式会社"),
    ("Y—Z", "株式会社"),
];

/// Placeholder for runs that could not be repaired.
pub const UNRECOGNIZED_RUN: &str = "[unrecognized]";

const SPECIAL_CHAR_RATIO_LIMIT: f32 = 0.3;
const COMMON_WORD_MIN_LEN: usize = 50;
const EXAMPLES_PER_ISSUE: usize = 3;

/// Grade plus human-readable reasons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityReport {
    pub level: QualityLevel,
    pub issues: Vec<String>,
}

/// Grade `text`. Gibberish runs make it `Low`; every other finding caps it
/// at `Medium`.
pub fn assess(text: &str) -> QualityReport {
    let mut issues = Vec::new();
    let mut level = QualityLevel::High;

    let gibberish: Vec<&str> = GIBBERISH.find_iter(text).map(|m| m.as_str()).collect();
    if !gibberish.is_empty() {
        issues.push(format!(
            "gibberish sequences detected: {}",
            examples(&gibberish)
        ));
        level = QualityLevel::Low;
    }

    let caps: Vec<&str> = UPPERCASE_RUN.find_iter(text).map(|m| m.as_str()).collect();
    if !caps.is_empty() {
        issues.push(format!("long uppercase runs detected: {}", examples(&caps)));
        level = level.min(QualityLevel::Medium);
    }

    let counted: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if !counted.is_empty() {
        let special = counted
            .iter()
            .filter(|&&c| !(c.is_ascii_alphanumeric() || is_japanese_letter(c)))
            .count();
        if special as f32 / counted.len() as f32 > SPECIAL_CHAR_RATIO_LIMIT {
            issues.push("high ratio of special characters".to_owned());
            level = level.min(QualityLevel::Medium);
        }
    }

    let lowered = text.to_lowercase();
    let has_common_word = COMMON_WORDS.iter().any(|word| lowered.contains(word));
    if !has_common_word && text.chars().count() > COMMON_WORD_MIN_LEN {
        issues.push("no common words detected".to_owned());
        level = level.min(QualityLevel::Medium);
    }

    QualityReport { level, issues }
}

/// Assesses text and, when configured, repairs low-quality output.
#[derive(Debug, Clone, Default)]
pub struct QualityChecker {
    config: QualityConfig,
}

impl QualityChecker {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    /// Return the (possibly repaired) text and its final report. The
    /// unrecognized-text placeholder is passed through untouched.
    #[instrument(skip_all, fields(text_len = text.len()))]
    pub fn review(&self, text: &str) -> (String, QualityReport) {
        if text == UNRECOGNIZED_TEXT {
            return (
                text.to_owned(),
                QualityReport {
                    level: QualityLevel::Low,
                    issues: vec!["no text could be recognized".to_owned()],
                },
            );
        }

        let report = assess(text);
        if report.level != QualityLevel::Low || !self.config.repair_garbles {
            return (text.to_owned(), report);
        }

        let repaired = repair(text);
        let repaired_report = assess(&repaired);
        debug!(
            before = ?report.level,
            after = ?repaired_report.level,
            "low-quality text repaired"
        );
        (repaired, repaired_report)
    }
}

/// Replace known garbles, then any remaining gibberish run.
pub fn repair(text: &str) -> String {
    let mut repaired = text.to_owned();
    for (garble, replacement) in KNOWN_GARBLES {
        repaired = repaired.replace(garble, replacement);
    }
    GIBBERISH
        .replace_all(&repaired, UNRECOGNIZED_RUN)
        .into_owned()
}

fn examples(found: &[&str]) -> String {
    found
        .iter()
        .take(EXAMPLES_PER_ISSUE)
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
}

fn is_japanese_letter(c: char) -> bool {
    matches!(c, 'あ'..='ん' | 'ア'..='ン' | '一'..='龯')
}
