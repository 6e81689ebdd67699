// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Deterministic rewrite rules applied to raw recognizer output. The rules run
// in a fixed order and the composition is idempotent:
// `normalize(normalize(t)) == normalize(t)`.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, instrument};

static PHONE_SPACING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{2,4}) *- *([0-9]{4}) *- *([0-9]{4})").expect("phone pattern compiles")
});
static POSTAL_SPACING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{3}) *- *([0-9]{4})").expect("postal pattern compiles"));
static CURRENCY_SPACING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{1,3}(?:,[0-9]{3})*) +円").expect("currency pattern compiles")
});
static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{4})/([0-9]{1,2})/([0-9]{1,2})").expect("date pattern compiles")
});

static SENTENCE_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([。！？]) *([ぁ-んァ-ヶー一-龯々])").expect("sentence pattern compiles")
});
static LIST_AFTER_SENTENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([。！？]) *([0-9]{1,2}\. |[・•])").expect("list pattern compiles")
});
static INLINE_BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" +([・•])").expect("bullet pattern compiles"));
static SECTION_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(概要|詳細要件)[:：] *\n?").expect("label pattern compiles")
});

static MULTI_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {2,}").expect("space pattern compiles"));
static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("newline pattern compiles"));
static LIST_LINE_GAP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^((?:[0-9]+\.|[・•*\-])[^\n]*)\n{2,}").expect("list gap pattern compiles")
});

static PUNCT_SPACING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" *([。、！？]) *").expect("punctuation pattern compiles"));
static BRACKET_SPACING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r" *([（）「」『』【】〈〉《》〔〕［］｛｝]) *").expect("bracket pattern compiles")
});

/// Run every rule in order.
#[instrument(skip_all, fields(input_len = text.len()))]
pub fn normalize(text: &str) -> String {
    let text = canonicalize_chars(text);
    let text = canonicalize_patterns(&text);
    let text = mark_structure(&text);
    let text = collapse_whitespace(&text);
    let text = tighten_spacing(&text);
    debug!(output_len = text.len(), "text normalized");
    text
}

// -- Rule groups ----------------------------------------------------------------

/// Full-width digits, letters, hyphen, and at-sign become ASCII; tabs,
/// ideographic and no-break spaces become plain spaces; line endings become `\n`.
pub fn canonicalize_chars(text: &str) -> String {
    text.replace("\r\n", "\n")
        .chars()
        .map(|c| match c {
            '０'..='９' | 'Ａ'..='Ｚ' | 'ａ'..='ｚ' | '＠' => {
                char::from_u32(c as u32 - 0xFEE0).unwrap_or(c)
            }
            '－' => '-',
            '\r' => '\n',
            '\t' | '\u{3000}' | '\u{00A0}' => ' ',
            other => other,
        })
        .collect()
}

/// Phone, postal-code, and currency spacing plus date zero-padding.
pub fn canonicalize_patterns(text: &str) -> String {
    let text = PHONE_SPACING.replace_all(text, "${1}-${2}-${3}");
    let text = POSTAL_SPACING.replace_all(&text, "${1}-${2}");
    let text = CURRENCY_SPACING.replace_all(&text, "${1}円");
    DATE.replace_all(&text, |caps: &Captures<'_>| {
        format!("{}/{:0>2}/{:0>2}", &caps[1], &caps[2], &caps[3])
    })
    .into_owned()
}

/// Line breaks after sentence ends, before inline list items, and after
/// section labels.
pub fn mark_structure(text: &str) -> String {
    let text = SENTENCE_BREAK.replace_all(text, "${1}\n${2}");
    let text = LIST_AFTER_SENTENCE.replace_all(&text, "${1}\n${2}");
    let text = INLINE_BULLET.replace_all(&text, "\n${1}");
    SECTION_LABEL.replace_all(&text, "${1}:\n").into_owned()
}

/// Single spaces, trimmed lines, at most one empty line in a row, no empty
/// line after a list item, trimmed text.
pub fn collapse_whitespace(text: &str) -> String {
    let text = MULTI_SPACE.replace_all(text, " ");
    let text = text
        .split('\n')
        .map(|line| line.trim_matches(' '))
        .collect::<Vec<_>>()
        .join("\n");
    let text = EXCESS_NEWLINES.replace_all(&text, "\n\n");
    let text = LIST_LINE_GAP.replace_all(&text, "${1}\n");
    text.trim().to_owned()
}

/// No spaces around Japanese punctuation and brackets, or where Japanese
/// script meets Latin letters, digits, or more Japanese script.
pub fn tighten_spacing(text: &str) -> String {
    let text = PUNCT_SPACING.replace_all(text, "${1}");
    let text = BRACKET_SPACING.replace_all(&text, "${1}");
    remove_script_boundary_spaces(&text)
}

fn remove_script_boundary_spaces(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut index = 0;

    while index < chars.len() {
        if chars[index] != ' ' {
            out.push(chars[index]);
            index += 1;
            continue;
        }

        let run_end = chars[index..]
            .iter()
            .position(|&c| c != ' ')
            .map_or(chars.len(), |offset| index + offset);
        let before = out.chars().last();
        let after = chars.get(run_end).copied();
        let joined = matches!((before, after), (Some(b), Some(a)) if joins_without_space(b, a));
        if !joined {
            out.extend(&chars[index..run_end]);
        }
        index = run_end;
    }
    out
}

fn joins_without_space(before: char, after: char) -> bool {
    (is_japanese_script(before) && (is_japanese_script(after) || after.is_ascii_alphanumeric()))
        || (before.is_ascii_alphanumeric() && is_japanese_script(after))
}

/// Hiragana, katakana, the prolonged sound mark, and CJK ideographs.
pub fn is_japanese_script(c: char) -> bool {
    matches!(c,
        '\u{3041}'..='\u{3096}'
        | '\u{30A1}'..='\u{30FA}'
        | 'ー'
        | '々'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}')
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "０１２-３４５６",
        "  １. 概要：新製品 の 発表\t\tです。 詳細は 03 - 1234 - 5678 まで 。\n\n\n・価格 1,000 円\n2025/1/5 開始 ",
        "Docsift は 2025 年 に リリース 予定 です 。 お問い合わせ ： info@example.com",
        "詳細要件:\n\n\n* 項目A\n\n\n* 項目B\r\nEND",
        "plain english text, with commas. and periods!",
        "会議です。・議題一 ・議題二 1. 開会",
        "",
    ];

    /// Example from the extraction contract.
    #[test]
    fn full_width_postal_code_becomes_ascii() {
        assert_eq!(normalize("０１２-３４５６"), "012-3456");
    }

    #[test]
    fn normalizer_is_idempotent() {
        for sample in SAMPLES {
            let once = normalize(sample);
            let twice = normalize(&once);
            assert_eq!(once, twice, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn mixed_sample_normalizes_fully() {
        assert_eq!(
            normalize(SAMPLES[1]),
            "1. 概要:\n新製品の発表です。\n詳細は03-1234-5678まで。\n\n・価格1,000円\n2025/01/05開始"
        );
    }

    #[test]
    fn phone_and_postal_hyphens_are_tightened() {
        assert_eq!(canonicalize_patterns("03 - 1234 - 5678"), "03-1234-5678");
        assert_eq!(canonicalize_patterns("〒123 -4567"), "〒123-4567");
    }

    #[test]
    fn dates_are_zero_padded() {
        assert_eq!(canonicalize_patterns("2025/1/5"), "2025/01/05");
        assert_eq!(canonicalize_patterns("2025/12/31"), "2025/12/31");
    }

    #[test]
    fn currency_spacing_is_removed() {
        assert_eq!(canonicalize_patterns("合計 12,000 円"), "合計 12,000円");
    }

    #[test]
    fn sentences_end_lines() {
        assert_eq!(normalize("会議です。次に進みます。"), "会議です。\n次に進みます。");
    }

    #[test]
    fn section_labels_get_their_own_line() {
        assert_eq!(normalize("概要： 新製品"), "概要:\n新製品");
    }

    #[test]
    fn blank_lines_are_capped() {
        assert_eq!(normalize("a\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn script_boundaries_lose_spaces() {
        assert_eq!(normalize("Docsift は 2025 年 に"), "Docsiftは2025年に");
    }

    #[test]
    fn latin_text_keeps_its_spaces() {
        assert_eq!(normalize("mail me at a@b.com today"), "mail me at a@b.com today");
    }

    #[test]
    fn inline_bullets_start_new_lines() {
        assert_eq!(normalize("会議です。・議題一 ・議題二"), "会議です。\n・議題一\n・議題二");
    }
}
