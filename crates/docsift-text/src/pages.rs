// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page markers in combined PDF text.

use std::sync::LazyLock;

use docsift_core::types::PageText;
use regex::Regex;

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^=== page ([0-9]+)( \(OCR\))? ===$").expect("marker pattern compiles")
});

/// Header line preceding page `page_number` (1-based).
pub fn page_marker(page_number: u32, ocr: bool) -> String {
    if ocr {
        format!("=== page {page_number} (OCR) ===")
    } else {
        format!("=== page {page_number} ===")
    }
}

/// Append one marked page section to `combined`.
pub fn push_page(combined: &mut String, page_number: u32, ocr: bool, text: &str) {
    combined.push_str(&page_marker(page_number, ocr));
    combined.push('\n');
    combined.push_str(text);
    combined.push_str("\n\n");
}

/// Split combined text back into pages. Text before the first marker and
/// pages whose body is empty are skipped.
pub fn split_pages(text: &str) -> Vec<PageText> {
    let markers: Vec<_> = MARKER.captures_iter(text).collect();
    let mut pages = Vec::with_capacity(markers.len());

    for (index, caps) in markers.iter().enumerate() {
        let Some(whole) = caps.get(0) else { continue };
        let Ok(page_number) = caps[1].parse::<u32>() else {
            continue;
        };
        let body_end = markers
            .get(index + 1)
            .and_then(|next| next.get(0))
            .map_or(text.len(), |next| next.start());
        let body = text[whole.end()..body_end].trim();
        if body.is_empty() {
            continue;
        }
        pages.push(PageText {
            page_number,
            text: body.to_owned(),
            ocr: caps.get(2).is_some(),
            word_count: body.split_whitespace().count(),
        });
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_round_trip_through_split() {
        let mut combined = String::new();
        push_page(&mut combined, 1, false, "first page text");
        push_page(&mut combined, 3, true, "スキャンされた ページ");
        let combined = combined.trim();

        let pages = split_pages(combined);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].page_number, 1);
        assert_eq!(pages[0].text, "first page text");
        assert_eq!(pages[0].word_count, 3);
        assert!(!pages[0].ocr);
        assert_eq!(pages[1].page_number, 3);
        assert!(pages[1].ocr);
        assert_eq!(pages[1].word_count, 2);
    }

    #[test]
    fn text_without_markers_has_no_pages() {
        assert!(split_pages("just some text").is_empty());
    }

    #[test]
    fn empty_pages_are_skipped() {
        let pages = split_pages("=== page 1 ===\n\n=== page 2 ===\nbody");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page_number, 2);
    }
}
