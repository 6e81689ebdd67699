// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pattern-based entity extraction over normalized text.

use std::sync::LazyLock;

use docsift_core::types::EntitySet;
use regex::Regex;
use tracing::{debug, instrument};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email pattern compiles")
});
static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]{2,4}-[0-9]{2,4}-[0-9]{4}|[0-9]{10,11}").expect("phone pattern compiles")
});
static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s、。「」『』（）【】<>"']+"#).expect("url pattern compiles")
});

/// Japanese legal-entity designations, longest first.
const JAPANESE_COMPANY_SUFFIXES: &[&str] = &[
    "消費生活協同組合",
    "生活協同組合",
    "農業協同組合",
    "漁業協同組合",
    "事業協同組合",
    "一般社団法人",
    "一般財団法人",
    "公益社団法人",
    "公益財団法人",
    "社会福祉法人",
    "株式会社",
    "有限会社",
    "合同会社",
    "合資会社",
    "合名会社",
    "学校法人",
    "医療法人",
    "NPO法人",
    "協同組合",
    "企業組合",
    "協業組合",
    "信用組合",
    "信用金庫",
    "労働金庫",
    "森林組合",
];

static JAPANESE_COMPANY: LazyLock<Regex> = LazyLock::new(|| {
    let suffixes = JAPANESE_COMPANY_SUFFIXES.join("|");
    Regex::new(&format!(r"[^\s、。，,：:]*(?:{suffixes})[^\s、。，,：:]*"))
        .expect("company pattern compiles")
});
static ENGLISH_COMPANY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"[A-Z][A-Za-z0-9&\-]*(?: [A-Z][A-Za-z0-9&\-]*)*,? (?:Inc\.|Corp\.|Corporation|Co\., Ltd\.|Ltd\.|LLC|GmbH)",
    )
    .expect("english company pattern compiles")
});
static PRODUCT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"[A-Z][a-zA-Z0-9 ]+(?:Suite|System|Platform|Service|Solution|Cloud|AI|IoT|API|SDK|Framework|Engine|Studio|Pro|Enterprise|Business|Standard|Basic|Premium|Advanced|Professional)[^\s]*",
    )
    .expect("product pattern compiles")
});

const TRAILING_URL_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']'];
const WRAPPING_PUNCTUATION: &[char] = &['「', '」', '『', '』', '（', '）', '(', ')', '【', '】'];

/// Extract every entity class from `text`.
#[instrument(skip_all, fields(text_len = text.len()))]
pub fn extract_entities(text: &str) -> EntitySet {
    let entities = EntitySet {
        companies: companies(text),
        products: products(text),
        emails: dedup(EMAIL.find_iter(text).map(|m| m.as_str().to_owned())),
        phones: phones(text),
        urls: urls(text),
    };
    debug!(
        companies = entities.companies.len(),
        products = entities.products.len(),
        emails = entities.emails.len(),
        phones = entities.phones.len(),
        urls = entities.urls.len(),
        "entities extracted"
    );
    entities
}

/// Phone numbers not embedded in a longer digit run.
fn phones(text: &str) -> Vec<String> {
    let found = PHONE.find_iter(text).filter_map(|m| {
        let before = text[..m.start()].chars().next_back();
        let after = text[m.end()..].chars().next();
        let embedded = before.is_some_and(|c| c.is_ascii_digit())
            || after.is_some_and(|c| c.is_ascii_digit());
        (!embedded).then(|| m.as_str().to_owned())
    });
    dedup(found)
}

fn urls(text: &str) -> Vec<String> {
    let found = URL
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(TRAILING_URL_PUNCTUATION).to_owned());
    dedup(found)
}

fn companies(text: &str) -> Vec<String> {
    let japanese = JAPANESE_COMPANY.find_iter(text).filter_map(|m| {
        let name = m.as_str().trim_matches(WRAPPING_PUNCTUATION);
        // A designation on its own names no company.
        (!JAPANESE_COMPANY_SUFFIXES.contains(&name)).then(|| name.to_owned())
    });
    let english = ENGLISH_COMPANY.find_iter(text).map(|m| m.as_str().to_owned());
    dedup(japanese.chain(english))
}

fn products(text: &str) -> Vec<String> {
    dedup(PRODUCT.find_iter(text).map(|m| m.as_str().trim().to_owned()))
}

/// Keep the first occurrence of each non-empty value.
fn dedup(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = Vec::new();
    for value in values {
        if !value.is_empty() && !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_extracted_once() {
        let entities = extract_entities("contact a@b.com or a@b.com");
        assert_eq!(entities.emails, vec!["a@b.com".to_owned()]);
    }

    #[test]
    fn hyphenated_and_plain_phones() {
        let entities = extract_entities("TEL 03-1234-5678 / 09012345678");
        assert_eq!(
            entities.phones,
            vec!["03-1234-5678".to_owned(), "09012345678".to_owned()]
        );
    }

    #[test]
    fn long_digit_runs_are_not_phones() {
        let entities = extract_entities("order 123456789012345");
        assert!(entities.phones.is_empty());
    }

    #[test]
    fn urls_stop_at_japanese_punctuation() {
        let entities = extract_entities("詳細はhttps://example.com/docs。またはhttp://example.org.");
        assert_eq!(
            entities.urls,
            vec![
                "https://example.com/docs".to_owned(),
                "http://example.org".to_owned()
            ]
        );
    }

    #[test]
    fn japanese_companies_with_prefix_or_suffix_designation() {
        let entities = extract_entities("サンプル株式会社 株式会社テスト 株式会社");
        assert_eq!(
            entities.companies,
            vec!["サンプル株式会社".to_owned(), "株式会社テスト".to_owned()]
        );
    }

    #[test]
    fn longer_designations_are_kept_whole() {
        let entities = extract_entities("みらい消費生活協同組合");
        assert_eq!(entities.companies, vec!["みらい消費生活協同組合".to_owned()]);
    }

    #[test]
    fn english_companies() {
        let entities = extract_entities("Made by Acme Robotics Inc. in Osaka");
        assert_eq!(entities.companies, vec!["Acme Robotics Inc.".to_owned()]);
    }

    #[test]
    fn products_end_in_category_suffix() {
        let entities = extract_entities("Nimbus Cloud is available now");
        assert_eq!(entities.products, vec!["Nimbus Cloud".to_owned()]);
    }

    #[test]
    fn empty_text_has_no_entities() {
        assert!(extract_entities("").is_empty());
    }
}
