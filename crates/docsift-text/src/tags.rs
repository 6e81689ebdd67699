// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tag generation from extracted entities and topic keywords.

use std::sync::LazyLock;

use docsift_core::types::EntitySet;
use regex::Regex;

pub const CONTACT_INFO: &str = "contact info";
pub const PHONE: &str = "phone";
pub const WEBSITE: &str = "website";
pub const COMPANY_INFO: &str = "company info";
pub const PRODUCT_INFO: &str = "product info";

struct TopicRule {
    tag: &'static str,
    pattern: Regex,
}

// Acronyms are matched case-sensitively and must not touch other ASCII letters,
// so "AI" fires on "AI導入" but not on "AIM" or "said".
static TOPICS: LazyLock<Vec<TopicRule>> = LazyLock::new(|| {
    let rule = |tag: &'static str, pattern: &str| TopicRule {
        tag,
        pattern: Regex::new(pattern).expect("topic pattern compiles"),
    };
    vec![
        rule(
            "AI",
            r"(?:^|[^A-Za-z])AI(?:$|[^A-Za-z])|人工知能|機械学習|深層学習|ディープラーニング|(?i:machine learning|artificial intelligence|deep learning)",
        ),
        rule(
            "SaaS",
            r"(?i:saas|cloud service|software)|クラウド|ソフトウェア",
        ),
        rule(
            "manufacturing",
            r"製造|工場|生産|品質管理|IoT|産業|(?i:manufactur|factory|production line)",
        ),
        rule(
            "IT",
            r"(?:^|[^A-Za-z])IT(?:$|[^A-Za-z])|情報技術|システム|ソフトウェア|アプリ|(?i:information technology)",
        ),
        rule(
            "marketing",
            r"マーケティング|営業|販売|プロモーション|(?i:marketing|promotion|sales)",
        ),
        rule(
            "HR",
            r"(?:^|[^A-Za-z])HR(?:$|[^A-Za-z])|人事|採用|人材|組織|(?i:recruit|human resources|hiring)",
        ),
        rule(
            "finance",
            r"財務|会計|経理|予算|資金|(?i:finance|financial|accounting|budget)",
        ),
    ]
});

/// Presence tags for found entities followed by topic tags, without repeats.
pub fn generate_tags(entities: &EntitySet, text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let mut push = |tag: &str| {
        if !tags.iter().any(|existing| existing == tag) {
            tags.push(tag.to_owned());
        }
    };

    if entities.has_contact() {
        push(CONTACT_INFO);
    }
    if !entities.phones.is_empty() {
        push(PHONE);
    }
    if !entities.urls.is_empty() {
        push(WEBSITE);
    }
    if !entities.companies.is_empty() {
        push(COMPANY_INFO);
    }
    if !entities.products.is_empty() {
        push(PRODUCT_INFO);
    }

    for topic in TOPICS.iter() {
        if topic.pattern.is_match(text) {
            push(topic.tag);
        }
    }
    tags
}
