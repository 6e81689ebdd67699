// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the text post-processing chain.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use docsift_text::{extract_entities, generate_tags, normalize};

const SAMPLE: &str = "サンプル株式会社 概要： 新製品 の 発表 です 。 詳細は ０３ - １２３４ - ５６７８ まで 。\n\n\n\
    ・価格 12,000 円 ・開始 2025/1/5\nお問い合わせ： info@example.com https://example.com/products\n\
    Nimbus Cloud Platform は AI と IoT を 活用 した ソフトウェア です 。";

fn bench_normalize(c: &mut Criterion) {
    let text = SAMPLE.repeat(20);
    c.bench_function("normalize (20 paragraphs)", |b| {
        b.iter(|| black_box(normalize(black_box(&text))));
    });
}

fn bench_entities_and_tags(c: &mut Criterion) {
    let text = normalize(&SAMPLE.repeat(20));
    c.bench_function("extract_entities + generate_tags", |b| {
        b.iter(|| {
            let entities = extract_entities(black_box(&text));
            black_box(generate_tags(&entities, &text));
        });
    });
}

criterion_group!(benches, bench_normalize, bench_entities_and_tags);
criterion_main!(benches);
