// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the raster side of docsift-document: both
// preprocessing profiles and layout analysis on a synthetic page.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use docsift_core::config::{LayoutConfig, ProfileConfig};
use docsift_document::{PixelBuffer, analyze, preprocess};
use image::{DynamicImage, GrayImage, Luma};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// 600x800 light-gray page with twelve dark text-like bands and a narrow
/// second column near the bottom.
fn synthetic_page() -> PixelBuffer {
    let (width, height) = (600u32, 800u32);
    let mut img = GrayImage::from_pixel(width, height, Luma([235u8]));
    for band in 0..12u32 {
        let top = 40 + band * 50;
        for y in top..top + 22 {
            for x in 50..550 {
                // Gaps every few pixels so bands look like words, not bars.
                if x % 37 > 4 {
                    img.put_pixel(x, y, Luma([25u8]));
                }
            }
        }
    }
    for y in 660..760 {
        for x in 400..520 {
            img.put_pixel(x, y, Luma([40u8]));
        }
    }
    PixelBuffer::from_dynamic(&DynamicImage::ImageLuma8(img))
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_preprocess(c: &mut Criterion) {
    let page = synthetic_page();
    let recognition = ProfileConfig::recognition();
    let structure = ProfileConfig::structure();

    c.bench_function("preprocess recognition profile (600x800)", |b| {
        b.iter(|| black_box(preprocess(black_box(&page), &recognition)))
    });
    c.bench_function("preprocess structure profile (600x800)", |b| {
        b.iter(|| black_box(preprocess(black_box(&page), &structure)))
    });
}

fn bench_layout(c: &mut Criterion) {
    let binarized = match preprocess(&synthetic_page(), &ProfileConfig::structure()) {
        Ok(buffer) => buffer,
        Err(err) => panic!("structure profile failed on the fixture: {err}"),
    };
    let config = LayoutConfig::default();

    c.bench_function("layout analysis (structure profile page)", |b| {
        b.iter(|| black_box(analyze(black_box(&binarized), &config)))
    });
}

criterion_group!(benches, bench_preprocess, bench_layout);
criterion_main!(benches);
