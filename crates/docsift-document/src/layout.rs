// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Projection-profile layout segmentation.
//
// Rows with enough ink form horizontal bands; inside each band, columns with
// enough ink form blocks. Each block is classified by its shape and carries
// the segmentation mode best suited to recognizing it on its own.

use docsift_core::config::LayoutConfig;
use docsift_core::types::{BlockKind, LayoutBlock, PageSegMode};
use tracing::{debug, instrument};

use crate::image::PixelBuffer;

/// Segment a binarized page into blocks, ordered top-to-bottom then
/// left-to-right.
#[instrument(skip_all, fields(width = buffer.width(), height = buffer.height()))]
pub fn analyze(buffer: &PixelBuffer, config: &LayoutConfig) -> Vec<LayoutBlock> {
    let (width, height) = (buffer.width(), buffer.height());
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let is_dark = |x: u32, y: u32| buffer.luma_at(x, y) < config.dark_threshold;

    let row_counts: Vec<u32> = (0..height)
        .map(|y| (0..width).filter(|&x| is_dark(x, y)).count() as u32)
        .collect();
    let bands = runs(
        &row_counts,
        scaled(config.row_count_floor, config.row_count_ratio, width),
        scaled(config.row_length_floor, config.row_length_ratio, height),
    );

    let min_width = scaled(config.min_block_width_floor, config.min_block_width_ratio, width);
    let min_height = scaled(config.min_block_height_floor, config.min_block_height_ratio, height);
    let column_length = scaled(config.column_length_floor, config.column_length_ratio, width);

    let mut blocks = Vec::new();
    for (band_start, band_end) in bands {
        let (top, bottom) = widen(band_start, band_end, config.run_margin, height);
        let band_height = bottom - top;

        let column_counts: Vec<u32> = (0..width)
            .map(|x| (top..bottom).filter(|&y| is_dark(x, y)).count() as u32)
            .collect();
        let columns = runs(
            &column_counts,
            scaled(config.column_count_floor, config.column_count_ratio, band_height),
            column_length,
        );
        let columns = if columns.is_empty() {
            vec![(0, width)]
        } else {
            columns
                .into_iter()
                .map(|(start, end)| widen(start, end, config.run_margin, width))
                .collect()
        };

        for (left, right) in columns {
            let block_width = right - left;
            if block_width < min_width || band_height < min_height {
                continue;
            }
            let (kind, page_seg_hint) = classify(block_width, band_height, config);
            let ink = (top..bottom)
                .map(|y| (left..right).filter(|&x| is_dark(x, y)).count() as u64)
                .sum::<u64>();
            blocks.push(LayoutBlock {
                left,
                top,
                width: block_width,
                height: band_height,
                kind,
                page_seg_hint,
                density: ink as f32 / (block_width as u64 * band_height as u64) as f32,
            });
        }
    }

    blocks.sort_by_key(|block| (block.top, block.left));
    debug!(blocks = blocks.len(), "layout analyzed");
    blocks
}

/// Shape class and the segmentation mode that suits it.
pub fn classify(width: u32, height: u32, config: &LayoutConfig) -> (BlockKind, PageSegMode) {
    if height <= config.line_max_height {
        return (BlockKind::Line, PageSegMode::SingleLine);
    }
    let aspect = width as f32 / height as f32;
    if aspect >= config.paragraph_min_aspect {
        (BlockKind::Paragraph, PageSegMode::SingleBlock)
    } else if aspect <= config.vertical_max_aspect {
        (BlockKind::Block, PageSegMode::SingleBlockVertical)
    } else {
        (BlockKind::Block, PageSegMode::SingleColumn)
    }
}

/// `max(floor, ⌊ratio · extent⌋)`. The epsilon absorbs f32 ratios such as
/// 0.015 landing just under an integer product.
fn scaled(floor: u32, ratio: f32, extent: u32) -> u32 {
    floor.max((ratio as f64 * extent as f64 + 1e-4).floor() as u32)
}

/// Half-open runs of entries `>= min_count` that are at least `min_len` long.
fn runs(counts: &[u32], min_count: u32, min_len: u32) -> Vec<(u32, u32)> {
    let mut found = Vec::new();
    let mut start: Option<usize> = None;
    for (index, &count) in counts.iter().enumerate() {
        match (count >= min_count, start) {
            (true, None) => start = Some(index),
            (false, Some(run_start)) => {
                if index - run_start >= min_len as usize {
                    found.push((run_start as u32, index as u32));
                }
                start = None;
            }
            _ => {}
        }
    }
    if let Some(run_start) = start {
        if counts.len() - run_start >= min_len as usize {
            found.push((run_start as u32, counts.len() as u32));
        }
    }
    found
}

fn widen(start: u32, end: u32, margin: u32, limit: u32) -> (u32, u32) {
    (start.saturating_sub(margin), end.saturating_add(margin).min(limit))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// White canvas with black rectangles `(x0, y0, x1, y1)`, half-open.
    fn canvas(width: u32, height: u32, rects: &[(u32, u32, u32, u32)]) -> PixelBuffer {
        let mut data = vec![255u8; width as usize * height as usize];
        for &(x0, y0, x1, y1) in rects {
            for y in y0..y1 {
                for x in x0..x1 {
                    data[(y * width + x) as usize] = 0;
                }
            }
        }
        PixelBuffer::new(width, height, 1, data).unwrap()
    }

    #[test]
    fn two_bands_become_two_blocks() {
        let page = canvas(400, 300, &[(40, 50, 360, 80), (40, 150, 360, 250)]);
        let blocks = analyze(&page, &LayoutConfig::default());

        assert_eq!(blocks.len(), 2);
        let first = &blocks[0];
        assert_eq!((first.left, first.top, first.width, first.height), (39, 49, 322, 32));
        assert_eq!(first.kind, BlockKind::Line);
        assert_eq!(first.page_seg_hint, PageSegMode::SingleLine);
        assert!((first.density - 9600.0 / (322.0 * 32.0)).abs() < 1e-4);

        let second = &blocks[1];
        assert_eq!((second.top, second.height), (149, 102));
        assert_eq!(second.kind, BlockKind::Paragraph);
        assert_eq!(second.page_seg_hint, PageSegMode::SingleBlock);
    }

    #[test]
    fn side_by_side_columns_are_ordered_left_to_right() {
        let page = canvas(400, 300, &[(250, 100, 350, 200), (40, 100, 140, 200)]);
        let blocks = analyze(&page, &LayoutConfig::default());
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].left < blocks[1].left);
        assert_eq!(blocks[0].top, blocks[1].top);
        assert_eq!(blocks[0].kind, BlockKind::Block);
    }

    #[test]
    fn blank_page_has_no_blocks() {
        assert!(analyze(&canvas(200, 200, &[]), &LayoutConfig::default()).is_empty());
    }

    #[test]
    fn thin_rule_is_too_short_for_a_band() {
        // Three rows of ink stay below the six-row minimum.
        let page = canvas(400, 300, &[(10, 100, 390, 103)]);
        assert!(analyze(&page, &LayoutConfig::default()).is_empty());
    }

    #[test]
    fn analysis_is_deterministic() {
        let page = canvas(300, 300, &[(20, 20, 280, 60), (20, 100, 120, 280), (160, 100, 280, 280)]);
        let config = LayoutConfig::default();
        assert_eq!(analyze(&page, &config), analyze(&page, &config));
    }

    #[test]
    fn classification_thresholds() {
        let config = LayoutConfig::default();
        assert_eq!(classify(500, 60, &config).0, BlockKind::Line);
        assert_eq!(classify(220, 100, &config), (BlockKind::Paragraph, PageSegMode::SingleBlock));
        assert_eq!(classify(70, 100, &config), (BlockKind::Block, PageSegMode::SingleBlockVertical));
        assert_eq!(classify(150, 100, &config), (BlockKind::Block, PageSegMode::SingleColumn));
    }
}
