// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pure geometric operations on pixel buffers: rotate, extract, pad, and ink
// counting. Every operation returns a new buffer.

use docsift_core::error::{DocsiftError, Result};
use docsift_core::types::{Margins, Rect};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{self, Interpolation};
use tracing::{debug, instrument};

use super::buffer::{PixelBuffer, background_pixel};

/// Rotate clockwise by `degrees`.
///
/// Quarter turns are lossless and swap the dimensions. Other angles rotate
/// about the centre on the same canvas, filling uncovered pixels with
/// `background`.
#[instrument(skip(buffer), fields(width = buffer.width(), height = buffer.height()))]
pub fn rotate(buffer: &PixelBuffer, degrees: f32, background: u8) -> Result<PixelBuffer> {
    let normalised = degrees.rem_euclid(360.0);
    if normalised < 0.01 || (360.0 - normalised) < 0.01 {
        return Ok(buffer.clone());
    }

    let image = buffer.to_dynamic()?;
    let rotated = if (normalised - 90.0).abs() < 0.01 {
        image.rotate90()
    } else if (normalised - 180.0).abs() < 0.01 {
        image.rotate180()
    } else if (normalised - 270.0).abs() < 0.01 {
        image.rotate270()
    } else {
        let rgba = image.to_rgba8();
        let fill = Rgba([background, background, background, 255]);
        let turned: RgbaImage = geometric_transformations::rotate_about_center(
            &rgba,
            normalised.to_radians(),
            Interpolation::Bilinear,
            fill,
        );
        debug!(degrees = normalised, "general rotation applied");
        with_channels(DynamicImage::ImageRgba8(turned), buffer.channels())
    };
    Ok(PixelBuffer::from_dynamic(&rotated))
}

/// Copy the region `rect` out of `buffer`.
pub fn extract(buffer: &PixelBuffer, rect: Rect) -> Result<PixelBuffer> {
    if rect.width == 0 || rect.height == 0 || !rect.fits_within(buffer.width(), buffer.height()) {
        return Err(DocsiftError::OutOfBounds {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            source_width: buffer.width(),
            source_height: buffer.height(),
        });
    }

    let row_len = rect.width as usize * buffer.channels() as usize;
    let mut data = Vec::with_capacity(row_len * rect.height as usize);
    for y in rect.y..rect.y + rect.height {
        let start = buffer.offset(rect.x, y);
        data.extend_from_slice(&buffer.data()[start..start + row_len]);
    }
    PixelBuffer::new(rect.width, rect.height, buffer.channels(), data)
}

/// Surround `buffer` with `margins` of `background`.
pub fn pad(buffer: &PixelBuffer, margins: Margins, background: u8) -> Result<PixelBuffer> {
    let width = buffer.width() + margins.left + margins.right;
    let height = buffer.height() + margins.top + margins.bottom;
    let channels = buffer.channels() as usize;

    let mut data = Vec::with_capacity(width as usize * height as usize * channels);
    let fill = background_pixel(buffer.channels(), background);
    let blank_row: Vec<u8> = fill.iter().copied().cycle().take(width as usize * channels).collect();
    let left: Vec<u8> = fill.iter().copied().cycle().take(margins.left as usize * channels).collect();
    let right: Vec<u8> = fill.iter().copied().cycle().take(margins.right as usize * channels).collect();
    let row_len = buffer.width() as usize * channels;

    for _ in 0..margins.top {
        data.extend_from_slice(&blank_row);
    }
    for row in buffer.data().chunks_exact(row_len.max(1)).take(buffer.height() as usize) {
        data.extend_from_slice(&left);
        data.extend_from_slice(row);
        data.extend_from_slice(&right);
    }
    if row_len == 0 {
        // Zero-width source: each source row is only margin.
        for _ in 0..buffer.height() {
            data.extend_from_slice(&left);
            data.extend_from_slice(&right);
        }
    }
    for _ in 0..margins.bottom {
        data.extend_from_slice(&blank_row);
    }

    PixelBuffer::new(width, height, buffer.channels(), data)
}

/// Pixels whose first sample is below `threshold`.
pub fn count_dark(buffer: &PixelBuffer, threshold: u8) -> u64 {
    buffer
        .data()
        .iter()
        .step_by(buffer.channels() as usize)
        .filter(|&&sample| sample < threshold)
        .count() as u64
}

fn with_channels(image: DynamicImage, channels: u8) -> DynamicImage {
    match channels {
        1 => DynamicImage::ImageLuma8(image.to_luma8()),
        2 => DynamicImage::ImageLumaA8(image.to_luma_alpha8()),
        3 => DynamicImage::ImageRgb8(image.to_rgb8()),
        _ => image,
    }
}
