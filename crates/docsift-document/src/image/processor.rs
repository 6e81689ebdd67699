// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Preprocessing chain: resize, grayscale, percentile normalization, median
// denoise, linear contrast, unsharp masking, Otsu binarization, padding.
// Operates on in-memory images using the `image` and `imageproc` crates.

use docsift_core::config::ProfileConfig;
use docsift_core::error::Result;
use docsift_core::types::Margins;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter;
use tracing::{debug, info, instrument};

use super::buffer::PixelBuffer;
use super::geometry;

/// Preprocessing pipeline operating on a single in-memory image.
///
/// Each method consumes `self` and returns a new `ImageProcessor` wrapping
/// the transformed image, enabling method chaining.
///
/// ```ignore
/// let cleaned = ImageProcessor::from_buffer(&page)?
///     .fit_height(2000)
///     .grayscale()
///     .normalize(1.0, 99.0)
///     .median(1)
///     .into_buffer();
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    pub fn from_buffer(buffer: &PixelBuffer) -> Result<Self> {
        Ok(Self {
            image: buffer.to_dynamic()?,
        })
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn into_buffer(self) -> PixelBuffer {
        PixelBuffer::from_dynamic(&self.image)
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Downscale to `max_height`, preserving aspect ratio. Never upscales.
    /// Uses Lanczos3 filtering.
    pub fn fit_height(self, max_height: u32) -> Self {
        let (width, height) = (self.image.width(), self.image.height());
        if height <= max_height || height == 0 {
            return self;
        }
        let scaled_width = ((width as f64 * max_height as f64 / height as f64).round() as u32).max(1);
        debug!(
            from_w = width,
            from_h = height,
            to_w = scaled_width,
            to_h = max_height,
            "downscaling image"
        );
        Self {
            image: self.image.resize_exact(
                scaled_width,
                max_height,
                image::imageops::FilterType::Lanczos3,
            ),
        }
    }

    /// Convert the image to single-channel luma.
    pub fn grayscale(self) -> Self {
        Self {
            image: DynamicImage::ImageLuma8(self.image.to_luma8()),
        }
    }

    /// Stretch the `low`..`high` percentile range of the histogram to full
    /// black..white. Flat images are left untouched.
    pub fn normalize(self, low_percentile: f32, high_percentile: f32) -> Self {
        let gray = self.image.to_luma8();
        let histogram = histogram(&gray);
        let total = gray.width() as u64 * gray.height() as u64;
        let low = percentile(&histogram, total, low_percentile);
        let high = percentile(&histogram, total, high_percentile);
        if high <= low {
            return Self {
                image: DynamicImage::ImageLuma8(gray),
            };
        }

        let range = (high - low) as f32;
        let stretched = map_gray(&gray, |value| {
            ((value as f32 - low as f32) * 255.0 / range).round()
        });
        debug!(low, high, "histogram stretched");
        Self {
            image: DynamicImage::ImageLuma8(stretched),
        }
    }

    /// Median denoise with a square window of the given radius. 0 is a no-op.
    pub fn median(self, radius: u32) -> Self {
        let gray = self.image.to_luma8();
        if radius == 0 {
            return Self {
                image: DynamicImage::ImageLuma8(gray),
            };
        }
        Self {
            image: DynamicImage::ImageLuma8(filter::median_filter(&gray, radius, radius)),
        }
    }

    /// Per-pixel `gain * p + offset`, clamped to 0..=255.
    pub fn linear(self, gain: f32, offset: f32) -> Self {
        let gray = self.image.to_luma8();
        Self {
            image: DynamicImage::ImageLuma8(map_gray(&gray, |value| gain * value as f32 + offset)),
        }
    }

    /// Unsharp mask: `p + amount * (p - gaussian(p, sigma))`.
    pub fn sharpen(self, sigma: f32, amount: f32) -> Self {
        let gray = self.image.to_luma8();
        if sigma <= 0.0 || amount == 0.0 {
            return Self {
                image: DynamicImage::ImageLuma8(gray),
            };
        }
        let blurred = filter::gaussian_blur_f32(&gray, sigma);
        let sharpened = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            let original = gray.get_pixel(x, y).0[0] as f32;
            let soft = blurred.get_pixel(x, y).0[0] as f32;
            Luma([clamp_sample(original + amount * (original - soft))])
        });
        Self {
            image: DynamicImage::ImageLuma8(sharpened),
        }
    }

    /// Global binarization with the threshold chosen by Otsu's method.
    pub fn binarize_otsu(self) -> Self {
        let gray = self.image.to_luma8();
        let threshold = otsu_threshold(&gray);
        debug!(threshold, "Otsu threshold computed");
        let binary = map_gray(&gray, |value| if value <= threshold { 0.0 } else { 255.0 });
        Self {
            image: DynamicImage::ImageLuma8(binary),
        }
    }

    /// White border of `padding` pixels on every side.
    pub fn pad_white(self, padding: u32) -> Result<Self> {
        if padding == 0 {
            return Ok(self);
        }
        let padded = geometry::pad(
            &PixelBuffer::from_dynamic(&self.image),
            Margins::uniform(padding),
            255,
        )?;
        Ok(Self {
            image: padded.to_dynamic()?,
        })
    }
}

/// Apply every step of `profile` in order.
#[instrument(skip_all, fields(profile = %profile.name, width = buffer.width(), height = buffer.height()))]
pub fn preprocess(buffer: &PixelBuffer, profile: &ProfileConfig) -> Result<PixelBuffer> {
    let (low, high) = profile.normalize_percentiles;
    let mut processor = ImageProcessor::from_buffer(buffer)?
        .fit_height(profile.max_height)
        .grayscale()
        .normalize(low, high)
        .median(profile.median_radius);
    if let Some(stretch) = profile.linear {
        processor = processor.linear(stretch.gain, stretch.offset);
    }
    processor = processor.sharpen(profile.sharpen_sigma, profile.sharpen_amount);
    if profile.binarize {
        processor = processor.binarize_otsu();
    }
    let processed = processor.pad_white(profile.padding)?.into_buffer();
    info!(
        out_w = processed.width(),
        out_h = processed.height(),
        "preprocessing complete"
    );
    Ok(processed)
}

// -- Histogram helpers ---------------------------------------------------------

fn histogram(gray: &GrayImage) -> [u64; 256] {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }
    histogram
}

/// Smallest value whose cumulative share reaches `percent`.
fn percentile(histogram: &[u64; 256], total: u64, percent: f32) -> u8 {
    if total == 0 {
        return 0;
    }
    let target = (total as f64 * percent.clamp(0.0, 100.0) as f64 / 100.0).ceil().max(1.0) as u64;
    let mut cumulative = 0u64;
    for (value, &count) in histogram.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return value as u8;
        }
    }
    255
}

/// Threshold maximizing the between-class variance of the dark and light
/// pixel groups.
fn otsu_threshold(gray: &GrayImage) -> u8 {
    let histogram = histogram(gray);
    let total_pixels = gray.width() as u64 * gray.height() as u64;
    if total_pixels == 0 {
        return 128;
    }

    let sum_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(value, &count)| value as f64 * count as f64)
        .sum();

    let mut sum_background = 0.0f64;
    let mut weight_background = 0u64;
    let mut max_variance = 0.0f64;
    let mut best_threshold = 0u8;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;
        let between_variance = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if between_variance > max_variance {
            max_variance = between_variance;
            best_threshold = t as u8;
        }
    }

    best_threshold
}

fn map_gray(gray: &GrayImage, f: impl Fn(u8) -> f32) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([clamp_sample(f(gray.get_pixel(x, y).0[0]))])
    })
}

fn clamp_sample(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    /// White page with a dark-gray bar, on a slightly gray background.
    fn page(width: u32, height: u32) -> PixelBuffer {
        let mut data = vec![230u8; width as usize * height as usize * 3];
        for y in height / 3..height / 2 {
            for x in width / 4..width * 3 / 4 {
                let offset = (y as usize * width as usize + x as usize) * 3;
                data[offset..offset + 3].copy_from_slice(&[60, 60, 60]);
            }
        }
        PixelBuffer::new(width, height, 3, data).unwrap()
    }

    #[test]
    fn fit_height_never_upscales() {
        let small = ImageProcessor::from_buffer(&page(40, 30)).unwrap().fit_height(100);
        assert_eq!((small.width(), small.height()), (40, 30));

        let large = ImageProcessor::from_buffer(&page(80, 200)).unwrap().fit_height(100);
        assert_eq!((large.width(), large.height()), (40, 100));
    }

    #[test]
    fn normalize_stretches_to_full_range() {
        let out = ImageProcessor::from_buffer(&page(40, 30))
            .unwrap()
            .normalize(1.0, 99.0)
            .into_buffer();
        assert_eq!(out.channels(), 1);
        assert_eq!(out.luma_at(0, 0), 255);
        assert_eq!(out.luma_at(20, 12), 0);
    }

    #[test]
    fn linear_contrast_clamps() {
        let out = ImageProcessor::from_buffer(&PixelBuffer::filled(2, 2, 1, 250))
            .unwrap()
            .linear(1.1, -10.0)
            .into_buffer();
        assert_eq!(out.luma_at(0, 0), 255);
    }

    #[test]
    fn otsu_separates_two_levels() {
        let out = ImageProcessor::from_buffer(&page(40, 30))
            .unwrap()
            .grayscale()
            .binarize_otsu()
            .into_buffer();
        assert_eq!(out.luma_at(0, 0), 255);
        assert_eq!(out.luma_at(20, 12), 0);
    }

    #[test]
    fn blank_page_binarizes_white() {
        let out = ImageProcessor::from_buffer(&PixelBuffer::filled(10, 10, 1, 255))
            .unwrap()
            .binarize_otsu()
            .into_buffer();
        assert!(out.data().iter().all(|&sample| sample == 255));
    }

    #[test]
    fn structure_profile_is_binary_and_padded() {
        let profile = ProfileConfig::structure();
        let out = preprocess(&page(60, 40), &profile).unwrap();
        assert_eq!(out.width(), 60 + 2 * profile.padding);
        assert_eq!(out.height(), 40 + 2 * profile.padding);
        assert!(out.data().iter().all(|&sample| sample == 0 || sample == 255));
    }

    #[test]
    fn recognition_profile_keeps_gray_levels() {
        let profile = ProfileConfig::recognition();
        let out = preprocess(&page(60, 40), &profile).unwrap();
        assert_eq!(out.channels(), 1);
        assert_eq!(out.luma_at(0, 0), 255);
    }
}
