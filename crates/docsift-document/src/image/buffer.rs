// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Owned raster buffer plus the decode/encode boundary to the `image` crate.

use std::io::Cursor;

use docsift_core::error::{DocsiftError, Result};
use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat};
use tracing::{debug, instrument};

/// Width x height pixels of 1–4 interleaved 8-bit channels.
///
/// The data length always equals `width * height * channels`; the only
/// constructor that accepts foreign data checks it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl PixelBuffer {
    // -- Construction ---------------------------------------------------------

    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self> {
        if !(1..=4).contains(&channels) {
            return Err(DocsiftError::InvalidBuffer(format!(
                "channel count must be 1-4, got {channels}"
            )));
        }
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(DocsiftError::InvalidBuffer(format!(
                "{width}x{height}x{channels} needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Buffer with every sample set to `value` (alpha, if any, opaque).
    pub fn filled(width: u32, height: u32, channels: u8, value: u8) -> Self {
        let channels = channels.clamp(1, 4);
        let pixel = background_pixel(channels, value);
        let data = pixel
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * channels as usize)
            .collect();
        Self {
            width,
            height,
            channels,
            data,
        }
    }

    /// Copy an already-decoded image, keeping 8-bit layouts as they are and
    /// widening everything else to RGBA.
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        let (width, height) = (image.width(), image.height());
        let (channels, data) = match image {
            DynamicImage::ImageLuma8(gray) => (1, gray.as_raw().clone()),
            DynamicImage::ImageLumaA8(gray_alpha) => (2, gray_alpha.as_raw().clone()),
            DynamicImage::ImageRgb8(rgb) => (3, rgb.as_raw().clone()),
            DynamicImage::ImageRgba8(rgba) => (4, rgba.as_raw().clone()),
            other => (4, other.to_rgba8().into_raw()),
        };
        Self {
            width,
            height,
            channels,
            data,
        }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Samples of the pixel at (`x`, `y`). Panics outside the buffer, like
    /// slice indexing.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let start = self.offset(x, y);
        &self.data[start..start + self.channels as usize]
    }

    /// First sample of the pixel at (`x`, `y`).
    pub fn luma_at(&self, x: u32, y: u32) -> u8 {
        self.data[self.offset(x, y)]
    }

    pub(crate) fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.channels as usize
    }

    // -- Conversion -----------------------------------------------------------

    pub fn to_dynamic(&self) -> Result<DynamicImage> {
        let (width, height, data) = (self.width, self.height, self.data.clone());
        let image = match self.channels {
            1 => ImageBuffer::from_raw(width, height, data).map(DynamicImage::ImageLuma8),
            2 => ImageBuffer::from_raw(width, height, data).map(DynamicImage::ImageLumaA8),
            3 => ImageBuffer::from_raw(width, height, data).map(DynamicImage::ImageRgb8),
            _ => ImageBuffer::from_raw(width, height, data).map(DynamicImage::ImageRgba8),
        };
        image.ok_or_else(|| {
            DocsiftError::InvalidBuffer(format!(
                "{}x{}x{} buffer rejected by image crate",
                self.width, self.height, self.channels
            ))
        })
    }

    /// Single-channel view; gray buffers are copied, colour ones converted.
    pub fn to_gray(&self) -> Result<GrayImage> {
        if self.channels == 1 {
            return GrayImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(
                || DocsiftError::InvalidBuffer("gray buffer rejected by image crate".into()),
            );
        }
        Ok(self.to_dynamic()?.to_luma8())
    }
}

/// One pixel of `value` with an opaque alpha sample where the layout has one.
pub(crate) fn background_pixel(channels: u8, value: u8) -> Vec<u8> {
    match channels {
        2 => vec![value, 255],
        4 => vec![value, value, value, 255],
        n => vec![value; n as usize],
    }
}

/// Decode JPEG, PNG, TIFF, or any other format the `image` crate recognizes.
#[instrument(skip(bytes), fields(bytes_len = bytes.len()))]
pub fn decode_image(bytes: &[u8]) -> Result<PixelBuffer> {
    let image = image::load_from_memory(bytes)
        .map_err(|err| DocsiftError::Decode(format!("image decode failed: {err}")))?;
    debug!(
        width = image.width(),
        height = image.height(),
        "image decoded"
    );
    Ok(PixelBuffer::from_dynamic(&image))
}

pub fn encode_png(buffer: &PixelBuffer) -> Result<Vec<u8>> {
    let image = buffer.to_dynamic()?;
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|err| DocsiftError::ImageError(format!("PNG encoding failed: {err}")))?;
    Ok(bytes)
}
