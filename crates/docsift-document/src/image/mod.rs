// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster operations: pixel buffers, geometry, and preprocessing profiles.

pub mod buffer;
pub mod geometry;
pub mod processor;

pub use buffer::{PixelBuffer, decode_image, encode_png};
pub use geometry::{count_dark, extract, pad, rotate};
pub use processor::{ImageProcessor, preprocess};
