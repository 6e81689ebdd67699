// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rasterization through PDFium, via the `pdfium-render` bindings.
//
// # Feature Gate
//
// Only compiled with the `pdfium` feature:
//
// ```toml
// docsift-document = { path = "crates/docsift-document", features = ["pdfium"] }
// ```
//
// # Library Lookup
//
// PDFium is loaded dynamically at runtime, in this order:
//
// 1. `PdfiumConfig::library_path`, when set
// 2. the `PDFIUM_DYNAMIC_LIB_PATH` environment variable
// 3. the directory holding the running executable
// 4. the system library search path
//
// Text layers and metadata are still read with `lopdf`; only rendering goes
// through PDFium.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use docsift_core::error::{DocsiftError, Result};
use docsift_core::types::PdfMetadata;
use pdfium_render::prelude::{PdfRenderConfig, Pdfium, PdfiumError};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::backend::{LopdfBackend, PdfBackend};
use crate::image::PixelBuffer;
use crate::task::blocking;

const LIBRARY_PATH_ENV: &str = "PDFIUM_DYNAMIC_LIB_PATH";

const POINTS_PER_INCH: f32 = 72.0;

/// Longest edge of a rendered page, in pixels.
const MAX_RENDER_EXTENT: u32 = 8000;

/// Where to find the PDFium shared library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfiumConfig {
    /// Full path to the shared library. `None` searches the usual places.
    #[serde(default)]
    pub library_path: Option<PathBuf>,
}

/// [`PdfBackend`] that rasterizes whole pages with PDFium at the requested
/// DPI, so vector text and mixed pages are recognizable too.
#[derive(Debug, Clone)]
pub struct PdfiumBackend {
    config: PdfiumConfig,
    reader: LopdfBackend,
}

impl PdfiumBackend {
    /// Confirm the library can be bound before accepting any work.
    pub fn new(config: PdfiumConfig) -> Result<Self> {
        bind(config.library_path.as_deref())?;
        Ok(Self {
            config,
            reader: LopdfBackend,
        })
    }
}

#[async_trait]
impl PdfBackend for PdfiumBackend {
    async fn text_layer(&self, bytes: &[u8], max_pages: u32) -> Result<Vec<(u32, String)>> {
        self.reader.text_layer(bytes, max_pages).await
    }

    async fn page_count(&self, bytes: &[u8]) -> Result<u32> {
        self.reader.page_count(bytes).await
    }

    #[instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    async fn render_page(&self, bytes: &[u8], index: u32, dpi: u32) -> Result<PixelBuffer> {
        let bytes = bytes.to_vec();
        let library_path = self.config.library_path.clone();
        blocking(move || render(library_path.as_deref(), &bytes, index, dpi)).await
    }

    async fn metadata(&self, bytes: &[u8]) -> Result<PdfMetadata> {
        self.reader.metadata(bytes).await
    }
}

fn bind(library_path: Option<&Path>) -> Result<Pdfium> {
    if let Some(path) = library_path {
        let bindings = Pdfium::bind_to_library(path).map_err(|e| {
            DocsiftError::Config(format!("cannot load PDFium from {}: {e}", path.display()))
        })?;
        return Ok(Pdfium::new(bindings));
    }

    if let Ok(path) = std::env::var(LIBRARY_PATH_ENV) {
        debug!(%path, "loading PDFium from environment");
        let bindings = Pdfium::bind_to_library(&path)
            .map_err(|e| DocsiftError::Config(format!("cannot load PDFium from {path}: {e}")))?;
        return Ok(Pdfium::new(bindings));
    }

    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    if let Some(dir) = exe_dir {
        let dir_name = dir.to_string_lossy().to_string();
        let candidate = Pdfium::pdfium_platform_library_name_at_path(&dir_name);
        if let Ok(bindings) = Pdfium::bind_to_library(&candidate) {
            debug!(dir = %dir.display(), "loaded PDFium next to the executable");
            return Ok(Pdfium::new(bindings));
        }
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        DocsiftError::Config(format!(
            "PDFium library not found; set {LIBRARY_PATH_ENV} or install PDFium: {e}"
        ))
    })?;
    Ok(Pdfium::new(bindings))
}

fn render(library_path: Option<&Path>, bytes: &[u8], index: u32, dpi: u32) -> Result<PixelBuffer> {
    let page_number = index + 1;
    let render_error = |reason: String| DocsiftError::PdfRender {
        page: page_number,
        reason,
    };

    let pdfium = bind(library_path)?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(load_error)?;
    let pages = document.pages();
    let page_index = u16::try_from(index)
        .map_err(|_| render_error(format!("page index {index} is out of range")))?;
    let page = pages
        .get(page_index)
        .map_err(|_| render_error(format!("document has {} pages", pages.len())))?;

    let (width_points, height_points) = (page.width().value, page.height().value);
    let (width, height) = render_dimensions(width_points, height_points, dpi);
    if scaled_extent(width_points.max(height_points), dpi) > MAX_RENDER_EXTENT {
        warn!(page_number, width, height, "page capped to the maximum render extent");
    }

    let config = PdfRenderConfig::new()
        .set_target_width(to_i32(width))
        .set_maximum_height(to_i32(height));
    let bitmap = page
        .render_with_config(&config)
        .map_err(|e| render_error(format!("rendering failed: {e}")))?;

    let (width, height) = (
        u32::try_from(bitmap.width()).unwrap_or(0),
        u32::try_from(bitmap.height()).unwrap_or(0),
    );
    debug!(page_number, width, height, dpi, "rendered page");
    PixelBuffer::new(width, height, 4, bitmap.as_rgba_bytes())
}

/// A document that will not load is undecodable for every page.
fn load_error(err: PdfiumError) -> DocsiftError {
    DocsiftError::Decode(format!("PDFium cannot load document: {err}"))
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn scaled_extent(points: f32, dpi: u32) -> u32 {
    (points * dpi as f32 / POINTS_PER_INCH).max(1.0) as u32
}

/// Pixel size of a page of `width_points` x `height_points` rendered at
/// `dpi`, both edges at least 1 and at most [`MAX_RENDER_EXTENT`], keeping the
/// aspect ratio when capped.
fn render_dimensions(width_points: f32, height_points: f32, dpi: u32) -> (u32, u32) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    let raw_width = (width_points * scale).max(1.0);
    let raw_height = (height_points * scale).max(1.0);

    let longest = raw_width.max(raw_height);
    if longest <= MAX_RENDER_EXTENT as f32 {
        return (raw_width as u32, raw_height as u32);
    }
    let ratio = MAX_RENDER_EXTENT as f32 / longest;
    (
        ((raw_width * ratio) as u32).clamp(1, MAX_RENDER_EXTENT),
        ((raw_height * ratio) as u32).clamp(1, MAX_RENDER_EXTENT),
    )
}
