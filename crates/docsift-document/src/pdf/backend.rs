// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF collaborator: embedded text layer, page count, page rasters, and
// document metadata, using the `lopdf` crate.
//
// `lopdf` has no rasterizer. A page is "rendered" by decoding the largest
// image XObject it draws, which covers scanned PDFs (one full-page image per
// page). Pages with vector content only fail with `PdfRender`.

use async_trait::async_trait;
use docsift_core::error::{DocsiftError, Result};
use docsift_core::types::PdfMetadata;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, instrument, warn};

use crate::image::{PixelBuffer, decode_image};
use crate::task::blocking;

/// Everything the pipeline needs from a PDF library.
#[async_trait]
pub trait PdfBackend: Send + Sync {
    /// Embedded text of pages `1..=max_pages` as `(page_number, text)`.
    /// Pages without text are omitted.
    async fn text_layer(&self, bytes: &[u8], max_pages: u32) -> Result<Vec<(u32, String)>>;

    async fn page_count(&self, bytes: &[u8]) -> Result<u32>;

    /// Rasterize page `index` (0-based) at `dpi`.
    async fn render_page(&self, bytes: &[u8], index: u32, dpi: u32) -> Result<PixelBuffer>;

    async fn metadata(&self, bytes: &[u8]) -> Result<PdfMetadata>;
}

/// [`PdfBackend`] over `lopdf`. Parsing runs on the blocking pool.
///
/// This is the fallback rasterizer: it does not draw pages, it returns the
/// largest embedded image XObject of a page at its native resolution and
/// ignores the requested DPI. Pages made of vector text and no image fail
/// with [`DocsiftError::PdfRender`]. The `pdfium` feature provides
/// `PdfiumBackend`, which renders whole pages at `render_dpi`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfBackend;

#[async_trait]
impl PdfBackend for LopdfBackend {
    async fn text_layer(&self, bytes: &[u8], max_pages: u32) -> Result<Vec<(u32, String)>> {
        let bytes = bytes.to_vec();
        blocking(move || LoadedPdf::from_bytes(&bytes)?.text_layer(max_pages)).await
    }

    async fn page_count(&self, bytes: &[u8]) -> Result<u32> {
        let bytes = bytes.to_vec();
        blocking(move || Ok(LoadedPdf::from_bytes(&bytes)?.page_count())).await
    }

    async fn render_page(&self, bytes: &[u8], index: u32, dpi: u32) -> Result<PixelBuffer> {
        let bytes = bytes.to_vec();
        blocking(move || LoadedPdf::from_bytes(&bytes)?.render_page(index, dpi)).await
    }

    async fn metadata(&self, bytes: &[u8]) -> Result<PdfMetadata> {
        let bytes = bytes.to_vec();
        blocking(move || Ok(LoadedPdf::from_bytes(&bytes)?.metadata())).await
    }
}

/// A parsed document.
struct LoadedPdf {
    document: Document,
}

impl LoadedPdf {
    // -- Construction ---------------------------------------------------------

    #[instrument(skip_all, fields(bytes_len = data.len()))]
    fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data)
            .map_err(|err| DocsiftError::Decode(format!("failed to load PDF: {err}")))?;
        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    // -- Inspection -----------------------------------------------------------

    fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    fn metadata(&self) -> PdfMetadata {
        let page_sizes = self
            .document
            .get_pages()
            .values()
            .map(|&page_id| self.media_box(page_id).unwrap_or((612.0, 792.0)))
            .collect();

        let info = self
            .document
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|object| self.resolve(object).as_dict().ok());
        let field =
            |key: &[u8]| info.and_then(|dict| info_string(self.resolve(dict.get(key).ok()?)));

        PdfMetadata {
            page_count: self.page_count(),
            page_sizes,
            title: field(b"Title"),
            author: field(b"Author"),
            subject: field(b"Subject"),
        }
    }

    /// Page size in points, inherited through `/Parent` when the page has no
    /// `/MediaBox` of its own.
    fn media_box(&self, page_id: ObjectId) -> Option<(f32, f32)> {
        let mut current = self.document.get_object(page_id).ok()?.as_dict().ok()?;
        // Page trees are shallow; the bound guards against reference cycles.
        for _ in 0..32 {
            if let Ok(object) = current.get(b"MediaBox") {
                let corners: Vec<f64> = self
                    .resolve(object)
                    .as_array()
                    .ok()?
                    .iter()
                    .filter_map(|value| number(self.resolve(value)))
                    .collect();
                if corners.len() != 4 {
                    return None;
                }
                return Some((
                    (corners[2] - corners[0]).abs() as f32,
                    (corners[3] - corners[1]).abs() as f32,
                ));
            }
            current = self.resolve(current.get(b"Parent").ok()?).as_dict().ok()?;
        }
        None
    }

    // -- Text layer -----------------------------------------------------------

    #[instrument(skip(self))]
    fn text_layer(&self, max_pages: u32) -> Result<Vec<(u32, String)>> {
        let mut pages = Vec::new();
        for &page_number in self.document.get_pages().keys().take(max_pages as usize) {
            match self.document.extract_text(&[page_number]) {
                Ok(raw) => {
                    let text = raw
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty())
                        .collect::<Vec<_>>()
                        .join(" ");
                    if !text.is_empty() {
                        pages.push((page_number, text));
                    }
                }
                Err(err) => warn!(page_number, %err, "text layer unreadable, skipping page"),
            }
        }
        debug!(pages_with_text = pages.len(), "text layer read");
        Ok(pages)
    }

    // -- Rendering --------------------------------------------------------------

    #[instrument(skip(self))]
    fn render_page(&self, index: u32, dpi: u32) -> Result<PixelBuffer> {
        let page_number = index + 1;
        let render_error = |reason: String| DocsiftError::PdfRender {
            page: page_number,
            reason,
        };

        let page_id = *self.document.get_pages().get(&page_number).ok_or_else(|| {
            render_error(format!("page not found (document has {} pages)", self.page_count()))
        })?;
        let page = self
            .document
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|err| render_error(format!("page object: {err}")))?;

        let stream = self
            .largest_image(page)
            .ok_or_else(|| render_error("no image XObject on page".into()))?;
        let buffer = self.decode_stream(stream).map_err(|err| render_error(err.to_string()))?;
        debug!(
            page_number,
            dpi,
            width = buffer.width(),
            height = buffer.height(),
            "page image extracted"
        );
        Ok(buffer)
    }

    /// Image XObject with the most pixels among the page resources.
    fn largest_image<'a>(&'a self, page: &'a Dictionary) -> Option<&'a Stream> {
        let resources = self.resolve(page.get(b"Resources").ok()?).as_dict().ok()?;
        let xobjects = self.resolve(resources.get(b"XObject").ok()?).as_dict().ok()?;

        xobjects
            .iter()
            .filter_map(|(_, object)| self.resolve(object).as_stream().ok())
            .filter(|stream| {
                matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Image")
            })
            .max_by_key(|stream| {
                let dimension = |key: &[u8]| {
                    stream.dict.get(key).and_then(Object::as_i64).unwrap_or(0).max(0) as u64
                };
                dimension(b"Width") * dimension(b"Height")
            })
    }

    fn decode_stream(&self, stream: &Stream) -> Result<PixelBuffer> {
        let content = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        if has_filter(&stream.dict, b"DCTDecode") {
            return decode_image(&content);
        }
        // Some streams embed a complete PNG or TIFF file.
        if let Ok(buffer) = decode_image(&content) {
            return Ok(buffer);
        }
        self.reconstruct_raw(&stream.dict, &content)
    }

    /// Raw samples described by `/Width`, `/Height`, `/BitsPerComponent`, and
    /// `/ColorSpace`.
    fn reconstruct_raw(&self, dict: &Dictionary, samples: &[u8]) -> Result<PixelBuffer> {
        let int = |key: &[u8]| {
            dict.get(key)
                .and_then(Object::as_i64)
                .map_err(|_| {
                    DocsiftError::ImageError(format!(
                        "image dictionary lacks /{}",
                        String::from_utf8_lossy(key)
                    ))
                })
        };
        let width = int(b"Width")?.max(0) as u32;
        let height = int(b"Height")?.max(0) as u32;
        let bits = int(b"BitsPerComponent").unwrap_or(8);
        let components = self.color_components(dict);

        match (components, bits) {
            (1, 1) => {
                let row_bytes = (width as usize).div_ceil(8);
                require_len(samples, row_bytes * height as usize)?;
                let data = (0..height as usize)
                    .flat_map(|y| {
                        let row = &samples[y * row_bytes..(y + 1) * row_bytes];
                        (0..width as usize)
                            .map(move |x| if row[x / 8] & (0x80 >> (x % 8)) != 0 { 255 } else { 0 })
                    })
                    .collect();
                PixelBuffer::new(width, height, 1, data)
            }
            (1 | 3, 8) => {
                let len = width as usize * height as usize * components as usize;
                require_len(samples, len)?;
                PixelBuffer::new(width, height, components, samples[..len].to_vec())
            }
            (4, 8) => {
                let len = width as usize * height as usize * 4;
                require_len(samples, len)?;
                let rgb = samples[..len]
                    .chunks_exact(4)
                    .flat_map(|cmyk| {
                        let k = 255 - cmyk[3] as u16;
                        cmyk[..3].iter().map(move |&c| ((255 - c as u16) * k / 255) as u8)
                    })
                    .collect();
                PixelBuffer::new(width, height, 3, rgb)
            }
            _ => Err(DocsiftError::ImageError(format!(
                "unsupported raw image: {components} components at {bits} bits"
            ))),
        }
    }

    /// Colour components per sample. Indexed images are read as their
    /// palette indices.
    fn color_components(&self, dict: &Dictionary) -> u8 {
        let Ok(space) = dict.get(b"ColorSpace") else {
            return 3;
        };
        match self.resolve(space) {
            Object::Name(name) => match name.as_slice() {
                b"DeviceGray" | b"CalGray" => 1,
                b"DeviceCMYK" => 4,
                _ => 3,
            },
            Object::Array(parts) => match parts.first() {
                Some(Object::Name(name)) if name == b"ICCBased" => parts
                    .get(1)
                    .and_then(|profile| self.resolve(profile).as_stream().ok())
                    .and_then(|profile| profile.dict.get(b"N").and_then(Object::as_i64).ok())
                    .map_or(3, |n| n.clamp(1, 4) as u8),
                Some(Object::Name(name)) if name == b"Indexed" => 1,
                Some(Object::Name(name)) if name == b"CalGray" => 1,
                _ => 3,
            },
            _ => 3,
        }
    }

    /// Follow a reference, or return the object itself.
    fn resolve<'a>(&'a self, object: &'a Object) -> &'a Object {
        match object {
            Object::Reference(id) => self.document.get_object(*id).unwrap_or(object),
            other => other,
        }
    }
}

fn require_len(samples: &[u8], expected: usize) -> Result<()> {
    if samples.len() < expected {
        return Err(DocsiftError::ImageError(format!(
            "raw image has {} bytes, expected {expected}",
            samples.len()
        )));
    }
    Ok(())
}

fn has_filter(dict: &Dictionary, filter: &[u8]) -> bool {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => name == filter,
        Ok(Object::Array(filters)) => filters
            .iter()
            .any(|entry| matches!(entry, Object::Name(name) if name == filter)),
        _ => false,
    }
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(*value as f64),
        _ => None,
    }
}

/// Document-info string: UTF-16BE with a byte-order mark, otherwise bytes
/// read as UTF-8 with lossy replacement.
fn info_string(object: &Object) -> Option<String> {
    let Object::String(bytes, _) = object else {
        return None;
    };
    let text = match bytes.strip_prefix(&[0xFE, 0xFF]) {
        Some(utf16) => {
            let units: Vec<u16> = utf16
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        None => String::from_utf8_lossy(bytes).into_owned(),
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_owned())
}
