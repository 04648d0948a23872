//! pdfium-backed text-layer parsing and page rasterisation.
//!
//! ## Why bind per call?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and is not safe to drive from async contexts. Every call here is
//! made from inside `tokio::task::spawn_blocking`, and binding afresh on that
//! thread keeps [`PdfiumBackend`] a plain `Send + Sync` value that holds no
//! FFI handles between requests.
//!
//! ## Why scale, not target size?
//!
//! OCR accuracy depends on physical resolution. PDF user space is measured
//! in points (1/72 inch), so rendering at `dpi / 72` gives every page the
//! same pixels-per-inch regardless of its paper size.

use crate::error::ExtractError;
use crate::pipeline::ocr::PageRasterizer;
use crate::pipeline::text::TextLayerParser;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// PDF points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Text-layer parser and rasteriser backed by the pdfium shared library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumBackend {
    lib_path: Option<PathBuf>,
}

impl PdfiumBackend {
    /// `lib_path` is the directory holding `libpdfium`; `None` tries `./`
    /// and then the system library search path.
    pub fn new(lib_path: Option<PathBuf>) -> Self {
        Self { lib_path }
    }

    /// Bind to the pdfium library.
    pub fn bind(&self) -> Result<Pdfium, ExtractError> {
        let bindings = match &self.lib_path {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                &*dir.to_string_lossy(),
            )),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| ExtractError::PdfiumBindingFailed(format!("{:?}", e)))?;

        Ok(Pdfium::new(bindings))
    }

    /// Fail fast at startup if pdfium cannot be loaded.
    pub fn check(&self) -> Result<(), ExtractError> {
        self.bind().map(|_| ())
    }

    /// Configured library directory, if any.
    pub fn lib_path(&self) -> Option<&Path> {
        self.lib_path.as_deref()
    }
}

fn load_document<'a>(pdfium: &'a Pdfium, pdf: &'a [u8]) -> Result<PdfDocument<'a>, ExtractError> {
    pdfium
        .load_pdf_from_byte_slice(pdf, None)
        .map_err(|e| ExtractError::CorruptPdf {
            detail: format!("{:?}", e),
        })
}

impl TextLayerParser for PdfiumBackend {
    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>, ExtractError> {
        let pdfium = self.bind()?;
        let document = load_document(&pdfium, pdf)?;
        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        let mut texts = Vec::with_capacity(pages.len() as usize);
        for (idx, page) in pages.iter().enumerate() {
            let text = page.text().map_err(|e| ExtractError::CorruptPdf {
                detail: format!("page {}: {:?}", idx + 1, e),
            })?;
            let text = text.all();
            debug!("Page {}: {} chars in text layer", idx + 1, text.chars().count());
            texts.push(text);
        }

        Ok(texts)
    }
}

impl PageRasterizer for PdfiumBackend {
    fn render_pages(&self, pdf: &[u8], dpi: u32) -> Result<Vec<DynamicImage>, ExtractError> {
        let pdfium = self.bind()?;
        let document = load_document(&pdfium, pdf)?;
        let pages = document.pages();

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(dpi as f32 / POINTS_PER_INCH)
            .render_form_data(true);

        let mut images = Vec::with_capacity(pages.len() as usize);
        for (idx, page) in pages.iter().enumerate() {
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                ExtractError::Ocr {
                    detail: format!("rasterisation failed for page {}: {:?}", idx + 1, e),
                }
            })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} at {} DPI → {}x{} px",
                idx + 1,
                dpi,
                image.width(),
                image.height()
            );
            images.push(image);
        }

        Ok(images)
    }
}
