//! OCR fallback for scanned spec sheets.
//!
//! Every page is rasterised at [`ExtractorConfig::ocr_dpi`] and read by
//! Tesseract with [`ExtractorConfig::ocr_language`]. Page texts are joined
//! behind a `--- Page N ---` marker (1-indexed) so the model can still tell
//! where a page boundary fell.
//!
//! A failure on any page aborts the whole document; there are no partial
//! OCR results.

use crate::config::ExtractorConfig;
use crate::error::ExtractError;
use crate::pipeline::encode::encode_png;
use image::DynamicImage;
use leptess::LepTess;
use std::time::Instant;
use tracing::{debug, info};

/// Renders every page of a PDF to a bitmap.
pub trait PageRasterizer: Send + Sync {
    fn render_pages(&self, pdf: &[u8], dpi: u32) -> Result<Vec<DynamicImage>, ExtractError>;
}

/// Recognises the text in page bitmaps.
pub trait OcrEngine: Send + Sync {
    /// `language` is a Tesseract model id such as `"eng+hun"`.
    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String, ExtractError>;

    /// Recognise every page of one document, in order. Stops at the first
    /// failing page.
    ///
    /// The default calls [`OcrEngine::recognize`] per page; engines with
    /// expensive setup override it to share that setup across the document.
    fn recognize_document(
        &self,
        images: &[DynamicImage],
        language: &str,
    ) -> Result<Vec<String>, ExtractError> {
        images
            .iter()
            .map(|image| self.recognize(image, language))
            .collect()
    }
}

/// Rasterise and OCR every page of `pdf`.
pub fn extract_with_ocr(
    rasterizer: &dyn PageRasterizer,
    ocr: &dyn OcrEngine,
    pdf: &[u8],
    config: &ExtractorConfig,
) -> Result<String, ExtractError> {
    let start = Instant::now();
    let images = rasterizer
        .render_pages(pdf, config.ocr_dpi)
        .map_err(into_ocr_error)?;

    let page_texts = ocr
        .recognize_document(&images, &config.ocr_language)
        .map_err(into_ocr_error)?;

    let mut text = String::new();
    for (idx, page_text) in page_texts.iter().enumerate() {
        debug!("OCR page {}: {} chars", idx + 1, page_text.chars().count());
        push_page(&mut text, idx + 1, page_text);
    }

    info!(
        "OCR complete: {} pages, {} chars in {}ms",
        images.len(),
        text.chars().count(),
        start.elapsed().as_millis()
    );
    Ok(text)
}

/// Append one page with its marker.
fn push_page(out: &mut String, page_num: usize, page_text: &str) {
    out.push_str(&format!("\n--- Page {page_num} ---\n"));
    out.push_str(page_text);
    out.push('\n');
}

fn into_ocr_error(e: ExtractError) -> ExtractError {
    match e {
        ExtractError::Ocr { .. } => e,
        other => ExtractError::Ocr {
            detail: other.to_string(),
        },
    }
}

/// Tesseract (via leptess) OCR engine.
///
/// Loading the traineddata is the expensive part, so a document gets one
/// `LepTess` handle for all of its pages. The handle is not `Send`; it is
/// created and dropped on the calling (blocking) thread.
#[derive(Debug, Clone, Copy)]
pub struct TesseractEngine {
    source_dpi: u32,
}

impl TesseractEngine {
    /// `source_dpi` tells Tesseract the resolution the page was rendered at.
    pub fn new(source_dpi: u32) -> Self {
        Self { source_dpi }
    }

    /// Fail fast at startup if the language data is not installed.
    pub fn check(language: &str) -> Result<(), ExtractError> {
        LepTess::new(None, language)
            .map(|_| ())
            .map_err(|e| ExtractError::Ocr {
                detail: format!(
                    "failed to initialise Tesseract with language '{language}': {e}. \
                     Make sure the language data is installed (e.g. tesseract-ocr-hun)"
                ),
            })
    }
}

impl TesseractEngine {
    fn open(language: &str) -> Result<LepTess, ExtractError> {
        LepTess::new(None, language).map_err(|e| ExtractError::Ocr {
            detail: format!("failed to initialise Tesseract: {e}"),
        })
    }

    fn read_page(&self, lt: &mut LepTess, image: &DynamicImage) -> Result<String, ExtractError> {
        let png = encode_png(image).map_err(|e| ExtractError::Ocr {
            detail: format!("failed to encode page image: {e}"),
        })?;

        lt.set_image_from_mem(&png).map_err(|e| ExtractError::Ocr {
            detail: format!("failed to load page image: {e}"),
        })?;
        lt.set_source_resolution(self.source_dpi as i32);

        lt.get_utf8_text().map_err(|e| ExtractError::Ocr {
            detail: format!("recognition failed: {e}"),
        })
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String, ExtractError> {
        let mut lt = Self::open(language)?;
        self.read_page(&mut lt, image)
    }

    fn recognize_document(
        &self,
        images: &[DynamicImage],
        language: &str,
    ) -> Result<Vec<String>, ExtractError> {
        if images.is_empty() {
            return Ok(Vec::new());
        }
        let mut lt = Self::open(language)?;
        images
            .iter()
            .map(|image| self.read_page(&mut lt, image))
            .collect()
    }
}
