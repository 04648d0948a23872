//! Text extraction: use the PDF's text layer, fall back to OCR.
//!
//! Digital spec sheets carry their text in the content stream and parse in
//! milliseconds. Scanned ones have an empty or garbage text layer, so a yield
//! at or below [`ExtractorConfig::min_text_chars`] sends the document through
//! [`crate::pipeline::ocr`] instead.

use crate::config::ExtractorConfig;
use crate::error::ExtractError;
use crate::output::{ExtractedText, ProcessingMethod};
use crate::pipeline::ocr::{extract_with_ocr, OcrEngine, PageRasterizer};
use tracing::{info, warn};

/// Reads the embedded text layer of each page.
pub trait TextLayerParser: Send + Sync {
    /// One entry per page, in page order. A zero-page document yields an
    /// empty vector.
    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>, ExtractError>;
}

/// Extract the document text, choosing between text layer and OCR.
///
/// # Errors
/// - [`ExtractError::Extraction`] when the text layer could not be parsed
///   and OCR failed as well; both messages are kept.
/// - [`ExtractError::Ocr`] when the text layer parsed but was too short and
///   OCR failed.
pub fn extract_text(
    parser: &dyn TextLayerParser,
    rasterizer: &dyn PageRasterizer,
    ocr: &dyn OcrEngine,
    pdf: &[u8],
    config: &ExtractorConfig,
) -> Result<ExtractedText, ExtractError> {
    match parser.page_texts(pdf) {
        Ok(pages) => {
            let text = join_pages(&pages);
            let yield_chars = text.trim().chars().count();

            if is_substantial(&text, config.min_text_chars) {
                info!(
                    "Text layer: {} pages, {} chars",
                    pages.len(),
                    yield_chars
                );
                return Ok(ExtractedText {
                    text,
                    method: ProcessingMethod::TextExtraction,
                });
            }

            info!(
                "Text layer yielded {} chars (≤ {}); falling back to OCR",
                yield_chars, config.min_text_chars
            );
            let text = extract_with_ocr(rasterizer, ocr, pdf, config)?;
            Ok(ExtractedText {
                text,
                method: ProcessingMethod::Ocr,
            })
        }
        Err(parse_err) => {
            warn!("Text layer extraction failed: {}; trying OCR", parse_err);
            match extract_with_ocr(rasterizer, ocr, pdf, config) {
                Ok(text) => Ok(ExtractedText {
                    text,
                    method: ProcessingMethod::Ocr,
                }),
                Err(ocr_err) => Err(ExtractError::Extraction {
                    text_error: parse_err.to_string(),
                    ocr_error: ocr_err.to_string(),
                }),
            }
        }
    }
}

/// Concatenate page texts, each followed by a newline.
pub fn join_pages(pages: &[String]) -> String {
    let mut text = String::with_capacity(pages.iter().map(|p| p.len() + 1).sum());
    for page in pages {
        text.push_str(page);
        text.push('\n');
    }
    text
}

/// `true` when the trimmed text is longer than `min_chars` characters.
pub fn is_substantial(text: &str, min_chars: usize) -> bool {
    text.trim().chars().count() > min_chars
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedParser(Result<Vec<String>, String>);

    impl TextLayerParser for FixedParser {
        fn page_texts(&self, _pdf: &[u8]) -> Result<Vec<String>, ExtractError> {
            self.0.clone().map_err(|detail| ExtractError::CorruptPdf { detail })
        }
    }

    /// Rasterises `pages` blank pages and counts how often it is asked.
    struct CountingRasterizer {
        pages: usize,
        calls: AtomicUsize,
    }

    impl CountingRasterizer {
        fn new(pages: usize) -> Self {
            Self {
                pages,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl PageRasterizer for CountingRasterizer {
        fn render_pages(&self, _pdf: &[u8], _dpi: u32) -> Result<Vec<DynamicImage>, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![DynamicImage::new_rgb8(4, 4); self.pages])
        }
    }

    struct FailingRasterizer;

    impl PageRasterizer for FailingRasterizer {
        fn render_pages(&self, _pdf: &[u8], _dpi: u32) -> Result<Vec<DynamicImage>, ExtractError> {
            Err(ExtractError::Ocr {
                detail: "rasteriser unavailable".into(),
            })
        }
    }

    struct EchoOcr;

    impl OcrEngine for EchoOcr {
        fn recognize(&self, _image: &DynamicImage, language: &str) -> Result<String, ExtractError> {
            Ok(format!("scanned text ({language})"))
        }
    }

    fn long_text() -> String {
        "Ingredients: wheat flour, milk powder, sugar, salt. ".repeat(4)
    }

    #[test]
    fn substantial_text_layer_skips_ocr() {
        let parser = FixedParser(Ok(vec![long_text()]));
        let raster = CountingRasterizer::new(1);
        let config = ExtractorConfig::default();

        let out = extract_text(&parser, &raster, &EchoOcr, b"%PDF", &config).unwrap();

        assert_eq!(out.method, ProcessingMethod::TextExtraction);
        assert_eq!(out.text, format!("{}\n", long_text()));
        assert_eq!(raster.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn short_text_layer_falls_back_to_ocr() {
        let parser = FixedParser(Ok(vec!["  Page 1  ".into(), "x".repeat(90)]));
        let raster = CountingRasterizer::new(2);
        let config = ExtractorConfig::default();

        let out = extract_text(&parser, &raster, &EchoOcr, b"%PDF", &config).unwrap();

        assert_eq!(out.method, ProcessingMethod::Ocr);
        assert_eq!(raster.calls.load(Ordering::SeqCst), 1);
        assert!(out.text.contains("--- Page 2 ---"));
    }

    #[test]
    fn exactly_threshold_chars_is_not_enough() {
        let parser = FixedParser(Ok(vec!["y".repeat(100)]));
        let raster = CountingRasterizer::new(1);
        let out = extract_text(&parser, &raster, &EchoOcr, b"%PDF", &ExtractorConfig::default())
            .unwrap();
        assert_eq!(out.method, ProcessingMethod::Ocr);

        let parser = FixedParser(Ok(vec!["y".repeat(101)]));
        let out = extract_text(&parser, &raster, &EchoOcr, b"%PDF", &ExtractorConfig::default())
            .unwrap();
        assert_eq!(out.method, ProcessingMethod::TextExtraction);
    }

    #[test]
    fn threshold_counts_characters_not_bytes() {
        let raster = CountingRasterizer::new(1);

        // 100 chars, 200 bytes
        let parser = FixedParser(Ok(vec!["é".repeat(100)]));
        let out = extract_text(&parser, &raster, &EchoOcr, b"%PDF", &ExtractorConfig::default())
            .unwrap();
        assert_eq!(out.method, ProcessingMethod::Ocr);

        let parser = FixedParser(Ok(vec!["é".repeat(101)]));
        let out = extract_text(&parser, &raster, &EchoOcr, b"%PDF", &ExtractorConfig::default())
            .unwrap();
        assert_eq!(out.method, ProcessingMethod::TextExtraction);
        assert_eq!(raster.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_page_document_goes_to_ocr_and_yields_nothing() {
        let parser = FixedParser(Ok(vec![]));
        let raster = CountingRasterizer::new(0);

        let out = extract_text(&parser, &raster, &EchoOcr, b"%PDF", &ExtractorConfig::default())
            .unwrap();

        assert_eq!(out.method, ProcessingMethod::Ocr);
        assert!(out.text.trim().is_empty());
        assert_eq!(raster.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn parse_failure_falls_back_to_ocr() {
        let parser = FixedParser(Err("bad xref table".into()));
        let raster = CountingRasterizer::new(1);

        let out = extract_text(&parser, &raster, &EchoOcr, b"junk", &ExtractorConfig::default())
            .unwrap();

        assert_eq!(out.method, ProcessingMethod::Ocr);
        assert!(out.text.contains("scanned text (eng+hun)"));
    }

    #[test]
    fn parse_and_ocr_failure_carries_both_messages() {
        let parser = FixedParser(Err("bad xref table".into()));

        let err = extract_text(&parser, &FailingRasterizer, &EchoOcr, b"junk", &ExtractorConfig::default())
            .unwrap_err();

        match err {
            ExtractError::Extraction {
                text_error,
                ocr_error,
            } => {
                assert!(text_error.contains("bad xref table"));
                assert!(ocr_error.contains("rasteriser unavailable"));
            }
            other => panic!("expected Extraction, got {other:?}"),
        }
    }

    #[test]
    fn short_text_then_ocr_failure_is_ocr_error() {
        let parser = FixedParser(Ok(vec!["tiny".into()]));

        let err = extract_text(&parser, &FailingRasterizer, &EchoOcr, b"%PDF", &ExtractorConfig::default())
            .unwrap_err();

        assert!(matches!(err, ExtractError::Ocr { .. }), "got: {err:?}");
    }

    #[test]
    fn join_pages_appends_newline_per_page() {
        assert_eq!(join_pages(&["a".into(), "b".into()]), "a\nb\n");
        assert_eq!(join_pages(&[]), "");
    }
}
