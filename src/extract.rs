//! Request handling: validate an upload, run the pipeline, shape the result.
//!
//! [`Extractor`] owns the process-wide configuration and one instance of
//! each collaborator. It is immutable after construction and shared across
//! requests behind an `Arc`; every request runs the stages strictly in
//! sequence:
//!
//! ```text
//! Received ─▶ Validated ─▶ TextExtracted ─▶ SemanticallyExtracted ─▶ Responded
//!     └───────────┴─────────────┴──────────────────┴──────▶ Errored
//! ```

use crate::config::ExtractorConfig;
use crate::error::ExtractError;
use crate::output::ExtractionResponse;
use crate::pipeline::ocr::{OcrEngine, PageRasterizer, TesseractEngine};
use crate::pipeline::pdfium::PdfiumBackend;
use crate::pipeline::semantic::{
    resolve_provider, LlmSemanticExtractor, ProviderClient, SemanticExtractor,
};
use crate::pipeline::text::{extract_text, TextLayerParser};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Message returned for uploads whose filename does not end in `.pdf`.
pub const NOT_A_PDF: &str = "Only PDF files are supported";

/// The extraction pipeline with its collaborators wired in.
#[derive(Clone)]
pub struct Extractor {
    config: ExtractorConfig,
    parser: Arc<dyn TextLayerParser>,
    rasterizer: Arc<dyn PageRasterizer>,
    ocr: Arc<dyn OcrEngine>,
    semantic: Arc<dyn SemanticExtractor>,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Extractor {
    /// Wire an extractor from explicit collaborators.
    pub fn new(
        config: ExtractorConfig,
        parser: Arc<dyn TextLayerParser>,
        rasterizer: Arc<dyn PageRasterizer>,
        ocr: Arc<dyn OcrEngine>,
        semantic: Arc<dyn SemanticExtractor>,
    ) -> Self {
        Self {
            config,
            parser,
            rasterizer,
            ocr,
            semantic,
        }
    }

    /// Production wiring: pdfium for the text layer and rasterisation,
    /// Tesseract for OCR, and the resolved LLM provider for the semantic
    /// stage.
    ///
    /// # Errors
    /// [`ExtractError::ProviderNotConfigured`] when no LLM provider can be
    /// resolved (see [`resolve_provider`]).
    pub fn from_config(config: ExtractorConfig) -> Result<Self, ExtractError> {
        let provider = resolve_provider(&config)?;
        let client = Arc::new(ProviderClient::new(provider));
        let semantic = Arc::new(LlmSemanticExtractor::from_config(client, &config));
        let pdfium = Arc::new(PdfiumBackend::new(config.pdfium_lib_path.clone()));
        let ocr = Arc::new(TesseractEngine::new(config.ocr_dpi));

        Ok(Self::new(config, pdfium.clone(), pdfium, ocr, semantic))
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Process one uploaded file.
    ///
    /// # Errors
    /// - [`ExtractError::InvalidInput`] if `filename` does not end in `.pdf`
    ///   (case-sensitive); no stage is run.
    /// - [`ExtractError::EmptyContent`] if neither the text layer nor OCR
    ///   produced any non-whitespace text; the model is not called.
    /// - Any processing error from the stages, unchanged.
    pub async fn process(
        &self,
        filename: &str,
        pdf: Vec<u8>,
    ) -> Result<ExtractionResponse, ExtractError> {
        let start = Instant::now();
        info!("Received '{}' ({} bytes)", filename, pdf.len());

        // ── Received → Validated ─────────────────────────────────────────
        validate_filename(filename)?;
        debug!("Validated '{}'", filename);

        // ── Validated → TextExtracted ────────────────────────────────────
        let parser = Arc::clone(&self.parser);
        let rasterizer = Arc::clone(&self.rasterizer);
        let ocr = Arc::clone(&self.ocr);
        let config = self.config.clone();
        let extracted = tokio::task::spawn_blocking(move || {
            extract_text(&*parser, &*rasterizer, &*ocr, &pdf, &config)
        })
        .await
        .map_err(|e| ExtractError::Internal(format!("text extraction task failed: {e}")))??;

        if extracted.text.trim().is_empty() {
            warn!("'{}': no text after {}", filename, extracted.method);
            return Err(ExtractError::EmptyContent);
        }
        info!(
            "Text extracted via {}: {} chars",
            extracted.method,
            extracted.text.chars().count()
        );

        // ── TextExtracted → SemanticallyExtracted ────────────────────────
        let payload = self.semantic.extract(&extracted.text).await?;

        // ── SemanticallyExtracted → Responded ────────────────────────────
        let response =
            ExtractionResponse::assemble(&extracted, payload, self.config.preview_chars);
        info!(
            "Processed '{}' in {}ms (allergens present: {:?})",
            filename,
            start.elapsed().as_millis(),
            response.allergens.present()
        );
        Ok(response)
    }
}

/// Reject anything whose filename does not end in `.pdf`.
pub fn validate_filename(filename: &str) -> Result<(), ExtractError> {
    if filename.ends_with(".pdf") {
        Ok(())
    } else {
        Err(ExtractError::invalid_input(NOT_A_PDF))
    }
}
