//! # allergen-extractor
//!
//! Extract allergen presence flags and core nutrition facts from food
//! product specification PDFs.
//!
//! ## Why this crate?
//!
//! Supplier spec sheets arrive as anything from a clean export to a phone
//! scan of a printed label, in Hungarian, English or both. This crate reads
//! the PDF's own text layer when it has one, falls back to 300 DPI OCR when
//! it does not, and lets a chat model map whatever wording the label uses
//! onto a fixed schema of ten allergens and six nutrients.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (.pdf)
//!  │
//!  ├─ 1. Validate  filename must end in `.pdf`
//!  ├─ 2. Text      pdfium text layer; ≤ 100 chars → OCR (pdfium + Tesseract)
//!  ├─ 3. Semantic  one chat completion (gpt-4o-mini by default), JSON only
//!  ├─ 4. Polish    strip fences, parse, default-fill missing keys
//!  └─ 5. Respond   allergens + nutritional_values + preview + method
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use allergen_extractor::{server, Extractor, ExtractorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / ...
//!     let config = ExtractorConfig::default();
//!     let extractor = Extractor::from_config(config)?;
//!     server::start_server("0.0.0.0:8000", server::AppState::new(extractor)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `allergen-extractor` binary (clap + anyhow + tracing-subscriber) |
//!
//! ## Native dependencies
//!
//! pdfium is loaded at runtime (`./`, `--pdfium-lib-path`, or the system
//! search path). Tesseract and Leptonica are linked through `leptess`, and
//! the `eng` and `hun` traineddata files must be installed for the default
//! OCR language.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod schema;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractorConfig, ExtractorConfigBuilder, DEFAULT_MODEL};
pub use error::ExtractError;
pub use extract::Extractor;
pub use output::{ExtractedText, ExtractionResponse, ProcessingMethod};
pub use pipeline::ocr::{OcrEngine, PageRasterizer, TesseractEngine};
pub use pipeline::pdfium::PdfiumBackend;
pub use pipeline::semantic::{
    CompletionClient, CompletionRequest, LlmSemanticExtractor, ProviderClient, SemanticExtractor,
};
pub use pipeline::text::TextLayerParser;
pub use schema::{AllergenMap, NutritionMap, SchemaPayload, ALLERGENS, NUTRIENTS};
