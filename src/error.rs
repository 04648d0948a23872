//! Error types for the allergen-extractor library.
//!
//! Every failure in the pipeline is classified into exactly one
//! [`ExtractError`] variant at the stage boundary nearest its origin. The
//! variants fall into two families:
//!
//! * **Client input**: the upload itself is unusable (wrong file type, no
//!   extractable text). Reported as HTTP 400 with the message passed through
//!   verbatim.
//!
//! * **Processing**: a stage failed (PDF parse, OCR, LLM call, JSON parse).
//!   Reported as HTTP 500 with the stage identity and the underlying
//!   library/API message.
//!
//! Nothing is retried and nothing is swallowed: no partial allergen or
//! nutrition output is ever produced alongside an error.

use thiserror::Error;

/// All errors returned by the allergen-extractor library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Client input errors ───────────────────────────────────────────────
    /// The uploaded file was rejected before any extraction ran.
    #[error("{message}")]
    InvalidInput { message: String },

    /// Extraction ran but produced no non-whitespace text.
    #[error("Could not extract any text from the PDF")]
    EmptyContent,

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The text layer could not be parsed and the OCR fallback failed too.
    #[error("Failed to extract text: {text_error}, OCR error: {ocr_error}")]
    Extraction {
        text_error: String,
        ocr_error: String,
    },

    /// The PDF structure could not be parsed by pdfium.
    #[error("PDF could not be parsed: {detail}")]
    CorruptPdf { detail: String },

    /// Rasterisation, image encoding or Tesseract failed during OCR.
    #[error("OCR processing failed: {detail}")]
    Ocr { detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The model's reply was not valid JSON (after fence stripping).
    #[error("Failed to parse model response as JSON: {detail}")]
    Parse { detail: String },

    /// The completion API call itself failed (network, auth, quota).
    #[error("LLM API error: {message}")]
    Upstream { message: String },

    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set --pdfium-lib-path (or PDFIUM_LIB_PATH) to the directory holding libpdfium, \
or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a blocking task panicked).
    #[error("Processing error: {0}")]
    Internal(String),
}

impl ExtractError {
    /// Build an [`ExtractError::InvalidInput`] from any message.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        ExtractError::InvalidInput {
            message: message.into(),
        }
    }

    /// `true` for errors caused by the upload itself (HTTP 400).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ExtractError::InvalidInput { .. } | ExtractError::EmptyContent
        )
    }

    /// Identity of the pipeline stage that produced this error.
    pub fn stage(&self) -> &'static str {
        match self {
            ExtractError::InvalidInput { .. } => "validation",
            ExtractError::EmptyContent
            | ExtractError::Extraction { .. }
            | ExtractError::CorruptPdf { .. } => "text_extraction",
            ExtractError::Ocr { .. } => "ocr",
            ExtractError::Parse { .. } => "semantic_parse",
            ExtractError::Upstream { .. } => "semantic_upstream",
            ExtractError::ProviderNotConfigured { .. } | ExtractError::InvalidConfig(_) => {
                "config"
            }
            ExtractError::PdfiumBindingFailed(_) => "pdfium",
            ExtractError::Internal(_) => "internal",
        }
    }
}
