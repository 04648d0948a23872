//! Configuration types for the extraction service.
//!
//! All pipeline behaviour is controlled through [`ExtractorConfig`], built via
//! its [`ExtractorConfigBuilder`]. Every knob is process-wide: nothing here
//! can be changed per request.
//!
//! # Design choice: builder over constructor
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest; setters clamp out-of-range values and
//! [`ExtractorConfigBuilder::build`] rejects the ones that cannot be clamped.

use crate::error::ExtractError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Model used when neither the config nor the environment names one.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Configuration for the allergen/nutrition extraction pipeline.
///
/// # Example
/// ```rust
/// use allergen_extractor::ExtractorConfig;
///
/// let config = ExtractorConfig::builder()
///     .ocr_dpi(300)
///     .ocr_language("eng+hun")
///     .model("gpt-4o-mini")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractorConfig {
    /// Minimum trimmed text-layer length (in characters) that counts as a
    /// digital PDF. Anything at or below this goes to OCR. Default: 100.
    ///
    /// Scanned spec sheets usually have an empty text layer or a few stray
    /// glyphs from a header; 100 characters separates those from genuine
    /// text without needing a quality score.
    pub min_text_chars: usize,

    /// Rasterisation DPI for OCR. Range: 72–600. Default: 300.
    ///
    /// Tesseract's accuracy drops sharply below ~200 DPI on small label
    /// print; 300 is its documented sweet spot.
    pub ocr_dpi: u32,

    /// Tesseract language model(s), `+`-joined. Default: `"eng+hun"`.
    pub ocr_language: String,

    /// Characters of extracted text embedded in the prompt. Default: 4000.
    pub prompt_char_limit: usize,

    /// Characters of extracted text echoed back as `raw_text_preview`. Default: 500.
    pub preview_chars: usize,

    /// LLM model identifier. If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the completion. Default: 0.1.
    ///
    /// Extraction wants the same answer for the same label every time.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 1000.
    ///
    /// The filled-in schema is ~250 tokens; the ceiling leaves room for a
    /// model that insists on wrapping the JSON in prose or fences.
    pub max_tokens: usize,

    /// Custom system message. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Directory containing the pdfium shared library. If None, `./` is
    /// tried first, then the system library search path.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Maximum accepted request body in bytes. None disables the limit.
    pub max_upload_bytes: Option<usize>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            min_text_chars: 100,
            ocr_dpi: 300,
            ocr_language: "eng+hun".to_string(),
            prompt_char_limit: 4000,
            preview_chars: 500,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 1000,
            system_prompt: None,
            pdfium_lib_path: None,
            max_upload_bytes: None,
        }
    }
}

impl fmt::Debug for ExtractorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorConfig")
            .field("min_text_chars", &self.min_text_chars)
            .field("ocr_dpi", &self.ocr_dpi)
            .field("ocr_language", &self.ocr_language)
            .field("prompt_char_limit", &self.prompt_char_limit)
            .field("preview_chars", &self.preview_chars)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl ExtractorConfig {
    /// Create a new builder for `ExtractorConfig`.
    pub fn builder() -> ExtractorConfigBuilder {
        ExtractorConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model to request, falling back to [`DEFAULT_MODEL`].
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`ExtractorConfig`].
#[derive(Debug)]
pub struct ExtractorConfigBuilder {
    config: ExtractorConfig,
}

impl ExtractorConfigBuilder {
    pub fn min_text_chars(mut self, n: usize) -> Self {
        self.config.min_text_chars = n;
        self
    }

    pub fn ocr_dpi(mut self, dpi: u32) -> Self {
        self.config.ocr_dpi = dpi.clamp(72, 600);
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn prompt_char_limit(mut self, n: usize) -> Self {
        self.config.prompt_char_limit = n;
        self
    }

    pub fn preview_chars(mut self, n: usize) -> Self {
        self.config.preview_chars = n;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = Some(n);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractorConfig, ExtractError> {
        let c = &self.config;
        if c.ocr_language.trim().is_empty() {
            return Err(ExtractError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        if c.prompt_char_limit == 0 {
            return Err(ExtractError::InvalidConfig(
                "Prompt character limit must be ≥ 1".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(ExtractError::InvalidConfig("Max tokens must be ≥ 1".into()));
        }
        if c.max_upload_bytes == Some(0) {
            return Err(ExtractError::InvalidConfig(
                "Upload limit must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}
