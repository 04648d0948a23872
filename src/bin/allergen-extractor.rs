//! HTTP server binary for allergen-extractor.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractorConfig`, checks the native libraries, and serves the API.

use allergen_extractor::server::{self, AppState};
use allergen_extractor::{Extractor, ExtractorConfig, PdfiumBackend, TesseractEngine};
use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on the default address (0.0.0.0:8000)
  allergen-extractor

  # Another port, a larger model, and a 20 MB upload limit
  allergen-extractor --bind 127.0.0.1:9000 --model gpt-4o --max-upload-bytes 20000000

  # Verify pdfium, Tesseract and the LLM provider, then exit
  allergen-extractor --check

  # Upload a spec sheet
  curl -F file=@label.pdf http://localhost:8000/extract

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Directory holding libpdfium
  TESSDATA_PREFIX         Directory holding Tesseract traineddata files
  RUST_LOG                Log filter (overrides --verbose / --quiet)
"#;

/// Extract allergens and nutrition facts from food specification PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "allergen-extractor",
    version,
    about = "HTTP service extracting allergens and nutrition facts from food spec PDFs",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "ALLERGEN_BIND", default_value = "0.0.0.0:8000")]
    bind: String,

    /// LLM model ID (default: gpt-4o-mini).
    #[arg(long, env = "ALLERGEN_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "ALLERGEN_PROVIDER")]
    provider: Option<String>,

    /// Tesseract language model(s), `+`-joined.
    #[arg(long, env = "ALLERGEN_OCR_LANG", default_value = "eng+hun")]
    ocr_lang: String,

    /// OCR rasterisation DPI (72–600).
    #[arg(long, env = "ALLERGEN_OCR_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    ocr_dpi: u32,

    /// Text-layer length (characters) at or below which OCR is used.
    #[arg(long, env = "ALLERGEN_MIN_TEXT_CHARS", default_value_t = 100)]
    min_text_chars: usize,

    /// Characters of document text sent to the model.
    #[arg(long, env = "ALLERGEN_PROMPT_CHARS", default_value_t = 4000)]
    prompt_chars: usize,

    /// Max LLM output tokens.
    #[arg(long, env = "ALLERGEN_MAX_TOKENS", default_value_t = 1000)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "ALLERGEN_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "ALLERGEN_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Directory holding the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Reject request bodies larger than this many bytes (default: no limit).
    #[arg(long, env = "ALLERGEN_MAX_UPLOAD_BYTES")]
    max_upload_bytes: Option<usize>,

    /// Check native libraries and provider configuration, then exit.
    #[arg(long)]
    check: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "ALLERGEN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "ALLERGEN_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let config = build_config(&cli).await?;
    info!("Configuration: {:?}", config);

    // ── Native libraries ─────────────────────────────────────────────────
    PdfiumBackend::new(config.pdfium_lib_path.clone())
        .check()
        .context("PDFium engine is not available")?;
    if let Err(e) = TesseractEngine::check(&config.ocr_language) {
        // Digital PDFs never reach OCR, so the service stays usable.
        warn!("{e}; scanned PDFs will fail until this is fixed");
    }

    // ── Provider ─────────────────────────────────────────────────────────
    let extractor = Extractor::from_config(config).context("Failed to set up the LLM provider")?;

    if cli.check {
        eprintln!("pdfium, Tesseract and the LLM provider are configured");
        return Ok(());
    }

    // ── Serve ────────────────────────────────────────────────────────────
    server::start_server(&cli.bind, AppState::new(extractor))
        .await
        .with_context(|| format!("Server on {} failed", cli.bind))?;

    Ok(())
}

/// Map CLI args to `ExtractorConfig`.
async fn build_config(cli: &Cli) -> Result<ExtractorConfig> {
    let mut builder = ExtractorConfig::builder()
        .ocr_language(cli.ocr_lang.clone())
        .ocr_dpi(cli.ocr_dpi)
        .min_text_chars(cli.min_text_chars)
        .prompt_char_limit(cli.prompt_chars)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref path) = cli.pdfium_lib_path {
        builder = builder.pdfium_lib_path(path.clone());
    }
    if let Some(limit) = cli.max_upload_bytes {
        builder = builder.max_upload_bytes(limit);
    }

    builder.build().context("Invalid configuration")
}
