//! Pipeline stages for allergen/nutrition extraction.
//!
//! Each submodule implements exactly one transformation step behind a small
//! trait, so stages can be tested with in-memory fakes and the pdfium,
//! Tesseract and LLM backends swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! text ──(short/failed)──▶ ocr ──▶ semantic ──▶ postprocess
//! (text layer)             (300 DPI  (chat      (fence strip,
//!                           + Tesseract) model)  JSON parse)
//! ```
//!
//! 1. [`text`]    : read the embedded text layer, decide whether to fall back
//! 2. [`ocr`]     : rasterise every page and run Tesseract on it
//! 3. [`pdfium`]  : the pdfium-backed text-layer parser and rasteriser; runs
//!    in `spawn_blocking` because pdfium is not async-safe
//! 4. [`encode`]  : PNG-encode page bitmaps for Leptonica
//! 5. [`semantic`] : the single completion call; the only stage with network I/O
//! 6. [`postprocess`] : deterministic cleanup of the model's reply

pub mod encode;
pub mod ocr;
pub mod pdfium;
pub mod postprocess;
pub mod semantic;
pub mod text;
