//! Request-scoped result types.

use crate::prompts::truncate_chars;
use crate::schema::{AllergenMap, NutritionMap, SchemaPayload};
use serde::Serialize;
use std::fmt;

/// Which extraction path produced the document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMethod {
    /// The PDF's embedded text layer was long enough to use directly.
    TextExtraction,
    /// Pages were rasterised and read by Tesseract.
    Ocr,
}

impl ProcessingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingMethod::TextExtraction => "text_extraction",
            ProcessingMethod::Ocr => "ocr",
        }
    }
}

impl fmt::Display for ProcessingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full document text plus the path that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub method: ProcessingMethod,
}

/// Body of a successful `POST /extract`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionResponse {
    pub allergens: AllergenMap,
    pub nutritional_values: NutritionMap,
    pub raw_text_preview: String,
    pub processing_method: ProcessingMethod,
}

impl ExtractionResponse {
    /// Shape the final payload from the stage outputs.
    pub fn assemble(extracted: &ExtractedText, payload: SchemaPayload, preview_chars: usize) -> Self {
        Self {
            allergens: payload.allergens,
            nutritional_values: payload.nutritional_values,
            raw_text_preview: preview(&extracted.text, preview_chars),
            processing_method: extracted.method,
        }
    }
}

/// First `limit` characters of the full text, with `...` appended when
/// anything was cut.
pub fn preview(text: &str, limit: usize) -> String {
    let head = truncate_chars(text, limit);
    if head.len() < text.len() {
        format!("{head}...")
    } else {
        head.to_string()
    }
}
