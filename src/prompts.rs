//! Prompts for the allergen/nutrition extraction call.
//!
//! Every prompt lives here so a wording change touches exactly one place and
//! unit tests can inspect the prompt text without calling a model. The
//! allergen and nutrient lists are rendered from [`crate::schema`], never
//! typed out by hand.
//!
//! Callers can override the system message via
//! [`crate::config::ExtractorConfig::system_prompt`]; the user prompt is
//! always built by [`extraction_prompt`].

use crate::schema::{ALLERGENS, NUTRIENTS};
use std::fmt::Write as _;

/// Default system message sent ahead of the extraction prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a food safety data extraction expert. Always respond with valid JSON only.";

const INTRO: &str = "You are an expert food safety analyst. Extract allergen information and \
nutritional values from the following product description text. The text may be in multiple \
languages. Try Hungarian first then English, then others.";

const OUTRO: &str = "If a value is not found, use null. Translate all Hungarian or other \
language terms to English in your analysis.";

/// Build the user prompt for `text`, keeping at most `char_limit` characters.
///
/// Text past the limit is dropped silently: allergen declarations near the
/// end of a long document will not be seen by the model.
pub fn extraction_prompt(text: &str, char_limit: usize) -> String {
    let excerpt = truncate_chars(text, char_limit);
    let mut prompt = String::with_capacity(excerpt.len() + 1536);

    prompt.push_str(INTRO);
    prompt.push_str(
        "\n\nALLERGENS TO CHECK (return true if present, false if not present or not mentioned):\n",
    );
    for name in ALLERGENS {
        let _ = writeln!(prompt, "- {}", display_name(name));
    }

    prompt.push_str("\nNUTRITIONAL VALUES TO EXTRACT (per 100g or per serving, include units):\n");
    for name in NUTRIENTS {
        let _ = writeln!(prompt, "- {} ({})", display_name(name), nutrient_unit_hint(name));
    }

    prompt.push_str("\nReturn ONLY a valid JSON object with this exact structure:\n");
    prompt.push_str(&schema_template());
    prompt.push_str("\n\n");
    prompt.push_str(OUTRO);
    prompt.push_str("\n\nTEXT TO ANALYZE:\n");
    prompt.push_str(excerpt);
    prompt.push('\n');
    prompt
}

/// The JSON shape the model is asked to return, with placeholder values.
pub fn schema_template() -> String {
    let allergens = ALLERGENS
        .iter()
        .map(|k| format!("    \"{k}\": true/false"))
        .collect::<Vec<_>>()
        .join(",\n");
    let nutrients = NUTRIENTS
        .iter()
        .map(|k| format!("    \"{k}\": \"value with unit or null\""))
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        "{{\n  \"allergens\": {{\n{allergens}\n  }},\n  \"nutritional_values\": {{\n{nutrients}\n  }}\n}}"
    )
}

/// First `limit` characters of `text` (not bytes: label text is often
/// Hungarian with multi-byte accents).
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn display_name(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn nutrient_unit_hint(key: &str) -> &'static str {
    match key {
        "energy" => "kcal or kJ",
        "sodium" => "mg or g",
        _ => "g",
    }
}
