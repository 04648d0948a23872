//! Post-processing: deterministic cleanup of the model's JSON completion.
//!
//! The system prompt asks for bare JSON, but chat models still wrap answers in
//! ```` ```json ```` fences, prepend a BOM, or use Windows line endings often
//! enough that parsing the raw completion would fail on otherwise good
//! answers. The fence rules only look at the ends of the reply. Line-ending
//! normalisation and invisible-character removal run over the whole string,
//! so a zero-width space inside a JSON string value is dropped too.
//!
//! ## Rule Order
//!
//! Trim first so fence detection sees the fence at position 0, strip
//! invisible characters before the final trim so a trailing BOM does not hide
//! whitespace.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a raw completion.
///
/// Rules (applied in order):
/// 1. Trim surrounding whitespace
/// 2. Strip a leading fence, with or without a language tag (`json`, `JSON`, ...)
/// 3. Strip a trailing fence
/// 4. Normalise line endings (CRLF → LF)
/// 5. Strip invisible Unicode (BOM, zero-width spaces, soft hyphens)
/// 6. Trim again
pub fn clean_json_response(input: &str) -> String {
    let s = input.trim();
    let s = strip_leading_fence(s);
    let s = strip_trailing_fence(s);
    let s = normalise_line_endings(s);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

// ── Rule 2: Strip leading fence ──────────────────────────────────────────────

static RE_LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\x{FEFF}?```[A-Za-z0-9_-]*[ \t]*\r?\n?").unwrap());

fn strip_leading_fence(input: &str) -> &str {
    match RE_LEADING_FENCE.find(input) {
        Some(m) => &input[m.end()..],
        None => input,
    }
}

// ── Rule 3: Strip trailing fence ─────────────────────────────────────────────

fn strip_trailing_fence(input: &str) -> &str {
    let trimmed = input.trim_end();
    trimmed.strip_suffix("```").unwrap_or(input)
}

// ── Rule 4: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 5: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}
