//! Identifier and file-name shaping for generated code.

use once_cell::sync::Lazy;
use regex::Regex;

// ASCII-only on purpose: generated identifiers must be portable across
// target languages.
static NON_IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());

/// Replace every character that cannot appear in an identifier with `_`
/// and make sure the result does not start with a digit.
pub fn sanitize_identifier(name: &str) -> String {
    let mut cleaned = NON_IDENTIFIER.replace_all(name, "_").into_owned();
    if cleaned.is_empty() {
        cleaned.push('_');
    }
    if cleaned.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        cleaned.insert(0, '_');
    }
    cleaned
}

/// `SimpleParser` -> `simple_parser`, `my-grammar file` -> `my_grammar_file`.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower_or_digit = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if ch.is_ascii_uppercase() {
                if prev_lower_or_digit {
                    out.push('_');
                }
                out.push(ch.to_ascii_lowercase());
                prev_lower_or_digit = false;
            } else {
                out.push(ch);
                prev_lower_or_digit = true;
            }
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
            prev_lower_or_digit = false;
        }
    }
    let trimmed = out.trim_end_matches('_').to_string();
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed
    }
}

/// `my_grammar` -> `MyGrammar`, `json-rpc` -> `JsonRpc`.
pub fn pascal_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut start_of_word = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if start_of_word {
                out.push(ch.to_ascii_uppercase());
            } else {
                out.push(ch.to_ascii_lowercase());
            }
            start_of_word = false;
        } else {
            start_of_word = true;
        }
    }
    if out.is_empty() {
        out.push('_');
    }
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// The stem a grammar file contributes to generated names: file stem,
/// sanitized.
pub fn grammar_stem(path: &str) -> String {
    let stem = std::path::Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("grammar");
    snake_case(stem)
}
