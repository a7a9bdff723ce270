//! Escape-sequence decoding for quoted terminals.
//!
//! Supported escapes: `\n \t \r \\ \" \'` plus `\uXXXX` (exactly four hex
//! digits) and `\UXXXXXXXX` (exactly eight). Hex escapes with the wrong
//! digit count, or denoting a non-scalar codepoint, are errors. Any other
//! escaped character is kept verbatim together with its backslash.

use crate::bnf::unicode::codepoint_to_utf8;
use std::fmt;

/// Failure while decoding an escape sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapeError {
    pub message: String,
}

impl EscapeError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for EscapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EscapeError {}

/// Decode the escapes in the body of a quoted terminal (quotes already
/// stripped).
pub fn decode_escapes(raw: &str) -> Result<String, EscapeError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some(marker @ ('u' | 'U')) => {
                let digits = if marker == 'u' { 4 } else { 8 };
                let mut hex = String::with_capacity(digits);
                for _ in 0..digits {
                    match chars.next() {
                        Some(d) if d.is_ascii_hexdigit() => hex.push(d),
                        _ => {
                            return Err(EscapeError::new(format!(
                                "Invalid Unicode escape sequence: \\{} requires exactly {} hex digits",
                                marker, digits
                            )))
                        }
                    }
                }
                // The digit count bounds the value below 2^32.
                let cp = u32::from_str_radix(&hex, 16).map_err(|_| {
                    EscapeError::new("Invalid Unicode escape sequence".to_string())
                })?;
                let encoded = codepoint_to_utf8(cp).map_err(|e| {
                    EscapeError::new(format!("Invalid Unicode escape sequence: {}", e))
                })?;
                out.push_str(&encoded);
            }
            Some(other) => {
                // Unrecognised escape: preserved verbatim.
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    Ok(out)
}
