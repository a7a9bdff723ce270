//! Raw token definitions for the grammar lexer.
//!
//! The tokens are defined with the logos derive macro; string escapes are
//! decoded in token callbacks so that `Terminal` values carry the decoded
//! bytes. Intra-line whitespace (space, tab, carriage return) is skipped;
//! `\n` is a token because rule boundaries depend on it.

use super::escapes::{decode_escapes, EscapeError};
use logos::{Lexer, Logos};

/// Lexer-level failure attached to logos error tokens.
///
/// `Unrecognised` (the default) marks input no rule matched; the wrapper
/// turns it into an `Unknown` token and carries on. `InvalidEscape` aborts
/// lexing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LexIssue {
    #[default]
    Unrecognised,
    InvalidEscape(String),
}

impl From<EscapeError> for LexIssue {
    fn from(err: EscapeError) -> Self {
        LexIssue::InvalidEscape(err.message)
    }
}

fn terminal(lex: &mut Lexer<RawToken>) -> Result<String, LexIssue> {
    let slice = lex.slice();
    // Strip the matching quotes; both are single-byte.
    decode_escapes(&slice[1..slice.len() - 1]).map_err(LexIssue::from)
}

fn comment(lex: &mut Lexer<RawToken>) -> String {
    lex.slice()[1..].to_string()
}

fn identifier(lex: &mut Lexer<RawToken>) -> String {
    lex.slice().to_string()
}

fn angle_identifier(lex: &mut Lexer<RawToken>) -> String {
    let slice = lex.slice();
    slice[1..slice.len() - 1].to_string()
}

/// All tokens of the grammar notation.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexIssue)]
#[logos(skip r"[ \t\r]+")]
pub enum RawToken {
    #[token("::=")]
    Define,

    #[token("|")]
    Alternative,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("+")]
    Plus,

    #[token("*")]
    Star,

    #[token("?")]
    Question,

    #[token("..")]
    DotDot,

    #[token(",")]
    Comma,

    #[token(":")]
    Colon,

    #[token(";")]
    Semicolon,

    #[token("\n")]
    Newline,

    #[regex(r"#[^\n]*", comment)]
    Comment(String),

    // Double- and single-quoted terminals; escapes resolved by the
    // callback, which can fail the token.
    #[regex(r#""([^"\\\n]|\\[^\n])*""#, terminal)]
    #[regex(r#"'([^'\\\n]|\\[^\n])*'"#, terminal)]
    Terminal(String),

    // Plain identifiers, and `<angle bracket>` identifiers which may
    // contain spaces.
    #[regex(r"[A-Za-z_][A-Za-z0-9_\-]*", identifier)]
    #[regex(r"<[A-Za-z0-9_\- ]*>", angle_identifier)]
    Identifier(String),
}
