//! Grammar lexer.
//!
//! Turns grammar source text into a flat token stream. The raw
//! tokenization is handled entirely by logos (see [`tokens`]); this module
//! wraps it to attach line/column positions, to fold unrecognised input
//! into `Unknown` tokens, and to surface escape-decoding failures as
//! positioned lexer errors.
//!
//! Newlines are tokens, not whitespace: rule boundaries depend on them.
//! Comments are emitted as tokens too and discarded by the parser.

pub mod escapes;
pub mod position;
pub mod tokens;

pub use position::LineIndex;
pub use tokens::RawToken;

use logos::Logos;
use std::fmt;
use tokens::LexIssue;

/// Kinds of grammar tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Terminal,
    Define,
    Alternative,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Plus,
    Star,
    Question,
    DotDot,
    Comma,
    Colon,
    Semicolon,
    Comment,
    Newline,
    Eof,
    Unknown,
}

impl TokenKind {
    /// Human-readable name used in syntax error messages.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Identifier => "identifier",
            TokenKind::Terminal => "terminal",
            TokenKind::Define => "'::='",
            TokenKind::Alternative => "'|'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Plus => "'+'",
            TokenKind::Star => "'*'",
            TokenKind::Question => "'?'",
            TokenKind::DotDot => "'..'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::Semicolon => "';'",
            TokenKind::Comment => "comment",
            TokenKind::Newline => "newline",
            TokenKind::Eof => "end of input",
            TokenKind::Unknown => "unrecognised input",
        }
    }
}

/// A grammar token with its decoded value and source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// For `Terminal`, the value with escapes already decoded; for
    /// `Comment`, the text after `#`; otherwise the lexeme itself.
    pub value: String,
    /// 1-based.
    pub line: usize,
    /// 1-based, counted in scalars.
    pub column: usize,
}

impl Token {
    fn new(kind: TokenKind, value: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            line,
            column,
        }
    }
}

/// A fatal lexer error (currently only malformed escape sequences; stray
/// bytes become `Unknown` tokens instead).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lexical error at line {}, column {}: {}",
            self.line, self.column, self.message
        )
    }
}

impl std::error::Error for LexError {}

fn convert(raw: RawToken, slice: &str, line: usize, column: usize) -> Token {
    match raw {
        RawToken::Define => Token::new(TokenKind::Define, slice, line, column),
        RawToken::Alternative => Token::new(TokenKind::Alternative, slice, line, column),
        RawToken::LParen => Token::new(TokenKind::LParen, slice, line, column),
        RawToken::RParen => Token::new(TokenKind::RParen, slice, line, column),
        RawToken::LBracket => Token::new(TokenKind::LBracket, slice, line, column),
        RawToken::RBracket => Token::new(TokenKind::RBracket, slice, line, column),
        RawToken::LBrace => Token::new(TokenKind::LBrace, slice, line, column),
        RawToken::RBrace => Token::new(TokenKind::RBrace, slice, line, column),
        RawToken::Plus => Token::new(TokenKind::Plus, slice, line, column),
        RawToken::Star => Token::new(TokenKind::Star, slice, line, column),
        RawToken::Question => Token::new(TokenKind::Question, slice, line, column),
        RawToken::DotDot => Token::new(TokenKind::DotDot, slice, line, column),
        RawToken::Comma => Token::new(TokenKind::Comma, slice, line, column),
        RawToken::Colon => Token::new(TokenKind::Colon, slice, line, column),
        RawToken::Semicolon => Token::new(TokenKind::Semicolon, slice, line, column),
        RawToken::Newline => Token::new(TokenKind::Newline, "\n", line, column),
        RawToken::Comment(text) => Token::new(TokenKind::Comment, text, line, column),
        RawToken::Terminal(value) => Token::new(TokenKind::Terminal, value, line, column),
        RawToken::Identifier(name) => Token::new(TokenKind::Identifier, name, line, column),
    }
}

/// Tokenize grammar source text.
///
/// The stream always ends with an `Eof` token. Unrecognised bytes become
/// `Unknown` tokens carrying the exact input slice; a malformed escape
/// sequence aborts lexing with a positioned [`LexError`].
pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
    let index = LineIndex::new(source);
    let mut lexer = RawToken::lexer(source);
    let mut out = Vec::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let (line, column) = index.position(span.start);
        match result {
            Ok(raw) => out.push(convert(raw, lexer.slice(), line, column)),
            Err(LexIssue::Unrecognised) => {
                out.push(Token::new(TokenKind::Unknown, lexer.slice(), line, column));
            }
            Err(LexIssue::InvalidEscape(message)) => {
                return Err(LexError {
                    message,
                    line,
                    column,
                });
            }
        }
    }

    let (line, column) = index.position(source.len());
    out.push(Token::new(TokenKind::Eof, "", line, column));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_lex_simple_rule() {
        let tokens = lex("expr ::= term").unwrap();
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                TokenKind::Identifier,
                TokenKind::Define,
                TokenKind::Identifier,
                TokenKind::Eof
            ]
        );
        assert_eq!(tokens[0].value, "expr");
        assert_eq!(tokens[2].value, "term");
    }

    #[test]
    fn test_lex_punctuation() {
        assert_eq!(
            kinds("( ) [ ] { } + * ? .. , : ; |"),
            vec![
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Plus,
                TokenKind::Star,
                TokenKind::Question,
                TokenKind::DotDot,
                TokenKind::Comma,
                TokenKind::Colon,
                TokenKind::Semicolon,
                TokenKind::Alternative,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_define_wins_over_colon() {
        // `::=` must lex as one token, not `:` `:` `=`.
        let tokens = lex("a ::= b").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Define);
        let tokens = lex("a:int").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Colon);
    }

    #[test]
    fn test_dot_dot_token() {
        let tokens = lex("'a'..'z'").unwrap();
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                TokenKind::Terminal,
                TokenKind::DotDot,
                TokenKind::Terminal,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_newlines_are_tokens() {
        let tokens = lex("a\nb").unwrap();
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                TokenKind::Identifier,
                TokenKind::Newline,
                TokenKind::Identifier,
                TokenKind::Eof
            ]
        );
        assert_eq!(tokens[2].line, 2);
        assert_eq!(tokens[2].column, 1);
    }

    #[test]
    fn test_comment_to_end_of_line() {
        let tokens = lex("# heading\nrule ::= 'x'").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Comment);
        assert_eq!(tokens[0].value, " heading");
        assert_eq!(tokens[1].kind, TokenKind::Newline);
    }

    #[test]
    fn test_string_escapes_decoded_at_lex_time() {
        let tokens = lex(r#""a\nb\t\\\"" 'it\'s'"#).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Terminal);
        assert_eq!(tokens[0].value, "a\nb\t\\\"");
        assert_eq!(tokens[1].value, "it's");
    }

    #[test]
    fn test_unicode_escapes() {
        let tokens = lex("'\\u0041' '\\U0001F600'").unwrap();
        assert_eq!(tokens[0].value, "A");
        assert_eq!(tokens[1].value, "😀");
    }

    #[test]
    fn test_malformed_unicode_escape_is_fatal() {
        let err = lex("x ::= '\\u12'").unwrap_err();
        assert!(err.message.contains("Unicode escape"));
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 7);
    }

    #[test]
    fn test_angle_bracket_identifier() {
        let tokens = lex("<rule name> ::= 'x'").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].value, "rule name");
    }

    #[test]
    fn test_identifier_charset() {
        let tokens = lex("list-item_2").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].value, "list-item_2");
    }

    #[test]
    fn test_unknown_bytes_become_unknown_tokens() {
        let tokens = lex("a @ b").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Unknown);
        assert_eq!(tokens[1].value, "@");
        // The rest of the stream is still lexed.
        assert_eq!(tokens[2].kind, TokenKind::Identifier);
    }

    #[test]
    fn test_eof_token_is_always_last() {
        let tokens = lex("").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
    }

    #[test]
    fn test_crlf_treated_as_line_end() {
        let tokens = lex("a\r\nb").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Newline);
        assert_eq!(tokens[2].line, 2);
    }
}
