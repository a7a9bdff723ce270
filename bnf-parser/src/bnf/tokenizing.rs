//! Grammar-driven tokenizer engine.
//!
//! Derives a working lexer from a grammar: rules whose right-hand sides
//! transitively consist only of terminals and character ranges are
//! *terminal-like*, and each gets a regex synthesized from its expression
//! tree. Tokenization picks the longest match across all terminal-like
//! rules at each position, breaking ties by rule declaration order.
//!
//! Compiled regexes are cached per tokenizer instance, keyed by pattern
//! string, and compiled lazily on first use.
//!
//! Character ranges above 0x7F disqualify a rule from terminal-likeness;
//! the tokenizer is an ASCII-range utility. Generated parsers handle such
//! ranges fully, this engine simply opts out of them.

use crate::bnf::grammar::{Expr, Grammar};
use crate::bnf::unicode::is_ascii_whitespace;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Token type used for the synthetic end-of-input token.
pub const EOF_TOKEN_TYPE: &str = "EOF";

/// Recursion budget when inlining non-terminal references into a regex;
/// breaks reference cycles.
const MAX_INLINE_DEPTH: usize = 100;

/// A token produced by the grammar-driven tokenizer. `token_type` is the
/// name of the matching rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub token_type: String,
    pub value: String,
    pub line: usize,
    pub column: usize,
    pub position: usize,
}

/// Tokenization failure: no terminal-like rule matches at the position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizeError {
    pub character: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unexpected character '{}' at line {}, column {}",
            self.character, self.line, self.column
        )
    }
}

impl std::error::Error for TokenizeError {}

/// Tokenizer for inputs of a given grammar.
pub struct Tokenizer<'g> {
    grammar: &'g Grammar,
    skip_whitespace: bool,
    skip_comments: bool,
    regex_cache: RefCell<HashMap<String, Regex>>,
}

impl<'g> Tokenizer<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            skip_whitespace: true,
            skip_comments: true,
            regex_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn set_skip_whitespace(&mut self, skip: bool) {
        self.skip_whitespace = skip;
    }

    pub fn set_skip_comments(&mut self, skip: bool) {
        self.skip_comments = skip;
    }

    /// Names of terminal-like rules, deduplicated, in declaration order.
    pub fn terminal_rule_names(&self) -> Vec<&str> {
        self.grammar
            .non_terminal_names()
            .into_iter()
            .filter(|name| self.is_terminal_rule(name))
            .collect()
    }

    /// True when every rule of this name has a terminal-like body.
    pub fn is_terminal_rule(&self, name: &str) -> bool {
        let mut clauses = self.grammar.rules_named(name).peekable();
        if clauses.peek().is_none() {
            return false;
        }
        clauses.all(|rule| {
            let mut visiting = HashSet::new();
            visiting.insert(name.to_string());
            self.is_terminal_expr(&rule.body, &mut visiting)
        })
    }

    fn is_terminal_expr(&self, expr: &Expr, visiting: &mut HashSet<String>) -> bool {
        match expr {
            Expr::Terminal(_) => true,
            Expr::CharRange { start, end } => *start <= 0x7F && *end <= 0x7F,
            Expr::Alternative(children) | Expr::Sequence(children) => children
                .iter()
                .all(|child| self.is_terminal_expr(child, visiting)),
            Expr::Group(child)
            | Expr::Optional(child)
            | Expr::ZeroOrMore(child)
            | Expr::OneOrMore(child) => self.is_terminal_expr(child, visiting),
            Expr::NonTerminal { name, .. } => {
                if !visiting.insert(name.clone()) {
                    return false; // reference cycle
                }
                let mut clauses = self.grammar.rules_named(name).peekable();
                if clauses.peek().is_none() {
                    return false;
                }
                let ok = clauses.all(|rule| self.is_terminal_expr(&rule.body, visiting));
                visiting.remove(name);
                ok
            }
            Expr::ContextAction { .. } => false,
        }
    }

    /// The regex synthesized for a rule, or `None` when the rule cannot be
    /// expressed (undefined references, inlining depth exceeded).
    pub fn pattern_for(&self, rule_name: &str) -> Option<String> {
        let rule = self.grammar.find_rule(rule_name)?;
        self.regex_fragment(&rule.body, 0)
    }

    fn regex_fragment(&self, expr: &Expr, depth: usize) -> Option<String> {
        if depth > MAX_INLINE_DEPTH {
            return None;
        }
        match expr {
            Expr::Terminal(value) => Some(escape_regex(value)),
            Expr::CharRange { start, end } => {
                let lo = char::from_u32(*start)?;
                let hi = char::from_u32(*end)?;
                Some(format!("[{}-{}]", escape_in_class(lo), escape_in_class(hi)))
            }
            Expr::Alternative(children) => {
                let parts: Option<Vec<String>> = children
                    .iter()
                    .map(|c| self.regex_fragment(c, depth))
                    .collect();
                Some(format!("({})", parts?.join("|")))
            }
            Expr::Sequence(children) => {
                let parts: Option<Vec<String>> = children
                    .iter()
                    .map(|c| self.regex_fragment(c, depth))
                    .collect();
                Some(format!("({})", parts?.join("")))
            }
            Expr::Group(child) => Some(format!("({})", self.regex_fragment(child, depth)?)),
            Expr::Optional(child) => Some(format!("({})?", self.regex_fragment(child, depth)?)),
            Expr::ZeroOrMore(child) => Some(format!("({})*", self.regex_fragment(child, depth)?)),
            Expr::OneOrMore(child) => Some(format!("({})+", self.regex_fragment(child, depth)?)),
            Expr::NonTerminal { name, .. } => {
                let rule = self.grammar.find_rule(name)?;
                self.regex_fragment(&rule.body, depth + 1)
            }
            Expr::ContextAction { .. } => None,
        }
    }

    fn match_len_at(&self, pattern: &str, rest: &str) -> Option<usize> {
        let anchored = format!("^(?:{})", pattern);
        let mut cache = self.regex_cache.borrow_mut();
        if !cache.contains_key(&anchored) {
            let compiled = Regex::new(&anchored).ok()?;
            cache.insert(anchored.clone(), compiled);
        }
        let regex = cache.get(&anchored)?;
        regex.find(rest).map(|m| m.end())
    }

    /// Tokenize an input text against the grammar's terminal-like rules.
    ///
    /// Always terminates the stream with an `EOF` token. Fails with an
    /// `Unexpected character` error when nothing matches.
    pub fn tokenize(&self, input: &str) -> Result<Vec<Token>, TokenizeError> {
        let terminal_rules = self.terminal_rule_names();
        let patterns: Vec<(String, Option<String>)> = terminal_rules
            .iter()
            .map(|name| (name.to_string(), self.pattern_for(name)))
            .collect();

        let mut tokens = Vec::new();
        let mut pos = 0usize;
        let mut line = 1usize;
        let mut column = 1usize;

        while pos < input.len() {
            self.skip_ignored(input, &mut pos, &mut line, &mut column);
            if pos >= input.len() {
                break;
            }

            let rest = &input[pos..];
            let mut best: Option<(&str, usize)> = None;
            for (name, pattern) in &patterns {
                let Some(pattern) = pattern else { continue };
                if let Some(len) = self.match_len_at(pattern, rest) {
                    // Strict comparison keeps the first-declared rule on ties;
                    // zero-length matches are not tokens.
                    if len > 0 && best.map_or(true, |(_, best_len)| len > best_len) {
                        best = Some((name, len));
                    }
                }
            }

            match best {
                Some((name, len)) => {
                    let value = &rest[..len];
                    tokens.push(Token {
                        token_type: name.to_string(),
                        value: value.to_string(),
                        line,
                        column,
                        position: pos,
                    });
                    advance_position(value, &mut line, &mut column);
                    pos += len;
                }
                None => {
                    let character = rest.chars().next().map(String::from).unwrap_or_default();
                    return Err(TokenizeError {
                        character,
                        line,
                        column,
                    });
                }
            }
        }

        tokens.push(Token {
            token_type: EOF_TOKEN_TYPE.to_string(),
            value: String::new(),
            line,
            column,
            position: pos,
        });
        Ok(tokens)
    }

    fn skip_ignored(&self, input: &str, pos: &mut usize, line: &mut usize, column: &mut usize) {
        loop {
            let rest = &input[*pos..];
            let Some(ch) = rest.chars().next() else { return };
            if self.skip_whitespace && is_ascii_whitespace(ch) {
                advance_position(&rest[..ch.len_utf8()], line, column);
                *pos += ch.len_utf8();
                continue;
            }
            if self.skip_comments && ch == '#' {
                let comment_len = rest.find('\n').unwrap_or(rest.len());
                advance_position(&rest[..comment_len], line, column);
                *pos += comment_len;
                continue;
            }
            return;
        }
    }
}

fn advance_position(text: &str, line: &mut usize, column: &mut usize) {
    for ch in text.chars() {
        if ch == '\n' {
            *line += 1;
            *column = 1;
        } else {
            *column += 1;
        }
    }
}

/// Escape a literal for use in a regex.
pub fn escape_regex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(
            ch,
            '.' | '^' | '$' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\'
        ) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn escape_in_class(ch: char) -> String {
    if matches!(ch, '^' | ']' | '\\' | '-') {
        format!("\\{}", ch)
    } else {
        ch.to_string()
    }
}

/// Join token values with single spaces, skipping the EOF token.
pub fn tokens_to_string(tokens: &[Token]) -> String {
    tokens
        .iter()
        .filter(|t| t.token_type != EOF_TOKEN_TYPE)
        .map(|t| t.value.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// All tokens of a given type.
pub fn find_tokens_by_type<'a>(tokens: &'a [Token], token_type: &str) -> Vec<&'a Token> {
    tokens
        .iter()
        .filter(|t| t.token_type == token_type)
        .collect()
}

/// Aggregate statistics over a token stream (EOF excluded).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenStats {
    pub total_tokens: usize,
    pub unique_types: usize,
    pub type_counts: HashMap<String, usize>,
}

pub fn analyze_tokens(tokens: &[Token]) -> TokenStats {
    let mut stats = TokenStats::default();
    for token in tokens {
        if token.token_type == EOF_TOKEN_TYPE {
            continue;
        }
        stats.total_tokens += 1;
        *stats.type_counts.entry(token.token_type.clone()).or_insert(0) += 1;
    }
    stats.unique_types = stats.type_counts.len();
    stats
}
