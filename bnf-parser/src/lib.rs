//! # bnf-parser
//!
//! A toolchain for BNF/EBNF grammars: parse a grammar file into an
//! intermediate representation, validate it, derive a tokenizer from it,
//! and emit a standalone recursive-descent parser for it.
//!
//! The pipeline is linear and synchronous:
//!
//! ```text
//! grammar text -> lexing -> parsing -> validation -> codegen -> files
//! ```
//!
//! Each stage is usable on its own. [`bnf::pipeline`] wires them together
//! and is what the `bnfgen` binary drives; [`bnf::tokenizing`] is a
//! decoupled utility that turns any validated grammar into a working
//! lexer for *inputs* of that grammar, independent of code generation.

pub mod bnf;

/// Crate version, as reported by `bnfgen --version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
