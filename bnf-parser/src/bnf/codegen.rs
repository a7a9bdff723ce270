//! Code emitter.
//!
//! Walks a validated grammar and synthesizes a self-contained
//! recursive-descent parser in a target language. Backends implement
//! [`CodeGenerator`]; [`create_generator`] is the factory keyed by
//! language tag. C++ is the only backend today, but the seam exists so
//! further targets slot in without touching the pipeline.

pub mod cpp;
pub mod naming;

pub use cpp::CppGenerator;

use crate::bnf::grammar::Grammar;
use std::fmt;

/// Options controlling code generation.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Target language tag (`cpp`).
    pub target_language: String,
    /// Generated parser class name.
    pub parser_name: String,
    /// Namespace/package to enclose the generated code in.
    pub namespace: Option<String>,
    /// Emit rule entry/exit traces in the generated parser.
    pub debug_mode: bool,
    /// Also generate a `main` translation unit.
    pub generate_executable: bool,
    /// One indentation level in the generated source.
    pub indent_unit: String,
    /// Stack guard for the generated parser's rule recursion.
    pub max_recursion_depth: usize,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            target_language: "cpp".to_string(),
            parser_name: "GeneratedParser".to_string(),
            namespace: None,
            debug_mode: false,
            generate_executable: false,
            indent_unit: "    ".to_string(),
            max_recursion_depth: 1000,
        }
    }
}

/// Result of a successful generation run.
#[derive(Debug, Clone, Default)]
pub struct GeneratedCode {
    pub parser_code: String,
    pub parser_filename: String,
    /// Present when `generate_executable` was requested.
    pub main_code: Option<String>,
    pub main_filename: Option<String>,
    pub messages: Vec<String>,
    pub warnings: Vec<String>,
}

/// Emitter failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitError {
    pub message: String,
}

impl EmitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Code generation failed: {}", self.message)
    }
}

impl std::error::Error for EmitError {}

/// A code generation backend for one target language.
pub trait CodeGenerator {
    fn generate(
        &mut self,
        grammar: &Grammar,
        options: &GeneratorOptions,
    ) -> Result<GeneratedCode, EmitError>;

    fn target_language(&self) -> &'static str;

    fn file_extension(&self) -> &'static str;
}

/// Language tags with a backend.
pub fn supported_languages() -> &'static [&'static str] {
    &["cpp"]
}

pub fn is_language_supported(language: &str) -> bool {
    create_generator(language).is_some()
}

/// Create the backend for a language tag, accepting common aliases.
pub fn create_generator(language: &str) -> Option<Box<dyn CodeGenerator>> {
    match language.to_ascii_lowercase().as_str() {
        "cpp" | "c++" | "cxx" => Some(Box::new(CppGenerator::new())),
        _ => None,
    }
}
