//! Pipeline orchestration.
//!
//! The linear pipeline: read grammar text, lex, parse, validate, emit,
//! write files. Every stage failure is converted into a [`Diagnostic`]
//! that carries the stage, severity, and (when known) source position;
//! validator warnings ride along without stopping the run.
//!
//! [`compile_str`] is the pure seam (text in, generated code out) used by
//! tests and embedders; [`run`] adds the file I/O at the boundary and the
//! on-disk output layout.

use crate::bnf::codegen::naming::{grammar_stem, pascal_case};
use crate::bnf::codegen::{create_generator, EmitError, GeneratedCode, GeneratorOptions};
use crate::bnf::grammar::Grammar;
use crate::bnf::lexing::{lex, LexError};
use crate::bnf::parsing::{parse_tokens, ParseError};
use crate::bnf::validation::validate;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Pipeline stage a diagnostic originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Io,
    Lexer,
    Parser,
    Validator,
    Emitter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A structured pipeline diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub severity: Severity,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    pub fn error(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            severity: Severity::Error,
            line: None,
            column: None,
            message: message.into(),
        }
    }

    pub fn warning(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            severity: Severity::Warning,
            line: None,
            column: None,
            message: message.into(),
        }
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Error => write!(f, "error: {}", self.message)?,
            Severity::Warning => write!(f, "warning: {}", self.message)?,
        }
        if let (Some(line), Some(column)) = (self.line, self.column) {
            write!(f, " (line {}, column {})", line, column)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

impl From<LexError> for Diagnostic {
    fn from(err: LexError) -> Self {
        Diagnostic::error(Stage::Lexer, err.message.clone()).at(err.line, err.column)
    }
}

impl From<ParseError> for Diagnostic {
    fn from(err: ParseError) -> Self {
        Diagnostic::error(Stage::Parser, err.message.clone()).at(err.line, err.column)
    }
}

impl From<EmitError> for Diagnostic {
    fn from(err: EmitError) -> Self {
        Diagnostic::error(Stage::Emitter, err.message)
    }
}

/// What artefacts a run should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    SourceOnly,
    LibraryStatic,
    LibraryShared,
    Executable,
    All,
}

impl OutputFormat {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "source-only" => Some(OutputFormat::SourceOnly),
            "library-static" => Some(OutputFormat::LibraryStatic),
            "library-shared" => Some(OutputFormat::LibraryShared),
            "executable" => Some(OutputFormat::Executable),
            "all" => Some(OutputFormat::All),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            OutputFormat::SourceOnly => "source-only",
            OutputFormat::LibraryStatic => "library-static",
            OutputFormat::LibraryShared => "library-shared",
            OutputFormat::Executable => "executable",
            OutputFormat::All => "all",
        }
    }
}

/// Options for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub input: PathBuf,
    /// Override for the parser file's basename.
    pub output: Option<PathBuf>,
    /// Override for the whole output directory; defaults to
    /// `generated/<stem>/`.
    pub output_dir: Option<PathBuf>,
    pub language: String,
    /// Override for the parser class name; defaults to
    /// `<PascalCase(stem)>Parser`.
    pub parser_name: Option<String>,
    pub namespace: Option<String>,
    pub format: OutputFormat,
    /// Emit a `main` even when the format alone would not.
    pub executable: bool,
    pub debug: bool,
    pub verbose: bool,
}

impl PipelineOptions {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            output_dir: None,
            language: "cpp".to_string(),
            parser_name: None,
            namespace: None,
            format: OutputFormat::SourceOnly,
            executable: false,
            debug: false,
            verbose: false,
        }
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub written: Vec<PathBuf>,
    pub warnings: Vec<Diagnostic>,
    pub rule_count: usize,
    pub start_symbol: String,
}

/// Lex, parse, and validate grammar text. Validator errors are batched
/// into one composite diagnostic; warnings are returned alongside.
pub fn grammar_from_str(source: &str) -> Result<(Grammar, Vec<Diagnostic>), Diagnostic> {
    let tokens = lex(source)?;
    let grammar = parse_tokens(tokens)?;
    let report = validate(&grammar);
    if !report.is_valid() {
        return Err(Diagnostic::error(
            Stage::Validator,
            format!("Grammar validation failed: {}", report.errors.join("; ")),
        ));
    }
    let warnings = report
        .warnings
        .iter()
        .map(|w| Diagnostic::warning(Stage::Validator, w.clone()))
        .collect();
    Ok((grammar, warnings))
}

/// Compile grammar text to generated code without touching the
/// filesystem.
pub fn compile_str(
    source: &str,
    options: &GeneratorOptions,
) -> Result<(GeneratedCode, Vec<Diagnostic>), Diagnostic> {
    let (grammar, warnings) = grammar_from_str(source)?;
    let mut generator = create_generator(&options.target_language).ok_or_else(|| {
        Diagnostic::error(
            Stage::Emitter,
            format!("Unsupported language: {}", options.target_language),
        )
    })?;
    let code = generator.generate(&grammar, options)?;
    Ok((code, warnings))
}

/// Run the full pipeline: read the grammar file, compile, write the
/// artefacts selected by the output format.
pub fn run(options: &PipelineOptions) -> Result<PipelineReport, Diagnostic> {
    let source = fs::read_to_string(&options.input).map_err(|err| {
        Diagnostic::error(
            Stage::Io,
            format!(
                "Cannot open grammar file: {}: {}",
                options.input.display(),
                err
            ),
        )
    })?;

    let stem = grammar_stem(&options.input.to_string_lossy());
    let parser_name = options
        .parser_name
        .clone()
        .unwrap_or_else(|| format!("{}Parser", pascal_case(&stem)));

    let wants_main = options.executable
        || matches!(options.format, OutputFormat::Executable | OutputFormat::All);
    let generator_options = GeneratorOptions {
        target_language: options.language.clone(),
        parser_name,
        namespace: options.namespace.clone(),
        debug_mode: options.debug,
        generate_executable: wants_main,
        ..GeneratorOptions::default()
    };

    if options.verbose {
        println!("[1/3] Parsing grammar {}...", options.input.display());
    }
    let (grammar, warnings) = grammar_from_str(&source)?;
    if options.verbose {
        println!(
            "  parsed {} rule(s), start symbol '{}'",
            grammar.rules.len(),
            grammar.start_symbol
        );
        println!("[2/3] Grammar is valid");
        for warning in &warnings {
            println!("  {}", warning);
        }
        println!("[3/3] Generating {} parser...", options.language);
    }

    let mut generator = create_generator(&options.language).ok_or_else(|| {
        Diagnostic::error(
            Stage::Emitter,
            format!("Unsupported language: {}", options.language),
        )
    })?;
    let code = generator.generate(&grammar, &generator_options)?;

    let base_dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("generated").join(&stem));
    let parser_basename = options
        .output
        .as_ref()
        .and_then(|p| p.file_name().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(&code.parser_filename));

    let mut written = Vec::new();
    let mut parser_dirs: Vec<&str> = Vec::new();
    let mut main_dirs: Vec<&str> = Vec::new();
    match options.format {
        OutputFormat::SourceOnly => parser_dirs.push("source"),
        OutputFormat::LibraryStatic => parser_dirs.push("lib-static"),
        OutputFormat::LibraryShared => parser_dirs.push("lib-shared"),
        OutputFormat::Executable => {
            parser_dirs.push("source");
            main_dirs.push("exec/debug");
            main_dirs.push("exec/release");
        }
        OutputFormat::All => {
            parser_dirs.push("source");
            parser_dirs.push("lib-static");
            parser_dirs.push("lib-shared");
            main_dirs.push("exec/debug");
            main_dirs.push("exec/release");
        }
    }
    // `-e` without an executable format keeps the main next to the parser.
    if options.executable && main_dirs.is_empty() {
        main_dirs.push("source");
    }

    for dir in parser_dirs {
        written.push(write_file(
            &base_dir.join(dir),
            &parser_basename,
            &code.parser_code,
        )?);
    }
    if let (Some(main_code), Some(main_filename)) = (&code.main_code, &code.main_filename) {
        for dir in main_dirs {
            written.push(write_file(
                &base_dir.join(dir),
                Path::new(main_filename),
                main_code,
            )?);
        }
    }

    if options.verbose {
        for path in &written {
            println!("  wrote {}", path.display());
        }
    }

    Ok(PipelineReport {
        written,
        warnings,
        rule_count: grammar.rules.len(),
        start_symbol: grammar.start_symbol.clone(),
    })
}

fn write_file(dir: &Path, name: &Path, contents: &str) -> Result<PathBuf, Diagnostic> {
    fs::create_dir_all(dir).map_err(|err| {
        Diagnostic::error(
            Stage::Io,
            format!("Cannot create directory: {}: {}", dir.display(), err),
        )
    })?;
    let path = dir.join(name);
    fs::write(&path, contents).map_err(|err| {
        Diagnostic::error(
            Stage::Io,
            format!("Cannot write to file: {}: {}", path.display(), err),
        )
    })?;
    Ok(path)
}
