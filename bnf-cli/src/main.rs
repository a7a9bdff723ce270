//! Command-line front-end for the BNF/EBNF parser generator.
//!
//! Usage:
//!   bnfgen -i grammar.bnf                        - Generate a parser into generated/<stem>/
//!   bnfgen -i grammar.bnf -o my_parser.cpp       - Override the output file name
//!   bnfgen -i grammar.bnf -f executable -e -v    - Also emit a main, verbosely

use bnf_parser::bnf::codegen::{is_language_supported, supported_languages};
use bnf_parser::bnf::pipeline::{self, OutputFormat, PipelineOptions};
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use std::process;

fn build_command() -> Command {
    Command::new("bnfgen")
        .version(bnf_parser::VERSION)
        .about("Generate standalone recursive-descent parsers from BNF/EBNF grammars")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .help("Input BNF/EBNF grammar file (required)")
                .required(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Output parser file name (default: <stem>_parser.<ext>)"),
        )
        .arg(
            Arg::new("output-dir")
                .long("output-dir")
                .help("Output directory (default: generated/<stem>)"),
        )
        .arg(
            Arg::new("language")
                .short('l')
                .long("language")
                .default_value("cpp")
                .help("Target language"),
        )
        .arg(
            Arg::new("name")
                .short('n')
                .long("name")
                .help("Parser class name (default: derived from the grammar file name)"),
        )
        .arg(
            Arg::new("namespace")
                .long("namespace")
                .help("Namespace/package name for the generated code"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .default_value("source-only")
                .value_parser([
                    "source-only",
                    "library-static",
                    "library-shared",
                    "executable",
                    "all",
                ])
                .help("Artefacts to produce"),
        )
        .arg(
            Arg::new("executable")
                .short('e')
                .long("executable")
                .action(ArgAction::SetTrue)
                .help("Emit a main alongside the parser"),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .action(ArgAction::SetTrue)
                .help("Emit diagnostic traces in the generated parser"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Verbose output"),
        )
}

fn main() {
    let matches = match build_command().try_get_matches() {
        Ok(matches) => matches,
        Err(err) => {
            use clap::error::ErrorKind;
            match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    print!("{}", err);
                    process::exit(0);
                }
                _ => {
                    // Unknown options, missing arguments, bad values: all
                    // exit 1.
                    eprintln!("{}", err);
                    process::exit(1);
                }
            }
        }
    };

    let Some(input) = matches.get_one::<String>("input") else {
        eprintln!("Error: Input file is required");
        process::exit(1);
    };
    let language = matches
        .get_one::<String>("language")
        .map(String::as_str)
        .unwrap_or("cpp")
        .to_string();
    if !is_language_supported(&language) {
        eprintln!("Error: Unsupported language: {}", language);
        eprintln!("Supported languages: {}", supported_languages().join(", "));
        process::exit(1);
    }
    let format_tag = matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("source-only");
    let Some(format) = OutputFormat::from_tag(format_tag) else {
        eprintln!("Error: Unsupported format: {}", format_tag);
        process::exit(1);
    };

    let mut options = PipelineOptions::new(PathBuf::from(input));
    options.output = matches.get_one::<String>("output").map(PathBuf::from);
    options.output_dir = matches.get_one::<String>("output-dir").map(PathBuf::from);
    options.language = language;
    options.parser_name = matches.get_one::<String>("name").cloned();
    options.namespace = matches.get_one::<String>("namespace").cloned();
    options.format = format;
    options.executable = matches.get_flag("executable");
    options.debug = matches.get_flag("debug");
    options.verbose = matches.get_flag("verbose");

    match pipeline::run(&options) {
        Ok(report) => {
            for warning in &report.warnings {
                eprintln!("{}", warning);
            }
            if options.verbose {
                println!("Success");
            } else if let Some(first) = report.written.first() {
                println!("Generated: {}", first.display());
            }
        }
        Err(diagnostic) => {
            eprintln!("{}", diagnostic);
            process::exit(1);
        }
    }
}
