//! Generate a C++ calculator parser from the built-in arithmetic grammar
//! and print the emitted source to stdout.
//!
//! Run with: cargo run -p bnf-parser --example generate_calculator

use bnf_parser::bnf::codegen::{create_generator, GeneratorOptions};
use bnf_parser::bnf::presets::arithmetic_grammar;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let grammar = arithmetic_grammar()?;

    let mut options = GeneratorOptions::default();
    options.parser_name = "CalculatorParser".to_string();
    options.generate_executable = true;

    let mut generator =
        create_generator("cpp").ok_or("no C++ backend registered")?;
    let code = generator.generate(&grammar, &options)?;

    for message in &code.messages {
        eprintln!("// {}", message);
    }
    eprintln!("// parser file: {}", code.parser_filename);
    if let Some(main_filename) = &code.main_filename {
        eprintln!("// main file:   {}", main_filename);
    }

    println!("{}", code.parser_code);
    Ok(())
}
