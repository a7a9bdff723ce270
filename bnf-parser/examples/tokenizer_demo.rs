//! Derive a tokenizer from a small lexical grammar and dump the token
//! stream for a sample input as JSON.
//!
//! Run with: cargo run -p bnf-parser --example tokenizer_demo

use bnf_parser::bnf::pipeline::grammar_from_str;
use bnf_parser::bnf::tokenizing::{analyze_tokens, tokens_to_string, Tokenizer};

// Every rule is terminal-like, so each becomes one token class.
const LEXICAL_GRAMMAR: &str = "\
NUMBER ::= ('0'..'9')+
OP ::= '+' | '-' | '*' | '/'
LPAREN ::= '('
RPAREN ::= ')'
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (grammar, warnings) = grammar_from_str(LEXICAL_GRAMMAR)?;
    for warning in &warnings {
        // A pure token grammar has no cross-references, so reachability
        // warnings are expected here.
        eprintln!("note: {}", warning);
    }

    let tokenizer = Tokenizer::new(&grammar);
    println!(
        "Terminal-like rules: {}",
        tokenizer.terminal_rule_names().join(", ")
    );

    let input = "12 + 34 * (5 - 6)  # trailing comment";
    let tokens = tokenizer.tokenize(input)?;

    println!("\nInput:  {}", input);
    println!("Joined: {}", tokens_to_string(&tokens));
    println!("Tokens: {}", serde_json::to_string_pretty(&tokens)?);

    let stats = analyze_tokens(&tokens);
    println!(
        "\n{} token(s), {} distinct type(s)",
        stats.total_tokens, stats.unique_types
    );
    Ok(())
}
