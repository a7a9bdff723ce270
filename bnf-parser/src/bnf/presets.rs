//! Built-in grammars.
//!
//! Constructed from embedded grammar text through the regular pipeline
//! (lex, parse, validate), so they double as living documentation of the
//! notation and as fixtures for tests and demos.

use crate::bnf::grammar::Grammar;
use crate::bnf::pipeline::{grammar_from_str, Diagnostic};

const JSON_GRAMMAR: &str = r#"# JSON grammar (RFC 7159 shape)
json ::= value
value ::= object | array | string | number | boolean | null

object ::= '{' [member {',' member}] '}'
member ::= string ':' value
array ::= '[' [value {',' value}] ']'

string ::= '"' char* '"'
char ::= unescaped | escaped
unescaped ::= 'a'..'z' | 'A'..'Z' | '0'..'9' | ' ' | '!' | '#'..'[' | ']'..'~'
escaped ::= '\\' ('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' | unicode)
unicode ::= 'u' hex hex hex hex
hex ::= '0'..'9' | 'a'..'f' | 'A'..'F'

number ::= ['-'] int frac? exp?
frac ::= '.' digit+
exp ::= ('e' | 'E') ['+' | '-'] digit+
int ::= '0' | ('1'..'9' digit*)
digit ::= '0'..'9'

boolean ::= 'true' | 'false'
null ::= 'null'
"#;

const ARITHMETIC_GRAMMAR: &str = "\
expr ::= term {('+' | '-') term};
term ::= factor {('*' | '/') factor};
factor ::= NUMBER | '(' expr ')';
NUMBER ::= ('0'..'9')+;
";

const IDENTIFIER_GRAMMAR: &str = "\
identifier ::= letter (letter | digit | '_')*
letter ::= 'a'..'z' | 'A'..'Z'
digit ::= '0'..'9'
";

/// JSON value grammar; start symbol `json`.
pub fn json_grammar() -> Result<Grammar, Diagnostic> {
    grammar_from_str(JSON_GRAMMAR).map(|(grammar, _)| grammar)
}

/// Infix arithmetic with `+ - * /`, parentheses, and integer literals.
pub fn arithmetic_grammar() -> Result<Grammar, Diagnostic> {
    grammar_from_str(ARITHMETIC_GRAMMAR).map(|(grammar, _)| grammar)
}

/// C-style identifiers: a letter followed by letters, digits, `_`.
pub fn identifier_grammar() -> Result<Grammar, Diagnostic> {
    grammar_from_str(IDENTIFIER_GRAMMAR).map(|(grammar, _)| grammar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bnf::tokenizing::Tokenizer;
    use crate::bnf::validation::validate;

    #[test]
    fn test_json_grammar_builds_and_validates() {
        let grammar = json_grammar().unwrap();
        assert_eq!(grammar.start_symbol, "json");
        assert!(grammar.find_rule("value").is_some());
        assert!(validate(&grammar).is_valid());
    }

    #[test]
    fn test_arithmetic_grammar_builds() {
        let grammar = arithmetic_grammar().unwrap();
        assert_eq!(grammar.start_symbol, "expr");
        assert_eq!(grammar.rules.len(), 4);
    }

    #[test]
    fn test_arithmetic_tokenizer_recognises_numbers() {
        let grammar = arithmetic_grammar().unwrap();
        let tokenizer = Tokenizer::new(&grammar);
        let tokens = tokenizer.tokenize("10 42").unwrap();
        assert_eq!(tokens[0].token_type, "NUMBER");
        assert_eq!(tokens[1].value, "42");
    }

    #[test]
    fn test_identifier_grammar_builds() {
        let grammar = identifier_grammar().unwrap();
        assert_eq!(grammar.start_symbol, "identifier");
        assert!(validate(&grammar).is_valid());
    }
}
