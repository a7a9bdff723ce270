//! Integration tests for the grammar front-end: lexing plus parsing into
//! the grammar IR, including the start-symbol heuristic.

use bnf_parser::bnf::grammar::{Expr, Grammar};
use bnf_parser::bnf::lexing::lex;
use bnf_parser::bnf::parsing::parse_tokens;
use rstest::rstest;

fn parse(source: &str) -> Grammar {
    parse_tokens(lex(source).unwrap()).unwrap()
}

#[test]
fn arithmetic_grammar_shape() {
    let g = parse(
        "expr ::= term {('+' | '-') term}; term ::= factor {('*' | '/') factor}; \
         factor ::= NUM | '(' expr ')'; NUM ::= ('0'..'9')+",
    );
    assert_eq!(g.rules.len(), 4);
    assert_eq!(g.start_symbol, "expr");

    // expr ::= term {…}: a two-element sequence whose second element is a
    // repetition of (op term).
    match &g.rules[0].body {
        Expr::Sequence(elements) => {
            assert_eq!(elements.len(), 2);
            assert!(matches!(&elements[0], Expr::NonTerminal { name, .. } if name == "term"));
            assert!(matches!(&elements[1], Expr::ZeroOrMore(_)));
        }
        other => panic!("expected sequence, got {:?}", other),
    }

    // factor ::= NUM | '(' expr ')': ordered choice, NUM first.
    match &g.rules[2].body {
        Expr::Alternative(choices) => {
            assert_eq!(choices.len(), 2);
            assert!(matches!(&choices[0], Expr::NonTerminal { name, .. } if name == "NUM"));
        }
        other => panic!("expected alternative, got {:?}", other),
    }
}

#[rstest]
#[case("value ::= 'v'\njson ::= value", "json")]
#[case("value ::= 'v'\nprogram ::= value", "program")]
#[case("helper ::= 'h'\nstart ::= helper", "start")]
#[case("a ::= 'x'\nroot ::= a\ngrammar ::= a", "grammar")]
#[case("digit ::= '0'..'9'\nnumber ::= digit+", "number")]
#[case("a ::= 'x'\nb ::= 'y'", "a")]
fn start_symbol_heuristic(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(parse(source).start_symbol, expected);
}

#[rstest]
#[case("s ::= 'a' 'b'")]
#[case("list ::= '[' [elem {',' elem}] ']'; elem ::= 'a'..'z'+")]
#[case("greet[N:enum{sing,plur}] ::= noun[N] verb[N]\nnoun[sing] ::= 'cat'\nnoun[plur] ::= 'cats'\nverb[sing] ::= 'runs'\nverb[plur] ::= 'run'")]
#[case("doc ::= anchor*\nanchor ::= '&' name {store(name, name)}\nname ::= ('a'..'z')+")]
fn spec_scenario_grammars_parse(#[case] source: &str) {
    let g = parse(source);
    assert!(!g.rules.is_empty());
    assert!(!g.start_symbol.is_empty());
}

#[test]
fn parsing_is_deterministic() {
    let source = "json ::= object\nobject ::= '{' [pair {',' pair}] '}'\npair ::= key ':' json\nkey ::= ('a'..'z')+";
    let first = parse(source);
    let second = parse(source);
    assert_eq!(first, second);
    assert_eq!(first.start_symbol, second.start_symbol);
}

#[test]
fn quantifier_binds_tighter_than_sequence() {
    let g = parse("s ::= 'a' 'b'+");
    match &g.rules[0].body {
        Expr::Sequence(elements) => {
            assert_eq!(elements[0], Expr::Terminal("a".into()));
            assert!(
                matches!(&elements[1], Expr::OneOrMore(inner) if **inner == Expr::Terminal("b".into()))
            );
        }
        other => panic!("expected sequence, got {:?}", other),
    }
}

#[test]
fn alternative_spans_sequences() {
    let g = parse("s ::= 'a' 'b' | 'c' 'd'");
    match &g.rules[0].body {
        Expr::Alternative(choices) => {
            assert_eq!(choices.len(), 2);
            assert!(matches!(&choices[0], Expr::Sequence(_)));
            assert!(matches!(&choices[1], Expr::Sequence(_)));
        }
        other => panic!("expected alternative, got {:?}", other),
    }
}

#[test]
fn angle_identifiers_and_hyphens() {
    let g = parse("<rule one> ::= sub-item\nsub-item ::= 'x'");
    assert_eq!(g.rules[0].name, "rule one");
    assert!(
        matches!(&g.rules[0].body, Expr::NonTerminal { name, .. } if name == "sub-item")
    );
}

#[test]
fn unicode_terminals_survive_lexing() {
    let g = parse("emoji ::= '😀' | '\\U0001F601'");
    match &g.rules[0].body {
        Expr::Alternative(choices) => {
            assert_eq!(choices[0], Expr::Terminal("😀".into()));
            assert_eq!(choices[1], Expr::Terminal("😁".into()));
        }
        other => panic!("expected alternative, got {:?}", other),
    }
}

#[test]
fn syntax_error_carries_position() {
    let err = parse_tokens(lex("s ::= |").unwrap()).unwrap_err();
    assert_eq!(err.line, 1);
    assert_eq!(err.column, 7);
    assert!(err.to_string().starts_with("Parse error at line 1, column 7"));
}

#[test]
fn lexer_error_aborts_with_position() {
    let err = lex("rule ::= '\\u00'").unwrap_err();
    assert_eq!(err.line, 1);
    assert_eq!(err.column, 10);
}
