//! Pretty-print/re-parse round trips.
//!
//! Printing a grammar and parsing the output must reproduce the same IR,
//! modulo whitespace and comments. The property-based strategy generates
//! only parser-reachable expression shapes: the notation has two
//! documented ambiguities (a `[` directly after a non-terminal reads as
//! an argument list, and `{ident(` opens a context action), so printed
//! text that walked into them would legitimately parse differently.

use bnf_parser::bnf::grammar::{Expr, Grammar, Parameter, ParameterType, Rule};
use bnf_parser::bnf::lexing::lex;
use bnf_parser::bnf::parsing::parse_tokens;
use proptest::prelude::*;

fn reparse(grammar: &Grammar) -> Grammar {
    let printed = grammar.to_string();
    parse_tokens(lex(&printed).unwrap_or_else(|e| panic!("lex failed: {}\n{}", e, printed)))
        .unwrap_or_else(|e| panic!("parse failed: {}\n{}", e, printed))
}

fn assert_round_trips(source: &str) {
    let grammar = parse_tokens(lex(source).unwrap()).unwrap();
    let back = reparse(&grammar);
    assert_eq!(grammar, back, "printed form:\n{}", grammar);
}

#[test]
fn arithmetic_round_trips() {
    assert_round_trips(
        "expr ::= term {('+' | '-') term}; term ::= factor {('*' | '/') factor}; \
         factor ::= NUM | '(' expr ')'; NUM ::= ('0'..'9')+",
    );
}

#[test]
fn quantifiers_round_trip() {
    assert_round_trips("s ::= 'a'+ 'b'* 'c'? ('d' | 'e')");
}

#[test]
fn parameterized_rules_round_trip() {
    assert_round_trips(
        "greet[N:enum{sing,plur}] ::= noun[N] verb[N]\n\
         noun[sing] ::= 'cat'\n\
         noun[plur] ::= 'cats'\n\
         verb[sing] ::= 'runs'\n\
         verb[plur] ::= 'run'",
    );
}

#[test]
fn typed_parameters_round_trip() {
    assert_round_trips("block[depth:int, strict:bool, label] ::= 'x' inner[depth]\ninner[d:int] ::= 'y'");
}

#[test]
fn context_actions_round_trip() {
    assert_round_trips(
        "doc ::= anchor*\n\
         anchor ::= '&' name {store(name, name)} {lookup(name)} {check(limit)}\n\
         name ::= ('a'..'z')+",
    );
}

#[test]
fn escapes_round_trip() {
    assert_round_trips("s ::= 'a\\nb' | '\\t' | 'it\\'s' | '\\\\'");
}

#[test]
fn unicode_ranges_round_trip() {
    assert_round_trips("cyr ::= 'а'..'я'\nemoji ::= '😀'..'😂'\ns ::= cyr emoji");
}

// ---------------------------------------------------------------------
// Property-based round trips
// ---------------------------------------------------------------------

fn ident_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,6}"
}

fn terminal_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        // Printable ASCII, including quotes and backslashes; the printer
        // escapes them.
        "[ -~]{1,8}",
        // A few multi-byte scalars.
        "[é€αβ😀]{1,3}",
    ]
}

fn char_range_strategy() -> impl Strategy<Value = Expr> {
    let scalar = prop_oneof![
        proptest::char::range('!', '~'),
        proptest::char::range('à', 'ü'),
    ];
    (scalar.clone(), scalar).prop_map(|(a, b)| {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Expr::CharRange {
            start: lo as u32,
            end: hi as u32,
        }
    })
}

fn leaf_strategy() -> impl Strategy<Value = Expr> {
    prop_oneof![
        terminal_strategy().prop_map(Expr::Terminal),
        char_range_strategy(),
        ident_strategy().prop_map(|name| Expr::NonTerminal {
            name,
            args: Vec::new()
        }),
    ]
}

/// Children allowed inside `{…}` repetition without tripping the
/// context-action lookahead (`{ident(` must not appear).
fn brace_safe_strategy(expr: BoxedStrategy<Expr>) -> BoxedStrategy<Expr> {
    prop_oneof![
        terminal_strategy().prop_map(Expr::Terminal),
        char_range_strategy(),
        expr.prop_map(|inner| Expr::Group(Box::new(inner))),
    ]
    .boxed()
}

/// Sequence members: anything but a bare `Optional` (a `[` directly after
/// a non-terminal would re-parse as an argument list) and nested
/// sequences/alternatives (those need explicit grouping anyway).
fn sequence_member_strategy(expr: BoxedStrategy<Expr>) -> BoxedStrategy<Expr> {
    prop_oneof![
        leaf_strategy(),
        expr.clone().prop_map(|inner| Expr::Group(Box::new(inner))),
        brace_safe_strategy(expr.clone()).prop_map(|inner| Expr::OneOrMore(Box::new(inner))),
        brace_safe_strategy(expr).prop_map(|inner| Expr::ZeroOrMore(Box::new(inner))),
    ]
    .boxed()
}

fn expr_strategy() -> BoxedStrategy<Expr> {
    leaf_strategy()
        .boxed()
        .prop_recursive(3, 24, 4, |inner| {
            let sequence = proptest::collection::vec(sequence_member_strategy(inner.clone()), 2..4)
                .prop_map(Expr::Sequence);
            let choice_member = prop_oneof![
                sequence_member_strategy(inner.clone()),
                proptest::collection::vec(sequence_member_strategy(inner.clone()), 2..4)
                    .prop_map(Expr::Sequence),
            ];
            prop_oneof![
                inner.clone().prop_map(|e| Expr::Group(Box::new(e))),
                inner.clone().prop_map(|e| Expr::Optional(Box::new(e))),
                brace_safe_strategy(inner.clone()).prop_map(|e| Expr::ZeroOrMore(Box::new(e))),
                brace_safe_strategy(inner).prop_map(|e| Expr::OneOrMore(Box::new(e))),
                sequence,
                proptest::collection::vec(choice_member, 2..4).prop_map(Expr::Alternative),
            ]
        })
        .boxed()
}

fn grammar_strategy() -> impl Strategy<Value = Grammar> {
    proptest::collection::vec(expr_strategy(), 1..4).prop_map(|bodies| {
        let mut grammar = Grammar::new();
        for (i, body) in bodies.into_iter().enumerate() {
            grammar.add_rule(Rule {
                name: format!("rule_{}", i),
                parameters: Vec::new(),
                body,
            });
        }
        grammar.determine_start_symbol();
        grammar
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn printed_grammars_reparse_to_the_same_ir(grammar in grammar_strategy()) {
        let back = reparse(&grammar);
        prop_assert_eq!(&grammar, &back, "printed form:\n{}", &grammar);
    }
}

#[test]
fn display_of_typed_parameters_is_reparseable() {
    let rule = Rule {
        name: "r".into(),
        parameters: vec![
            Parameter {
                name: "depth".into(),
                ty: ParameterType::Integer,
            },
            Parameter {
                name: "mode".into(),
                ty: ParameterType::Enum(vec!["fast".into(), "slow".into()]),
            },
        ],
        body: Expr::Terminal("x".into()),
    };
    let mut grammar = Grammar::new();
    grammar.add_rule(rule);
    grammar.determine_start_symbol();
    assert_eq!(reparse(&grammar), grammar);
}
