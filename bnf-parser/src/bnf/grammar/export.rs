//! Grammar export to neighbouring notations.
//!
//! These serializers target external consumers (documentation, other
//! tools); for the toolchain's own round-trippable form use the `Display`
//! impls on [`Grammar`] and friends.

use super::{Expr, Grammar};

/// Render the grammar in ISO-style EBNF: `name = body ;` lines.
pub fn export_ebnf(grammar: &Grammar) -> String {
    let mut out = String::from("# EBNF Grammar Export\n\n");
    for rule in &grammar.rules {
        out.push_str(&format!("{} = {} ;\n", rule.name, rule.body));
    }
    out
}

/// Render the grammar in classic BNF with angle-bracketed non-terminals.
pub fn export_bnf(grammar: &Grammar) -> String {
    let mut out = String::from("# BNF Grammar Export\n\n");
    for rule in &grammar.rules {
        out.push_str(&format!("<{}> ::= {}\n", rule.name, bnf_body(&rule.body)));
    }
    out
}

fn bnf_body(expr: &Expr) -> String {
    match expr {
        Expr::NonTerminal { name, args } if args.is_empty() => format!("<{}>", name),
        Expr::Alternative(children) => children
            .iter()
            .map(bnf_body)
            .collect::<Vec<_>>()
            .join(" | "),
        Expr::Sequence(children) => children
            .iter()
            .map(bnf_body)
            .collect::<Vec<_>>()
            .join(" "),
        Expr::Group(child) => format!("({})", bnf_body(child)),
        Expr::Optional(child) => format!("[{}]", bnf_body(child)),
        Expr::ZeroOrMore(child) => format!("{{{}}}", bnf_body(child)),
        Expr::OneOrMore(child) => format!("{}+", bnf_body(child)),
        // Terminals, ranges, parameterized references, and context actions
        // have no classic-BNF form; keep the native rendering.
        other => other.to_string(),
    }
}
