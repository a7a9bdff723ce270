//! Grammar intermediate representation.
//!
//! Pure data: a [`Grammar`] owns an ordered list of [`Rule`]s, each rule
//! owns its right-hand-side [`Expr`] tree, and non-terminal references are
//! by name, resolved through the grammar's rule table. The IR carries no
//! behaviour beyond construction helpers, introspection, and pretty
//! printing; the parser builds it once and no later stage mutates it.

pub mod expr;
pub mod export;
pub mod rule;

pub use expr::{quote_terminal, ContextActionKind, Expr};
pub use rule::{Parameter, ParameterType, Rule};

use std::fmt;

/// Rule names checked first by the start-symbol heuristic, in priority
/// order.
const START_NAME_PRIORITY: [&str; 5] = ["json", "program", "start", "grammar", "root"];

/// A complete grammar: ordered production rules plus a start symbol.
///
/// Several rules may share one name when they are specializations of a
/// parameterized rule (e.g. `noun[sing]` and `noun[plur]`); consumers that
/// need the whole group use [`Grammar::rules_named`], while
/// [`Grammar::find_rule`] resolves to the first definition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Grammar {
    pub rules: Vec<Rule>,
    pub start_symbol: String,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// First rule with the given name, if any.
    pub fn find_rule(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// All rules sharing the given name, in declaration order.
    pub fn rules_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Rule> {
        self.rules.iter().filter(move |r| r.name == name)
    }

    /// Defined rule names, deduplicated, in first-declaration order.
    pub fn non_terminal_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for rule in &self.rules {
            if !names.contains(&rule.name.as_str()) {
                names.push(&rule.name);
            }
        }
        names
    }

    /// Every terminal literal occurring in the grammar, in syntax order.
    pub fn terminal_values(&self) -> Vec<&str> {
        let mut values = Vec::new();
        for rule in &self.rules {
            rule.body.collect_terminals(&mut values);
        }
        values
    }

    /// Names of rules that take parameters (or are specializations), in
    /// first-declaration order.
    pub fn parameterized_rule_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for rule in &self.rules {
            if !rule.parameters.is_empty() && !names.contains(&rule.name.as_str()) {
                names.push(&rule.name);
            }
        }
        names
    }

    /// True when the grammar uses any context-sensitive extension: rule
    /// parameters or context actions.
    pub fn is_context_sensitive(&self) -> bool {
        self.rules
            .iter()
            .any(|r| !r.parameters.is_empty() || r.body.contains_context_action())
    }

    /// Choose the start symbol once all rules are present.
    ///
    /// 1. A rule named `json`, `program`, `start`, `grammar`, or `root`
    ///    wins, in that priority order.
    /// 2. Otherwise the first rule whose right-hand side references a
    ///    non-terminal.
    /// 3. Otherwise the first rule.
    pub fn determine_start_symbol(&mut self) {
        for candidate in START_NAME_PRIORITY {
            if self.rules.iter().any(|r| r.name == candidate) {
                self.start_symbol = candidate.to_string();
                return;
            }
        }
        for rule in &self.rules {
            if !rule.body.references().is_empty() {
                self.start_symbol = rule.name.clone();
                return;
            }
        }
        if let Some(first) = self.rules.first() {
            self.start_symbol = first.name.clone();
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Grammar (start: {})", self.start_symbol)?;
        for rule in &self.rules {
            writeln!(f, "{}", rule)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str, body: Expr) -> Rule {
        Rule {
            name: name.to_string(),
            parameters: Vec::new(),
            body,
        }
    }

    #[test]
    fn test_start_symbol_priority_names() {
        let mut g = Grammar::new();
        g.add_rule(rule("value", Expr::Terminal("x".into())));
        g.add_rule(rule("program", Expr::Terminal("y".into())));
        g.add_rule(rule("json", Expr::Terminal("z".into())));
        g.determine_start_symbol();
        // `json` outranks `program` regardless of declaration order.
        assert_eq!(g.start_symbol, "json");
    }

    #[test]
    fn test_start_symbol_first_referencing_rule() {
        let mut g = Grammar::new();
        g.add_rule(rule("digit", Expr::CharRange { start: 0x30, end: 0x39 }));
        g.add_rule(rule(
            "number",
            Expr::OneOrMore(Box::new(Expr::NonTerminal {
                name: "digit".into(),
                args: Vec::new(),
            })),
        ));
        g.determine_start_symbol();
        assert_eq!(g.start_symbol, "number");
    }

    #[test]
    fn test_start_symbol_falls_back_to_first_rule() {
        let mut g = Grammar::new();
        g.add_rule(rule("a", Expr::Terminal("x".into())));
        g.add_rule(rule("b", Expr::Terminal("y".into())));
        g.determine_start_symbol();
        assert_eq!(g.start_symbol, "a");
    }

    #[test]
    fn test_find_rule_and_groups() {
        let mut g = Grammar::new();
        g.add_rule(Rule {
            name: "noun".into(),
            parameters: vec![Parameter {
                name: "sing".into(),
                ty: ParameterType::Str,
            }],
            body: Expr::Terminal("cat".into()),
        });
        g.add_rule(Rule {
            name: "noun".into(),
            parameters: vec![Parameter {
                name: "plur".into(),
                ty: ParameterType::Str,
            }],
            body: Expr::Terminal("cats".into()),
        });
        assert_eq!(
            g.find_rule("noun").unwrap().body,
            Expr::Terminal("cat".into())
        );
        assert_eq!(g.rules_named("noun").count(), 2);
        assert_eq!(g.non_terminal_names(), vec!["noun"]);
        assert!(g.find_rule("verb").is_none());
    }

    #[test]
    fn test_terminal_values() {
        let mut g = Grammar::new();
        g.add_rule(rule(
            "s",
            Expr::Sequence(vec![
                Expr::Terminal("a".into()),
                Expr::Terminal("b".into()),
            ]),
        ));
        assert_eq!(g.terminal_values(), vec!["a", "b"]);
    }

    #[test]
    fn test_is_context_sensitive() {
        let mut plain = Grammar::new();
        plain.add_rule(rule("s", Expr::Terminal("a".into())));
        assert!(!plain.is_context_sensitive());

        let mut with_action = Grammar::new();
        with_action.add_rule(rule(
            "s",
            Expr::Sequence(vec![
                Expr::Terminal("a".into()),
                Expr::ContextAction {
                    kind: ContextActionKind::Lookup,
                    args: vec!["a".into()],
                },
            ]),
        ));
        assert!(with_action.is_context_sensitive());
    }

    #[test]
    fn test_display_lists_rules_with_start_header() {
        let mut g = Grammar::new();
        g.add_rule(rule("s", Expr::Terminal("a".into())));
        g.determine_start_symbol();
        let text = g.to_string();
        assert!(text.starts_with("# Grammar (start: s)\n"));
        assert!(text.contains("s ::= 'a'"));
    }
}
