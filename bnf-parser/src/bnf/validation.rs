//! Grammar validator.
//!
//! Three analyses over a built grammar — reference integrity,
//! reachability, productivity — plus the structural checks that the
//! parser cannot make locally (duplicate definitions, empty terminals,
//! argument/parameter consistency). All findings are batched into a
//! [`ValidationReport`]; errors are fatal to the pipeline, warnings are
//! reported and execution continues.
//!
//! This module also resolves *group signatures*: several rules may share
//! one name as specializations (`noun[sing]`, `noun[plur]`), and both the
//! argument checks here and the code emitter need to know the group's
//! formal parameter types and each clause's value guards.

use crate::bnf::grammar::{Expr, Grammar, ParameterType, Rule};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Result of validating a grammar. `errors` make the grammar unusable;
/// `warnings` do not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "Error: {}", error)?;
        }
        for warning in &self.warnings {
            writeln!(f, "Warning: {}", warning)?;
        }
        Ok(())
    }
}

/// Resolved type of a formal parameter position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedType {
    Integer,
    Str,
    Boolean,
    /// `key` is the identifier the enum type is named after in generated
    /// code: the declaring parameter's name, or a synthesized
    /// `<rule><position>` key when no declaration exists.
    Enum { key: String, values: Vec<String> },
}

/// Resolved formal parameter of a rule-name group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedParam {
    pub name: String,
    pub ty: ResolvedType,
}

/// Formal signature shared by all rules of one name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSignature {
    pub name: String,
    pub params: Vec<ResolvedParam>,
    pub clause_count: usize,
}

impl GroupSignature {
    /// Per-position guards for one clause of the group: `None` binds the
    /// incoming argument to the clause's formal, `Some(value)` requires
    /// the argument to equal an enum value.
    pub fn clause_guards(&self, rule: &Rule) -> Vec<Option<String>> {
        rule.parameters
            .iter()
            .map(|param| {
                if self.clause_count > 1 && param.ty == ParameterType::Str {
                    Some(param.name.clone())
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Resolve the formal signature of every rule-name group.
///
/// Fails with the list of inconsistencies found (conflicting arities or
/// parameter types across specializations).
pub fn group_signatures(grammar: &Grammar) -> Result<HashMap<String, GroupSignature>, Vec<String>> {
    let mut errors = Vec::new();
    let mut signatures = HashMap::new();

    for name in grammar.non_terminal_names() {
        let clauses: Vec<&Rule> = grammar.rules_named(name).collect();
        let arity = clauses[0].parameters.len();
        if clauses.iter().any(|r| r.parameters.len() != arity) {
            errors.push(format!(
                "Conflicting parameter counts for rule: {}",
                name
            ));
            continue;
        }

        let mut params = Vec::new();
        let mut position_error = false;
        for i in 0..arity {
            match resolve_position(grammar, name, &clauses, i) {
                Ok(param) => params.push(param),
                Err(message) => {
                    errors.push(message);
                    position_error = true;
                }
            }
        }
        if position_error {
            continue;
        }
        signatures.insert(
            name.to_string(),
            GroupSignature {
                name: name.to_string(),
                params,
                clause_count: clauses.len(),
            },
        );
    }

    if errors.is_empty() {
        Ok(signatures)
    } else {
        Err(errors)
    }
}

fn resolve_position(
    grammar: &Grammar,
    name: &str,
    clauses: &[&Rule],
    position: usize,
) -> Result<ResolvedParam, String> {
    // A single clause declares its formals directly; untyped means string.
    if clauses.len() == 1 {
        let param = &clauses[0].parameters[position];
        return Ok(ResolvedParam {
            name: param.name.clone(),
            ty: resolved_from_declared(&param.name, &param.ty),
        });
    }

    // Multiple clauses: explicit non-string annotations fix the type.
    let mut declared: Option<(String, ResolvedType)> = None;
    for clause in clauses {
        let param = &clause.parameters[position];
        if param.ty == ParameterType::Str {
            continue;
        }
        let ty = resolved_from_declared(&param.name, &param.ty);
        match &declared {
            None => declared = Some((param.name.clone(), ty)),
            Some((_, existing)) if *existing == ty => {}
            Some(_) => {
                return Err(format!(
                    "Conflicting parameter types for rule: {}",
                    name
                ))
            }
        }
    }
    if let Some((param_name, ty)) = declared {
        return Ok(ResolvedParam {
            name: param_name,
            ty,
        });
    }

    // Pure pattern position: borrow the enum type from a call site that
    // passes a declared enum formal, if one exists.
    for rule in &grammar.rules {
        for (callee, args) in rule.body.references() {
            if callee != name || args.len() <= position {
                continue;
            }
            let arg = &args[position];
            if let Some(formal) = rule.parameters.iter().find(|p| p.name == *arg) {
                if let ParameterType::Enum(values) = &formal.ty {
                    return Ok(ResolvedParam {
                        name: formal.name.clone(),
                        ty: ResolvedType::Enum {
                            key: formal.name.clone(),
                            values: values.clone(),
                        },
                    });
                }
            }
        }
    }

    // No declaration anywhere: synthesize an enum from the patterns.
    let mut values = Vec::new();
    for clause in clauses {
        let pattern = &clause.parameters[position].name;
        if !values.contains(pattern) {
            values.push(pattern.clone());
        }
    }
    let key = format!("{}{}", name, position);
    Ok(ResolvedParam {
        name: format!("p{}", position),
        ty: ResolvedType::Enum { key, values },
    })
}

fn resolved_from_declared(name: &str, ty: &ParameterType) -> ResolvedType {
    match ty {
        ParameterType::Integer => ResolvedType::Integer,
        ParameterType::Str => ResolvedType::Str,
        ParameterType::Boolean => ResolvedType::Boolean,
        ParameterType::Enum(values) => ResolvedType::Enum {
            key: name.to_string(),
            values: values.clone(),
        },
    }
}

/// Run all analyses over the grammar.
pub fn validate(grammar: &Grammar) -> ValidationReport {
    let mut report = ValidationReport::default();

    if grammar.rules.is_empty() {
        report.errors.push("Grammar is empty".to_string());
        return report;
    }

    check_duplicates(grammar, &mut report);
    check_bodies(grammar, &mut report);
    check_parameters(grammar, &mut report);

    let defined: HashSet<&str> = grammar.rules.iter().map(|r| r.name.as_str()).collect();
    if !defined.contains(grammar.start_symbol.as_str()) {
        report.errors.push(format!(
            "Start symbol is not defined: {}",
            grammar.start_symbol
        ));
    }

    check_references(grammar, &defined, &mut report);
    check_reachability(grammar, &mut report);
    check_productivity(grammar, &mut report);

    report
}

fn check_duplicates(grammar: &Grammar, report: &mut ValidationReport) {
    for (i, rule) in grammar.rules.iter().enumerate() {
        let duplicate = grammar.rules[..i]
            .iter()
            .any(|r| r.name == rule.name && r.parameters == rule.parameters);
        if duplicate {
            report
                .errors
                .push(format!("Duplicate definition of rule: {}", rule.name));
        }
    }
}

fn check_bodies(grammar: &Grammar, report: &mut ValidationReport) {
    for rule in &grammar.rules {
        walk_body(&rule.body, &mut |expr| match expr {
            Expr::Terminal(value) if value.is_empty() => {
                report
                    .errors
                    .push(format!("Empty terminal in rule: {}", rule.name));
            }
            Expr::CharRange { start, end } => {
                let bad = *start > *end
                    || *end > 0x10FFFF
                    || (0xD800..=0xDFFF).contains(start)
                    || (0xD800..=0xDFFF).contains(end);
                if bad {
                    report
                        .errors
                        .push(format!("Invalid character range in rule: {}", rule.name));
                }
            }
            _ => {}
        });
    }
}

fn check_parameters(grammar: &Grammar, report: &mut ValidationReport) {
    // Enum member lists must not repeat values.
    for rule in &grammar.rules {
        for param in &rule.parameters {
            if let ParameterType::Enum(values) = &param.ty {
                let mut seen = HashSet::new();
                for value in values {
                    if !seen.insert(value.as_str()) {
                        report.errors.push(format!(
                            "Duplicate enum value '{}' in parameter '{}' of rule: {}",
                            value, param.name, rule.name
                        ));
                    }
                }
            }
        }
    }

    let signatures = match group_signatures(grammar) {
        Ok(signatures) => signatures,
        Err(errors) => {
            report.errors.extend(errors);
            return;
        }
    };

    // Clause patterns must name enum members of the resolved signature.
    for rule in &grammar.rules {
        if let Some(signature) = signatures.get(&rule.name) {
            for (position, guard) in signature.clause_guards(rule).iter().enumerate() {
                if let Some(pattern) = guard {
                    let ok = matches!(
                        &signature.params[position].ty,
                        ResolvedType::Enum { values, .. } if values.contains(pattern)
                    );
                    if !ok {
                        report.errors.push(format!(
                            "Parameter pattern '{}' of rule '{}' is not an enumeration value",
                            pattern, rule.name
                        ));
                    }
                }
            }
        }
    }

    // Call-site arguments: arity, and formal-or-enum-member resolution.
    for rule in &grammar.rules {
        for (callee, args) in rule.body.references() {
            let Some(signature) = signatures.get(callee) else {
                continue; // undefined reference, reported separately
            };
            if args.len() != signature.params.len() {
                report.errors.push(format!(
                    "Wrong number of arguments for '{}' in rule '{}': expected {}, found {}",
                    callee,
                    rule.name,
                    signature.params.len(),
                    args.len()
                ));
                continue;
            }
            for (position, arg) in args.iter().enumerate() {
                if rule.parameters.iter().any(|p| p.name == *arg) {
                    continue; // bound to an enclosing formal
                }
                let is_member = matches!(
                    &signature.params[position].ty,
                    ResolvedType::Enum { values, .. } if values.contains(arg)
                );
                if !is_member {
                    report.errors.push(format!(
                        "Argument '{}' of call to '{}' in rule '{}' is neither a parameter nor an enumeration value",
                        arg, callee, rule.name
                    ));
                }
            }
        }
    }
}

fn check_references(grammar: &Grammar, defined: &HashSet<&str>, report: &mut ValidationReport) {
    let mut reported = HashSet::new();
    for rule in &grammar.rules {
        for (name, _) in rule.body.references() {
            if !defined.contains(name) && reported.insert(name.to_string()) {
                report
                    .errors
                    .push(format!("Undefined non-terminal: {}", name));
            }
        }
    }
}

fn check_reachability(grammar: &Grammar, report: &mut ValidationReport) {
    let mut reachable: HashSet<&str> = HashSet::new();
    let mut work = vec![grammar.start_symbol.as_str()];
    while let Some(current) = work.pop() {
        if !reachable.insert(current) {
            continue;
        }
        for rule in grammar.rules_named(current) {
            for (name, _) in rule.body.references() {
                if !reachable.contains(name) {
                    work.push(name);
                }
            }
        }
    }
    for name in grammar.non_terminal_names() {
        if !reachable.contains(name) {
            report
                .warnings
                .push(format!("Unreachable non-terminal: {}", name));
        }
    }
}

fn check_productivity(grammar: &Grammar, report: &mut ValidationReport) {
    let mut productive: HashSet<&str> = HashSet::new();
    let mut changed = true;
    while changed {
        changed = false;
        for rule in &grammar.rules {
            if !productive.contains(rule.name.as_str())
                && is_productive(&rule.body, &productive)
            {
                productive.insert(rule.name.as_str());
                changed = true;
            }
        }
    }
    for name in grammar.non_terminal_names() {
        if !productive.contains(name) {
            report
                .errors
                .push(format!("Non-productive non-terminal: {}", name));
        }
    }
}

/// Whether an expression can derive at least one terminal string, given
/// the set of rule names already known productive.
fn is_productive(expr: &Expr, productive: &HashSet<&str>) -> bool {
    match expr {
        Expr::Terminal(_) | Expr::CharRange { .. } => true,
        Expr::NonTerminal { name, .. } => productive.contains(name.as_str()),
        Expr::Alternative(children) => children.iter().any(|c| is_productive(c, productive)),
        Expr::Sequence(children) => children.iter().all(|c| is_productive(c, productive)),
        Expr::Group(child) | Expr::OneOrMore(child) => is_productive(child, productive),
        // These can match the empty string, so they always produce.
        Expr::Optional(_) | Expr::ZeroOrMore(_) | Expr::ContextAction { .. } => true,
    }
}

fn walk_body(expr: &Expr, visit: &mut dyn FnMut(&Expr)) {
    visit(expr);
    match expr {
        Expr::Alternative(children) | Expr::Sequence(children) => {
            for child in children {
                walk_body(child, visit);
            }
        }
        Expr::Group(child)
        | Expr::Optional(child)
        | Expr::ZeroOrMore(child)
        | Expr::OneOrMore(child) => walk_body(child, visit),
        Expr::Terminal(_) | Expr::NonTerminal { .. } | Expr::CharRange { .. }
        | Expr::ContextAction { .. } => {}
    }
}
