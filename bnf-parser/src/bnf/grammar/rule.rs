//! Production rules and rule parameters.

use super::expr::Expr;
use std::fmt;

/// Type of a rule parameter.
///
/// A parameter written without an annotation defaults to `Str`; in a rule
/// *definition* such a bare identifier can also act as a value pattern
/// (`noun[sing] ::= …`), which the validator and the emitter resolve
/// against the callee group's enum signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterType {
    Integer,
    Str,
    Boolean,
    /// Enumeration with its ordered member identifiers.
    Enum(Vec<String>),
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterType::Integer => write!(f, "int"),
            ParameterType::Str => write!(f, "string"),
            ParameterType::Boolean => write!(f, "bool"),
            ParameterType::Enum(values) => write!(f, "enum{{{}}}", values.join(",")),
        }
    }
}

/// A formal parameter (or value pattern) of a rule definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub ty: ParameterType,
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Bare names default to the string type when re-parsed, so `Str`
        // parameters print without an annotation and the round trip is
        // structure-preserving.
        match &self.ty {
            ParameterType::Str => write!(f, "{}", self.name),
            ty => write!(f, "{}:{}", self.name, ty),
        }
    }
}

/// A production rule: `name ::= body` or `name[params] ::= body`.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub body: Expr,
}

impl Rule {
    pub fn new(name: impl Into<String>, body: Expr) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            body,
        }
    }

    pub fn with_parameters(
        name: impl Into<String>,
        parameters: Vec<Parameter>,
        body: Expr,
    ) -> Self {
        Self {
            name: name.into(),
            parameters,
            body,
        }
    }

    pub fn has_parameters(&self) -> bool {
        !self.parameters.is_empty()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.parameters.is_empty() {
            let rendered: Vec<String> = self.parameters.iter().map(|p| p.to_string()).collect();
            write!(f, "[{}]", rendered.join(", "))?;
        }
        write!(f, " ::= {}", self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_plain_rule() {
        let rule = Rule::new("greeting", Expr::Terminal("hello".into()));
        assert_eq!(rule.to_string(), "greeting ::= 'hello'");
    }

    #[test]
    fn test_display_parameterized_rule() {
        let rule = Rule::with_parameters(
            "agreement",
            vec![Parameter {
                name: "N".into(),
                ty: ParameterType::Enum(vec!["sing".into(), "plur".into()]),
            }],
            Expr::Sequence(vec![
                Expr::NonTerminal {
                    name: "noun".into(),
                    args: vec!["N".into()],
                },
                Expr::NonTerminal {
                    name: "verb".into(),
                    args: vec!["N".into()],
                },
            ]),
        );
        assert_eq!(
            rule.to_string(),
            "agreement[N:enum{sing,plur}] ::= noun[N] verb[N]"
        );
    }

    #[test]
    fn test_display_parameter_types() {
        let int_p = Parameter {
            name: "depth".into(),
            ty: ParameterType::Integer,
        };
        assert_eq!(int_p.to_string(), "depth:int");
        let bool_p = Parameter {
            name: "strict".into(),
            ty: ParameterType::Boolean,
        };
        assert_eq!(bool_p.to_string(), "strict:bool");
        // Untyped / string parameters print bare.
        let str_p = Parameter {
            name: "sing".into(),
            ty: ParameterType::Str,
        };
        assert_eq!(str_p.to_string(), "sing");
    }

    #[test]
    fn test_has_parameters() {
        let rule = Rule::new("s", Expr::Terminal("a".into()));
        assert!(!rule.has_parameters());
    }
}
