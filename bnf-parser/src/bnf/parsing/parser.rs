//! The recursive-descent grammar parser.

use super::ParseError;
use crate::bnf::grammar::{
    ContextActionKind, Expr, Grammar, Parameter, ParameterType, Rule,
};
use crate::bnf::lexing::{Token, TokenKind};
use crate::bnf::unicode::{scalar_count, utf8_to_codepoint};

/// Token kinds that end a sequence: the caller (or the rule terminator)
/// owns whatever follows.
const SEQUENCE_STOP: [TokenKind; 7] = [
    TokenKind::Alternative,
    TokenKind::RParen,
    TokenKind::RBracket,
    TokenKind::RBrace,
    TokenKind::Newline,
    TokenKind::Semicolon,
    TokenKind::Eof,
];

pub struct GrammarParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl GrammarParser {
    /// Comments are stripped up front; the parser treats them as
    /// whitespace wherever they occur.
    pub fn new(tokens: Vec<Token>) -> Self {
        let mut tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|t| t.kind != TokenKind::Comment)
            .collect();
        // The lexer always terminates the stream; cover callers that
        // hand-build token lists.
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            tokens.push(Token {
                kind: TokenKind::Eof,
                value: String::new(),
                line: 1,
                column: 1,
            });
        }
        Self { tokens, pos: 0 }
    }

    pub fn parse(mut self) -> Result<Grammar, ParseError> {
        let mut grammar = Grammar::new();
        self.skip_rule_separators();
        while !self.at_end() {
            grammar.add_rule(self.parse_rule()?);
            self.skip_rule_separators();
        }
        grammar.determine_start_symbol();
        Ok(grammar)
    }

    fn parse_rule(&mut self) -> Result<Rule, ParseError> {
        if !self.check(TokenKind::Identifier) {
            return Err(self.error("Expected rule name (identifier)"));
        }
        let name = self.advance().value;

        let parameters = if self.check(TokenKind::LBracket) {
            self.parse_rule_parameters()?
        } else {
            Vec::new()
        };

        if !self.match_kind(TokenKind::Define) {
            return Err(self.error("Expected '::=' after rule name"));
        }

        let body = self.parse_expression()?;
        Ok(Rule {
            name,
            parameters,
            body,
        })
    }

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_alternative()
    }

    fn parse_alternative(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_sequence()?;
        if !self.check(TokenKind::Alternative) {
            return Ok(first);
        }
        let mut choices = vec![first];
        while self.match_kind(TokenKind::Alternative) {
            choices.push(self.parse_sequence()?);
        }
        Ok(Expr::Alternative(choices))
    }

    fn parse_sequence(&mut self) -> Result<Expr, ParseError> {
        let mut elements = vec![self.parse_factor()?];
        while !SEQUENCE_STOP.contains(&self.peek_kind()) {
            elements.push(self.parse_factor()?);
        }
        // Single elements stay bare; Sequence always has >= 2 children.
        if elements.len() == 1 {
            if let Some(single) = elements.pop() {
                return Ok(single);
            }
        }
        Ok(Expr::Sequence(elements))
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        let primary = self.parse_primary()?;
        if self.match_kind(TokenKind::Plus) {
            Ok(Expr::OneOrMore(Box::new(primary)))
        } else if self.match_kind(TokenKind::Star) {
            Ok(Expr::ZeroOrMore(Box::new(primary)))
        } else if self.match_kind(TokenKind::Question) {
            Ok(Expr::Optional(Box::new(primary)))
        } else {
            Ok(primary)
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek_kind() {
            TokenKind::Identifier => self.parse_non_terminal(),
            TokenKind::Terminal => self.parse_terminal_or_range(),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                if !self.match_kind(TokenKind::RParen) {
                    return Err(self.error("Expected ')' after grouped expression"));
                }
                Ok(Expr::Group(Box::new(inner)))
            }
            TokenKind::LBracket => {
                self.advance();
                let inner = self.parse_expression()?;
                if !self.match_kind(TokenKind::RBracket) {
                    return Err(self.error("Expected ']' after optional expression"));
                }
                Ok(Expr::Optional(Box::new(inner)))
            }
            TokenKind::LBrace => {
                // `{ident(` opens a context action; any other `{…}` is a
                // zero-or-more repetition. Two tokens of lookahead decide.
                if self.peek_kind_at(1) == TokenKind::Identifier
                    && self.peek_kind_at(2) == TokenKind::LParen
                {
                    return self.parse_context_action();
                }
                self.advance();
                let inner = self.parse_expression()?;
                if !self.match_kind(TokenKind::RBrace) {
                    return Err(self.error("Expected '}' after repetition expression"));
                }
                Ok(Expr::ZeroOrMore(Box::new(inner)))
            }
            _ => Err(self.error(&format!(
                "Expected identifier, terminal, or grouped expression, found {}",
                self.peek_kind().describe()
            ))),
        }
    }

    fn parse_non_terminal(&mut self) -> Result<Expr, ParseError> {
        let name = self.advance().value;
        let args = if self.check(TokenKind::LBracket) {
            self.parse_value_list()?
        } else {
            Vec::new()
        };
        Ok(Expr::NonTerminal { name, args })
    }

    fn parse_terminal_or_range(&mut self) -> Result<Expr, ParseError> {
        let first = self.advance();
        if !self.match_kind(TokenKind::DotDot) {
            return Ok(Expr::Terminal(first.value));
        }
        if !self.check(TokenKind::Terminal) {
            return Err(self.error("Expected terminal after '..' in character range"));
        }
        let second = self.advance();
        if scalar_count(&first.value) != 1 || scalar_count(&second.value) != 1 {
            return Err(Self::error_at(
                &first,
                "Character ranges must be single characters",
            ));
        }
        let start = utf8_to_codepoint(&first.value);
        let end = utf8_to_codepoint(&second.value);
        if start > end {
            return Err(Self::error_at(
                &first,
                "Invalid character range: start is greater than end",
            ));
        }
        Ok(Expr::CharRange { start, end })
    }

    fn parse_rule_parameters(&mut self) -> Result<Vec<Parameter>, ParseError> {
        self.expect(TokenKind::LBracket, "to start parameter list")?;
        let mut parameters = Vec::new();
        if !self.check(TokenKind::RBracket) {
            parameters.push(self.parse_parameter()?);
            while self.match_kind(TokenKind::Comma) {
                parameters.push(self.parse_parameter()?);
            }
        }
        self.expect(TokenKind::RBracket, "to end parameter list")?;
        Ok(parameters)
    }

    fn parse_parameter(&mut self) -> Result<Parameter, ParseError> {
        if !self.check(TokenKind::Identifier) {
            return Err(self.error("Expected parameter name"));
        }
        let name = self.advance().value;
        let ty = if self.match_kind(TokenKind::Colon) {
            self.parse_parameter_type()?
        } else {
            ParameterType::Str
        };
        Ok(Parameter { name, ty })
    }

    fn parse_parameter_type(&mut self) -> Result<ParameterType, ParseError> {
        if !self.check(TokenKind::Identifier) {
            return Err(self.error("Expected parameter type"));
        }
        let type_name = self.advance().value;
        match type_name.as_str() {
            "int" | "integer" => Ok(ParameterType::Integer),
            "string" | "str" => Ok(ParameterType::Str),
            "bool" | "boolean" => Ok(ParameterType::Boolean),
            "enum" => Ok(ParameterType::Enum(self.parse_enum_values()?)),
            other => Err(self.error(&format!("Unknown parameter type: {}", other))),
        }
    }

    fn parse_enum_values(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect(TokenKind::LBrace, "to start enum values")?;
        let mut values = Vec::new();
        if !self.check(TokenKind::RBrace) {
            if !self.check(TokenKind::Identifier) {
                return Err(self.error("Expected enum value"));
            }
            values.push(self.advance().value);
            while self.match_kind(TokenKind::Comma) {
                if !self.check(TokenKind::Identifier) {
                    return Err(self.error("Expected enum value after ','"));
                }
                values.push(self.advance().value);
            }
        }
        self.expect(TokenKind::RBrace, "to end enum values")?;
        Ok(values)
    }

    fn parse_value_list(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect(TokenKind::LBracket, "to start argument list")?;
        let mut values = Vec::new();
        if !self.check(TokenKind::RBracket) {
            if !self.check(TokenKind::Identifier) {
                return Err(self.error("Expected argument identifier"));
            }
            values.push(self.advance().value);
            while self.match_kind(TokenKind::Comma) {
                if !self.check(TokenKind::Identifier) {
                    return Err(self.error("Expected argument identifier after ','"));
                }
                values.push(self.advance().value);
            }
        }
        self.expect(TokenKind::RBracket, "to end argument list")?;
        Ok(values)
    }

    fn parse_context_action(&mut self) -> Result<Expr, ParseError> {
        self.expect(TokenKind::LBrace, "to start context action")?;
        let name_token = self.advance();
        let kind = ContextActionKind::from_keyword(&name_token.value).ok_or_else(|| {
            Self::error_at(
                &name_token,
                &format!("Unknown action type: {}", name_token.value),
            )
        })?;
        self.expect(TokenKind::LParen, "after action name")?;
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            if !self.check(TokenKind::Identifier) {
                return Err(self.error("Expected action argument"));
            }
            args.push(self.advance().value);
            while self.match_kind(TokenKind::Comma) {
                if !self.check(TokenKind::Identifier) {
                    return Err(self.error("Expected action argument after ','"));
                }
                args.push(self.advance().value);
            }
        }
        self.expect(TokenKind::RParen, "after action arguments")?;
        self.expect(TokenKind::RBrace, "to end context action")?;
        Ok(Expr::ContextAction { kind, args })
    }

    fn skip_rule_separators(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn peek_kind_at(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.peek_kind() == TokenKind::Eof
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        Err(self.error(&format!(
            "Expected {} {}, found {}",
            kind.describe(),
            context,
            self.peek_kind().describe()
        )))
    }

    fn error(&self, message: &str) -> ParseError {
        Self::error_at(self.peek(), message)
    }

    fn error_at(token: &Token, message: &str) -> ParseError {
        ParseError {
            message: message.to_string(),
            line: token.line,
            column: token.column,
        }
    }
}
