//! C++ backend: emits a standalone recursive-descent parser.
//!
//! The generated translation unit contains an `ASTNode` hierarchy, one
//! node class and one `parse_<rule>` member function per rule name, enum
//! types for enum-typed rule parameters, and a parser class holding the
//! byte cursor, the farthest-failure error state, and the context storage
//! used by `{store(…)}`/`{lookup(…)}` actions. Matching is ordered-choice
//! with save/restore backtracking on the cursor; repetition loops guard
//! against non-advancing iterations, so a nullable body can never spin.
//!
//! Specialized rules sharing a name (`noun[sing]`, `noun[plur]`) become a
//! single function that dispatches on the parameter value at run time;
//! no per-value specialization is generated.

use super::naming::{pascal_case, sanitize_identifier, snake_case};
use super::{CodeGenerator, EmitError, GeneratedCode, GeneratorOptions};
use crate::bnf::grammar::{quote_terminal, ContextActionKind, Expr, Grammar, Rule};
use crate::bnf::validation::{group_signatures, GroupSignature, ResolvedType};
use std::collections::{HashMap, HashSet};

/// Indented source writer for the generated code.
struct Writer {
    out: String,
    indent: usize,
    unit: String,
}

impl Writer {
    fn new(unit: &str) -> Self {
        Self {
            out: String::new(),
            indent: 0,
            unit: unit.to_string(),
        }
    }

    fn line(&mut self, text: &str) {
        if text.is_empty() {
            self.out.push('\n');
            return;
        }
        for _ in 0..self.indent {
            self.out.push_str(&self.unit);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// Access-specifier labels sit one level left of the class body.
    fn label(&mut self, text: &str) {
        let saved = self.indent;
        self.indent = saved.saturating_sub(1);
        self.line(text);
        self.indent = saved;
    }

    fn open(&mut self, text: &str) {
        self.line(text);
        self.indent += 1;
    }

    fn branch_else(&mut self, text: &str) {
        let saved = self.indent;
        self.indent = saved.saturating_sub(1);
        self.line(text);
        self.indent = saved;
    }

    fn close(&mut self, text: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.line(text);
    }
}

/// An enum type emitted for enum-typed parameters.
struct EnumType {
    cpp_name: String,
    values: Vec<String>,
}

/// Per-grammar name assignments, collision-free and deterministic.
struct NameTables {
    fn_names: HashMap<String, String>,
    class_names: HashMap<String, String>,
    enum_types: Vec<EnumType>,
    enum_index: HashMap<String, usize>,
    /// Rules whose bodies reduce to terminals/ranges. A failed call to one
    /// reads better in error messages as the rule name than as its
    /// internal character expectations.
    token_like: HashMap<String, bool>,
}

impl NameTables {
    fn enum_cpp_name(&self, key: &str) -> Option<&str> {
        self.enum_index
            .get(key)
            .map(|&i| self.enum_types[i].cpp_name.as_str())
    }
}

fn build_tables(
    grammar: &Grammar,
    signatures: &HashMap<String, GroupSignature>,
) -> Result<NameTables, EmitError> {
    let mut fn_names = HashMap::new();
    let mut class_names = HashMap::new();
    let mut used_fns = HashSet::new();
    let mut used_classes = HashSet::new();

    for name in grammar.non_terminal_names() {
        let base = sanitize_identifier(name);
        let mut candidate = format!("parse_{}", base);
        let mut suffix = 2;
        while !used_fns.insert(candidate.clone()) {
            candidate = format!("parse_{}_{}", base, suffix);
            suffix += 1;
        }
        fn_names.insert(name.to_string(), candidate);

        let mut class_candidate = format!("{}Node", pascal_case(name));
        suffix = 2;
        while !used_classes.insert(class_candidate.clone()) {
            class_candidate = format!("{}{}Node", pascal_case(name), suffix);
            suffix += 1;
        }
        class_names.insert(name.to_string(), class_candidate);
    }

    let mut enum_types: Vec<EnumType> = Vec::new();
    let mut enum_index: HashMap<String, usize> = HashMap::new();
    let mut used_enum_names: HashSet<String> = HashSet::new();
    for name in grammar.non_terminal_names() {
        let Some(signature) = signatures.get(name) else {
            continue;
        };
        for param in &signature.params {
            let ResolvedType::Enum { key, values } = &param.ty else {
                continue;
            };
            if let Some(&existing) = enum_index.get(key) {
                if &enum_types[existing].values != values {
                    return Err(EmitError::new(format!(
                        "Conflicting enum parameter '{}': value sets differ",
                        key
                    )));
                }
                continue;
            }
            let mut cpp_name = format!("{}Enum", sanitize_identifier(key));
            let mut suffix = 2;
            while !used_enum_names.insert(cpp_name.clone()) {
                cpp_name = format!("{}Enum{}", sanitize_identifier(key), suffix);
                suffix += 1;
            }
            enum_index.insert(key.clone(), enum_types.len());
            enum_types.push(EnumType {
                cpp_name,
                values: values.clone(),
            });
        }
    }

    let mut token_like = HashMap::new();
    for name in grammar.non_terminal_names() {
        let mut visiting = HashSet::new();
        let like = grammar
            .rules_named(name)
            .all(|rule| is_token_expr(grammar, &rule.body, &mut visiting));
        token_like.insert(name.to_string(), like);
    }

    Ok(NameTables {
        fn_names,
        class_names,
        enum_types,
        enum_index,
        token_like,
    })
}

/// True when the expression derives only terminals and character ranges;
/// reference cycles disqualify.
fn is_token_expr(grammar: &Grammar, expr: &Expr, visiting: &mut HashSet<String>) -> bool {
    match expr {
        Expr::Terminal(_) | Expr::CharRange { .. } => true,
        Expr::Alternative(children) | Expr::Sequence(children) => children
            .iter()
            .all(|child| is_token_expr(grammar, child, visiting)),
        Expr::Group(child)
        | Expr::Optional(child)
        | Expr::ZeroOrMore(child)
        | Expr::OneOrMore(child) => is_token_expr(grammar, child, visiting),
        Expr::NonTerminal { name, .. } => {
            if !visiting.insert(name.clone()) {
                return false;
            }
            let mut clauses = grammar.rules_named(name).peekable();
            if clauses.peek().is_none() {
                return false;
            }
            let ok = clauses.all(|rule| is_token_expr(grammar, &rule.body, visiting));
            visiting.remove(name);
            ok
        }
        Expr::ContextAction { .. } => false,
    }
}

/// Escape text into a C++ double-quoted literal. Non-printable and
/// non-ASCII bytes use octal escapes, which cannot swallow a following
/// character the way hex escapes can.
fn cpp_quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for &b in text.as_bytes() {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7E => out.push(b as char),
            other => out.push_str(&format!("\\{:03o}", other)),
        }
    }
    out.push('"');
    out
}

fn cpp_param_type(ty: &ResolvedType, tables: &NameTables) -> Result<String, EmitError> {
    Ok(match ty {
        ResolvedType::Integer => "long".to_string(),
        ResolvedType::Str => "std::string".to_string(),
        ResolvedType::Boolean => "bool".to_string(),
        ResolvedType::Enum { key, .. } => tables
            .enum_cpp_name(key)
            .ok_or_else(|| EmitError::new(format!("Unresolved enum parameter '{}'", key)))?
            .to_string(),
    })
}

/// Context shared while emitting one clause body.
struct EmitCtx<'a> {
    signatures: &'a HashMap<String, GroupSignature>,
    tables: &'a NameTables,
    /// Clause parameter name -> generated function parameter name, for
    /// positions that bind (rather than guard on) the argument.
    bindings: HashMap<String, String>,
}

/// C++ code generator.
pub struct CppGenerator {
    var_counter: usize,
}

impl CppGenerator {
    pub fn new() -> Self {
        Self { var_counter: 0 }
    }

    fn fresh(&mut self, base: &str) -> String {
        let id = self.var_counter;
        self.var_counter += 1;
        format!("{}{}", base, id)
    }

    fn emit_header(&self, w: &mut Writer, options: &GeneratorOptions) {
        w.line(&format!(
            "// Generated by bnfgen {} -- recursive-descent parser {}.",
            env!("CARGO_PKG_VERSION"),
            options.parser_name
        ));
        w.line("// Derived from a BNF/EBNF grammar; edit the grammar, not this file.");
        w.line("");
        w.line("#include <cstdint>");
        w.line("#include <iostream>");
        w.line("#include <memory>");
        w.line("#include <sstream>");
        w.line("#include <string>");
        w.line("#include <unordered_map>");
        w.line("#include <vector>");
        w.line("");
    }

    fn emit_ast_classes(&self, w: &mut Writer, grammar: &Grammar, tables: &NameTables) {
        w.open("class ASTNode {");
        w.label("public:");
        w.line("virtual ~ASTNode() = default;");
        w.line("virtual std::string name() const = 0;");
        w.line("");
        w.open("void addChild(std::unique_ptr<ASTNode> child) {");
        w.line("children_.push_back(std::move(child));");
        w.close("}");
        w.line("");
        w.open("const std::vector<std::unique_ptr<ASTNode>>& children() const {");
        w.line("return children_;");
        w.close("}");
        w.line("");
        w.open("size_t childCount() const {");
        w.line("return children_.size();");
        w.close("}");
        w.line("");
        w.open("void truncateChildren(size_t count) {");
        w.open("while (children_.size() > count) {");
        w.line("children_.pop_back();");
        w.close("}");
        w.close("}");
        w.line("");
        w.open("void print(std::ostream& out, size_t depth = 0) const {");
        w.open("for (size_t i = 0; i < depth; ++i) {");
        w.line("out << \"  \";");
        w.close("}");
        w.line("out << name();");
        w.open("if (children_.empty() && !text.empty()) {");
        w.line("out << \": \\\"\" << text << \"\\\"\";");
        w.close("}");
        w.line("out << \"\\n\";");
        w.open("for (const auto& child : children_) {");
        w.line("child->print(out, depth + 1);");
        w.close("}");
        w.close("}");
        w.line("");
        w.line("std::string text;");
        w.line("size_t position = 0;");
        w.line("size_t line = 1;");
        w.line("size_t column = 1;");
        w.line("");
        w.label("private:");
        w.line("std::vector<std::unique_ptr<ASTNode>> children_;");
        w.close("};");
        w.line("");

        w.open("class TerminalNode : public ASTNode {");
        w.label("public:");
        w.line("std::string name() const override { return \"terminal\"; }");
        w.close("};");
        w.line("");

        for name in grammar.non_terminal_names() {
            let class_name = &tables.class_names[name];
            w.open(&format!("class {} : public ASTNode {{", class_name));
            w.label("public:");
            w.line(&format!(
                "std::string name() const override {{ return {}; }}",
                cpp_quoted(name)
            ));
            w.close("};");
            w.line("");
        }
    }

    fn emit_enums(&self, w: &mut Writer, tables: &NameTables) {
        for enum_type in &tables.enum_types {
            w.open(&format!("enum class {} {{", enum_type.cpp_name));
            for (i, value) in enum_type.values.iter().enumerate() {
                let comma = if i + 1 < enum_type.values.len() { "," } else { "" };
                w.line(&format!("{}{}", sanitize_identifier(value), comma));
            }
            w.close("};");
            w.line("");
        }
    }

    fn emit_helpers(&self, w: &mut Writer, options: &GeneratorOptions) {
        w.line(&format!(
            "static constexpr size_t kMaxRecursionDepth = {};",
            options.max_recursion_depth
        ));
        w.line("");
        w.line("std::string input_;");
        w.line("size_t pos_ = 0;");
        w.line("size_t depth_ = 0;");
        w.line("std::string error_;");
        w.line("std::vector<std::string> expected_;");
        w.line("size_t error_pos_ = 0;");
        w.line("size_t error_line_ = 1;");
        w.line("size_t error_column_ = 1;");
        w.line("std::unordered_map<std::string, std::string> context_storage_;");
        w.line("std::unordered_map<std::string, std::string> last_capture_;");
        w.line("");

        w.open("bool matchLiteral(const char* literal, size_t length) {");
        w.open("if (pos_ + length > input_.size()) {");
        w.line("return false;");
        w.close("}");
        w.open("if (input_.compare(pos_, length, literal, length) != 0) {");
        w.line("return false;");
        w.close("}");
        w.line("pos_ += length;");
        w.line("return true;");
        w.close("}");
        w.line("");

        w.open("uint32_t decodeScalar(size_t pos, size_t& length) const {");
        w.open("if (pos >= input_.size()) {");
        w.line("length = 0;");
        w.line("return 0;");
        w.close("}");
        w.line("unsigned char first = static_cast<unsigned char>(input_[pos]);");
        w.line("size_t expect = 1;");
        w.line("uint32_t cp = first;");
        w.open("if ((first & 0x80u) == 0) {");
        w.line("expect = 1;");
        w.line("cp = first;");
        w.branch_else("} else if ((first & 0xE0u) == 0xC0u) {");
        w.line("expect = 2;");
        w.line("cp = first & 0x1Fu;");
        w.branch_else("} else if ((first & 0xF0u) == 0xE0u) {");
        w.line("expect = 3;");
        w.line("cp = first & 0x0Fu;");
        w.branch_else("} else if ((first & 0xF8u) == 0xF0u) {");
        w.line("expect = 4;");
        w.line("cp = first & 0x07u;");
        w.branch_else("} else {");
        w.line("length = 1;");
        w.line("return first;");
        w.close("}");
        w.open("if (pos + expect > input_.size()) {");
        w.line("length = 1;");
        w.line("return first;");
        w.close("}");
        w.open("for (size_t i = 1; i < expect; ++i) {");
        w.line("unsigned char b = static_cast<unsigned char>(input_[pos + i]);");
        w.open("if ((b & 0xC0u) != 0x80u) {");
        w.line("length = 1;");
        w.line("return first;");
        w.close("}");
        w.line("cp = (cp << 6) | (b & 0x3Fu);");
        w.close("}");
        w.line("length = expect;");
        w.line("return cp;");
        w.close("}");
        w.line("");

        w.open("bool matchRange(uint32_t low, uint32_t high) {");
        w.line("size_t length = 0;");
        w.line("uint32_t cp = decodeScalar(pos_, length);");
        w.open("if (length == 0 || cp < low || cp > high) {");
        w.line("return false;");
        w.close("}");
        w.line("pos_ += length;");
        w.line("return true;");
        w.close("}");
        w.line("");

        w.open("void lineColumnAt(size_t pos, size_t& line, size_t& column) const {");
        w.line("line = 1;");
        w.line("column = 1;");
        w.open("for (size_t i = 0; i < pos && i < input_.size(); ++i) {");
        w.open("if (input_[i] == '\\n') {");
        w.line("++line;");
        w.line("column = 1;");
        w.branch_else("} else {");
        w.line("++column;");
        w.close("}");
        w.close("}");
        w.close("}");
        w.line("");

        w.open("void failExpected(size_t pos, const std::string& expected) {");
        w.open("if (pos < error_pos_) {");
        w.line("return;");
        w.close("}");
        w.open("if (pos > error_pos_) {");
        w.line("error_pos_ = pos;");
        w.line("expected_.clear();");
        w.close("}");
        w.open("for (const auto& item : expected_) {");
        w.open("if (item == expected) {");
        w.line("return;");
        w.close("}");
        w.close("}");
        w.line("expected_.push_back(expected);");
        w.close("}");
        w.line("");

        // A failed call to a token-like rule replaces whatever character
        // expectations the callee recorded at the call position with the
        // rule's own name; `base` marks how many entries predate the call.
        w.open("void failRule(size_t call_pos, size_t base, const std::string& rule) {");
        w.open("if (error_pos_ > call_pos) {");
        w.line("return;");
        w.close("}");
        w.open("if (error_pos_ < call_pos) {");
        w.line("error_pos_ = call_pos;");
        w.line("expected_.clear();");
        w.line("expected_.push_back(rule);");
        w.line("return;");
        w.close("}");
        w.line("expected_.resize(base);");
        w.open("for (const auto& item : expected_) {");
        w.open("if (item == rule) {");
        w.line("return;");
        w.close("}");
        w.close("}");
        w.line("expected_.push_back(rule);");
        w.close("}");
        w.line("");

        // Fallback for structural rules: the callee's own expectations
        // stand unless it recorded nothing this far into the input.
        w.open("void failRuleFallback(size_t call_pos, const std::string& rule) {");
        w.open("if (error_pos_ < call_pos) {");
        w.line("error_pos_ = call_pos;");
        w.line("expected_.clear();");
        w.line("expected_.push_back(rule);");
        w.close("}");
        w.close("}");
        w.line("");

        w.open("void finishError() {");
        w.line("std::string what;");
        w.open("for (size_t i = 0; i < expected_.size(); ++i) {");
        w.open("if (i > 0) {");
        w.line("what += \" or \";");
        w.close("}");
        w.line("what += expected_[i];");
        w.close("}");
        w.open("if (what.empty()) {");
        w.line("what = \"valid input\";");
        w.close("}");
        w.line("lineColumnAt(error_pos_, error_line_, error_column_);");
        w.line("std::ostringstream message;");
        w.line(
            "message << \"Parse error at line \" << error_line_ << \", column \" \
             << error_column_ << \": expected \" << what;",
        );
        w.line("error_ = message.str();");
        w.close("}");
        w.line("");

        w.open("std::string captureOr(const std::string& name) const {");
        w.line("auto it = last_capture_.find(name);");
        w.line("return it == last_capture_.end() ? name : it->second;");
        w.close("}");
        w.line("");

        w.open("void addTerminalLeaf(ASTNode* parent, size_t start) {");
        w.line("auto leaf = std::make_unique<TerminalNode>();");
        w.line("leaf->position = start;");
        w.line("lineColumnAt(start, leaf->line, leaf->column);");
        w.line("leaf->text = input_.substr(start, pos_ - start);");
        w.line("parent->addChild(std::move(leaf));");
        w.close("}");
        w.line("");

        w.open("bool enterRule() {");
        w.open("if (depth_ >= kMaxRecursionDepth) {");
        w.line("failExpected(pos_, \"recursion within depth limit\");");
        w.line("return false;");
        w.close("}");
        w.line("++depth_;");
        w.line("return true;");
        w.close("}");
        w.line("");

        w.open("void leaveRule() {");
        w.line("--depth_;");
        w.close("}");
        w.line("");

        if options.debug_mode {
            w.open("void trace(const std::string& message) const {");
            w.line("std::cerr << \"[trace] \" << message << \" @\" << pos_ << \"\\n\";");
            w.close("}");
            w.line("");
        }
    }

    fn emit_parse_entry(
        &mut self,
        w: &mut Writer,
        grammar: &Grammar,
        signatures: &HashMap<String, GroupSignature>,
        tables: &NameTables,
    ) -> Result<(), EmitError> {
        let start = &grammar.start_symbol;
        let signature = signatures
            .get(start)
            .ok_or_else(|| EmitError::new(format!("Start symbol is not defined: {}", start)))?;

        // A parameterized start symbol is tried once per combination of
        // its enum parameter values, in declaration order.
        let mut combos: Vec<Vec<String>> = vec![Vec::new()];
        for param in &signature.params {
            let ResolvedType::Enum { key, values } = &param.ty else {
                return Err(EmitError::new(format!(
                    "Start symbol '{}' has non-enum parameters",
                    start
                )));
            };
            let enum_name = tables
                .enum_cpp_name(key)
                .ok_or_else(|| EmitError::new(format!("Unresolved enum parameter '{}'", key)))?;
            let mut next = Vec::new();
            for combo in &combos {
                for value in values {
                    let mut extended = combo.clone();
                    extended.push(format!("{}::{}", enum_name, sanitize_identifier(value)));
                    next.push(extended);
                }
            }
            combos = next;
        }

        let fn_name = &tables.fn_names[start.as_str()];
        w.open("std::unique_ptr<ASTNode> parse() {");
        w.line("pos_ = 0;");
        w.line("depth_ = 0;");
        w.line("error_.clear();");
        w.line("expected_.clear();");
        w.line("error_pos_ = 0;");
        w.line("error_line_ = 1;");
        w.line("error_column_ = 1;");
        w.line("context_storage_.clear();");
        w.line("last_capture_.clear();");
        w.line("std::unique_ptr<ASTNode> root;");
        for combo in &combos {
            w.open("if (!root) {");
            w.line("pos_ = 0;");
            w.line("context_storage_.clear();");
            w.line("last_capture_.clear();");
            w.line(&format!("root = {}({});", fn_name, combo.join(", ")));
            w.open("if (root && pos_ != input_.size()) {");
            w.line("failExpected(pos_, \"end of input\");");
            w.line("root = nullptr;");
            w.close("}");
            w.close("}");
        }
        w.open("if (root) {");
        w.line("error_.clear();");
        w.line("return root;");
        w.close("}");
        w.line("finishError();");
        w.line("return nullptr;");
        w.close("}");
        Ok(())
    }

    fn emit_rule_group(
        &mut self,
        w: &mut Writer,
        grammar: &Grammar,
        name: &str,
        signatures: &HashMap<String, GroupSignature>,
        tables: &NameTables,
        options: &GeneratorOptions,
    ) -> Result<(), EmitError> {
        let signature = &signatures[name];
        let fn_name = &tables.fn_names[name];
        let class_name = &tables.class_names[name];

        let mut params = Vec::new();
        for param in &signature.params {
            params.push(format!(
                "{} {}",
                cpp_param_type(&param.ty, tables)?,
                sanitize_identifier(&param.name)
            ));
        }
        w.open(&format!(
            "std::unique_ptr<ASTNode> {}({}) {{",
            fn_name,
            params.join(", ")
        ));
        w.open("if (!enterRule()) {");
        w.line("return nullptr;");
        w.close("}");
        if options.debug_mode {
            w.line(&format!("trace({});", cpp_quoted(&format!("enter {}", name))));
        }

        let clauses: Vec<&Rule> = grammar.rules_named(name).collect();
        for rule in clauses {
            let guards = signature.clause_guards(rule);
            let mut conditions = Vec::new();
            let mut bindings = HashMap::new();
            for (i, guard) in guards.iter().enumerate() {
                let fn_param = sanitize_identifier(&signature.params[i].name);
                match guard {
                    Some(value) => {
                        let ResolvedType::Enum { key, .. } = &signature.params[i].ty else {
                            return Err(EmitError::new(format!(
                                "Parameter pattern '{}' of rule '{}' has no enum type",
                                value, name
                            )));
                        };
                        let enum_name = tables.enum_cpp_name(key).ok_or_else(|| {
                            EmitError::new(format!("Unresolved enum parameter '{}'", key))
                        })?;
                        conditions.push(format!(
                            "{} == {}::{}",
                            fn_param,
                            enum_name,
                            sanitize_identifier(value)
                        ));
                    }
                    None => {
                        bindings.insert(rule.parameters[i].name.clone(), fn_param);
                    }
                }
            }

            if conditions.is_empty() {
                w.open("{");
            } else {
                w.open(&format!("if ({}) {{", conditions.join(" && ")));
            }

            let start_var = self.fresh("start");
            let ok_var = self.fresh("ok");
            w.line(&format!("size_t {} = pos_;", start_var));
            w.line(&format!("auto node = std::make_unique<{}>();", class_name));
            w.line(&format!("node->position = {};", start_var));
            w.line(&format!(
                "lineColumnAt({}, node->line, node->column);",
                start_var
            ));
            w.line(&format!("bool {} = true;", ok_var));

            let ctx = EmitCtx {
                signatures,
                tables,
                bindings,
            };
            self.emit_expr(w, &rule.body, &ok_var, &ctx)?;

            w.open(&format!("if ({}) {{", ok_var));
            w.line(&format!(
                "node->text = input_.substr({}, pos_ - {});",
                start_var, start_var
            ));
            w.line(&format!(
                "last_capture_[{}] = node->text;",
                cpp_quoted(name)
            ));
            w.line("leaveRule();");
            if options.debug_mode {
                w.line(&format!("trace({});", cpp_quoted(&format!("match {}", name))));
            }
            w.line("return node;");
            w.close("}");
            w.line(&format!("pos_ = {};", start_var));
            w.close("}");
        }

        w.line("leaveRule();");
        if options.debug_mode {
            w.line(&format!("trace({});", cpp_quoted(&format!("fail {}", name))));
        }
        w.line("return nullptr;");
        w.close("}");
        w.line("");
        Ok(())
    }

    fn emit_expr(
        &mut self,
        w: &mut Writer,
        expr: &Expr,
        ok: &str,
        ctx: &EmitCtx<'_>,
    ) -> Result<(), EmitError> {
        match expr {
            Expr::Terminal(value) => {
                let tok = self.fresh("tok");
                w.open(&format!("if ({}) {{", ok));
                w.line(&format!("size_t {} = pos_;", tok));
                w.open(&format!(
                    "if (matchLiteral({}, {})) {{",
                    cpp_quoted(value),
                    value.len()
                ));
                w.line(&format!("addTerminalLeaf(node.get(), {});", tok));
                w.branch_else("} else {");
                w.line(&format!(
                    "failExpected(pos_, {});",
                    cpp_quoted(&quote_terminal(value))
                ));
                w.line(&format!("{} = false;", ok));
                w.close("}");
                w.close("}");
            }
            Expr::CharRange { start, end } => {
                let tok = self.fresh("tok");
                w.open(&format!("if ({}) {{", ok));
                w.line(&format!("size_t {} = pos_;", tok));
                w.open(&format!("if (matchRange({}u, {}u)) {{", start, end));
                w.line(&format!("addTerminalLeaf(node.get(), {});", tok));
                w.branch_else("} else {");
                w.line(&format!(
                    "failExpected(pos_, {});",
                    cpp_quoted(&format!("character in range {}", expr))
                ));
                w.line(&format!("{} = false;", ok));
                w.close("}");
                w.close("}");
            }
            Expr::NonTerminal { name, args } => {
                let signature = ctx.signatures.get(name).ok_or_else(|| {
                    EmitError::new(format!("Undefined non-terminal: {}", name))
                })?;
                let fn_name = ctx.tables.fn_names.get(name).ok_or_else(|| {
                    EmitError::new(format!("Undefined non-terminal: {}", name))
                })?;
                if args.len() != signature.params.len() {
                    return Err(EmitError::new(format!(
                        "Wrong number of arguments for '{}': expected {}, found {}",
                        name,
                        signature.params.len(),
                        args.len()
                    )));
                }
                let mut arg_exprs = Vec::new();
                for (i, arg) in args.iter().enumerate() {
                    if let Some(bound) = ctx.bindings.get(arg) {
                        arg_exprs.push(bound.clone());
                        continue;
                    }
                    let ResolvedType::Enum { key, .. } = &signature.params[i].ty else {
                        return Err(EmitError::new(format!(
                            "Argument '{}' of call to '{}' cannot be resolved",
                            arg, name
                        )));
                    };
                    let enum_name = ctx.tables.enum_cpp_name(key).ok_or_else(|| {
                        EmitError::new(format!("Unresolved enum parameter '{}'", key))
                    })?;
                    arg_exprs.push(format!("{}::{}", enum_name, sanitize_identifier(arg)));
                }

                let token_like = ctx.tables.token_like.get(name).copied().unwrap_or(false);
                let call = self.fresh("call");
                let sub = self.fresh("sub");
                w.open(&format!("if ({}) {{", ok));
                w.line(&format!("size_t {} = pos_;", call));
                let base = if token_like {
                    let base = self.fresh("base");
                    w.line(&format!(
                        "size_t {} = (error_pos_ == {}) ? expected_.size() : 0;",
                        base, call
                    ));
                    Some(base)
                } else {
                    None
                };
                w.line(&format!(
                    "auto {} = {}({});",
                    sub,
                    fn_name,
                    arg_exprs.join(", ")
                ));
                w.open(&format!("if ({}) {{", sub));
                w.line(&format!("node->addChild(std::move({}));", sub));
                w.branch_else("} else {");
                match base {
                    Some(base) => w.line(&format!(
                        "failRule({}, {}, {});",
                        call,
                        base,
                        cpp_quoted(name)
                    )),
                    None => w.line(&format!(
                        "failRuleFallback({}, {});",
                        call,
                        cpp_quoted(name)
                    )),
                }
                w.line(&format!("{} = false;", ok));
                w.close("}");
                w.close("}");
            }
            Expr::Alternative(children) => {
                let save = self.fresh("save");
                let mark = self.fresh("mark");
                let matched = self.fresh("alt");
                w.open(&format!("if ({}) {{", ok));
                w.line(&format!("size_t {} = pos_;", save));
                w.line(&format!("size_t {} = node->childCount();", mark));
                w.line(&format!("bool {} = false;", matched));
                for child in children {
                    let path = self.fresh("path");
                    w.open(&format!("if (!{}) {{", matched));
                    w.line(&format!("pos_ = {};", save));
                    w.line(&format!("node->truncateChildren({});", mark));
                    w.line(&format!("bool {} = true;", path));
                    self.emit_expr(w, child, &path, ctx)?;
                    w.line(&format!("{} = {};", matched, path));
                    w.close("}");
                }
                w.open(&format!("if (!{}) {{", matched));
                w.line(&format!("{} = false;", ok));
                w.close("}");
                w.close("}");
            }
            Expr::Sequence(children) => {
                for child in children {
                    self.emit_expr(w, child, ok, ctx)?;
                }
            }
            Expr::Group(child) => {
                self.emit_expr(w, child, ok, ctx)?;
            }
            Expr::Optional(child) => {
                let save = self.fresh("save");
                let mark = self.fresh("mark");
                let opt = self.fresh("opt");
                w.open(&format!("if ({}) {{", ok));
                w.line(&format!("size_t {} = pos_;", save));
                w.line(&format!("size_t {} = node->childCount();", mark));
                w.line(&format!("bool {} = true;", opt));
                self.emit_expr(w, child, &opt, ctx)?;
                w.open(&format!("if (!{}) {{", opt));
                w.line(&format!("pos_ = {};", save));
                w.line(&format!("node->truncateChildren({});", mark));
                w.close("}");
                w.close("}");
            }
            Expr::ZeroOrMore(child) => {
                self.emit_repetition_loop(w, child, ok, ctx)?;
            }
            Expr::OneOrMore(child) => {
                // First iteration is required and propagates failure.
                self.emit_expr(w, child, ok, ctx)?;
                self.emit_repetition_loop(w, child, ok, ctx)?;
            }
            Expr::ContextAction { kind, args } => {
                self.emit_context_action(w, *kind, args, ok)?;
            }
        }
        Ok(())
    }

    fn emit_repetition_loop(
        &mut self,
        w: &mut Writer,
        child: &Expr,
        ok: &str,
        ctx: &EmitCtx<'_>,
    ) -> Result<(), EmitError> {
        let save = self.fresh("save");
        let mark = self.fresh("mark");
        let rep = self.fresh("rep");
        w.open(&format!("if ({}) {{", ok));
        w.open("for (;;) {");
        w.line(&format!("size_t {} = pos_;", save));
        w.line(&format!("size_t {} = node->childCount();", mark));
        w.line(&format!("bool {} = true;", rep));
        self.emit_expr(w, child, &rep, ctx)?;
        w.open(&format!("if (!{}) {{", rep));
        w.line(&format!("pos_ = {};", save));
        w.line(&format!("node->truncateChildren({});", mark));
        w.line("break;");
        w.close("}");
        w.open(&format!("if (pos_ == {}) {{", save));
        w.line("break; // empty match, a repeat would not advance");
        w.close("}");
        w.close("}");
        w.close("}");
        Ok(())
    }

    fn emit_context_action(
        &mut self,
        w: &mut Writer,
        kind: ContextActionKind,
        args: &[String],
        ok: &str,
    ) -> Result<(), EmitError> {
        match kind {
            ContextActionKind::Store => {
                let [key, value] = args else {
                    return Err(EmitError::new(format!(
                        "store action requires 2 arguments, found {}",
                        args.len()
                    )));
                };
                w.open(&format!("if ({}) {{", ok));
                w.line(&format!(
                    "context_storage_[captureOr({})] = captureOr({});",
                    cpp_quoted(key),
                    cpp_quoted(value)
                ));
                w.close("}");
            }
            ContextActionKind::Lookup => {
                let [key] = args else {
                    return Err(EmitError::new(format!(
                        "lookup action requires 1 argument, found {}",
                        args.len()
                    )));
                };
                w.open(&format!("if ({}) {{", ok));
                w.open(&format!(
                    "if (context_storage_.find(captureOr({})) == context_storage_.end()) {{",
                    cpp_quoted(key)
                ));
                w.line(&format!(
                    "failExpected(pos_, {});",
                    cpp_quoted(&format!("previously stored '{}'", key))
                ));
                w.line(&format!("{} = false;", ok));
                w.close("}");
                w.close("}");
            }
            ContextActionKind::Check => {
                let [name] = args else {
                    return Err(EmitError::new(format!(
                        "check action requires 1 argument, found {}",
                        args.len()
                    )));
                };
                w.open(&format!("if ({}) {{", ok));
                w.open(&format!("if (!checkPredicate({})) {{", cpp_quoted(name)));
                w.line(&format!(
                    "failExpected(pos_, {});",
                    cpp_quoted(&format!("predicate '{}'", name))
                ));
                w.line(&format!("{} = false;", ok));
                w.close("}");
                w.close("}");
            }
        }
        Ok(())
    }

    fn emit_main(
        &self,
        options: &GeneratorOptions,
        parser_class: &str,
        parser_filename: &str,
    ) -> String {
        let qualified = match &options.namespace {
            Some(ns) => format!("{}::{}", sanitize_identifier(ns), parser_class),
            None => parser_class.to_string(),
        };
        let mut w = Writer::new(&options.indent_unit);
        w.line(&format!(
            "// Generated entry point for {}.",
            options.parser_name
        ));
        w.line(&format!("#include \"{}\"", parser_filename));
        w.line("");
        w.line("#include <fstream>");
        w.line("#include <iostream>");
        w.line("#include <sstream>");
        w.line("#include <string>");
        w.line("");
        w.open("static void printUsage(const char* program) {");
        w.line("std::cout << \"Usage: \" << program << \" [options] <input-file>\\n\";");
        w.line("std::cout << \"\\nOptions:\\n\";");
        w.line("std::cout << \"  --ast        Print the parse tree on success\\n\";");
        w.line("std::cout << \"  --verbose    Verbose output\\n\";");
        w.line("std::cout << \"  --help       Show this help message\\n\";");
        w.close("}");
        w.line("");
        w.open("int main(int argc, char* argv[]) {");
        w.line("std::string input_path;");
        w.line("bool show_ast = false;");
        w.line("bool verbose = false;");
        w.open("for (int i = 1; i < argc; ++i) {");
        w.line("std::string arg = argv[i];");
        w.open("if (arg == \"--help\") {");
        w.line("printUsage(argv[0]);");
        w.line("return 0;");
        w.branch_else("} else if (arg == \"--ast\") {");
        w.line("show_ast = true;");
        w.branch_else("} else if (arg == \"--verbose\") {");
        w.line("verbose = true;");
        w.branch_else("} else if (!arg.empty() && arg[0] == '-') {");
        w.line("std::cerr << \"Unknown option: \" << arg << \"\\n\";");
        w.line("return 1;");
        w.branch_else("} else {");
        w.line("input_path = arg;");
        w.close("}");
        w.close("}");
        w.open("if (input_path.empty()) {");
        w.line("std::cerr << \"Error: input file is required\\n\";");
        w.line("printUsage(argv[0]);");
        w.line("return 1;");
        w.close("}");
        w.line("std::ifstream file(input_path);");
        w.open("if (!file) {");
        w.line("std::cerr << \"Error: cannot open \" << input_path << \"\\n\";");
        w.line("return 1;");
        w.close("}");
        w.line("std::stringstream buffer;");
        w.line("buffer << file.rdbuf();");
        w.line("");
        w.line(&format!("{} parser(buffer.str());", qualified));
        w.open("if (verbose) {");
        w.line("std::cout << \"Parsing \" << input_path << \"...\\n\";");
        w.close("}");
        w.line("auto root = parser.parse();");
        w.open("if (!root) {");
        w.line(
            "std::cerr << parser.errorMessage() << \" (byte \" << parser.errorPosition() \
             << \", line \" << parser.errorLine() << \", column \" << parser.errorColumn() \
             << \")\\n\";",
        );
        w.line("return 1;");
        w.close("}");
        w.line("std::cout << \"Parse OK\\n\";");
        w.open("if (show_ast) {");
        w.line("root->print(std::cout);");
        w.close("}");
        w.line("return 0;");
        w.close("}");
        w.out
    }
}

impl Default for CppGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGenerator for CppGenerator {
    fn generate(
        &mut self,
        grammar: &Grammar,
        options: &GeneratorOptions,
    ) -> Result<GeneratedCode, EmitError> {
        if grammar.rules.is_empty() {
            return Err(EmitError::new("Grammar is empty"));
        }
        let signatures =
            group_signatures(grammar).map_err(|errors| EmitError::new(errors.join("; ")))?;
        let tables = build_tables(grammar, &signatures)?;
        self.var_counter = 0;

        let mut w = Writer::new(&options.indent_unit);
        self.emit_header(&mut w, options);

        let namespace = options.namespace.as_deref().map(sanitize_identifier);
        if let Some(ns) = &namespace {
            w.line(&format!("namespace {} {{", ns));
            w.line("");
        }

        self.emit_ast_classes(&mut w, grammar, &tables);
        self.emit_enums(&mut w, &tables);

        let parser_class = sanitize_identifier(&options.parser_name);
        w.open(&format!("class {} {{", parser_class));
        w.label("public:");
        w.line(&format!(
            "explicit {}(std::string input) : input_(std::move(input)) {{}}",
            parser_class
        ));
        w.line("");
        self.emit_parse_entry(&mut w, grammar, &signatures, &tables)?;
        w.line("");
        w.line("const std::string& errorMessage() const { return error_; }");
        w.line("size_t errorPosition() const { return error_pos_; }");
        w.line("size_t errorLine() const { return error_line_; }");
        w.line("size_t errorColumn() const { return error_column_; }");
        w.line("");
        w.label("protected:");
        w.line("// Hook for {check(...)} context actions; matches everything by default.");
        w.open("virtual bool checkPredicate(const std::string& name) {");
        w.line("(void)name;");
        w.line("return true;");
        w.close("}");
        w.line("");
        w.label("private:");
        self.emit_helpers(&mut w, options);
        for name in grammar.non_terminal_names() {
            self.emit_rule_group(&mut w, grammar, name, &signatures, &tables, options)?;
        }
        w.close("};");

        if let Some(ns) = &namespace {
            w.line("");
            w.line(&format!("}} // namespace {}", ns));
        }

        let parser_filename = format!(
            "{}{}",
            snake_case(&options.parser_name),
            self.file_extension()
        );
        let (main_code, main_filename) = if options.generate_executable {
            let main_filename = format!(
                "{}_main{}",
                snake_case(&options.parser_name),
                self.file_extension()
            );
            (
                Some(self.emit_main(options, &parser_class, &parser_filename)),
                Some(main_filename),
            )
        } else {
            (None, None)
        };

        let messages = vec![
            format!(
                "Generated {} parse function(s) from {} rule(s)",
                grammar.non_terminal_names().len(),
                grammar.rules.len()
            ),
            format!("Start symbol: {}", grammar.start_symbol),
        ];

        Ok(GeneratedCode {
            parser_code: w.out,
            parser_filename,
            main_code,
            main_filename,
            messages,
            warnings: Vec::new(),
        })
    }

    fn target_language(&self) -> &'static str {
        "cpp"
    }

    fn file_extension(&self) -> &'static str {
        ".cpp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bnf::lexing::lex;
    use crate::bnf::parsing::parse_tokens;

    fn grammar(source: &str) -> Grammar {
        parse_tokens(lex(source).unwrap()).unwrap()
    }

    fn generate(source: &str, options: &GeneratorOptions) -> GeneratedCode {
        CppGenerator::new().generate(&grammar(source), options).unwrap()
    }

    fn default_generate(source: &str) -> GeneratedCode {
        generate(source, &GeneratorOptions::default())
    }

    const ARITHMETIC: &str =
        "expr ::= term {('+' | '-') term}; term ::= factor {('*' | '/') factor}; \
         factor ::= NUM | '(' expr ')'; NUM ::= ('0'..'9')+";

    #[test]
    fn test_generates_parser_class_and_rule_functions() {
        let mut options = GeneratorOptions::default();
        options.parser_name = "ListParser".to_string();
        let code = generate(
            "list ::= '[' [element {',' element}] ']'; element ::= ('a'..'z')+",
            &options,
        );
        assert!(code.parser_code.contains("class ListParser {"));
        assert!(code.parser_code.contains("parse_list"));
        assert!(code.parser_code.contains("parse_element"));
        assert_eq!(code.parser_filename, "list_parser.cpp");
    }

    #[test]
    fn test_ast_base_class() {
        let code = default_generate("start ::= 'test'");
        assert!(code.parser_code.contains("class ASTNode {"));
        assert!(code.parser_code.contains("virtual ~ASTNode() = default;"));
        assert!(code.parser_code.contains("class StartNode : public ASTNode {"));
    }

    #[test]
    fn test_namespace_wrapping() {
        let mut options = GeneratorOptions::default();
        options.parser_name = "HelloParser".to_string();
        options.namespace = Some("hello".to_string());
        let code = generate("start ::= 'hello' 'world'", &options);
        assert!(code.parser_code.contains("namespace hello {"));
        assert!(code.parser_code.contains("} // namespace hello"));
    }

    #[test]
    fn test_enum_parameter_lowering() {
        let mut options = GeneratorOptions::default();
        options.parser_name = "AgreementParser".to_string();
        let code = generate(
            "agreement[N:enum{sing,plur}] ::= noun[N] verb[N]\n\
             noun[sing] ::= 'cat'\n\
             noun[plur] ::= 'cats'\n\
             verb[sing] ::= 'runs'\n\
             verb[plur] ::= 'run'",
            &options,
        );
        assert!(code.parser_code.contains("enum class NEnum {"));
        assert!(code.parser_code.contains("sing,"));
        assert!(code.parser_code.contains("plur"));
        assert!(code.parser_code.contains("parse_agreement(NEnum N)"));
        assert!(code.parser_code.contains("parse_noun(NEnum N)"));
        assert!(code.parser_code.contains("parse_verb(NEnum N)"));
        // Specializations dispatch on the value at run time.
        assert!(code.parser_code.contains("if (N == NEnum::sing) {"));
        assert!(code.parser_code.contains("if (N == NEnum::plur) {"));
    }

    #[test]
    fn test_parameterized_start_symbol_tries_all_values() {
        let code = default_generate(
            "greet[N:enum{sing,plur}] ::= noun[N]\n\
             noun[sing] ::= 'cat'\n\
             noun[plur] ::= 'cats'",
        );
        assert!(code.parser_code.contains("parse_greet(NEnum::sing)"));
        assert!(code.parser_code.contains("parse_greet(NEnum::plur)"));
    }

    #[test]
    fn test_context_actions_emit_storage() {
        let code = default_generate(
            "document ::= anchor reference\n\
             anchor ::= '&' name {store(name, name)}\n\
             reference ::= '*' name {lookup(name)}\n\
             name ::= ('a'..'z')+",
        );
        assert!(code.parser_code.contains("context_storage_"));
        assert!(code.parser_code.contains("std::unordered_map"));
        assert!(code.parser_code.contains("context_storage_[captureOr(\"name\")]"));
        assert!(code.parser_code.contains("context_storage_.find(captureOr(\"name\"))"));
    }

    #[test]
    fn test_check_action_calls_predicate_hook() {
        let code = default_generate("s ::= 'x' {check(balanced)}");
        assert!(code.parser_code.contains("checkPredicate(\"balanced\")"));
        assert!(code.parser_code.contains("virtual bool checkPredicate"));
    }

    #[test]
    fn test_repetition_guard_against_empty_match() {
        let code = default_generate("s ::= {'a'?}");
        assert!(code.parser_code.contains("break; // empty match"));
    }

    #[test]
    fn test_recursion_depth_guard() {
        let mut options = GeneratorOptions::default();
        options.max_recursion_depth = 64;
        let code = generate("s ::= 'a'", &options);
        assert!(code
            .parser_code
            .contains("static constexpr size_t kMaxRecursionDepth = 64;"));
        assert!(code.parser_code.contains("enterRule()"));
    }

    #[test]
    fn test_debug_mode_traces() {
        let mut options = GeneratorOptions::default();
        options.debug_mode = true;
        let code = generate("s ::= 'a'", &options);
        assert!(code.parser_code.contains("trace(\"enter s\");"));
        assert!(code.parser_code.contains("trace(\"match s\");"));

        let plain = default_generate("s ::= 'a'");
        assert!(!plain.parser_code.contains("trace("));
    }

    #[test]
    fn test_executable_main_generation() {
        let mut options = GeneratorOptions::default();
        options.parser_name = "CalcParser".to_string();
        options.generate_executable = true;
        let code = generate(ARITHMETIC, &options);
        let main_code = code.main_code.as_deref().unwrap();
        assert_eq!(code.main_filename.as_deref(), Some("calc_parser_main.cpp"));
        assert!(main_code.contains("#include \"calc_parser.cpp\""));
        assert!(main_code.contains("int main(int argc, char* argv[])"));
        assert!(main_code.contains("--ast"));
        assert!(main_code.contains("CalcParser parser(buffer.str());"));
    }

    #[test]
    fn test_terminal_bytes_escaped_for_cpp() {
        let code = default_generate("s ::= '\\n\"'");
        assert!(code.parser_code.contains("matchLiteral(\"\\n\\\"\", 2)"));
    }

    #[test]
    fn test_unicode_range_uses_codepoints() {
        let code = default_generate("cyr ::= 'а'..'я'");
        assert!(code.parser_code.contains("matchRange(1072u, 1103u)"));
        assert!(code.parser_code.contains("decodeScalar"));
    }

    #[test]
    fn test_full_consumption_check() {
        let code = default_generate("s ::= 'a' 'b'");
        assert!(code.parser_code.contains("pos_ != input_.size()"));
        assert!(code.parser_code.contains("failExpected(pos_, \"end of input\");"));
    }

    #[test]
    fn test_ordered_choice_backtracking_shape() {
        let code = default_generate("s ::= 'ab' | 'a'");
        // Each alternative restores the saved cursor before trying.
        assert!(code.parser_code.contains("pos_ = save"));
        assert!(code.parser_code.contains("truncateChildren"));
    }

    #[test]
    fn test_token_like_calls_summarize_expectations() {
        let code = default_generate(ARITHMETIC);
        // NUM is token-like: a failed call reports "NUM", not its
        // character ranges. Structural rules keep the callee's detail.
        assert!(code.parser_code.contains("failRule(call"));
        assert!(code.parser_code.contains(", \"NUM\");"));
        assert!(code.parser_code.contains("failRuleFallback(call"));
        assert!(code.parser_code.contains(", \"term\");"));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let options = GeneratorOptions::default();
        let first = generate(ARITHMETIC, &options);
        let second = generate(ARITHMETIC, &options);
        assert_eq!(first.parser_code, second.parser_code);
    }

    #[test]
    fn test_int_parameter_type() {
        // `start` wins the start-symbol heuristic, so the int-parameterized
        // rules stay off the entry path and emit as plain functions.
        let code = default_generate(
            "start ::= 'a'\nblock[depth:int] ::= 'x' inner[depth]\ninner[d:int] ::= 'y'",
        );
        assert!(code.parser_code.contains("parse_block(long depth)"));
        assert!(code.parser_code.contains("parse_inner(long d)"));
        assert!(code.parser_code.contains("parse_inner(depth)"));
    }

    #[test]
    fn test_non_enum_start_parameter_is_an_error() {
        let g = grammar("block[depth:int] ::= 'x'");
        let err = CppGenerator::new()
            .generate(&g, &GeneratorOptions::default())
            .unwrap_err();
        assert!(err.message.contains("non-enum parameters"));
    }

    #[test]
    fn test_empty_grammar_is_an_error() {
        let err = CppGenerator::new()
            .generate(&Grammar::new(), &GeneratorOptions::default())
            .unwrap_err();
        assert!(err.message.contains("Grammar is empty"));
    }

    #[test]
    fn test_messages_are_reported() {
        let code = default_generate("s ::= 'a'");
        assert!(!code.messages.is_empty());
    }
}
