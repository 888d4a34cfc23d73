// Copyright 2026 The GP2 Project Developers

//! Static checks over a parsed program.
//!
//! Everything the code generators rely on is validated here: name
//! resolution for rules and procedures, well-formed rule graphs and
//! interfaces, variable declarations and binding, and the restrictions on
//! where complex expressions may appear. A program with errors is never
//! handed to the transform or the emitters.

use std::collections::{HashMap, HashSet};

use crate::ast::{
    AtomExp, Command, CondExp, Declaration, GraphDecl, LabelDecl, Mark, Program, RuleDecl, VarType,
};

#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Level of this diagnostic.
    pub level: Level,

    /// Message associated with this diagnostic.
    pub message: String,

    /// Declaration in which the problem was found.
    pub declaration: String,

    /// The offending item within the declaration (node id, variable name,
    /// rule name, ...), when one can be named.
    pub item: String,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Level {
    Warning,
    Error,
}

/// Coarse value kinds used to type operator operands.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum ValueKind {
    Integer,
    Chars,
    Atomic,
    Listy,
}

#[derive(Debug, Default)]
pub struct Diagnostics(pub Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics(Vec::new())
    }

    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.0.iter().filter(|d| d.level == Level::Error).collect()
    }

    pub fn extend(&mut self, diags: &Diagnostics) {
        self.0.extend(diags.0.clone())
    }

    pub fn push(&mut self, d: Diagnostic) {
        self.0.push(d);
    }

    fn error(&mut self, declaration: &str, item: &str, message: String) {
        self.push(Diagnostic {
            level: Level::Error,
            message,
            declaration: declaration.to_owned(),
            item: item.to_owned(),
        });
    }
}

/// Rule and variable names become identifiers in generated code.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Check a whole program.
pub fn program(p: &Program) -> Diagnostics {
    let mut diags = Diagnostics::new();
    ProgramChecker::check(p, &mut diags);
    for rule in p.rules() {
        RuleChecker::check(rule, &mut diags);
    }
    diags
}

pub struct ProgramChecker {}

impl ProgramChecker {
    pub fn check(p: &Program, diags: &mut Diagnostics) {
        Self::check_declarations(p, diags);
        Self::check_commands(p, diags);
        Self::check_recursion(p, diags);
    }

    fn check_declarations(p: &Program, diags: &mut Diagnostics) {
        let mains = p
            .declarations
            .iter()
            .filter(|d| matches!(d, Declaration::Main(_)))
            .count();
        if mains == 0 {
            diags.error("program", "Main", "program has no Main declaration".into());
        }
        if mains > 1 {
            diags.error("program", "Main", "program has more than one Main".into());
        }

        let mut rule_names = HashSet::new();
        for rule in p.rules() {
            if !is_identifier(&rule.name) {
                diags.error(
                    "program",
                    &rule.name,
                    format!("rule name {} is not an identifier", rule.name),
                );
            }
            if !rule_names.insert(rule.name.as_str()) {
                diags.error(
                    "program",
                    &rule.name,
                    format!("rule {} is declared more than once", rule.name),
                );
            }
        }
        let mut procedure_names = HashSet::new();
        for decl in &p.declarations {
            if let Declaration::Procedure(procedure) = decl {
                if !procedure_names.insert(procedure.name.as_str()) {
                    diags.error(
                        "program",
                        &procedure.name,
                        format!("procedure {} is declared more than once", procedure.name),
                    );
                }
            }
        }
    }

    fn check_commands(p: &Program, diags: &mut Diagnostics) {
        if let Some(main) = p.main() {
            Self::check_command(p, main, "Main", false, false, diags);
        }
        for decl in &p.declarations {
            if let Declaration::Procedure(procedure) = decl {
                Self::check_command(p, &procedure.body, &procedure.name, false, false, diags);
            }
        }
    }

    fn check_command(
        p: &Program,
        command: &Command,
        declaration: &str,
        in_loop: bool,
        in_condition: bool,
        diags: &mut Diagnostics,
    ) {
        match command {
            Command::Sequence(commands) => {
                for c in commands {
                    Self::check_command(p, c, declaration, in_loop, in_condition, diags);
                }
            }
            Command::RuleCall(name) => {
                if p.get_rule(name).is_none() {
                    diags.error(declaration, name, format!("call to unknown rule {}", name));
                }
            }
            Command::RuleSetCall(names) => {
                if names.is_empty() {
                    diags.error(declaration, "{}", "empty rule set call".into());
                }
                for name in names {
                    if p.get_rule(name).is_none() {
                        diags.error(declaration, name, format!("call to unknown rule {}", name));
                    }
                }
            }
            Command::ProcedureCall(name) => {
                if p.get_procedure(name).is_none() {
                    diags.error(
                        declaration,
                        name,
                        format!("call to unknown procedure {}", name),
                    );
                }
            }
            Command::If(condition, then_command, else_command)
            | Command::Try(condition, then_command, else_command) => {
                Self::check_command(p, condition, declaration, in_loop, true, diags);
                Self::check_command(p, then_command, declaration, in_loop, in_condition, diags);
                Self::check_command(p, else_command, declaration, in_loop, in_condition, diags);
            }
            Command::Loop(body) => {
                Self::check_command(p, body, declaration, true, in_condition, diags);
            }
            Command::Or(left, right) => {
                Self::check_command(p, left, declaration, in_loop, in_condition, diags);
                Self::check_command(p, right, declaration, in_loop, in_condition, diags);
            }
            Command::Break => {
                if !in_loop {
                    diags.error(declaration, "break", "break outside a loop".into());
                }
                if in_condition {
                    diags.error(
                        declaration,
                        "break",
                        "break inside an if or try condition".into(),
                    );
                }
            }
            Command::Skip | Command::Fail => {}
        }
    }

    /// Procedures are inlined, so call cycles cannot be compiled.
    fn check_recursion(p: &Program, diags: &mut Diagnostics) {
        for decl in &p.declarations {
            if let Declaration::Procedure(procedure) = decl {
                let mut visiting = vec![procedure.name.as_str()];
                if Self::calls_any(p, &procedure.body, &mut visiting) {
                    diags.error(
                        "program",
                        &procedure.name,
                        format!("procedure {} is recursive", procedure.name),
                    );
                }
            }
        }
    }

    fn calls_any<'a>(p: &'a Program, command: &'a Command, visiting: &mut Vec<&'a str>) -> bool {
        match command {
            Command::ProcedureCall(name) => {
                if visiting.contains(&name.as_str()) {
                    return true;
                }
                match p.get_procedure(name) {
                    Some(procedure) => {
                        visiting.push(name);
                        let cyclic = Self::calls_any(p, &procedure.body, visiting);
                        visiting.pop();
                        cyclic
                    }
                    None => false,
                }
            }
            Command::Sequence(commands) => commands
                .iter()
                .any(|c| Self::calls_any(p, c, visiting)),
            Command::If(a, b, c) | Command::Try(a, b, c) => {
                Self::calls_any(p, a, visiting)
                    || Self::calls_any(p, b, visiting)
                    || Self::calls_any(p, c, visiting)
            }
            Command::Loop(body) => Self::calls_any(p, body, visiting),
            Command::Or(a, b) => {
                Self::calls_any(p, a, visiting) || Self::calls_any(p, b, visiting)
            }
            _ => false,
        }
    }
}

pub struct RuleChecker {}

impl RuleChecker {
    pub fn check(rule: &RuleDecl, diags: &mut Diagnostics) {
        let variables = Self::check_variables(rule, diags);
        Self::check_graph(rule, &rule.lhs, "left", diags);
        Self::check_graph(rule, &rule.rhs, "right", diags);
        Self::check_interface(rule, diags);
        for node in &rule.lhs.nodes {
            Self::check_left_label(rule, &node.label, &node.id, &variables, diags);
        }
        for (position, edge) in rule.lhs.edges.iter().enumerate() {
            let item = format!("edge {}", position);
            Self::check_left_label(rule, &edge.label, &item, &variables, diags);
        }
        let bound = Self::bound_variables(&rule.lhs);
        for node in &rule.rhs.nodes {
            Self::check_right_label(rule, &node.label, &node.id, &variables, &bound, diags);
        }
        for (position, edge) in rule.rhs.edges.iter().enumerate() {
            let item = format!("edge {}", position);
            Self::check_right_label(rule, &edge.label, &item, &variables, &bound, diags);
        }
        if let Some(condition) = &rule.condition {
            Self::check_condition(rule, condition, &variables, &bound, diags);
        }
    }

    fn check_variables<'a>(
        rule: &'a RuleDecl,
        diags: &mut Diagnostics,
    ) -> HashMap<&'a str, VarType> {
        let mut variables = HashMap::new();
        for decl in &rule.variables {
            if !is_identifier(&decl.name) {
                diags.error(
                    &rule.name,
                    &decl.name,
                    format!("variable name {} is not an identifier", decl.name),
                );
            }
            if variables.insert(decl.name.as_str(), decl.vtype).is_some() {
                diags.error(
                    &rule.name,
                    &decl.name,
                    format!("variable {} is declared more than once", decl.name),
                );
            }
        }
        variables
    }

    fn check_graph(rule: &RuleDecl, graph: &GraphDecl, side: &str, diags: &mut Diagnostics) {
        let mut ids = HashSet::new();
        for node in &graph.nodes {
            if !ids.insert(node.id.as_str()) {
                diags.error(
                    &rule.name,
                    &node.id,
                    format!("duplicate node id {} in the {} graph", node.id, side),
                );
            }
        }
        for edge in &graph.edges {
            for endpoint in [&edge.source, &edge.target] {
                if graph.get_node(endpoint).is_none() {
                    diags.error(
                        &rule.name,
                        endpoint,
                        format!("edge endpoint {} is not a {} graph node", endpoint, side),
                    );
                }
            }
        }
    }

    fn check_interface(rule: &RuleDecl, diags: &mut Diagnostics) {
        let mut seen = HashSet::new();
        for id in &rule.interface {
            if !seen.insert(id.as_str()) {
                diags.error(
                    &rule.name,
                    id,
                    format!("interface node {} listed more than once", id),
                );
            }
            if rule.lhs.get_node(id).is_none() {
                diags.error(
                    &rule.name,
                    id,
                    format!("interface node {} does not exist in the left graph", id),
                );
            }
            if rule.rhs.get_node(id).is_none() {
                diags.error(
                    &rule.name,
                    id,
                    format!("interface node {} does not exist in the right graph", id),
                );
            }
        }
    }

    /// Variables that receive a value during matching: every variable
    /// occurring in some left-hand label.
    fn bound_variables(lhs: &GraphDecl) -> HashSet<&str> {
        let mut bound = HashSet::new();
        let mut names = Vec::new();
        for node in &lhs.nodes {
            for atom in &node.label.list {
                atom.variables(&mut names);
            }
        }
        for edge in &lhs.edges {
            for atom in &edge.label.list {
                atom.variables(&mut names);
            }
        }
        bound.extend(names);
        bound
    }

    /// Left labels must be matchable: constants, variables, and negated
    /// integer constants only, with at most one list variable.
    fn check_left_label(
        rule: &RuleDecl,
        label: &LabelDecl,
        item: &str,
        variables: &HashMap<&str, VarType>,
        diags: &mut Diagnostics,
    ) {
        let mut list_variables = 0;
        for atom in &label.list {
            match atom {
                AtomExp::Int(_) | AtomExp::Str(_) => {}
                AtomExp::Neg(inner) => {
                    if !matches!(**inner, AtomExp::Int(_)) {
                        diags.error(
                            &rule.name,
                            item,
                            "only integer constants may be negated in a left label".into(),
                        );
                    }
                }
                AtomExp::Var(name) => match variables.get(name.as_str()) {
                    None => diags.error(
                        &rule.name,
                        item,
                        format!("variable {} is not declared", name),
                    ),
                    Some(VarType::List) => list_variables += 1,
                    Some(_) => {}
                },
                _ => diags.error(
                    &rule.name,
                    item,
                    "left labels cannot contain operators".into(),
                ),
            }
        }
        if list_variables > 1 {
            diags.error(
                &rule.name,
                item,
                "a label may contain at most one list variable".into(),
            );
        }
    }

    fn check_right_label(
        rule: &RuleDecl,
        label: &LabelDecl,
        item: &str,
        variables: &HashMap<&str, VarType>,
        bound: &HashSet<&str>,
        diags: &mut Diagnostics,
    ) {
        if label.mark == Mark::Any {
            diags.error(
                &rule.name,
                item,
                "the any mark cannot appear in the right graph".into(),
            );
        }
        let mut list_variables = 0;
        for atom in &label.list {
            if let AtomExp::Var(name) = atom {
                if variables.get(name.as_str()) == Some(&VarType::List) {
                    list_variables += 1;
                }
            }
            Self::check_value_atom(rule, atom, item, variables, bound, true, diags);
        }
        if list_variables > 1 {
            diags.error(
                &rule.name,
                item,
                "a label may contain at most one list variable".into(),
            );
        }
    }

    /// The value kind an atom evaluates to, when its variables are known.
    fn value_kind(atom: &AtomExp, variables: &HashMap<&str, VarType>) -> Option<ValueKind> {
        match atom {
            AtomExp::Int(_) => Some(ValueKind::Integer),
            AtomExp::Str(_) => Some(ValueKind::Chars),
            AtomExp::Var(name) => variables.get(name.as_str()).map(|vtype| match vtype {
                VarType::Int => ValueKind::Integer,
                VarType::Char | VarType::String => ValueKind::Chars,
                VarType::Atom => ValueKind::Atomic,
                VarType::List => ValueKind::Listy,
            }),
            AtomExp::Neg(_)
            | AtomExp::Add(_, _)
            | AtomExp::Sub(_, _)
            | AtomExp::Mul(_, _)
            | AtomExp::Div(_, _)
            | AtomExp::Indeg(_)
            | AtomExp::Outdeg(_)
            | AtomExp::Length(_) => Some(ValueKind::Integer),
            AtomExp::Concat(_, _) => Some(ValueKind::Chars),
        }
    }

    fn check_operand_kind(
        rule: &RuleDecl,
        atom: &AtomExp,
        item: &str,
        variables: &HashMap<&str, VarType>,
        expected: ValueKind,
        diags: &mut Diagnostics,
    ) {
        if let Some(kind) = Self::value_kind(atom, variables) {
            if kind != expected {
                let wanted = match expected {
                    ValueKind::Integer => "an integer",
                    ValueKind::Chars => "a string",
                    ValueKind::Atomic | ValueKind::Listy => "a value",
                };
                diags.error(
                    &rule.name,
                    item,
                    format!("operand must evaluate to {}", wanted),
                );
            }
        }
    }

    /// Check an atom in evaluation position (right labels, condition
    /// arguments). `top_level` permits a bare list variable.
    fn check_value_atom(
        rule: &RuleDecl,
        atom: &AtomExp,
        item: &str,
        variables: &HashMap<&str, VarType>,
        bound: &HashSet<&str>,
        top_level: bool,
        diags: &mut Diagnostics,
    ) {
        match atom {
            AtomExp::Int(_) | AtomExp::Str(_) => {}
            AtomExp::Var(name) => match variables.get(name.as_str()) {
                None => diags.error(
                    &rule.name,
                    item,
                    format!("variable {} is not declared", name),
                ),
                Some(vtype) => {
                    if *vtype == VarType::List && !top_level {
                        diags.error(
                            &rule.name,
                            item,
                            format!("list variable {} used inside an operator", name),
                        );
                    }
                    if !bound.contains(name.as_str()) {
                        diags.error(
                            &rule.name,
                            item,
                            format!("variable {} does not occur in the left graph", name),
                        );
                    }
                }
            },
            AtomExp::Neg(inner) => {
                Self::check_operand_kind(rule, inner, item, variables, ValueKind::Integer, diags);
                Self::check_value_atom(rule, inner, item, variables, bound, false, diags)
            }
            AtomExp::Add(left, right)
            | AtomExp::Sub(left, right)
            | AtomExp::Mul(left, right)
            | AtomExp::Div(left, right) => {
                for operand in [left, right] {
                    Self::check_operand_kind(
                        rule,
                        operand,
                        item,
                        variables,
                        ValueKind::Integer,
                        diags,
                    );
                    Self::check_value_atom(rule, operand, item, variables, bound, false, diags);
                }
            }
            AtomExp::Concat(left, right) => {
                for operand in [left, right] {
                    Self::check_operand_kind(rule, operand, item, variables, ValueKind::Chars, diags);
                    Self::check_value_atom(rule, operand, item, variables, bound, false, diags);
                }
            }
            AtomExp::Indeg(node) | AtomExp::Outdeg(node) => {
                if rule.lhs.get_node(node).is_none() {
                    diags.error(
                        &rule.name,
                        item,
                        format!("degree operator names {}, not a left graph node", node),
                    );
                }
            }
            AtomExp::Length(name) => match variables.get(name.as_str()) {
                None => diags.error(
                    &rule.name,
                    item,
                    format!("variable {} is not declared", name),
                ),
                Some(VarType::Int) => diags.error(
                    &rule.name,
                    item,
                    format!("length applied to integer variable {}", name),
                ),
                Some(_) => {}
            },
        }
    }

    fn check_condition(
        rule: &RuleDecl,
        condition: &CondExp,
        variables: &HashMap<&str, VarType>,
        bound: &HashSet<&str>,
        diags: &mut Diagnostics,
    ) {
        match condition {
            CondExp::Int(name)
            | CondExp::Char(name)
            | CondExp::Str(name)
            | CondExp::Atom(name) => {
                if !variables.contains_key(name.as_str()) {
                    diags.error(
                        &rule.name,
                        name,
                        format!("variable {} is not declared", name),
                    );
                }
            }
            CondExp::Edge {
                source,
                target,
                label,
            } => {
                for endpoint in [source, target] {
                    if rule.lhs.get_node(endpoint).is_none() {
                        diags.error(
                            &rule.name,
                            endpoint,
                            format!("edge predicate names {}, not a left graph node", endpoint),
                        );
                    }
                }
                if let Some(label) = label {
                    for atom in &label.list {
                        Self::check_value_atom(
                            rule, atom, "edge predicate", variables, bound, true, diags,
                        );
                    }
                }
            }
            CondExp::Eq(left, right) | CondExp::Neq(left, right) => {
                for atom in left.iter().chain(right) {
                    Self::check_value_atom(rule, atom, "comparison", variables, bound, true, diags);
                }
            }
            CondExp::Gt(left, right)
            | CondExp::Geq(left, right)
            | CondExp::Lt(left, right)
            | CondExp::Leq(left, right) => {
                for atom in [left, right] {
                    Self::check_operand_kind(
                        rule,
                        atom,
                        "comparison",
                        variables,
                        ValueKind::Integer,
                        diags,
                    );
                    Self::check_value_atom(rule, atom, "comparison", variables, bound, false, diags);
                }
            }
            CondExp::Not(inner) => Self::check_condition(rule, inner, variables, bound, diags),
            CondExp::And(left, right) | CondExp::Or(left, right) => {
                Self::check_condition(rule, left, variables, bound, diags);
                Self::check_condition(rule, right, variables, bound, diags);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{NodeDecl, VarDecl};

    fn node(id: &str) -> NodeDecl {
        NodeDecl {
            id: id.into(),
            root: false,
            label: LabelDecl::default(),
        }
    }

    fn empty_rule(name: &str) -> RuleDecl {
        RuleDecl {
            name: name.into(),
            variables: Vec::new(),
            lhs: GraphDecl::default(),
            rhs: GraphDecl::default(),
            interface: Vec::new(),
            condition: None,
        }
    }

    fn program_with(declarations: Vec<Declaration>) -> Program {
        Program { declarations }
    }

    #[test]
    fn missing_main_is_an_error() {
        let p = program_with(vec![Declaration::Rule(empty_rule("r"))]);
        let diags = program(&p);
        assert!(diags
            .errors()
            .iter()
            .any(|d| d.message.contains("no Main")));
    }

    #[test]
    fn unknown_rule_call() {
        let p = program_with(vec![Declaration::Main(Command::RuleCall("ghost".into()))]);
        let diags = program(&p);
        assert!(diags
            .errors()
            .iter()
            .any(|d| d.message.contains("unknown rule ghost")));
    }

    #[test]
    fn break_outside_loop() {
        let p = program_with(vec![Declaration::Main(Command::Break)]);
        let diags = program(&p);
        assert!(diags
            .errors()
            .iter()
            .any(|d| d.message.contains("break outside a loop")));
    }

    #[test]
    fn interface_must_exist_on_both_sides() {
        let mut rule = empty_rule("keep");
        rule.lhs.nodes.push(node("a"));
        rule.interface.push("a".into());
        let p = program_with(vec![
            Declaration::Rule(rule),
            Declaration::Main(Command::RuleCall("keep".into())),
        ]);
        let diags = program(&p);
        assert!(diags
            .errors()
            .iter()
            .any(|d| d.message.contains("does not exist in the right graph")));
    }

    #[test]
    fn at_most_one_list_variable_per_label() {
        let mut rule = empty_rule("twolists");
        rule.variables.push(VarDecl {
            name: "x".into(),
            vtype: VarType::List,
        });
        rule.variables.push(VarDecl {
            name: "y".into(),
            vtype: VarType::List,
        });
        let mut n = node("a");
        n.label.list = vec![AtomExp::Var("x".into()), AtomExp::Var("y".into())];
        rule.lhs.nodes.push(n);
        let p = program_with(vec![
            Declaration::Rule(rule),
            Declaration::Main(Command::RuleCall("twolists".into())),
        ]);
        let diags = program(&p);
        assert!(diags
            .errors()
            .iter()
            .any(|d| d.message.contains("at most one list variable")));
    }

    #[test]
    fn right_variables_must_be_bound_on_the_left() {
        let mut rule = empty_rule("conjure");
        rule.variables.push(VarDecl {
            name: "x".into(),
            vtype: VarType::Int,
        });
        let mut n = node("a");
        n.label.list = vec![AtomExp::Var("x".into())];
        rule.rhs.nodes.push(n);
        let p = program_with(vec![
            Declaration::Rule(rule),
            Declaration::Main(Command::RuleCall("conjure".into())),
        ]);
        let diags = program(&p);
        assert!(diags
            .errors()
            .iter()
            .any(|d| d.message.contains("does not occur in the left graph")));
    }

    #[test]
    fn left_labels_reject_operators() {
        let mut rule = empty_rule("arith");
        rule.variables.push(VarDecl {
            name: "x".into(),
            vtype: VarType::Int,
        });
        let mut n = node("a");
        n.label.list = vec![AtomExp::Add(
            Box::new(AtomExp::Var("x".into())),
            Box::new(AtomExp::Int(1)),
        )];
        rule.lhs.nodes.push(n);
        let p = program_with(vec![
            Declaration::Rule(rule),
            Declaration::Main(Command::RuleCall("arith".into())),
        ]);
        let diags = program(&p);
        assert!(diags
            .errors()
            .iter()
            .any(|d| d.message.contains("cannot contain operators")));
    }

    #[test]
    fn recursive_procedures_are_rejected() {
        let p: Program = serde_json::from_str(
            r#"{
                "declarations": [
                    {"Procedure": {"name": "A", "body": {"ProcedureCall": "B"}}},
                    {"Procedure": {"name": "B", "body": {"ProcedureCall": "A"}}},
                    {"Main": {"ProcedureCall": "A"}}
                ]
            }"#,
        )
        .unwrap();
        let diags = program(&p);
        assert!(diags
            .errors()
            .iter()
            .any(|d| d.message.contains("recursive")));
    }
}
