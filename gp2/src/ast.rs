// Copyright 2026 The GP2 Project Developers

//! The GP 2 program AST.
//!
//! This is the typed hand-off interface from the external parser: a
//! program is a set of declarations (rules, procedures, and one Main
//! command), delivered as JSON. All nodes are plain tagged variants;
//! rule graphs use string identifiers which the IR transform resolves to
//! dense indices.

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Program {
    pub declarations: Vec<Declaration>,
}

impl Program {
    /// The Main command, if the program declares one.
    pub fn main(&self) -> Option<&Command> {
        self.declarations.iter().find_map(|decl| match decl {
            Declaration::Main(command) => Some(command),
            _ => None,
        })
    }

    pub fn get_rule(&self, name: &str) -> Option<&RuleDecl> {
        self.rules().find(|rule| rule.name == name)
    }

    pub fn get_procedure(&self, name: &str) -> Option<&ProcedureDecl> {
        self.declarations.iter().find_map(|decl| match decl {
            Declaration::Procedure(procedure) if procedure.name == name => Some(procedure),
            _ => None,
        })
    }

    /// All rule declarations, including procedure-local ones.
    pub fn rules(&self) -> impl Iterator<Item = &RuleDecl> {
        self.declarations.iter().flat_map(|decl| {
            let rules: &[RuleDecl] = match decl {
                Declaration::Rule(rule) => std::slice::from_ref(rule),
                Declaration::Procedure(procedure) => &procedure.rules,
                Declaration::Main(_) => &[],
            };
            rules.iter()
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub enum Declaration {
    Main(Command),
    Procedure(ProcedureDecl),
    Rule(RuleDecl),
}

/// A procedure is a named command with optional local rules. Procedures
/// are inlined at call sites; recursion is rejected by the checker.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProcedureDecl {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<RuleDecl>,
    pub body: Command,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Command {
    /// `P; Q; ...`
    Sequence(Vec<Command>),
    /// Call a rule by name.
    RuleCall(String),
    /// `{r1, r2, ...}`: attempt each rule until one matches.
    RuleSetCall(Vec<String>),
    /// Call a procedure by name.
    ProcedureCall(String),
    /// `if C then P else Q`: C's effects are always rolled back.
    If(Box<Command>, Box<Command>, Box<Command>),
    /// `try C then P else Q`: C's effects are kept when C succeeds.
    Try(Box<Command>, Box<Command>, Box<Command>),
    /// `P!`: as long as possible.
    Loop(Box<Command>),
    /// `P or Q`: nondeterministic choice.
    Or(Box<Command>, Box<Command>),
    Skip,
    Fail,
    Break,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarType {
    Int,
    Char,
    String,
    Atom,
    List,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub vtype: VarType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    None,
    Red,
    Green,
    Blue,
    Grey,
    Dashed,
    Any,
}

impl Default for Mark {
    fn default() -> Self {
        Mark::None
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelDecl {
    #[serde(default)]
    pub mark: Mark,
    #[serde(default)]
    pub list: Vec<AtomExp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AtomExp {
    Int(i64),
    Str(String),
    Var(String),
    Neg(Box<AtomExp>),
    Add(Box<AtomExp>, Box<AtomExp>),
    Sub(Box<AtomExp>, Box<AtomExp>),
    Mul(Box<AtomExp>, Box<AtomExp>),
    Div(Box<AtomExp>, Box<AtomExp>),
    Concat(Box<AtomExp>, Box<AtomExp>),
    /// Indegree of a named left-hand node.
    Indeg(String),
    /// Outdegree of a named left-hand node.
    Outdeg(String),
    /// Length of a list- or string-valued variable.
    Length(String),
}

impl AtomExp {
    /// Collect the variable names this expression mentions.
    pub fn variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            AtomExp::Int(_) | AtomExp::Str(_) => {}
            AtomExp::Var(name) | AtomExp::Length(name) => out.push(name),
            AtomExp::Neg(inner) => inner.variables(out),
            AtomExp::Add(left, right)
            | AtomExp::Sub(left, right)
            | AtomExp::Mul(left, right)
            | AtomExp::Div(left, right)
            | AtomExp::Concat(left, right) => {
                left.variables(out);
                right.variables(out);
            }
            AtomExp::Indeg(_) | AtomExp::Outdeg(_) => {}
        }
    }

    /// Collect the node names whose degrees this expression reads.
    pub fn degree_nodes<'a>(&'a self, out: &mut Vec<(&'a str, bool)>) {
        match self {
            AtomExp::Indeg(name) => out.push((name, true)),
            AtomExp::Outdeg(name) => out.push((name, false)),
            AtomExp::Neg(inner) => inner.degree_nodes(out),
            AtomExp::Add(left, right)
            | AtomExp::Sub(left, right)
            | AtomExp::Mul(left, right)
            | AtomExp::Div(left, right)
            | AtomExp::Concat(left, right) => {
                left.degree_nodes(out);
                right.degree_nodes(out);
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDecl {
    #[serde(default)]
    pub nodes: Vec<NodeDecl>,
    #[serde(default)]
    pub edges: Vec<EdgeDecl>,
}

impl GraphDecl {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn get_node(&self, id: &str) -> Option<&NodeDecl> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDecl {
    pub id: String,
    #[serde(default)]
    pub root: bool,
    #[serde(default)]
    pub label: LabelDecl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDecl {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub bidirectional: bool,
    #[serde(default)]
    pub label: LabelDecl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDecl {
    pub name: String,
    #[serde(default)]
    pub variables: Vec<VarDecl>,
    #[serde(default)]
    pub lhs: GraphDecl,
    #[serde(default)]
    pub rhs: GraphDecl,
    /// Node identifiers preserved from the left graph into the right.
    #[serde(default)]
    pub interface: Vec<String>,
    #[serde(default)]
    pub condition: Option<CondExp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CondExp {
    /// `int(x)`
    Int(String),
    /// `char(x)`
    Char(String),
    /// `string(x)`
    Str(String),
    /// `atom(x)`
    Atom(String),
    /// `edge(a, b)`, optionally constrained to a label.
    Edge {
        source: String,
        target: String,
        #[serde(default)]
        label: Option<LabelDecl>,
    },
    Eq(Vec<AtomExp>, Vec<AtomExp>),
    Neq(Vec<AtomExp>, Vec<AtomExp>),
    Gt(AtomExp, AtomExp),
    Geq(AtomExp, AtomExp),
    Lt(AtomExp, AtomExp),
    Leq(AtomExp, AtomExp),
    Not(Box<CondExp>),
    And(Box<CondExp>, Box<CondExp>),
    Or(Box<CondExp>, Box<CondExp>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_deserializes_from_json() {
        let program: Program = serde_json::from_str(
            r#"{
                "declarations": [
                    {"Rule": {
                        "name": "shrink",
                        "variables": [{"name": "x", "type": "int"}],
                        "lhs": {"nodes": [{"id": "a", "label": {"list": [{"Var": "x"}]}}]},
                        "rhs": {"nodes": [{"id": "a", "label": {"list": [{"Var": "x"}]}}]},
                        "interface": ["a"],
                        "condition": {"Gt": [{"Var": "x"}, {"Int": 0}]}
                    }},
                    {"Main": {"Loop": {"RuleCall": "shrink"}}}
                ]
            }"#,
        )
        .unwrap();
        assert!(program.main().is_some());
        let rule = program.get_rule("shrink").unwrap();
        assert_eq!(rule.variables[0].vtype, VarType::Int);
        assert!(matches!(rule.condition, Some(CondExp::Gt(_, _))));
    }

    #[test]
    fn procedure_local_rules_are_visible() {
        let program: Program = serde_json::from_str(
            r#"{
                "declarations": [
                    {"Procedure": {
                        "name": "Cleanup",
                        "rules": [{"name": "drop", "lhs": {"nodes": [{"id": "a"}]}, "rhs": {}}],
                        "body": {"Loop": {"RuleCall": "drop"}}
                    }},
                    {"Main": {"ProcedureCall": "Cleanup"}}
                ]
            }"#,
        )
        .unwrap();
        assert!(program.get_rule("drop").is_some());
        assert!(program.get_procedure("Cleanup").is_some());
    }

    #[test]
    fn atom_variable_collection() {
        let atom = AtomExp::Add(
            Box::new(AtomExp::Var("x".into())),
            Box::new(AtomExp::Neg(Box::new(AtomExp::Length("l".into())))),
        );
        let mut variables = Vec::new();
        atom.variables(&mut variables);
        assert_eq!(variables, vec!["x", "l"]);
    }
}
