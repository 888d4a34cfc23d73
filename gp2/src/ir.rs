// Copyright 2026 The GP2 Project Developers

//! The compiled intermediate representation of a rule.
//!
//! The transform resolves the AST's string identifiers into dense indices,
//! derives the edge interface from the node interface, computes the degree
//! requirements used by the matcher's filters, marks relabelled and
//! root-changed items, and decomposes the condition into a numbered set of
//! predicates attached to the left items that bind their inputs. The
//! checker has validated the declaration before the transform runs;
//! violations of its guarantees are bugs, not user errors.

use std::collections::HashMap;

use crate::ast::{AtomExp, CondExp, GraphDecl, LabelDecl, Mark, RuleDecl, VarType};

#[derive(Debug)]
pub struct Rule {
    pub name: String,
    pub variables: Vec<Variable>,
    pub lhs: Option<RuleGraph>,
    pub rhs: Option<RuleGraph>,
    pub condition: Option<Condition>,
    pub adds_nodes: bool,
    pub adds_edges: bool,
    /// A rule with no effect on the host; compiled to match-only calls.
    pub is_predicate: bool,
}

#[derive(Debug)]
pub struct Variable {
    pub name: String,
    pub vtype: VarType,
    /// Whether rule application reads this variable's value.
    pub used_by_rule: bool,
}

#[derive(Debug, Default)]
pub struct RuleGraph {
    pub nodes: Vec<RuleNode>,
    pub edges: Vec<RuleEdge>,
}

#[derive(Debug)]
pub struct RuleNode {
    pub index: usize,
    pub root: bool,
    pub label: RuleLabel,
    /// Image in the other graph: for a left node its right counterpart,
    /// for a right node its left preimage. `None` means deleted or added.
    pub interface: Option<usize>,
    pub indegree: usize,
    pub outdegree: usize,
    pub bidegree: usize,
    /// Set on right-hand nodes whose label differs from the preimage.
    pub relabelled: bool,
    /// Set on right-hand nodes whose root flag differs from the preimage.
    pub root_changed: bool,
    /// Set on left-hand nodes whose degrees are read by some atom.
    pub indegree_arg: bool,
    pub outdegree_arg: bool,
    /// Predicates to re-evaluate once this left node is matched.
    pub predicates: Vec<usize>,
}

impl RuleNode {
    /// A left node absent from the interface is deleted by the rule, which
    /// subjects it to the strict dangling degree filter.
    pub fn is_deleted(&self) -> bool {
        self.interface.is_none()
    }
}

#[derive(Debug)]
pub struct RuleEdge {
    pub index: usize,
    pub bidirectional: bool,
    pub label: RuleLabel,
    pub source: usize,
    pub target: usize,
    pub interface: Option<usize>,
    pub relabelled: bool,
    /// Predicates to re-evaluate once this left edge is matched.
    pub predicates: Vec<usize>,
}

impl RuleEdge {
    pub fn is_loop(&self) -> bool {
        self.source == self.target
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleLabel {
    pub mark: Mark,
    pub atoms: Vec<Atom>,
    /// Position of the label's list variable, if it has one.
    pub list_variable: Option<usize>,
}

impl RuleLabel {
    pub fn is_blank(&self) -> bool {
        self.mark == Mark::None && self.atoms.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Int(i64),
    Str(String),
    Var { id: usize, vtype: VarType },
    Neg(Box<Atom>),
    Add(Box<Atom>, Box<Atom>),
    Sub(Box<Atom>, Box<Atom>),
    Mul(Box<Atom>, Box<Atom>),
    Div(Box<Atom>, Box<Atom>),
    Concat(Box<Atom>, Box<Atom>),
    Indeg(usize),
    Outdeg(usize),
    Length { id: usize, vtype: VarType },
}

impl Atom {
    pub fn variables(&self, out: &mut Vec<usize>) {
        match self {
            Atom::Var { id, .. } | Atom::Length { id, .. } => out.push(*id),
            Atom::Neg(inner) => inner.variables(out),
            Atom::Add(left, right)
            | Atom::Sub(left, right)
            | Atom::Mul(left, right)
            | Atom::Div(left, right)
            | Atom::Concat(left, right) => {
                left.variables(out);
                right.variables(out);
            }
            _ => {}
        }
    }

    pub fn degree_nodes(&self, out: &mut Vec<(usize, bool)>) {
        match self {
            Atom::Indeg(node) => out.push((*node, true)),
            Atom::Outdeg(node) => out.push((*node, false)),
            Atom::Neg(inner) => inner.degree_nodes(out),
            Atom::Add(left, right)
            | Atom::Sub(left, right)
            | Atom::Mul(left, right)
            | Atom::Div(left, right)
            | Atom::Concat(left, right) => {
                left.degree_nodes(out);
                right.degree_nodes(out);
            }
            _ => {}
        }
    }
}

#[derive(Debug)]
pub struct Condition {
    pub skeleton: BoolExp,
    pub predicates: Vec<Predicate>,
}

#[derive(Debug)]
pub enum BoolExp {
    Pred(usize),
    Not(Box<BoolExp>),
    And(Box<BoolExp>, Box<BoolExp>),
    Or(Box<BoolExp>, Box<BoolExp>),
}

#[derive(Debug)]
pub struct Predicate {
    pub id: usize,
    /// Under an odd number of negations; fixes the optimistic default of
    /// the predicate's runtime boolean.
    pub negated: bool,
    pub kind: PredicateKind,
}

#[derive(Debug)]
pub enum PredicateKind {
    IntCheck(usize),
    CharCheck(usize),
    StringCheck(usize),
    AtomCheck(usize),
    Edge {
        source: usize,
        target: usize,
        label: Option<RuleLabel>,
    },
    Eq {
        left: Vec<Atom>,
        right: Vec<Atom>,
    },
    Neq {
        left: Vec<Atom>,
        right: Vec<Atom>,
    },
    Cmp {
        left: Atom,
        right: Atom,
        op: CmpOp,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Gt,
    Geq,
    Lt,
    Leq,
}

struct Transformer<'a> {
    decl: &'a RuleDecl,
    variables: HashMap<&'a str, (usize, VarType)>,
    lhs_indices: HashMap<&'a str, usize>,
    rhs_indices: HashMap<&'a str, usize>,
}

/// Compile a checked rule declaration into its IR.
pub fn transform(decl: &RuleDecl) -> Rule {
    let mut variables = HashMap::new();
    for (id, var) in decl.variables.iter().enumerate() {
        variables.insert(var.name.as_str(), (id, var.vtype));
    }
    let lhs_indices = index_nodes(&decl.lhs);
    let rhs_indices = index_nodes(&decl.rhs);
    let transformer = Transformer {
        decl,
        variables,
        lhs_indices,
        rhs_indices,
    };
    transformer.run()
}

fn index_nodes(graph: &GraphDecl) -> HashMap<&str, usize> {
    graph
        .nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (node.id.as_str(), index))
        .collect()
}

impl<'a> Transformer<'a> {
    fn run(self) -> Rule {
        let mut lhs = self.graph(&self.decl.lhs, &self.lhs_indices);
        let mut rhs = self.graph(&self.decl.rhs, &self.rhs_indices);
        self.connect_interface(&mut lhs, &mut rhs);

        let condition = self.decl.condition.as_ref().map(|condition| {
            let mut predicates = Vec::new();
            let skeleton = self.decompose(condition, false, &mut predicates);
            Condition {
                skeleton,
                predicates,
            }
        });
        if let Some(condition) = &condition {
            Self::attach_predicates(&mut lhs, condition);
        }
        let mut variables: Vec<Variable> = self
            .decl
            .variables
            .iter()
            .map(|var| Variable {
                name: var.name.clone(),
                vtype: var.vtype,
                used_by_rule: false,
            })
            .collect();
        Self::mark_used_variables(&rhs, &mut variables);
        Self::mark_degree_arguments(&mut lhs, &rhs, &condition);

        let adds_nodes = rhs.nodes.iter().any(|node| node.interface.is_none());
        let adds_edges = rhs.edges.iter().any(|edge| edge.interface.is_none());
        let deletes = lhs.nodes.iter().any(|node| node.interface.is_none())
            || lhs.edges.iter().any(|edge| edge.interface.is_none());
        let changes = rhs
            .nodes
            .iter()
            .any(|node| node.relabelled || node.root_changed)
            || rhs.edges.iter().any(|edge| edge.relabelled);
        let is_predicate = !adds_nodes && !adds_edges && !deletes && !changes;

        Rule {
            name: self.decl.name.clone(),
            variables,
            lhs: if self.decl.lhs.is_empty() { None } else { Some(lhs) },
            rhs: if self.decl.rhs.is_empty() { None } else { Some(rhs) },
            condition,
            adds_nodes,
            adds_edges,
            is_predicate,
        }
    }

    fn graph(&self, decl: &GraphDecl, indices: &HashMap<&str, usize>) -> RuleGraph {
        let mut graph = RuleGraph::default();
        for (index, node) in decl.nodes.iter().enumerate() {
            graph.nodes.push(RuleNode {
                index,
                root: node.root,
                label: self.label(&node.label),
                interface: None,
                indegree: 0,
                outdegree: 0,
                bidegree: 0,
                relabelled: false,
                root_changed: false,
                indegree_arg: false,
                outdegree_arg: false,
                predicates: Vec::new(),
            });
        }
        for (index, edge) in decl.edges.iter().enumerate() {
            let source = *indices
                .get(edge.source.as_str())
                .expect("checked: edge source exists");
            let target = *indices
                .get(edge.target.as_str())
                .expect("checked: edge target exists");
            if source == target {
                // A loop occupies one slot in each incidence chain.
                graph.nodes[source].indegree += 1;
                graph.nodes[source].outdegree += 1;
            } else if edge.bidirectional {
                graph.nodes[source].bidegree += 1;
                graph.nodes[target].bidegree += 1;
            } else {
                graph.nodes[source].outdegree += 1;
                graph.nodes[target].indegree += 1;
            }
            graph.edges.push(RuleEdge {
                index,
                bidirectional: edge.bidirectional,
                label: self.label(&edge.label),
                source,
                target,
                interface: None,
                relabelled: false,
                predicates: Vec::new(),
            });
        }
        graph
    }

    fn label(&self, decl: &LabelDecl) -> RuleLabel {
        let atoms: Vec<Atom> = decl.list.iter().map(|atom| self.atom(atom)).collect();
        let list_variable = atoms.iter().position(
            |atom| matches!(atom, Atom::Var { vtype, .. } if *vtype == VarType::List),
        );
        RuleLabel {
            mark: decl.mark,
            atoms,
            list_variable,
        }
    }

    fn atom(&self, exp: &AtomExp) -> Atom {
        match exp {
            AtomExp::Int(value) => Atom::Int(*value),
            AtomExp::Str(value) => Atom::Str(value.clone()),
            AtomExp::Var(name) => {
                let (id, vtype) = self.variable(name);
                Atom::Var { id, vtype }
            }
            // Fold negated constants so left labels stay matchable.
            AtomExp::Neg(inner) => match self.atom(inner) {
                Atom::Int(value) => Atom::Int(-value),
                other => Atom::Neg(Box::new(other)),
            },
            AtomExp::Add(l, r) => Atom::Add(Box::new(self.atom(l)), Box::new(self.atom(r))),
            AtomExp::Sub(l, r) => Atom::Sub(Box::new(self.atom(l)), Box::new(self.atom(r))),
            AtomExp::Mul(l, r) => Atom::Mul(Box::new(self.atom(l)), Box::new(self.atom(r))),
            AtomExp::Div(l, r) => Atom::Div(Box::new(self.atom(l)), Box::new(self.atom(r))),
            AtomExp::Concat(l, r) => {
                Atom::Concat(Box::new(self.atom(l)), Box::new(self.atom(r)))
            }
            AtomExp::Indeg(node) => Atom::Indeg(self.left_node(node)),
            AtomExp::Outdeg(node) => Atom::Outdeg(self.left_node(node)),
            AtomExp::Length(name) => {
                let (id, vtype) = self.variable(name);
                Atom::Length { id, vtype }
            }
        }
    }

    fn variable(&self, name: &str) -> (usize, VarType) {
        *self
            .variables
            .get(name)
            .expect("checked: variable is declared")
    }

    fn left_node(&self, id: &str) -> usize {
        *self
            .lhs_indices
            .get(id)
            .expect("checked: degree operator names a left node")
    }

    fn connect_interface(&self, lhs: &mut RuleGraph, rhs: &mut RuleGraph) {
        for id in &self.decl.interface {
            let left = *self.lhs_indices.get(id.as_str()).expect("checked: interface");
            let right = *self.rhs_indices.get(id.as_str()).expect("checked: interface");
            lhs.nodes[left].interface = Some(right);
            rhs.nodes[right].interface = Some(left);
            rhs.nodes[right].relabelled = lhs.nodes[left].label != rhs.nodes[right].label;
            rhs.nodes[right].root_changed = lhs.nodes[left].root != rhs.nodes[right].root;
        }
        // An edge is preserved when both its endpoints are, and the right
        // graph has an unpaired edge between their images with the same
        // orientation (either orientation for bidirectional edges).
        for left_edge in &mut lhs.edges {
            let source_image = lhs.nodes[left_edge.source].interface;
            let target_image = lhs.nodes[left_edge.target].interface;
            let (Some(source_image), Some(target_image)) = (source_image, target_image) else {
                continue;
            };
            let paired = rhs.edges.iter_mut().find(|right_edge| {
                right_edge.interface.is_none()
                    && ((right_edge.source == source_image && right_edge.target == target_image)
                        || (left_edge.bidirectional
                            && right_edge.source == target_image
                            && right_edge.target == source_image))
            });
            if let Some(right_edge) = paired {
                left_edge.interface = Some(right_edge.index);
                right_edge.interface = Some(left_edge.index);
                right_edge.relabelled = left_edge.label != right_edge.label;
            }
        }
    }

    fn mark_used_variables(rhs: &RuleGraph, variables: &mut [Variable]) {
        let mut used = Vec::new();
        for node in &rhs.nodes {
            for atom in &node.label.atoms {
                atom.variables(&mut used);
            }
        }
        for edge in &rhs.edges {
            for atom in &edge.label.atoms {
                atom.variables(&mut used);
            }
        }
        for id in used {
            variables[id].used_by_rule = true;
        }
    }

    fn mark_degree_arguments(lhs: &mut RuleGraph, rhs: &RuleGraph, condition: &Option<Condition>) {
        let mut references = Vec::new();
        for node in &rhs.nodes {
            for atom in &node.label.atoms {
                atom.degree_nodes(&mut references);
            }
        }
        for edge in &rhs.edges {
            for atom in &edge.label.atoms {
                atom.degree_nodes(&mut references);
            }
        }
        if let Some(condition) = condition {
            for predicate in &condition.predicates {
                predicate_atoms(&predicate.kind, |atom| atom.degree_nodes(&mut references));
            }
        }
        for (node, indegree) in references {
            if indegree {
                lhs.nodes[node].indegree_arg = true;
            } else {
                lhs.nodes[node].outdegree_arg = true;
            }
        }
    }

    /// Decompose a condition into its predicate leaves, numbering them in
    /// evaluation order. `negated` tracks the parity of enclosing `not`s.
    fn decompose(
        &self,
        condition: &CondExp,
        negated: bool,
        predicates: &mut Vec<Predicate>,
    ) -> BoolExp {
        let leaf = |predicates: &mut Vec<Predicate>, kind: PredicateKind| {
            let id = predicates.len();
            predicates.push(Predicate { id, negated, kind });
            BoolExp::Pred(id)
        };
        match condition {
            CondExp::Int(name) => leaf(predicates, PredicateKind::IntCheck(self.variable(name).0)),
            CondExp::Char(name) => leaf(predicates, PredicateKind::CharCheck(self.variable(name).0)),
            CondExp::Str(name) => leaf(predicates, PredicateKind::StringCheck(self.variable(name).0)),
            CondExp::Atom(name) => leaf(predicates, PredicateKind::AtomCheck(self.variable(name).0)),
            CondExp::Edge {
                source,
                target,
                label,
            } => leaf(predicates, PredicateKind::Edge {
                source: self.left_node(source),
                target: self.left_node(target),
                label: label.as_ref().map(|label| self.label(label)),
            }),
            CondExp::Eq(left, right) => leaf(predicates, PredicateKind::Eq {
                left: left.iter().map(|atom| self.atom(atom)).collect(),
                right: right.iter().map(|atom| self.atom(atom)).collect(),
            }),
            CondExp::Neq(left, right) => leaf(predicates, PredicateKind::Neq {
                left: left.iter().map(|atom| self.atom(atom)).collect(),
                right: right.iter().map(|atom| self.atom(atom)).collect(),
            }),
            CondExp::Gt(left, right) => leaf(predicates, PredicateKind::Cmp {
                left: self.atom(left),
                right: self.atom(right),
                op: CmpOp::Gt,
            }),
            CondExp::Geq(left, right) => leaf(predicates, PredicateKind::Cmp {
                left: self.atom(left),
                right: self.atom(right),
                op: CmpOp::Geq,
            }),
            CondExp::Lt(left, right) => leaf(predicates, PredicateKind::Cmp {
                left: self.atom(left),
                right: self.atom(right),
                op: CmpOp::Lt,
            }),
            CondExp::Leq(left, right) => leaf(predicates, PredicateKind::Cmp {
                left: self.atom(left),
                right: self.atom(right),
                op: CmpOp::Leq,
            }),
            CondExp::Not(inner) => {
                BoolExp::Not(Box::new(self.decompose(inner, !negated, predicates)))
            }
            CondExp::And(left, right) => BoolExp::And(
                Box::new(self.decompose(left, negated, predicates)),
                Box::new(self.decompose(right, negated, predicates)),
            ),
            CondExp::Or(left, right) => BoolExp::Or(
                Box::new(self.decompose(left, negated, predicates)),
                Box::new(self.decompose(right, negated, predicates)),
            ),
        }
    }

    /// Attach each predicate to the left items that bind its inputs, so
    /// the matcher re-evaluates it as soon as a new input arrives.
    fn attach_predicates(lhs: &mut RuleGraph, condition: &Condition) {
        for predicate in &condition.predicates {
            let mut variables = Vec::new();
            let mut nodes = Vec::new();
            if let Some(id) = predicate.kind.checked_variable() {
                variables.push(id);
            }
            predicate_atoms(&predicate.kind, |atom| {
                atom.variables(&mut variables);
                let mut degrees = Vec::new();
                atom.degree_nodes(&mut degrees);
                nodes.extend(degrees.into_iter().map(|(node, _)| node));
            });
            if let PredicateKind::Edge { source, target, .. } = &predicate.kind {
                nodes.push(*source);
                nodes.push(*target);
            }
            for node in &mut lhs.nodes {
                let binds_variable = node.label.atoms.iter().any(|atom| {
                    let mut mentioned = Vec::new();
                    atom.variables(&mut mentioned);
                    mentioned.iter().any(|id| variables.contains(id))
                });
                if (binds_variable || nodes.contains(&node.index))
                    && !node.predicates.contains(&predicate.id)
                {
                    node.predicates.push(predicate.id);
                }
            }
            for edge in &mut lhs.edges {
                let binds_variable = edge.label.atoms.iter().any(|atom| {
                    let mut mentioned = Vec::new();
                    atom.variables(&mut mentioned);
                    mentioned.iter().any(|id| variables.contains(id))
                });
                if binds_variable && !edge.predicates.contains(&predicate.id) {
                    edge.predicates.push(predicate.id);
                }
            }
        }
    }
}

/// Visit every atom an individual predicate evaluates.
fn predicate_atoms(kind: &PredicateKind, mut visit: impl FnMut(&Atom)) {
    match kind {
        PredicateKind::IntCheck(_)
        | PredicateKind::CharCheck(_)
        | PredicateKind::StringCheck(_)
        | PredicateKind::AtomCheck(_) => {}
        PredicateKind::Edge { label, .. } => {
            if let Some(label) = label {
                label.atoms.iter().for_each(&mut visit);
            }
        }
        PredicateKind::Eq { left, right } | PredicateKind::Neq { left, right } => {
            left.iter().for_each(&mut visit);
            right.iter().for_each(&mut visit);
        }
        PredicateKind::Cmp { left, right, .. } => {
            visit(left);
            visit(right);
        }
    }
}

/// Variable ids a type-check predicate inspects; used when attaching
/// predicates to binding sites.
impl PredicateKind {
    pub fn checked_variable(&self) -> Option<usize> {
        match self {
            PredicateKind::IntCheck(id)
            | PredicateKind::CharCheck(id)
            | PredicateKind::StringCheck(id)
            | PredicateKind::AtomCheck(id) => Some(*id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{EdgeDecl, NodeDecl, VarDecl};

    fn node(id: &str) -> NodeDecl {
        NodeDecl {
            id: id.into(),
            root: false,
            label: LabelDecl::default(),
        }
    }

    fn edge(source: &str, target: &str) -> EdgeDecl {
        EdgeDecl {
            source: source.into(),
            target: target.into(),
            bidirectional: false,
            label: LabelDecl::default(),
        }
    }

    fn rule(name: &str) -> RuleDecl {
        RuleDecl {
            name: name.into(),
            variables: Vec::new(),
            lhs: GraphDecl::default(),
            rhs: GraphDecl::default(),
            interface: Vec::new(),
            condition: None,
        }
    }

    #[test]
    fn deleted_nodes_have_no_interface_image() {
        let mut decl = rule("delete");
        decl.lhs.nodes.push(node("a"));
        let compiled = transform(&decl);
        let lhs = compiled.lhs.unwrap();
        assert!(lhs.nodes[0].is_deleted());
        assert!(compiled.rhs.is_none());
        assert!(!compiled.is_predicate);
    }

    #[test]
    fn edge_interface_is_derived_from_endpoints() {
        let mut decl = rule("keepedge");
        decl.lhs.nodes.push(node("a"));
        decl.lhs.nodes.push(node("b"));
        decl.lhs.edges.push(edge("a", "b"));
        decl.rhs.nodes.push(node("a"));
        decl.rhs.nodes.push(node("b"));
        decl.rhs.edges.push(edge("a", "b"));
        decl.interface = vec!["a".into(), "b".into()];
        let compiled = transform(&decl);
        let lhs = compiled.lhs.unwrap();
        let rhs = compiled.rhs.unwrap();
        assert_eq!(lhs.edges[0].interface, Some(0));
        assert_eq!(rhs.edges[0].interface, Some(0));
        assert!(compiled.is_predicate);
    }

    #[test]
    fn unpaired_right_edge_is_added() {
        // Deleting an edge and adding its reverse: the orientations do not
        // line up, so both edges fall outside the interface.
        let mut decl = rule("reverse");
        decl.lhs.nodes.push(node("a"));
        decl.lhs.nodes.push(node("b"));
        decl.lhs.edges.push(edge("a", "b"));
        decl.rhs.nodes.push(node("a"));
        decl.rhs.nodes.push(node("b"));
        decl.rhs.edges.push(edge("b", "a"));
        decl.interface = vec!["a".into(), "b".into()];
        let compiled = transform(&decl);
        assert!(compiled.lhs.unwrap().edges[0].interface.is_none());
        assert!(compiled.rhs.unwrap().edges[0].interface.is_none());
        assert!(compiled.adds_edges);
        assert!(!compiled.adds_nodes);
    }

    #[test]
    fn degrees_count_loops_and_bidirectional_edges() {
        let mut decl = rule("degrees");
        decl.lhs.nodes.push(node("a"));
        decl.lhs.nodes.push(node("b"));
        decl.lhs.edges.push(edge("a", "a"));
        let mut bidi = edge("a", "b");
        bidi.bidirectional = true;
        decl.lhs.edges.push(bidi);
        let compiled = transform(&decl);
        let lhs = compiled.lhs.unwrap();
        assert_eq!(
            (lhs.nodes[0].indegree, lhs.nodes[0].outdegree, lhs.nodes[0].bidegree),
            (1, 1, 1)
        );
        assert_eq!(
            (lhs.nodes[1].indegree, lhs.nodes[1].outdegree, lhs.nodes[1].bidegree),
            (0, 0, 1)
        );
        assert!(lhs.edges[0].is_loop());
    }

    #[test]
    fn relabelled_and_root_changed_flags() {
        let mut decl = rule("paint");
        decl.lhs.nodes.push(node("a"));
        let mut painted = node("a");
        painted.root = true;
        painted.label.mark = Mark::Red;
        decl.rhs.nodes.push(painted);
        decl.interface = vec!["a".into()];
        let compiled = transform(&decl);
        let rhs = compiled.rhs.unwrap();
        assert!(rhs.nodes[0].relabelled);
        assert!(rhs.nodes[0].root_changed);
        assert!(!compiled.is_predicate);
    }

    #[test]
    fn condition_decomposes_into_predicates() {
        let mut decl = rule("bound");
        decl.variables.push(VarDecl {
            name: "x".into(),
            vtype: VarType::Int,
        });
        let mut n = node("a");
        n.label.list = vec![AtomExp::Var("x".into())];
        decl.lhs.nodes.push(n.clone());
        decl.rhs.nodes.push(n);
        decl.interface = vec!["a".into()];
        decl.condition = Some(CondExp::And(
            Box::new(CondExp::Gt(AtomExp::Var("x".into()), AtomExp::Int(0))),
            Box::new(CondExp::Not(Box::new(CondExp::Str("x".into())))),
        ));
        let compiled = transform(&decl);
        let condition = compiled.condition.unwrap();
        assert_eq!(condition.predicates.len(), 2);
        assert!(!condition.predicates[0].negated);
        assert!(condition.predicates[1].negated);
        // Both predicates mention x, which node a binds.
        let lhs = compiled.lhs.unwrap();
        assert_eq!(lhs.nodes[0].predicates, vec![0, 1]);
    }

    #[test]
    fn degree_operators_flag_their_nodes() {
        let mut decl = rule("fanout");
        decl.lhs.nodes.push(node("a"));
        let mut relabelled = node("a");
        relabelled.label.list = vec![AtomExp::Outdeg("a".into())];
        decl.rhs.nodes.push(relabelled);
        decl.interface = vec!["a".into()];
        let compiled = transform(&decl);
        let lhs = compiled.lhs.unwrap();
        assert!(lhs.nodes[0].outdegree_arg);
        assert!(!lhs.nodes[0].indegree_arg);
    }

    #[test]
    fn list_variable_position_is_recorded() {
        let mut decl = rule("split");
        decl.variables.push(VarDecl {
            name: "rest".into(),
            vtype: VarType::List,
        });
        let mut n = node("a");
        n.label.list = vec![AtomExp::Int(1), AtomExp::Var("rest".into())];
        decl.lhs.nodes.push(n);
        let compiled = transform(&decl);
        let lhs = compiled.lhs.unwrap();
        assert_eq!(lhs.nodes[0].label.list_variable, Some(1));
    }
}
