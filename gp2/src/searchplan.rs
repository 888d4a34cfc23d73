// Copyright 2026 The GP2 Project Developers

//! Search-plan generation.
//!
//! A search plan is an ordered list of operations that covers every node
//! and edge of a rule's left graph exactly once. The generator prefers a
//! connected traversal: it starts from root nodes, walks out over incident
//! edges, and only falls back to an isolated start when a component has no
//! planned entry point. Ties break by ascending index, so plans (and the
//! matchers generated from them) are reproducible.

use std::fmt;

use crate::ir::{RuleEdge, RuleGraph, RuleNode};

/// One step of a search plan. The tag letters are stable and appear in
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// `r`: match a root node against the host's root chain.
    RootNode,
    /// `n`: match a node against all host nodes.
    Node,
    /// `i`: match a node as the target of the edge just matched.
    NodeFromInEdge,
    /// `o`: match a node as the source of the edge just matched.
    NodeFromOutEdge,
    /// `b`: match a node as either endpoint of a bidirectional edge.
    NodeFromBiEdge,
    /// `e`: match an edge against all host edges.
    Edge,
    /// `s`: match an edge from its already-matched source.
    EdgeFromSource,
    /// `t`: match an edge from its already-matched target.
    EdgeFromTarget,
    /// `l`: match a loop at an already-matched node.
    Loop,
}

impl OpKind {
    pub fn tag(self) -> char {
        match self {
            OpKind::RootNode => 'r',
            OpKind::Node => 'n',
            OpKind::NodeFromInEdge => 'i',
            OpKind::NodeFromOutEdge => 'o',
            OpKind::NodeFromBiEdge => 'b',
            OpKind::Edge => 'e',
            OpKind::EdgeFromSource => 's',
            OpKind::EdgeFromTarget => 't',
            OpKind::Loop => 'l',
        }
    }

    pub fn is_node(self) -> bool {
        matches!(
            self,
            OpKind::RootNode
                | OpKind::Node
                | OpKind::NodeFromInEdge
                | OpKind::NodeFromOutEdge
                | OpKind::NodeFromBiEdge
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOp {
    pub kind: OpKind,
    /// Index of the targeted left node or edge.
    pub index: usize,
}

#[derive(Debug, Default)]
pub struct SearchPlan {
    pub ops: Vec<SearchOp>,
}

impl fmt::Display for SearchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, op) in self.ops.iter().enumerate() {
            if position > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}{}", op.kind.tag(), op.index)?;
        }
        Ok(())
    }
}

struct Planner<'a> {
    graph: &'a RuleGraph,
    node_visited: Vec<bool>,
    edge_visited: Vec<bool>,
    ops: Vec<SearchOp>,
}

/// Generate the search plan for a left graph.
pub fn generate(graph: &RuleGraph) -> SearchPlan {
    let mut planner = Planner {
        graph,
        node_visited: vec![false; graph.nodes.len()],
        edge_visited: vec![false; graph.edges.len()],
        ops: Vec::new(),
    };
    // Rooted nodes seed the traversal; fast root matching is the point of
    // having them.
    for node in &graph.nodes {
        if node.root && !planner.node_visited[node.index] {
            planner.traverse_node(node, OpKind::RootNode);
        }
    }
    // Any component without a root gets an isolated start.
    for node in &graph.nodes {
        if !planner.node_visited[node.index] {
            planner.traverse_node(node, OpKind::Node);
        }
    }
    // Leftover edges; unreachable in practice since every edge is incident
    // to a traversed node, but kept as a safety net.
    for edge in &graph.edges {
        if !planner.edge_visited[edge.index] {
            planner.edge_visited[edge.index] = true;
            planner.ops.push(SearchOp {
                kind: OpKind::Edge,
                index: edge.index,
            });
        }
    }
    SearchPlan { ops: planner.ops }
}

impl<'a> Planner<'a> {
    fn traverse_node(&mut self, node: &'a RuleNode, kind: OpKind) {
        self.node_visited[node.index] = true;
        self.ops.push(SearchOp {
            kind,
            index: node.index,
        });
        // Plan this node's incident edges: outgoing first, then incoming,
        // each in index order.
        let graph = self.graph;
        for edge in &graph.edges {
            if !self.edge_visited[edge.index] && edge.source == node.index {
                self.traverse_edge(edge, true);
            }
        }
        for edge in &graph.edges {
            if !self.edge_visited[edge.index] && edge.target == node.index {
                self.traverse_edge(edge, false);
            }
        }
    }

    fn traverse_edge(&mut self, edge: &'a RuleEdge, from_source: bool) {
        self.edge_visited[edge.index] = true;
        if edge.is_loop() {
            self.ops.push(SearchOp {
                kind: OpKind::Loop,
                index: edge.index,
            });
            return;
        }
        self.ops.push(SearchOp {
            kind: if from_source {
                OpKind::EdgeFromSource
            } else {
                OpKind::EdgeFromTarget
            },
            index: edge.index,
        });
        // The far endpoint is matched next, straight off this edge.
        let far = if from_source { edge.target } else { edge.source };
        if !self.node_visited[far] {
            let kind = if edge.bidirectional {
                OpKind::NodeFromBiEdge
            } else if from_source {
                OpKind::NodeFromInEdge
            } else {
                OpKind::NodeFromOutEdge
            };
            let graph = self.graph;
            self.traverse_node(&graph.nodes[far], kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{EdgeDecl, GraphDecl, LabelDecl, NodeDecl, RuleDecl};
    use crate::ir;

    fn node(id: &str, root: bool) -> NodeDecl {
        NodeDecl {
            id: id.into(),
            root,
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

    fn left_graph(nodes: Vec<NodeDecl>, edges: Vec<EdgeDecl>) -> ir::RuleGraph {
        let decl = RuleDecl {
            name: "plan".into(),
            variables: Vec::new(),
            lhs: GraphDecl { nodes, edges },
            rhs: GraphDecl::default(),
            interface: Vec::new(),
            condition: None,
        };
        ir::transform(&decl).lhs.unwrap()
    }

    fn tags(plan: &SearchPlan) -> String {
        format!("{}", plan)
    }

    /// Every left item is the target of exactly one operation.
    fn assert_covers(plan: &SearchPlan, graph: &ir::RuleGraph) {
        let mut nodes = vec![0usize; graph.nodes.len()];
        let mut edges = vec![0usize; graph.edges.len()];
        for op in &plan.ops {
            if op.kind.is_node() {
                nodes[op.index] += 1;
            } else {
                edges[op.index] += 1;
            }
        }
        assert!(nodes.iter().all(|&count| count == 1), "{:?}", nodes);
        assert!(edges.iter().all(|&count| count == 1), "{:?}", edges);
    }

    #[test]
    fn path_graph_is_traversed_connectedly() {
        let graph = left_graph(
            vec![node("a", false), node("b", false), node("c", false)],
            vec![edge("a", "b"), edge("b", "c")],
        );
        let plan = generate(&graph);
        assert_eq!(tags(&plan), "n0 s0 i1 s1 i2");
        assert_covers(&plan, &graph);
    }

    #[test]
    fn root_nodes_seed_the_plan() {
        let graph = left_graph(
            vec![node("a", false), node("b", true)],
            vec![edge("a", "b")],
        );
        let plan = generate(&graph);
        // The root node starts; the edge is found from its target.
        assert_eq!(tags(&plan), "r1 t0 o0");
        assert_covers(&plan, &graph);
    }

    #[test]
    fn loops_use_the_loop_operation() {
        let graph = left_graph(vec![node("a", false)], vec![edge("a", "a")]);
        let plan = generate(&graph);
        assert_eq!(tags(&plan), "n0 l0");
        assert_covers(&plan, &graph);
    }

    #[test]
    fn bidirectional_edges_plan_their_far_endpoint_as_b() {
        let mut bidi = edge("a", "b");
        bidi.bidirectional = true;
        let graph = left_graph(vec![node("a", false), node("b", false)], vec![bidi]);
        let plan = generate(&graph);
        assert_eq!(tags(&plan), "n0 s0 b1");
        assert_covers(&plan, &graph);
    }

    #[test]
    fn disconnected_components_restart_in_isolation() {
        let graph = left_graph(
            vec![node("a", false), node("b", false), node("c", false), node("d", false)],
            vec![edge("a", "b"), edge("c", "d")],
        );
        let plan = generate(&graph);
        assert_eq!(tags(&plan), "n0 s0 i1 n2 s1 i3");
        assert_covers(&plan, &graph);
    }

    #[test]
    fn dense_graphs_are_fully_covered() {
        let graph = left_graph(
            vec![node("a", true), node("b", false), node("c", false)],
            vec![
                edge("a", "b"),
                edge("b", "a"),
                edge("b", "c"),
                edge("c", "c"),
                edge("a", "c"),
            ],
        );
        let plan = generate(&graph);
        assert_covers(&plan, &graph);
        // Deterministic: generating twice yields the same plan.
        assert_eq!(tags(&plan), tags(&generate(&graph)));
    }
}
