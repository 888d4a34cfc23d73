// Copyright 2026 The GP2 Project Developers

//! The host graph: a directed multigraph with stable item indices.
//!
//! Nodes and edges live in slot arrays; removing an item frees its slot
//! onto a LIFO free list. Rollback replays trail records in reverse order,
//! so a re-added item always reclaims the index it had when it was
//! removed. Root nodes are additionally threaded through a chain kept in
//! insertion order, which fixes the iteration order of root-matching
//! search operations.

use std::fmt;

use crate::label::HostLabel;

#[derive(Debug)]
pub struct Node {
    pub index: usize,
    pub root: bool,
    pub label: HostLabel,
    out_edges: Vec<usize>,
    in_edges: Vec<usize>,
}

impl Node {
    pub fn outdegree(&self) -> usize {
        self.out_edges.len()
    }

    pub fn indegree(&self) -> usize {
        self.in_edges.len()
    }

    pub fn out_edges(&self) -> &[usize] {
        &self.out_edges
    }

    pub fn in_edges(&self) -> &[usize] {
        &self.in_edges
    }

    /// Degree filter for a preserved left-hand node: the host node must
    /// offer at least the rule node's degrees, with enough slack for its
    /// bidirectional edges.
    pub fn has_degrees_at_least(&self, indegree: usize, outdegree: usize, bidegree: usize) -> bool {
        self.indegree() >= indegree
            && self.outdegree() >= outdegree
            && self.indegree() + self.outdegree() >= indegree + outdegree + bidegree
    }

    /// Degree filter for a deleted left-hand node: every incident host
    /// edge must be matched by the rule, so the total degree is pinned
    /// exactly.
    pub fn has_degrees_exactly(&self, indegree: usize, outdegree: usize, bidegree: usize) -> bool {
        self.indegree() >= indegree
            && self.outdegree() >= outdegree
            && self.indegree() + self.outdegree() == indegree + outdegree + bidegree
    }
}

#[derive(Debug)]
pub struct Edge {
    pub index: usize,
    pub label: HostLabel,
    pub source: usize,
    pub target: usize,
}

impl Edge {
    pub fn is_loop(&self) -> bool {
        self.source == self.target
    }
}

#[derive(Debug, Default)]
pub struct HostGraph {
    nodes: Vec<Option<Node>>,
    edges: Vec<Option<Edge>>,
    free_nodes: Vec<usize>,
    free_edges: Vec<usize>,
    roots: Vec<usize>,
    node_count: usize,
    edge_count: usize,
}

impl HostGraph {
    pub fn new() -> Self {
        HostGraph::default()
    }

    pub fn number_of_nodes(&self) -> usize {
        self.node_count
    }

    pub fn number_of_edges(&self) -> usize {
        self.edge_count
    }

    pub fn add_node(&mut self, root: bool, label: HostLabel) -> usize {
        let index = match self.free_nodes.pop() {
            Some(index) => index,
            None => {
                self.nodes.push(None);
                self.nodes.len() - 1
            }
        };
        self.nodes[index] = Some(Node {
            index,
            root,
            label,
            out_edges: Vec::new(),
            in_edges: Vec::new(),
        });
        if root {
            self.roots.push(index);
        }
        self.node_count += 1;
        index
    }

    pub fn add_edge(&mut self, label: HostLabel, source: usize, target: usize) -> usize {
        debug_assert!(self.node(source).is_some(), "edge source must exist");
        debug_assert!(self.node(target).is_some(), "edge target must exist");
        let index = match self.free_edges.pop() {
            Some(index) => index,
            None => {
                self.edges.push(None);
                self.edges.len() - 1
            }
        };
        self.edges[index] = Some(Edge {
            index,
            label,
            source,
            target,
        });
        self.nodes[source]
            .as_mut()
            .expect("edge source must exist")
            .out_edges
            .push(index);
        self.nodes[target]
            .as_mut()
            .expect("edge target must exist")
            .in_edges
            .push(index);
        self.edge_count += 1;
        index
    }

    /// Remove a node and return it. The caller guarantees the node has no
    /// incident edges; the matcher's dangling filter enforces this for
    /// generated code.
    pub fn remove_node(&mut self, index: usize) -> Node {
        let node = self.nodes[index].take().expect("node must exist");
        debug_assert!(
            node.out_edges.is_empty() && node.in_edges.is_empty(),
            "removed node must have no incident edges"
        );
        if node.root {
            self.roots.retain(|&root| root != index);
        }
        self.free_nodes.push(index);
        self.node_count -= 1;
        node
    }

    pub fn remove_edge(&mut self, index: usize) -> Edge {
        let edge = self.edges[index].take().expect("edge must exist");
        if let Some(source) = self.nodes[edge.source].as_mut() {
            source.out_edges.retain(|&out| out != index);
        }
        if let Some(target) = self.nodes[edge.target].as_mut() {
            target.in_edges.retain(|&incoming| incoming != index);
        }
        self.free_edges.push(index);
        self.edge_count -= 1;
        edge
    }

    /// Replace a node's label, returning the previous one.
    pub fn relabel_node(&mut self, index: usize, label: HostLabel) -> HostLabel {
        let node = self.nodes[index].as_mut().expect("node must exist");
        std::mem::replace(&mut node.label, label)
    }

    pub fn relabel_edge(&mut self, index: usize, label: HostLabel) -> HostLabel {
        let edge = self.edges[index].as_mut().expect("edge must exist");
        std::mem::replace(&mut edge.label, label)
    }

    /// Toggle a node's root flag, maintaining the root chain.
    pub fn change_root(&mut self, index: usize) {
        let node = self.nodes[index].as_mut().expect("node must exist");
        node.root = !node.root;
        if node.root {
            self.roots.push(index);
        } else {
            self.roots.retain(|&root| root != index);
        }
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index).and_then(|slot| slot.as_ref())
    }

    pub fn edge(&self, index: usize) -> Option<&Edge> {
        self.edges.get(index).and_then(|slot| slot.as_ref())
    }

    /// Like `node`, for positions generated code knows to be occupied.
    pub fn node_ref(&self, index: usize) -> &Node {
        self.node(index).expect("node index out of date")
    }

    pub fn edge_ref(&self, index: usize) -> &Edge {
        self.edge(index).expect("edge index out of date")
    }

    pub fn indegree(&self, index: usize) -> usize {
        self.node_ref(index).indegree()
    }

    pub fn outdegree(&self, index: usize) -> usize {
        self.node_ref(index).outdegree()
    }

    /// Occupied node indices, ascending.
    pub fn node_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|_| index))
    }

    /// Occupied edge indices, ascending.
    pub fn edge_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|_| index))
    }

    /// Root-node indices, front to back in insertion order.
    pub fn root_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.roots.iter().copied()
    }
}

impl fmt::Display for HostGraph {
    /// Prints the standard `[ nodes | edges ]` host-graph form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[")?;
        for index in self.node_indices() {
            let node = self.node_ref(index);
            let root = if node.root { " (R)" } else { "" };
            writeln!(f, "  (n{}{}, {})", index, root, node.label)?;
        }
        writeln!(f, "  |")?;
        for index in self.edge_indices() {
            let edge = self.edge_ref(index);
            writeln!(
                f,
                "  (e{}, n{}, n{}, {})",
                index, edge.source, edge.target, edge.label
            )?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::{HostAtom, ListStore, Mark};

    #[test]
    fn indices_are_stable_across_removal() {
        let mut graph = HostGraph::new();
        let a = graph.add_node(false, HostLabel::blank());
        let b = graph.add_node(false, HostLabel::blank());
        let c = graph.add_node(false, HostLabel::blank());
        graph.remove_node(b);
        assert_eq!(graph.node_ref(a).index, a);
        assert_eq!(graph.node_ref(c).index, c);
        assert!(graph.node(b).is_none());
        assert_eq!(graph.number_of_nodes(), 2);
    }

    #[test]
    fn freed_indices_are_reused_lifo() {
        let mut graph = HostGraph::new();
        let a = graph.add_node(false, HostLabel::blank());
        let b = graph.add_node(false, HostLabel::blank());
        graph.remove_node(a);
        graph.remove_node(b);
        assert_eq!(graph.add_node(false, HostLabel::blank()), b);
        assert_eq!(graph.add_node(false, HostLabel::blank()), a);
    }

    #[test]
    fn incidence_and_degrees() {
        let mut graph = HostGraph::new();
        let a = graph.add_node(false, HostLabel::blank());
        let b = graph.add_node(false, HostLabel::blank());
        let e = graph.add_edge(HostLabel::blank(), a, b);
        let l = graph.add_edge(HostLabel::blank(), b, b);
        assert_eq!(graph.outdegree(a), 1);
        assert_eq!(graph.indegree(b), 2);
        assert_eq!(graph.outdegree(b), 1);
        assert!(graph.edge_ref(l).is_loop());
        assert!(!graph.edge_ref(e).is_loop());
        graph.remove_edge(e);
        assert_eq!(graph.outdegree(a), 0);
        assert_eq!(graph.indegree(b), 1);
    }

    #[test]
    fn root_chain_is_insertion_ordered() {
        let mut graph = HostGraph::new();
        let a = graph.add_node(true, HostLabel::blank());
        let b = graph.add_node(false, HostLabel::blank());
        let c = graph.add_node(true, HostLabel::blank());
        assert_eq!(graph.root_indices().collect::<Vec<_>>(), vec![a, c]);
        graph.change_root(b);
        assert_eq!(graph.root_indices().collect::<Vec<_>>(), vec![a, c, b]);
        graph.change_root(a);
        assert_eq!(graph.root_indices().collect::<Vec<_>>(), vec![c, b]);
    }

    #[test]
    fn degree_filters() {
        let mut graph = HostGraph::new();
        let a = graph.add_node(false, HostLabel::blank());
        graph.add_edge(HostLabel::blank(), a, a);
        let node = graph.node_ref(a);
        // One loop: indegree 1, outdegree 1.
        assert!(node.has_degrees_at_least(1, 1, 0));
        assert!(node.has_degrees_at_least(0, 0, 0));
        assert!(!node.has_degrees_at_least(2, 0, 0));
        // A deleted rule node with no incident rule edges must match an
        // isolated host node.
        assert!(!node.has_degrees_exactly(0, 0, 0));
        assert!(node.has_degrees_exactly(1, 1, 0));
    }

    #[test]
    fn display_form() {
        let mut store = ListStore::new();
        let mut graph = HostGraph::new();
        let a = graph.add_node(true, HostLabel::blank());
        let b = graph.add_node(
            false,
            HostLabel::new(Mark::Red, store.intern(vec![HostAtom::Int(5)])),
        );
        graph.add_edge(HostLabel::blank(), a, b);
        let printed = format!("{}", graph);
        assert!(printed.contains("(n0 (R), empty)"));
        assert!(printed.contains("(n1, 5 # red)"));
        assert!(printed.contains("(e0, n0, n1, empty)"));
    }
}
