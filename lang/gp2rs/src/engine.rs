// Copyright 2026 The GP2 Project Developers

//! The engine bundles the process-wide state of one program execution:
//! the host graph, the list store, the undo trail, and a logger. All host
//! mutation performed by generated appliers goes through the engine so
//! that trail recording and list-store reference counts stay consistent.

use std::rc::Rc;

use slog::{debug, o, trace, Drain, Logger};

use crate::graph::HostGraph;
use crate::label::{HostAtom, HostLabel, HostList, ListStore};
use crate::trail::{Change, ChangeStack};

pub struct Engine {
    pub host: HostGraph,
    pub store: ListStore,
    pub trail: ChangeStack,
    pub log: Logger,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An engine with a terminal logger filtered by `RUST_LOG`.
    pub fn new() -> Self {
        let decorator = slog_term::TermDecorator::new().build();
        let drain = slog_term::FullFormat::new(decorator).build().fuse();
        let drain = slog_envlogger::new(drain);
        let drain = slog_async::Async::new(drain).build().fuse();
        Self::with_logger(Logger::root(drain, o!()))
    }

    pub fn with_logger(log: Logger) -> Self {
        Engine {
            host: HostGraph::new(),
            store: ListStore::new(),
            trail: ChangeStack::new(),
            log,
        }
    }

    /// Intern an atom list built by generated label evaluation code.
    pub fn intern(&mut self, atoms: Vec<HostAtom>) -> Option<Rc<HostList>> {
        self.store.intern(atoms)
    }

    pub fn add_node(&mut self, root: bool, label: HostLabel, record: bool) -> usize {
        let index = self.host.add_node(root, label);
        trace!(self.log, "add node"; "index" => index, "root" => root);
        if record {
            self.trail.push(Change::AddedNode { index });
        }
        index
    }

    pub fn add_edge(&mut self, label: HostLabel, source: usize, target: usize, record: bool) -> usize {
        let index = self.host.add_edge(label, source, target);
        trace!(self.log, "add edge"; "index" => index, "source" => source, "target" => target);
        if record {
            self.trail.push(Change::AddedEdge { index });
        }
        index
    }

    pub fn remove_node(&mut self, index: usize, record: bool) {
        trace!(self.log, "remove node"; "index" => index);
        let node = self.host.remove_node(index);
        if record {
            self.trail.push(Change::RemovedNode {
                root: node.root,
                label: node.label,
            });
        } else if let Some(list) = node.label.list() {
            self.store.release(list);
        }
    }

    pub fn remove_edge(&mut self, index: usize, record: bool) {
        trace!(self.log, "remove edge"; "index" => index);
        let edge = self.host.remove_edge(index);
        if record {
            self.trail.push(Change::RemovedEdge {
                label: edge.label,
                source: edge.source,
                target: edge.target,
            });
        } else if let Some(list) = edge.label.list() {
            self.store.release(list);
        }
    }

    pub fn relabel_node(&mut self, index: usize, label: HostLabel, record: bool) {
        let previous = self.host.relabel_node(index, label);
        if record {
            self.trail.push(Change::RelabelledNode {
                index,
                label: previous,
            });
        } else if let Some(list) = previous.list() {
            self.store.release(list);
        }
    }

    pub fn relabel_edge(&mut self, index: usize, label: HostLabel, record: bool) {
        let previous = self.host.relabel_edge(index, label);
        if record {
            self.trail.push(Change::RelabelledEdge {
                index,
                label: previous,
            });
        } else if let Some(list) = previous.list() {
            self.store.release(list);
        }
    }

    pub fn change_root(&mut self, index: usize, record: bool) {
        self.host.change_root(index);
        if record {
            self.trail.push(Change::ChangedRoot { index });
        }
    }

    /// Current trail depth, used to open a rollback scope.
    pub fn mark(&self) -> usize {
        self.trail.depth()
    }

    /// Replay all records above `mark` in LIFO order, restoring the host
    /// to its state when the mark was taken.
    pub fn rollback(&mut self, mark: usize) {
        debug!(self.log, "rollback"; "records" => self.trail.depth() - mark);
        while self.trail.depth() > mark {
            match self.trail.pop().expect("trail underflow") {
                Change::RemovedNode { root, label } => {
                    self.host.add_node(root, label);
                }
                Change::RemovedEdge {
                    label,
                    source,
                    target,
                } => {
                    self.host.add_edge(label, source, target);
                }
                Change::RelabelledNode { index, label } => {
                    let displaced = self.host.relabel_node(index, label);
                    if let Some(list) = displaced.list() {
                        self.store.release(list);
                    }
                }
                Change::RelabelledEdge { index, label } => {
                    let displaced = self.host.relabel_edge(index, label);
                    if let Some(list) = displaced.list() {
                        self.store.release(list);
                    }
                }
                Change::AddedNode { index } => {
                    let node = self.host.remove_node(index);
                    if let Some(list) = node.label.list() {
                        self.store.release(list);
                    }
                }
                Change::AddedEdge { index } => {
                    let edge = self.host.remove_edge(index);
                    if let Some(list) = edge.label.list() {
                        self.store.release(list);
                    }
                }
                Change::ChangedRoot { index } => {
                    self.host.change_root(index);
                }
            }
        }
    }

    /// Discard all records above `mark`, keeping the edits. Labels the
    /// trail was keeping alive are released.
    pub fn commit(&mut self, mark: usize) {
        debug!(self.log, "commit"; "records" => self.trail.depth() - mark);
        while self.trail.depth() > mark {
            match self.trail.pop().expect("trail underflow") {
                Change::RemovedNode { label, .. }
                | Change::RemovedEdge { label, .. }
                | Change::RelabelledNode { label, .. }
                | Change::RelabelledEdge { label, .. } => {
                    if let Some(list) = label.list() {
                        self.store.release(list);
                    }
                }
                Change::AddedNode { .. } | Change::AddedEdge { .. } | Change::ChangedRoot { .. } => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::Mark;

    fn quiet_engine() -> Engine {
        Engine::with_logger(Logger::root(slog::Discard, o!()))
    }

    fn int_label(engine: &mut Engine, values: &[i64]) -> HostLabel {
        let atoms = values.iter().map(|value| HostAtom::Int(*value)).collect();
        let list = engine.intern(atoms);
        HostLabel::new(Mark::None, list)
    }

    #[test]
    fn edge_removal_rolls_back() {
        let mut engine = quiet_engine();
        let a = engine.add_node(false, HostLabel::blank(), false);
        let b = engine.add_node(false, HostLabel::blank(), false);
        let e = engine.add_edge(HostLabel::blank(), a, b, false);

        let mark = engine.mark();
        engine.remove_edge(e, true);
        assert_eq!(engine.host.number_of_edges(), 0);
        assert_eq!(engine.mark(), mark + 1);

        engine.rollback(mark);
        assert_eq!(engine.host.number_of_edges(), 1);
        let edge = engine.host.edge_ref(e);
        assert_eq!((edge.source, edge.target), (a, b));
        assert!(engine.trail.is_empty());
    }

    #[test]
    fn relabelling_rolls_back() {
        let mut engine = quiet_engine();
        let a = engine.add_node(false, HostLabel::blank(), false);

        let mark = engine.mark();
        let red = HostLabel::new(Mark::Red, None);
        engine.relabel_node(a, red, true);
        assert_eq!(engine.host.node_ref(a).label.mark, Mark::Red);

        engine.rollback(mark);
        assert_eq!(engine.host.node_ref(a).label.mark, Mark::None);
    }

    #[test]
    fn mixed_edit_sequence_restores_exactly() {
        let mut engine = quiet_engine();
        let label = int_label(&mut engine, &[1, 2]);
        let a = engine.add_node(true, label, false);
        let b = engine.add_node(false, HostLabel::blank(), false);
        let e = engine.add_edge(HostLabel::blank(), a, b, false);

        let mark = engine.mark();
        engine.remove_edge(e, true);
        engine.remove_node(b, true);
        let relabel = int_label(&mut engine, &[9]);
        engine.relabel_node(a, relabel, true);
        engine.change_root(a, true);
        let c = engine.add_node(false, HostLabel::blank(), true);
        engine.add_edge(HostLabel::blank(), a, c, true);

        engine.rollback(mark);
        assert_eq!(engine.host.number_of_nodes(), 2);
        assert_eq!(engine.host.number_of_edges(), 1);
        assert!(engine.host.node_ref(a).root);
        assert_eq!(engine.host.node_ref(a).label.atoms().len(), 2);
        let edge = engine.host.edge_ref(e);
        assert_eq!((edge.source, edge.target), (a, b));
    }

    #[test]
    fn lifo_index_reuse_survives_interleaved_adds() {
        let mut engine = quiet_engine();
        let a = engine.add_node(false, HostLabel::blank(), false);
        let b = engine.add_node(false, HostLabel::blank(), false);

        let mark = engine.mark();
        engine.remove_node(b, true);
        // The freed slot is taken by a recorded add, then freed again on
        // rollback before the removed node is replayed.
        let c = engine.add_node(false, HostLabel::blank(), true);
        assert_eq!(c, b);
        engine.rollback(mark);
        assert_eq!(engine.host.number_of_nodes(), 2);
        assert!(engine.host.node(a).is_some());
        assert!(engine.host.node(b).is_some());
    }

    #[test]
    fn commit_releases_trail_labels() {
        let mut engine = quiet_engine();
        let label = int_label(&mut engine, &[4]);
        let a = engine.add_node(false, label, false);
        let b = engine.add_node(false, HostLabel::blank(), false);
        let edge_label = int_label(&mut engine, &[4]);
        let e = engine.add_edge(edge_label, a, b, false);
        assert_eq!(engine.store.len(), 1);

        let mark = engine.mark();
        engine.remove_edge(e, true);
        engine.commit(mark);
        // The node still owns the list; the edge's reference is gone.
        assert_eq!(engine.store.len(), 1);
        engine.remove_node(b, false);
        engine.remove_node(a, false);
        assert_eq!(engine.store.len(), 0);
    }
}
