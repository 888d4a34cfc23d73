//! The host-graph input format.
//!
//! Host graphs are produced by an external parser; this module defines the
//! hand-off format (JSON) and builds the in-memory graph from it. Node
//! identifiers are strings scoped to the file; edges refer to them by
//! identifier.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::error::HostError;
use crate::label::{HostAtom, HostLabel, Mark};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct HostSpec {
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    #[serde(default)]
    pub root: bool,
    #[serde(default)]
    pub mark: Mark,
    #[serde(default)]
    pub list: Vec<HostAtom>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub mark: Mark,
    #[serde(default)]
    pub list: Vec<HostAtom>,
}

/// Read a host-graph file and populate the engine's graph.
pub fn load(path: &Path, engine: &mut Engine) -> Result<(), HostError> {
    let contents = fs::read_to_string(path)
        .map_err(|error| HostError::new(format!("read {}: {}", path.display(), error)))?;
    let spec: HostSpec = serde_json::from_str(&contents)
        .map_err(|error| HostError::new(format!("parse {}: {}", path.display(), error)))?;
    build(&spec, engine)
}

/// Build the host graph described by a spec. Marks are taken as given;
/// `any` is not a concrete mark and is rejected.
pub fn build(spec: &HostSpec, engine: &mut Engine) -> Result<(), HostError> {
    let mut indices: HashMap<&str, usize> = HashMap::new();
    for node in &spec.nodes {
        if node.mark == Mark::Any {
            return Err(HostError::new(format!(
                "node {}: the any mark is not a host mark",
                node.id
            )));
        }
        if indices.contains_key(node.id.as_str()) {
            return Err(HostError::new(format!("duplicate node id {}", node.id)));
        }
        let list = engine.intern(node.list.clone());
        let index = engine
            .host
            .add_node(node.root, HostLabel::new(node.mark, list));
        indices.insert(&node.id, index);
    }
    for edge in &spec.edges {
        if edge.mark == Mark::Any {
            return Err(HostError::new(
                "the any mark is not a host mark".to_owned(),
            ));
        }
        let source = *indices
            .get(edge.source.as_str())
            .ok_or_else(|| HostError::new(format!("unknown edge source {}", edge.source)))?;
        let target = *indices
            .get(edge.target.as_str())
            .ok_or_else(|| HostError::new(format!("unknown edge target {}", edge.target)))?;
        let list = engine.intern(edge.list.clone());
        engine
            .host
            .add_edge(HostLabel::new(edge.mark, list), source, target);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use slog::{o, Logger};

    fn quiet_engine() -> Engine {
        Engine::with_logger(Logger::root(slog::Discard, o!()))
    }

    #[test]
    fn builds_a_path_graph() {
        let spec: HostSpec = serde_json::from_str(
            r#"{
                "nodes": [
                    {"id": "a"},
                    {"id": "b", "root": true, "mark": "red", "list": [3, "z"]},
                    {"id": "c"}
                ],
                "edges": [
                    {"source": "a", "target": "b"},
                    {"source": "b", "target": "c"}
                ]
            }"#,
        )
        .unwrap();
        let mut engine = quiet_engine();
        build(&spec, &mut engine).unwrap();
        assert_eq!(engine.host.number_of_nodes(), 3);
        assert_eq!(engine.host.number_of_edges(), 2);
        assert_eq!(engine.host.root_indices().count(), 1);
        let b = engine.host.root_indices().next().unwrap();
        assert_eq!(engine.host.node_ref(b).label.mark, Mark::Red);
        assert_eq!(
            engine.host.node_ref(b).label.atoms(),
            &[HostAtom::Int(3), HostAtom::Str("z".into())]
        );
    }

    #[test]
    fn rejects_unknown_endpoints() {
        let spec: HostSpec = serde_json::from_str(
            r#"{"nodes": [{"id": "a"}], "edges": [{"source": "a", "target": "b"}]}"#,
        )
        .unwrap();
        let mut engine = quiet_engine();
        let error = build(&spec, &mut engine).unwrap_err();
        assert!(error.to_string().contains("unknown edge target"));
    }

    #[test]
    fn equal_labels_share_one_list() {
        let spec: HostSpec = serde_json::from_str(
            r#"{"nodes": [
                {"id": "a", "list": [1, 2]},
                {"id": "b", "list": [1, 2]}
            ]}"#,
        )
        .unwrap();
        let mut engine = quiet_engine();
        build(&spec, &mut engine).unwrap();
        assert_eq!(engine.store.len(), 1);
        let labels: Vec<_> = engine
            .host
            .node_indices()
            .map(|index| engine.host.node_ref(index).label.clone())
            .collect();
        assert!(std::rc::Rc::ptr_eq(
            labels[0].list().unwrap(),
            labels[1].list().unwrap()
        ));
    }
}
