// Copyright 2026 The GP2 Project Developers

//! The morphism built up during rule matching.
//!
//! A morphism maps left-hand nodes and edges to host items and carries the
//! variable assignments made while matching labels. The image arrays
//! double as the injectivity record: a host item is ineligible as a new
//! image exactly when it already appears in one. Generated matchers unwind
//! assignments and images in reverse order as the backtracking search
//! pops.

use crate::label::HostAtom;

/// A value assigned to a rule variable during label matching.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Str(String),
    List(Vec<HostAtom>),
}

impl Value {
    /// The GP 2 `length` of a value: atoms count 1, strings their
    /// character count, lists their element count.
    pub fn length(&self) -> i64 {
        match self {
            Value::Int(_) => 1,
            Value::Str(text) => text.chars().count() as i64,
            Value::List(atoms) => atoms.len() as i64,
        }
    }
}

#[derive(Debug)]
pub struct Morphism {
    node_images: Vec<Option<usize>>,
    edge_images: Vec<Option<usize>>,
    /// Number of assignments made while matching the corresponding item's
    /// label, popped again when the item is unmatched.
    node_assignments: Vec<usize>,
    edge_assignments: Vec<usize>,
    values: Vec<Option<Value>>,
    assigned: Vec<usize>,
}

impl Morphism {
    pub fn new(nodes: usize, edges: usize, variables: usize) -> Self {
        Morphism {
            node_images: vec![None; nodes],
            edge_images: vec![None; edges],
            node_assignments: vec![0; nodes],
            edge_assignments: vec![0; edges],
            values: vec![None; variables],
            assigned: Vec::with_capacity(variables),
        }
    }

    pub fn node_image(&self, left: usize) -> Option<usize> {
        self.node_images[left]
    }

    pub fn edge_image(&self, left: usize) -> Option<usize> {
        self.edge_images[left]
    }

    /// Image of a left node known to be matched; used by appliers, which
    /// only run on complete morphisms.
    pub fn mapped_node(&self, left: usize) -> usize {
        self.node_images[left].expect("left node is unmatched")
    }

    pub fn mapped_edge(&self, left: usize) -> usize {
        self.edge_images[left].expect("left edge is unmatched")
    }

    pub fn is_matched_node(&self, host: usize) -> bool {
        self.node_images.contains(&Some(host))
    }

    pub fn is_matched_edge(&self, host: usize) -> bool {
        self.edge_images.contains(&Some(host))
    }

    pub fn add_node_image(&mut self, left: usize, host: usize, assignments: usize) {
        self.node_images[left] = Some(host);
        self.node_assignments[left] = assignments;
    }

    pub fn remove_node_image(&mut self, left: usize) {
        self.node_images[left] = None;
        let count = std::mem::take(&mut self.node_assignments[left]);
        self.remove_assignments(count);
    }

    pub fn add_edge_image(&mut self, left: usize, host: usize, assignments: usize) {
        self.edge_images[left] = Some(host);
        self.edge_assignments[left] = assignments;
    }

    pub fn remove_edge_image(&mut self, left: usize) {
        self.edge_images[left] = None;
        let count = std::mem::take(&mut self.edge_assignments[left]);
        self.remove_assignments(count);
    }

    /// Assign an integer to a variable. Returns 1 if the variable was
    /// newly assigned, 0 if it already holds an equal value, and -1 on a
    /// clash.
    pub fn add_int_assignment(&mut self, variable: usize, value: i64) -> i32 {
        match &self.values[variable] {
            Some(Value::Int(existing)) if *existing == value => 0,
            Some(_) => -1,
            None => {
                self.values[variable] = Some(Value::Int(value));
                self.assigned.push(variable);
                1
            }
        }
    }

    pub fn add_string_assignment(&mut self, variable: usize, value: &str) -> i32 {
        match &self.values[variable] {
            Some(Value::Str(existing)) if existing == value => 0,
            Some(_) => -1,
            None => {
                self.values[variable] = Some(Value::Str(value.to_owned()));
                self.assigned.push(variable);
                1
            }
        }
    }

    /// Assign a single host atom to an atom-typed variable.
    pub fn add_atom_assignment(&mut self, variable: usize, atom: &HostAtom) -> i32 {
        let value = match atom {
            HostAtom::Int(value) => Value::Int(*value),
            HostAtom::Str(value) => Value::Str(value.clone()),
        };
        match &self.values[variable] {
            Some(existing) if *existing == value => 0,
            Some(_) => -1,
            None => {
                self.values[variable] = Some(value);
                self.assigned.push(variable);
                1
            }
        }
    }

    /// Assign a contiguous host sublist to a list-typed variable.
    pub fn add_list_assignment(&mut self, variable: usize, atoms: &[HostAtom]) -> i32 {
        match &self.values[variable] {
            Some(Value::List(existing)) if existing.as_slice() == atoms => 0,
            Some(_) => -1,
            None => {
                self.values[variable] = Some(Value::List(atoms.to_vec()));
                self.assigned.push(variable);
                1
            }
        }
    }

    /// Unwind the most recent `count` assignments.
    pub fn remove_assignments(&mut self, count: usize) {
        for _ in 0..count {
            let variable = self.assigned.pop().expect("assignment underflow");
            self.values[variable] = None;
        }
    }

    pub fn value(&self, variable: usize) -> Option<&Value> {
        self.values[variable].as_ref()
    }

    pub fn int_value(&self, variable: usize) -> i64 {
        match self.values[variable] {
            Some(Value::Int(value)) => value,
            _ => panic!("variable {} holds no integer", variable),
        }
    }

    pub fn string_value(&self, variable: usize) -> &str {
        match &self.values[variable] {
            Some(Value::Str(value)) => value,
            _ => panic!("variable {} holds no string", variable),
        }
    }

    pub fn list_value(&self, variable: usize) -> &[HostAtom] {
        match &self.values[variable] {
            Some(Value::List(atoms)) => atoms,
            _ => panic!("variable {} holds no list", variable),
        }
    }

    /// Clear all images and assignments for reuse.
    pub fn reset(&mut self) {
        self.node_images.iter_mut().for_each(|image| *image = None);
        self.edge_images.iter_mut().for_each(|image| *image = None);
        self.node_assignments.iter_mut().for_each(|count| *count = 0);
        self.edge_assignments.iter_mut().for_each(|count| *count = 0);
        self.values.iter_mut().for_each(|value| *value = None);
        self.assigned.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_results() {
        let mut morphism = Morphism::new(1, 0, 2);
        assert_eq!(morphism.add_int_assignment(0, 3), 1);
        assert_eq!(morphism.add_int_assignment(0, 3), 0);
        assert_eq!(morphism.add_int_assignment(0, 4), -1);
        assert_eq!(morphism.add_string_assignment(1, "z"), 1);
        assert_eq!(morphism.add_string_assignment(1, "q"), -1);
    }

    #[test]
    fn unwinding_clears_values() {
        let mut morphism = Morphism::new(1, 0, 2);
        morphism.add_int_assignment(0, 3);
        morphism.add_string_assignment(1, "z");
        morphism.remove_assignments(1);
        assert!(morphism.value(1).is_none());
        assert_eq!(morphism.int_value(0), 3);
    }

    #[test]
    fn node_images_track_assignments() {
        let mut morphism = Morphism::new(2, 0, 1);
        let made = morphism.add_int_assignment(0, 3) as usize;
        morphism.add_node_image(0, 7, made);
        assert!(morphism.is_matched_node(7));
        assert_eq!(morphism.node_image(0), Some(7));
        morphism.remove_node_image(0);
        assert!(!morphism.is_matched_node(7));
        assert!(morphism.value(0).is_none());
    }

    #[test]
    fn injectivity_scan_covers_all_images() {
        let mut morphism = Morphism::new(2, 1, 0);
        morphism.add_node_image(1, 4, 0);
        morphism.add_edge_image(0, 9, 0);
        assert!(morphism.is_matched_node(4));
        assert!(!morphism.is_matched_node(9));
        assert!(morphism.is_matched_edge(9));
    }

    #[test]
    fn list_assignment_compares_structurally() {
        let mut morphism = Morphism::new(0, 1, 1);
        let atoms = vec![HostAtom::Int(1), HostAtom::Str("a".into())];
        assert_eq!(morphism.add_list_assignment(0, &atoms), 1);
        assert_eq!(morphism.add_list_assignment(0, &atoms), 0);
        assert_eq!(morphism.add_list_assignment(0, &[]), -1);
        assert_eq!(morphism.list_value(0), atoms.as_slice());
    }

    #[test]
    fn reset_clears_everything() {
        let mut morphism = Morphism::new(1, 1, 1);
        morphism.add_int_assignment(0, 1);
        morphism.add_node_image(0, 0, 1);
        morphism.add_edge_image(0, 0, 0);
        morphism.reset();
        assert!(morphism.node_image(0).is_none());
        assert!(morphism.edge_image(0).is_none());
        assert!(morphism.value(0).is_none());
    }
}
