// Copyright 2026 The GP2 Project Developers

//! Host labels and the hash-consed list store.
//!
//! A host label is a mark plus a list of atoms. Lists are interned in a
//! fixed-capacity chained hash table so that any two equal lists occurring
//! anywhere in the host graph share a single allocation; pointer equality
//! then certifies list equality. The empty list is not stored at all,
//! which makes the blank label a natural singleton.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Number of chains in the list store.
const LIST_TABLE_SIZE: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    None,
    Red,
    Green,
    Blue,
    Grey,
    Dashed,
    /// Wildcard, only meaningful on left-hand-side items.
    Any,
}

impl Default for Mark {
    fn default() -> Self {
        Mark::None
    }
}

impl Mark {
    /// Whether a rule mark accepts a concrete host mark.
    pub fn matches(self, host: Mark) -> bool {
        self == Mark::Any || self == host
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mark::None => "none",
            Mark::Red => "red",
            Mark::Green => "green",
            Mark::Blue => "blue",
            Mark::Grey => "grey",
            Mark::Dashed => "dashed",
            Mark::Any => "any",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostAtom {
    Int(i64),
    Str(String),
}

impl fmt::Display for HostAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostAtom::Int(value) => write!(f, "{}", value),
            HostAtom::Str(value) => write!(f, "{:?}", value),
        }
    }
}

/// An interned atom list. The hash is computed once, when the list enters
/// the store, and reused for both bucket selection and fast inequality.
#[derive(Debug)]
pub struct HostList {
    hash: u64,
    atoms: Vec<HostAtom>,
}

impl HostList {
    pub fn atoms(&self) -> &[HostAtom] {
        &self.atoms
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Rolling hash over atom kinds and values. Integers are folded
    /// multiplicatively, strings byte-wise.
    fn hash_atoms(atoms: &[HostAtom]) -> u64 {
        let mut hash: u64 = 5381;
        for atom in atoms {
            match atom {
                HostAtom::Int(value) => {
                    hash = hash
                        .wrapping_mul(33)
                        .wrapping_add((*value as u64).wrapping_mul(0x9e3779b97f4a7c15));
                }
                HostAtom::Str(value) => {
                    hash = hash.wrapping_mul(33).wrapping_add(1);
                    for byte in value.bytes() {
                        hash = hash.wrapping_mul(33).wrapping_add(byte as u64);
                    }
                }
            }
        }
        hash
    }
}

impl PartialEq for HostList {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.atoms == other.atoms
    }
}

/// A host label: a mark and an optional interned list. `None` is the empty
/// list.
#[derive(Debug, Clone)]
pub struct HostLabel {
    pub mark: Mark,
    list: Option<Rc<HostList>>,
}

impl HostLabel {
    pub fn new(mark: Mark, list: Option<Rc<HostList>>) -> Self {
        HostLabel { mark, list }
    }

    /// The blank label: no mark, empty list.
    pub fn blank() -> Self {
        HostLabel {
            mark: Mark::None,
            list: None,
        }
    }

    pub fn length(&self) -> usize {
        self.list.as_ref().map_or(0, |list| list.len())
    }

    pub fn atoms(&self) -> &[HostAtom] {
        self.list.as_ref().map_or(&[], |list| list.atoms())
    }

    pub fn list(&self) -> Option<&Rc<HostList>> {
        self.list.as_ref()
    }
}

impl PartialEq for HostLabel {
    fn eq(&self, other: &Self) -> bool {
        if self.mark != other.mark {
            return false;
        }
        match (&self.list, &other.list) {
            (None, None) => true,
            (Some(left), Some(right)) => Rc::ptr_eq(left, right) || left == right,
            _ => false,
        }
    }
}

impl fmt::Display for HostLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.length() == 0 {
            write!(f, "empty")?;
        } else {
            let atoms = self.atoms();
            for (position, atom) in atoms.iter().enumerate() {
                if position > 0 {
                    write!(f, ":")?;
                }
                write!(f, "{}", atom)?;
            }
        }
        if self.mark != Mark::None {
            write!(f, " # {}", self.mark)?;
        }
        Ok(())
    }
}

struct Entry {
    list: Rc<HostList>,
    refs: usize,
}

/// The list store. Collisions chain within a bucket; reference counts track
/// the logical owners of each list (host-graph labels and undo-trail
/// records), and an entry is evicted when its count reaches zero.
pub struct ListStore {
    buckets: Vec<Vec<Entry>>,
}

impl Default for ListStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ListStore {
    pub fn new() -> Self {
        let mut buckets = Vec::with_capacity(LIST_TABLE_SIZE);
        buckets.resize_with(LIST_TABLE_SIZE, Vec::new);
        ListStore { buckets }
    }

    /// Intern an atom list, sharing any existing equal list. Empty lists
    /// are not stored.
    pub fn intern(&mut self, atoms: Vec<HostAtom>) -> Option<Rc<HostList>> {
        if atoms.is_empty() {
            return None;
        }
        let hash = HostList::hash_atoms(&atoms);
        let bucket = &mut self.buckets[hash as usize % LIST_TABLE_SIZE];
        for entry in bucket.iter_mut() {
            if entry.list.hash == hash && entry.list.atoms == atoms {
                entry.refs += 1;
                return Some(entry.list.clone());
            }
        }
        let list = Rc::new(HostList { hash, atoms });
        bucket.push(Entry {
            list: list.clone(),
            refs: 1,
        });
        Some(list)
    }

    /// Take an additional logical reference to an interned list.
    pub fn retain(&mut self, list: &Rc<HostList>) {
        let bucket = &mut self.buckets[list.hash as usize % LIST_TABLE_SIZE];
        for entry in bucket.iter_mut() {
            if Rc::ptr_eq(&entry.list, list) {
                entry.refs += 1;
                return;
            }
        }
    }

    /// Drop a logical reference; the entry is evicted when no owner is
    /// left.
    pub fn release(&mut self, list: &Rc<HostList>) {
        let bucket = &mut self.buckets[list.hash as usize % LIST_TABLE_SIZE];
        for position in 0..bucket.len() {
            if Rc::ptr_eq(&bucket[position].list, list) {
                bucket[position].refs -= 1;
                if bucket[position].refs == 0 {
                    bucket.remove(position);
                }
                return;
            }
        }
    }

    /// Number of distinct lists currently stored.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Structural equality of raw atom arrays, used by generated list
/// comparison predicates.
pub fn equal_atom_lists(left: &[HostAtom], right: &[HostAtom]) -> bool {
    left == right
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atoms(values: &[i64]) -> Vec<HostAtom> {
        values.iter().map(|value| HostAtom::Int(*value)).collect()
    }

    #[test]
    fn interning_shares_storage() {
        let mut store = ListStore::new();
        let first = store.intern(atoms(&[1, 2, 3])).unwrap();
        let second = store.intern(atoms(&[1, 2, 3])).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn distinct_lists_do_not_share() {
        let mut store = ListStore::new();
        let first = store.intern(atoms(&[1, 2])).unwrap();
        let second = store
            .intern(vec![HostAtom::Int(1), HostAtom::Str("2".into())])
            .unwrap();
        assert!(!Rc::ptr_eq(&first, &second));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn empty_list_is_not_stored() {
        let mut store = ListStore::new();
        assert!(store.intern(Vec::new()).is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn release_evicts_on_last_owner() {
        let mut store = ListStore::new();
        let first = store.intern(atoms(&[7])).unwrap();
        let second = store.intern(atoms(&[7])).unwrap();
        store.release(&first);
        assert_eq!(store.len(), 1);
        store.release(&second);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn label_equality_requires_matching_marks() {
        let mut store = ListStore::new();
        let list = store.intern(atoms(&[1]));
        let red = HostLabel::new(Mark::Red, list.clone());
        let green = HostLabel::new(Mark::Green, list);
        assert_ne!(red, green);
        assert_eq!(red, red.clone());
    }

    #[test]
    fn blank_label_is_empty_and_unmarked() {
        let blank = HostLabel::blank();
        assert_eq!(blank.length(), 0);
        assert_eq!(blank.mark, Mark::None);
        assert_eq!(blank, HostLabel::new(Mark::None, None));
    }

    #[test]
    fn any_matches_every_mark() {
        for mark in [Mark::None, Mark::Red, Mark::Dashed] {
            assert!(Mark::Any.matches(mark));
        }
        assert!(!Mark::Red.matches(Mark::Green));
    }

    #[test]
    fn label_display() {
        let mut store = ListStore::new();
        let list = store
            .intern(vec![HostAtom::Int(3), HostAtom::Str("a".into())])
            .unwrap();
        let label = HostLabel::new(Mark::Red, Some(list));
        assert_eq!(format!("{}", label), "3:\"a\" # red");
        assert_eq!(format!("{}", HostLabel::blank()), "empty");
    }
}
