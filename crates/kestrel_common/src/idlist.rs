//! Ordered identifier sequences for hierarchical names.

use crate::ident::{Id, Interner};
use serde::{Deserialize, Serialize};

/// An ordered sequence of [`Id`]s forming a hierarchical name.
///
/// Used for flattened instance paths such as `top.cpu.alu.add_0`. Components
/// are stored outermost-first.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct IdList(Vec<Id>);

impl IdList {
    /// Creates an empty id list.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Creates an id list from components, outermost-first.
    pub fn from_ids(ids: Vec<Id>) -> Self {
        Self(ids)
    }

    /// Returns a new list with `id` appended as the innermost component.
    pub fn with_child(&self, id: Id) -> Self {
        let mut ids = self.0.clone();
        ids.push(id);
        Self(ids)
    }

    /// Appends a component in place.
    pub fn push(&mut self, id: Id) {
        self.0.push(id);
    }

    /// Returns the components, outermost-first.
    pub fn ids(&self) -> &[Id] {
        &self.0
    }

    /// Returns the number of components.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the list has no components.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the innermost component, if any.
    pub fn leaf(&self) -> Option<Id> {
        self.0.last().copied()
    }

    /// Renders the list as a `.`-joined path using `interner`.
    pub fn display(&self, interner: &Interner) -> String {
        let parts: Vec<&str> = self.0.iter().map(|&id| interner.resolve(id)).collect();
        parts.join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list() {
        let list = IdList::new();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert!(list.leaf().is_none());
    }

    #[test]
    fn push_and_leaf() {
        let interner = Interner::new();
        let top = interner.intern("top");
        let cpu = interner.intern("cpu");
        let mut list = IdList::new();
        list.push(top);
        list.push(cpu);
        assert_eq!(list.len(), 2);
        assert_eq!(list.leaf(), Some(cpu));
    }

    #[test]
    fn with_child_does_not_mutate() {
        let interner = Interner::new();
        let a = interner.intern("a");
        let b = interner.intern("b");
        let base = IdList::from_ids(vec![a]);
        let child = base.with_child(b);
        assert_eq!(base.len(), 1);
        assert_eq!(child.len(), 2);
        assert_eq!(child.leaf(), Some(b));
    }

    #[test]
    fn display_joins_with_dots() {
        let interner = Interner::new();
        let list = IdList::from_ids(vec![
            interner.intern("top"),
            interner.intern("alu"),
            interner.intern("add_0"),
        ]);
        assert_eq!(list.display(&interner), "top.alu.add_0");
    }

    #[test]
    fn serde_roundtrip() {
        let list = IdList::from_ids(vec![Id::from_raw(1), Id::from_raw(2)]);
        let json = serde_json::to_string(&list).unwrap();
        let back: IdList = serde_json::from_str(&json).unwrap();
        assert_eq!(list, back);
    }
}
