//! The module hierarchy recorded during flattening.
//!
//! The front-end flattens the source module tree into a single-level design
//! but keeps a mirror of the hierarchy so exports and diagnostics can show
//! instance paths. Nodes are keyed by their interned flattened path.

use crate::ids::CellId;
use kestrel_common::Id;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One module instance in the flattened hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyNode {
    /// Instance name within the parent.
    pub name: Id,
    /// The module type this instance elaborates.
    pub module_type: Id,
    /// Path id of the parent instance (`None` at the root).
    pub parent: Option<Id>,
    /// Path ids of child instances.
    pub children: Vec<Id>,
    /// Leaf cells created while importing this instance.
    pub leaf_cells: Vec<CellId>,
}

/// The full hierarchy tree, keyed by interned instance path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Hierarchy {
    /// All nodes, keyed by flattened path id.
    pub nodes: HashMap<Id, HierarchyNode>,
    /// The root (top module) path id.
    pub root: Option<Id>,
}

impl Hierarchy {
    /// Creates an empty hierarchy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the root node.
    pub fn set_root(&mut self, path: Id, name: Id, module_type: Id) {
        self.nodes.insert(
            path,
            HierarchyNode {
                name,
                module_type,
                parent: None,
                children: Vec::new(),
                leaf_cells: Vec::new(),
            },
        );
        self.root = Some(path);
    }

    /// Inserts a child instance under `parent` (which must exist).
    pub fn add_child(&mut self, parent: Id, path: Id, name: Id, module_type: Id) {
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(path);
        }
        self.nodes.insert(
            path,
            HierarchyNode {
                name,
                module_type,
                parent: Some(parent),
                children: Vec::new(),
                leaf_cells: Vec::new(),
            },
        );
    }

    /// Records a leaf cell under the instance at `path`.
    pub fn add_leaf_cell(&mut self, path: Id, cell: CellId) {
        if let Some(node) = self.nodes.get_mut(&path) {
            node.leaf_cells.push(cell);
        }
    }

    /// Returns the node at `path`.
    pub fn node(&self, path: Id) -> Option<&HierarchyNode> {
        self.nodes.get(&path)
    }
}
