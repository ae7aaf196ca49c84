//! The design: arenas of cells and nets plus the name indexes.

use crate::arena::Arena;
use crate::cell::Cell;
use crate::hierarchy::Hierarchy;
use crate::ids::{CellId, NetId};
use crate::net::Net;
use kestrel_common::Id;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The mutable design graph: cells, nets, name indexes, and the hierarchy.
///
/// All structural mutation (creation, connection, binding) goes through the
/// `Context`; the design itself is a plain container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Design {
    /// All cells.
    pub cells: Arena<CellId, Cell>,
    /// All nets.
    pub nets: Arena<NetId, Net>,
    /// Name → cell index.
    pub cell_by_name: HashMap<Id, CellId>,
    /// Name → net index.
    pub net_by_name: HashMap<Id, NetId>,
    /// The flattened module hierarchy.
    pub hierarchy: Hierarchy,
    /// Set when the input netlist already contains I/O primitives, so the
    /// front-end must not synthesize pad cells for top-level ports.
    pub post_synthesis: bool,
}

impl Design {
    /// Creates an empty design.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cell with the given name.
    pub fn cell_named(&self, name: Id) -> Option<&Cell> {
        self.cell_by_name.get(&name).and_then(|&id| self.cells.get(id))
    }

    /// Returns the net with the given name.
    pub fn net_named(&self, name: Id) -> Option<&Net> {
        self.net_by_name.get(&name).and_then(|&id| self.nets.get(id))
    }

    /// Returns the id of the cell with the given name.
    pub fn cell_id(&self, name: Id) -> Option<CellId> {
        self.cell_by_name.get(&name).copied()
    }

    /// Returns the id of the net with the given name.
    pub fn net_id(&self, name: Id) -> Option<NetId> {
        self.net_by_name.get(&name).copied()
    }

    /// Returns the number of cells currently placed on a bel.
    pub fn placed_count(&self) -> usize {
        self.cells.values().filter(|c| c.bel.is_some()).count()
    }

    /// Returns the number of nets with at least one bound wire.
    pub fn routed_count(&self) -> usize {
        self.nets.values().filter(|n| !n.is_unrouted()).count()
    }
}
