//! Cells and their ports.

use crate::ids::NetId;
use crate::property::Property;
use indexmap::IndexMap;
use kestrel_chipdb::BelId;
use kestrel_common::{Id, IdList};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Direction of a cell port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDir {
    /// Input to the cell.
    In,
    /// Output from the cell.
    Out,
    /// Bidirectional port.
    InOut,
}

/// How firmly a binding is held.
///
/// Stronger bindings are not ripped up by weaker agents: the router may
/// replace `Weak`/`Strong` wire bindings during negotiation, but never
/// `Locked` and above; the placer never moves `User` or `Fixed` cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Strength {
    /// Not bound.
    None,
    /// A provisional binding, freely replaceable.
    Weak,
    /// A normal placement/routing decision.
    Strong,
    /// Held by the current phase; not negotiable within it.
    Locked,
    /// Requested by the user (e.g. a pin constraint).
    User,
    /// Immovable (e.g. a pad fixed by package data).
    Fixed,
}

/// A port on a cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    /// Port name.
    pub name: Id,
    /// Port direction.
    pub dir: PortDir,
    /// The net this port is connected to, if any.
    pub net: Option<NetId>,
    /// For connected input ports: this port's index in the net's user list.
    pub user_idx: Option<usize>,
}

impl Port {
    /// Creates an unconnected port.
    pub fn new(name: Id, dir: PortDir) -> Self {
        Self {
            name,
            dir,
            net: None,
            user_idx: None,
        }
    }
}

/// The recorded association from a cell's logical pins to bel pins.
///
/// The packer fills this for LUTs so the post-route pass can rewrite the
/// truth table after the router permutes physical input pins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PinMap {
    /// Logical port name → bel pin name.
    pub pins: HashMap<Id, Id>,
}

impl PinMap {
    /// Creates an empty pin map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that logical pin `port` drives bel pin `bel_pin`.
    pub fn set(&mut self, port: Id, bel_pin: Id) {
        self.pins.insert(port, bel_pin);
    }

    /// Returns the bel pin for a logical pin.
    pub fn get(&self, port: Id) -> Option<Id> {
        self.pins.get(&port).copied()
    }
}

/// A cell in the design: one instance of a primitive or logical type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    /// Cell name.
    pub name: Id,
    /// Cell type (e.g. `LUT4`, `DFF`, `LOGIC`).
    pub kind: Id,
    /// The bel this cell is currently bound to.
    pub bel: Option<BelId>,
    /// How firmly the bel binding is held.
    pub bel_strength: Strength,
    /// Ports in declaration order.
    pub ports: IndexMap<Id, Port>,
    /// Attributes (synthesis annotations, constraints).
    pub attrs: HashMap<Id, Property>,
    /// Parameters (e.g. the LUT `INIT` truth table).
    pub params: HashMap<Id, Property>,
    /// The cluster this cell belongs to, named by its root cell.
    pub cluster: Option<Id>,
    /// Placement hint for cluster children (architecture-encoded).
    pub constr_z: Option<i32>,
    /// Flattened hierarchy path of the instance this cell came from.
    pub hier_path: IdList,
    /// Logical-pin-to-bel-pin mapping, when recorded by the packer.
    pub pin_map: Option<PinMap>,
}

impl Cell {
    /// Creates a cell of the given name and type with no ports.
    pub fn new(name: Id, kind: Id) -> Self {
        Self {
            name,
            kind,
            bel: None,
            bel_strength: Strength::None,
            ports: IndexMap::new(),
            attrs: HashMap::new(),
            params: HashMap::new(),
            cluster: None,
            constr_z: None,
            hier_path: IdList::new(),
            pin_map: None,
        }
    }

    /// Adds an unconnected port, returning `false` if it already exists.
    pub fn add_port(&mut self, name: Id, dir: PortDir) -> bool {
        if self.ports.contains_key(&name) {
            return false;
        }
        self.ports.insert(name, Port::new(name, dir));
        true
    }

    /// Returns the port with the given name.
    pub fn port(&self, name: Id) -> Option<&Port> {
        self.ports.get(&name)
    }

    /// Returns `true` if this cell is the root of its cluster.
    pub fn is_cluster_root(&self) -> bool {
        self.cluster == Some(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_common::{constids, Interner};

    #[test]
    fn new_cell_has_no_binding() {
        let interner = Interner::new();
        let cell = Cell::new(interner.intern("lut_0"), constids::LUT4);
        assert!(cell.bel.is_none());
        assert_eq!(cell.bel_strength, Strength::None);
        assert!(cell.ports.is_empty());
        assert!(cell.cluster.is_none());
    }

    #[test]
    fn add_port_rejects_duplicates() {
        let interner = Interner::new();
        let mut cell = Cell::new(interner.intern("c"), constids::LUT4);
        assert!(cell.add_port(constids::I0, PortDir::In));
        assert!(!cell.add_port(constids::I0, PortDir::In));
        assert_eq!(cell.ports.len(), 1);
    }

    #[test]
    fn ports_keep_declaration_order() {
        let interner = Interner::new();
        let mut cell = Cell::new(interner.intern("c"), constids::LUT4);
        cell.add_port(constids::I1, PortDir::In);
        cell.add_port(constids::I0, PortDir::In);
        cell.add_port(constids::O, PortDir::Out);
        let names: Vec<Id> = cell.ports.keys().copied().collect();
        assert_eq!(names, vec![constids::I1, constids::I0, constids::O]);
    }

    #[test]
    fn cluster_root_detection() {
        let interner = Interner::new();
        let name = interner.intern("carry_0");
        let mut cell = Cell::new(name, constids::CARRY);
        assert!(!cell.is_cluster_root());
        cell.cluster = Some(name);
        assert!(cell.is_cluster_root());
        cell.cluster = Some(interner.intern("other"));
        assert!(!cell.is_cluster_root());
    }

    #[test]
    fn pin_map() {
        let mut map = PinMap::new();
        map.set(constids::I0, constids::I2);
        assert_eq!(map.get(constids::I0), Some(constids::I2));
        assert_eq!(map.get(constids::I1), None);
    }

    #[test]
    fn strength_ordering() {
        assert!(Strength::None < Strength::Weak);
        assert!(Strength::Weak < Strength::Strong);
        assert!(Strength::Strong < Strength::Locked);
        assert!(Strength::Locked < Strength::User);
        assert!(Strength::User < Strength::Fixed);
    }
}
