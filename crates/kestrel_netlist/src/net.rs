//! Nets: one driver, many users, and the routing bindings.

use crate::cell::Strength;
use crate::ids::CellId;
use crate::property::Property;
use kestrel_chipdb::{PipId, WireId};
use kestrel_common::Id;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A reference to one port of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    /// The cell.
    pub cell: CellId,
    /// The port name on that cell.
    pub port: Id,
}

impl PortRef {
    /// Creates a port reference.
    pub fn new(cell: CellId, port: Id) -> Self {
        Self { cell, port }
    }
}

/// The binding of one wire to a net.
///
/// `pip` names the pip used to reach this wire from upstream; `None` marks
/// the net's root wire (the driver bel pin's wire).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireBinding {
    /// The pip driving this wire, or `None` at the routing root.
    pub pip: Option<PipId>,
    /// How firmly the binding is held.
    pub strength: Strength,
}

/// A net: an electrical signal with at most one driver and any number of
/// users, plus the wire/pip bindings chosen by the router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Net {
    /// Net name.
    pub name: Id,
    /// The driving cell port.
    pub driver: Option<PortRef>,
    /// The consuming cell ports. A port's `user_idx` points into this list.
    pub users: Vec<PortRef>,
    /// The wires currently bound to this net.
    pub wires: HashMap<WireId, WireBinding>,
    /// Attributes.
    pub attrs: HashMap<Id, Property>,
    /// Alternative names discarded during net-name selection.
    pub aliases: Vec<Id>,
    /// Integer scratch used by the front-end while flattening.
    pub udata: i32,
}

impl Net {
    /// Creates an empty net.
    pub fn new(name: Id) -> Self {
        Self {
            name,
            driver: None,
            users: Vec::new(),
            wires: HashMap::new(),
            attrs: HashMap::new(),
            aliases: Vec::new(),
            udata: 0,
        }
    }

    /// Returns `true` if no wires are bound to this net.
    pub fn is_unrouted(&self) -> bool {
        self.wires.is_empty()
    }

    /// Returns the root wire of the routing tree, if the net is routed.
    pub fn root_wire(&self) -> Option<WireId> {
        self.wires
            .iter()
            .find(|(_, b)| b.pip.is_none())
            .map(|(w, _)| *w)
    }

    /// Returns `true` if this net has neither driver nor users.
    pub fn is_dangling(&self) -> bool {
        self.driver.is_none() && self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_common::Interner;

    #[test]
    fn new_net_is_empty() {
        let interner = Interner::new();
        let net = Net::new(interner.intern("data[0]"));
        assert!(net.is_unrouted());
        assert!(net.is_dangling());
        assert!(net.root_wire().is_none());
    }

    #[test]
    fn root_wire_is_pipless_binding() {
        let interner = Interner::new();
        let mut net = Net::new(interner.intern("n"));
        net.wires.insert(
            WireId::new(0, 0),
            WireBinding {
                pip: None,
                strength: Strength::Strong,
            },
        );
        net.wires.insert(
            WireId::new(0, 1),
            WireBinding {
                pip: Some(PipId::new(0, 0)),
                strength: Strength::Strong,
            },
        );
        assert_eq!(net.root_wire(), Some(WireId::new(0, 0)));
    }

    #[test]
    fn dangling_requires_no_driver_and_no_users() {
        let interner = Interner::new();
        let mut net = Net::new(interner.intern("n"));
        net.users.push(PortRef::new(CellId::from_raw(0), Id::NONE));
        assert!(!net.is_dangling());
    }

    #[test]
    fn bincode_roundtrip() {
        let interner = Interner::new();
        let mut net = Net::new(interner.intern("n"));
        net.wires.insert(
            WireId::node(3),
            WireBinding {
                pip: None,
                strength: Strength::Weak,
            },
        );
        let bytes = bincode::serde::encode_to_vec(&net, bincode::config::standard()).unwrap();
        let (back, _): (Net, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard()).unwrap();
        assert_eq!(back.wires.len(), 1);
        assert_eq!(back.root_wire(), Some(WireId::node(3)));
    }
}
