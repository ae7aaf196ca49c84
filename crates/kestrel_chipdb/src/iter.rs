//! Lazy, restartable iterators over device resources.
//!
//! These replace cursor-style iteration with pure sequences in a fixed
//! canonical order: nodal wires first (by node id), then tile-local wires in
//! tile order; bels and pips in tile order. Iterating twice yields the same
//! sequence.

use crate::ids::{BelId, PipId, WireId};
use crate::types::{ChipDb, TileWireRef};

/// Iterator over every bel in the device, in tile order.
#[derive(Clone)]
pub struct BelIter<'a> {
    db: &'a ChipDb,
    tile: usize,
    index: u32,
}

impl<'a> Iterator for BelIter<'a> {
    type Item = BelId;

    fn next(&mut self) -> Option<BelId> {
        while self.tile < self.db.num_tiles() {
            let bels = &self.db.tile_type(self.tile).bels;
            if (self.index as usize) < bels.len() {
                let id = BelId::new(self.tile, self.index);
                self.index += 1;
                return Some(id);
            }
            self.tile += 1;
            self.index = 0;
        }
        None
    }
}

/// Iterator over every canonical wire: nodes first, then local-only wires.
#[derive(Clone)]
pub struct WireIter<'a> {
    db: &'a ChipDb,
    node: u32,
    tile: usize,
    index: u32,
}

impl<'a> Iterator for WireIter<'a> {
    type Item = WireId;

    fn next(&mut self) -> Option<WireId> {
        if (self.node as usize) < self.db.nodes.len() {
            let id = WireId::node(self.node);
            self.node += 1;
            return Some(id);
        }
        while self.tile < self.db.num_tiles() {
            let map = &self.db.tile_wire_to_node[self.tile];
            while (self.index as usize) < map.len() {
                let index = self.index;
                self.index += 1;
                if map[index as usize] < 0 {
                    return Some(WireId::new(self.tile, index));
                }
            }
            self.tile += 1;
            self.index = 0;
        }
        None
    }
}

/// Iterator over every pip in the device, in tile order.
#[derive(Clone)]
pub struct PipIter<'a> {
    db: &'a ChipDb,
    tile: usize,
    index: u32,
}

impl<'a> Iterator for PipIter<'a> {
    type Item = PipId;

    fn next(&mut self) -> Option<PipId> {
        while self.tile < self.db.num_tiles() {
            let pips = &self.db.tile_type(self.tile).pips;
            if (self.index as usize) < pips.len() {
                let id = PipId::new(self.tile, self.index);
                self.index += 1;
                return Some(id);
            }
            self.tile += 1;
            self.index = 0;
        }
        None
    }
}

/// Lazy iterator over the pips uphill or downhill of one canonical wire,
/// expanding node members as it goes.
pub struct WirePipIter<'a> {
    db: &'a ChipDb,
    members: Vec<TileWireRef>,
    member: usize,
    pos: usize,
    downhill: bool,
}

impl<'a> Iterator for WirePipIter<'a> {
    type Item = PipId;

    fn next(&mut self) -> Option<PipId> {
        while self.member < self.members.len() {
            let m = self.members[self.member];
            let wire = &self.db.tile_type(m.tile as usize).wires[m.index as usize];
            let list = if self.downhill {
                &wire.pips_downhill
            } else {
                &wire.pips_uphill
            };
            if self.pos < list.len() {
                let pip = PipId::new(m.tile as usize, list[self.pos]);
                self.pos += 1;
                return Some(pip);
            }
            self.member += 1;
            self.pos = 0;
        }
        None
    }
}

impl ChipDb {
    /// Iterates over every bel in canonical order.
    pub fn bels(&self) -> BelIter<'_> {
        BelIter {
            db: self,
            tile: 0,
            index: 0,
        }
    }

    /// Iterates over every canonical wire.
    pub fn wires(&self) -> WireIter<'_> {
        WireIter {
            db: self,
            node: 0,
            tile: 0,
            index: 0,
        }
    }

    /// Iterates over every pip in canonical order.
    pub fn pips(&self) -> PipIter<'_> {
        PipIter {
            db: self,
            tile: 0,
            index: 0,
        }
    }

    /// Iterates over the pips whose source is `wire`.
    pub fn pips_downhill(&self, wire: WireId) -> WirePipIter<'_> {
        WirePipIter {
            db: self,
            members: self.wire_members(wire),
            member: 0,
            pos: 0,
            downhill: true,
        }
    }

    /// Iterates over the pips whose destination is `wire`.
    pub fn pips_uphill(&self, wire: WireId) -> WirePipIter<'_> {
        WirePipIter {
            db: self,
            members: self.wire_members(wire),
            member: 0,
            pos: 0,
            downhill: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ChipDbBuilder;
    use crate::types::{Delay, PinDir, PipClass};

    fn db() -> ChipDb {
        let mut b = ChipDbBuilder::new("iter", 2, 1);
        let tt = b.add_tile_type("T");
        let w0 = b.add_wire(tt, "w0");
        let w1 = b.add_wire(tt, "w1");
        let w2 = b.add_wire(tt, "w2");
        b.add_pip(tt, w0, w1, PipClass::Regular, Delay::ZERO);
        b.add_pip(tt, w1, w2, PipClass::Regular, Delay::ZERO);
        let bel = b.add_bel(tt, "LC0", "LUT4", 0);
        b.add_bel_pin(tt, bel, "O", PinDir::Out, w0);
        b.set_tile(0, 0, tt);
        b.set_tile(1, 0, tt);
        b.add_node(&[(0, w2), (1, w0)]);
        b.finish()
    }

    #[test]
    fn bel_iteration() {
        let db = db();
        let bels: Vec<_> = db.bels().collect();
        assert_eq!(bels, vec![BelId::new(0, 0), BelId::new(1, 0)]);
    }

    #[test]
    fn wire_iteration_is_canonical() {
        let db = db();
        let wires: Vec<_> = db.wires().collect();
        // 1 node + 2 local wires per tile that are not node members.
        assert_eq!(wires.len(), 1 + 2 + 2);
        assert!(wires[0].is_node());
        assert!(wires[1..].iter().all(|w| !w.is_node()));
        // No canonical wire appears twice.
        let set: std::collections::HashSet<_> = wires.iter().collect();
        assert_eq!(set.len(), wires.len());
    }

    #[test]
    fn iteration_is_restartable() {
        let db = db();
        let a: Vec<_> = db.wires().collect();
        let b: Vec<_> = db.wires().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn pip_iteration() {
        let db = db();
        assert_eq!(db.pips().count(), 4);
    }

    #[test]
    fn downhill_expands_node_members() {
        let db = db();
        let node = db.canonical_wire(0, 2);
        // Node joins (0, w2) [no downhill] and (1, w0) [one downhill pip].
        let pips: Vec<_> = db.pips_downhill(node).collect();
        assert_eq!(pips, vec![PipId::new(1, 0)]);
        // Uphill: (0, w2) has one uphill pip.
        let pips: Vec<_> = db.pips_uphill(node).collect();
        assert_eq!(pips, vec![PipId::new(0, 1)]);
    }
}
