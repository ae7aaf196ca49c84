//! Programmatic database assembly.
//!
//! The builder is how architecture families and tests create a [`ChipDb`]
//! in memory: declare tile types with their bels/wires/pips, lay out the
//! grid, join wires into nodes, then [`finish`](ChipDbBuilder::finish).
//! Cross-reference arrays (`pips_uphill`, `bel_pins`, `tile_wire_to_node`)
//! are derived here so tile-type authors never maintain them by hand.

use crate::ids::Loc;
use crate::types::{
    BelData, BelPinData, ChipDb, ClusterTemplate, Delay, NodeData, PinDir, PipClass, PipData,
    TileBelPinRef, TileInst, TileTypeData, TileWireData, TileWireRef,
};

/// Builder for an in-memory [`ChipDb`].
#[derive(Debug)]
pub struct ChipDbBuilder {
    name: String,
    width: u32,
    height: u32,
    tile_types: Vec<TileTypeData>,
    tiles: Vec<Option<u32>>,
    nodes: Vec<Vec<(u32, u32)>>,
    clusters: Vec<ClusterTemplate>,
}

impl ChipDbBuilder {
    /// Creates a builder for a `width` × `height` grid.
    pub fn new(name: &str, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            tile_types: Vec::new(),
            tiles: vec![None; (width * height) as usize],
            nodes: Vec::new(),
            clusters: Vec::new(),
        }
    }

    /// Declares a new tile type and returns its index.
    pub fn add_tile_type(&mut self, name: &str) -> u32 {
        self.tile_types.push(TileTypeData {
            name: name.to_string(),
            bels: Vec::new(),
            wires: Vec::new(),
            pips: Vec::new(),
        });
        (self.tile_types.len() - 1) as u32
    }

    /// Adds a wire to a tile type and returns its index.
    pub fn add_wire(&mut self, tile_type: u32, name: &str) -> u32 {
        let ty = &mut self.tile_types[tile_type as usize];
        ty.wires.push(TileWireData {
            name: name.to_string(),
            site: -1,
            pips_uphill: Vec::new(),
            pips_downhill: Vec::new(),
            bel_pins: Vec::new(),
        });
        (ty.wires.len() - 1) as u32
    }

    /// Adds a pip to a tile type, maintaining the uphill/downhill arrays of
    /// its endpoint wires, and returns its index.
    pub fn add_pip(
        &mut self,
        tile_type: u32,
        src_wire: u32,
        dst_wire: u32,
        class: PipClass,
        delay: Delay,
    ) -> u32 {
        let ty = &mut self.tile_types[tile_type as usize];
        assert!(
            (src_wire as usize) < ty.wires.len() && (dst_wire as usize) < ty.wires.len(),
            "pip endpoints must name existing wires"
        );
        let index = ty.pips.len() as u32;
        ty.pips.push(PipData {
            src_wire,
            dst_wire,
            class,
            delay,
        });
        ty.wires[src_wire as usize].pips_downhill.push(index);
        ty.wires[dst_wire as usize].pips_uphill.push(index);
        index
    }

    /// Adds a bel to a tile type and returns its index.
    pub fn add_bel(&mut self, tile_type: u32, name: &str, kind: &str, z: i32) -> u32 {
        let ty = &mut self.tile_types[tile_type as usize];
        ty.bels.push(BelData {
            name: name.to_string(),
            kind: kind.to_string(),
            z,
            pins: Vec::new(),
        });
        (ty.bels.len() - 1) as u32
    }

    /// Adds a pin to a bel, attaching it to a wire of the same tile type.
    pub fn add_bel_pin(&mut self, tile_type: u32, bel: u32, name: &str, dir: PinDir, wire: u32) {
        let ty = &mut self.tile_types[tile_type as usize];
        assert!((wire as usize) < ty.wires.len(), "bel pin wire must exist");
        let pin = ty.bels[bel as usize].pins.len() as u32;
        ty.bels[bel as usize].pins.push(BelPinData {
            name: name.to_string(),
            dir,
            wire,
        });
        ty.wires[wire as usize].bel_pins.push(TileBelPinRef { bel, pin });
    }

    /// Assigns a tile type to the grid position `(x, y)`.
    pub fn set_tile(&mut self, x: u32, y: u32, tile_type: u32) {
        let idx = (y * self.width + x) as usize;
        self.tiles[idx] = Some(tile_type);
    }

    /// Joins tile-local wires into one node. Members are
    /// `(flat tile index, wire index)` pairs; the first member is the node's
    /// representative.
    pub fn add_node(&mut self, members: &[(u32, u32)]) -> u32 {
        assert!(members.len() >= 2, "a node joins at least two wires");
        self.nodes.push(members.to_vec());
        (self.nodes.len() - 1) as u32
    }

    /// Registers a cluster/chain template.
    pub fn add_cluster_template(&mut self, template: ClusterTemplate) {
        self.clusters.push(template);
    }

    /// Returns the flat index of the tile at `(x, y)`.
    pub fn tile_index(&self, x: u32, y: u32) -> u32 {
        y * self.width + x
    }

    /// Returns the location of the tile with the given flat index.
    pub fn tile_loc(&self, tile: u32) -> Loc {
        Loc::new((tile % self.width) as i32, (tile / self.width) as i32, 0)
    }

    /// Finalizes the database: lays out tile instances and derives the
    /// per-tile wire-to-node maps.
    ///
    /// # Panics
    ///
    /// Panics if a grid position was never assigned a tile type, or if a
    /// wire is claimed by more than one node.
    pub fn finish(self) -> ChipDb {
        let mut tiles = Vec::with_capacity(self.tiles.len());
        for (i, ty) in self.tiles.iter().enumerate() {
            let type_idx = ty.unwrap_or_else(|| {
                panic!(
                    "tile X{}Y{} has no type",
                    i as u32 % self.width,
                    i as u32 / self.width
                )
            });
            tiles.push(TileInst {
                type_idx,
                x: i as u32 % self.width,
                y: i as u32 / self.width,
            });
        }

        let mut tile_wire_to_node: Vec<Vec<i32>> = tiles
            .iter()
            .map(|t| vec![-1; self.tile_types[t.type_idx as usize].wires.len()])
            .collect();

        let mut nodes = Vec::with_capacity(self.nodes.len());
        for (node_id, members) in self.nodes.iter().enumerate() {
            for &(tile, wire) in members {
                let slot = &mut tile_wire_to_node[tile as usize][wire as usize];
                assert!(
                    *slot == -1,
                    "wire t{tile}i{wire} already belongs to node {}",
                    *slot
                );
                *slot = node_id as i32;
            }
            nodes.push(NodeData {
                wires: members
                    .iter()
                    .map(|&(tile, index)| TileWireRef { tile, index })
                    .collect(),
            });
        }

        ChipDb {
            name: self.name,
            width: self.width,
            height: self.height,
            tile_types: self.tile_types,
            tiles,
            nodes,
            tile_wire_to_node,
            clusters: self.clusters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_minimal_grid() {
        let mut b = ChipDbBuilder::new("g", 1, 1);
        let tt = b.add_tile_type("T");
        b.set_tile(0, 0, tt);
        let db = b.finish();
        assert_eq!(db.num_tiles(), 1);
        assert!(db.nodes.is_empty());
        assert_eq!(db.tile_wire_to_node[0].len(), 0);
    }

    #[test]
    fn pip_maintains_cross_references() {
        let mut b = ChipDbBuilder::new("g", 1, 1);
        let tt = b.add_tile_type("T");
        let a = b.add_wire(tt, "a");
        let c = b.add_wire(tt, "c");
        let pip = b.add_pip(tt, a, c, PipClass::Regular, Delay::ZERO);
        b.set_tile(0, 0, tt);
        let db = b.finish();
        let ty = &db.tile_types[0];
        assert_eq!(ty.wires[a as usize].pips_downhill, vec![pip]);
        assert_eq!(ty.wires[c as usize].pips_uphill, vec![pip]);
    }

    #[test]
    fn bel_pin_backreference() {
        let mut b = ChipDbBuilder::new("g", 1, 1);
        let tt = b.add_tile_type("T");
        let w = b.add_wire(tt, "w");
        let bel = b.add_bel(tt, "LC0", "LUT4", 0);
        b.add_bel_pin(tt, bel, "O", PinDir::Out, w);
        b.set_tile(0, 0, tt);
        let db = b.finish();
        let refs = &db.tile_types[0].wires[w as usize].bel_pins;
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].bel, bel);
    }

    #[test]
    #[should_panic(expected = "has no type")]
    fn unset_tile_panics() {
        let b = ChipDbBuilder::new("g", 2, 1);
        b.finish();
    }

    #[test]
    #[should_panic(expected = "already belongs to node")]
    fn double_node_membership_panics() {
        let mut b = ChipDbBuilder::new("g", 2, 1);
        let tt = b.add_tile_type("T");
        let w = b.add_wire(tt, "w");
        b.set_tile(0, 0, tt);
        b.set_tile(1, 0, tt);
        b.add_node(&[(0, w), (1, w)]);
        b.add_node(&[(0, w), (1, w)]);
        b.finish();
    }
}
