//! Device database data model.
//!
//! All entities live in flat arrays and cross-reference each other by index.
//! A [`TileTypeData`] is a template shared by every tile instance of that
//! type; bels, wires, and pips are dense per-type arrays, so a resource
//! handle is always `(tile, index)`. Nodes join tile-local wires that are
//! electrically one wire across tiles.

use crate::ids::{BelId, Loc, PipId, WireId};
use serde::{Deserialize, Serialize};

/// Direction of a bel pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinDir {
    /// Input to the bel.
    In,
    /// Output from the bel.
    Out,
    /// Bidirectional pin.
    InOut,
}

/// A timing delay with min/typical/max corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Delay {
    /// Minimum delay in nanoseconds (fast corner).
    pub min_ns: f64,
    /// Typical delay in nanoseconds (nominal corner).
    pub typ_ns: f64,
    /// Maximum delay in nanoseconds (slow corner).
    pub max_ns: f64,
}

impl Delay {
    /// A zero delay.
    pub const ZERO: Self = Self {
        min_ns: 0.0,
        typ_ns: 0.0,
        max_ns: 0.0,
    };

    /// Creates a new delay with the given min/typ/max values.
    pub fn new(min_ns: f64, typ_ns: f64, max_ns: f64) -> Self {
        Self {
            min_ns,
            typ_ns,
            max_ns,
        }
    }
}

impl Default for Delay {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Classification of a pip, beyond its src/dst connectivity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipClass {
    /// An ordinary routing switch.
    Regular,
    /// A member of a logical crossbar mux: all pips sharing a `group` within
    /// one tile select inputs of the same physical mux and must agree on a
    /// single selected input after routing.
    Crossbar {
        /// Crossbar group name, unique within the tile type.
        group: String,
    },
    /// A dedicated mux pip.
    Mux,
    /// A bypass pip around a bel.
    Bypass,
    /// A pip permuting LUT input pins; traversing one re-orders the LUT's
    /// physical inputs and is compensated in the post-route pass.
    LutPermutation,
    /// A general interconnect pip.
    Interconnect,
    /// A virtual pip with no physical resource.
    Virtual,
    /// A pseudo-pip crossing through a LUT bel; binding it reserves the bel
    /// in pass-through mode.
    RouteThru {
        /// Index of the crossed bel in the tile type's bel array.
        bel: u32,
    },
}

/// A pin on a bel, attached to a tile-local wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BelPinData {
    /// Port name (e.g. "I0", "Q").
    pub name: String,
    /// Pin direction relative to the bel.
    pub dir: PinDir,
    /// Index of the attached wire in the tile type's wire array.
    pub wire: u32,
}

/// A basic element of logic within a tile type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BelData {
    /// Instance name within the tile (e.g. "LC0", "IO1").
    pub name: String,
    /// The bel kind a cell's type is matched against (e.g. "LUT4", "DFF").
    pub kind: String,
    /// Slot coordinate within the tile.
    pub z: i32,
    /// The bel's pins.
    pub pins: Vec<BelPinData>,
}

/// A reference from a wire back to a bel pin attached to it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TileBelPinRef {
    /// Index of the bel in the tile type's bel array.
    pub bel: u32,
    /// Index of the pin in that bel's pin array.
    pub pin: u32,
}

/// A wire local to a tile type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileWireData {
    /// Wire name within the tile (e.g. "local_0", "sp4_h_3").
    pub name: String,
    /// Site/region tag, or -1 for fabric wires.
    pub site: i32,
    /// Indices of pips (in the tile type's pip array) whose destination is
    /// this wire.
    pub pips_uphill: Vec<u32>,
    /// Indices of pips whose source is this wire.
    pub pips_downhill: Vec<u32>,
    /// Bel pins attached to this wire.
    pub bel_pins: Vec<TileBelPinRef>,
}

/// A directed programmable switch between two wires of the same tile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipData {
    /// Source wire index within the tile type.
    pub src_wire: u32,
    /// Destination wire index within the tile type.
    pub dst_wire: u32,
    /// Classification of this pip.
    pub class: PipClass,
    /// Propagation delay through the enabled pip.
    pub delay: Delay,
}

/// A tile type: the template shared by every tile instance of this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileTypeData {
    /// Type name (e.g. "LOGIC", "IO").
    pub name: String,
    /// Bels in this tile type.
    pub bels: Vec<BelData>,
    /// Wires local to this tile type.
    pub wires: Vec<TileWireData>,
    /// Pips local to this tile type.
    pub pips: Vec<PipData>,
}

/// One tile instance in the device grid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TileInst {
    /// Index into [`ChipDb::tile_types`].
    pub type_idx: u32,
    /// Column of this tile.
    pub x: u32,
    /// Row of this tile.
    pub y: u32,
}

/// A member of a node: one tile-local wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileWireRef {
    /// Flat tile index.
    pub tile: u32,
    /// Wire index within that tile's type.
    pub index: u32,
}

/// A set of tile-local wires that are electrically one wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeData {
    /// The member wires. The first member is the node's representative for
    /// naming and position queries.
    pub wires: Vec<TileWireRef>,
}

/// A template tying a group of chainable cell kinds to rigid relative
/// placements, consumed by the packer and placer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterTemplate {
    /// Template name (e.g. "carry_chain").
    pub name: String,
    /// Cell kinds that may participate in this cluster, in chain order.
    pub cell_kinds: Vec<String>,
    /// Port name patterns linking a cell to its successor (e.g. "COUT"→"CIN").
    pub port_patterns: Vec<String>,
    /// Relative `(dx, dy, dz)` placements for children, indexed by position.
    pub relative_placements: Vec<(i32, i32, i32)>,
}

/// The immutable description of one device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChipDb {
    /// Device name (e.g. "scamp8x8").
    pub name: String,
    /// Grid width in tiles.
    pub width: u32,
    /// Grid height in tiles.
    pub height: u32,
    /// Tile type templates.
    pub tile_types: Vec<TileTypeData>,
    /// Tile instances, row-major (`y * width + x`).
    pub tiles: Vec<TileInst>,
    /// Multi-tile wire nodes.
    pub nodes: Vec<NodeData>,
    /// Per tile instance, per wire index: the node id, or -1 if local-only.
    pub tile_wire_to_node: Vec<Vec<i32>>,
    /// Cluster/chain templates for the packer and placer.
    pub clusters: Vec<ClusterTemplate>,
}

impl ChipDb {
    /// Returns the number of tile instances.
    pub fn num_tiles(&self) -> usize {
        self.tiles.len()
    }

    /// Returns the flat index of the tile at `(x, y)`.
    pub fn tile_index(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height);
        (y * self.width + x) as usize
    }

    /// Returns the tile instance at `(x, y)`.
    pub fn tile_at(&self, x: u32, y: u32) -> &TileInst {
        &self.tiles[self.tile_index(x, y)]
    }

    /// Returns the tile type of the tile with the given flat index.
    pub fn tile_type(&self, tile: usize) -> &TileTypeData {
        &self.tile_types[self.tiles[tile].type_idx as usize]
    }

    /// Returns the bel template for a handle.
    pub fn bel_data(&self, bel: BelId) -> &BelData {
        &self.tile_type(bel.tile_index()).bels[bel.index as usize]
    }

    /// Returns the location of a bel.
    pub fn bel_loc(&self, bel: BelId) -> Loc {
        let tile = &self.tiles[bel.tile_index()];
        Loc::new(
            tile.x as i32,
            tile.y as i32,
            self.bel_data(bel).z,
        )
    }

    /// Returns the bel at a location, if the tile has one at that z slot.
    pub fn bel_at(&self, loc: Loc) -> Option<BelId> {
        if loc.x < 0 || loc.y < 0 || loc.x >= self.width as i32 || loc.y >= self.height as i32 {
            return None;
        }
        let tile = self.tile_index(loc.x as u32, loc.y as u32);
        self.tile_type(tile)
            .bels
            .iter()
            .position(|b| b.z == loc.z)
            .map(|i| BelId::new(tile, i as u32))
    }

    /// Returns the full name of a bel: `X<x>Y<y>/<name>`.
    pub fn bel_name(&self, bel: BelId) -> String {
        let tile = &self.tiles[bel.tile_index()];
        format!("X{}Y{}/{}", tile.x, tile.y, self.bel_data(bel).name)
    }

    /// Returns the canonical handle for the tile-local wire `(tile, index)`.
    ///
    /// If the wire belongs to a node, the nodal form is returned; otherwise
    /// the local form is returned unchanged.
    pub fn canonical_wire(&self, tile: usize, index: u32) -> WireId {
        let map = &self.tile_wire_to_node[tile];
        if (index as usize) < map.len() {
            let node = map[index as usize];
            if node >= 0 {
                return WireId::node(node as u32);
            }
        }
        WireId::new(tile, index)
    }

    /// Returns the node's member wires.
    pub fn node_data(&self, node: u32) -> &NodeData {
        &self.nodes[node as usize]
    }

    /// Returns the tile-local wire template for a local handle.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the handle is nodal; use
    /// [`node_data`](Self::node_data) for those.
    pub fn wire_data(&self, wire: WireId) -> &TileWireData {
        debug_assert!(!wire.is_node());
        &self.tile_type(wire.tile_index()).wires[wire.index as usize]
    }

    /// Returns the full name of a wire. Nodal wires use their representative
    /// (first) member.
    pub fn wire_name(&self, wire: WireId) -> String {
        let (tile, index) = if wire.is_node() {
            let rep = self.nodes[wire.index as usize].wires[0];
            (rep.tile as usize, rep.index)
        } else {
            (wire.tile_index(), wire.index)
        };
        let inst = &self.tiles[tile];
        let data = &self.tile_type(tile).wires[index as usize];
        format!("X{}Y{}/{}", inst.x, inst.y, data.name)
    }

    /// Returns the `(x, y)` position of a wire for distance estimates.
    /// Nodal wires use the centroid of their members.
    pub fn wire_position(&self, wire: WireId) -> (f64, f64) {
        if wire.is_node() {
            let members = &self.nodes[wire.index as usize].wires;
            let mut x = 0.0;
            let mut y = 0.0;
            for m in members {
                let t = &self.tiles[m.tile as usize];
                x += t.x as f64;
                y += t.y as f64;
            }
            let n = members.len().max(1) as f64;
            (x / n, y / n)
        } else {
            let t = &self.tiles[wire.tile_index()];
            (t.x as f64, t.y as f64)
        }
    }

    /// Returns the pip template for a handle.
    pub fn pip_data(&self, pip: PipId) -> &PipData {
        &self.tile_type(pip.tile_index()).pips[pip.index as usize]
    }

    /// Returns the canonical source wire of a pip.
    pub fn pip_src_wire(&self, pip: PipId) -> WireId {
        let data = self.pip_data(pip);
        self.canonical_wire(pip.tile_index(), data.src_wire)
    }

    /// Returns the canonical destination wire of a pip.
    pub fn pip_dst_wire(&self, pip: PipId) -> WireId {
        let data = self.pip_data(pip);
        self.canonical_wire(pip.tile_index(), data.dst_wire)
    }

    /// Returns the full name of a pip: `X<x>Y<y>/<src>-><dst>`.
    pub fn pip_name(&self, pip: PipId) -> String {
        let inst = &self.tiles[pip.tile_index()];
        let ty = self.tile_type(pip.tile_index());
        let data = &ty.pips[pip.index as usize];
        format!(
            "X{}Y{}/{}->{}",
            inst.x,
            inst.y,
            ty.wires[data.src_wire as usize].name,
            ty.wires[data.dst_wire as usize].name
        )
    }

    /// Returns every `(tile, wire index)` member of a wire: one entry for a
    /// local wire, all node members for a nodal wire.
    pub fn wire_members(&self, wire: WireId) -> Vec<TileWireRef> {
        if wire.is_node() {
            self.nodes[wire.index as usize].wires.clone()
        } else {
            vec![TileWireRef {
                tile: wire.tile as u32,
                index: wire.index,
            }]
        }
    }

    /// Returns the canonical wire a bel pin is attached to.
    pub fn bel_pin_wire(&self, bel: BelId, pin: &str) -> Option<WireId> {
        let data = self.bel_data(bel);
        data.pins
            .iter()
            .find(|p| p.name == pin)
            .map(|p| self.canonical_wire(bel.tile_index(), p.wire))
    }

    /// Returns every bel pin attached to a wire, expanding node members.
    pub fn wire_bel_pins(&self, wire: WireId) -> Vec<(BelId, TileBelPinRef)> {
        let mut out = Vec::new();
        for member in self.wire_members(wire) {
            let ty = self.tile_type(member.tile as usize);
            for bp in &ty.wires[member.index as usize].bel_pins {
                out.push((BelId::new(member.tile as usize, bp.bel), *bp));
            }
        }
        out
    }
}
