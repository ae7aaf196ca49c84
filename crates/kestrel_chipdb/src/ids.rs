//! Handles for device resources.
//!
//! Bels, wires, and pips are addressed by `(tile, index)` pairs where `tile`
//! is the flat tile index and `index` is the position in the owning tile
//! type's array. A wire whose `tile` is [`NODE_TILE`] is nodal: its `index`
//! is a node id and it stands for every tile-local wire the node joins.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel tile value marking a nodal (multi-tile) wire handle.
pub const NODE_TILE: i32 = -1;

/// A placement location: tile coordinates plus the z slot within the tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Loc {
    /// Tile column.
    pub x: i32,
    /// Tile row.
    pub y: i32,
    /// Slot within the tile (bel `z` coordinate).
    pub z: i32,
}

impl Loc {
    /// Creates a location.
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X{}Y{}/Z{}", self.x, self.y, self.z)
    }
}

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name {
            /// Flat tile index, or [`NODE_TILE`] for nodal handles.
            pub tile: i32,
            /// Index within the owning tile type's array (or the node id).
            pub index: u32,
        }

        impl $name {
            /// Creates a handle for a tile-local resource.
            pub fn new(tile: usize, index: u32) -> Self {
                Self {
                    tile: tile as i32,
                    index,
                }
            }

            /// Returns the flat tile index.
            ///
            /// # Panics
            ///
            /// Panics if the handle is nodal.
            pub fn tile_index(self) -> usize {
                debug_assert!(self.tile >= 0);
                self.tile as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.tile == NODE_TILE {
                    write!(f, "node{}", self.index)
                } else {
                    write!(f, "t{}i{}", self.tile, self.index)
                }
            }
        }
    };
}

define_handle!(
    /// Handle for a bel: `(tile, index within the tile type's bel array)`.
    BelId
);

define_handle!(
    /// Handle for a wire. Local form is `(tile, wire index)`; the canonical
    /// form of a wire joined into a node is `(NODE_TILE, node id)`.
    WireId
);

define_handle!(
    /// Handle for a pip: `(tile, index within the tile type's pip array)`.
    PipId
);

impl WireId {
    /// Creates the nodal form for the given node id.
    pub fn node(node: u32) -> Self {
        Self {
            tile: NODE_TILE,
            index: node,
        }
    }

    /// Returns `true` if this handle is the nodal form.
    pub fn is_node(self) -> bool {
        self.tile == NODE_TILE
    }
}
