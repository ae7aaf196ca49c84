//! Device database for the Kestrel place-and-route engine.
//!
//! A [`ChipDb`] is the immutable description of one FPGA device: a grid of
//! tiles, each an instance of a shared tile type that owns dense arrays of
//! bels, wires, and pips. Wires that span tiles are joined into nodes; the
//! canonical form of any wire that belongs to a node is the nodal form.
//!
//! The database is built programmatically with [`ChipDbBuilder`] (the demo
//! family and the test suites do this) or loaded from a compressed binary
//! file with [`ChipDb::load`]. After load it is immutable and may be shared
//! freely between phases and worker threads.

#![warn(missing_docs)]

pub mod builder;
pub mod ids;
pub mod iter;
pub mod loader;
pub mod types;

pub use builder::ChipDbBuilder;
pub use ids::{BelId, Loc, PipId, WireId, NODE_TILE};
pub use iter::{BelIter, PipIter, WireIter};
pub use loader::ChipDbError;
pub use types::{
    BelData, BelPinData, ChipDb, ClusterTemplate, Delay, NodeData, PinDir, PipClass, PipData,
    TileInst, TileTypeData, TileWireData, TileWireRef,
};
