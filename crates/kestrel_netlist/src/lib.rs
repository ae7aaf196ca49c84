//! Mutable design graph for the Kestrel place-and-route engine.
//!
//! A [`Design`] holds the cells and nets of one flattened netlist in dense
//! arenas, with interned-id name indexes, the module hierarchy recorded by
//! the front-end, and the bel/wire/pip bindings written by the placer and
//! router. All mutation goes through the `Context` (in `kestrel_context`),
//! which is the arbiter of the binding invariants; this crate is the plain
//! data model.

#![warn(missing_docs)]

pub mod arena;
pub mod cell;
pub mod design;
pub mod hierarchy;
pub mod ids;
pub mod net;
pub mod property;

pub use arena::{Arena, ArenaId};
pub use cell::{Cell, PinMap, Port, PortDir, Strength};
pub use design::Design;
pub use hierarchy::{Hierarchy, HierarchyNode};
pub use ids::{CellId, NetId};
pub use net::{Net, PortRef, WireBinding};
pub use property::Property;
