//! Generic netlist front-end.
//!
//! Imports a hierarchical logic netlist into the design through the
//! [`ModuleReader`] capability: any source that can enumerate modules,
//! ports, cells, and net names (with bit-vector connections) can feed the
//! flattening front-end. Two concrete readers are provided: the synthesis
//! JSON schema ([`json`]) and the interchange logical-netlist record model
//! ([`interchange`]).

#![warn(missing_docs)]

pub mod flatten;
pub mod interchange;
pub mod json;
pub mod reader;

pub use flatten::{FrontendError, GenericFrontend};
pub use interchange::LogicalNetlist;
pub use json::{JsonError, JsonReader};
pub use reader::{
    MemBitVector, MemCell, MemModule, MemNetName, MemPort, MemReader, ModuleReader, SigBit,
};
