//! External I/O for placed and routed designs.
//!
//! Writers for the structured physical netlist and the JSON bitstream, the
//! per-device I/O constraints CSV reader, and the phase hook runner that
//! feeds user scripts to the embedded console at phase boundaries.

#![warn(missing_docs)]

pub mod constraints;
pub mod hooks;
pub mod jsonbit;
pub mod physical;

pub use constraints::{apply_constraints, parse_constraints, Constraints, CsvError};
pub use hooks::{run_hook, HookPhase, HookScripts};
pub use jsonbit::write_json_bitstream;
pub use physical::{read_physical_netlist, write_physical_netlist, PhysError, PhysicalNetlist};
