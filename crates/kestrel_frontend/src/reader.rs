//! The module-reader capability and an in-memory reference implementation.
//!
//! The flattening front-end is generic over [`ModuleReader`]; a reader
//! exposes a hierarchical netlist as modules, ports, cells, and net names,
//! with connections as bit vectors. Iteration order is preserved by readers
//! wherever the source defines one, so imports are deterministic.

use kestrel_netlist::{PortDir, Property};

/// One bit of a connection bit vector: a module-local signal index or a
/// constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigBit {
    /// A module-local net, identified by a flat signal index.
    Net(i32),
    /// A constant bit: `'0'`, `'1'`, `'x'`, or `'z'`.
    Const(char),
}

/// Capability object exposing a hierarchical netlist to the front-end.
///
/// The associated types are opaque views into the reader's own storage; the
/// front-end only moves them between the enumeration and query methods.
pub trait ModuleReader {
    /// A module view.
    type Module;
    /// A module-port view.
    type Port;
    /// A cell-instance view.
    type Cell;
    /// A named-net view.
    type NetName;

    /// Enumerates every module as `(name, module)`.
    fn for_each_module(&self, f: &mut dyn FnMut(&str, &Self::Module));

    /// Enumerates a module's ports in declaration order.
    fn for_each_port(&self, module: &Self::Module, f: &mut dyn FnMut(&str, &Self::Port));

    /// Enumerates a module's cell instances.
    fn for_each_cell(&self, module: &Self::Module, f: &mut dyn FnMut(&str, &Self::Cell));

    /// Enumerates a module's named nets.
    fn for_each_netname(&self, module: &Self::Module, f: &mut dyn FnMut(&str, &Self::NetName));

    /// Enumerates a module's attributes.
    fn for_each_module_attr(&self, module: &Self::Module, f: &mut dyn FnMut(&str, &Property));

    /// Returns whether a module is a black box (instantiated but opaque).
    fn is_blackbox(&self, module: &Self::Module) -> bool;

    /// Returns a module port's direction.
    fn port_dir(&self, port: &Self::Port) -> PortDir;

    /// Returns a module port's connection bits.
    fn port_bits(&self, port: &Self::Port) -> Vec<SigBit>;

    /// Returns a module port's array offset.
    fn port_offset(&self, port: &Self::Port) -> i32;

    /// Returns whether the port's array is declared `[lo:hi]` (upto).
    fn port_upto(&self, port: &Self::Port) -> bool;

    /// Returns a cell instance's type name.
    fn cell_type(&self, cell: &Self::Cell) -> String;

    /// Enumerates a cell's port directions.
    fn for_each_cell_port_dir(&self, cell: &Self::Cell, f: &mut dyn FnMut(&str, PortDir));

    /// Enumerates a cell's port connections as bit vectors.
    fn for_each_cell_conn(&self, cell: &Self::Cell, f: &mut dyn FnMut(&str, &[SigBit]));

    /// Enumerates a cell's attributes.
    fn for_each_cell_attr(&self, cell: &Self::Cell, f: &mut dyn FnMut(&str, &Property));

    /// Enumerates a cell's parameters.
    fn for_each_cell_param(&self, cell: &Self::Cell, f: &mut dyn FnMut(&str, &Property));

    /// Returns a named net's bits.
    fn netname_bits(&self, net: &Self::NetName) -> Vec<SigBit>;

    /// Returns a named net's array offset.
    fn netname_offset(&self, net: &Self::NetName) -> i32;

    /// Returns whether the named net's array is declared upto.
    fn netname_upto(&self, net: &Self::NetName) -> bool;

    /// Enumerates a named net's attributes.
    fn for_each_net_attr(&self, net: &Self::NetName, f: &mut dyn FnMut(&str, &Property));
}

/// A connection bit vector in the in-memory model.
pub type MemBitVector = Vec<SigBit>;

/// A module port in the in-memory model.
#[derive(Debug, Clone)]
pub struct MemPort {
    /// Port direction.
    pub dir: PortDir,
    /// Connection bits.
    pub bits: MemBitVector,
    /// Array offset.
    pub offset: i32,
    /// Declared `[lo:hi]`.
    pub upto: bool,
}

/// A cell instance in the in-memory model.
#[derive(Debug, Clone, Default)]
pub struct MemCell {
    /// The instantiated type (a primitive or another module).
    pub cell_type: String,
    /// Port directions, in declaration order.
    pub port_dirs: Vec<(String, PortDir)>,
    /// Port connections, in declaration order.
    pub connections: Vec<(String, MemBitVector)>,
    /// Attributes.
    pub attrs: Vec<(String, Property)>,
    /// Parameters.
    pub params: Vec<(String, Property)>,
}

/// A named net in the in-memory model.
#[derive(Debug, Clone)]
pub struct MemNetName {
    /// The net's bits.
    pub bits: MemBitVector,
    /// Array offset.
    pub offset: i32,
    /// Declared `[lo:hi]`.
    pub upto: bool,
    /// Attributes.
    pub attrs: Vec<(String, Property)>,
}

/// A module in the in-memory model.
#[derive(Debug, Clone, Default)]
pub struct MemModule {
    /// Ports in declaration order.
    pub ports: Vec<(String, MemPort)>,
    /// Cells in declaration order.
    pub cells: Vec<(String, MemCell)>,
    /// Named nets in declaration order.
    pub netnames: Vec<(String, MemNetName)>,
    /// Attributes.
    pub attrs: Vec<(String, Property)>,
    /// Black-box marker.
    pub blackbox: bool,
}

/// An in-memory hierarchical netlist implementing [`ModuleReader`].
///
/// Used directly by tests and as the landing model of the interchange
/// importer.
#[derive(Debug, Clone, Default)]
pub struct MemReader {
    /// Modules in declaration order.
    pub modules: Vec<(String, MemModule)>,
}

impl ModuleReader for MemReader {
    type Module = MemModule;
    type Port = MemPort;
    type Cell = MemCell;
    type NetName = MemNetName;

    fn for_each_module(&self, f: &mut dyn FnMut(&str, &MemModule)) {
        for (name, module) in &self.modules {
            f(name, module);
        }
    }

    fn for_each_port(&self, module: &MemModule, f: &mut dyn FnMut(&str, &MemPort)) {
        for (name, port) in &module.ports {
            f(name, port);
        }
    }

    fn for_each_cell(&self, module: &MemModule, f: &mut dyn FnMut(&str, &MemCell)) {
        for (name, cell) in &module.cells {
            f(name, cell);
        }
    }

    fn for_each_netname(&self, module: &MemModule, f: &mut dyn FnMut(&str, &MemNetName)) {
        for (name, net) in &module.netnames {
            f(name, net);
        }
    }

    fn for_each_module_attr(&self, module: &MemModule, f: &mut dyn FnMut(&str, &Property)) {
        for (name, value) in &module.attrs {
            f(name, value);
        }
    }

    fn is_blackbox(&self, module: &MemModule) -> bool {
        module.blackbox
    }

    fn port_dir(&self, port: &MemPort) -> PortDir {
        port.dir
    }

    fn port_bits(&self, port: &MemPort) -> Vec<SigBit> {
        port.bits.clone()
    }

    fn port_offset(&self, port: &MemPort) -> i32 {
        port.offset
    }

    fn port_upto(&self, port: &MemPort) -> bool {
        port.upto
    }

    fn cell_type(&self, cell: &MemCell) -> String {
        cell.cell_type.clone()
    }

    fn for_each_cell_port_dir(&self, cell: &MemCell, f: &mut dyn FnMut(&str, PortDir)) {
        for (name, dir) in &cell.port_dirs {
            f(name, *dir);
        }
    }

    fn for_each_cell_conn(&self, cell: &MemCell, f: &mut dyn FnMut(&str, &[SigBit])) {
        for (name, bits) in &cell.connections {
            f(name, bits);
        }
    }

    fn for_each_cell_attr(&self, cell: &MemCell, f: &mut dyn FnMut(&str, &Property)) {
        for (name, value) in &cell.attrs {
            f(name, value);
        }
    }

    fn for_each_cell_param(&self, cell: &MemCell, f: &mut dyn FnMut(&str, &Property)) {
        for (name, value) in &cell.params {
            f(name, value);
        }
    }

    fn netname_bits(&self, net: &MemNetName) -> Vec<SigBit> {
        net.bits.clone()
    }

    fn netname_offset(&self, net: &MemNetName) -> i32 {
        net.offset
    }

    fn netname_upto(&self, net: &MemNetName) -> bool {
        net.upto
    }

    fn for_each_net_attr(&self, net: &MemNetName, f: &mut dyn FnMut(&str, &Property)) {
        for (name, value) in &net.attrs {
            f(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_reader_enumerates_in_order() {
        let reader = MemReader {
            modules: vec![
                ("b".to_string(), MemModule::default()),
                ("a".to_string(), MemModule::default()),
            ],
        };
        let mut seen = Vec::new();
        reader.for_each_module(&mut |name, _| seen.push(name.to_string()));
        assert_eq!(seen, vec!["b", "a"]);
    }

    #[test]
    fn sigbit_variants() {
        assert_eq!(SigBit::Net(3), SigBit::Net(3));
        assert_ne!(SigBit::Net(3), SigBit::Const('0'));
    }
}
