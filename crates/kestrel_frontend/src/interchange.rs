//! Interchange logical-netlist record model.
//!
//! The capnp decode layer lives outside the engine; this module consumes
//! its already-decoded records. A logical netlist is net-oriented: cell
//! declarations with (possibly bussed) ports, cell instances, and nets that
//! list `port-inst` endpoints. [`LogicalNetlist::to_reader`] converts that
//! shape into the port-connection form the flattening front-end consumes,
//! resolving each port-inst onto a port-bit index via its `bus_idx` with
//! the port width inferred from the bus bounds (declared in either
//! direction).

use crate::reader::{MemCell, MemModule, MemNetName, MemPort, MemReader, SigBit};
use kestrel_netlist::{PortDir, Property};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bus bounds of a multi-bit port, declared `[first:last]` in either
/// direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BusBounds {
    /// The first declared index.
    pub first: i32,
    /// The last declared index.
    pub last: i32,
}

impl BusBounds {
    /// The port width implied by the bounds.
    pub fn width(&self) -> usize {
        (self.first - self.last).unsigned_abs() as usize + 1
    }
}

/// A port on a cell declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcPort {
    /// Port name.
    pub name: String,
    /// Port direction.
    pub dir: PortDir,
    /// Bus bounds; `None` for a single-bit port.
    pub bus: Option<BusBounds>,
}

impl IcPort {
    /// Returns the port's bit width.
    pub fn width(&self) -> usize {
        self.bus.map(|b| b.width()).unwrap_or(1)
    }
}

/// A cell declaration: the interface of a primitive or module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcCellDecl {
    /// Declaration name.
    pub name: String,
    /// Ports in declaration order.
    pub ports: Vec<IcPort>,
    /// `true` for library primitives with no netlist body.
    pub is_primitive: bool,
}

/// A cell instance inside a module body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcCellInst {
    /// Instance name.
    pub name: String,
    /// The instantiated declaration.
    pub cell: String,
    /// Instance properties.
    pub props: Vec<(String, Property)>,
}

/// One endpoint of a net: a bit of a port, on an instance or on the module
/// boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcPortInst {
    /// The instance, or `None` for the module's own port.
    pub inst: Option<String>,
    /// The port name.
    pub port: String,
    /// The bit within the port; `None` means the port is single-bit.
    pub bus_idx: Option<u32>,
}

impl IcPortInst {
    /// Returns `true` if this endpoint addresses a single-bit port.
    pub fn is_single_bit(&self) -> bool {
        self.bus_idx.is_none()
    }
}

/// A net in a module body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcNet {
    /// Net name.
    pub name: String,
    /// The endpoints this net connects.
    pub ports: Vec<IcPortInst>,
}

/// A module body implementing one cell declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcModule {
    /// The declaration this module implements.
    pub decl: String,
    /// Cell instances.
    pub insts: Vec<IcCellInst>,
    /// Nets.
    pub nets: Vec<IcNet>,
}

/// A decoded interchange logical netlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicalNetlist {
    /// All cell declarations.
    pub decls: Vec<IcCellDecl>,
    /// All module bodies.
    pub modules: Vec<IcModule>,
    /// The name of the top declaration.
    pub top: String,
}

impl LogicalNetlist {
    fn decl(&self, name: &str) -> Option<&IcCellDecl> {
        self.decls.iter().find(|d| d.name == name)
    }

    /// Converts the net-oriented records into the port-connection module
    /// model consumed by the flattening front-end.
    pub fn to_reader(&self) -> MemReader {
        let mut modules = Vec::new();
        for module in &self.modules {
            modules.push((module.decl.clone(), self.convert_module(module)));
        }
        MemReader { modules }
    }

    fn convert_module(&self, module: &IcModule) -> MemModule {
        // One signal index per net, in declaration order.
        let net_index: HashMap<&str, i32> = module
            .nets
            .iter()
            .enumerate()
            .map(|(i, n)| (n.name.as_str(), i as i32))
            .collect();

        let decl = self.decl(&module.decl);
        let mut out = MemModule {
            blackbox: false,
            ..Default::default()
        };
        if let Some(d) = decl {
            if module.decl == self.top {
                out.attrs.push(("top".to_string(), Property::Int(1)));
            }
            for port in &d.ports {
                out.ports.push((
                    port.name.clone(),
                    MemPort {
                        dir: port.dir,
                        bits: vec![SigBit::Const('x'); port.width()],
                        offset: port.bus.map(|b| b.first.min(b.last)).unwrap_or(0),
                        upto: port.bus.map(|b| b.first < b.last).unwrap_or(false),
                    },
                ));
            }
        }

        // Instances become cells with all-undriven connections, filled in
        // from the nets below.
        for inst in &module.insts {
            let Some(d) = self.decl(&inst.cell) else {
                continue;
            };
            let mut cell = MemCell {
                cell_type: inst.cell.clone(),
                ..Default::default()
            };
            for port in &d.ports {
                cell.port_dirs.push((port.name.clone(), port.dir));
                cell.connections.push((
                    port.name.clone(),
                    vec![SigBit::Const('x'); port.width()],
                ));
            }
            cell.params = inst.props.clone();
            out.cells.push((inst.name.clone(), cell));
        }

        for net in &module.nets {
            let signal = SigBit::Net(net_index[net.name.as_str()]);
            for endpoint in &net.ports {
                let bit = endpoint.bus_idx.unwrap_or(0) as usize;
                match &endpoint.inst {
                    None => {
                        if let Some(slot) = out
                            .ports
                            .iter_mut()
                            .find(|(name, _)| name == &endpoint.port)
                            .and_then(|(_, p)| p.bits.get_mut(bit))
                        {
                            *slot = signal;
                        }
                    }
                    Some(inst) => {
                        if let Some(slot) = out
                            .cells
                            .iter_mut()
                            .find(|(name, _)| name == inst)
                            .and_then(|(_, c)| {
                                c.connections
                                    .iter_mut()
                                    .find(|(p, _)| p == &endpoint.port)
                            })
                            .and_then(|(_, bits)| bits.get_mut(bit))
                        {
                            *slot = signal;
                        }
                    }
                }
            }
            out.netnames.push((
                net.name.clone(),
                MemNetName {
                    bits: vec![SigBit::Net(net_index[net.name.as_str()])],
                    offset: 0,
                    upto: false,
                    attrs: Vec::new(),
                },
            ));
        }

        out
    }
}
