//! Hierarchy flattening: module netlist → design.
//!
//! The front-end walks the module tree from the top module down, creating
//! nets lazily as bits are first referenced, identifying submodule port bits
//! with their parent nets, inserting constant drivers for tied bits, and
//! synthesizing pad cells for top-level ports. Net names are chosen by
//! preference (top-level port > fewer `$` > fewer `.` > lexicographically
//! smaller); all losing candidates become aliases.

use crate::reader::{ModuleReader, SigBit};
use kestrel_common::{constids, Id, IdList};
use kestrel_context::{BindError, Context};
use kestrel_netlist::{CellId, NetId, PortDir, Property};
use std::collections::{HashMap, HashSet};

/// Errors from the flattening front-end.
#[derive(Debug, thiserror::Error)]
pub enum FrontendError {
    /// No module qualifies as the top module.
    #[error("no top module could be determined")]
    NoTop,

    /// More than one module carries the `top` attribute.
    #[error("multiple modules claim to be top: {0} and {1}")]
    MultipleTop(String, String),

    /// Auto-detection found more than one uninstantiated non-box module.
    #[error("top module is ambiguous: {0} and {1} are both candidates")]
    AmbiguousTop(String, String),

    /// The `--top` override names a module that does not exist.
    #[error("top module override {0:?} does not exist")]
    UnknownTop(String),

    /// A net ended up with two drivers during flattening.
    #[error("net {net} has multiple drivers: {first} and {second}")]
    MultipleDrivers {
        /// The net name.
        net: String,
        /// The first driver.
        first: String,
        /// The conflicting driver.
        second: String,
    },

    /// A submodule output port was tied to a constant by its parent.
    #[error("constant tied to output port {port} of submodule {instance}")]
    ConstIntoOutput {
        /// The port name.
        port: String,
        /// The submodule instance path.
        instance: String,
    },

    /// A context operation failed; flattening bugs surface here.
    #[error(transparent)]
    Bind(#[from] BindError),
}

// --- owned snapshots of the reader's data ---
//
// The reader is consulted once up front; the import algorithm then works on
// owned data so it can freely mutate the context while walking.

#[derive(Debug, Clone)]
struct PortSnap {
    name: String,
    dir: PortDir,
    bits: Vec<SigBit>,
    offset: i32,
    upto: bool,
}

#[derive(Debug, Clone)]
struct CellSnap {
    name: String,
    ty: String,
    dirs: Vec<(String, PortDir)>,
    conns: Vec<(String, Vec<SigBit>)>,
    attrs: Vec<(String, Property)>,
    params: Vec<(String, Property)>,
}

#[derive(Debug, Clone)]
struct NetSnap {
    name: String,
    bits: Vec<SigBit>,
    offset: i32,
    upto: bool,
    attrs: Vec<(String, Property)>,
}

#[derive(Debug, Clone)]
struct ModuleSnap {
    name: String,
    blackbox: bool,
    is_top_attr: bool,
    ports: Vec<PortSnap>,
    cells: Vec<CellSnap>,
    netnames: Vec<NetSnap>,
}

fn snapshot<R: ModuleReader>(reader: &R) -> Vec<ModuleSnap> {
    let mut modules = Vec::new();
    reader.for_each_module(&mut |name, module| {
        let mut snap = ModuleSnap {
            name: name.to_string(),
            blackbox: reader.is_blackbox(module),
            is_top_attr: false,
            ports: Vec::new(),
            cells: Vec::new(),
            netnames: Vec::new(),
        };
        reader.for_each_module_attr(module, &mut |attr, value| {
            if attr == "top" && value.as_int().unwrap_or(0) != 0 {
                snap.is_top_attr = true;
            }
        });
        reader.for_each_port(module, &mut |pname, port| {
            snap.ports.push(PortSnap {
                name: pname.to_string(),
                dir: reader.port_dir(port),
                bits: reader.port_bits(port),
                offset: reader.port_offset(port),
                upto: reader.port_upto(port),
            });
        });
        reader.for_each_cell(module, &mut |cname, cell| {
            let mut cs = CellSnap {
                name: cname.to_string(),
                ty: reader.cell_type(cell),
                dirs: Vec::new(),
                conns: Vec::new(),
                attrs: Vec::new(),
                params: Vec::new(),
            };
            reader.for_each_cell_port_dir(cell, &mut |p, d| cs.dirs.push((p.to_string(), d)));
            reader.for_each_cell_conn(cell, &mut |p, bits| {
                cs.conns.push((p.to_string(), bits.to_vec()));
            });
            reader.for_each_cell_attr(cell, &mut |a, v| cs.attrs.push((a.to_string(), v.clone())));
            reader
                .for_each_cell_param(cell, &mut |a, v| cs.params.push((a.to_string(), v.clone())));
            snap.cells.push(cs);
        });
        reader.for_each_netname(module, &mut |nname, net| {
            let mut ns = NetSnap {
                name: nname.to_string(),
                bits: reader.netname_bits(net),
                offset: reader.netname_offset(net),
                upto: reader.netname_upto(net),
                attrs: Vec::new(),
            };
            reader.for_each_net_attr(net, &mut |a, v| ns.attrs.push((a.to_string(), v.clone())));
            snap.netnames.push(ns);
        });
        modules.push(snap);
    });
    modules
}

/// Per-module import state: the instance path and the mapping from the
/// module's local signal indices to design nets.
struct HierState {
    path: IdList,
    net_map: HashMap<i32, NetId>,
}

/// The flattening front-end, generic over the module reader.
pub struct GenericFrontend<'a> {
    ctx: &'a mut Context,
    modules: Vec<ModuleSnap>,
    by_name: HashMap<String, usize>,
    top_ports: HashSet<Id>,
    const_nets: HashMap<char, NetId>,
    merged: HashMap<NetId, NetId>,
    auto_idx: usize,
}

impl<'a> GenericFrontend<'a> {
    /// Imports `reader`'s netlist into `ctx`, returning the top module name.
    pub fn import<R: ModuleReader>(
        ctx: &'a mut Context,
        reader: &R,
        top_override: Option<&str>,
    ) -> Result<Id, FrontendError> {
        let modules = snapshot(reader);
        let by_name = modules
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name.clone(), i))
            .collect();
        let mut frontend = Self {
            ctx,
            modules,
            by_name,
            top_ports: HashSet::new(),
            const_nets: HashMap::new(),
            merged: HashMap::new(),
            auto_idx: 0,
        };
        let top = frontend.find_top(top_override)?;
        frontend.import_top(top)?;
        Ok(frontend.ctx.id(&frontend.modules[top].name.clone()))
    }

    // --- top detection ---

    fn find_top(&self, top_override: Option<&str>) -> Result<usize, FrontendError> {
        if let Some(name) = top_override {
            return self
                .by_name
                .get(name)
                .copied()
                .ok_or_else(|| FrontendError::UnknownTop(name.to_string()));
        }
        let marked: Vec<usize> = (0..self.modules.len())
            .filter(|&i| self.modules[i].is_top_attr)
            .collect();
        match marked.len() {
            1 => return Ok(marked[0]),
            0 => {}
            _ => {
                return Err(FrontendError::MultipleTop(
                    self.modules[marked[0]].name.clone(),
                    self.modules[marked[1]].name.clone(),
                ))
            }
        }
        // Auto-detect: the unique non-box module that is instantiated
        // nowhere.
        let mut instantiated: HashSet<&str> = HashSet::new();
        for module in &self.modules {
            for cell in &module.cells {
                instantiated.insert(cell.ty.as_str());
            }
        }
        let candidates: Vec<usize> = (0..self.modules.len())
            .filter(|&i| {
                !self.modules[i].blackbox && !instantiated.contains(self.modules[i].name.as_str())
            })
            .collect();
        match candidates.len() {
            0 => Err(FrontendError::NoTop),
            1 => Ok(candidates[0]),
            _ => Err(FrontendError::AmbiguousTop(
                self.modules[candidates[0]].name.clone(),
                self.modules[candidates[1]].name.clone(),
            )),
        }
    }

    // --- net bookkeeping ---

    /// Chases the merge map so stale ids from earlier seeding keep working.
    fn resolve(&self, mut net: NetId) -> NetId {
        while let Some(&next) = self.merged.get(&net) {
            net = next;
        }
        net
    }

    fn create_or_get_net(
        &mut self,
        state: &mut HierState,
        idx: i32,
    ) -> Result<NetId, FrontendError> {
        if let Some(&net) = state.net_map.get(&idx) {
            let net = self.resolve(net);
            state.net_map.insert(idx, net);
            return Ok(net);
        }
        let name = self.ctx.id(&format!("$frontend${}", self.auto_idx));
        self.auto_idx += 1;
        let net = self.ctx.create_net(name)?;
        state.net_map.insert(idx, net);
        Ok(net)
    }

    fn const_net(&mut self, val: char) -> Result<NetId, FrontendError> {
        if let Some(&net) = self.const_nets.get(&val) {
            return Ok(self.resolve(net));
        }
        let net = match val {
            '0' | '1' => {
                let (net_name, cell_name, kind) = if val == '1' {
                    ("$PACKER_VCC", "$PACKER_VCC_DRV", constids::VCC)
                } else {
                    ("$PACKER_GND", "$PACKER_GND_DRV", constids::GND)
                };
                let net = self.ctx.create_net(self.ctx.id(net_name))?;
                let cell = self.ctx.create_cell(self.ctx.id(cell_name), kind)?;
                self.ctx.design.cells[cell].add_port(constids::O, PortDir::Out);
                self.ctx.connect(cell, constids::O, net)?;
                net
            }
            // x/z bits become fresh undriven nets, one shared per value.
            _ => {
                let name = self.ctx.id(&format!("$undef${val}"));
                self.ctx.create_net(name)?
            }
        };
        self.const_nets.insert(val, net);
        Ok(net)
    }

    fn is_synthetic(name: &str) -> bool {
        name.starts_with("$frontend$")
    }

    /// Returns `true` if candidate `a` is preferred over current `b`.
    fn prefer_netlabel(&self, a: &str, b: &str) -> bool {
        let a_id = self.ctx.interner().get(a);
        let a_top = a_id.is_some_and(|id| self.top_ports.contains(&id));
        let b_id = self.ctx.interner().get(b);
        let b_top = b_id.is_some_and(|id| self.top_ports.contains(&id));
        if a_top != b_top {
            return a_top;
        }
        let dollars = |s: &str| s.matches('$').count();
        if dollars(a) != dollars(b) {
            return dollars(a) < dollars(b);
        }
        let dots = |s: &str| s.matches('.').count();
        if dots(a) != dots(b) {
            return dots(a) < dots(b);
        }
        a < b
    }

    fn apply_net_label(&mut self, net: NetId, candidate: &str) -> Result<(), FrontendError> {
        let net = self.resolve(net);
        let candidate_id = self.ctx.id(candidate);
        let current_id = self.ctx.design.nets[net].name;
        if candidate_id == current_id {
            return Ok(());
        }
        let current = self.ctx.str_of(current_id).to_string();
        // The canonical constant nets keep their distinguished names; any
        // user label becomes an alias.
        if current.starts_with("$PACKER_") {
            if !self.ctx.design.nets[net].aliases.contains(&candidate_id) {
                self.ctx.design.nets[net].aliases.push(candidate_id);
            }
            return Ok(());
        }
        let candidate_taken = self.ctx.design.net_by_name.contains_key(&candidate_id);
        if !candidate_taken && (Self::is_synthetic(&current) || self.prefer_netlabel(candidate, &current)) {
            self.ctx.rename_net(net, candidate_id)?;
            if !Self::is_synthetic(&current) {
                self.ctx.design.nets[net].aliases.push(current_id);
            }
        } else if !self.ctx.design.nets[net].aliases.contains(&candidate_id) {
            self.ctx.design.nets[net].aliases.push(candidate_id);
        }
        Ok(())
    }

    /// Computes the per-bit label of an array element.
    fn bit_label(base: &str, len: usize, offset: i32, upto: bool, i: usize) -> String {
        if len == 1 && offset == 0 {
            return base.to_string();
        }
        let phys = if upto {
            offset + len as i32 - i as i32 - 1
        } else {
            offset + i as i32
        };
        format!("{base}[{phys}]")
    }

    // --- net merging ---

    fn merge_nets(&mut self, base: NetId, mergee: NetId) -> Result<NetId, FrontendError> {
        let base = self.resolve(base);
        let mergee = self.resolve(mergee);
        if base == mergee {
            return Ok(base);
        }
        // Two drivers is a real design error, not a merge artifact.
        let base_driver = self.ctx.design.nets[base].driver;
        let mergee_driver = self.ctx.design.nets[mergee].driver;
        if let (Some(a), Some(b)) = (base_driver, mergee_driver) {
            return Err(FrontendError::MultipleDrivers {
                net: self.ctx.net_name(base),
                first: format!("{}.{}", self.ctx.cell_name(a.cell), self.ctx.str_of(a.port)),
                second: format!("{}.{}", self.ctx.cell_name(b.cell), self.ctx.str_of(b.port)),
            });
        }
        if let Some(driver) = mergee_driver {
            self.ctx.disconnect(driver.cell, driver.port)?;
            self.ctx.connect(driver.cell, driver.port, base)?;
        }
        loop {
            let user = self.ctx.design.nets[mergee].users.first().copied();
            match user {
                Some(u) => {
                    self.ctx.disconnect(u.cell, u.port)?;
                    self.ctx.connect(u.cell, u.port, base)?;
                }
                None => break,
            }
        }
        // The mergee's name survives as an alias if it is user-visible.
        let mergee_name = self.ctx.design.nets[mergee].name;
        let mergee_aliases = self.ctx.design.nets[mergee].aliases.clone();
        let keep_name = !Self::is_synthetic(self.ctx.str_of(mergee_name));
        self.ctx.remove_net(mergee)?;
        self.merged.insert(mergee, base);
        {
            let n = &mut self.ctx.design.nets[base];
            for alias in mergee_aliases {
                if !n.aliases.contains(&alias) {
                    n.aliases.push(alias);
                }
            }
        }
        if keep_name {
            let name_str = self.ctx.str_of(mergee_name).to_string();
            self.apply_net_label(base, &name_str)?;
        }
        Ok(base)
    }

    // --- module import ---

    fn import_top(&mut self, top: usize) -> Result<(), FrontendError> {
        let top_name = self.ctx.id(&self.modules[top].name.clone());
        let path = IdList::from_ids(vec![top_name]);
        let path_id = {
            let display = path.display(self.ctx.interner());
            self.ctx.id(&display)
        };
        self.ctx
            .design
            .hierarchy
            .set_root(path_id, top_name, top_name);

        // Top-port names take naming precedence, so register them before
        // the body is imported.
        let mut state = HierState {
            path,
            net_map: HashMap::new(),
        };
        let ports = self.modules[top].ports.clone();
        for port in &ports {
            for i in 0..port.bits.len() {
                let label =
                    Self::bit_label(&port.name, port.bits.len(), port.offset, port.upto, i);
                let id = self.ctx.id(&label);
                self.top_ports.insert(id);
            }
        }

        self.import_module_body(&mut state, top, path_id)?;
        self.import_toplevel_ports(&mut state, &ports)?;
        Ok(())
    }

    fn import_module_body(
        &mut self,
        state: &mut HierState,
        module: usize,
        path_id: Id,
    ) -> Result<(), FrontendError> {
        let netnames = self.modules[module].netnames.clone();
        for nn in &netnames {
            for (i, bit) in nn.bits.iter().enumerate() {
                if let SigBit::Net(idx) = bit {
                    let net = self.create_or_get_net(state, *idx)?;
                    let label =
                        Self::bit_label(&nn.name, nn.bits.len(), nn.offset, nn.upto, i);
                    // Hierarchical prefix below the top level.
                    let label = if state.path.len() > 1 {
                        let mut prefix = state.path.ids()[1..]
                            .iter()
                            .map(|&id| self.ctx.str_of(id).to_string())
                            .collect::<Vec<_>>()
                            .join(".");
                        prefix.push('.');
                        prefix + &label
                    } else {
                        label
                    };
                    self.apply_net_label(net, &label)?;
                    for (attr, value) in &nn.attrs {
                        let attr_id = self.ctx.id(attr);
                        self.ctx.design.nets[net]
                            .attrs
                            .entry(attr_id)
                            .or_insert_with(|| value.clone());
                    }
                }
            }
        }

        let cells = self.modules[module].cells.clone();
        for cell in &cells {
            match self.by_name.get(&cell.ty) {
                Some(&sub) if !self.modules[sub].blackbox => {
                    self.import_submodule(state, cell, sub, path_id)?;
                }
                _ => {
                    self.import_leaf_cell(state, cell, path_id)?;
                }
            }
        }
        Ok(())
    }

    fn import_submodule(
        &mut self,
        state: &mut HierState,
        cell: &CellSnap,
        sub: usize,
        parent_path: Id,
    ) -> Result<(), FrontendError> {
        let inst_name = self.ctx.id(&cell.name);
        let sub_type = self.ctx.id(&self.modules[sub].name.clone());
        let path = state.path.with_child(inst_name);
        let path_id = {
            let display = path.display(self.ctx.interner());
            self.ctx.id(&display)
        };
        self.ctx
            .design
            .hierarchy
            .add_child(parent_path, path_id, inst_name, sub_type);

        let mut substate = HierState {
            path,
            net_map: HashMap::new(),
        };

        // Identify submodule port bits with the parent's nets.
        let sub_ports = self.modules[sub].ports.clone();
        for (conn_name, bits) in &cell.conns {
            let Some(port) = sub_ports.iter().find(|p| &p.name == conn_name) else {
                continue;
            };
            for (i, parent_bit) in bits.iter().enumerate() {
                let Some(sub_bit) = port.bits.get(i) else {
                    break;
                };
                let SigBit::Net(sub_idx) = *sub_bit else {
                    // The submodule port bit is itself a constant; an
                    // output tied inside the module needs no seeding.
                    continue;
                };
                let parent_net = match parent_bit {
                    SigBit::Net(pidx) => self.create_or_get_net(state, *pidx)?,
                    SigBit::Const(c) => {
                        if port.dir == PortDir::Out {
                            return Err(FrontendError::ConstIntoOutput {
                                port: conn_name.clone(),
                                instance: substate.path.display(self.ctx.interner()),
                            });
                        }
                        self.const_net(*c)?
                    }
                };
                match substate.net_map.get(&sub_idx).copied() {
                    Some(existing) => {
                        let survivor = self.merge_nets(parent_net, existing)?;
                        substate.net_map.insert(sub_idx, survivor);
                    }
                    None => {
                        substate.net_map.insert(sub_idx, parent_net);
                    }
                }
            }
        }

        self.import_module_body(&mut substate, sub, path_id)
    }

    fn import_leaf_cell(
        &mut self,
        state: &mut HierState,
        cell: &CellSnap,
        path_id: Id,
    ) -> Result<(), FrontendError> {
        let flat_name = {
            let mut parts: Vec<String> = state.path.ids()[1..]
                .iter()
                .map(|&id| self.ctx.str_of(id).to_string())
                .collect();
            parts.push(cell.name.clone());
            parts.join(".")
        };
        let name_id = self.ctx.id(&flat_name);
        let kind = self.ctx.id(&cell.ty);
        let id = self.ctx.create_cell(name_id, kind)?;
        self.ctx.design.cells[id].hier_path = state.path.clone();
        self.ctx.design.hierarchy.add_leaf_cell(path_id, id);

        for (attr, value) in &cell.attrs {
            let attr_id = self.ctx.id(attr);
            self.ctx.design.cells[id].attrs.insert(attr_id, value.clone());
        }
        for (param, value) in &cell.params {
            let param_id = self.ctx.id(param);
            self.ctx.design.cells[id].params.insert(param_id, value.clone());
        }

        let dir_of = |port: &str| {
            cell.dirs
                .iter()
                .find(|(p, _)| p == port)
                .map(|(_, d)| *d)
                .unwrap_or(PortDir::InOut)
        };
        for (port, bits) in &cell.conns {
            let dir = dir_of(port);
            for (i, bit) in bits.iter().enumerate() {
                let port_label = if bits.len() == 1 {
                    port.clone()
                } else {
                    format!("{port}[{i}]")
                };
                let port_id = self.ctx.id(&port_label);
                self.ctx.design.cells[id].add_port(port_id, dir);
                let net = match bit {
                    SigBit::Net(idx) => self.create_or_get_net(state, *idx)?,
                    SigBit::Const(c) => self.const_net(*c)?,
                };
                self.connect_checked(id, port_id, net)?;
            }
        }
        Ok(())
    }

    fn import_toplevel_ports(
        &mut self,
        state: &mut HierState,
        ports: &[PortSnap],
    ) -> Result<(), FrontendError> {
        for port in ports {
            for (i, bit) in port.bits.iter().enumerate() {
                let label =
                    Self::bit_label(&port.name, port.bits.len(), port.offset, port.upto, i);
                let net = match bit {
                    SigBit::Net(idx) => self.create_or_get_net(state, *idx)?,
                    SigBit::Const(c) => self.const_net(*c)?,
                };
                self.apply_net_label(net, &label)?;

                if self.ctx.design.post_synthesis {
                    continue;
                }
                let pad_name = self.ctx.id(&format!("$iob${label}"));
                let (kind, pad_ports) = match port.dir {
                    PortDir::In => (constids::IBUF, vec![(constids::O, PortDir::Out)]),
                    PortDir::Out => (constids::OBUF, vec![(constids::I, PortDir::In)]),
                    PortDir::InOut => (
                        constids::IOBUF,
                        vec![(constids::O, PortDir::Out), (constids::I, PortDir::In)],
                    ),
                };
                let pad = self.ctx.create_cell(pad_name, kind)?;
                self.ctx.design.cells[pad]
                    .attrs
                    .insert(constids::IO_TYPE, Property::from("LVCMOS33"));
                for (pname, pdir) in pad_ports {
                    self.ctx.design.cells[pad].add_port(pname, pdir);
                    self.connect_checked(pad, pname, net)?;
                }
            }
        }
        Ok(())
    }

    /// Connects, converting a second-driver bind error into the front-end's
    /// own diagnosis.
    fn connect_checked(
        &mut self,
        cell: CellId,
        port: Id,
        net: NetId,
    ) -> Result<(), FrontendError> {
        let net = self.resolve(net);
        match self.ctx.connect(cell, port, net) {
            Ok(()) => Ok(()),
            Err(BindError::SecondDriver {
                net,
                existing,
                attempted,
            }) => Err(FrontendError::MultipleDrivers {
                net,
                first: existing,
                second: attempted,
            }),
            Err(e) => Err(e.into()),
        }
    }
}
