//! The Context type and its mutation API.

use crate::error::BindError;
use kestrel_chipdb::{BelId, ChipDb, PipId, WireId};
use kestrel_common::{Id, Interner};
use kestrel_netlist::{Cell, CellId, Design, Net, NetId, PortDir, PortRef, Strength, WireBinding};
use std::collections::HashMap;

/// Interned per-tile-type lookup tables, built once at construction so hot
/// paths match cell port ids against bel pins without resolving strings.
#[derive(Debug)]
struct TileTypeIds {
    /// Bel kind, per bel.
    bel_kind: Vec<Id>,
    /// Pin name → wire index within the tile, per bel.
    bel_pin_wire: Vec<HashMap<Id, u32>>,
}

/// Owner of the chip database, the design, and the interner; the single
/// arbiter of bel/wire/pip bindings.
#[derive(Debug)]
pub struct Context {
    chip: ChipDb,
    /// The design graph. Structural fields (attributes, parameters) may be
    /// edited directly; connections and bindings go through the methods
    /// below.
    pub design: Design,
    interner: Interner,
    bel_bindings: HashMap<BelId, CellId>,
    wire_bindings: HashMap<WireId, NetId>,
    pip_bindings: HashMap<PipId, NetId>,
    tile_type_ids: Vec<TileTypeIds>,
}

impl Context {
    /// Creates a context over a loaded chip database with an empty design.
    pub fn new(chip: ChipDb) -> Self {
        let interner = Interner::new();
        let tile_type_ids = chip
            .tile_types
            .iter()
            .map(|ty| TileTypeIds {
                bel_kind: ty.bels.iter().map(|b| interner.intern(&b.kind)).collect(),
                bel_pin_wire: ty
                    .bels
                    .iter()
                    .map(|b| {
                        b.pins
                            .iter()
                            .map(|p| (interner.intern(&p.name), p.wire))
                            .collect()
                    })
                    .collect(),
            })
            .collect();
        Self {
            chip,
            design: Design::new(),
            interner,
            bel_bindings: HashMap::new(),
            wire_bindings: HashMap::new(),
            pip_bindings: HashMap::new(),
            tile_type_ids,
        }
    }

    /// Returns the chip database.
    pub fn chip(&self) -> &ChipDb {
        &self.chip
    }

    /// Returns the interner.
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// Interns a string through the context's interner.
    pub fn id(&self, s: &str) -> Id {
        self.interner.intern(s)
    }

    /// Resolves an id to its string.
    pub fn str_of(&self, id: Id) -> &str {
        self.interner.resolve(id)
    }

    // --- name helpers for diagnostics ---

    /// Returns the display name of a cell (or `cell#N` for a dead id).
    pub fn cell_name(&self, cell: CellId) -> String {
        match self.design.cells.get(cell) {
            Some(c) => self.interner.resolve(c.name).to_string(),
            None => format!("cell#{cell}"),
        }
    }

    /// Returns the display name of a net (or `net#N` for a dead id).
    pub fn net_name(&self, net: NetId) -> String {
        match self.design.nets.get(net) {
            Some(n) => self.interner.resolve(n.name).to_string(),
            None => format!("net#{net}"),
        }
    }

    fn port_ref_name(&self, port_ref: PortRef) -> String {
        format!(
            "{}.{}",
            self.cell_name(port_ref.cell),
            self.interner.resolve(port_ref.port)
        )
    }

    // --- cell and net lifecycle ---

    /// Creates a cell. Errors if a cell of this name already exists.
    pub fn create_cell(&mut self, name: Id, kind: Id) -> Result<CellId, BindError> {
        if self.design.cell_by_name.contains_key(&name) {
            return Err(BindError::CellExists {
                name: self.interner.resolve(name).to_string(),
            });
        }
        let id = self.design.cells.alloc(Cell::new(name, kind));
        self.design.cell_by_name.insert(name, id);
        Ok(id)
    }

    /// Creates a net. Errors if a net of this name already exists.
    pub fn create_net(&mut self, name: Id) -> Result<NetId, BindError> {
        if self.design.net_by_name.contains_key(&name) {
            return Err(BindError::NetExists {
                name: self.interner.resolve(name).to_string(),
            });
        }
        let id = self.design.nets.alloc(Net::new(name));
        self.design.net_by_name.insert(name, id);
        Ok(id)
    }

    /// Removes a cell: disconnects every port, releases its bel, and frees
    /// the arena slot.
    pub fn remove_cell(&mut self, cell: CellId) -> Result<(), BindError> {
        let (name, ports, bel) = {
            let c = self.design.cells.get(cell).ok_or(BindError::Unknown {
                kind: "cell",
                name: format!("cell#{cell}"),
            })?;
            (
                c.name,
                c.ports.keys().copied().collect::<Vec<Id>>(),
                c.bel,
            )
        };
        for port in ports {
            self.disconnect(cell, port)?;
        }
        if let Some(bel) = bel {
            self.unbind_bel(bel)?;
        }
        self.design.cell_by_name.remove(&name);
        self.design.cells.remove(cell);
        Ok(())
    }

    /// Removes a net: rips up its routing, disconnects driver and users, and
    /// frees the arena slot.
    pub fn remove_net(&mut self, net: NetId) -> Result<(), BindError> {
        let name = {
            let n = self.design.nets.get(net).ok_or(BindError::Unknown {
                kind: "net",
                name: format!("net#{net}"),
            })?;
            n.name
        };
        let wires: Vec<WireId> = self.design.nets[net].wires.keys().copied().collect();
        for wire in wires {
            self.unbind_wire(wire)?;
        }
        let driver = self.design.nets[net].driver;
        if let Some(d) = driver {
            self.disconnect(d.cell, d.port)?;
        }
        loop {
            let user = match self.design.nets.get(net) {
                Some(n) => n.users.first().copied(),
                None => None,
            };
            match user {
                Some(u) => self.disconnect(u.cell, u.port)?,
                None => break,
            }
        }
        self.design.net_by_name.remove(&name);
        self.design.nets.remove(net);
        Ok(())
    }

    /// Renames a net, keeping the name index consistent. Errors if the new
    /// name is already taken by another net.
    pub fn rename_net(&mut self, net: NetId, new_name: Id) -> Result<(), BindError> {
        if let Some(&existing) = self.design.net_by_name.get(&new_name) {
            if existing != net {
                return Err(BindError::NetExists {
                    name: self.interner.resolve(new_name).to_string(),
                });
            }
            return Ok(());
        }
        let old_name = {
            let n = self.design.nets.get_mut(net).ok_or(BindError::Unknown {
                kind: "net",
                name: format!("net#{net}"),
            })?;
            std::mem::replace(&mut n.name, new_name)
        };
        self.design.net_by_name.remove(&old_name);
        self.design.net_by_name.insert(new_name, net);
        Ok(())
    }

    // --- connectivity ---

    /// Connects a cell port to a net, registering it as the driver (output
    /// ports) or a user (input/inout ports). A second driver is an error
    /// naming both drivers.
    pub fn connect(&mut self, cell: CellId, port: Id, net: NetId) -> Result<(), BindError> {
        if self.design.nets.get(net).is_none() {
            return Err(BindError::Unknown {
                kind: "net",
                name: format!("net#{net}"),
            });
        }
        let dir = {
            let c = self.design.cells.get(cell).ok_or(BindError::Unknown {
                kind: "cell",
                name: format!("cell#{cell}"),
            })?;
            let p = c.port(port).ok_or_else(|| BindError::UnknownPort {
                cell: self.cell_name(cell),
                port: self.interner.resolve(port).to_string(),
            })?;
            if let Some(existing) = p.net {
                return Err(BindError::PortConnected {
                    cell: self.cell_name(cell),
                    port: self.interner.resolve(port).to_string(),
                    net: self.net_name(existing),
                });
            }
            p.dir
        };

        let port_ref = PortRef::new(cell, port);
        match dir {
            PortDir::Out => {
                if let Some(existing) = self.design.nets[net].driver {
                    if existing != port_ref {
                        return Err(BindError::SecondDriver {
                            net: self.net_name(net),
                            existing: self.port_ref_name(existing),
                            attempted: self.port_ref_name(port_ref),
                        });
                    }
                }
                self.design.nets[net].driver = Some(port_ref);
                let p = self.design.cells[cell].ports.get_mut(&port).unwrap_or_else(|| {
                    unreachable!("port existence checked above")
                });
                p.net = Some(net);
            }
            PortDir::In | PortDir::InOut => {
                let users = &mut self.design.nets[net].users;
                users.push(port_ref);
                let idx = users.len() - 1;
                let p = self.design.cells[cell].ports.get_mut(&port).unwrap_or_else(|| {
                    unreachable!("port existence checked above")
                });
                p.net = Some(net);
                p.user_idx = Some(idx);
            }
        }
        Ok(())
    }

    /// Disconnects a cell port from its net. Idempotent when the port is
    /// already unconnected.
    pub fn disconnect(&mut self, cell: CellId, port: Id) -> Result<(), BindError> {
        let (net, dir, user_idx) = {
            let c = self.design.cells.get(cell).ok_or(BindError::Unknown {
                kind: "cell",
                name: format!("cell#{cell}"),
            })?;
            let p = c.port(port).ok_or_else(|| BindError::UnknownPort {
                cell: self.cell_name(cell),
                port: self.interner.resolve(port).to_string(),
            })?;
            match p.net {
                Some(net) => (net, p.dir, p.user_idx),
                None => return Ok(()),
            }
        };

        let port_ref = PortRef::new(cell, port);
        match dir {
            PortDir::Out => {
                let n = &mut self.design.nets[net];
                if n.driver == Some(port_ref) {
                    n.driver = None;
                }
            }
            PortDir::In | PortDir::InOut => {
                if let Some(idx) = user_idx {
                    let n = &mut self.design.nets[net];
                    debug_assert_eq!(n.users[idx], port_ref);
                    n.users.swap_remove(idx);
                    // Fix the back-index of the entry that moved into `idx`.
                    if idx < n.users.len() {
                        let moved = n.users[idx];
                        if let Some(moved_port) =
                            self.design.cells[moved.cell].ports.get_mut(&moved.port)
                        {
                            moved_port.user_idx = Some(idx);
                        }
                    }
                }
            }
        }
        if let Some(p) = self.design.cells[cell].ports.get_mut(&port) {
            p.net = None;
            p.user_idx = None;
        }
        Ok(())
    }

    // --- bel bindings ---

    /// Binds a cell to a bel. Errors if the bel is occupied or the cell is
    /// already placed.
    pub fn bind_bel(
        &mut self,
        bel: BelId,
        cell: CellId,
        strength: Strength,
    ) -> Result<(), BindError> {
        if let Some(&occupant) = self.bel_bindings.get(&bel) {
            return Err(BindError::BelBound {
                bel: self.chip.bel_name(bel),
                cell: self.cell_name(occupant),
            });
        }
        let c = self.design.cells.get_mut(cell).ok_or(BindError::Unknown {
            kind: "cell",
            name: format!("cell#{cell}"),
        })?;
        if let Some(current) = c.bel {
            return Err(BindError::CellPlaced {
                cell: self.interner.resolve(c.name).to_string(),
                bel: self.chip.bel_name(current),
            });
        }
        c.bel = Some(bel);
        c.bel_strength = strength;
        self.bel_bindings.insert(bel, cell);
        Ok(())
    }

    /// Releases a bel. Errors if it is not bound.
    pub fn unbind_bel(&mut self, bel: BelId) -> Result<(), BindError> {
        let cell = self
            .bel_bindings
            .remove(&bel)
            .ok_or_else(|| BindError::BelNotBound {
                bel: self.chip.bel_name(bel),
            })?;
        if let Some(c) = self.design.cells.get_mut(cell) {
            c.bel = None;
            c.bel_strength = Strength::None;
        }
        Ok(())
    }

    // --- wire bindings ---

    /// Returns the canonical form of a wire handle.
    pub fn canonical(&self, wire: WireId) -> WireId {
        if wire.is_node() {
            wire
        } else {
            self.chip.canonical_wire(wire.tile_index(), wire.index)
        }
    }

    /// Binds a wire to a net as a routing root (no driving pip).
    pub fn bind_wire(
        &mut self,
        wire: WireId,
        net: NetId,
        strength: Strength,
    ) -> Result<(), BindError> {
        let wire = self.canonical(wire);
        if let Some(&occupant) = self.wire_bindings.get(&wire) {
            return Err(BindError::WireBound {
                wire: self.chip.wire_name(wire),
                net: self.net_name(occupant),
            });
        }
        let n = self.design.nets.get_mut(net).ok_or(BindError::Unknown {
            kind: "net",
            name: format!("net#{net}"),
        })?;
        n.wires.insert(
            wire,
            WireBinding {
                pip: None,
                strength,
            },
        );
        self.wire_bindings.insert(wire, net);
        Ok(())
    }

    /// Releases a wire. If its binding carries a pip, the pip is released in
    /// the same call.
    pub fn unbind_wire(&mut self, wire: WireId) -> Result<(), BindError> {
        let wire = self.canonical(wire);
        let net = self
            .wire_bindings
            .remove(&wire)
            .ok_or_else(|| BindError::WireNotBound {
                wire: self.chip.wire_name(wire),
            })?;
        if let Some(n) = self.design.nets.get_mut(net) {
            if let Some(binding) = n.wires.remove(&wire) {
                if let Some(pip) = binding.pip {
                    self.pip_bindings.remove(&pip);
                }
            }
        }
        Ok(())
    }

    // --- pip bindings ---

    /// Binds a pip to a net; the pip's destination wire is bound to the same
    /// net in the same call. Errors if the pip or the destination wire is
    /// already held.
    pub fn bind_pip(
        &mut self,
        pip: PipId,
        net: NetId,
        strength: Strength,
    ) -> Result<(), BindError> {
        if let Some(&occupant) = self.pip_bindings.get(&pip) {
            return Err(BindError::PipBound {
                pip: self.chip.pip_name(pip),
                net: self.net_name(occupant),
            });
        }
        let dst = self.chip.pip_dst_wire(pip);
        if let Some(&occupant) = self.wire_bindings.get(&dst) {
            return Err(BindError::WireBound {
                wire: self.chip.wire_name(dst),
                net: self.net_name(occupant),
            });
        }
        let n = self.design.nets.get_mut(net).ok_or(BindError::Unknown {
            kind: "net",
            name: format!("net#{net}"),
        })?;
        n.wires.insert(
            dst,
            WireBinding {
                pip: Some(pip),
                strength,
            },
        );
        self.wire_bindings.insert(dst, net);
        self.pip_bindings.insert(pip, net);
        Ok(())
    }

    /// Releases a pip and its implied destination wire.
    pub fn unbind_pip(&mut self, pip: PipId) -> Result<(), BindError> {
        let net = self
            .pip_bindings
            .remove(&pip)
            .ok_or_else(|| BindError::PipNotBound {
                pip: self.chip.pip_name(pip),
            })?;
        let dst = self.chip.pip_dst_wire(pip);
        self.wire_bindings.remove(&dst);
        if let Some(n) = self.design.nets.get_mut(net) {
            n.wires.remove(&dst);
        }
        Ok(())
    }

    // --- availability and occupancy queries ---

    /// Returns `true` if no cell is bound to the bel.
    pub fn check_bel_avail(&self, bel: BelId) -> bool {
        !self.bel_bindings.contains_key(&bel)
    }

    /// Returns `true` if no net is bound to the wire.
    pub fn check_wire_avail(&self, wire: WireId) -> bool {
        !self.wire_bindings.contains_key(&self.canonical(wire))
    }

    /// Returns `true` if no net is bound to the pip.
    pub fn check_pip_avail(&self, pip: PipId) -> bool {
        !self.pip_bindings.contains_key(&pip)
    }

    /// Returns the cell bound to a bel.
    pub fn bound_bel_cell(&self, bel: BelId) -> Option<CellId> {
        self.bel_bindings.get(&bel).copied()
    }

    /// Returns the net bound to a wire.
    pub fn bound_wire_net(&self, wire: WireId) -> Option<NetId> {
        self.wire_bindings.get(&self.canonical(wire)).copied()
    }

    /// Returns the net bound to a pip.
    pub fn bound_pip_net(&self, pip: PipId) -> Option<NetId> {
        self.pip_bindings.get(&pip).copied()
    }

    /// Iterates over all current bel bindings.
    pub fn bound_bels(&self) -> impl Iterator<Item = (BelId, CellId)> + '_ {
        self.bel_bindings.iter().map(|(&b, &c)| (b, c))
    }

    /// Iterates over all current wire bindings.
    pub fn bound_wires(&self) -> impl Iterator<Item = (WireId, NetId)> + '_ {
        self.wire_bindings.iter().map(|(&w, &n)| (w, n))
    }

    /// Iterates over all current pip bindings.
    pub fn bound_pips(&self) -> impl Iterator<Item = (PipId, NetId)> + '_ {
        self.pip_bindings.iter().map(|(&p, &n)| (p, n))
    }

    // --- derived device queries ---

    /// Returns the interned kind of a bel.
    pub fn bel_kind(&self, bel: BelId) -> Id {
        let ty = self.chip.tiles[bel.tile_index()].type_idx as usize;
        self.tile_type_ids[ty].bel_kind[bel.index as usize]
    }

    /// Returns the canonical wire attached to a bel pin, by interned name.
    pub fn bel_pin_wire(&self, bel: BelId, pin: Id) -> Option<WireId> {
        let tile = bel.tile_index();
        let ty = self.chip.tiles[tile].type_idx as usize;
        self.tile_type_ids[ty].bel_pin_wire[bel.index as usize]
            .get(&pin)
            .map(|&w| self.chip.canonical_wire(tile, w))
    }

    /// Returns the wire a cell port lands on: the pin map (if the packer
    /// recorded one) translates the logical port to its bel pin.
    pub fn cell_port_wire(&self, cell: CellId, port: Id) -> Option<WireId> {
        let c = self.design.cells.get(cell)?;
        let bel = c.bel?;
        let pin = c
            .pin_map
            .as_ref()
            .and_then(|m| m.get(port))
            .unwrap_or(port);
        self.bel_pin_wire(bel, pin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_chipdb::{ChipDbBuilder, Delay, PinDir, PipClass};
    use kestrel_common::constids;

    /// Two-tile device: each tile has a LUT4 bel with O on w0 and I0 on w2,
    /// a pip w0->w1, and w1/w2 joined into an inter-tile node.
    fn ctx() -> Context {
        let mut b = ChipDbBuilder::new("ctx", 2, 1);
        let tt = b.add_tile_type("T");
        let w0 = b.add_wire(tt, "w0");
        let w1 = b.add_wire(tt, "w1");
        let w2 = b.add_wire(tt, "w2");
        b.add_pip(tt, w0, w1, PipClass::Regular, Delay::ZERO);
        let bel = b.add_bel(tt, "LC0", "LUT4", 0);
        b.add_bel_pin(tt, bel, "O", PinDir::Out, w0);
        b.add_bel_pin(tt, bel, "I0", PinDir::In, w2);
        b.set_tile(0, 0, tt);
        b.set_tile(1, 0, tt);
        b.add_node(&[(0, w1), (1, w2)]);
        Context::new(b.finish())
    }

    fn lut_cell(ctx: &mut Context, name: &str) -> CellId {
        let name = ctx.id(name);
        let id = ctx.create_cell(name, constids::LUT4).unwrap();
        ctx.design.cells[id].add_port(constids::I0, PortDir::In);
        ctx.design.cells[id].add_port(constids::O, PortDir::Out);
        id
    }

    #[test]
    fn create_cell_rejects_duplicate() {
        let mut ctx = ctx();
        lut_cell(&mut ctx, "a");
        let name = ctx.id("a");
        let err = ctx.create_cell(name, constids::LUT4).unwrap_err();
        assert!(matches!(err, BindError::CellExists { .. }));
    }

    #[test]
    fn connect_driver_and_user() {
        let mut ctx = ctx();
        let a = lut_cell(&mut ctx, "a");
        let b = lut_cell(&mut ctx, "b");
        let net = ctx.create_net(ctx.id("n")).unwrap();

        ctx.connect(a, constids::O, net).unwrap();
        ctx.connect(b, constids::I0, net).unwrap();

        let n = &ctx.design.nets[net];
        assert_eq!(n.driver, Some(PortRef::new(a, constids::O)));
        assert_eq!(n.users, vec![PortRef::new(b, constids::I0)]);
        assert_eq!(
            ctx.design.cells[b].port(constids::I0).unwrap().user_idx,
            Some(0)
        );
    }

    #[test]
    fn second_driver_names_both() {
        let mut ctx = ctx();
        let a = lut_cell(&mut ctx, "a");
        let b = lut_cell(&mut ctx, "b");
        let net = ctx.create_net(ctx.id("n")).unwrap();
        ctx.connect(a, constids::O, net).unwrap();
        let err = ctx.connect(b, constids::O, net).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("a.O"));
        assert!(msg.contains("b.O"));
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut ctx = ctx();
        let a = lut_cell(&mut ctx, "a");
        let net = ctx.create_net(ctx.id("n")).unwrap();
        ctx.connect(a, constids::I0, net).unwrap();
        ctx.disconnect(a, constids::I0).unwrap();
        ctx.disconnect(a, constids::I0).unwrap();
        assert!(ctx.design.nets[net].users.is_empty());
    }

    #[test]
    fn disconnect_fixes_moved_back_index() {
        let mut ctx = ctx();
        let a = lut_cell(&mut ctx, "a");
        let b = lut_cell(&mut ctx, "b");
        let c = lut_cell(&mut ctx, "c");
        let net = ctx.create_net(ctx.id("n")).unwrap();
        ctx.connect(a, constids::I0, net).unwrap();
        ctx.connect(b, constids::I0, net).unwrap();
        ctx.connect(c, constids::I0, net).unwrap();

        // Removing the first user swaps the last into index 0.
        ctx.disconnect(a, constids::I0).unwrap();
        let n = &ctx.design.nets[net];
        assert_eq!(n.users.len(), 2);
        for (idx, user) in n.users.iter().enumerate() {
            assert_eq!(
                ctx.design.cells[user.cell].port(user.port).unwrap().user_idx,
                Some(idx)
            );
        }
    }

    #[test]
    fn bel_binding_uniqueness() {
        let mut ctx = ctx();
        let a = lut_cell(&mut ctx, "a");
        let b = lut_cell(&mut ctx, "b");
        let bel = BelId::new(0, 0);
        ctx.bind_bel(bel, a, Strength::Strong).unwrap();
        assert!(!ctx.check_bel_avail(bel));
        assert_eq!(ctx.bound_bel_cell(bel), Some(a));

        let err = ctx.bind_bel(bel, b, Strength::Strong).unwrap_err();
        assert!(matches!(err, BindError::BelBound { .. }));

        ctx.unbind_bel(bel).unwrap();
        assert!(ctx.check_bel_avail(bel));
        assert!(ctx.design.cells[a].bel.is_none());
        assert!(matches!(
            ctx.unbind_bel(bel).unwrap_err(),
            BindError::BelNotBound { .. }
        ));
    }

    #[test]
    fn wire_binding_canonicalizes() {
        let mut ctx = ctx();
        let net = ctx.create_net(ctx.id("n")).unwrap();
        // (0, w1) is half of the inter-tile node.
        ctx.bind_wire(WireId::new(0, 1), net, Strength::Strong).unwrap();
        // The other half resolves to the same canonical wire.
        assert!(!ctx.check_wire_avail(WireId::new(1, 2)));
        let stored: Vec<WireId> = ctx.design.nets[net].wires.keys().copied().collect();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].is_node());
    }

    #[test]
    fn bind_pip_binds_dst_wire_atomically() {
        let mut ctx = ctx();
        let net = ctx.create_net(ctx.id("n")).unwrap();
        let pip = PipId::new(0, 0); // w0 -> w1 (nodal)
        ctx.bind_pip(pip, net, Strength::Strong).unwrap();

        let dst = ctx.chip().pip_dst_wire(pip);
        assert_eq!(ctx.bound_pip_net(pip), Some(net));
        assert_eq!(ctx.bound_wire_net(dst), Some(net));
        let binding = ctx.design.nets[net].wires[&dst];
        assert_eq!(binding.pip, Some(pip));
    }

    #[test]
    fn bind_pip_rejects_occupied_dst() {
        let mut ctx = ctx();
        let n1 = ctx.create_net(ctx.id("n1")).unwrap();
        let n2 = ctx.create_net(ctx.id("n2")).unwrap();
        let pip = PipId::new(0, 0);
        let dst = ctx.chip().pip_dst_wire(pip);
        ctx.bind_wire(dst, n1, Strength::Strong).unwrap();
        let err = ctx.bind_pip(pip, n2, Strength::Strong).unwrap_err();
        assert!(matches!(err, BindError::WireBound { .. }));
    }

    #[test]
    fn unbind_wire_releases_carried_pip() {
        let mut ctx = ctx();
        let net = ctx.create_net(ctx.id("n")).unwrap();
        let pip = PipId::new(0, 0);
        ctx.bind_pip(pip, net, Strength::Strong).unwrap();
        let dst = ctx.chip().pip_dst_wire(pip);

        ctx.unbind_wire(dst).unwrap();
        assert!(ctx.check_pip_avail(pip));
        assert!(ctx.check_wire_avail(dst));
        assert!(ctx.design.nets[net].wires.is_empty());
    }

    #[test]
    fn unbind_pip_releases_dst_wire() {
        let mut ctx = ctx();
        let net = ctx.create_net(ctx.id("n")).unwrap();
        let pip = PipId::new(0, 0);
        ctx.bind_pip(pip, net, Strength::Strong).unwrap();
        ctx.unbind_pip(pip).unwrap();
        assert!(ctx.check_wire_avail(ctx.chip().pip_dst_wire(pip)));
        assert!(ctx.design.nets[net].wires.is_empty());
    }

    #[test]
    fn remove_cell_cleans_up() {
        let mut ctx = ctx();
        let a = lut_cell(&mut ctx, "a");
        let b = lut_cell(&mut ctx, "b");
        let net = ctx.create_net(ctx.id("n")).unwrap();
        ctx.connect(a, constids::O, net).unwrap();
        ctx.connect(b, constids::I0, net).unwrap();
        ctx.bind_bel(BelId::new(0, 0), a, Strength::Strong).unwrap();

        ctx.remove_cell(a).unwrap();
        assert!(ctx.design.cells.get(a).is_none());
        assert!(ctx.design.nets[net].driver.is_none());
        assert!(ctx.check_bel_avail(BelId::new(0, 0)));
        assert!(ctx.design.cell_id(ctx.id("a")).is_none());
    }

    #[test]
    fn remove_net_cleans_up() {
        let mut ctx = ctx();
        let a = lut_cell(&mut ctx, "a");
        let b = lut_cell(&mut ctx, "b");
        let net = ctx.create_net(ctx.id("n")).unwrap();
        ctx.connect(a, constids::O, net).unwrap();
        ctx.connect(b, constids::I0, net).unwrap();
        ctx.bind_pip(PipId::new(0, 0), net, Strength::Strong).unwrap();

        ctx.remove_net(net).unwrap();
        assert!(ctx.design.nets.get(net).is_none());
        assert!(ctx.design.cells[a].port(constids::O).unwrap().net.is_none());
        assert!(ctx.design.cells[b].port(constids::I0).unwrap().net.is_none());
        assert!(ctx.check_pip_avail(PipId::new(0, 0)));
    }

    #[test]
    fn bel_kind_and_pin_wires() {
        let ctx = ctx();
        let bel = BelId::new(1, 0);
        assert_eq!(ctx.bel_kind(bel), constids::LUT4);
        // O sits on tile 1's local w0.
        assert_eq!(ctx.bel_pin_wire(bel, constids::O), Some(WireId::new(1, 0)));
        // I0 sits on tile 1's w2, which is nodal.
        let i0 = ctx.bel_pin_wire(bel, constids::I0).unwrap();
        assert!(i0.is_node());
        assert_eq!(ctx.bel_pin_wire(bel, constids::I1), None);
    }

    #[test]
    fn cell_port_wire_respects_pin_map() {
        let mut ctx = ctx();
        let a = lut_cell(&mut ctx, "a");
        ctx.bind_bel(BelId::new(0, 0), a, Strength::Strong).unwrap();
        // Without a pin map the port maps straight to its bel pin.
        assert_eq!(
            ctx.cell_port_wire(a, constids::O),
            Some(WireId::new(0, 0))
        );
        // A pin map rewrites the lookup.
        let mut map = kestrel_netlist::PinMap::new();
        map.set(constids::I1, constids::I0);
        ctx.design.cells[a].pin_map = Some(map);
        assert_eq!(
            ctx.cell_port_wire(a, constids::I1),
            ctx.bel_pin_wire(BelId::new(0, 0), constids::I0)
        );
    }
}
