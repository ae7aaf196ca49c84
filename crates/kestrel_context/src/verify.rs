//! Whole-design invariant checking.
//!
//! [`check`] walks the entire design and binding tables and returns every
//! violation of the structural invariants; [`check_routing`] additionally
//! proves each routed net's users reachable from its driver through bound
//! pips alone. Test suites call these after every phase.

use crate::context::Context;
use kestrel_netlist::PortDir;
use std::collections::{HashMap, HashSet, VecDeque};

/// Checks the structural invariants and returns human-readable violations.
///
/// Covered: bel/wire/pip binding symmetry, driver uniqueness, user
/// back-links, canonical wire form, and exclusivity of every wire and pip.
pub fn check(ctx: &Context) -> Vec<String> {
    let mut violations = Vec::new();

    // Bel bindings and cell placements mirror each other.
    for (bel, cell) in ctx.bound_bels() {
        match ctx.design.cells.get(cell) {
            Some(c) if c.bel == Some(bel) => {}
            Some(_) => violations.push(format!(
                "bel {} bound to cell {} which does not point back",
                ctx.chip().bel_name(bel),
                ctx.cell_name(cell)
            )),
            None => violations.push(format!(
                "bel {} bound to dead cell #{cell}",
                ctx.chip().bel_name(bel)
            )),
        }
    }
    for (id, cell) in ctx.design.cells.iter() {
        if let Some(bel) = cell.bel {
            if ctx.bound_bel_cell(bel) != Some(id) {
                violations.push(format!(
                    "cell {} claims bel {} which is not bound to it",
                    ctx.cell_name(id),
                    ctx.chip().bel_name(bel)
                ));
            }
        }
    }

    // Wire bindings mirror net wire maps, and wires are canonical.
    let mut wires_seen: HashMap<_, _> = HashMap::new();
    for (wire, net) in ctx.bound_wires() {
        match ctx.design.nets.get(net) {
            Some(n) if n.wires.contains_key(&wire) => {}
            Some(_) => violations.push(format!(
                "wire {} bound to net {} with no matching entry",
                ctx.chip().wire_name(wire),
                ctx.net_name(net)
            )),
            None => violations.push(format!(
                "wire {} bound to dead net #{net}",
                ctx.chip().wire_name(wire)
            )),
        }
    }
    for (id, net) in ctx.design.nets.iter() {
        for (&wire, binding) in &net.wires {
            if ctx.canonical(wire) != wire {
                violations.push(format!(
                    "net {} holds non-canonical wire {}",
                    ctx.net_name(id),
                    ctx.chip().wire_name(wire)
                ));
            }
            if ctx.bound_wire_net(wire) != Some(id) {
                violations.push(format!(
                    "net {} lists wire {} which is not bound to it",
                    ctx.net_name(id),
                    ctx.chip().wire_name(wire)
                ));
            }
            if let Some(prev) = wires_seen.insert(wire, id) {
                violations.push(format!(
                    "wire {} appears in nets {} and {}",
                    ctx.chip().wire_name(wire),
                    ctx.net_name(prev),
                    ctx.net_name(id)
                ));
            }
            if let Some(pip) = binding.pip {
                if ctx.bound_pip_net(pip) != Some(id) {
                    violations.push(format!(
                        "net {} reaches wire {} via pip {} not bound to it",
                        ctx.net_name(id),
                        ctx.chip().wire_name(wire),
                        ctx.chip().pip_name(pip)
                    ));
                }
                let dst = ctx.chip().pip_dst_wire(pip);
                if dst != wire {
                    violations.push(format!(
                        "net {}: binding pip {} does not land on wire {}",
                        ctx.net_name(id),
                        ctx.chip().pip_name(pip),
                        ctx.chip().wire_name(wire)
                    ));
                }
            }
        }
    }

    // Driver uniqueness and user back-links.
    for (id, net) in ctx.design.nets.iter() {
        if let Some(driver) = net.driver {
            match ctx
                .design
                .cells
                .get(driver.cell)
                .and_then(|c| c.port(driver.port))
            {
                Some(p) if p.net == Some(id) && p.dir == PortDir::Out => {}
                _ => violations.push(format!(
                    "net {} driver {}.{} does not point back",
                    ctx.net_name(id),
                    ctx.cell_name(driver.cell),
                    ctx.str_of(driver.port)
                )),
            }
        }
        for (idx, user) in net.users.iter().enumerate() {
            match ctx
                .design
                .cells
                .get(user.cell)
                .and_then(|c| c.port(user.port))
            {
                Some(p) if p.net == Some(id) && p.user_idx == Some(idx) => {}
                _ => violations.push(format!(
                    "net {} user {}.{} has a stale back-link",
                    ctx.net_name(id),
                    ctx.cell_name(user.cell),
                    ctx.str_of(user.port)
                )),
            }
        }
    }

    // Cell ports that claim a net must appear in it.
    for (id, cell) in ctx.design.cells.iter() {
        for port in cell.ports.values() {
            if let Some(net) = port.net {
                let Some(n) = ctx.design.nets.get(net) else {
                    violations.push(format!(
                        "cell {} port {} references dead net #{net}",
                        ctx.cell_name(id),
                        ctx.str_of(port.name)
                    ));
                    continue;
                };
                let port_ref = kestrel_netlist::PortRef::new(id, port.name);
                let present = match port.dir {
                    PortDir::Out => n.driver == Some(port_ref),
                    PortDir::In | PortDir::InOut => n.users.contains(&port_ref),
                };
                if !present {
                    violations.push(format!(
                        "cell {} port {} claims net {} which does not list it",
                        ctx.cell_name(id),
                        ctx.str_of(port.name),
                        ctx.net_name(net)
                    ));
                }
            }
        }
    }

    violations
}

/// Checks post-route reachability: for every routed net with a placed
/// driver, every user's bel-pin wire is reachable from the driver's bel-pin
/// wire through the net's own bound pips.
pub fn check_routing(ctx: &Context) -> Vec<String> {
    let mut violations = Vec::new();

    for (id, net) in ctx.design.nets.iter() {
        if net.wires.is_empty() {
            continue;
        }
        let Some(driver) = net.driver else { continue };
        let Some(root) = ctx.cell_port_wire(driver.cell, driver.port) else {
            continue;
        };

        // Flood from the root through this net's own bindings.
        let owned: HashSet<_> = net.wires.keys().copied().collect();
        let mut reached = HashSet::new();
        let mut queue = VecDeque::new();
        if owned.contains(&root) {
            reached.insert(root);
            queue.push_back(root);
        } else {
            violations.push(format!(
                "net {}: driver wire {} is not bound to the net",
                ctx.net_name(id),
                ctx.chip().wire_name(root)
            ));
            continue;
        }
        while let Some(wire) = queue.pop_front() {
            for pip in ctx.chip().pips_downhill(wire) {
                if ctx.bound_pip_net(pip) != Some(id) {
                    continue;
                }
                let dst = ctx.chip().pip_dst_wire(pip);
                if owned.contains(&dst) && reached.insert(dst) {
                    queue.push_back(dst);
                }
            }
        }

        for user in &net.users {
            if let Some(wire) = ctx.cell_port_wire(user.cell, user.port) {
                if !reached.contains(&wire) {
                    violations.push(format!(
                        "net {}: user {}.{} wire {} unreachable from driver",
                        ctx.net_name(id),
                        ctx.cell_name(user.cell),
                        ctx.str_of(user.port),
                        ctx.chip().wire_name(wire)
                    ));
                }
            }
        }
    }

    violations
}

/// Panics with a readable report if any invariant is violated. Test helper.
pub fn assert_valid(ctx: &Context) {
    let violations = check(ctx);
    assert!(
        violations.is_empty(),
        "design invariant violations:\n{}",
        violations.join("\n")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_chipdb::{BelId, ChipDbBuilder, Delay, PinDir, PipClass, PipId};
    use kestrel_common::constids;
    use kestrel_netlist::{PortDir, Strength};

    fn ctx() -> Context {
        let mut b = ChipDbBuilder::new("v", 1, 1);
        let tt = b.add_tile_type("T");
        let w0 = b.add_wire(tt, "w0");
        let w1 = b.add_wire(tt, "w1");
        b.add_pip(tt, w0, w1, PipClass::Regular, Delay::ZERO);
        let lut = b.add_bel(tt, "LC0", "LUT4", 0);
        b.add_bel_pin(tt, lut, "O", PinDir::Out, w0);
        let ff = b.add_bel(tt, "FF0", "DFF", 1);
        b.add_bel_pin(tt, ff, "D", PinDir::In, w1);
        b.set_tile(0, 0, tt);
        Context::new(b.finish())
    }

    fn connected_pair(ctx: &mut Context) -> (kestrel_netlist::CellId, kestrel_netlist::NetId) {
        let a = ctx.create_cell(ctx.id("a"), constids::LUT4).unwrap();
        ctx.design.cells[a].add_port(constids::O, PortDir::Out);
        let b = ctx.create_cell(ctx.id("b"), constids::DFF).unwrap();
        ctx.design.cells[b].add_port(constids::D, PortDir::In);
        let net = ctx.create_net(ctx.id("n")).unwrap();
        ctx.connect(a, constids::O, net).unwrap();
        ctx.connect(b, constids::D, net).unwrap();
        ctx.bind_bel(BelId::new(0, 0), a, Strength::Strong).unwrap();
        ctx.bind_bel(BelId::new(0, 1), b, Strength::Strong).unwrap();
        (a, net)
    }

    #[test]
    fn clean_design_passes() {
        let mut ctx = ctx();
        connected_pair(&mut ctx);
        assert!(check(&ctx).is_empty());
    }

    #[test]
    fn corrupted_back_pointer_is_reported() {
        let mut ctx = ctx();
        let (a, _) = connected_pair(&mut ctx);
        // Break the mirror directly, bypassing the Context API.
        ctx.design.cells[a].bel = None;
        let violations = check(&ctx);
        assert!(!violations.is_empty());
        assert!(violations[0].contains("does not point back"));
    }

    #[test]
    fn routed_net_reachability() {
        let mut ctx = ctx();
        let (_, net) = connected_pair(&mut ctx);
        ctx.bind_wire(kestrel_chipdb::WireId::new(0, 0), net, Strength::Strong)
            .unwrap();
        ctx.bind_pip(PipId::new(0, 0), net, Strength::Strong).unwrap();
        assert!(check(&ctx).is_empty());
        assert!(check_routing(&ctx).is_empty());
    }

    #[test]
    fn unreachable_user_is_reported() {
        let mut ctx = ctx();
        let (_, net) = connected_pair(&mut ctx);
        // Root bound, but no pip to the user's wire.
        ctx.bind_wire(kestrel_chipdb::WireId::new(0, 0), net, Strength::Strong)
            .unwrap();
        let violations = check_routing(&ctx);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("unreachable"));
    }
}
