//! Post-route rewrite.
//!
//! Brings the design in line with what the router actually did before
//! export: route-through bels become real pass-through cells, LUT truth
//! tables are recomputed for the physical pin order the router chose,
//! undriven nets lose their bindings, and dead branches left by rip-up and
//! crossbar normalization are pruned. Running the pass a second time
//! changes nothing.

use crate::router::RouteError;
use kestrel_arch::Architecture;
use kestrel_chipdb::{BelId, PipClass, WireId};
use kestrel_common::{constids, Id};
use kestrel_context::Context;
use kestrel_diagnostics::{Category, Diagnostic, DiagnosticSink};
use kestrel_netlist::{NetId, Property, Strength};
use std::collections::HashSet;

/// Counters reported by the post-route pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PostRouteStats {
    /// Route-through bels reified into cells.
    pub route_throughs: usize,
    /// LUTs whose truth table was rewritten for pin permutation.
    pub permuted_luts: usize,
    /// Wires unbound from undriven nets.
    pub undriven_cleared: usize,
    /// Dead branch wires pruned.
    pub pruned_wires: usize,
}

/// Runs the full post-route pass.
pub fn postroute(
    ctx: &mut Context,
    arch: &dyn Architecture,
    sink: &DiagnosticSink,
) -> Result<PostRouteStats, RouteError> {
    let mut stats = PostRouteStats {
        route_throughs: reify_route_throughs(ctx)?,
        permuted_luts: apply_lut_permutations(ctx, arch),
        ..Default::default()
    };
    stats.undriven_cleared = clear_undriven_nets(ctx)?;
    stats.pruned_wires = prune_dead_branches(ctx)?;

    sink.emit(Diagnostic::note(
        Category::Congestion,
        format!(
            "post-route: {} route-throughs, {} permuted LUTs, {} pruned wires",
            stats.route_throughs, stats.permuted_luts, stats.pruned_wires
        ),
    ));
    Ok(stats)
}

/// The truth table of a LUT4 passing input `k` straight through.
fn passthrough_init(k: u32) -> i64 {
    let mut init = 0i64;
    for addr in 0..16 {
        if (addr >> k) & 1 == 1 {
            init |= 1 << addr;
        }
    }
    init
}

/// Materializes a synthetic cell on every bel crossed in pass-through mode.
fn reify_route_throughs(ctx: &mut Context) -> Result<usize, RouteError> {
    let crossings: Vec<(BelId, WireId)> = ctx
        .bound_pips()
        .filter_map(|(pip, _)| match ctx.chip().pip_data(pip).class {
            PipClass::RouteThru { bel } => Some((
                BelId::new(pip.tile_index(), bel),
                ctx.chip().pip_src_wire(pip),
            )),
            _ => None,
        })
        .collect();

    let mut reified = 0usize;
    for (bel, src_wire) in crossings {
        if ctx.bound_bel_cell(bel).is_some() {
            continue; // already reified (or hosting the crossed cell)
        }
        // Which LUT input does the crossing enter on?
        let mut input = 0u32;
        for (k, &pin) in [constids::I0, constids::I1, constids::I2, constids::I3]
            .iter()
            .enumerate()
        {
            if ctx.bel_pin_wire(bel, pin) == Some(src_wire) {
                input = k as u32;
                break;
            }
        }
        let name = ctx.id(&format!("$route_thru${}", ctx.chip().bel_name(bel)));
        let cell = ctx.create_cell(name, constids::ROUTETHRU)?;
        ctx.design.cells[cell]
            .params
            .insert(constids::INIT, Property::Int(passthrough_init(input)));
        ctx.bind_bel(bel, cell, Strength::Fixed)?;
        reified += 1;
    }
    Ok(reified)
}

/// Rewrites each permuted LUT's truth table to match its physical pins.
fn apply_lut_permutations(ctx: &mut Context, arch: &dyn Architecture) -> usize {
    let order: Vec<Id> = arch.lut_pin_order().to_vec();
    if order.is_empty() {
        return 0;
    }
    let applied_key = ctx.id("LUT_PERM_APPLIED");

    let luts: Vec<_> = ctx
        .design
        .cells
        .iter()
        .filter(|(_, c)| {
            (c.kind == constids::LUT4 || c.kind == constids::LOGIC)
                && c.pin_map.is_some()
                && !c.attrs.contains_key(&applied_key)
        })
        .map(|(id, _)| id)
        .collect();

    let mut rewritten = 0usize;
    for cell_id in luts {
        let cell = &ctx.design.cells[cell_id];
        let Some(map) = &cell.pin_map else { continue };

        // perm[i] = physical pin index carrying logical input i.
        let mut perm = Vec::with_capacity(order.len());
        for (i, &logical) in order.iter().enumerate() {
            let phys = map.get(logical).unwrap_or(logical);
            let j = order.iter().position(|&p| p == phys).unwrap_or(i);
            perm.push(j);
        }
        let identity = perm.iter().enumerate().all(|(i, &j)| i == j);

        let cell = &mut ctx.design.cells[cell_id];
        if !identity {
            if let Some(old) = cell.params.get(&constids::INIT).and_then(|p| p.as_int()) {
                let bits = order.len();
                let mut new_init = 0i64;
                for addr in 0..(1usize << bits) {
                    let mut logical_addr = 0usize;
                    for (i, &j) in perm.iter().enumerate() {
                        logical_addr |= ((addr >> j) & 1) << i;
                    }
                    new_init |= ((old >> logical_addr) & 1) << addr;
                }
                cell.params.insert(constids::INIT, Property::Int(new_init));
                rewritten += 1;
            }
        }
        cell.attrs.insert(applied_key, Property::Int(1));
    }
    rewritten
}

/// Unbinds every wire of a net that has bindings but no driver.
fn clear_undriven_nets(ctx: &mut Context) -> Result<usize, RouteError> {
    let undriven: Vec<NetId> = ctx
        .design
        .nets
        .iter()
        .filter(|(_, n)| n.driver.is_none() && !n.wires.is_empty())
        .map(|(id, _)| id)
        .collect();
    let mut cleared = 0usize;
    for net in undriven {
        let wires: Vec<WireId> = ctx.design.nets[net].wires.keys().copied().collect();
        for wire in wires {
            if ctx.bound_wire_net(wire) == Some(net) {
                ctx.unbind_wire(wire)?;
                cleared += 1;
            }
        }
    }
    Ok(cleared)
}

/// Removes bound wires that neither reach a sink nor feed further pips.
fn prune_dead_branches(ctx: &mut Context) -> Result<usize, RouteError> {
    let nets: Vec<NetId> = ctx.design.nets.ids().collect();
    let mut pruned = 0usize;
    for net in nets {
        let Some(root) = ctx.design.nets[net].root_wire() else {
            continue;
        };
        // Sink wires, through the recorded pin maps.
        let mut keep: HashSet<WireId> = HashSet::new();
        keep.insert(root);
        let users: Vec<_> = ctx.design.nets[net].users.clone();
        for user in users {
            if let Some(wire) = ctx.cell_port_wire(user.cell, user.port) {
                keep.insert(wire);
            }
        }

        loop {
            // Wires that feed a bound pip of this net stay.
            let mut feeds: HashSet<WireId> = HashSet::new();
            for binding in ctx.design.nets[net].wires.values() {
                if let Some(pip) = binding.pip {
                    feeds.insert(ctx.chip().pip_src_wire(pip));
                }
            }
            let dead: Vec<WireId> = ctx.design.nets[net]
                .wires
                .keys()
                .filter(|w| !keep.contains(w) && !feeds.contains(w))
                .copied()
                .collect();
            if dead.is_empty() {
                break;
            }
            for wire in dead {
                ctx.unbind_wire(wire)?;
                pruned += 1;
            }
        }
    }
    Ok(pruned)
}
