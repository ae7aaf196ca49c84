//! Crossbar selection fix-up.
//!
//! Pips sharing a crossbar group within one tile select inputs of a single
//! physical mux. A net fanning out through the same crossbar twice must use
//! one input: walking each net downstream from its driver, the first
//! upstream wire seen per `(tile, group)` key is recorded, and any later
//! crossbar pip of the same net that disagrees is rebound to the pip from
//! the recorded wire.

use crate::router::RouteError;
use kestrel_chipdb::{PipClass, PipId, WireId};
use kestrel_context::Context;
use kestrel_diagnostics::{Category, Diagnostic, DiagnosticSink};
use kestrel_netlist::{NetId, Strength};
use std::collections::{HashMap, VecDeque};

/// Rewrites redundant crossbar selections on every net. Returns the number
/// of pips rebound.
pub fn fixup_crossbars(ctx: &mut Context, sink: &DiagnosticSink) -> Result<usize, RouteError> {
    let nets: Vec<NetId> = ctx.design.nets.ids().collect();
    let mut rewritten = 0usize;
    for net in nets {
        rewritten += fixup_net(ctx, net)?;
    }
    if rewritten > 0 {
        sink.emit(Diagnostic::note(
            Category::Congestion,
            format!("normalized {rewritten} crossbar selections"),
        ));
    }
    Ok(rewritten)
}

fn fixup_net(ctx: &mut Context, net: NetId) -> Result<usize, RouteError> {
    let Some(root) = ctx.design.nets[net].root_wire() else {
        return Ok(0);
    };

    // Downstream adjacency from the net's own bindings.
    let mut children: HashMap<WireId, Vec<(PipId, WireId)>> = HashMap::new();
    for (&wire, binding) in &ctx.design.nets[net].wires {
        if let Some(pip) = binding.pip {
            let src = ctx.chip().pip_src_wire(pip);
            children.entry(src).or_default().push((pip, wire));
        }
    }
    // Deterministic traversal order.
    for list in children.values_mut() {
        list.sort_unstable_by_key(|&(pip, _)| pip);
    }

    // BFS from the driver, recording the first selected input per
    // (tile, crossbar group) and collecting disagreeing pips.
    let mut chosen: HashMap<(usize, String), WireId> = HashMap::new();
    let mut rewrites: Vec<(PipId, WireId, WireId)> = Vec::new();
    let mut queue = VecDeque::from([root]);
    while let Some(wire) = queue.pop_front() {
        let Some(list) = children.get(&wire) else {
            continue;
        };
        for &(pip, dst) in list {
            if let PipClass::Crossbar { group } = &ctx.chip().pip_data(pip).class {
                let key = (pip.tile_index(), group.clone());
                let src = ctx.chip().pip_src_wire(pip);
                match chosen.get(&key) {
                    None => {
                        chosen.insert(key, src);
                    }
                    Some(&recorded) if recorded != src => {
                        rewrites.push((pip, dst, recorded));
                    }
                    Some(_) => {}
                }
            }
            queue.push_back(dst);
        }
    }

    // Rebind each disagreeing pip to the recorded input.
    let mut rewritten = 0usize;
    for (old_pip, dst, recorded_src) in rewrites {
        let group = match &ctx.chip().pip_data(old_pip).class {
            PipClass::Crossbar { group } => group.clone(),
            _ => continue,
        };
        let replacement = ctx.chip().pips_uphill(dst).find(|&p| {
            p.tile == old_pip.tile
                && ctx.chip().pip_src_wire(p) == recorded_src
                && matches!(
                    &ctx.chip().pip_data(p).class,
                    PipClass::Crossbar { group: g } if *g == group
                )
        });
        let Some(replacement) = replacement else {
            // The crossbar is not full here; the original selection stands.
            continue;
        };
        let strength = ctx.design.nets[net]
            .wires
            .get(&dst)
            .map(|b| b.strength)
            .unwrap_or(Strength::Strong);
        ctx.unbind_pip(old_pip)?;
        ctx.bind_pip(replacement, net, strength)?;
        rewritten += 1;
    }
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_arch::ScampArch;
    use kestrel_chipdb::Loc;
    use kestrel_common::constids;
    use kestrel_context::verify;
    use kestrel_netlist::PortDir;

    /// Hand-builds a net that enters one tile's crossbar through two
    /// different local wires, then checks the fix-up converges them.
    #[test]
    fn disagreeing_selections_are_rewritten() {
        let arch = ScampArch::new(4, 4);
        let mut ctx = Context::new(arch.build_chipdb());

        let tile = ctx.chip().tile_index(1, 1);
        let wire_idx = |name: &str| -> u32 {
            ctx.chip()
                .tile_type(tile)
                .wires
                .iter()
                .position(|w| w.name == name)
                .unwrap() as u32
        };
        let pip_between = |src: &str, dst: &str| -> PipId {
            let src = wire_idx(src);
            let dst = wire_idx(dst);
            let ty = ctx.chip().tile_type(tile);
            let index = ty
                .pips
                .iter()
                .position(|p| p.src_wire == src && p.dst_wire == dst)
                .unwrap() as u32;
            PipId::new(tile, index)
        };

        // Resolve all device handles before any mutation.
        let root_wire = WireId::new(tile, wire_idx("lc0_o"));
        let p_out0 = pip_between("lc0_o", "local_0");
        let p_out1 = pip_between("lc0_o", "local_1");
        let p_mux0 = pip_between("local_0", "lc1_i0");
        let p_mux1 = pip_between("local_1", "lc2_i1");
        let bel = ctx.chip().bel_at(Loc::new(1, 1, 0)).unwrap();

        // The driver cell occupies LC0 so the net legitimately starts on
        // lc0_o.
        let drv = ctx.create_cell(ctx.id("drv"), constids::LUT4).unwrap();
        ctx.design.cells[drv].add_port(constids::O, PortDir::Out);
        ctx.bind_bel(bel, drv, Strength::Strong).unwrap();
        let net = ctx.create_net(ctx.id("n")).unwrap();
        ctx.connect(drv, constids::O, net).unwrap();

        ctx.bind_wire(root_wire, net, Strength::Strong).unwrap();
        // Fan out onto two locals, then into two different LUT inputs
        // through the same "imux" crossbar.
        ctx.bind_pip(p_out0, net, Strength::Strong).unwrap();
        ctx.bind_pip(p_out1, net, Strength::Strong).unwrap();
        ctx.bind_pip(p_mux0, net, Strength::Strong).unwrap();
        ctx.bind_pip(p_mux1, net, Strength::Strong).unwrap();

        let sink = DiagnosticSink::new();
        let rewritten = fixup_crossbars(&mut ctx, &sink).unwrap();
        assert_eq!(rewritten, 1);

        // Both crossbar pips now select the same upstream local wire.
        let mut sources = Vec::new();
        for binding in ctx.design.nets[net].wires.values() {
            if let Some(pip) = binding.pip {
                if matches!(ctx.chip().pip_data(pip).class, PipClass::Crossbar { .. }) {
                    sources.push(ctx.chip().pip_src_wire(pip));
                }
            }
        }
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0], sources[1]);
        verify::assert_valid(&ctx);
    }

    #[test]
    fn consistent_net_is_untouched() {
        let arch = ScampArch::new(4, 4);
        let mut ctx = Context::new(arch.build_chipdb());
        let net = ctx.create_net(ctx.id("n")).unwrap();
        let _ = net;
        let sink = DiagnosticSink::new();
        assert_eq!(fixup_crossbars(&mut ctx, &sink).unwrap(), 0);
    }
}
