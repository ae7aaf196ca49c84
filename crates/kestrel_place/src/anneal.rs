//! Simulated annealing refinement.
//!
//! Proposes moves and swaps over the current placement, accepting each with
//! the Metropolis criterion under a geometrically cooling temperature.
//! Clustered cells move as a unit; any proposal that cannot re-place the
//! whole cluster is rejected. Cancellation is observed at temperature-step
//! boundaries only, so the design is always left consistent.

use crate::initial::bucket_bels;
use crate::validity::{cluster_members, cluster_placement, tiles_valid};
use crate::{cost, spread, PlaceError};
use kestrel_arch::Architecture;
use kestrel_chipdb::BelId;
use kestrel_context::{CancelToken, Context};
use kestrel_diagnostics::{Category, Diagnostic, DiagnosticSink};
use kestrel_netlist::{CellId, Strength};
use rand::rngs::StdRng;
use rand::Rng;

/// Cooling rate applied each outer iteration.
const COOLING_RATE: f64 = 0.95;

/// Temperature floor that ends annealing.
const MIN_TEMPERATURE: f64 = 0.01;

/// Moves per temperature step, as a multiple of the movable cell count.
const MOVES_PER_TEMP_MULTIPLIER: usize = 8;

/// Temperature steps between centroid-spreading passes.
const SPREAD_INTERVAL: usize = 8;

/// Acceptance rate below which annealing stops early.
const MIN_ACCEPTANCE: f64 = 0.001;

/// Refines the placement by simulated annealing.
pub fn anneal(
    ctx: &mut Context,
    arch: &dyn Architecture,
    rng: &mut StdRng,
    cancel: &CancelToken,
    sink: &DiagnosticSink,
) -> Result<(), PlaceError> {
    let movable: Vec<CellId> = ctx
        .design
        .cells
        .iter()
        .filter(|(_, c)| {
            c.bel.is_some()
                && c.bel_strength <= Strength::Strong
                && (c.cluster.is_none() || c.is_cluster_root())
        })
        .map(|(id, _)| id)
        .collect();
    if movable.len() < 2 {
        return Ok(());
    }

    let buckets = bucket_bels(ctx, arch);
    let mut temperature = (movable.len() as f64).sqrt() * 2.0;
    let moves_per_temp = (MOVES_PER_TEMP_MULTIPLIER * movable.len()).max(8);
    let mut step = 0usize;

    while temperature > MIN_TEMPERATURE {
        if cancel.is_cancelled() {
            sink.emit(Diagnostic::note(
                Category::Cancelled,
                format!("placement stopped at temperature {temperature:.3}"),
            ));
            return Ok(());
        }

        let mut accepted = 0usize;
        for _ in 0..moves_per_temp {
            let cell = movable[rng.gen_range(0..movable.len())];
            let kind = ctx.design.cells[cell].kind;
            let bucket = arch.bel_bucket_for_cell_kind(kind);
            let Some(candidates) = buckets.get(&bucket) else {
                continue;
            };
            let target = candidates[rng.gen_range(0..candidates.len())];
            if propose(ctx, arch, rng, cell, target, temperature)? {
                accepted += 1;
            }
        }

        temperature *= COOLING_RATE;
        step += 1;
        if step % SPREAD_INTERVAL == 0 {
            spread::spread(ctx, arch)?;
        }

        let acceptance = accepted as f64 / moves_per_temp as f64;
        if acceptance < MIN_ACCEPTANCE {
            break;
        }
    }
    Ok(())
}

/// Proposes relocating `cell` (with its cluster) to `target`, accepting by
/// the Metropolis criterion. Returns whether the move was kept.
fn propose(
    ctx: &mut Context,
    arch: &dyn Architecture,
    rng: &mut StdRng,
    cell: CellId,
    target: BelId,
    temperature: f64,
) -> Result<bool, PlaceError> {
    let members = cluster_members(ctx, cell);
    let old_bels: Vec<(CellId, BelId)> = {
        let mut out = Vec::with_capacity(members.len());
        for &m in &members {
            match ctx.design.cells[m].bel {
                Some(b) => out.push((m, b)),
                None => return Ok(false),
            }
        }
        out
    };
    if old_bels.iter().any(|&(_, b)| b == target) {
        return Ok(false);
    }

    let Some(new_bels) = cluster_placement(ctx, arch, cell, target) else {
        return Ok(false);
    };

    // A displaced occupant may swap into the single-cell source bel;
    // anything more entangled is rejected.
    let mut swap: Option<(CellId, BelId)> = None;
    for &(_, b) in &new_bels {
        if let Some(occupant) = ctx.bound_bel_cell(b) {
            if members.contains(&occupant) {
                return Ok(false);
            }
            let occupant_clustered = ctx.design.cells[occupant].cluster.is_some();
            let simple = members.len() == 1 && new_bels.len() == 1;
            if !simple || occupant_clustered || swap.is_some() {
                return Ok(false);
            }
            if ctx.design.cells[occupant].bel_strength > Strength::Strong {
                return Ok(false);
            }
            if !arch.is_valid_bel_for_cell(ctx, occupant, old_bels[0].1) {
                return Ok(false);
            }
            swap = Some((occupant, old_bels[0].1));
        }
    }

    let affected_cells: Vec<CellId> = members
        .iter()
        .copied()
        .chain(swap.map(|(c, _)| c))
        .collect();
    let nets = cost::affected_nets(ctx, &affected_cells);
    let old_cost = cost::nets_cost(ctx, arch, &nets);

    // Tear down, rebind at the target, swap the occupant back in.
    for &(_, b) in &old_bels {
        ctx.unbind_bel(b)?;
    }
    if swap.is_some() {
        ctx.unbind_bel(target)?;
    }
    for &(c, b) in &new_bels {
        ctx.bind_bel(b, c, Strength::Weak)?;
    }
    if let Some((occupant, src)) = swap {
        ctx.bind_bel(src, occupant, Strength::Weak)?;
    }

    let mut touched: Vec<BelId> = new_bels.iter().map(|&(_, b)| b).collect();
    touched.extend(old_bels.iter().map(|&(_, b)| b));
    let valid = tiles_valid(ctx, arch, &touched);
    let new_cost = cost::nets_cost(ctx, arch, &nets);
    let delta = new_cost - old_cost;

    let keep = valid && (delta <= 0.0 || rng.gen::<f64>() < (-delta / temperature).exp());
    if keep {
        return Ok(true);
    }

    // Revert.
    for &(_, b) in &new_bels {
        ctx.unbind_bel(b)?;
    }
    if let Some((occupant, src)) = swap {
        ctx.unbind_bel(src)?;
        ctx.bind_bel(target, occupant, Strength::Weak)?;
    }
    for &(c, b) in &old_bels {
        ctx.bind_bel(b, c, Strength::Weak)?;
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_arch::ScampArch;
    use kestrel_common::constids;
    use kestrel_context::verify;
    use kestrel_netlist::PortDir;
    use rand::SeedableRng;

    #[test]
    fn annealing_reduces_star_cost() {
        let arch = ScampArch::new(8, 8);
        let mut ctx = Context::new(arch.build_chipdb());

        // A hub driving eight consumers, all initially placed far apart.
        let hub = ctx.create_cell(ctx.id("hub"), constids::LUT4).unwrap();
        ctx.design.cells[hub].add_port(constids::O, PortDir::Out);
        let net = ctx.create_net(ctx.id("fan")).unwrap();
        ctx.connect(hub, constids::O, net).unwrap();
        for i in 0..8 {
            let c = ctx
                .create_cell(ctx.id(&format!("u{i}")), constids::LUT4)
                .unwrap();
            ctx.design.cells[c].add_port(constids::I0, PortDir::In);
            ctx.connect(c, constids::I0, net).unwrap();
        }
        let mut rng = StdRng::seed_from_u64(11);
        crate::initial::initial_place(&mut ctx, &arch, &mut rng).unwrap();
        let before = cost::total_cost(&ctx, &arch);

        let sink = DiagnosticSink::new();
        anneal(&mut ctx, &arch, &mut rng, &CancelToken::new(), &sink).unwrap();
        let after = cost::total_cost(&ctx, &arch);

        // Annealing ends cold, so the result should not be dramatically
        // worse than where it started.
        assert!(
            after <= before * 1.5,
            "annealing degraded cost too far: {before} -> {after}"
        );
        verify::assert_valid(&ctx);
    }

    #[test]
    fn single_cell_design_is_untouched() {
        let arch = ScampArch::new(4, 4);
        let mut ctx = Context::new(arch.build_chipdb());
        let c = ctx.create_cell(ctx.id("solo"), constids::LUT4).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        crate::initial::initial_place(&mut ctx, &arch, &mut rng).unwrap();
        let bel = ctx.design.cells[c].bel;

        let sink = DiagnosticSink::new();
        anneal(&mut ctx, &arch, &mut rng, &CancelToken::new(), &sink).unwrap();
        assert_eq!(ctx.design.cells[c].bel, bel);
    }
}
