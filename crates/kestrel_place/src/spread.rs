//! Centroid spreading.
//!
//! A cheap stand-in for a full analytic pass: each movable lone cell is
//! pulled toward the centroid of the placed cells it shares nets with (the
//! minimizer of the quadratic star model), then legalized onto the nearest
//! free, valid bel of its bucket. Moves are only kept when they reduce the
//! cell's net cost, so interleaving with annealing is always safe.

use crate::initial::bucket_bels;
use crate::validity::tiles_valid;
use crate::{cost, PlaceError};
use kestrel_arch::Architecture;
use kestrel_context::Context;
use kestrel_netlist::{CellId, Strength};

/// One spreading pass over every movable lone cell.
pub fn spread(ctx: &mut Context, arch: &dyn Architecture) -> Result<(), PlaceError> {
    let buckets = bucket_bels(ctx, arch);
    let movable: Vec<CellId> = ctx
        .design
        .cells
        .iter()
        .filter(|(_, c)| {
            c.bel.is_some() && c.bel_strength <= Strength::Strong && c.cluster.is_none()
        })
        .map(|(id, _)| id)
        .collect();

    for cell in movable {
        let Some(current) = ctx.design.cells[cell].bel else {
            continue;
        };
        let Some((cx, cy)) = centroid(ctx, cell) else {
            continue;
        };

        let bucket = arch.bel_bucket_for_cell_kind(ctx.design.cells[cell].kind);
        let Some(candidates) = buckets.get(&bucket) else {
            continue;
        };

        // Nearest free candidate to the centroid.
        let mut best = None;
        for &bel in candidates {
            if bel == current || !ctx.check_bel_avail(bel) {
                continue;
            }
            if !arch.is_valid_bel_for_cell(ctx, cell, bel) {
                continue;
            }
            let loc = ctx.chip().bel_loc(bel);
            let dist = (loc.x as f64 - cx).abs() + (loc.y as f64 - cy).abs();
            match best {
                Some((_, d)) if d <= dist => {}
                _ => best = Some((bel, dist)),
            }
        }
        let Some((target, _)) = best else { continue };

        let nets = cost::affected_nets(ctx, &[cell]);
        let old_cost = cost::nets_cost(ctx, arch, &nets);
        ctx.unbind_bel(current)?;
        ctx.bind_bel(target, cell, Strength::Weak)?;
        let new_cost = cost::nets_cost(ctx, arch, &nets);

        let keep = new_cost < old_cost && tiles_valid(ctx, arch, &[target, current]);
        if !keep {
            ctx.unbind_bel(target)?;
            ctx.bind_bel(current, cell, Strength::Weak)?;
        }
    }
    Ok(())
}

/// Returns the centroid of the placed cells sharing a net with `cell`.
fn centroid(ctx: &Context, cell: CellId) -> Option<(f64, f64)> {
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut count = 0usize;
    let c = ctx.design.cells.get(cell)?;
    for port in c.ports.values() {
        let Some(net) = port.net else { continue };
        let Some(n) = ctx.design.nets.get(net) else {
            continue;
        };
        let peers = n.driver.iter().chain(n.users.iter());
        for peer in peers {
            if peer.cell == cell {
                continue;
            }
            if let Some(bel) = ctx.design.cells.get(peer.cell).and_then(|p| p.bel) {
                let loc = ctx.chip().bel_loc(bel);
                sum_x += loc.x as f64;
                sum_y += loc.y as f64;
                count += 1;
            }
        }
    }
    if count == 0 {
        None
    } else {
        Some((sum_x / count as f64, sum_y / count as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_arch::ScampArch;
    use kestrel_chipdb::Loc;
    use kestrel_common::constids;
    use kestrel_netlist::PortDir;

    #[test]
    fn spread_pulls_cell_toward_its_net() {
        let arch = ScampArch::new(8, 8);
        let mut ctx = Context::new(arch.build_chipdb());

        let a = ctx.create_cell(ctx.id("a"), constids::LUT4).unwrap();
        ctx.design.cells[a].add_port(constids::O, PortDir::Out);
        let b = ctx.create_cell(ctx.id("b"), constids::LUT4).unwrap();
        ctx.design.cells[b].add_port(constids::I0, PortDir::In);
        let net = ctx.create_net(ctx.id("n")).unwrap();
        ctx.connect(a, constids::O, net).unwrap();
        ctx.connect(b, constids::I0, net).unwrap();

        // Pin the driver in one corner; drop the user far away.
        let bel_a = ctx.chip().bel_at(Loc::new(1, 1, 0)).unwrap();
        ctx.bind_bel(bel_a, a, Strength::Fixed).unwrap();
        let bel_b = ctx.chip().bel_at(Loc::new(6, 6, 0)).unwrap();
        ctx.bind_bel(bel_b, b, Strength::Weak).unwrap();

        let before = cost::total_cost(&ctx, &arch);
        spread(&mut ctx, &arch).unwrap();
        let after = cost::total_cost(&ctx, &arch);
        assert!(after < before);

        // The user moved into the driver's tile.
        let loc = ctx.chip().bel_loc(ctx.design.cells[b].bel.unwrap());
        assert_eq!((loc.x, loc.y), (1, 1));
    }

    #[test]
    fn isolated_cell_is_left_alone() {
        let arch = ScampArch::new(4, 4);
        let mut ctx = Context::new(arch.build_chipdb());
        let c = ctx.create_cell(ctx.id("solo"), constids::LUT4).unwrap();
        let bel = ctx.chip().bel_at(Loc::new(1, 1, 3)).unwrap();
        ctx.bind_bel(bel, c, Strength::Weak).unwrap();
        spread(&mut ctx, &arch).unwrap();
        assert_eq!(ctx.design.cells[c].bel, Some(bel));
    }
}
