//! Random-but-legal initial placement.

use crate::validity::{cluster_placement, tiles_valid};
use crate::PlaceError;
use kestrel_arch::Architecture;
use kestrel_chipdb::BelId;
use kestrel_common::Id;
use kestrel_context::Context;
use kestrel_netlist::{CellId, Strength};
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::HashMap;

/// Random probes per cell before falling back to a linear scan.
const RANDOM_TRIES: usize = 64;

/// Builds the bucket → candidate-bel table in canonical bel order.
pub fn bucket_bels(ctx: &Context, arch: &dyn Architecture) -> HashMap<Id, Vec<BelId>> {
    let mut buckets: HashMap<Id, Vec<BelId>> = HashMap::new();
    for bel in ctx.chip().bels() {
        buckets
            .entry(arch.bel_bucket_for_bel(ctx, bel))
            .or_default()
            .push(bel);
    }
    buckets
}

/// Tentatively binds a cell (and its whole cluster) at `bel`, reverting and
/// reporting `false` if any member cannot be bound or a touched tile
/// becomes invalid.
pub fn try_place(
    ctx: &mut Context,
    arch: &dyn Architecture,
    cell: CellId,
    bel: BelId,
) -> Result<bool, PlaceError> {
    let Some(placements) = cluster_placement(ctx, arch, cell, bel) else {
        return Ok(false);
    };
    for (_, b) in &placements {
        if !ctx.check_bel_avail(*b) {
            return Ok(false);
        }
    }
    for (c, b) in &placements {
        ctx.bind_bel(*b, *c, Strength::Weak)?;
    }
    let bels: Vec<BelId> = placements.iter().map(|&(_, b)| b).collect();
    if !tiles_valid(ctx, arch, &bels) {
        for (_, b) in &placements {
            ctx.unbind_bel(*b)?;
        }
        return Ok(false);
    }
    Ok(true)
}

/// Places every unplaced cluster root and lone cell on a random legal bel
/// from its bucket.
pub fn initial_place(
    ctx: &mut Context,
    arch: &dyn Architecture,
    rng: &mut StdRng,
) -> Result<(), PlaceError> {
    let buckets = bucket_bels(ctx, arch);

    // Cluster children ride with their root, so only roots and lone cells
    // are queued.
    let queue: Vec<CellId> = ctx
        .design
        .cells
        .iter()
        .filter(|(_, c)| c.bel.is_none() && (c.cluster.is_none() || c.is_cluster_root()))
        .map(|(id, _)| id)
        .collect();

    for cell in queue {
        if ctx.design.cells[cell].bel.is_some() {
            continue;
        }
        let kind = ctx.design.cells[cell].kind;
        let bucket = arch.bel_bucket_for_cell_kind(kind);
        let empty = Vec::new();
        let candidates = buckets.get(&bucket).unwrap_or(&empty);

        let mut placed = false;
        if !candidates.is_empty() {
            for _ in 0..RANDOM_TRIES {
                let bel = candidates[rng.gen_range(0..candidates.len())];
                if try_place(ctx, arch, cell, bel)? {
                    placed = true;
                    break;
                }
            }
            if !placed {
                for &bel in candidates {
                    if try_place(ctx, arch, cell, bel)? {
                        placed = true;
                        break;
                    }
                }
            }
        }
        if !placed {
            return Err(PlaceError::NoLegalBel {
                cell: ctx.cell_name(cell),
                kind: ctx.str_of(kind).to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_arch::ScampArch;
    use kestrel_common::constids;
    use rand::SeedableRng;

    #[test]
    fn bucket_table_covers_device() {
        let arch = ScampArch::new(4, 4);
        let ctx = Context::new(arch.build_chipdb());
        let buckets = bucket_bels(&ctx, &arch);
        // 4 logic tiles x 8 slots, 8 IO tiles x 2 slots.
        assert_eq!(buckets[&constids::LOGIC].len(), 4 * 8);
        assert_eq!(buckets[&constids::IOB].len(), 8 * 2);
    }

    #[test]
    fn places_all_io_cells() {
        let arch = ScampArch::new(4, 4);
        let mut ctx = Context::new(arch.build_chipdb());
        for i in 0..16 {
            ctx.create_cell(ctx.id(&format!("p{i}")), constids::IOB)
                .unwrap();
        }
        let mut rng = StdRng::seed_from_u64(0);
        initial_place(&mut ctx, &arch, &mut rng).unwrap();
        assert_eq!(ctx.design.placed_count(), 16);
    }

    #[test]
    fn seventeenth_io_fails() {
        let arch = ScampArch::new(4, 4);
        let mut ctx = Context::new(arch.build_chipdb());
        for i in 0..17 {
            ctx.create_cell(ctx.id(&format!("p{i}")), constids::IOB)
                .unwrap();
        }
        let mut rng = StdRng::seed_from_u64(0);
        let err = initial_place(&mut ctx, &arch, &mut rng).unwrap_err();
        assert!(matches!(err, PlaceError::NoLegalBel { .. }));
    }
}
