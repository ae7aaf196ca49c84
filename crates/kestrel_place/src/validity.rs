//! Placement validity: type compatibility, per-bel location checks, and
//! whole-cluster geometry resolution.

use kestrel_arch::{Architecture, ConstrZ};
use kestrel_chipdb::BelId;
use kestrel_common::constids;
use kestrel_context::Context;
use kestrel_netlist::CellId;
use std::collections::HashSet;

/// Returns every cell of the cluster rooted at `root`, root first. Chains
/// (every child hinted chain-next) come back in link order by walking the
/// COUT → CIN connectivity; other clusters keep arena order.
pub fn cluster_members(ctx: &Context, root: CellId) -> Vec<CellId> {
    let Some(root_cell) = ctx.design.cells.get(root) else {
        return vec![root];
    };
    let Some(cluster) = root_cell.cluster else {
        return vec![root];
    };
    let mut members = vec![root];
    for (id, cell) in ctx.design.cells.iter() {
        if id != root && cell.cluster == Some(cluster) {
            members.push(id);
        }
    }

    let chain_hinted = members.len() > 1
        && members.iter().skip(1).all(|&m| {
            ctx.design.cells[m].constr_z.and_then(ConstrZ::decode) == Some(ConstrZ::ChainNext)
        });
    if chain_hinted {
        let set: HashSet<CellId> = members.iter().copied().collect();
        let mut ordered = vec![root];
        let mut cursor = root;
        while ordered.len() < members.len() {
            match chain_link(ctx, cursor, &set) {
                Some(next) if !ordered.contains(&next) => {
                    ordered.push(next);
                    cursor = next;
                }
                _ => break,
            }
        }
        if ordered.len() == members.len() {
            return ordered;
        }
    }
    members
}

/// Follows one COUT → CIN link within the cluster.
fn chain_link(ctx: &Context, cell: CellId, set: &HashSet<CellId>) -> Option<CellId> {
    let cout = ctx.design.cells.get(cell)?.port(constids::COUT)?.net?;
    ctx.design.nets.get(cout)?.users.iter().find_map(|u| {
        (u.port == constids::CIN && set.contains(&u.cell)).then_some(u.cell)
    })
}

/// Resolves the bel of every cluster member for a tentative root bel.
///
/// Children resolve through the architecture's `child_placement`; chain-next
/// children walk from the previous member's location. Returns `None` if any
/// member lands outside the device, on a missing bel, or on a bel its type
/// cannot occupy — the whole placement is rejected, never a partial one.
pub fn cluster_placement(
    ctx: &Context,
    arch: &dyn Architecture,
    root: CellId,
    root_bel: BelId,
) -> Option<Vec<(CellId, BelId)>> {
    let members = cluster_members(ctx, root);
    let mut placements = Vec::with_capacity(members.len());
    let mut base = ctx.chip().bel_loc(root_bel);
    for (i, &member) in members.iter().enumerate() {
        let bel = if i == 0 {
            root_bel
        } else {
            let constr_z = ctx.design.cells.get(member)?.constr_z?;
            let loc = arch.child_placement(base, constr_z)?;
            base = loc;
            ctx.chip().bel_at(loc)?
        };
        if !arch.is_valid_bel_for_cell(ctx, member, bel) {
            return None;
        }
        placements.push((member, bel));
    }
    Some(placements)
}

/// Checks `is_bel_location_valid` for every bel in the tiles touched by the
/// given bels.
pub fn tiles_valid(ctx: &Context, arch: &dyn Architecture, bels: &[BelId]) -> bool {
    let mut tiles: Vec<usize> = bels.iter().map(|b| b.tile_index()).collect();
    tiles.sort_unstable();
    tiles.dedup();
    for tile in tiles {
        let num_bels = ctx.chip().tile_type(tile).bels.len();
        for index in 0..num_bels {
            if !arch.is_bel_location_valid(ctx, BelId::new(tile, index as u32)) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_arch::{ConstrZ, ScampArch};
    use kestrel_chipdb::Loc;
    use kestrel_common::constids;
    use kestrel_netlist::PortDir;

    fn ctx_and_arch() -> (Context, ScampArch) {
        let arch = ScampArch::new(4, 6);
        (Context::new(arch.build_chipdb()), arch)
    }

    fn chain(ctx: &mut Context, len: usize) -> Vec<CellId> {
        let mut cells = Vec::new();
        let root_name = ctx.id("c0");
        for i in 0..len {
            let name = ctx.id(&format!("c{i}"));
            let id = ctx.create_cell(name, constids::LOGIC).unwrap();
            ctx.design.cells[id].add_port(constids::CIN, PortDir::In);
            ctx.design.cells[id].add_port(constids::COUT, PortDir::Out);
            ctx.design.cells[id].cluster = Some(root_name);
            if i > 0 {
                ctx.design.cells[id].constr_z = Some(ConstrZ::ChainNext.encode());
            }
            cells.push(id);
        }
        cells
    }

    #[test]
    fn unclustered_cell_is_its_own_cluster() {
        let (mut ctx, _) = ctx_and_arch();
        let c = ctx.create_cell(ctx.id("solo"), constids::LUT4).unwrap();
        assert_eq!(cluster_members(&ctx, c), vec![c]);
    }

    #[test]
    fn chain_resolves_through_successors() {
        let (mut ctx, arch) = ctx_and_arch();
        let cells = chain(&mut ctx, 10);
        let root_bel = ctx.chip().bel_at(Loc::new(1, 1, 0)).unwrap();
        let placements = cluster_placement(&ctx, &arch, cells[0], root_bel).unwrap();
        assert_eq!(placements.len(), 10);
        // First 8 fill the tile's slots, then the chain rolls north.
        assert_eq!(
            ctx.chip().bel_loc(placements[7].1),
            Loc::new(1, 1, 7)
        );
        assert_eq!(
            ctx.chip().bel_loc(placements[8].1),
            Loc::new(1, 2, 0)
        );
    }

    #[test]
    fn chain_off_the_top_is_rejected() {
        let (mut ctx, arch) = ctx_and_arch();
        let cells = chain(&mut ctx, 60);
        // 4x6 device has 2x4 logic tiles per column = 32 slots per column.
        let root_bel = ctx.chip().bel_at(Loc::new(1, 1, 0)).unwrap();
        assert!(cluster_placement(&ctx, &arch, cells[0], root_bel).is_none());
    }

    #[test]
    fn type_mismatch_rejects_whole_cluster() {
        let (mut ctx, arch) = ctx_and_arch();
        let cells = chain(&mut ctx, 2);
        // Poison the child's kind so no LOGIC bel accepts it.
        ctx.design.cells[cells[1]].kind = ctx.id("EXOTIC");
        let root_bel = ctx.chip().bel_at(Loc::new(1, 1, 0)).unwrap();
        assert!(cluster_placement(&ctx, &arch, cells[0], root_bel).is_none());
    }
}
