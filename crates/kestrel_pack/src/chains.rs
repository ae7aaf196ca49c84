//! Carry-chain gathering.
//!
//! Cells linked through COUT → CIN connections must sit in consecutive
//! chain positions, so each maximal chain becomes a cluster: the head is
//! the root, every later member carries a chain-next placement hint, and
//! the placer resolves the geometry through the architecture's successor
//! map.

use crate::PackError;
use kestrel_arch::ConstrZ;
use kestrel_common::constids;
use kestrel_context::Context;
use kestrel_netlist::CellId;
use std::collections::HashSet;

fn is_chainable(ctx: &Context, cell: CellId) -> bool {
    ctx.design.cells.get(cell).is_some_and(|c| {
        c.kind == constids::LOGIC || c.kind == constids::LUT4 || c.kind == constids::CARRY
    })
}

/// Returns the next cell in the chain: the unique CIN consumer of this
/// cell's COUT net.
fn chain_next(ctx: &Context, cell: CellId) -> Option<CellId> {
    let c = ctx.design.cells.get(cell)?;
    let cout = c.port(constids::COUT)?.net?;
    let net = ctx.design.nets.get(cout)?;
    if net.users.len() != 1 {
        return None;
    }
    let user = net.users[0];
    if user.port != constids::CIN || !is_chainable(ctx, user.cell) {
        return None;
    }
    Some(user.cell)
}

/// Returns `true` if the cell's CIN is fed by another chainable cell's COUT.
fn has_chain_predecessor(ctx: &Context, cell: CellId) -> bool {
    let Some(c) = ctx.design.cells.get(cell) else {
        return false;
    };
    let Some(cin) = c.port(constids::CIN).and_then(|p| p.net) else {
        return false;
    };
    let Some(net) = ctx.design.nets.get(cin) else {
        return false;
    };
    match net.driver {
        Some(d) => d.port == constids::COUT && is_chainable(ctx, d.cell),
        None => false,
    }
}

/// Gathers every COUT→CIN chain into a cluster rooted at its head.
pub fn pack_chains(ctx: &mut Context) -> Result<(), PackError> {
    let candidates: Vec<CellId> = ctx
        .design
        .cells
        .iter()
        .filter(|(_, c)| c.port(constids::COUT).is_some() || c.port(constids::CIN).is_some())
        .map(|(id, _)| id)
        .collect();

    let mut visited: HashSet<CellId> = HashSet::new();
    for head in candidates {
        if visited.contains(&head) || !is_chainable(ctx, head) {
            continue;
        }
        if has_chain_predecessor(ctx, head) {
            continue; // not a head
        }

        let mut chain = vec![head];
        let mut cursor = head;
        while let Some(next) = chain_next(ctx, cursor) {
            if visited.contains(&next) || chain.contains(&next) {
                break;
            }
            chain.push(next);
            cursor = next;
        }
        visited.extend(chain.iter().copied());

        if chain.len() < 2 {
            continue;
        }
        let root_name = ctx.design.cells[head].name;
        for (pos, &member) in chain.iter().enumerate() {
            let cell = &mut ctx.design.cells[member];
            cell.cluster = Some(root_name);
            cell.constr_z = if pos == 0 {
                None
            } else {
                Some(ConstrZ::ChainNext.encode())
            };
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_arch::ScampArch;
    use kestrel_netlist::PortDir;

    fn ctx() -> Context {
        Context::new(ScampArch::new(4, 6).build_chipdb())
    }

    fn carry_cell(ctx: &mut Context, name: &str) -> CellId {
        let id = ctx.create_cell(ctx.id(name), constids::LOGIC).unwrap();
        ctx.design.cells[id].add_port(constids::CIN, PortDir::In);
        ctx.design.cells[id].add_port(constids::COUT, PortDir::Out);
        id
    }

    fn link(ctx: &mut Context, a: CellId, b: CellId, net_name: &str) {
        let net = ctx.create_net(ctx.id(net_name)).unwrap();
        ctx.connect(a, constids::COUT, net).unwrap();
        ctx.connect(b, constids::CIN, net).unwrap();
    }

    #[test]
    fn chain_becomes_cluster() {
        let mut ctx = ctx();
        let c0 = carry_cell(&mut ctx, "add0");
        let c1 = carry_cell(&mut ctx, "add1");
        let c2 = carry_cell(&mut ctx, "add2");
        link(&mut ctx, c0, c1, "cy0");
        link(&mut ctx, c1, c2, "cy1");

        pack_chains(&mut ctx).unwrap();

        let root_name = ctx.design.cells[c0].name;
        assert!(ctx.design.cells[c0].is_cluster_root());
        assert_eq!(ctx.design.cells[c0].constr_z, None);
        for &child in &[c1, c2] {
            assert_eq!(ctx.design.cells[child].cluster, Some(root_name));
            assert_eq!(
                ctx.design.cells[child].constr_z.and_then(ConstrZ::decode),
                Some(ConstrZ::ChainNext)
            );
        }
    }

    #[test]
    fn lone_cell_is_not_clustered() {
        let mut ctx = ctx();
        let c0 = carry_cell(&mut ctx, "solo");
        pack_chains(&mut ctx).unwrap();
        assert!(ctx.design.cells[c0].cluster.is_none());
    }

    #[test]
    fn fanout_on_cout_breaks_chain() {
        let mut ctx = ctx();
        let c0 = carry_cell(&mut ctx, "a");
        let c1 = carry_cell(&mut ctx, "b");
        link(&mut ctx, c0, c1, "cy");
        // Add a second consumer on the carry net.
        let snoop = ctx.create_cell(ctx.id("snoop"), constids::LUT4).unwrap();
        ctx.design.cells[snoop].add_port(constids::I0, PortDir::In);
        let net = ctx.design.net_id(ctx.id("cy")).unwrap();
        ctx.connect(snoop, constids::I0, net).unwrap();

        pack_chains(&mut ctx).unwrap();
        assert!(ctx.design.cells[c0].cluster.is_none());
        assert!(ctx.design.cells[c1].cluster.is_none());
    }

    #[test]
    fn rerun_is_noop() {
        let mut ctx = ctx();
        let c0 = carry_cell(&mut ctx, "x0");
        let c1 = carry_cell(&mut ctx, "x1");
        link(&mut ctx, c0, c1, "cy");
        pack_chains(&mut ctx).unwrap();
        let before = (
            ctx.design.cells[c0].cluster,
            ctx.design.cells[c1].constr_z,
        );
        pack_chains(&mut ctx).unwrap();
        let after = (
            ctx.design.cells[c0].cluster,
            ctx.design.cells[c1].constr_z,
        );
        assert_eq!(before, after);
    }
}
