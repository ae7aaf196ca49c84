//! Placement cost: an HPWL-like wirelength estimate.
//!
//! The cost of a net is the architecture's predicted delay from the driver
//! to each user (a star model over bel locations); the placement cost is
//! the sum over nets. Unplaced members contribute nothing, so the estimate
//! tightens monotonically as placement proceeds.

use kestrel_arch::Architecture;
use kestrel_context::Context;
use kestrel_netlist::{CellId, NetId};
use rayon::prelude::*;
use std::collections::HashSet;

/// Returns the cost of one net under the current placement.
pub fn net_cost(ctx: &Context, arch: &dyn Architecture, net: NetId) -> f64 {
    let Some(n) = ctx.design.nets.get(net) else {
        return 0.0;
    };
    let Some(driver) = n.driver else {
        return 0.0;
    };
    let Some(driver_bel) = ctx.design.cells.get(driver.cell).and_then(|c| c.bel) else {
        return 0.0;
    };
    let mut cost = 0.0;
    for user in &n.users {
        if let Some(user_bel) = ctx.design.cells.get(user.cell).and_then(|c| c.bel) {
            cost += arch.predict_delay(ctx, driver_bel, driver.port, user_bel, user.port);
        }
    }
    cost
}

/// Returns the total cost over every net. The per-net estimates are
/// independent reads of the shared placement, so they run data-parallel.
pub fn total_cost(ctx: &Context, arch: &dyn Architecture) -> f64 {
    let nets: Vec<NetId> = ctx.design.nets.ids().collect();
    nets.par_iter().map(|&net| net_cost(ctx, arch, net)).sum()
}

/// Returns the nets whose cost can change when `cells` move: every net
/// touching any of their ports.
pub fn affected_nets(ctx: &Context, cells: &[CellId]) -> Vec<NetId> {
    let mut nets: HashSet<NetId> = HashSet::new();
    for &cell in cells {
        if let Some(c) = ctx.design.cells.get(cell) {
            for port in c.ports.values() {
                if let Some(net) = port.net {
                    nets.insert(net);
                }
            }
        }
    }
    let mut out: Vec<NetId> = nets.into_iter().collect();
    out.sort_unstable();
    out
}

/// Sums the cost of the given nets.
pub fn nets_cost(ctx: &Context, arch: &dyn Architecture, nets: &[NetId]) -> f64 {
    nets.iter().map(|&n| net_cost(ctx, arch, n)).sum()
}
