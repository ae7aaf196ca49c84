//! Negotiated congestion routing over real bindings.

use crate::crossbar;
use kestrel_arch::{Architecture, BoundingBox};
use kestrel_chipdb::{BelId, PipClass, PipId, WireId};
use kestrel_common::Id;
use kestrel_context::{BindError, CancelToken, Context};
use kestrel_diagnostics::{Category, Diagnostic, DiagnosticSink};
use kestrel_netlist::{CellId, NetId, Strength};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// Outer negotiation iterations before declaring congestion failure.
const MAX_ITERATIONS: usize = 50;

/// Base penalty for stealing an occupied wire on the first iteration.
const RIPUP_BASE_COST: f64 = 8.0;

/// Per-iteration growth of the steal penalty.
const RIPUP_GROWTH: f64 = 2.0;

/// History increment per steal of a wire.
const HISTORY_INCREMENT: f64 = 4.0;

/// Errors from the routing phase.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// Congestion did not resolve within the iteration cap.
    #[error("routing congestion unresolved on wire {wire} (nets {nets:?})")]
    Congestion {
        /// The worst-contended wire.
        wire: String,
        /// Nets contending for it.
        nets: Vec<String>,
    },

    /// A sink has no path from its driver at all.
    #[error("no route from driver of net {net} to {sink}")]
    Unroutable {
        /// The net name.
        net: String,
        /// The sink description.
        sink: String,
    },

    /// A context operation failed; router bugs surface here.
    #[error(transparent)]
    Bind(#[from] BindError),
}

/// A* queue entry, min-ordered on estimated total cost.
#[derive(Debug, Clone, Copy)]
struct SearchState {
    wire: WireId,
    cost: f64,
    estimated_total: f64,
}

impl PartialEq for SearchState {
    fn eq(&self, other: &Self) -> bool {
        self.estimated_total == other.estimated_total && self.wire == other.wire
    }
}

impl Eq for SearchState {}

impl Ord for SearchState {
    fn cmp(&self, other: &Self) -> Ordering {
        // Ties break on the wire handle so exploration order (and thus the
        // routed tree) is identical from run to run.
        other
            .estimated_total
            .partial_cmp(&self.estimated_total)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.wire.cmp(&self.wire))
    }
}

impl PartialOrd for SearchState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Per-run congestion bookkeeping.
#[derive(Default)]
struct Congestion {
    /// Accumulated steal history per wire.
    history: HashMap<WireId, f64>,
    /// Steal count per wire, for the failure report.
    contention: HashMap<WireId, usize>,
    /// The last two nets seen contending per wire.
    contenders: HashMap<WireId, Vec<NetId>>,
}

impl Congestion {
    fn record_steal(&mut self, wire: WireId, thief: NetId, victim: NetId) {
        *self.history.entry(wire).or_insert(0.0) += HISTORY_INCREMENT;
        *self.contention.entry(wire).or_insert(0) += 1;
        let entry = self.contenders.entry(wire).or_default();
        for net in [victim, thief] {
            if !entry.contains(&net) {
                entry.push(net);
            }
        }
        if entry.len() > 4 {
            entry.drain(0..entry.len() - 4);
        }
    }

    fn wire_history(&self, wire: WireId) -> f64 {
        self.history.get(&wire).copied().unwrap_or(0.0)
    }

    fn worst(&self) -> Option<(WireId, usize)> {
        self.contention
            .iter()
            .max_by_key(|&(w, &c)| (c, w.tile, w.index))
            .map(|(&w, &c)| (w, c))
    }
}

/// Routes every net, then runs the crossbar fix-up. On cancellation the
/// current consistent state is kept and the function returns successfully.
pub fn route(
    ctx: &mut Context,
    arch: &dyn Architecture,
    cancel: &CancelToken,
    sink: &DiagnosticSink,
) -> Result<(), RouteError> {
    let routable: Vec<NetId> = ctx
        .design
        .nets
        .iter()
        .filter(|(_, n)| {
            !n.users.is_empty()
                && n.driver
                    .and_then(|d| ctx.design.cells.get(d.cell))
                    .and_then(|c| c.bel)
                    .is_some()
        })
        .map(|(id, _)| id)
        .collect();

    // Bounding boxes depend only on the placement, which is frozen during
    // routing, so they are computed once, data-parallel.
    let bboxes: HashMap<NetId, BoundingBox> = {
        let ctx: &Context = ctx;
        routable
            .par_iter()
            .map(|&net| (net, net_bounding_box(ctx, arch, net)))
            .collect()
    };

    let mut congestion = Congestion::default();
    let mut routed: HashSet<NetId> = HashSet::new();

    for iteration in 0..MAX_ITERATIONS {
        if cancel.is_cancelled() {
            sink.emit(Diagnostic::note(
                Category::Cancelled,
                format!("routing stopped after iteration {iteration}"),
            ));
            return Ok(());
        }

        let pending: Vec<NetId> = routable
            .iter()
            .copied()
            .filter(|n| !routed.contains(n))
            .collect();
        if pending.is_empty() {
            sink.emit(Diagnostic::note(
                Category::Congestion,
                format!(
                    "routed {} nets in {} iterations",
                    routable.len(),
                    iteration
                ),
            ));
            crossbar::fixup_crossbars(ctx, sink)?;
            return Ok(());
        }

        let steal_cost = RIPUP_BASE_COST * RIPUP_GROWTH.powi(iteration as i32);
        for net in pending {
            let bbox = bboxes[&net];
            let victims = route_net(ctx, arch, net, &bbox, &mut congestion, steal_cost)?;
            for victim in victims {
                routed.remove(&victim);
            }
            routed.insert(net);
        }
    }

    // Iteration cap hit: report the most contended resource and its nets.
    let (wire, _) = congestion.worst().unwrap_or((WireId::node(0), 0));
    let nets: Vec<String> = congestion
        .contenders
        .get(&wire)
        .map(|nets| nets.iter().map(|&n| ctx.net_name(n)).collect())
        .unwrap_or_default();
    let wire_name = ctx.chip().wire_name(wire);
    sink.emit(
        Diagnostic::error(Category::Congestion, "congestion unresolved after iteration cap")
            .with_primary(wire_name.clone())
            .with_secondary(nets.join(", ")),
    );
    Err(RouteError::Congestion {
        wire: wire_name,
        nets,
    })
}

/// Computes the net's routing bounding box from its placed endpoints.
fn net_bounding_box(ctx: &Context, arch: &dyn Architecture, net: NetId) -> BoundingBox {
    let mut bbox = BoundingBox::empty();
    let n = &ctx.design.nets[net];
    let mut include_cell = |cell: CellId| {
        if let Some(bel) = ctx.design.cells.get(cell).and_then(|c| c.bel) {
            let loc = ctx.chip().bel_loc(bel);
            bbox.include(loc.x, loc.y);
        }
    };
    if let Some(d) = n.driver {
        include_cell(d.cell);
    }
    for user in &n.users {
        include_cell(user.cell);
    }
    arch.expand_bounding_box(ctx, bbox)
}

/// One sink of a net: the user port and the wires it may legally land on
/// (several when the architecture permits pin permutation).
struct SinkTarget {
    cell: CellId,
    port: Id,
    /// Candidate wires, paired with the physical pin each corresponds to.
    wires: Vec<(WireId, Id)>,
}

/// Collects the sink targets of a net, excluding physical pins already
/// claimed by other logical ports of the same cell.
fn sink_targets(ctx: &Context, arch: &dyn Architecture, net: NetId) -> Vec<SinkTarget> {
    let n = &ctx.design.nets[net];
    let mut targets = Vec::new();
    for user in &n.users {
        let Some(cell) = ctx.design.cells.get(user.cell) else {
            continue;
        };
        if cell.bel.is_none() {
            continue;
        }
        let bel = cell.bel.unwrap_or_else(|| unreachable!("checked above"));

        let mut taken: HashSet<Id> = HashSet::new();
        if let Some(map) = &cell.pin_map {
            for (&logical, &phys) in &map.pins {
                if logical != user.port {
                    // A pin is only off-limits if its logical port is in use.
                    if cell.port(logical).and_then(|p| p.net).is_some() {
                        taken.insert(phys);
                    }
                }
            }
        }

        let pins = arch.permutable_pins(ctx, user.cell, user.port);
        let mut wires = Vec::new();
        if pins.len() == 1 && pins[0] == user.port {
            // Single natural pin: resolve through the cell's pin map (bare
            // flip-flops land D on the pass-through LUT input, etc.).
            if let Some(wire) = ctx.cell_port_wire(user.cell, user.port) {
                let pin = cell
                    .pin_map
                    .as_ref()
                    .and_then(|m| m.get(user.port))
                    .unwrap_or(user.port);
                wires.push((wire, pin));
            }
        } else {
            for pin in pins {
                if taken.contains(&pin) {
                    continue;
                }
                if let Some(wire) = ctx.bel_pin_wire(bel, pin) {
                    wires.push((wire, pin));
                }
            }
        }
        if !wires.is_empty() {
            targets.push(SinkTarget {
                cell: user.cell,
                port: user.port,
                wires,
            });
        }
    }
    targets
}

/// Rips up and reroutes one net. Returns the nets whose routing was stolen.
fn route_net(
    ctx: &mut Context,
    arch: &dyn Architecture,
    net: NetId,
    bbox: &BoundingBox,
    congestion: &mut Congestion,
    steal_cost: f64,
) -> Result<Vec<NetId>, RouteError> {
    // Rip up any previous routing of this net.
    let old_wires: Vec<WireId> = ctx.design.nets[net].wires.keys().copied().collect();
    for wire in old_wires {
        ctx.unbind_wire(wire)?;
    }

    let driver = ctx.design.nets[net]
        .driver
        .unwrap_or_else(|| unreachable!("routable nets have drivers"));
    let Some(root) = ctx.cell_port_wire(driver.cell, driver.port) else {
        return Ok(Vec::new());
    };

    let mut victims: Vec<NetId> = Vec::new();

    // Claim the root wire, evicting a route-through squatter if present.
    if let Some(owner) = ctx.bound_wire_net(root) {
        if owner != net {
            rip_up_net(ctx, owner)?;
            congestion.record_steal(root, net, owner);
            victims.push(owner);
        }
    }
    if ctx.bound_wire_net(root) != Some(net) {
        ctx.bind_wire(root, net, Strength::Strong)?;
    }

    let targets = sink_targets(ctx, arch, net);
    for target in targets {
        let target_wires: HashMap<WireId, Id> = target.wires.iter().copied().collect();
        // Already reached (e.g. shared wire or earlier branch).
        let already = target_wires
            .keys()
            .find(|w| ctx.design.nets[net].wires.contains_key(w))
            .copied();
        let landed = match already {
            Some(wire) => wire,
            None => search_and_bind(
                ctx,
                arch,
                net,
                &target_wires,
                bbox,
                congestion,
                steal_cost,
                &mut victims,
            )
            .ok_or_else(|| RouteError::Unroutable {
                net: ctx.net_name(net),
                sink: format!(
                    "{}.{}",
                    ctx.cell_name(target.cell),
                    ctx.str_of(target.port)
                ),
            })??,
        };

        // Record which physical pin the sink landed on.
        if let Some(&pin) = target_wires.get(&landed) {
            if let Some(cell) = ctx.design.cells.get_mut(target.cell) {
                if let Some(map) = &mut cell.pin_map {
                    map.set(target.port, pin);
                }
            }
        }
    }
    Ok(victims)
}

/// Unbinds every wire of a net, leaving it unrouted.
fn rip_up_net(ctx: &mut Context, net: NetId) -> Result<(), RouteError> {
    let wires: Vec<WireId> = ctx.design.nets[net].wires.keys().copied().collect();
    for wire in wires {
        // A wire may already be gone if its pip was released with another.
        if ctx.bound_wire_net(wire) == Some(net) {
            ctx.unbind_wire(wire)?;
        }
    }
    Ok(())
}

/// A* from the net's current tree to any target wire; on success binds the
/// path (ripping up weaker owners) and returns the landed wire.
///
/// The outer `Option` is `None` when no path exists; the inner `Result`
/// carries binding failures.
#[allow(clippy::too_many_arguments)]
fn search_and_bind(
    ctx: &mut Context,
    arch: &dyn Architecture,
    net: NetId,
    targets: &HashMap<WireId, Id>,
    bbox: &BoundingBox,
    congestion: &mut Congestion,
    steal_cost: f64,
    victims: &mut Vec<NetId>,
) -> Option<Result<WireId, RouteError>> {
    let mut open = BinaryHeap::new();
    let mut g_scores: HashMap<WireId, f64> = HashMap::new();
    let mut came_from: HashMap<WireId, (PipId, WireId)> = HashMap::new();

    let heuristic = |ctx: &Context, wire: WireId| -> f64 {
        let (x, y) = ctx.chip().wire_position(wire);
        targets
            .keys()
            .map(|&t| {
                let (tx, ty) = ctx.chip().wire_position(t);
                (x - tx).abs() + (y - ty).abs()
            })
            .fold(f64::INFINITY, f64::min)
    };

    let mut sources: Vec<WireId> = ctx.design.nets[net].wires.keys().copied().collect();
    sources.sort_unstable();
    for wire in sources {
        g_scores.insert(wire, 0.0);
        open.push(SearchState {
            wire,
            cost: 0.0,
            estimated_total: heuristic(ctx, wire),
        });
    }

    let mut reached: Option<WireId> = None;
    while let Some(current) = open.pop() {
        if targets.contains_key(&current.wire) {
            reached = Some(current.wire);
            break;
        }
        let current_g = g_scores.get(&current.wire).copied().unwrap_or(f64::INFINITY);
        if current.cost > current_g {
            continue;
        }

        let pips: Vec<PipId> = ctx.chip().pips_downhill(current.wire).collect();
        for pip in pips {
            let dst = ctx.chip().pip_dst_wire(pip);
            let is_target = targets.contains_key(&dst);
            if !is_target {
                let (x, y) = ctx.chip().wire_position(dst);
                if !bbox.contains(x.round() as i32, y.round() as i32) {
                    continue;
                }
            }

            // Route-through pips reserve their bel, so an occupied bel
            // blocks the crossing.
            if let PipClass::RouteThru { bel } = ctx.chip().pip_data(pip).class {
                let bel = BelId::new(pip.tile_index(), bel);
                if !ctx.check_bel_avail(bel) {
                    continue;
                }
            }

            let mut edge = arch.pip_cost(ctx, pip);
            match ctx.bound_wire_net(dst) {
                Some(owner) if owner == net => continue, // loop back into own tree
                Some(owner) => {
                    // Stealing is negotiable unless the owner holds firmly.
                    let strength = ctx.design.nets[owner]
                        .wires
                        .get(&dst)
                        .map(|b| b.strength)
                        .unwrap_or(Strength::Strong);
                    if strength >= Strength::Locked {
                        continue;
                    }
                    edge += steal_cost + congestion.wire_history(dst);
                }
                None => edge += congestion.wire_history(dst) * 0.5,
            }

            let tentative = current_g + edge;
            if tentative < g_scores.get(&dst).copied().unwrap_or(f64::INFINITY) {
                g_scores.insert(dst, tentative);
                came_from.insert(dst, (pip, current.wire));
                open.push(SearchState {
                    wire: dst,
                    cost: tentative,
                    estimated_total: tentative + heuristic(ctx, dst),
                });
            }
        }
    }

    let landed = reached?;

    // Walk the path backwards, then bind forward from the tree outward.
    let mut path: Vec<(PipId, WireId)> = Vec::new();
    let mut cursor = landed;
    while let Some(&(pip, prev)) = came_from.get(&cursor) {
        path.push((pip, cursor));
        cursor = prev;
    }
    path.reverse();

    for (pip, dst) in path {
        // Evict whoever holds the destination wire or the pip.
        if let Some(owner) = ctx.bound_wire_net(dst) {
            if owner != net {
                if let Err(e) = rip_up_net(ctx, owner) {
                    return Some(Err(e));
                }
                congestion.record_steal(dst, net, owner);
                victims.push(owner);
            }
        }
        if let Some(owner) = ctx.bound_pip_net(pip) {
            if owner != net {
                if let Err(e) = rip_up_net(ctx, owner) {
                    return Some(Err(e));
                }
                congestion.record_steal(dst, net, owner);
                victims.push(owner);
            }
        }
        if ctx.design.nets[net].wires.contains_key(&dst) {
            continue;
        }
        if let Err(e) = ctx.bind_pip(pip, net, Strength::Strong) {
            return Some(Err(e.into()));
        }
    }
    Some(Ok(landed))
}
