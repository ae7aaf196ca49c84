//! LUT/DFF fusion.
//!
//! Where a LUT's output feeds exactly one flip-flop data input, the pair is
//! fused into a composite LOGIC cell with the LUT's truth table and the
//! flip-flop's control connections, targeting a single bel. The
//! intermediate net disappears. Cells that are already clustered or pinned
//! are left alone.

use crate::PackError;
use kestrel_common::constids;
use kestrel_context::Context;
use kestrel_diagnostics::{Category, Diagnostic, DiagnosticSink};
use kestrel_netlist::{CellId, PortDir, Property};

/// Fuses eligible LUT → DFF pairs into LOGIC cells.
pub fn pack_lut_ffs(ctx: &mut Context, sink: &DiagnosticSink) -> Result<(), PackError> {
    let dffs: Vec<CellId> = ctx
        .design
        .cells
        .iter()
        .filter(|(_, c)| c.kind == constids::DFF)
        .map(|(id, _)| id)
        .collect();

    let mut fused = 0usize;
    for dff in dffs {
        let Some(candidate) = fusion_candidate(ctx, dff) else {
            continue;
        };
        fuse_pair(ctx, candidate, dff)?;
        fused += 1;
    }

    if fused > 0 {
        sink.emit(Diagnostic::note(
            Category::Input,
            format!("fused {fused} LUT/DFF pairs into logic cells"),
        ));
    }
    Ok(())
}

/// Returns the LUT to fuse a DFF into, if the pair qualifies.
fn fusion_candidate(ctx: &Context, dff: CellId) -> Option<CellId> {
    let dff_cell = ctx.design.cells.get(dff)?;
    if dff_cell.cluster.is_some() || dff_cell.bel.is_some() {
        return None;
    }
    let d_net = dff_cell.port(constids::D)?.net?;
    let net = ctx.design.nets.get(d_net)?;
    // The LUT output must feed the flip-flop and nothing else.
    if net.users.len() != 1 {
        return None;
    }
    let driver = net.driver?;
    let lut = ctx.design.cells.get(driver.cell)?;
    if lut.kind != constids::LUT4 || driver.port != constids::O {
        return None;
    }
    if lut.cluster.is_some() || lut.bel.is_some() {
        return None;
    }
    Some(driver.cell)
}

fn fuse_pair(ctx: &mut Context, lut: CellId, dff: CellId) -> Result<(), PackError> {
    let d_net = ctx.design.cells[dff]
        .port(constids::D)
        .and_then(|p| p.net);
    let q_net = ctx.design.cells[dff]
        .port(constids::Q)
        .and_then(|p| p.net);

    // Detach both halves from the intermediate net.
    ctx.disconnect(lut, constids::O)?;
    ctx.disconnect(dff, constids::D)?;

    // The fused cell's output takes over the flip-flop's Q net.
    if let Some(q) = q_net {
        ctx.disconnect(dff, constids::Q)?;
        ctx.connect(lut, constids::O, q)?;
    }

    // Control pins move across.
    for control in [constids::CLK, constids::EN, constids::RST] {
        let net = ctx.design.cells[dff].port(control).and_then(|p| p.net);
        if let Some(net) = net {
            ctx.disconnect(dff, control)?;
            ctx.design.cells[lut].add_port(control, PortDir::In);
            ctx.connect(lut, control, net)?;
        }
    }

    ctx.remove_cell(dff)?;
    if let Some(d) = d_net {
        if ctx.design.nets.get(d).is_some_and(|n| n.is_dangling()) {
            ctx.remove_net(d)?;
        }
    }

    let ff_used = ctx.id("FF_USED");
    let cell = &mut ctx.design.cells[lut];
    cell.kind = constids::LOGIC;
    cell.params.insert(ff_used, Property::Int(1));
    Ok(())
}
