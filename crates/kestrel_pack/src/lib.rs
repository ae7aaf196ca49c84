//! The packer: netlist cells → device primitives.
//!
//! Rewrites the flattened design in place so that every remaining cell has
//! a kind the placer can put on a bel: constants are canonicalized and
//! their drivers turned into constant LUTs, synthesized pad cells become
//! IOB primitives, LUT/DFF pairs are fused into composite logic cells,
//! carry chains are gathered into clusters with chain-next children, and
//! each LUT records its logical-pin-to-bel-pin association for the
//! post-route permutation rewrite.
//!
//! Packing is idempotent: re-running on an already-packed design changes
//! nothing.

#![warn(missing_docs)]

pub mod chains;
pub mod constants;
pub mod fuse;
pub mod io;

use kestrel_arch::Architecture;
use kestrel_common::{constids, Id};
use kestrel_context::{BindError, Context};
use kestrel_diagnostics::{Category, Diagnostic, DiagnosticSink};
use kestrel_netlist::PinMap;
use std::collections::HashSet;

/// Errors from the pack phase.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    /// A cell's kind has no bel anywhere on the device.
    #[error("cell {cell} of type {kind} can never be placed on this device")]
    Unplaceable {
        /// The offending cell name.
        cell: String,
        /// Its kind.
        kind: String,
    },

    /// A context operation failed; packing bugs surface here.
    #[error(transparent)]
    Bind(#[from] BindError),
}

/// Runs the full pack pipeline.
pub fn pack(
    ctx: &mut Context,
    arch: &dyn Architecture,
    sink: &DiagnosticSink,
) -> Result<(), PackError> {
    constants::pack_constants(ctx)?;
    io::pack_io(ctx)?;
    fuse::pack_lut_ffs(ctx, sink)?;
    map_bare_ffs(ctx);
    chains::pack_chains(ctx)?;
    remove_dangling_nets(ctx)?;
    record_lut_pin_maps(ctx, arch);
    check_placeability(ctx, arch, sink)?;

    sink.emit(Diagnostic::note(
        Category::Input,
        format!(
            "packed design: {} cells, {} nets",
            ctx.design.cells.len(),
            ctx.design.nets.len()
        ),
    ));
    Ok(())
}

/// Removes nets with neither driver nor users.
pub fn remove_dangling_nets(ctx: &mut Context) -> Result<(), PackError> {
    let dangling: Vec<_> = ctx
        .design
        .nets
        .iter()
        .filter(|(_, n)| n.is_dangling())
        .map(|(id, _)| id)
        .collect();
    for net in dangling {
        ctx.remove_net(net)?;
    }
    Ok(())
}

/// Maps unfused flip-flops onto logic bels: the data input rides the
/// pass-through LUT (D → I0, Q → O) and the truth table is set to pass
/// input 0 straight through.
fn map_bare_ffs(ctx: &mut Context) {
    let ffs: Vec<_> = ctx
        .design
        .cells
        .iter()
        .filter(|(_, c)| c.kind == constids::DFF && c.pin_map.is_none())
        .map(|(id, _)| id)
        .collect();
    for cell in ffs {
        let mut map = PinMap::new();
        map.set(constids::D, constids::I0);
        map.set(constids::Q, constids::O);
        let c = &mut ctx.design.cells[cell];
        c.pin_map = Some(map);
        c.params
            .entry(constids::INIT)
            .or_insert(kestrel_netlist::Property::Int(0xAAAA));
    }
}

/// Records the identity logical-pin-to-bel-pin association on every LUT, so
/// the post-route pass has a baseline to rewrite after pin permutation.
fn record_lut_pin_maps(ctx: &mut Context, arch: &dyn Architecture) {
    let lut_pins: Vec<Id> = arch.lut_pin_order().to_vec();
    if lut_pins.is_empty() {
        return;
    }
    let luts: Vec<_> = ctx
        .design
        .cells
        .iter()
        .filter(|(_, c)| {
            (c.kind == constids::LUT4 || c.kind == constids::LOGIC) && c.pin_map.is_none()
        })
        .map(|(id, _)| id)
        .collect();
    for cell in luts {
        let mut map = PinMap::new();
        for &pin in &lut_pins {
            map.set(pin, pin);
        }
        ctx.design.cells[cell].pin_map = Some(map);
    }
}

/// Verifies every remaining cell kind has at least one bel in its bucket,
/// fabricating a diagnostic before failing.
fn check_placeability(
    ctx: &Context,
    arch: &dyn Architecture,
    sink: &DiagnosticSink,
) -> Result<(), PackError> {
    let mut buckets: HashSet<Id> = HashSet::new();
    for bel in ctx.chip().bels() {
        buckets.insert(arch.bel_bucket_for_bel(ctx, bel));
    }
    for (id, cell) in ctx.design.cells.iter() {
        let bucket = arch.bel_bucket_for_cell_kind(cell.kind);
        if !buckets.contains(&bucket) {
            let cell_name = ctx.cell_name(id);
            let kind_name = ctx.str_of(cell.kind).to_string();
            sink.emit(
                Diagnostic::error(Category::Placement, "no bel can host cell type")
                    .with_primary(cell_name.clone())
                    .with_secondary(kind_name.clone()),
            );
            return Err(PackError::Unplaceable {
                cell: cell_name,
                kind: kind_name,
            });
        }
    }
    Ok(())
}
