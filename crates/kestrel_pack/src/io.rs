//! Synthesized I/O fixup.
//!
//! The front-end synthesizes IBUF/OBUF/IOBUF pad cells for top-level ports;
//! this pass retypes them into the device's IOB primitive. The pad cells'
//! port names already follow the IOB pin names (I into the pad, O into the
//! fabric), so only the kind changes; I/O attributes like `IO_TYPE` ride
//! along untouched.

use crate::PackError;
use kestrel_common::constids;
use kestrel_context::Context;

/// Retypes synthesized pad cells into IOB primitives.
pub fn pack_io(ctx: &mut Context) -> Result<(), PackError> {
    let pads: Vec<_> = ctx
        .design
        .cells
        .iter()
        .filter(|(_, c)| {
            c.kind == constids::IBUF || c.kind == constids::OBUF || c.kind == constids::IOBUF
        })
        .map(|(id, _)| id)
        .collect();
    for pad in pads {
        ctx.design.cells[pad].kind = constids::IOB;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_arch::ScampArch;
    use kestrel_netlist::PortDir;

    #[test]
    fn pads_become_iobs() {
        let mut ctx = Context::new(ScampArch::new(4, 4).build_chipdb());
        let pad = ctx.create_cell(ctx.id("$iob$din"), constids::IBUF).unwrap();
        ctx.design.cells[pad].add_port(constids::O, PortDir::Out);

        pack_io(&mut ctx).unwrap();
        assert_eq!(ctx.design.cells[pad].kind, constids::IOB);

        // Re-running changes nothing further.
        pack_io(&mut ctx).unwrap();
        assert_eq!(ctx.design.cells[pad].kind, constids::IOB);
    }
}
