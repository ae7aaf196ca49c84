//! Constant canonicalization.
//!
//! After the front-end there are at most two constant nets, `$PACKER_GND`
//! and `$PACKER_VCC`, each driven by a placeholder driver cell. This pass
//! turns the drivers into constant LUTs (truth table all-zeros or all-ones)
//! so the placer can treat them as ordinary logic, and removes drivers
//! whose constant is never consumed.

use crate::PackError;
use kestrel_common::constids;
use kestrel_context::Context;
use kestrel_netlist::Property;

/// The all-ones LUT4 truth table.
const LUT4_ONES: i64 = 0xFFFF;

/// Canonicalizes the constant nets and their drivers.
pub fn pack_constants(ctx: &mut Context) -> Result<(), PackError> {
    for (net_name, kind, init) in [
        ("$PACKER_GND", constids::GND, 0i64),
        ("$PACKER_VCC", constids::VCC, LUT4_ONES),
    ] {
        let net_id = ctx.design.net_id(ctx.id(net_name));
        let Some(net_id) = net_id else { continue };

        let (driver, users) = {
            let net = &ctx.design.nets[net_id];
            (net.driver, net.users.len())
        };

        if users == 0 {
            // Unused constant: drop the driver cell and the net.
            if let Some(d) = driver {
                ctx.remove_cell(d.cell)?;
            }
            ctx.remove_net(net_id)?;
            continue;
        }

        // Retype the placeholder driver into a constant LUT.
        if let Some(d) = driver {
            let cell = &mut ctx.design.cells[d.cell];
            if cell.kind == kind {
                cell.kind = constids::LUT4;
                cell.params.insert(constids::INIT, Property::Int(init));
            }
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
        Context::new(ScampArch::new(4, 4).build_chipdb())
    }

    fn make_const(ctx: &mut Context, net_name: &str, cell_name: &str, kind: kestrel_common::Id) {
        let net = ctx.create_net(ctx.id(net_name)).unwrap();
        let cell = ctx.create_cell(ctx.id(cell_name), kind).unwrap();
        ctx.design.cells[cell].add_port(constids::O, PortDir::Out);
        ctx.connect(cell, constids::O, net).unwrap();
    }

    #[test]
    fn used_constant_becomes_lut() {
        let mut ctx = ctx();
        make_const(&mut ctx, "$PACKER_VCC", "$PACKER_VCC_DRV", constids::VCC);
        // Give it one consumer.
        let user = ctx.create_cell(ctx.id("u"), constids::LUT4).unwrap();
        ctx.design.cells[user].add_port(constids::I0, PortDir::In);
        let net = ctx.design.net_id(ctx.id("$PACKER_VCC")).unwrap();
        ctx.connect(user, constids::I0, net).unwrap();

        pack_constants(&mut ctx).unwrap();
        let drv = ctx.design.cell_id(ctx.id("$PACKER_VCC_DRV")).unwrap();
        assert_eq!(ctx.design.cells[drv].kind, constids::LUT4);
        assert_eq!(
            ctx.design.cells[drv].params[&constids::INIT],
            Property::Int(LUT4_ONES)
        );
    }

    #[test]
    fn unused_constant_is_dropped() {
        let mut ctx = ctx();
        make_const(&mut ctx, "$PACKER_GND", "$PACKER_GND_DRV", constids::GND);
        pack_constants(&mut ctx).unwrap();
        assert!(ctx.design.net_id(ctx.id("$PACKER_GND")).is_none());
        assert!(ctx.design.cell_id(ctx.id("$PACKER_GND_DRV")).is_none());
    }

    #[test]
    fn rerun_is_noop() {
        let mut ctx = ctx();
        make_const(&mut ctx, "$PACKER_GND", "$PACKER_GND_DRV", constids::GND);
        let user = ctx.create_cell(ctx.id("u"), constids::LUT4).unwrap();
        ctx.design.cells[user].add_port(constids::I0, PortDir::In);
        let net = ctx.design.net_id(ctx.id("$PACKER_GND")).unwrap();
        ctx.connect(user, constids::I0, net).unwrap();

        pack_constants(&mut ctx).unwrap();
        let kind_before = ctx.design.cells[ctx.design.cell_id(ctx.id("$PACKER_GND_DRV")).unwrap()]
            .kind;
        pack_constants(&mut ctx).unwrap();
        let kind_after = ctx.design.cells[ctx.design.cell_id(ctx.id("$PACKER_GND_DRV")).unwrap()]
            .kind;
        assert_eq!(kind_before, kind_after);
    }
}
