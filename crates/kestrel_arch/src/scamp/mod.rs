//! The scamp device family.
//!
//! A synthetic island-style architecture used by the demo CLI and the test
//! suites: interior LOGIC tiles carrying 8 fused LUT4+DFF slots with a
//! dedicated carry spine, IOB pairs on the rim, a per-tile input crossbar,
//! and one global clock network.

pub mod fabric;
pub mod tables;

use crate::{Architecture, ConstrZ};
use kestrel_chipdb::{BelId, ChipDb, Loc};
use kestrel_common::{constids, Id};
use kestrel_context::Context;
use kestrel_netlist::CellId;

/// The scamp architecture model for one device size.
#[derive(Debug, Clone)]
pub struct ScampArch {
    device: String,
    width: u32,
    height: u32,
}

impl ScampArch {
    /// Creates the model for a `width` × `height` device.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            device: format!("scamp{width}x{height}"),
            width,
            height,
        }
    }

    /// Parses a device name of the form `scamp<W>x<H>`.
    pub fn from_device_name(device: &str) -> Option<Self> {
        let dims = device.strip_prefix("scamp")?;
        let (w, h) = dims.split_once('x')?;
        let width: u32 = w.parse().ok()?;
        let height: u32 = h.parse().ok()?;
        if width < 3 || height < 3 {
            return None;
        }
        Some(Self::new(width, height))
    }

    /// Builds the chip database for this device.
    pub fn build_chipdb(&self) -> ChipDb {
        fabric::build_device(self.width, self.height)
    }

    /// The last grid row containing logic tiles.
    fn logic_y_max(&self) -> i32 {
        self.height as i32 - 2
    }

    fn is_logic_cell_kind(kind: Id) -> bool {
        kind == constids::LOGIC
            || kind == constids::LUT4
            || kind == constids::DFF
            || kind == constids::ROUTETHRU
    }

    fn is_io_cell_kind(kind: Id) -> bool {
        kind == constids::IOB
            || kind == constids::IBUF
            || kind == constids::OBUF
            || kind == constids::IOBUF
    }
}

impl Architecture for ScampArch {
    fn family_name(&self) -> &str {
        "scamp"
    }

    fn device_name(&self) -> &str {
        &self.device
    }

    fn is_valid_bel_for_cell(&self, ctx: &Context, cell: CellId, bel: BelId) -> bool {
        let Some(c) = ctx.design.cells.get(cell) else {
            return false;
        };
        let bel_kind = ctx.bel_kind(bel);
        if bel_kind == constids::LOGIC {
            Self::is_logic_cell_kind(c.kind)
        } else if bel_kind == constids::IOB {
            Self::is_io_cell_kind(c.kind)
        } else {
            c.kind == bel_kind
        }
    }

    fn is_bel_location_valid(&self, ctx: &Context, bel: BelId) -> bool {
        // Shared-clock rule: all registered cells in one logic tile are
        // clocked by the tile's single clk spine, so their CLK nets must
        // agree.
        if ctx.bel_kind(bel) != constids::LOGIC {
            return true;
        }
        let tile = bel.tile_index();
        let num_bels = ctx.chip().tile_type(tile).bels.len();
        let mut clk_net = None;
        for index in 0..num_bels {
            let b = BelId::new(tile, index as u32);
            let Some(cell) = ctx.bound_bel_cell(b) else {
                continue;
            };
            let Some(c) = ctx.design.cells.get(cell) else {
                continue;
            };
            let Some(port) = c.port(constids::CLK) else {
                continue;
            };
            let Some(net) = port.net else { continue };
            match clk_net {
                None => clk_net = Some(net),
                Some(existing) if existing == net => {}
                Some(_) => return false,
            }
        }
        true
    }

    fn bel_bucket_for_cell_kind(&self, kind: Id) -> Id {
        if Self::is_logic_cell_kind(kind) {
            constids::LOGIC
        } else if Self::is_io_cell_kind(kind) {
            constids::IOB
        } else {
            kind
        }
    }

    fn child_placement(&self, base: Loc, constr_z: i32) -> Option<Loc> {
        match ConstrZ::decode(constr_z)? {
            ConstrZ::Abs(z) => Some(Loc::new(base.x, base.y, z)),
            ConstrZ::Rel(dz) => Some(Loc::new(base.x, base.y, base.z + dz)),
            ConstrZ::ChainNext => self.chain_successor(base),
            // The family has no named slots.
            ConstrZ::Slot(_) => None,
        }
    }

    fn chain_successor(&self, loc: Loc) -> Option<Loc> {
        tables::carry_successor(loc, self.logic_y_max())
    }

    fn lut_pin_order(&self) -> &[Id] {
        &tables::LUT_PINS
    }

    fn permutable_pins(&self, ctx: &Context, cell: CellId, port: Id) -> Vec<Id> {
        let Some(c) = ctx.design.cells.get(cell) else {
            return vec![port];
        };
        let permutable = (c.kind == constids::LOGIC || c.kind == constids::LUT4)
            && tables::LUT_PINS.contains(&port);
        if permutable {
            // Only pins the cell does not already use elsewhere are fair
            // game; the router still prefers the natural pin via cost.
            tables::LUT_PINS.to_vec()
        } else {
            vec![port]
        }
    }
}
