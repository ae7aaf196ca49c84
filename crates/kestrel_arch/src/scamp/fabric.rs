//! Device generation for the scamp family.
//!
//! The fabric is island-style: logic tiles in the interior (8 LUT4+DFF
//! "LOGIC" bels each, a dedicated carry spine, a full input crossbar fed
//! from 8 local wires), I/O tiles on the rim (2 IOB bels each), empty
//! corners. Length-1 span wires join neighboring tiles through nodes; a
//! single device-wide clock node spans every logic tile.

use super::tables::LOGIC_SLOTS;
use kestrel_chipdb::{ChipDb, ChipDbBuilder, Delay, PinDir, PipClass};

/// Local routing wires per tile.
const NUM_LOCALS: u32 = 8;

/// Span wires per side per direction.
const NUM_SPANS: u32 = 8;

/// IOB bels per I/O tile.
const IO_SLOTS: u32 = 2;

/// Wire indices recorded while declaring a routing-capable tile type.
struct RoutingWires {
    locals: Vec<u32>,
    sp_w: Vec<u32>,
    sp_e: Vec<u32>,
    sp_s: Vec<u32>,
    sp_n: Vec<u32>,
}

/// Wire indices of the LOGIC tile type needed for node construction.
struct LogicWires {
    routing: RoutingWires,
    carry_in: u32,
    carry_out: u32,
    clk: u32,
}

fn pip_delay() -> Delay {
    Delay::new(0.08, 0.1, 0.15)
}

/// Declares the local and span wires shared by LOGIC and IO tiles, plus the
/// span↔local and span-through pips.
fn add_routing_fabric(b: &mut ChipDbBuilder, tt: u32) -> RoutingWires {
    let locals: Vec<u32> = (0..NUM_LOCALS)
        .map(|j| b.add_wire(tt, &format!("local_{j}")))
        .collect();
    let sp_w: Vec<u32> = (0..NUM_SPANS)
        .map(|k| b.add_wire(tt, &format!("sp_h_w_{k}")))
        .collect();
    let sp_e: Vec<u32> = (0..NUM_SPANS)
        .map(|k| b.add_wire(tt, &format!("sp_h_e_{k}")))
        .collect();
    let sp_s: Vec<u32> = (0..NUM_SPANS)
        .map(|k| b.add_wire(tt, &format!("sp_v_s_{k}")))
        .collect();
    let sp_n: Vec<u32> = (0..NUM_SPANS)
        .map(|k| b.add_wire(tt, &format!("sp_v_n_{k}")))
        .collect();

    for span in sp_w.iter().chain(&sp_e).chain(&sp_s).chain(&sp_n) {
        for local in &locals {
            b.add_pip(tt, *span, *local, PipClass::Interconnect, pip_delay());
            b.add_pip(tt, *local, *span, PipClass::Interconnect, pip_delay());
        }
    }
    // Straight-through pips let a signal cross the tile without touching
    // the locals.
    for k in 0..NUM_SPANS as usize {
        b.add_pip(tt, sp_w[k], sp_e[k], PipClass::Regular, pip_delay());
        b.add_pip(tt, sp_e[k], sp_w[k], PipClass::Regular, pip_delay());
        b.add_pip(tt, sp_s[k], sp_n[k], PipClass::Regular, pip_delay());
        b.add_pip(tt, sp_n[k], sp_s[k], PipClass::Regular, pip_delay());
    }

    RoutingWires {
        locals,
        sp_w,
        sp_e,
        sp_s,
        sp_n,
    }
}

impl RoutingWires {
    /// Every wire that may feed an input crossbar: locals plus all spans,
    /// so a signal can enter a mux without consuming a local.
    fn mux_sources(&self) -> Vec<u32> {
        self.locals
            .iter()
            .chain(&self.sp_w)
            .chain(&self.sp_e)
            .chain(&self.sp_s)
            .chain(&self.sp_n)
            .copied()
            .collect()
    }
}

fn add_logic_tile_type(b: &mut ChipDbBuilder) -> (u32, LogicWires) {
    let tt = b.add_tile_type("LOGIC");
    let routing = add_routing_fabric(b, tt);

    let mut lc_i = Vec::new();
    let mut lc_o = Vec::new();
    let mut lc_cin = Vec::new();
    let mut lc_cout = Vec::new();
    for z in 0..LOGIC_SLOTS {
        let mut inputs = [0u32; 4];
        for (k, slot) in inputs.iter_mut().enumerate() {
            *slot = b.add_wire(tt, &format!("lc{z}_i{k}"));
        }
        lc_i.push(inputs);
        lc_o.push(b.add_wire(tt, &format!("lc{z}_o")));
        lc_cin.push(b.add_wire(tt, &format!("lc{z}_cin")));
        lc_cout.push(b.add_wire(tt, &format!("lc{z}_cout")));
    }
    let carry_in = b.add_wire(tt, "carry_in");
    let carry_out = b.add_wire(tt, "carry_out");
    let clk = b.add_wire(tt, "clk");

    // Input crossbar: any local or span onto any LUT input. One mux per
    // tile, so all members share one crossbar group.
    let mux_sources = routing.mux_sources();
    for z in 0..LOGIC_SLOTS as usize {
        for k in 0..4 {
            for src in &mux_sources {
                b.add_pip(
                    tt,
                    *src,
                    lc_i[z][k],
                    PipClass::Crossbar {
                        group: "imux".to_string(),
                    },
                    pip_delay(),
                );
            }
        }
    }
    // LUT outputs onto the locals.
    for z in 0..LOGIC_SLOTS as usize {
        for local in &routing.locals {
            b.add_pip(tt, lc_o[z], *local, PipClass::Regular, pip_delay());
        }
    }
    // LUT route-through: an input can cross to the output, reserving the
    // bel in pass-through mode.
    for z in 0..LOGIC_SLOTS as usize {
        for k in 0..4 {
            b.add_pip(
                tt,
                lc_i[z][k],
                lc_o[z],
                PipClass::RouteThru { bel: z as u32 },
                pip_delay(),
            );
        }
    }
    // Dedicated carry spine.
    for z in 0..(LOGIC_SLOTS - 1) as usize {
        b.add_pip(tt, lc_cout[z], lc_cin[z + 1], PipClass::Regular, pip_delay());
    }
    b.add_pip(
        tt,
        lc_cout[(LOGIC_SLOTS - 1) as usize],
        carry_out,
        PipClass::Regular,
        pip_delay(),
    );
    b.add_pip(tt, carry_in, lc_cin[0], PipClass::Regular, pip_delay());
    // Clock entry from the locals.
    b.add_pip(tt, routing.locals[0], clk, PipClass::Regular, pip_delay());

    // One LOGIC bel per slot.
    for z in 0..LOGIC_SLOTS {
        let bel = b.add_bel(tt, &format!("LC{z}"), "LOGIC", z);
        let zi = z as usize;
        for (k, name) in ["I0", "I1", "I2", "I3"].iter().enumerate() {
            b.add_bel_pin(tt, bel, name, PinDir::In, lc_i[zi][k]);
        }
        b.add_bel_pin(tt, bel, "O", PinDir::Out, lc_o[zi]);
        b.add_bel_pin(tt, bel, "CIN", PinDir::In, lc_cin[zi]);
        b.add_bel_pin(tt, bel, "COUT", PinDir::Out, lc_cout[zi]);
        b.add_bel_pin(tt, bel, "CLK", PinDir::In, clk);
    }

    (
        tt,
        LogicWires {
            routing,
            carry_in,
            carry_out,
            clk,
        },
    )
}

fn add_io_tile_type(b: &mut ChipDbBuilder) -> (u32, RoutingWires) {
    let tt = b.add_tile_type("IO");
    let routing = add_routing_fabric(b, tt);

    let mut io_i = Vec::new();
    let mut io_o = Vec::new();
    for z in 0..IO_SLOTS {
        io_i.push(b.add_wire(tt, &format!("io{z}_i")));
        io_o.push(b.add_wire(tt, &format!("io{z}_o")));
    }
    let mux_sources = routing.mux_sources();
    for z in 0..IO_SLOTS as usize {
        for src in &mux_sources {
            b.add_pip(
                tt,
                *src,
                io_i[z],
                PipClass::Crossbar {
                    group: "iomux".to_string(),
                },
                pip_delay(),
            );
        }
        for local in &routing.locals {
            b.add_pip(tt, io_o[z], *local, PipClass::Regular, pip_delay());
        }
    }
    for z in 0..IO_SLOTS {
        let pad = b.add_wire(tt, &format!("pad{z}"));
        let bel = b.add_bel(tt, &format!("IO{z}"), "IOB", z as i32);
        let zi = z as usize;
        b.add_bel_pin(tt, bel, "I", PinDir::In, io_i[zi]);
        b.add_bel_pin(tt, bel, "O", PinDir::Out, io_o[zi]);
        b.add_bel_pin(tt, bel, "PAD", PinDir::InOut, pad);
    }

    (tt, routing)
}

/// Builds the chip database for a `width` × `height` scamp device.
///
/// # Panics
///
/// Panics if the grid is smaller than 3×3 (no interior logic tiles).
pub fn build_device(width: u32, height: u32) -> ChipDb {
    assert!(width >= 3 && height >= 3, "scamp devices are at least 3x3");
    let mut b = ChipDbBuilder::new(&format!("scamp{width}x{height}"), width, height);

    let (logic_tt, logic) = add_logic_tile_type(&mut b);
    let (io_tt, io_routing) = add_io_tile_type(&mut b);
    let null_tt = b.add_tile_type("NULL");

    let is_corner = |x: u32, y: u32| {
        (x == 0 || x == width - 1) && (y == 0 || y == height - 1)
    };
    let is_rim = |x: u32, y: u32| x == 0 || x == width - 1 || y == 0 || y == height - 1;

    for y in 0..height {
        for x in 0..width {
            let tt = if is_corner(x, y) {
                null_tt
            } else if is_rim(x, y) {
                io_tt
            } else {
                logic_tt
            };
            b.set_tile(x, y, tt);
        }
    }

    let routing_of = |x: u32, y: u32| -> Option<&RoutingWires> {
        if is_corner(x, y) {
            None
        } else if is_rim(x, y) {
            Some(&io_routing)
        } else {
            Some(&logic.routing)
        }
    };

    // Span nodes between horizontal and vertical neighbors.
    for y in 0..height {
        for x in 0..width.saturating_sub(1) {
            if let (Some(a), Some(bw)) = (routing_of(x, y), routing_of(x + 1, y)) {
                for k in 0..NUM_SPANS as usize {
                    let t0 = b.tile_index(x, y);
                    let t1 = b.tile_index(x + 1, y);
                    b.add_node(&[(t0, a.sp_e[k]), (t1, bw.sp_w[k])]);
                }
            }
        }
    }
    for y in 0..height.saturating_sub(1) {
        for x in 0..width {
            if let (Some(a), Some(bn)) = (routing_of(x, y), routing_of(x, y + 1)) {
                for k in 0..NUM_SPANS as usize {
                    let t0 = b.tile_index(x, y);
                    let t1 = b.tile_index(x, y + 1);
                    b.add_node(&[(t0, a.sp_n[k]), (t1, bn.sp_s[k])]);
                }
            }
        }
    }

    // Carry nodes between vertically adjacent logic tiles.
    for y in 1..height - 2 {
        for x in 1..width - 1 {
            if !is_rim(x, y) && !is_rim(x, y + 1) {
                let t0 = b.tile_index(x, y);
                let t1 = b.tile_index(x, y + 1);
                b.add_node(&[(t0, logic.carry_out), (t1, logic.carry_in)]);
            }
        }
    }

    // One global clock node over every logic tile.
    let mut clk_members = Vec::new();
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            clk_members.push((b.tile_index(x, y), logic.clk));
        }
    }
    if clk_members.len() >= 2 {
        b.add_node(&clk_members);
    }

    b.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_chipdb::WireId;

    #[test]
    fn minimal_device_builds() {
        let db = build_device(3, 3);
        assert_eq!(db.num_tiles(), 9);
        // Single interior logic tile, 8 bels; 4 rim IO tiles, 2 bels each.
        assert_eq!(db.bels().count(), 8 + 4 * 2);
    }

    #[test]
    fn grid_layout() {
        let db = build_device(5, 4);
        assert_eq!(db.tile_type(db.tile_index(0, 0)).name, "NULL");
        assert_eq!(db.tile_type(db.tile_index(1, 0)).name, "IO");
        assert_eq!(db.tile_type(db.tile_index(0, 1)).name, "IO");
        assert_eq!(db.tile_type(db.tile_index(1, 1)).name, "LOGIC");
        assert_eq!(db.tile_type(db.tile_index(4, 3)).name, "NULL");
    }

    #[test]
    fn spans_are_joined_into_nodes() {
        let db = build_device(4, 4);
        let t_logic = db.tile_index(1, 1);
        let ty = db.tile_type(t_logic);
        let sp_e_0 = ty.wires.iter().position(|w| w.name == "sp_h_e_0").unwrap() as u32;
        let east = db.tile_index(2, 1);
        let sp_w_0 = db
            .tile_type(east)
            .wires
            .iter()
            .position(|w| w.name == "sp_h_w_0")
            .unwrap() as u32;
        assert_eq!(
            db.canonical_wire(t_logic, sp_e_0),
            db.canonical_wire(east, sp_w_0)
        );
    }

    #[test]
    fn clock_is_one_node() {
        let db = build_device(4, 4);
        let t0 = db.tile_index(1, 1);
        let t1 = db.tile_index(2, 2);
        let clk0 = db
            .tile_type(t0)
            .wires
            .iter()
            .position(|w| w.name == "clk")
            .unwrap() as u32;
        let a = db.canonical_wire(t0, clk0);
        let b = db.canonical_wire(t1, clk0);
        assert!(a.is_node());
        assert_eq!(a, b);
    }

    #[test]
    fn carry_crosses_tiles() {
        let db = build_device(4, 5);
        // Logic rows are y=1..=3; carry_out of (1,1) joins carry_in of (1,2).
        let t0 = db.tile_index(1, 1);
        let t1 = db.tile_index(1, 2);
        let cout = db
            .tile_type(t0)
            .wires
            .iter()
            .position(|w| w.name == "carry_out")
            .unwrap() as u32;
        let cin = db
            .tile_type(t1)
            .wires
            .iter()
            .position(|w| w.name == "carry_in")
            .unwrap() as u32;
        let node = db.canonical_wire(t0, cout);
        assert!(node.is_node());
        assert_eq!(node, db.canonical_wire(t1, cin));
    }

    #[test]
    fn route_exists_from_io_to_lut_input() {
        // Sanity: an IO output wire has downhill pips, and a LUT input has
        // uphill pips, so the router has something to chew on.
        let db = build_device(4, 4);
        let io_tile = db.tile_index(1, 0);
        let io_o = db
            .tile_type(io_tile)
            .wires
            .iter()
            .position(|w| w.name == "io0_o")
            .unwrap() as u32;
        assert!(db.pips_downhill(WireId::new(io_tile, io_o)).count() > 0);

        let logic_tile = db.tile_index(1, 1);
        let lc0_i0 = db
            .tile_type(logic_tile)
            .wires
            .iter()
            .position(|w| w.name == "lc0_i0")
            .unwrap() as u32;
        assert!(db.pips_uphill(WireId::new(logic_tile, lc0_i0)).count() > 0);
    }
}
