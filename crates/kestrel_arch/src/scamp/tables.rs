//! Per-family placement tables.
//!
//! The carry successor map and the LUT pin order are explicit tables, ported
//! as-is for the family rather than derived, so other families can ship
//! different tables without touching the placer or router.

use kestrel_chipdb::Loc;
use kestrel_common::{constids, Id};

/// Number of logic slots (z coordinates) per logic tile.
pub const LOGIC_SLOTS: i32 = 8;

/// Carry successor z per slot; `-1` rolls the chain into the tile above.
pub const CARRY_NEXT_Z: [i8; LOGIC_SLOTS as usize] = [1, 2, 3, 4, 5, 6, 7, -1];

/// The family's LUT input pins in logical order.
pub const LUT_PINS: [Id; 4] = [constids::I0, constids::I1, constids::I2, constids::I3];

/// Resolves the location that follows `loc` in a carry chain.
///
/// Within a tile the chain walks the slot table; at the top slot it
/// continues at slot 0 of the tile above. Returns `None` when the chain
/// would leave the logic area (`logic_y_max` is the last logic row).
pub fn carry_successor(loc: Loc, logic_y_max: i32) -> Option<Loc> {
    if !(0..LOGIC_SLOTS).contains(&loc.z) {
        return None;
    }
    let next = CARRY_NEXT_Z[loc.z as usize];
    if next >= 0 {
        Some(Loc::new(loc.x, loc.y, next as i32))
    } else if loc.y + 1 <= logic_y_max {
        Some(Loc::new(loc.x, loc.y + 1, 0))
    } else {
        None
    }
}
