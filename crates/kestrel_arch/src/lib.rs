//! Architecture capability record for the Kestrel engine.
//!
//! Everything device-family-specific that the packer, placer, and router
//! need is collected into one [`Architecture`] trait object passed by
//! reference into each phase: bel validity, bel buckets, cluster geometry,
//! delay estimation, bounding-box margins, and LUT pin permutation data.
//! The engine core never dispatches on a family name.
//!
//! The built-in [`scamp`] family is a synthetic island-style device (LUT4 +
//! DFF logic tiles, dedicated carry, an input crossbar per tile, I/O on the
//! rim) used by the demo CLI and the test suites.

#![warn(missing_docs)]

pub mod constr;
pub mod scamp;

pub use constr::ConstrZ;
pub use scamp::ScampArch;

use kestrel_chipdb::{BelId, Loc, PipId, WireId};
use kestrel_common::{Id, InternalError, KestrelResult};
use kestrel_context::Context;
use kestrel_netlist::CellId;

/// An inclusive rectangle of tile coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    /// Left edge.
    pub x0: i32,
    /// Bottom edge.
    pub y0: i32,
    /// Right edge.
    pub x1: i32,
    /// Top edge.
    pub y1: i32,
}

impl BoundingBox {
    /// An empty box ready to absorb points.
    pub fn empty() -> Self {
        Self {
            x0: i32::MAX,
            y0: i32::MAX,
            x1: i32::MIN,
            y1: i32::MIN,
        }
    }

    /// Grows the box to include `(x, y)`.
    pub fn include(&mut self, x: i32, y: i32) {
        self.x0 = self.x0.min(x);
        self.y0 = self.y0.min(y);
        self.x1 = self.x1.max(x);
        self.y1 = self.y1.max(y);
    }

    /// Returns the box grown by `margin` on every side.
    pub fn expanded(self, margin: i32) -> Self {
        Self {
            x0: self.x0 - margin,
            y0: self.y0 - margin,
            x1: self.x1 + margin,
            y1: self.y1 + margin,
        }
    }

    /// Returns the box intersected with the `width` × `height` grid.
    pub fn clamped(self, width: u32, height: u32) -> Self {
        Self {
            x0: self.x0.max(0),
            y0: self.y0.max(0),
            x1: self.x1.min(width as i32 - 1),
            y1: self.y1.min(height as i32 - 1),
        }
    }

    /// Returns `true` if `(x, y)` lies inside the box.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }
}

/// The capability record every device family implements.
///
/// All methods are pure with respect to the `Context` plus tile-local state,
/// so validity checks may run on rayon workers over the shared immutable
/// chip database.
pub trait Architecture: std::fmt::Debug + Send + Sync {
    /// The canonical family name (e.g. "scamp").
    fn family_name(&self) -> &str;

    /// The device name (e.g. "scamp8x8").
    fn device_name(&self) -> &str;

    /// Returns whether a cell of this kind may be placed on this bel.
    ///
    /// The default accepts exact type matches only.
    fn is_valid_bel_for_cell(&self, ctx: &Context, cell: CellId, bel: BelId) -> bool {
        match ctx.design.cells.get(cell) {
            Some(c) => c.kind == ctx.bel_kind(bel),
            None => false,
        }
    }

    /// Returns whether the bel's current surroundings are legal: shared
    /// tile-local resources (clock, reset, enable), mutually exclusive
    /// overlapping bels. Must inspect only the bel's own tile.
    fn is_bel_location_valid(&self, ctx: &Context, bel: BelId) -> bool {
        let _ = (ctx, bel);
        true
    }

    /// Returns the bel bucket a cell kind draws candidates from.
    fn bel_bucket_for_cell_kind(&self, kind: Id) -> Id {
        kind
    }

    /// Returns the bucket a bel belongs to.
    fn bel_bucket_for_bel(&self, ctx: &Context, bel: BelId) -> Id {
        ctx.bel_kind(bel)
    }

    /// Resolves a cluster child's location from a base location and the
    /// child's placement hint. For [`ConstrZ::ChainNext`] the base is the
    /// previous chain member's location, otherwise the cluster root's.
    fn child_placement(&self, base: Loc, constr_z: i32) -> Option<Loc> {
        match ConstrZ::decode(constr_z)? {
            ConstrZ::Abs(z) => Some(Loc::new(base.x, base.y, z)),
            ConstrZ::Rel(dz) => Some(Loc::new(base.x, base.y, base.z + dz)),
            ConstrZ::ChainNext => self.chain_successor(base),
            ConstrZ::Slot(_) => None,
        }
    }

    /// The architecture's chain successor map: the location that follows
    /// `loc` in a carry-style chain, if any.
    fn chain_successor(&self, loc: Loc) -> Option<Loc> {
        let _ = loc;
        None
    }

    /// Estimates the routing delay between two wires (HPWL-style cost).
    fn estimate_delay(&self, ctx: &Context, src: WireId, dst: WireId) -> f64 {
        let (sx, sy) = ctx.chip().wire_position(src);
        let (dx, dy) = ctx.chip().wire_position(dst);
        (sx - dx).abs() + (sy - dy).abs()
    }

    /// Predicts the delay from one placed bel pin to another.
    fn predict_delay(&self, ctx: &Context, src: BelId, src_pin: Id, dst: BelId, dst_pin: Id) -> f64 {
        let _ = (src_pin, dst_pin);
        let a = ctx.chip().bel_loc(src);
        let b = ctx.chip().bel_loc(dst);
        ((a.x - b.x).abs() + (a.y - b.y).abs()) as f64
    }

    /// Adds the family's routing margin to a net's bounding box and clamps
    /// it to the grid.
    fn expand_bounding_box(&self, ctx: &Context, bbox: BoundingBox) -> BoundingBox {
        bbox.expanded(2)
            .clamped(ctx.chip().width, ctx.chip().height)
    }

    /// The base cost of traversing a pip during routing.
    fn pip_cost(&self, ctx: &Context, pip: PipId) -> f64 {
        1.0 + ctx.chip().pip_data(pip).delay.max_ns
    }

    /// The logical-order LUT input pins of this family, or empty if the
    /// family has no permutable LUTs.
    fn lut_pin_order(&self) -> &[Id] {
        &[]
    }

    /// The physical pins the router may use for a given cell port. The
    /// default permits only the port's own pin; LUT families return all
    /// permutable inputs.
    fn permutable_pins(&self, ctx: &Context, cell: CellId, port: Id) -> Vec<Id> {
        let _ = (ctx, cell);
        vec![port]
    }
}

/// Loads an architecture by family and device name.
///
/// # Errors
///
/// Returns an error if the family is unknown or the device name is not
/// valid for the family.
pub fn load_architecture(family: &str, device: &str) -> KestrelResult<Box<dyn Architecture>> {
    match family.to_ascii_lowercase().as_str() {
        "scamp" => {
            let arch = ScampArch::from_device_name(device).ok_or_else(|| {
                InternalError::new(format!(
                    "unknown scamp device {device:?}; expected scamp<W>x<H>"
                ))
            })?;
            Ok(Box::new(arch))
        }
        _ => Err(InternalError::new(format!(
            "unknown FPGA family: {family:?}. Supported: scamp"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_grows_and_clamps() {
        let mut bbox = BoundingBox::empty();
        bbox.include(2, 3);
        bbox.include(5, 1);
        assert_eq!(bbox.x0, 2);
        assert_eq!(bbox.y0, 1);
        assert_eq!(bbox.x1, 5);
        assert_eq!(bbox.y1, 3);

        let grown = bbox.expanded(2).clamped(6, 6);
        assert_eq!(grown.x0, 0);
        assert_eq!(grown.y0, 0);
        assert_eq!(grown.x1, 5);
        assert_eq!(grown.y1, 5);
        assert!(grown.contains(5, 5));
        assert!(!grown.contains(6, 5));
    }

    #[test]
    fn load_scamp() {
        let arch = load_architecture("scamp", "scamp8x8").unwrap();
        assert_eq!(arch.family_name(), "scamp");
        assert_eq!(arch.device_name(), "scamp8x8");
    }

    #[test]
    fn load_unknown_family() {
        let err = load_architecture("ice40", "hx8k").unwrap_err();
        assert!(err.message.contains("unknown FPGA family"));
    }

    #[test]
    fn load_bad_device_name() {
        let err = load_architecture("scamp", "bogus").unwrap_err();
        assert!(err.message.contains("unknown scamp device"));
    }
}
