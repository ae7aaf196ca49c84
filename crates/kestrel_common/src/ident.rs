//! Interned identifiers for cheap cloning and O(1) equality comparison.
//!
//! Every name in a Kestrel design — cell names, net names, port labels,
//! attribute keys, bel and wire names — is an [`Id`]: a `u32` index into a
//! string interner. Interning is monotonic (an id is never reused or
//! reassigned) and idempotent. The distinguished zero id means "none".
//!
//! A fixed table of well-known strings is preloaded into every interner in a
//! stable order, so hot paths in the packer, placer, and router compare
//! against the constants in [`constids`] without hashing.

use lasso::ThreadedRodeo;
use serde::{Deserialize, Serialize};

/// A unique identifier for any named entity in a design or device database.
///
/// Identifiers are interned strings represented as a `u32` index. Equality
/// is integer equality; [`Id::NONE`] (index zero, the empty string) stands
/// for "no name".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Id(u32);

impl Id {
    /// The distinguished "none" identifier (interned empty string).
    pub const NONE: Id = Id(0);

    /// Creates an `Id` from a raw `u32` index.
    ///
    /// Intended for deserialization and the [`constids`] table. Ids used for
    /// lookups must have been produced by the interner they are resolved
    /// against.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw `u32` index of this identifier.
    pub fn as_raw(self) -> u32 {
        self.0
    }

    /// Returns `true` if this is the distinguished "none" id.
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if this id names something (is not [`Id::NONE`]).
    pub fn is_some(self) -> bool {
        self.0 != 0
    }
}

// SAFETY: `Id` wraps a `u32` which is always a valid `usize` on 32-bit and
// 64-bit platforms. `try_from_usize` rejects values that don't fit in `u32`.
unsafe impl lasso::Key for Id {
    fn into_usize(self) -> usize {
        self.0 as usize
    }

    fn try_from_usize(int: usize) -> Option<Self> {
        u32::try_from(int).ok().map(Id)
    }
}

/// Well-known identifiers preloaded into every [`Interner`].
///
/// The constants here are valid for any interner created with
/// [`Interner::new`]; their numeric values follow the order of the
/// `PRELOAD` table and must never be rearranged.
pub mod constids {
    use super::Id;

    /// Strings interned at construction, in constant order. Index 0 is the
    /// empty string backing [`Id::NONE`].
    pub(super) const PRELOAD: &[&str] = &[
        "",
        "$PACKER_GND",
        "$PACKER_VCC",
        "GND",
        "VCC",
        "LUT4",
        "DFF",
        "LOGIC",
        "CARRY",
        "IOB",
        "IBUF",
        "OBUF",
        "IOBUF",
        "ROUTETHRU",
        "I0",
        "I1",
        "I2",
        "I3",
        "I",
        "O",
        "D",
        "Q",
        "CLK",
        "EN",
        "RST",
        "CIN",
        "COUT",
        "PAD",
        "INIT",
        "IO_TYPE",
        "top",
    ];

    /// Constant-driver net/cell name for logic-0.
    pub const PACKER_GND: Id = Id(1);
    /// Constant-driver net/cell name for logic-1.
    pub const PACKER_VCC: Id = Id(2);
    /// The canonical logic-0 net name.
    pub const GND: Id = Id(3);
    /// The canonical logic-1 net name.
    pub const VCC: Id = Id(4);
    /// Four-input look-up table cell/bel kind.
    pub const LUT4: Id = Id(5);
    /// D flip-flop cell/bel kind.
    pub const DFF: Id = Id(6);
    /// Fused LUT+FF composite logic cell kind.
    pub const LOGIC: Id = Id(7);
    /// Carry-chain cell kind.
    pub const CARRY: Id = Id(8);
    /// I/O block bel kind.
    pub const IOB: Id = Id(9);
    /// Synthesized input pad cell kind.
    pub const IBUF: Id = Id(10);
    /// Synthesized output pad cell kind.
    pub const OBUF: Id = Id(11);
    /// Synthesized bidirectional pad cell kind.
    pub const IOBUF: Id = Id(12);
    /// Synthetic cell kind reifying a LUT used as a route-through.
    pub const ROUTETHRU: Id = Id(13);
    /// LUT input pin 0.
    pub const I0: Id = Id(14);
    /// LUT input pin 1.
    pub const I1: Id = Id(15);
    /// LUT input pin 2.
    pub const I2: Id = Id(16);
    /// LUT input pin 3.
    pub const I3: Id = Id(17);
    /// Generic single input pin.
    pub const I: Id = Id(18);
    /// Generic output pin.
    pub const O: Id = Id(19);
    /// Flip-flop data input pin.
    pub const D: Id = Id(20);
    /// Flip-flop output pin.
    pub const Q: Id = Id(21);
    /// Clock pin.
    pub const CLK: Id = Id(22);
    /// Clock-enable pin.
    pub const EN: Id = Id(23);
    /// Reset pin.
    pub const RST: Id = Id(24);
    /// Carry-in pin.
    pub const CIN: Id = Id(25);
    /// Carry-out pin.
    pub const COUT: Id = Id(26);
    /// Package pad pin on an I/O bel.
    pub const PAD: Id = Id(27);
    /// LUT truth-table parameter key.
    pub const INIT: Id = Id(28);
    /// I/O standard attribute key.
    pub const IO_TYPE: Id = Id(29);
    /// The `top` module attribute marker.
    pub const TOP: Id = Id(30);
}

/// Thread-safe string interner backed by [`lasso::ThreadedRodeo`].
///
/// One interner is owned by the `Context` and handed through to every
/// subsystem that needs interning. Construction preloads the [`constids`]
/// table; interning is append-only and safe to read concurrently, so the
/// front-end may intern while later phases read.
pub struct Interner {
    rodeo: ThreadedRodeo<Id>,
}

impl Interner {
    /// Creates a new interner with the [`constids`] table preloaded.
    pub fn new() -> Self {
        let rodeo = ThreadedRodeo::new();
        for &s in constids::PRELOAD {
            rodeo.get_or_intern_static(s);
        }
        Self { rodeo }
    }

    /// Interns a string, returning its [`Id`]. Idempotent: interning the
    /// same string twice returns the same id without allocating.
    pub fn intern(&self, s: &str) -> Id {
        self.rodeo.get_or_intern(s)
    }

    /// Returns the id of `s` if it has already been interned.
    pub fn get(&self, s: &str) -> Option<Id> {
        self.rodeo.get(s)
    }

    /// Resolves an [`Id`] back to its string value.
    ///
    /// # Panics
    ///
    /// Panics if the `Id` was not created by this interner.
    pub fn resolve(&self, id: Id) -> &str {
        self.rodeo.resolve(&id)
    }

    /// Returns the number of interned strings (including the preload table).
    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    /// Returns `false`: an interner always holds the preload table.
    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Interner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interner")
            .field("len", &self.rodeo.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_resolve_roundtrip() {
        let interner = Interner::new();
        let id = interner.intern("my_signal");
        assert_eq!(interner.resolve(id), "my_signal");
    }

    #[test]
    fn same_string_same_id() {
        let interner = Interner::new();
        let a = interner.intern("counter[3]");
        let b = interner.intern("counter[3]");
        assert_eq!(a, b);
    }

    #[test]
    fn different_strings_different_ids() {
        let interner = Interner::new();
        let a = interner.intern("foo");
        let b = interner.intern("bar");
        assert_ne!(a, b);
    }

    #[test]
    fn none_is_empty_string() {
        let interner = Interner::new();
        assert_eq!(interner.resolve(Id::NONE), "");
        assert_eq!(interner.intern(""), Id::NONE);
        assert!(Id::NONE.is_none());
        assert!(!Id::NONE.is_some());
    }

    #[test]
    fn preload_table_matches_constants() {
        let interner = Interner::new();
        assert_eq!(interner.resolve(constids::LUT4), "LUT4");
        assert_eq!(interner.resolve(constids::DFF), "DFF");
        assert_eq!(interner.resolve(constids::COUT), "COUT");
        assert_eq!(interner.resolve(constids::TOP), "top");
        assert_eq!(interner.intern("VCC"), constids::VCC);
        assert_eq!(interner.intern("I3"), constids::I3);
    }

    #[test]
    fn preload_survives_user_interning() {
        let interner = Interner::new();
        interner.intern("user_cell_0");
        interner.intern("user_cell_1");
        assert_eq!(interner.intern("CLK"), constids::CLK);
    }

    #[test]
    fn get_without_interning() {
        let interner = Interner::new();
        assert!(interner.get("never_seen").is_none());
        assert_eq!(interner.get("GND"), Some(constids::GND));
    }

    #[test]
    fn serde_roundtrip() {
        let id = Id::from_raw(42);
        let json = serde_json::to_string(&id).unwrap();
        let back: Id = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn concurrent_interning_is_consistent() {
        let interner = std::sync::Arc::new(Interner::new());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let interner = interner.clone();
            handles.push(std::thread::spawn(move || interner.intern("shared_net")));
        }
        let ids: Vec<Id> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
    }
}
