//! Numeric encoding of cluster placement hints.
//!
//! The packer stores one `i32` per cluster child; the placer decodes it and
//! asks the architecture to resolve the child's location. The encoding keeps
//! plain z coordinates in their natural range so absolute-z hints cost
//! nothing to decode.

use serde::{Deserialize, Serialize};

/// First value above the absolute-z range.
const CHAIN_NEXT: i32 = 1024;

/// Base of the named-slot range: `SLOT_BASE + n` encodes slot `n`.
const SLOT_BASE: i32 = 2048;

/// Base of the relative-z range: `REL_BASE + dz` encodes `Rel(dz)`,
/// `dz` in `-1024..1024`.
const REL_BASE: i32 = 4096;

/// A decoded cluster placement hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstrZ {
    /// Pin the child to this z coordinate within the root's tile.
    Abs(i32),
    /// Place the child at the root's z plus this offset.
    Rel(i32),
    /// Walk the architecture's chain successor map from the previous child.
    ChainNext,
    /// An architecture-defined named slot (e.g. register-file input n).
    Slot(i32),
}

impl ConstrZ {
    /// Encodes the hint as the numeric form stored on cells.
    pub fn encode(self) -> i32 {
        match self {
            ConstrZ::Abs(z) => {
                debug_assert!((0..CHAIN_NEXT).contains(&z));
                z
            }
            ConstrZ::ChainNext => CHAIN_NEXT,
            ConstrZ::Slot(n) => {
                debug_assert!((0..1024).contains(&n));
                SLOT_BASE + n
            }
            ConstrZ::Rel(dz) => {
                debug_assert!((-1024..1024).contains(&dz));
                REL_BASE + dz
            }
        }
    }

    /// Decodes the numeric form. Returns `None` for values outside every
    /// range (a corrupted hint).
    pub fn decode(value: i32) -> Option<Self> {
        match value {
            0..=1023 => Some(ConstrZ::Abs(value)),
            CHAIN_NEXT => Some(ConstrZ::ChainNext),
            v if (SLOT_BASE..REL_BASE - 1024).contains(&v) => Some(ConstrZ::Slot(v - SLOT_BASE)),
            v if (REL_BASE - 1024..REL_BASE + 1024).contains(&v) => Some(ConstrZ::Rel(v - REL_BASE)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abs_roundtrip() {
        for z in [0, 1, 7, 1023] {
            assert_eq!(ConstrZ::decode(ConstrZ::Abs(z).encode()), Some(ConstrZ::Abs(z)));
        }
    }

    #[test]
    fn chain_next_roundtrip() {
        assert_eq!(
            ConstrZ::decode(ConstrZ::ChainNext.encode()),
            Some(ConstrZ::ChainNext)
        );
    }

    #[test]
    fn slot_roundtrip() {
        for n in [0, 3, 27] {
            assert_eq!(
                ConstrZ::decode(ConstrZ::Slot(n).encode()),
                Some(ConstrZ::Slot(n))
            );
        }
    }

    #[test]
    fn rel_roundtrip() {
        for dz in [-8, -1, 0, 1, 8] {
            assert_eq!(ConstrZ::decode(ConstrZ::Rel(dz).encode()), Some(ConstrZ::Rel(dz)));
        }
    }

    #[test]
    fn encodings_are_disjoint() {
        let values = [
            ConstrZ::Abs(0).encode(),
            ConstrZ::Abs(1023).encode(),
            ConstrZ::ChainNext.encode(),
            ConstrZ::Slot(0).encode(),
            ConstrZ::Rel(-1024).encode(),
            ConstrZ::Rel(1023).encode(),
        ];
        let set: std::collections::HashSet<_> = values.iter().collect();
        assert_eq!(set.len(), values.len());
    }

    #[test]
    fn garbage_decodes_to_none() {
        assert_eq!(ConstrZ::decode(-1), None);
        assert_eq!(ConstrZ::decode(1_000_000), None);
    }
}
