//! Attribute and parameter values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A cell/net attribute or parameter value: a string or an integer.
///
/// Integer values round-trip exactly through their decimal string form;
/// front-ends must reject numeric inputs that cannot (fractional JSON
/// numbers, for example).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Property {
    /// A string value.
    Str(String),
    /// An integer value.
    Int(i64),
}

impl Property {
    /// Returns the integer value, parsing decimal strings if necessary.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Property::Int(v) => Some(*v),
            Property::Str(s) => s.parse().ok(),
        }
    }

    /// Returns the string value, if this is a string property.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Property::Str(s) => Some(s),
            Property::Int(_) => None,
        }
    }

    /// Returns `true` for string properties.
    pub fn is_string(&self) -> bool {
        matches!(self, Property::Str(_))
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Property::Str(s) => f.write_str(s),
            Property::Int(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for Property {
    fn from(s: &str) -> Self {
        Property::Str(s.to_string())
    }
}

impl From<String> for Property {
    fn from(s: String) -> Self {
        Property::Str(s)
    }
}

impl From<i64> for Property {
    fn from(v: i64) -> Self {
        Property::Int(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_roundtrips_through_display() {
        let p = Property::Int(-42);
        assert_eq!(format!("{p}"), "-42");
        assert_eq!(Property::Str("-42".into()).as_int(), Some(-42));
    }

    #[test]
    fn string_accessors() {
        let p = Property::from("LVCMOS33");
        assert!(p.is_string());
        assert_eq!(p.as_str(), Some("LVCMOS33"));
        assert_eq!(p.as_int(), None);
    }

    #[test]
    fn from_conversions() {
        assert_eq!(Property::from(7i64), Property::Int(7));
        assert_eq!(Property::from("x".to_string()), Property::Str("x".into()));
    }

    #[test]
    fn serde_roundtrip() {
        let p = Property::Int(65535);
        let json = serde_json::to_string(&p).unwrap();
        let back: Property = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}
