//! Diagnostic categories and their process exit codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The failure taxonomy for the place-and-route pipeline.
///
/// Each category carries the exit code the CLI terminates with when a fatal
/// diagnostic of that category is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Malformed netlist, unknown cell type, ambiguous top module,
    /// invalid constraints file. Exit 1.
    Input,
    /// No bel of the required type exists, or no legal bel location
    /// could be found for a cell. Exit 4.
    Placement,
    /// A caller attempted to bind a resource already held by another
    /// cell or net. Exit 2 when fatal.
    Binding,
    /// The router hit its iteration cap with unresolved congestion. Exit 3.
    Congestion,
    /// Chip database missing, or magic/version/checksum mismatch. Exit 2.
    Database,
    /// Cooperative cancellation: the run stopped early but left a
    /// consistent partial state. Exit 0.
    Cancelled,
    /// Any other internal assertion failure. Exit 2.
    Internal,
}

impl Category {
    /// Returns the process exit code for a fatal diagnostic of this category.
    pub fn exit_code(self) -> i32 {
        match self {
            Category::Input => 1,
            Category::Placement => 4,
            Category::Congestion => 3,
            Category::Cancelled => 0,
            Category::Binding | Category::Database | Category::Internal => 2,
        }
    }

    /// Returns the short lowercase tag used in rendered diagnostics.
    pub fn tag(self) -> &'static str {
        match self {
            Category::Input => "input",
            Category::Placement => "place",
            Category::Binding => "binding",
            Category::Congestion => "route",
            Category::Database => "database",
            Category::Cancelled => "cancelled",
            Category::Internal => "internal",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
