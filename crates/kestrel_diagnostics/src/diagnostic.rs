//! Structured diagnostic records.

use crate::category::Category;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A structured diagnostic: category, description, and the objects involved.
///
/// Rendered as a single line of the form
/// `error[route]: congestion unresolved: wire 'SP4_H_0' (net 'data[3]')`,
/// optionally followed by a context dump from the emitting phase.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The failure category, which also fixes the exit code when fatal.
    pub category: Category,
    /// The short description of what happened.
    pub message: String,
    /// The primary object involved (cell, net, wire, file), if any.
    pub primary: Option<String>,
    /// A secondary object involved (e.g. the other contender), if any.
    pub secondary: Option<String>,
    /// A 1-based source line, for file-derived diagnostics.
    pub line: Option<u32>,
}

impl Diagnostic {
    /// Creates an error diagnostic with the given category and message.
    pub fn error(category: Category, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            category,
            message: message.into(),
            primary: None,
            secondary: None,
            line: None,
        }
    }

    /// Creates a warning diagnostic with the given category and message.
    pub fn warning(category: Category, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            category,
            message: message.into(),
            primary: None,
            secondary: None,
            line: None,
        }
    }

    /// Creates an informational note.
    pub fn note(category: Category, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Note,
            category,
            message: message.into(),
            primary: None,
            secondary: None,
            line: None,
        }
    }

    /// Sets the primary object name.
    pub fn with_primary(mut self, primary: impl Into<String>) -> Self {
        self.primary = Some(primary.into());
        self
    }

    /// Sets the secondary object name.
    pub fn with_secondary(mut self, secondary: impl Into<String>) -> Self {
        self.secondary = Some(secondary.into());
        self
    }

    /// Sets the 1-based source line.
    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: ", self.severity, self.category)?;
        if let Some(line) = self.line {
            write!(f, "line {line}: ")?;
        }
        f.write_str(&self.message)?;
        if let Some(primary) = &self.primary {
            write!(f, ": '{primary}'")?;
        }
        if let Some(secondary) = &self.secondary {
            write!(f, " ('{secondary}')")?;
        }
        Ok(())
    }
}
