//! Structured diagnostics for the Kestrel place-and-route engine.
//!
//! Every user-visible failure in Kestrel is a [`Diagnostic`]: a category
//! (which fixes the process exit code), a short description, the primary
//! object involved, and optionally a secondary object and a source line.
//! Diagnostics accumulate in a thread-safe [`DiagnosticSink`]; fatal paths
//! render a single structured line and terminate with the category's exit
//! code.

#![warn(missing_docs)]

pub mod category;
pub mod diagnostic;
pub mod severity;
pub mod sink;

pub use category::Category;
pub use diagnostic::Diagnostic;
pub use severity::Severity;
pub use sink::DiagnosticSink;
