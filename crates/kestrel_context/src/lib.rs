//! The Context: single arbiter of design mutation.
//!
//! A [`Context`] owns the chip database, the design, and the interner, and
//! exposes the only API through which bels, wires, and pips are bound to
//! cells and nets. Every mutating call leaves the design satisfying the
//! binding invariants (bel/wire/pip uniqueness, driver uniqueness, user
//! back-links, canonical wire form); the [`verify`] module re-checks them
//! wholesale and is run after every phase in the test suites.

#![warn(missing_docs)]

pub mod cancel;
pub mod context;
pub mod error;
pub mod verify;

pub use cancel::CancelToken;
pub use context::Context;
pub use error::BindError;
