//! Shared foundational types for the Kestrel place-and-route engine.
//!
//! This crate provides interned identifiers (with the preloaded constant id
//! table used by hot paths), ordered id lists for hierarchical names, content
//! hashing for database checksums, and the common internal-error type.

#![warn(missing_docs)]

pub mod hash;
pub mod ident;
pub mod idlist;
pub mod result;

pub use hash::ContentHash;
pub use ident::{constids, Id, Interner};
pub use idlist::IdList;
pub use result::{InternalError, KestrelResult};
