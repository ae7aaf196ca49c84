//! Embedded scripting-console line parser.
//!
//! Chunks a stream of input lines into complete statements the scripting
//! runtime can execute: indented blocks (a line ending in `:` opens one),
//! backslash continuations, and bracket continuations are recognized
//! line-wise by an explicit state machine over tagged parse states. The
//! embedding contract is deliberately small — produce a prompt, feed
//! submitted lines, receive a textual result with an error flag — so any
//! runtime (and any GUI) can sit on either side.

#![warn(missing_docs)]

pub mod parser;
pub mod session;
pub mod suggest;

pub use parser::{LineParser, ParseState};
pub use session::{EchoRuntime, ExecResult, Runtime, Session};
pub use suggest::Suggester;
