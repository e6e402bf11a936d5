//! Controller-facing wire protocol.
//!
//! Every message in either direction is a single JSON object carried in one
//! WebSocket text frame.

pub mod messages;

pub use messages::{decode_inbound, Command, CommandKind, CommandResult, DecodeError, Inbound};
