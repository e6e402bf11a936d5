//! Infrastructure layer for agent-ws.
//!
//! # Responsibilities
//!
//! - Binding the TCP listener and performing the WebSocket handshake
//! - Running one [`session::Session`] per controller connection
//! - Driving the desktop through external tools ([`automation`])
//! - Reading the optional TOML configuration file
//!
//! Command decoding and routing live in the `agent-core` crate.

pub mod automation;
pub mod config_file;
pub mod session;
pub mod ws_server;

pub use ws_server::{run_server, serve};
