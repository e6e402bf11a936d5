//! Domain layer for agent-ws.
//!
//! Pure configuration types with no I/O.  Reading the config file and the
//! command line happens in `infrastructure::config_file` and `main.rs`.

pub mod config;

pub use config::{AgentConfig, ToolConfig, DEFAULT_BIND_ADDR, DEFAULT_MAX_MESSAGE_SIZE};
