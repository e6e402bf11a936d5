//! Agent configuration types.
//!
//! [`AgentConfig`] is the single source of truth for runtime settings.  It is
//! built from defaults, optionally overlaid by a TOML file, then overlaid by
//! command-line arguments.  The listening address is an ordinary value passed
//! to the server; there is no process-wide listener state.
//!
//! # File format
//!
//! Every key is optional.  Unknown keys are rejected so typos surface at
//! startup instead of silently falling back to a default.
//!
//! ```toml
//! bind_addr = "0.0.0.0:8765"
//! max_message_size = 1048576
//! unknown_commands = "acknowledge"   # or "reject"
//!
//! [tools]
//! xdotool = "/usr/bin/xdotool"
//! scrot = "/usr/bin/scrot"
//! screenshot_path = "screen.png"
//! ```

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;

use agent_core::dispatch::UnknownCommandPolicy;
use serde::Deserialize;

/// Listen on every interface, port 8765.
pub const DEFAULT_BIND_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 8765));

/// Largest inbound WebSocket message accepted (1 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1 << 20;

/// All runtime configuration for the agent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: SocketAddr,

    /// Maximum size of a single inbound message in bytes.
    ///
    /// Enforced by the WebSocket layer; an oversized message ends the session.
    pub max_message_size: usize,

    /// How commands outside the routing table are answered.
    pub unknown_commands: UnknownCommandPolicy,

    /// External tools used by the command-line automation backend.
    pub tools: ToolConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            unknown_commands: UnknownCommandPolicy::default(),
            tools: ToolConfig::default(),
        }
    }
}

/// Paths used by the command-line automation backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Program used for key presses and clicks.  Looked up on `PATH` when
    /// relative.
    pub xdotool: PathBuf,

    /// Program used for screen capture.
    pub scrot: PathBuf,

    /// Where screenshots are written, relative to the working directory
    /// unless absolute.
    pub screenshot_path: PathBuf,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            xdotool: PathBuf::from("xdotool"),
            scrot: PathBuf::from("scrot"),
            screenshot_path: PathBuf::from("screen.png"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
