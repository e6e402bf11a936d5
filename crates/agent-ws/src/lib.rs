//! agent-ws library crate.
//!
//! A WebSocket service that lets a remote controller (typically a UI) press
//! keys, click the mouse and take screenshots on this machine.
//!
//! # Architecture
//!
//! ```text
//! Controller (JSON over WebSocket)
//!         ↕
//! [agent-ws]
//!   ├── domain/            AgentConfig, ToolConfig
//!   └── infrastructure/
//!         ├── ws_server    accept loop (tokio-tungstenite)
//!         ├── session      per-connection command loop
//!         ├── automation   xdotool/scrot backend, mock backend
//!         └── config_file  TOML loader
//!         ↓
//! [agent-core]  decode_inbound, CommandDispatcher, Automation trait
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `infrastructure` depends on `domain`, `agent-core`, `tokio` and
//!   `tungstenite`.

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Infrastructure layer: WebSocket server, session loop, automation backends.
pub mod infrastructure;
