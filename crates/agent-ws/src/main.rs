//! Desktop automation agent: entry point.
//!
//! Accepts WebSocket connections from a controller UI and executes the
//! commands it sends (`key`, `click`, `screenshot`) on the local X11 desktop,
//! answering each one with `{"ok":...}`.
//!
//! # Usage
//!
//! ```text
//! agent-ws [OPTIONS]
//!
//! Options:
//!   --config <PATH>              TOML config file
//!   --bind <IP>                  Listen address [default: 0.0.0.0]
//!   --port <PORT>                Listen port [default: 8765]
//!   --max-message-size <BYTES>   Largest accepted message [default: 1048576]
//!   --unknown-commands <POLICY>  acknowledge | reject [default: acknowledge]
//!   --screenshot-path <PATH>     Screenshot destination [default: screen.png]
//!   --dry-run                    Log commands instead of executing them
//!   --log-level <FILTER>         Used when RUST_LOG is unset [default: info]
//! ```
//!
//! Precedence: command line > environment variable > config file > default.
//!
//! | Variable          | Option          |
//! |-------------------|-----------------|
//! | `AGENT_CONFIG`    | `--config`      |
//! | `AGENT_BIND`      | `--bind`        |
//! | `AGENT_PORT`      | `--port`        |
//! | `AGENT_LOG_LEVEL` | `--log-level`   |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use agent_core::dispatch::{Automation, CommandDispatcher, UnknownCommandPolicy};
use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use agent_ws::domain::AgentConfig;
use agent_ws::infrastructure::automation::{LoggingAutomation, ToolAutomation};
use agent_ws::infrastructure::config_file::load_config;
use agent_ws::infrastructure::run_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Desktop automation agent.
///
/// Executes key presses, mouse clicks and screenshots requested by a remote
/// controller over WebSocket.
#[derive(Debug, Parser)]
#[command(
    name = "agent-ws",
    about = "WebSocket agent that executes keyboard, mouse and screenshot commands",
    version
)]
struct Cli {
    /// TOML configuration file.  Every key is optional.
    #[arg(long, env = "AGENT_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to listen on.
    ///
    /// `0.0.0.0` accepts controllers from any interface; `127.0.0.1` only
    /// from this machine.
    #[arg(long, env = "AGENT_BIND")]
    bind: Option<String>,

    /// TCP port to listen on.
    #[arg(long, env = "AGENT_PORT")]
    port: Option<u16>,

    /// Largest inbound message in bytes.  Larger messages end the session.
    #[arg(long)]
    max_message_size: Option<usize>,

    /// How to answer commands the agent does not know: `acknowledge` replies
    /// ok:true, `reject` replies ok:false.
    #[arg(long)]
    unknown_commands: Option<UnknownCommandPolicy>,

    /// Where `screenshot` writes its image.
    #[arg(long)]
    screenshot_path: Option<PathBuf>,

    /// Acknowledge and log commands without touching the desktop.
    #[arg(long)]
    dry_run: bool,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, default_value = "info", env = "AGENT_LOG_LEVEL")]
    log_level: String,
}

impl Cli {
    /// Loads the config file (if any) and applies command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded or `--bind` is
    /// not an IP address.
    fn resolve_config(&self) -> anyhow::Result<AgentConfig> {
        let base = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => AgentConfig::default(),
        };
        self.apply_overrides(base)
    }

    /// Overlays every option given on the command line onto `config`.
    fn apply_overrides(&self, mut config: AgentConfig) -> anyhow::Result<AgentConfig> {
        if let Some(bind) = &self.bind {
            let ip: IpAddr = bind
                .parse()
                .with_context(|| format!("invalid bind address: '{bind}'"))?;
            config.bind_addr = SocketAddr::new(ip, config.bind_addr.port());
        }
        if let Some(port) = self.port {
            config.bind_addr.set_port(port);
        }
        if let Some(size) = self.max_message_size {
            config.max_message_size = size;
        }
        if let Some(policy) = self.unknown_commands {
            config.unknown_commands = policy;
        }
        if let Some(path) = &self.screenshot_path {
            config.tools.screenshot_path = path.clone();
        }
        Ok(config)
    }
}

/// Chooses the automation backend.
fn build_automation(config: &AgentConfig, dry_run: bool) -> Arc<dyn Automation> {
    if dry_run {
        Arc::new(LoggingAutomation)
    } else {
        Arc::new(ToolAutomation::new(config.tools.clone()))
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --log-level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let config = cli.resolve_config()?;
    info!(
        "desktop agent starting: bind={}, dry_run={}",
        config.bind_addr, cli.dry_run
    );

    let automation = build_automation(&config, cli.dry_run);
    let dispatcher = Arc::new(
        CommandDispatcher::new(automation).with_unknown_policy(config.unknown_commands),
    );

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, dispatcher, running).await?;

    info!("desktop agent stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
