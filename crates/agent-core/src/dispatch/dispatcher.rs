//! CommandDispatcher: routes decoded commands to the automation backend.
//!
//! # Routing table
//!
//! | `cmd`        | capability                    | success result              |
//! |--------------|-------------------------------|-----------------------------|
//! | `key`        | [`Automation::press_key`]     | `{"ok":true,"cmd":"key"}`   |
//! | `click`      | [`Automation::click_primary`] | `{"ok":true,"cmd":"click"}` |
//! | `screenshot` | [`Automation::capture_screen`]| `{"ok":true,"cmd":"screenshot"}` |
//! | anything else| none                          | per [`UnknownCommandPolicy`]|

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::dispatch::automation::{Automation, AutomationError};
use crate::protocol::messages::{Command, CommandResult, Inbound};

/// How commands outside the routing table are answered.
///
/// No capability is invoked either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownCommandPolicy {
    /// Reply `{"ok":true,"cmd":<name or null>}`.  Existing controllers rely on
    /// this.
    #[default]
    Acknowledge,
    /// Reply `{"ok":false,"error":"unknown command ..."}`.
    Reject,
}

impl UnknownCommandPolicy {
    /// Returns the configuration spelling of this policy.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Acknowledge => "acknowledge",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for UnknownCommandPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnknownCommandPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "acknowledge" => Ok(Self::Acknowledge),
            "reject" => Ok(Self::Reject),
            other => Err(format!(
                "unknown command policy '{other}' (expected 'acknowledge' or 'reject')"
            )),
        }
    }
}

/// Routes each command to the matching [`Automation`] capability.
///
/// The dispatcher holds no per-command state, so one instance is shared by
/// every session behind an `Arc`.
pub struct CommandDispatcher {
    automation: Arc<dyn Automation>,
    unknown_policy: UnknownCommandPolicy,
}

impl CommandDispatcher {
    /// Creates a dispatcher that acknowledges unknown commands.
    pub fn new(automation: Arc<dyn Automation>) -> Self {
        Self {
            automation,
            unknown_policy: UnknownCommandPolicy::default(),
        }
    }

    /// Replaces the unknown-command policy.
    pub fn with_unknown_policy(mut self, policy: UnknownCommandPolicy) -> Self {
        self.unknown_policy = policy;
        self
    }

    /// Returns the active unknown-command policy.
    pub fn unknown_policy(&self) -> UnknownCommandPolicy {
        self.unknown_policy
    }

    /// Handles one decoded inbound message.
    pub fn handle(&self, inbound: &Inbound) -> CommandResult {
        match inbound {
            Inbound::Command(command) => self.dispatch(command),
            Inbound::Unknown(cmd) => self.unknown(cmd),
        }
    }

    /// Executes one command and converts the outcome into a result.
    ///
    /// Exactly one capability call is made.
    pub fn dispatch(&self, command: &Command) -> CommandResult {
        let kind = command.kind();
        let outcome = match command {
            Command::Key { value } => self.automation.press_key(value),
            Command::Click => self.automation.click_primary(),
            Command::Screenshot => self.automation.capture_screen(),
        };

        match outcome {
            Ok(()) => {
                debug!("{kind} handled");
                CommandResult::success(kind)
            }
            Err(e) => {
                warn!("{kind} failed: {e}");
                CommandResult::failure(describe_failure(command, &e))
            }
        }
    }

    fn unknown(&self, cmd: &Value) -> CommandResult {
        let label = unknown_label(cmd);
        warn!("unknown command: {label}");
        match self.unknown_policy {
            UnknownCommandPolicy::Acknowledge => CommandResult::acknowledged(cmd.clone()),
            UnknownCommandPolicy::Reject => {
                CommandResult::failure(format!("unknown command: {label}"))
            }
        }
    }
}

/// Strings print bare, other values as compact JSON.
fn unknown_label(cmd: &Value) -> String {
    match cmd {
        Value::Null => "<missing>".to_owned(),
        Value::String(name) => name.clone(),
        other => other.to_string(),
    }
}

fn describe_failure(command: &Command, err: &AutomationError) -> String {
    match command {
        Command::Key { value } => format!("key '{value}' failed: {err}"),
        other => format!("{} failed: {err}", other.kind()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
