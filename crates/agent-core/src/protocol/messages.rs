//! JSON message types for the controller-facing protocol.
//!
//! # Inbound messages
//!
//! The controller sends one JSON object per WebSocket text frame.  The `"cmd"`
//! field names the action; `key` additionally carries a `"value"`:
//!
//! ```json
//! {"cmd":"key","value":"Return"}
//! {"cmd":"click"}
//! {"cmd":"screenshot"}
//! ```
//!
//! # Outbound acknowledgements
//!
//! The agent answers every inbound message with exactly one object:
//!
//! ```json
//! {"ok":true,"cmd":"key"}
//! {"ok":false,"error":"key failed: xdotool exited with status 1"}
//! ```
//!
//! # Why decode by hand instead of `#[serde(tag = "cmd")]`?
//!
//! An internally tagged enum folds "no `cmd` field" and "unrecognised `cmd`"
//! into the same deserialisation error.  The protocol treats those two cases
//! very differently from a malformed payload: they are acknowledged, not
//! rejected.  [`decode_inbound`] therefore reads the tag first and only hands
//! the object to serde once the command kind is known.

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

// ── Command kinds ─────────────────────────────────────────────────────────────

/// The closed set of command kinds the agent knows how to execute.
///
/// Adding a kind means adding a variant here, a variant to [`Command`], and a
/// match arm in the dispatcher; the compiler points at every place that needs
/// updating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Simulate a single key press.
    Key,
    /// Simulate a primary (left) mouse button click.
    Click,
    /// Capture the screen to the configured destination.
    Screenshot,
}

impl CommandKind {
    /// All known kinds, in routing-table order.
    pub const ALL: [CommandKind; 3] = [Self::Key, Self::Click, Self::Screenshot];

    /// Returns the wire name used in the `"cmd"` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::Click => "click",
            Self::Screenshot => "screenshot",
        }
    }

    /// Looks up a kind by its wire name.  Matching is case-sensitive.
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Inbound ───────────────────────────────────────────────────────────────────

/// A decoded command with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Press the named key.  The name is passed to the backend verbatim.
    Key {
        /// Platform key name, e.g. `"a"`, `"Return"`, `"ctrl+c"`.
        value: String,
    },
    /// Click the primary mouse button at the current cursor position.
    Click,
    /// Capture the screen.
    Screenshot,
}

impl Command {
    /// Returns the routing kind of this command.
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Key { .. } => CommandKind::Key,
            Self::Click => CommandKind::Click,
            Self::Screenshot => CommandKind::Screenshot,
        }
    }
}

/// The outcome of decoding one inbound frame that was well-formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A command from the routing table.
    Command(Command),
    /// Anything else in the `"cmd"` field, kept exactly as sent so it can be
    /// echoed back.
    ///
    /// [`Value::Null`] when the object had no `"cmd"` field or it was `null`.
    /// Non-string values (`5`, `true`, `[..]`) land here too.
    Unknown(Value),
}

/// Arguments of a `key` command.  Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct KeyArgs {
    value: String,
}

/// Reasons an inbound frame could not be turned into an [`Inbound`].
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame is not valid JSON.
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame is valid JSON but not an object.
    #[error("message must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// A known command is missing a required argument or has one of the
    /// wrong type.
    #[error("invalid arguments for `{cmd}`: {source}")]
    InvalidArguments {
        cmd: CommandKind,
        #[source]
        source: serde_json::Error,
    },
}

/// Decodes one raw text frame.
///
/// # Errors
///
/// Returns [`DecodeError`] when the frame is not a JSON object or when a
/// known command's arguments do not fit.  An absent or unrecognised `"cmd"`
/// of any JSON type is *not* an error; it yields [`Inbound::Unknown`].
///
/// # Example
///
/// ```rust
/// use agent_core::protocol::{decode_inbound, Command, Inbound};
///
/// let inbound = decode_inbound(r#"{"cmd":"key","value":"a"}"#).unwrap();
/// assert_eq!(inbound, Inbound::Command(Command::Key { value: "a".into() }));
/// ```
pub fn decode_inbound(raw: &str) -> Result<Inbound, DecodeError> {
    let value: Value = serde_json::from_str(raw)?;
    let mut object = match value {
        Value::Object(object) => object,
        other => return Err(DecodeError::NotAnObject(json_type_name(&other))),
    };

    let cmd = object.remove("cmd").unwrap_or(Value::Null);
    let Some(kind) = cmd.as_str().and_then(CommandKind::from_wire) else {
        return Ok(Inbound::Unknown(cmd));
    };

    let command = match kind {
        CommandKind::Key => {
            let args: KeyArgs = serde_json::from_value(Value::Object(object))
                .map_err(|source| DecodeError::InvalidArguments { cmd: kind, source })?;
            Command::Key { value: args.value }
        }
        CommandKind::Click => Command::Click,
        CommandKind::Screenshot => Command::Screenshot,
    };

    Ok(Inbound::Command(command))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Outbound ──────────────────────────────────────────────────────────────────

/// The acknowledgement sent back for every inbound frame.
///
/// Serialises to `{"ok":true,"cmd":...}` or `{"ok":false,"error":...}`.  On
/// success the `"cmd"` key is always present; it is `null` when an unknown
/// command had no name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "WireResult")]
pub enum CommandResult {
    /// The command was handled.  `cmd` echoes the inbound `"cmd"` value,
    /// whatever its JSON type.
    Handled { cmd: Value },
    /// Decoding or execution failed.
    Failed { error: String },
}

impl CommandResult {
    /// Success for a command from the routing table.
    pub fn success(kind: CommandKind) -> Self {
        Self::Handled {
            cmd: Value::from(kind.as_str()),
        }
    }

    /// Success echoing an arbitrary `"cmd"` value (`null` when absent).
    pub fn acknowledged(cmd: impl Into<Value>) -> Self {
        Self::Handled { cmd: cmd.into() }
    }

    /// Failure with a human-readable description.
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    /// Returns `true` for [`CommandResult::Handled`].
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Handled { .. })
    }
}

impl Serialize for CommandResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            Self::Handled { cmd } => {
                map.serialize_entry("ok", &true)?;
                map.serialize_entry("cmd", cmd)?;
            }
            Self::Failed { error } => {
                map.serialize_entry("ok", &false)?;
                map.serialize_entry("error", error)?;
            }
        }
        map.end()
    }
}

/// Flat shape of an acknowledgement, used only while deserialising.
#[derive(Deserialize)]
struct WireResult {
    ok: bool,
    #[serde(default)]
    cmd: Value,
    #[serde(default)]
    error: Option<String>,
}

impl TryFrom<WireResult> for CommandResult {
    type Error = String;

    fn try_from(wire: WireResult) -> Result<Self, Self::Error> {
        match (wire.ok, wire.error) {
            (true, None) => Ok(Self::Handled { cmd: wire.cmd }),
            (true, Some(_)) => Err("successful result must not carry `error`".to_owned()),
            (false, Some(error)) => Ok(Self::Failed { error }),
            (false, None) => Err("failed result must carry `error`".to_owned()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
