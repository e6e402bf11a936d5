//! Desktop automation through external command-line tools.
//!
//! | Capability       | Invocation                     |
//! |------------------|--------------------------------|
//! | press key        | `xdotool key <name>`           |
//! | primary click    | `xdotool click 1`              |
//! | capture screen   | `scrot <screenshot_path>`      |
//!
//! Both tools talk to the X server named by `DISPLAY`.  Key names use the
//! X11 keysym vocabulary (`a`, `Return`, `ctrl+c`, ...) and are passed to
//! `xdotool` verbatim.
//!
//! Each call spawns a short-lived process and waits for it to exit, so these
//! methods block.  The session loop runs them on Tokio's blocking pool.

use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, Stdio};

use agent_core::dispatch::{Automation, AutomationError};
use tracing::debug;

use crate::domain::ToolConfig;

/// X11 button number of the primary (left) mouse button.
const PRIMARY_BUTTON: &str = "1";

/// [`Automation`] backed by `xdotool` and `scrot`.
#[derive(Debug, Clone)]
pub struct ToolAutomation {
    tools: ToolConfig,
}

impl ToolAutomation {
    /// Creates a backend using the given tool paths.  No tool is launched
    /// until the first command arrives.
    pub fn new(tools: ToolConfig) -> Self {
        Self { tools }
    }

    /// Runs `program args...` to completion.
    fn run<I, A>(program: &Path, args: I) -> Result<(), AutomationError>
    where
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
    {
        let tool = program.display().to_string();
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| AutomationError::Unavailable {
                tool: tool.clone(),
                source,
            })?;

        if output.status.success() {
            debug!("`{tool}` exited successfully");
            return Ok(());
        }

        Err(AutomationError::Failed {
            tool,
            status: output.status.code(),
            detail: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        })
    }
}

impl Automation for ToolAutomation {
    fn press_key(&self, key: &str) -> Result<(), AutomationError> {
        Self::run(&self.tools.xdotool, [OsStr::new("key"), OsStr::new(key)])
    }

    fn click_primary(&self) -> Result<(), AutomationError> {
        Self::run(&self.tools.xdotool, ["click", PRIMARY_BUTTON])
    }

    fn capture_screen(&self) -> Result<(), AutomationError> {
        Self::run(&self.tools.scrot, [self.tools.screenshot_path.as_os_str()])
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
