//! The desktop automation capability boundary.
//!
//! The dispatcher never touches the OS directly.  It calls an [`Automation`]
//! trait object, and the binary crate decides which implementation to plug
//! in (a command-line tool driver in production, a recording mock in tests).

use thiserror::Error;

/// Error type for automation backend operations.
#[derive(Debug, Error)]
pub enum AutomationError {
    /// The external tool could not be launched (not installed, not on `PATH`,
    /// not executable).
    #[error("could not run `{tool}`: {source}")]
    Unavailable {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The external tool ran and reported failure.
    #[error("`{tool}` failed ({}){}", exit_label(.status), detail_suffix(.detail))]
    Failed {
        tool: String,
        /// Exit code, or `None` if the tool was killed by a signal.
        status: Option<i32>,
        /// Trimmed standard error output, possibly empty.
        detail: String,
    },

    /// Any other backend failure.
    #[error("platform error: {0}")]
    Platform(String),
}

fn exit_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_owned(),
    }
}

fn detail_suffix(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(": {detail}")
    }
}

/// Platform-agnostic desktop automation.
///
/// Every method is synchronous and may block for as long as the underlying
/// action takes.  Callers that run on an async runtime are expected to move
/// the call onto a blocking thread.
pub trait Automation: Send + Sync {
    /// Simulates one press-and-release of the named key.
    fn press_key(&self, key: &str) -> Result<(), AutomationError>;

    /// Simulates a primary mouse button click at the current cursor position.
    fn click_primary(&self) -> Result<(), AutomationError>;

    /// Captures the screen to the backend's configured destination.
    fn capture_screen(&self) -> Result<(), AutomationError>;
}
