//! Dry-run automation backend.
//!
//! [`LoggingAutomation`] logs each capability call at `info` and reports
//! success.  It holds no state, so an agent left running with `--dry-run`
//! uses the same memory after a million commands as after one.

use agent_core::dispatch::{Automation, AutomationError};
use tracing::info;

/// Acknowledges every call without touching the desktop.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingAutomation;

impl Automation for LoggingAutomation {
    fn press_key(&self, key: &str) -> Result<(), AutomationError> {
        info!("dry run: key '{key}'");
        Ok(())
    }

    fn click_primary(&self) -> Result<(), AutomationError> {
        info!("dry run: click");
        Ok(())
    }

    fn capture_screen(&self) -> Result<(), AutomationError> {
        info!("dry run: screenshot");
        Ok(())
    }
}
