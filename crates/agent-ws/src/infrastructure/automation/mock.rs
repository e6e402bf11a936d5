//! Mock automation backend.
//!
//! [`MockAutomation`] replaces every OS interaction with in-memory recording,
//! so tests can assert exactly which capabilities were invoked and in what
//! order.  The call log grows with every command; the binary never uses it.
//!
//! # Usage in tests
//!
//! ```ignore
//! let automation = Arc::new(MockAutomation::new());
//! let dispatcher = CommandDispatcher::new(Arc::clone(&automation) as Arc<dyn Automation>);
//!
//! dispatcher.dispatch(&Command::Click);
//!
//! assert_eq!(automation.calls(), vec![AutomationCall::Click]);
//! ```

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use agent_core::dispatch::{Automation, AutomationError};
use tracing::info;

/// One recorded capability invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutomationCall {
    Key(String),
    Click,
    Screenshot,
}

/// Records every call without performing any OS action.
#[derive(Debug, Default)]
pub struct MockAutomation {
    /// Calls in the order they arrived, across all sessions.
    pub calls: Mutex<Vec<AutomationCall>>,
    /// When `true`, every call is recorded and then fails with
    /// `AutomationError::Platform`.
    pub should_fail: bool,
    /// Optional time each call blocks for before returning.
    pub delay: Option<Duration>,
}

impl MockAutomation {
    /// Creates a mock that succeeds immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock whose every call fails.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Makes every call block for `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns a snapshot of the recorded calls.
    pub fn calls(&self) -> Vec<AutomationCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: AutomationCall) -> Result<(), AutomationError> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        info!("mock automation: {call:?}");
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        if self.should_fail {
            return Err(AutomationError::Platform("mock failure".into()));
        }
        Ok(())
    }
}

impl Automation for MockAutomation {
    fn press_key(&self, key: &str) -> Result<(), AutomationError> {
        self.record(AutomationCall::Key(key.to_owned()))
    }

    fn click_primary(&self) -> Result<(), AutomationError> {
        self.record(AutomationCall::Click)
    }

    fn capture_screen(&self) -> Result<(), AutomationError> {
        self.record(AutomationCall::Screenshot)
    }
}
