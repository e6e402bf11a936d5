//! Automation backends implementing [`agent_core::dispatch::Automation`].
//!
//! - [`tools::ToolAutomation`] drives the desktop through `xdotool` and
//!   `scrot`.
//! - [`logging::LoggingAutomation`] only logs.  Selected by `--dry-run`.
//! - [`mock::MockAutomation`] records calls in memory for tests.

pub mod logging;
pub mod mock;
pub mod tools;

pub use logging::LoggingAutomation;
pub use mock::{AutomationCall, MockAutomation};
pub use tools::ToolAutomation;
