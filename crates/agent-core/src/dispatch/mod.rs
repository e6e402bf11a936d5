//! Command routing.
//!
//! [`CommandDispatcher`] is a stateless function of one decoded command: it
//! invokes exactly one [`Automation`] capability and returns exactly one
//! [`CommandResult`](crate::protocol::CommandResult).  Failures never escape
//! as errors; they become `{"ok":false}` results.

pub mod automation;
pub mod dispatcher;

pub use automation::{Automation, AutomationError};
pub use dispatcher::{CommandDispatcher, UnknownCommandPolicy};
