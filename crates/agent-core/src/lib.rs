//! Shared command protocol and dispatch logic for the desktop automation agent.
//!
//! This crate has no I/O and no async runtime.  It contains:
//!
//! - [`protocol`]: the JSON message types exchanged with the controller and
//!   the decoder that turns a raw text frame into an [`protocol::Inbound`].
//! - [`dispatch`]: the [`dispatch::Automation`] capability boundary and the
//!   [`dispatch::CommandDispatcher`] that routes each command to it.
//!
//! # Message flow
//!
//! ```text
//! controller ──text──▶ decode_inbound ──▶ CommandDispatcher ──▶ Automation
//!            ◀─text─── CommandResult  ◀───────────┘
//! ```

/// Wire protocol: inbound commands and outbound acknowledgements.
pub mod protocol;

/// Command routing and the external capability boundary.
pub mod dispatch;
