//! # Simulator interface crate.
//!
//! Provides the payload types exchanged with the driving simulator. The
//! transport itself (connection lifecycle, framing, text serialisation) is
//! handled by the network layer; these types are the decoded contract that
//! the control software consumes and produces.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod cmd;
pub mod telem;

// ------------------------------------------------------------------------------------------------
// REEXPORTS
// ------------------------------------------------------------------------------------------------

pub use cmd::CtrlCmd;
pub use telem::{Telemetry, TelemetryError};
