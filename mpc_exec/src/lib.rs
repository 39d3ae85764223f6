//! Library components of the MPC executable.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod mpc_ctrl;
