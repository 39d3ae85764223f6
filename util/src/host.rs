//! Host environment utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::path::PathBuf;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Environment variable pointing at the software root directory.
///
/// Parameter files are loaded from `<root>/params` and session directories
/// are created under `<root>/sessions`.
pub const SW_ROOT_ENV_VAR: &str = "MPC_SW_ROOT";

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the software root directory.
///
/// If the root environment variable is not set the current working directory
/// is used instead, which keeps `cargo run` from the repository root working
/// without any setup.
pub fn get_sw_root() -> PathBuf {
    match std::env::var(SW_ROOT_ENV_VAR) {
        Ok(p) => PathBuf::from(p),
        Err(_) => PathBuf::from("."),
    }
}
