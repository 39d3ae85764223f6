//! Main MPC executable entry point.
//!
//! # Architecture
//!
//! The exec drives the MPC control pipeline at a fixed cadence. Each cycle:
//!
//!     - Acquire a telemetry sample (from the built-in plant when running
//!       standalone; a transport layer supplies it in deployment)
//!     - MpcCtrl processing: predict, transform, fit, optimise, map
//!     - Emit the command back to the vehicle
//!     - Sleep out the remainder of the cycle period
//!
//! Recoverable per-cycle failures (bad telemetry, degenerate fits, a solve
//! that ran out of budget) are logged and the previous command is held;
//! they never stop the loop. A summary of the run is saved into the
//! session directory on exit.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use mpc_lib::mpc_ctrl::MpcCtrl;

mod plant;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::{Duration, Instant};

// Internal
use plant::Plant;
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Exec-level parameters: loop scheduling and the demo rig's knobs, kept
/// separate from the control model's parameters.
#[derive(Debug, Deserialize)]
struct ExecParams {
    /// Target period of one control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Delay before an emitted command starts acting on the plant. Emulates
    /// the transport/actuation latency of a real deployment; independent of
    /// the predictor's modelled latency, though the two should agree.
    ///
    /// Units: seconds
    pub cmd_delay_s: f64,

    /// Number of cycles to run before stopping.
    pub num_cycles: u64,
}

/// Summary of a run, saved into the session directory at exit.
#[derive(Debug, Default, Serialize)]
struct RunSummary {
    pub num_cycles: u64,
    pub failed_cycles: u64,
    pub cycle_overruns: u64,
    pub mean_abs_cte_m: f64,
    pub max_abs_cte_m: f64,
    pub final_speed_ms: f64,
    pub final_track_error_m: f64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("mpc_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("MPC Controller Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: ExecParams =
        util::params::load("mpc_exec.toml").wrap_err("Could not load exec params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut mpc_ctrl = MpcCtrl::default();
    mpc_ctrl
        .init("mpc_ctrl.toml")
        .wrap_err("Failed to initialise MpcCtrl")?;
    info!("MpcCtrl init complete");

    let mut plant = Plant::new(exec_params.cmd_delay_s);
    info!("Plant init complete\n");

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    let mut summary = RunSummary::default();
    let mut abs_cte_sum_m = 0f64;

    for cycle in 0..exec_params.num_cycles {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // ---- DATA INPUT ----

        let telem = plant.telemetry();

        // ---- CONTROL ALGORITHM PROCESSING ----

        let cmd = match mpc_ctrl.proc(&telem) {
            Ok((cmd, report)) => {
                abs_cte_sum_m += report.cte_m.abs();
                summary.max_abs_cte_m = summary.max_abs_cte_m.max(report.cte_m.abs());

                debug!(
                    "Cycle {}: cte {:.3} m, steer {:.3}, throttle {:.3}, {} solver iters",
                    cycle, report.cte_m, cmd.steer_norm, cmd.throttle_norm, report.solve_iters
                );
                if cycle % 20 == 0 {
                    info!(
                        "Cycle {}: speed {:.2} m/s, cte {:.3} m",
                        cycle,
                        report.pred_speed_ms,
                        report.cte_m
                    );
                }

                Some(cmd)
            }
            Err(e) => {
                // Per-cycle failures hold the previous command; the loop
                // itself carries on
                warn!(
                    "Cycle {}: MpcCtrl processing failed, holding previous command: {}",
                    cycle, e
                );
                summary.failed_cycles += 1;

                None
            }
        };

        // ---- COMMAND OUTPUT ----

        plant.apply(cmd.as_ref(), exec_params.cycle_period_s);

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        match Duration::from_secs_f64(exec_params.cycle_period_s).checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - exec_params.cycle_period_s
                );
                summary.cycle_overruns += 1;
            }
        }

        summary.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    summary.mean_abs_cte_m = match summary.num_cycles - summary.failed_cycles {
        0 => 0.0,
        n => abs_cte_sum_m / n as f64,
    };
    summary.final_speed_ms = plant.speed_ms();
    summary.final_track_error_m = plant.track_error_m();

    info!(
        "Run complete: {} cycles, {} failed, mean |cte| {:.3} m",
        summary.num_cycles, summary.failed_cycles, summary.mean_abs_cte_m
    );

    session
        .save_json("run_summary.json", &summary)
        .wrap_err("Failed to save the run summary")?;

    info!("End of execution");

    Ok(())
}
