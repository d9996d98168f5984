//! # Quadrotor executable
//!
//! Runs the estimation and control core without the full quadrotor
//! simulator, using the kinematic simulation in its place.
//!
//! - `course` flies the marker course and reports how it went.
//! - `axis` runs the single axis PD controller against a double integrator.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use log::info;
use structopt::StructOpt;

use quad_lib::{
    kin_sim::{fly_course, KinSim, SimParams},
    quad_ctrl::QuadCtrl,
    telem::{ArchiveSink, LogSink, TelemSink},
    traj_ctrl::{AxisCtrlParams, AxisPdController},
};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Log target of the telemetry sinks, three trace lines per odometry tick.
const TELEM_LOG_TARGET: &str = "quad_lib::telem";

// ------------------------------------------------------------------------------------------------
// CLI
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "quad_exec", about = "Quadrotor marker course estimation and control")]
struct Opt {
    /// Log at trace level, including every odometry tick
    #[structopt(long)]
    trace: bool,

    /// Also log every telemetry sample when tracing
    #[structopt(long)]
    trace_telem: bool,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Fly the marker course on the kinematic simulation
    Course {
        /// Maximum simulated time to fly for
        #[structopt(long, default_value = "120")]
        duration_s: f64,

        /// Override the odometry scale factor from the simulation parameters
        #[structopt(long)]
        odom_scale: Option<f64>,

        /// Archive telemetry as CSV in the session directory
        #[structopt(long)]
        archive: bool,
    },

    /// Drive a single axis to a target position with the axis PD controller
    Axis {
        /// Demanded position
        #[structopt(long, default_value = "1.0")]
        target_m: f64,

        /// Simulated time to run for
        #[structopt(long, default_value = "5.0")]
        duration_s: f64,

        /// Controller period
        #[structopt(long, default_value = "0.01")]
        dt: f64,
    },
}

#[derive(serde::Serialize)]
struct AxisRecord {
    time_s: f64,
    pos_m: f64,
    vel_ms: f64,
    vel_est_ms: f64,
    cmd: f64,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("quad_exec", "sessions").wrap_err("Failed to create the session")?;

    let level = if opt.trace {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    let target_levels: &[(&'static str, LevelFilter)] = if opt.trace_telem {
        &[]
    } else {
        &[(TELEM_LOG_TARGET, LevelFilter::Debug)]
    };
    logger_init(level, target_levels, &session).wrap_err("Failed to initialise logging")?;

    info!("Quadrotor Exec\n");
    info!("Session directory: {:?}\n", session.session_root);

    match opt.cmd {
        Command::Course {
            duration_s,
            odom_scale,
            archive,
        } => run_course(&session, duration_s, odom_scale, archive),
        Command::Axis {
            target_m,
            duration_s,
            dt,
        } => run_axis(&session, target_m, duration_s, dt),
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn run_course(
    session: &Session,
    duration_s: f64,
    odom_scale: Option<f64>,
    archive: bool,
) -> Result<()> {
    // ---- LOAD PARAMETERS ----

    let mut sim_params: SimParams =
        util::params::load("sim.toml").wrap_err("Could not load sim params")?;
    if let Some(s) = odom_scale {
        sim_params.odom_scale = s;
    }

    // ---- MODULE INIT ----

    let telem: Box<dyn TelemSink> = if archive {
        Box::new(ArchiveSink::new(session))
    } else {
        Box::new(LogSink)
    };

    let mut ctrl = QuadCtrl::init("loc.toml", "traj_ctrl.toml", "markers.toml", telem)
        .wrap_err("Failed to initialise QuadCtrl")?;
    info!("QuadCtrl init complete");

    let mut sim = KinSim::new(sim_params);

    // ---- FLY ----

    info!("Flying the course for up to {:.1} s\n", duration_s);

    let summary = fly_course(&mut ctrl, &mut sim, duration_s).wrap_err("Error while flying the course")?;

    info!("Flight summary:");
    info!("    Ticks: {}, marker sightings: {}", summary.num_ticks, summary.num_sightings);
    info!("    Max position error: {:.4} m", summary.max_pos_error_m);
    info!("    Final pose: {:?}", summary.final_pose);
    info!("    Final estimate: {:?}", summary.final_estimate);

    session.save_json("summary.json", &summary);

    match summary.finish_time_s {
        Some(t) => {
            info!("Course finished in {:.2} s", t);
            Ok(())
        }
        None => Err(eyre!(
            "Course not finished after {:.1} s, stuck on marker {}",
            duration_s,
            ctrl.report().target_index
        )),
    }
}

fn run_axis(session: &Session, target_m: f64, duration_s: f64, dt: f64) -> Result<()> {
    let params: AxisCtrlParams =
        util::params::load("axis_ctrl.toml").wrap_err("Could not load axis controller params")?;

    info!(
        "Axis controller: k_p = {}, k_d = {}, feedback = {:?}",
        params.k_p, params.k_d, params.vel_feedback
    );

    let mut ctrl = AxisPdController::from_params(&params);
    let mut arch =
        Archiver::from_path(session, "axis.csv").wrap_err("Could not create axis archive")?;

    // The command is an acceleration on a double integrator
    let mut time_s = 0.0;
    let mut pos_m = 0.0;
    let mut vel_ms = 0.0;

    while time_s < duration_s {
        let cmd = ctrl.get(dt, pos_m, target_m);

        arch.serialise(AxisRecord {
            time_s,
            pos_m,
            vel_ms,
            vel_est_ms: ctrl.vel_est(),
            cmd,
        })
        .wrap_err("Could not archive axis data")?;

        vel_ms += cmd * dt;
        pos_m += vel_ms * dt;
        time_s += dt;
    }

    info!(
        "Final position {:.4} m (error {:.4} m), velocity {:.4} m/s",
        pos_m,
        target_m - pos_m,
        vel_ms
    );

    Ok(())
}
