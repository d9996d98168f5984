//! # Kinematic simulation
//!
//! A planar point-mass stand-in for the quadrotor simulator, used to drive
//! [`QuadCtrl`] in the test executable, integration tests and benchmarks.
//!
//! The vehicle follows the commanded body velocity and yaw rate through a
//! first order lag. Odometry reports the true body velocity scaled by a
//! configurable error, and the nearest marker within view range is sighted at
//! a fixed rate with a perfect relative pose.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info};
use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

use crate::{
    loc::{pose::rotation, Pose2},
    markers::Marker,
    quad_ctrl::{CtrlCmd, QuadCtrl, QuadCtrlError},
};
use util::maths::norm_yaw;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Simulation parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Odometry tick period
    pub odom_period_s: f64,

    /// Minimum time between two marker sightings
    pub marker_period_s: f64,

    /// Markers further away than this can't be seen
    pub marker_view_range_m: f64,

    /// Time constant of the velocity response to a command
    pub vel_time_const_s: f64,

    /// Factor applied to the true velocity to produce the odometry
    pub odom_scale: f64,

    /// True initial pose, `[x_m, y_m, yaw_rad]`
    pub init_pose: [f64; 3],
}

/// A marker seen by the vehicle.
#[derive(Debug, Copy, Clone)]
pub struct MarkerSighting {
    pub marker_pos_m: Vector2<f64>,
    pub marker_yaw_rad: f64,
    pub rel_pos_m_b: Vector2<f64>,
    pub rel_yaw_rad: f64,
}

/// The simulated vehicle.
#[derive(Debug, Clone)]
pub struct KinSim {
    params: SimParams,

    time_s: f64,

    /// True pose, `[x_m, y_m, yaw_rad]`
    pose: Vector3<f64>,

    vel_ms_b: Vector2<f64>,
    yaw_rate_rads: f64,

    last_sighting_s: Option<f64>,
}

/// Outcome of flying the course.
#[derive(Debug, Clone, Serialize)]
pub struct FlightSummary {
    /// Simulated time at which the last marker was reached, if it was
    pub finish_time_s: Option<f64>,

    pub num_ticks: u64,
    pub num_sightings: u64,

    /// Largest distance between the estimated and true positions
    pub max_pos_error_m: f64,

    pub final_pose: [f64; 3],
    pub final_estimate: [f64; 3],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            odom_period_s: 0.005,
            marker_period_s: 1.0 / 30.0,
            marker_view_range_m: 2.0,
            vel_time_const_s: 0.05,
            odom_scale: 1.0,
            init_pose: [0.0; 3],
        }
    }
}

impl KinSim {
    pub fn new(params: SimParams) -> Self {
        Self {
            pose: Vector3::from(params.init_pose),
            params,
            time_s: 0.0,
            vel_ms_b: Vector2::zeros(),
            yaw_rate_rads: 0.0,
            last_sighting_s: None,
        }
    }

    /// Advance the simulation by one odometry period under the given command.
    pub fn step(&mut self, cmd: &CtrlCmd) {
        let dt = self.params.odom_period_s;

        let alpha = if self.params.vel_time_const_s > 0.0 {
            (dt / self.params.vel_time_const_s).min(1.0)
        } else {
            1.0
        };

        self.vel_ms_b += (cmd.vel_dem_ms_b - self.vel_ms_b) * alpha;
        self.yaw_rate_rads += (cmd.yaw_rate_dem_rads - self.yaw_rate_rads) * alpha;

        let vel_ms_w = rotation(self.pose[2]) * self.vel_ms_b;
        self.pose[0] += vel_ms_w[0] * dt;
        self.pose[1] += vel_ms_w[1] * dt;
        self.pose[2] = norm_yaw(self.pose[2] + self.yaw_rate_rads * dt);

        self.time_s += dt;
    }

    /// Current odometry, body velocity and yaw rate.
    pub fn odometry(&self) -> (Vector2<f64>, f64) {
        (self.vel_ms_b * self.params.odom_scale, self.yaw_rate_rads)
    }

    /// Sight the nearest marker in view, if one is and enough time has passed
    /// since the last sighting.
    pub fn sight_marker(&mut self, markers: &[Marker]) -> Option<MarkerSighting> {
        if let Some(last) = self.last_sighting_s {
            if self.time_s - last < self.params.marker_period_s {
                return None;
            }
        }

        let position_m = self.position_m();
        let marker = markers
            .iter()
            .map(|m| (m, (m.position_m - position_m).norm()))
            .filter(|(_, d)| *d <= self.params.marker_view_range_m)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(m, _)| *m)?;

        let rel = self
            .true_pose()
            .inverse()
            .compose(&Pose2::from_yaw(marker.yaw_rad, marker.position_m));

        self.last_sighting_s = Some(self.time_s);

        Some(MarkerSighting {
            marker_pos_m: marker.position_m,
            marker_yaw_rad: marker.yaw_rad,
            rel_pos_m_b: rel.translation,
            rel_yaw_rad: rel.yaw(),
        })
    }

    pub fn time_s(&self) -> f64 {
        self.time_s
    }

    pub fn position_m(&self) -> Vector2<f64> {
        Vector2::new(self.pose[0], self.pose[1])
    }

    pub fn pose(&self) -> &Vector3<f64> {
        &self.pose
    }

    pub fn true_pose(&self) -> Pose2 {
        Pose2::from_yaw(self.pose[2], self.position_m())
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Fly the controller through its marker course on the simulation.
///
/// Stops once the course is finished or `duration_s` of simulated time has
/// passed.
pub fn fly_course(
    ctrl: &mut QuadCtrl,
    sim: &mut KinSim,
    duration_s: f64,
) -> Result<FlightSummary, QuadCtrlError> {
    let dt = sim.params.odom_period_s;
    let markers = ctrl.markers().markers().to_vec();

    let mut summary = FlightSummary {
        finish_time_s: None,
        num_ticks: 0,
        num_sightings: 0,
        max_pos_error_m: 0.0,
        final_pose: [0.0; 3],
        final_estimate: [0.0; 3],
    };

    let mut cmd = CtrlCmd::default();
    let mut prev_target = 0;

    while sim.time_s() < duration_s {
        sim.step(&cmd);

        let (vel_ms_b, yaw_rate_rads) = sim.odometry();
        cmd = ctrl.on_odometry(sim.time_s(), dt, &vel_ms_b, yaw_rate_rads);
        summary.num_ticks += 1;

        if let Some(s) = sim.sight_marker(&markers) {
            ctrl.on_marker_observation(&s.marker_pos_m, s.marker_yaw_rad, &s.rel_pos_m_b, s.rel_yaw_rad)?;
            summary.num_sightings += 1;
        }

        let pos_error_m = (ctrl.loc().position_m() - sim.position_m()).norm();
        summary.max_pos_error_m = summary.max_pos_error_m.max(pos_error_m);

        let report = ctrl.report();
        if report.target_index != prev_target {
            debug!("t = {:.2} s: now targeting marker {}", sim.time_s(), report.target_index);
            prev_target = report.target_index;
        }

        if report.course_finished {
            info!("Course finished after {:.2} s", sim.time_s());
            summary.finish_time_s = Some(sim.time_s());
            break;
        }
    }

    summary.final_pose = [sim.pose()[0], sim.pose()[1], sim.pose()[2]];
    let est = ctrl.loc().state();
    summary.final_estimate = [est[0], est[1], est[2]];

    Ok(summary)
}
