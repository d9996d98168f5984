//! # Quadrotor controller
//!
//! Ties localisation and trajectory control together behind the two entry
//! points called by the simulation:
//!
//! - [`QuadCtrl::on_odometry`] on every odometry tick (~200 Hz), which
//!   predicts the pose, updates the target marker and returns the velocity
//!   commands.
//! - [`QuadCtrl::on_marker_observation`] whenever a marker is in view (up to
//!   ~30 Hz), which corrects the pose estimate.
//!
//! Both callbacks take `&mut self`, callers must serialise them.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, trace};
use nalgebra::Vector2;
use serde::Serialize;

use crate::{
    loc::{pose::rotation, EkfLoc, LocError, LocParams},
    markers::{MarkerError, MarkerParams, MarkerRegistry},
    telem::TelemSink,
    traj_ctrl::{self, MarkerNav, PdController},
};
use util::{maths::norm_yaw, params};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Telemetry name of the pose estimate trajectory and covariance.
pub const TELEM_ESTIMATE: &str = "kalman";

/// Telemetry name of the x velocity command.
pub const TELEM_X_CMD: &str = "x command";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Velocity commands for the vehicle.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize)]
pub struct CtrlCmd {
    /// Linear velocity demand in the body frame
    pub vel_dem_ms_b: Vector2<f64>,

    /// Yaw rate demand
    pub yaw_rate_dem_rads: f64,
}

/// Status of the controller after the latest odometry tick.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    /// Index of the targeted marker
    pub target_index: usize,

    /// Distance from the estimated position to the targeted marker
    pub target_dist_m: f64,

    /// True once the final marker has been reached
    pub course_finished: bool,

    /// Number of marker corrections applied so far
    pub num_corrections: u64,
}

/// The quadrotor estimation and control core.
pub struct QuadCtrl {
    loc: EkfLoc,
    nav: MarkerNav,
    markers: MarkerRegistry,

    xy_ctrl: PdController,
    yaw_ctrl: PdController,
    yaw_dem_rad: f64,

    report: StatusReport,

    /// Simulation time of the latest odometry tick
    last_time_s: f64,

    telem: Box<dyn TelemSink>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum QuadCtrlError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(params::LoadError),

    #[error("Invalid marker course: {0}")]
    MarkerError(MarkerError),

    #[error("Localisation error: {0}")]
    LocError(LocError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl QuadCtrl {
    /// Create the controller from its parameters.
    pub fn new(
        loc_params: LocParams,
        traj_params: &traj_ctrl::Params,
        markers: MarkerRegistry,
        telem: Box<dyn TelemSink>,
    ) -> Self {
        info!(
            "QuadCtrl init: {} markers, reach distance {} m, xy gains ({}, {}), yaw gains ({}, {})",
            markers.len(),
            traj_params.marker_reach_dist_m,
            traj_params.xy_k_p,
            traj_params.xy_k_d,
            traj_params.yaw_k_p,
            traj_params.yaw_k_d
        );

        Self {
            loc: EkfLoc::new(loc_params),
            nav: MarkerNav::new(traj_params),
            markers,
            xy_ctrl: PdController::new(traj_params.xy_k_p, traj_params.xy_k_d),
            yaw_ctrl: PdController::new(traj_params.yaw_k_p, traj_params.yaw_k_d),
            yaw_dem_rad: traj_params.yaw_dem_rad,
            report: StatusReport::default(),
            last_time_s: 0.0,
            telem,
        }
    }

    /// Create the controller from the parameter files in the params
    /// directory.
    pub fn init(
        loc_params_path: &str,
        traj_params_path: &str,
        markers_params_path: &str,
        telem: Box<dyn TelemSink>,
    ) -> Result<Self, QuadCtrlError> {
        let loc_params: LocParams =
            params::load(loc_params_path).map_err(QuadCtrlError::ParamLoadError)?;
        let traj_params: traj_ctrl::Params =
            params::load(traj_params_path).map_err(QuadCtrlError::ParamLoadError)?;
        let marker_params: MarkerParams =
            params::load(markers_params_path).map_err(QuadCtrlError::ParamLoadError)?;

        let markers =
            MarkerRegistry::from_params(&marker_params).map_err(QuadCtrlError::MarkerError)?;

        Ok(Self::new(loc_params, &traj_params, markers, telem))
    }

    /// Odometry callback.
    ///
    /// `t` is the simulation time, `dt` the time since the previous call,
    /// `lin_vel_ms_b` the body frame linear velocity and `yaw_rate_rads` the
    /// yaw rate.
    pub fn on_odometry(
        &mut self,
        t: f64,
        dt: f64,
        lin_vel_ms_b: &Vector2<f64>,
        yaw_rate_rads: f64,
    ) -> CtrlCmd {
        self.loc.predict(dt, lin_vel_ms_b, yaw_rate_rads);

        let position_m = self.loc.position_m();
        let yaw_rad = self.loc.yaw_rad();
        let markers = self.markers.markers();

        let target_index = self.nav.update_target(markers, &position_m);
        let target_m = markers[target_index].position_m;

        // Control happens in the world frame, the odometry velocity is rotated
        // in and the command rotated back out.
        let body_to_world = rotation(yaw_rad);
        let vel_ms_w = body_to_world * lin_vel_ms_b;

        let vel_dem_ms_w = self.nav.desired_velocity(markers, &position_m, &vel_ms_w);
        let cmd_ms_w = self.xy_ctrl.get(position_m, vel_ms_w, target_m, vel_dem_ms_w);

        // The yaw controller only acts on the wrapped error, demanding zero
        // yaw rate.
        let yaw_rate_dem_rads = self.yaw_ctrl.get(
            0.0,
            yaw_rate_rads,
            norm_yaw(self.yaw_dem_rad - yaw_rad),
            0.0,
        );

        let cmd = CtrlCmd {
            vel_dem_ms_b: body_to_world.transpose() * cmd_ms_w,
            yaw_rate_dem_rads,
        };

        self.report = StatusReport {
            target_index,
            target_dist_m: (target_m - position_m).norm(),
            course_finished: self.nav.is_finished(markers, &position_m),
            num_corrections: self.loc.num_corrections(),
        };

        trace!("QuadCtrl t = {:.3}: {:?}, {:?}", t, cmd, self.report);

        self.last_time_s = t;

        self.telem.scalar(TELEM_X_CMD, t, cmd.vel_dem_ms_b[0]);
        self.visualise_state(t);

        cmd
    }

    /// Marker observation callback.
    ///
    /// `marker_pos_m` and `marker_yaw_rad` give the pose of the sighted
    /// marker in the world, `rel_pos_m_b` and `rel_yaw_rad` its pose relative
    /// to the vehicle.
    pub fn on_marker_observation(
        &mut self,
        marker_pos_m: &Vector2<f64>,
        marker_yaw_rad: f64,
        rel_pos_m_b: &Vector2<f64>,
        rel_yaw_rad: f64,
    ) -> Result<(), QuadCtrlError> {
        self.loc
            .correct(marker_pos_m, marker_yaw_rad, rel_pos_m_b, rel_yaw_rad)
            .map_err(QuadCtrlError::LocError)?;

        self.report.num_corrections = self.loc.num_corrections();

        // Marker sightings carry no timestamp, use the time of the last tick
        self.visualise_state(self.last_time_s);

        Ok(())
    }

    /// The localisation filter.
    pub fn loc(&self) -> &EkfLoc {
        &self.loc
    }

    /// The marker course being flown.
    pub fn markers(&self) -> &MarkerRegistry {
        &self.markers
    }

    /// Status as of the last odometry tick.
    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    fn visualise_state(&mut self, t: f64) {
        self.telem
            .trajectory(TELEM_ESTIMATE, t, &self.loc.position_m());
        self.telem.covariance(TELEM_ESTIMATE, t, &self.loc.cov_xy());
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{loc::predict_measurement, telem::NullSink};
    use approx::assert_relative_eq;
    use nalgebra::Matrix2;
    use std::{cell::RefCell, rc::Rc};

    /// Sink recording the names of everything it's given
    #[derive(Default, Clone)]
    struct RecordingSink {
        names: Rc<RefCell<Vec<String>>>,
    }

    impl TelemSink for RecordingSink {
        fn scalar(&mut self, name: &str, _: f64, _: f64) {
            self.names.borrow_mut().push(format!("scalar:{}", name));
        }

        fn trajectory(&mut self, name: &str, _: f64, _: &Vector2<f64>) {
            self.names.borrow_mut().push(format!("traj:{}", name));
        }

        fn covariance(&mut self, name: &str, _: f64, _: &Matrix2<f64>) {
            self.names.borrow_mut().push(format!("cov:{}", name));
        }
    }

    fn two_marker_ctrl(telem: Box<dyn TelemSink>) -> QuadCtrl {
        QuadCtrl::new(
            LocParams::default(),
            &traj_ctrl::Params::default(),
            MarkerRegistry::from_positions(&[[0.0, 0.0], [3.8, 0.0]]).unwrap(),
            telem,
        )
    }

    #[test]
    fn test_first_tick() {
        let mut ctrl = two_marker_ctrl(Box::new(NullSink));

        let cmd = ctrl.on_odometry(0.0, 0.005, &Vector2::zeros(), 0.0);

        // Starting on the first marker moves the target straight on to the
        // second. That is the last marker, so no velocity is demanded.
        assert_eq!(ctrl.report().target_index, 1);
        assert_relative_eq!(
            cmd.vel_dem_ms_b,
            Vector2::new(1.85 * 3.8, 0.0),
            epsilon = 1e-12
        );
        assert_eq!(cmd.yaw_rate_dem_rads, 0.0);
        assert!(!ctrl.report().course_finished);
    }

    #[test]
    fn test_first_tick_cornering() {
        let mut ctrl = QuadCtrl::new(
            LocParams::default(),
            &traj_ctrl::Params::default(),
            MarkerRegistry::from_positions(&[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0]]).unwrap(),
            Box::new(NullSink),
        );

        let cmd = ctrl.on_odometry(0.0, 0.0, &Vector2::zeros(), 0.0);

        // Within the blend distance of marker 1, so the desired velocity also
        // points on towards marker 2
        assert_eq!(ctrl.report().target_index, 1);
        assert_relative_eq!(
            cmd.vel_dem_ms_b,
            Vector2::new(1.85 * 2.0 + 0.12 * 2.0, 0.12 * 2.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_yaw_rate_damped() {
        let mut ctrl = two_marker_ctrl(Box::new(NullSink));

        let cmd = ctrl.on_odometry(0.0, 0.0, &Vector2::zeros(), 1.0);

        assert_relative_eq!(cmd.yaw_rate_dem_rads, -0.01);
    }

    #[test]
    fn test_command_in_body_frame() {
        let mut ctrl = QuadCtrl::new(
            LocParams {
                init_state: [0.0, 0.0, std::f64::consts::FRAC_PI_2],
                ..Default::default()
            },
            &traj_ctrl::Params::default(),
            MarkerRegistry::from_positions(&[[0.0, 0.0], [3.8, 0.0]]).unwrap(),
            Box::new(NullSink),
        );

        let cmd = ctrl.on_odometry(0.0, 0.0, &Vector2::zeros(), 0.0);

        // Facing +y, so world +x is body -y
        assert_relative_eq!(
            cmd.vel_dem_ms_b,
            Vector2::new(0.0, -(1.85 * 3.8)),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_marker_observation() {
        let mut ctrl = two_marker_ctrl(Box::new(NullSink));
        ctrl.on_odometry(0.0, 0.005, &Vector2::new(1.0, 0.0), 0.0);

        let marker = Vector2::new(3.8, 0.0);
        let z = predict_measurement(ctrl.loc().state(), &marker, 0.0);
        let state_before = *ctrl.loc().state();

        ctrl.on_marker_observation(&marker, 0.0, &Vector2::new(z[0], z[1]), z[2])
            .unwrap();

        assert_relative_eq!(*ctrl.loc().state(), state_before, epsilon = 1e-15);
        assert_eq!(ctrl.report().num_corrections, 1);
    }

    #[test]
    fn test_singular_correction_propagates() {
        let mut ctrl = QuadCtrl::new(
            LocParams {
                meas_pos_noise_std_m: 0.0,
                meas_yaw_noise_std_rad: 0.0,
                init_cov: 0.0,
                ..Default::default()
            },
            &traj_ctrl::Params::default(),
            MarkerRegistry::default_course(),
            Box::new(NullSink),
        );

        let res = ctrl.on_marker_observation(&Vector2::new(1.0, 0.0), 0.0, &Vector2::new(1.0, 0.0), 0.0);
        assert!(matches!(res, Err(QuadCtrlError::LocError(_))));
    }

    #[test]
    fn test_telemetry_emitted() {
        let sink = RecordingSink::default();
        let names = sink.names.clone();
        let mut ctrl = two_marker_ctrl(Box::new(sink));

        ctrl.on_odometry(0.0, 0.005, &Vector2::zeros(), 0.0);
        ctrl.on_marker_observation(&Vector2::new(0.0, 0.0), 0.0, &Vector2::zeros(), 0.0)
            .unwrap();

        assert_eq!(
            *names.borrow(),
            vec![
                "scalar:x command",
                "traj:kalman",
                "cov:kalman",
                "traj:kalman",
                "cov:kalman",
            ]
        );
    }
}
