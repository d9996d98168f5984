//! # Localisation module
//!
//! This module provides localisation for the quadrotor in the form of an
//! Extended Kalman Filter over the planar pose `[x, y, yaw]` in the world
//! frame.
//!
//! Odometry (body frame linear velocity and yaw rate) drives the prediction
//! step at the odometry rate. Whenever a marker with a known world pose is
//! sighted, the relative pose of the marker as seen from the vehicle is used
//! to correct the estimate.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
pub mod pose;

pub use params::{CovUpdate, LocParams};
pub use pose::Pose2;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, trace};
use nalgebra::{Matrix2, Matrix3, Vector2, Vector3};
use util::maths::norm_yaw;

use pose::{rotation, rotation_deriv};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// EKF estimate of the vehicle pose in the world frame.
#[derive(Debug, Clone)]
pub struct EkfLoc {
    params: LocParams,

    /// State vector, `[x_m, y_m, yaw_rad]`
    state: Vector3<f64>,

    /// State covariance
    cov: Matrix3<f64>,

    /// Process noise
    q: Matrix3<f64>,

    /// Measurement noise
    r: Matrix3<f64>,

    /// Number of measurement updates applied
    num_corrections: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur during localisation.
#[derive(Debug, thiserror::Error)]
pub enum LocError {
    /// The innovation covariance `H P H^T + R` could not be inverted. With a
    /// positive definite R this can only happen through misconfiguration.
    #[error("The innovation covariance is singular: {0:?}")]
    SingularInnovationCov(Matrix3<f64>),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl EkfLoc {
    /// Create a new filter from the parameters.
    pub fn new(params: LocParams) -> Self {
        let state = Vector3::new(
            params.init_state[0],
            params.init_state[1],
            norm_yaw(params.init_state[2]),
        );

        Self {
            state,
            cov: Matrix3::identity() * params.init_cov,
            q: params.process_noise(),
            r: params.meas_noise(),
            num_corrections: 0,
            params,
        }
    }

    /// Propagate the estimate forward by `dt` seconds using the odometry.
    ///
    /// The motion Jacobian is linearised at the yaw before propagation.
    pub fn predict(&mut self, dt: f64, lin_vel_ms_b: &Vector2<f64>, yaw_rate_rads: f64) {
        let f = predict_jacobian(&self.state, dt, lin_vel_ms_b);

        self.state = predict_state(&self.state, dt, lin_vel_ms_b, yaw_rate_rads);
        self.cov = f * self.cov * f.transpose() + self.q;

        trace!("EKF predict: state = {:?}", self.state.as_slice());
    }

    /// Correct the estimate with a marker sighting.
    ///
    /// `marker_pos_m` and `marker_yaw_rad` are the marker's pose in the world
    /// frame, `meas_pos_m_b` and `meas_yaw_rad` the pose of the marker
    /// measured relative to the vehicle.
    ///
    /// Returns the innovation (measurement minus predicted measurement). Its
    /// yaw component is wrapped into (-pi, pi], so estimates either side of
    /// the +-pi seam are corrected the short way round.
    pub fn correct(
        &mut self,
        marker_pos_m: &Vector2<f64>,
        marker_yaw_rad: f64,
        meas_pos_m_b: &Vector2<f64>,
        meas_yaw_rad: f64,
    ) -> Result<Vector3<f64>, LocError> {
        let z = Vector3::new(meas_pos_m_b[0], meas_pos_m_b[1], meas_yaw_rad);
        let z_pred = predict_measurement(&self.state, marker_pos_m, marker_yaw_rad);

        let h = measurement_jacobian(&self.state, marker_pos_m);
        let k = kalman_gain(&self.cov, &h, &self.r)?;

        let mut innovation = z - z_pred;
        innovation[2] = norm_yaw(innovation[2]);

        self.state += k * innovation;
        self.state[2] = norm_yaw(self.state[2]);

        let i_kh = Matrix3::identity() - k * h;
        self.cov = match self.params.cov_update {
            CovUpdate::Simple => i_kh * self.cov,
            CovUpdate::Joseph => {
                i_kh * self.cov * i_kh.transpose() + k * self.r * k.transpose()
            }
        };

        self.num_corrections += 1;

        debug!(
            "EKF correct #{}: innovation = {:?}, state = {:?}",
            self.num_corrections,
            innovation.as_slice(),
            self.state.as_slice()
        );

        Ok(innovation)
    }

    /// The state vector `[x_m, y_m, yaw_rad]`.
    pub fn state(&self) -> &Vector3<f64> {
        &self.state
    }

    /// The state covariance.
    pub fn cov(&self) -> &Matrix3<f64> {
        &self.cov
    }

    /// The position block of the covariance.
    pub fn cov_xy(&self) -> Matrix2<f64> {
        Matrix2::new(
            self.cov[(0, 0)], self.cov[(0, 1)],
            self.cov[(1, 0)], self.cov[(1, 1)],
        )
    }

    /// Estimated position in the world frame.
    pub fn position_m(&self) -> Vector2<f64> {
        Vector2::new(self.state[0], self.state[1])
    }

    /// Estimated yaw in the world frame, in (-pi, pi].
    pub fn yaw_rad(&self) -> f64 {
        self.state[2]
    }

    /// Estimated pose of the body in the world frame.
    pub fn pose(&self) -> Pose2 {
        Pose2::from_yaw(self.state[2], self.position_m())
    }

    /// Number of measurement updates applied since creation.
    pub fn num_corrections(&self) -> u64 {
        self.num_corrections
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Motion model: propagate the state by `dt` with body frame velocity and yaw
/// rate.
pub fn predict_state(
    state: &Vector3<f64>,
    dt: f64,
    lin_vel_ms_b: &Vector2<f64>,
    yaw_rate_rads: f64,
) -> Vector3<f64> {
    let vel_ms_w = rotation(state[2]) * lin_vel_ms_b;

    Vector3::new(
        state[0] + dt * vel_ms_w[0],
        state[1] + dt * vel_ms_w[1],
        norm_yaw(state[2] + dt * yaw_rate_rads),
    )
}

/// Jacobian of [`predict_state`] with respect to the state, linearised at
/// `state`.
pub fn predict_jacobian(state: &Vector3<f64>, dt: f64, lin_vel_ms_b: &Vector2<f64>) -> Matrix3<f64> {
    let d_pos_d_yaw = dt * (rotation_deriv(state[2]) * lin_vel_ms_b);

    let mut f = Matrix3::identity();
    f[(0, 2)] = d_pos_d_yaw[0];
    f[(1, 2)] = d_pos_d_yaw[1];
    f
}

/// Measurement model: the pose of the marker relative to the vehicle,
/// `[x_m, y_m, yaw_rad]` in the body frame.
pub fn predict_measurement(
    state: &Vector3<f64>,
    marker_pos_m: &Vector2<f64>,
    marker_yaw_rad: f64,
) -> Vector3<f64> {
    let body_w = Pose2::from_yaw(state[2], Vector2::new(state[0], state[1]));
    let marker_w = Pose2::from_yaw(marker_yaw_rad, *marker_pos_m);

    let marker_b = body_w.inverse().compose(&marker_w);

    Vector3::new(marker_b.translation[0], marker_b.translation[1], marker_b.yaw())
}

/// Jacobian of [`predict_measurement`] with respect to the state.
pub fn measurement_jacobian(state: &Vector3<f64>, marker_pos_m: &Vector2<f64>) -> Matrix3<f64> {
    let (s, c) = state[2].sin_cos();
    let dx = marker_pos_m[0] - state[0];
    let dy = marker_pos_m[1] - state[1];

    Matrix3::new(
        -c, -s, -dx * s + dy * c,
        s, -c, -dx * c - dy * s,
        0.0, 0.0, -1.0,
    )
}

/// Compute the Kalman gain `P H^T (H P H^T + R)^-1`.
pub fn kalman_gain(
    cov: &Matrix3<f64>,
    h: &Matrix3<f64>,
    r: &Matrix3<f64>,
) -> Result<Matrix3<f64>, LocError> {
    let innov_cov = h * cov * h.transpose() + r;

    let innov_cov_inv = innov_cov
        .try_inverse()
        .ok_or(LocError::SingularInnovationCov(innov_cov))?;

    Ok(cov * h.transpose() * innov_cov_inv)
}
