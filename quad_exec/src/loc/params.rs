//! Localisation parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Matrix3, Vector3};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the EKF localisation.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LocParams {
    /// Per-step process noise standard deviation on x and y.
    ///
    /// Units: meters
    pub pos_noise_std_m: f64,

    /// Per-step process noise standard deviation on yaw.
    ///
    /// Units: radians
    pub yaw_noise_std_rad: f64,

    /// Marker measurement noise standard deviation on the relative x and y.
    ///
    /// Units: meters
    pub meas_pos_noise_std_m: f64,

    /// Marker measurement noise standard deviation on the relative yaw.
    ///
    /// Units: radians
    pub meas_yaw_noise_std_rad: f64,

    /// Initial value of the diagonal of the state covariance.
    pub init_cov: f64,

    /// The initial state, `[x_m, y_m, yaw_rad]`.
    pub init_state: [f64; 3],

    /// Form of the covariance correction used by the measurement update.
    pub cov_update: CovUpdate,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The covariance correction applied after a measurement.
#[derive(Deserialize, Debug, Copy, Clone, PartialEq)]
pub enum CovUpdate {
    /// `(I - K H) P`
    Simple,

    /// `(I - K H) P (I - K H)^T + K R K^T`, which preserves symmetry under
    /// rounding error.
    Joseph,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LocParams {
    /// Build the process noise matrix Q.
    pub fn process_noise(&self) -> Matrix3<f64> {
        Matrix3::from_diagonal(&Vector3::new(
            self.pos_noise_std_m.powi(2),
            self.pos_noise_std_m.powi(2),
            self.yaw_noise_std_rad.powi(2),
        ))
    }

    /// Build the measurement noise matrix R.
    pub fn meas_noise(&self) -> Matrix3<f64> {
        Matrix3::from_diagonal(&Vector3::new(
            self.meas_pos_noise_std_m.powi(2),
            self.meas_pos_noise_std_m.powi(2),
            self.meas_yaw_noise_std_rad.powi(2),
        ))
    }
}

impl Default for LocParams {
    fn default() -> Self {
        Self {
            pos_noise_std_m: 0.005,
            yaw_noise_std_rad: 0.005,
            meas_pos_noise_std_m: 0.005,
            meas_yaw_noise_std_rad: 0.03,
            init_cov: 0.01,
            init_state: [0.0; 3],
            cov_update: CovUpdate::Simple,
        }
    }
}

impl Default for CovUpdate {
    fn default() -> Self {
        CovUpdate::Simple
    }
}
