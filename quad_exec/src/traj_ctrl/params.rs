//! Trajectory control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

use super::VelFeedback;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for trajectory control
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Params {

    /// XY controller proportional gain
    pub xy_k_p: f64,

    /// XY controller derivative gain
    pub xy_k_d: f64,

    /// Yaw controller proportional gain
    pub yaw_k_p: f64,

    /// Yaw controller derivative gain
    pub yaw_k_d: f64,

    /// Distance under which a marker is considered reached and the navigator
    /// moves on to the next one.
    ///
    /// Units: meters
    pub marker_reach_dist_m: f64,

    /// Multiple of `marker_reach_dist_m` beyond which the desired velocity
    /// points straight at the current marker instead of blending towards the
    /// next one.
    pub corner_blend_factor: f64,

    /// The yaw the controller holds.
    ///
    /// Units: radians
    pub yaw_dem_rad: f64
}

/// Parameters for the single axis controller
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AxisCtrlParams {
    /// Proportional gain
    pub k_p: f64,

    /// Derivative gain
    pub k_d: f64,

    /// Source of the velocity used by the derivative term
    pub vel_feedback: VelFeedback
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            xy_k_p: 1.85,
            xy_k_d: 0.12,
            yaw_k_p: 0.1,
            yaw_k_d: 0.01,
            marker_reach_dist_m: 1.2,
            corner_blend_factor: 3.0,
            yaw_dem_rad: 0.0
        }
    }
}

impl Default for AxisCtrlParams {
    fn default() -> Self {
        Self {
            k_p: 10.0,
            k_d: 5.0,
            vel_feedback: VelFeedback::Integrated
        }
    }
}
