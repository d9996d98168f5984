//! # Trajectory controllers module
//!
//! This module provides the PD controllers used by trajectory control, and the
//! single axis controller used when no velocity measurement is available.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::ops::{Add, Mul, Sub};
use log::trace;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PD controller acting on position and velocity errors.
///
/// The controller is stateless, the velocity is measured rather than derived
/// from the position error, so it can be applied equally to scalars (yaw) and
/// vectors (the xy plane).
#[derive(Debug, Serialize, Clone, Copy)]
pub struct PdController {
    /// Proportional gain
    k_p: f64,

    /// Derivative gain
    k_d: f64,
}

/// A PD controller for a single axis with no velocity measurement.
///
/// The velocity used by the derivative term is either integrated from the
/// controller's own output or differentiated from successive position
/// measurements.
#[derive(Debug, Serialize, Clone)]
pub struct AxisPdController {
    /// Proportional gain
    k_p: f64,

    /// Derivative gain
    k_d: f64,

    feedback: VelFeedback,

    /// Current velocity estimate
    vel_est: f64,

    /// Previous measured position
    prev_pos: Option<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Where the axis controller's velocity estimate comes from.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum VelFeedback {
    /// Integrate the commanded acceleration, `v += u * dt`.
    Integrated,

    /// Finite difference of the measured position.
    Differentiated,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PdController {

    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_d: f64) -> Self {
        Self { k_p, k_d }
    }

    /// Get the output of the controller.
    ///
    /// `k_p * (pos_dem - pos) + k_d * (vel_dem - vel)`
    pub fn get<T>(&self, pos: T, vel: T, pos_dem: T, vel_dem: T) -> T
    where
        T: Sub<Output = T> + Add<Output = T> + Mul<f64, Output = T>,
    {
        (pos_dem - pos) * self.k_p + (vel_dem - vel) * self.k_d
    }
}

impl AxisPdController {

    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_d: f64, feedback: VelFeedback) -> Self {
        Self {
            k_p, k_d, feedback,
            vel_est: 0f64,
            prev_pos: None,
        }
    }

    /// Create a new controller from the parameters
    pub fn from_params(params: &super::AxisCtrlParams) -> Self {
        Self::new(params.k_p, params.k_d, params.vel_feedback)
    }

    /// Get the control command for the given measured and demanded position.
    ///
    /// `dt` is the time since the previous call.
    pub fn get(&mut self, dt: f64, pos: f64, pos_dem: f64) -> f64 {

        // With differentiated feedback the velocity comes from the position
        // history. The first call differentiates against zero, and there's no
        // derivative if no time has passed.
        if self.feedback == VelFeedback::Differentiated {
            let prev = self.prev_pos.unwrap_or(0f64);
            self.vel_est = if dt > 0f64 { (pos - prev) / dt } else { 0f64 };
            self.prev_pos = Some(pos);
        }

        let out = self.k_p * (pos_dem - pos) + self.k_d * (0f64 - self.vel_est);

        if self.feedback == VelFeedback::Integrated {
            self.vel_est += out * dt;
        }

        trace!("AxisPdController: u = {}, vel_est = {}", out, self.vel_est);

        out
    }

    /// The current velocity estimate.
    pub fn vel_est(&self) -> f64 {
        self.vel_est
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector2;

    #[test]
    fn test_pd_scalar() {
        let ctrl = PdController::new(2.0, 0.5);

        // 2 * (1 - 0) + 0.5 * (0 - 0.4)
        assert_relative_eq!(ctrl.get(0.0, 0.4, 1.0, 0.0), 1.8);
        assert_eq!(ctrl.get(1.0, 0.0, 1.0, 0.0), 0.0);
    }

    #[test]
    fn test_pd_vector() {
        let ctrl = PdController::new(1.85, 0.12);

        let u = ctrl.get(
            Vector2::new(0.0, 1.0),
            Vector2::new(0.5, 0.0),
            Vector2::new(3.8, 0.0),
            Vector2::new(1.0, 1.0),
        );

        assert_relative_eq!(
            u,
            Vector2::new(1.85 * 3.8 + 0.12 * 0.5, -1.85 + 0.12),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_axis_integrated_first_step() {
        let mut ctrl = AxisPdController::new(10.0, 5.0, VelFeedback::Integrated);

        let u = ctrl.get(0.01, 0.0, 1.0);
        assert_relative_eq!(u, 10.0);
        assert_relative_eq!(ctrl.vel_est(), 0.1);

        // Second step is damped by the integrated velocity
        let u = ctrl.get(0.01, 0.0, 1.0);
        assert_relative_eq!(u, 10.0 - 5.0 * 0.1);
        assert_relative_eq!(ctrl.vel_est(), 0.1 + 9.5 * 0.01);
    }

    #[test]
    fn test_axis_differentiated() {
        let mut ctrl = AxisPdController::new(5.0, 5.0, VelFeedback::Differentiated);

        // First call differentiates against zero
        let u = ctrl.get(0.1, 0.2, 1.0);
        assert_relative_eq!(ctrl.vel_est(), 2.0);
        assert_relative_eq!(u, 5.0 * 0.8 - 5.0 * 2.0);

        let u = ctrl.get(0.1, 0.3, 1.0);
        assert_relative_eq!(ctrl.vel_est(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(u, 5.0 * 0.7 - 5.0 * 1.0, epsilon = 1e-12);

        // No time passed, no derivative
        let u = ctrl.get(0.0, 0.3, 1.0);
        assert_eq!(ctrl.vel_est(), 0.0);
        assert_relative_eq!(u, 5.0 * 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_axis_converges_on_double_integrator() {
        let mut ctrl = AxisPdController::new(10.0, 5.0, VelFeedback::Integrated);
        let dt = 0.01;
        let mut pos = 0.0;
        let mut vel = 0.0;

        for _ in 0..2000 {
            let acc = ctrl.get(dt, pos, 1.0);
            vel += acc * dt;
            pos += vel * dt;
        }

        assert_relative_eq!(pos, 1.0, epsilon = 1e-3);
    }
}
