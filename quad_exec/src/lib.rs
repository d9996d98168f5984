//! # Quadrotor library.
//!
//! Estimation and control for a quadrotor flying through a course of visual
//! markers. An EKF fuses odometry with marker sightings to estimate the planar
//! pose, which a PD controller uses to steer through the markers in order.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Kinematic simulation - drives the controller without the full simulator
pub mod kin_sim;

/// Localisation module - EKF estimate of where the quadrotor is in the world
pub mod loc;

/// Marker course definition
pub mod markers;

/// Quadrotor controller - the odometry and marker observation entry points
pub mod quad_ctrl;

/// Telemetry sinks for visualisation data
pub mod telem;

/// Trajectory control module - flies through the marker course
pub mod traj_ctrl;
