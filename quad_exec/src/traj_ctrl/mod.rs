//! # Trajectory control module
//!
//! Trajectory control is responsible for flying the quadrotor through the
//! marker course. It is made up of two parts:
//!
//! - The navigator ([`nav`]) which keeps track of the marker currently being
//!   targeted, advancing to the next one once the vehicle is within the reach
//!   distance, and shapes a desired velocity which aims through the current
//!   marker towards the next so that corners are flown smoothly.
//! - The PD controllers ([`controllers`]) which turn the position and
//!   velocity errors into velocity demands for the xy plane and yaw.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controllers;
pub mod nav;
pub mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use controllers::*;
pub use nav::MarkerNav;
pub use params::{AxisCtrlParams, Params};
