//! # Marker navigator
//!
//! Keeps track of the marker being targeted and shapes the desired velocity.
//!
//! The target only ever moves forward through the course: once the vehicle is
//! strictly closer than the reach distance to the current target the next
//! marker becomes the target. The last marker stays the target forever.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info};
use nalgebra::Vector2;

use crate::markers::Marker;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Navigator state, the index of the targeted marker.
#[derive(Debug, Clone)]
pub struct MarkerNav {
    target_index: usize,

    /// Reach distance, in meters
    reach_dist_m: f64,

    /// Multiple of the reach distance under which cornering begins
    corner_blend_factor: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MarkerNav {
    /// Create a navigator targeting the first marker.
    pub fn new(params: &super::Params) -> Self {
        Self {
            target_index: 0,
            reach_dist_m: params.marker_reach_dist_m,
            corner_blend_factor: params.corner_blend_factor,
        }
    }

    /// Advance the target if it's been reached, and return the new target
    /// index.
    pub fn update_target(&mut self, markers: &[Marker], position_m: &Vector2<f64>) -> usize {
        let new_index = advance_target(markers, self.target_index, position_m, self.reach_dist_m);

        if new_index != self.target_index {
            if new_index == markers.len() - 1 {
                info!("Targeting final marker {}", new_index);
            } else {
                debug!(
                    "Marker {} reached, targeting marker {} at {:?}",
                    self.target_index,
                    new_index,
                    markers[new_index].position_m.as_slice()
                );
            }
            self.target_index = new_index;
        }

        self.target_index
    }

    /// Desired velocity for the current target.
    pub fn desired_velocity(
        &self,
        markers: &[Marker],
        position_m: &Vector2<f64>,
        velocity_ms: &Vector2<f64>,
    ) -> Vector2<f64> {
        desired_velocity(
            markers,
            self.target_index,
            position_m,
            velocity_ms,
            self.reach_dist_m * self.corner_blend_factor,
        )
    }

    pub fn target_index(&self) -> usize {
        self.target_index
    }

    /// True once the final marker is the target and has been reached.
    pub fn is_finished(&self, markers: &[Marker], position_m: &Vector2<f64>) -> bool {
        self.target_index == markers.len() - 1
            && (markers[self.target_index].position_m - position_m).norm() < self.reach_dist_m
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the index of the marker to target.
///
/// The index advances by one, up to the last marker, if `position_m` is
/// strictly closer than `reach_dist_m` to the current target.
pub fn advance_target(
    markers: &[Marker],
    current_index: usize,
    position_m: &Vector2<f64>,
    reach_dist_m: f64,
) -> usize {
    let dist_m = (markers[current_index].position_m - position_m).norm();

    if dist_m < reach_dist_m {
        (current_index + 1).min(markers.len() - 1)
    } else {
        current_index
    }
}

/// Get the desired velocity of the vehicle.
///
/// Zero once the last marker is targeted. Further than `blend_dist_m` from the
/// target the vehicle is steered straight at it, closer in it aims through the
/// target towards the following marker.
pub fn desired_velocity(
    markers: &[Marker],
    current_index: usize,
    position_m: &Vector2<f64>,
    _velocity_ms: &Vector2<f64>,
    blend_dist_m: f64,
) -> Vector2<f64> {
    if current_index >= markers.len() - 1 {
        return Vector2::zeros();
    }

    let current_m = markers[current_index].position_m;
    let next_m = markers[current_index + 1].position_m;

    let pos_to_current = current_m - position_m;
    let current_to_next = next_m - current_m;

    if pos_to_current.norm() > blend_dist_m {
        return pos_to_current;
    }

    pos_to_current + current_to_next
}
