//! # Markers
//!
//! The fixed, ordered course of visual markers the quadrotor flies through.
//! The list is known at start up and never changes during a run.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Maximum number of markers which can be placed in the world.
pub const MAX_NUM_MARKERS: usize = 30;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A marker placed in the world.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Marker {
    /// Position of the marker in the world frame
    pub position_m: Vector2<f64>,

    /// Orientation of the marker in the world frame
    pub yaw_rad: f64,
}

/// The ordered sequence of markers making up the course.
#[derive(Debug, Clone)]
pub struct MarkerRegistry {
    markers: Vec<Marker>,
}

/// Marker course parameters, as loaded from `markers.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkerParams {
    pub markers: Vec<MarkerSpec>,
}

/// A single marker entry in the parameter file.
#[derive(Debug, Copy, Clone, Deserialize)]
pub struct MarkerSpec {
    pub x_m: f64,
    pub y_m: f64,

    /// Markers are assumed to be aligned with the world frame unless given.
    #[serde(default)]
    pub yaw_rad: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MarkerError {
    #[error("Attempted to create an empty marker course")]
    EmptyCourse,

    #[error("Too many markers in the course, expected at most {}, found {0}", MAX_NUM_MARKERS)]
    TooManyMarkers(usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Marker {
    pub fn new(x_m: f64, y_m: f64) -> Self {
        Self {
            position_m: Vector2::new(x_m, y_m),
            yaw_rad: 0.0,
        }
    }
}

impl From<MarkerSpec> for Marker {
    fn from(spec: MarkerSpec) -> Self {
        Self {
            position_m: Vector2::new(spec.x_m, spec.y_m),
            yaw_rad: spec.yaw_rad,
        }
    }
}

impl MarkerRegistry {
    /// Create a new registry from an ordered list of markers.
    pub fn new(markers: Vec<Marker>) -> Result<Self, MarkerError> {
        if markers.is_empty() {
            return Err(MarkerError::EmptyCourse);
        }
        if markers.len() > MAX_NUM_MARKERS {
            return Err(MarkerError::TooManyMarkers(markers.len()));
        }

        Ok(Self { markers })
    }

    /// Create a registry of zero-yaw markers from a list of positions.
    pub fn from_positions(positions: &[[f64; 2]]) -> Result<Self, MarkerError> {
        Self::new(positions.iter().map(|p| Marker::new(p[0], p[1])).collect())
    }

    /// Create a registry from the parameter file contents.
    pub fn from_params(params: &MarkerParams) -> Result<Self, MarkerError> {
        Self::new(params.markers.iter().map(|&s| Marker::from(s)).collect())
    }

    /// The default course.
    pub fn default_course() -> Self {
        Self {
            markers: DEFAULT_COURSE_M
                .iter()
                .map(|p| Marker::new(p[0], p[1]))
                .collect(),
        }
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn get(&self, index: usize) -> Option<&Marker> {
        self.markers.get(index)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Index of the last marker in the course.
    pub fn last_index(&self) -> usize {
        self.markers.len() - 1
    }
}

// ---------------------------------------------------------------------------
// DEFAULT COURSE
// ---------------------------------------------------------------------------

/// Marker positions of the default course, in the world frame.
const DEFAULT_COURSE_M: [[f64; 2]; 13] = [
    [0.0, 0.0],
    [3.8, 0.0],
    [3.5, 1.8],
    [1.6, 3.4],
    [4.3, 3.3],
    [6.8, 5.3],
    [4.1, 5.5],
    [4.25, 8.2],
    [7.5, 8.2],
    [9.0, 8.7],
    [9.2, 12.2],
    [7.4, 10.4],
    [6.0, 11.5],
];
