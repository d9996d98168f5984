//! # Telemetry
//!
//! Sinks for visualisation data produced by the controller: named scalar time
//! series, trajectory points and 2D covariance ellipses.
//!
//! Telemetry is fire and forget. Sinks never report failures back to the
//! caller, a sink which can't write its data logs a warning and carries on so
//! that the control loop is never affected.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::HashMap;

use log::{trace, warn};
use nalgebra::{Matrix2, Vector2};
use serde::Serialize;

use util::{archive::Archiver, session::Session};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A consumer of telemetry data.
pub trait TelemSink {
    /// A sample of a named scalar time series.
    fn scalar(&mut self, name: &str, time_s: f64, value: f64);

    /// A point on a named 2D trajectory.
    fn trajectory(&mut self, name: &str, time_s: f64, point: &Vector2<f64>);

    /// A named 2D covariance, centred on the latest trajectory point of the
    /// same name.
    fn covariance(&mut self, name: &str, time_s: f64, cov: &Matrix2<f64>);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A sink which discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

/// A sink which writes everything to the log at trace level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

/// A sink which archives each named series into its own CSV file in the
/// session archive directory.
pub struct ArchiveSink {
    session: Session,
    archivers: HashMap<String, Option<Archiver>>,
}

/// The 1-sigma ellipse of a 2D covariance.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct CovEllipse {
    /// Semi-major axis length
    pub semi_major: f64,

    /// Semi-minor axis length
    pub semi_minor: f64,

    /// Angle of the major axis to the +ve x axis, in radians
    pub angle_rad: f64,
}

#[derive(Serialize)]
struct ScalarRecord {
    time_s: f64,
    value: f64,
}

#[derive(Serialize)]
struct PointRecord {
    time_s: f64,
    x_m: f64,
    y_m: f64,
}

#[derive(Serialize)]
struct EllipseRecord {
    time_s: f64,
    semi_major: f64,
    semi_minor: f64,
    angle_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CovEllipse {
    /// Compute the ellipse from a symmetric 2x2 covariance.
    ///
    /// Negative eigenvalues from numerical error are clamped to zero.
    pub fn from_cov(cov: &Matrix2<f64>) -> Self {
        let a = cov[(0, 0)];
        let b = 0.5 * (cov[(0, 1)] + cov[(1, 0)]);
        let c = cov[(1, 1)];

        let mean = 0.5 * (a + c);
        let radius = (0.25 * (a - c).powi(2) + b * b).sqrt();

        let l_major = (mean + radius).max(0.0);
        let l_minor = (mean - radius).max(0.0);

        Self {
            semi_major: l_major.sqrt(),
            semi_minor: l_minor.sqrt(),
            angle_rad: 0.5 * (2.0 * b).atan2(a - c),
        }
    }
}

impl TelemSink for NullSink {
    fn scalar(&mut self, _: &str, _: f64, _: f64) {}

    fn trajectory(&mut self, _: &str, _: f64, _: &Vector2<f64>) {}

    fn covariance(&mut self, _: &str, _: f64, _: &Matrix2<f64>) {}
}

impl TelemSink for LogSink {
    fn scalar(&mut self, name: &str, time_s: f64, value: f64) {
        trace!("[telem {:.3}] {} = {}", time_s, name, value);
    }

    fn trajectory(&mut self, name: &str, time_s: f64, point: &Vector2<f64>) {
        trace!("[telem {:.3}] {} at ({}, {})", time_s, name, point[0], point[1]);
    }

    fn covariance(&mut self, name: &str, time_s: f64, cov: &Matrix2<f64>) {
        trace!("[telem {:.3}] {} ellipse {:?}", time_s, name, CovEllipse::from_cov(cov));
    }
}

impl ArchiveSink {
    pub fn new(session: &Session) -> Self {
        Self {
            session: session.clone(),
            archivers: HashMap::new(),
        }
    }

    /// Serialise the record into the archive for `file_name`, creating it on
    /// first use.
    ///
    /// If the archive can't be created the series is disabled, so the warning
    /// is only raised once.
    fn write<T: Serialize>(&mut self, file_name: String, record: T) {
        let session = &self.session;

        let archiver = self
            .archivers
            .entry(file_name)
            .or_insert_with_key(|file_name| match Archiver::from_path(session, file_name) {
                Ok(a) => Some(a),
                Err(e) => {
                    warn!("Could not create telemetry archive {}: {}", file_name, e);
                    None
                }
            });

        if let Some(a) = archiver {
            if let Err(e) = a.serialise(record) {
                warn!("Could not write telemetry record: {}", e);
            }
        }
    }
}

impl TelemSink for ArchiveSink {
    fn scalar(&mut self, name: &str, time_s: f64, value: f64) {
        self.write(
            format!("{}.csv", file_stem(name)),
            ScalarRecord { time_s, value },
        );
    }

    fn trajectory(&mut self, name: &str, time_s: f64, point: &Vector2<f64>) {
        self.write(
            format!("{}_traj.csv", file_stem(name)),
            PointRecord {
                time_s,
                x_m: point[0],
                y_m: point[1],
            },
        );
    }

    fn covariance(&mut self, name: &str, time_s: f64, cov: &Matrix2<f64>) {
        let ellipse = CovEllipse::from_cov(cov);

        self.write(
            format!("{}_cov.csv", file_stem(name)),
            EllipseRecord {
                time_s,
                semi_major: ellipse.semi_major,
                semi_minor: ellipse.semi_minor,
                angle_rad: ellipse.angle_rad,
            },
        );
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a series name into something usable as a file name.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_4;

    #[test]
    fn test_ellipse_axis_aligned() {
        let e = CovEllipse::from_cov(&Matrix2::new(4.0, 0.0, 0.0, 1.0));
        assert_relative_eq!(e.semi_major, 2.0);
        assert_relative_eq!(e.semi_minor, 1.0);
        assert_relative_eq!(e.angle_rad, 0.0);
    }

    #[test]
    fn test_ellipse_rotated() {
        // Eigenvalues 3 and 1 with the major axis along (1, 1)
        let e = CovEllipse::from_cov(&Matrix2::new(2.0, 1.0, 1.0, 2.0));
        assert_relative_eq!(e.semi_major, 3f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(e.semi_minor, 1.0, epsilon = 1e-12);
        assert_relative_eq!(e.angle_rad, FRAC_PI_4, epsilon = 1e-12);
    }

    #[test]
    fn test_ellipse_degenerate() {
        let e = CovEllipse::from_cov(&Matrix2::zeros());
        assert_eq!(e.semi_major, 0.0);
        assert_eq!(e.semi_minor, 0.0);
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("x command"), "x_command");
        assert_eq!(file_stem("Kalman"), "kalman");
    }
}
