//! # 2D pose
//!
//! A rigid transform on the plane, used to express one frame in another. A
//! point `p` in the child frame maps into the parent frame as `R * p + t`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::ops::Mul;

use nalgebra::{Matrix2, Vector2};
use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A 2D rigid transform made of a rotation and a translation.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Pose2 {
    /// Orthonormal rotation matrix
    pub rotation: Matrix2<f64>,

    /// Translation applied after the rotation
    pub translation: Vector2<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose2 {
    /// Create a new pose from a rotation matrix and translation.
    pub fn new(rotation: Matrix2<f64>, translation: Vector2<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Create a new pose from a yaw angle (radians) and translation.
    pub fn from_yaw(yaw_rad: f64, translation: Vector2<f64>) -> Self {
        Self::new(rotation(yaw_rad), translation)
    }

    /// The identity transform.
    pub fn identity() -> Self {
        Self::new(Matrix2::identity(), Vector2::zeros())
    }

    /// Return the inverse of this transform.
    pub fn inverse(&self) -> Self {
        let inv_rotation = self.rotation.transpose();
        let inv_translation = -(inv_rotation * self.translation);

        Self::new(inv_rotation, inv_translation)
    }

    /// Compose this transform with `other`, i.e. `self * other`.
    ///
    /// The result first applies `other` and then `self`.
    pub fn compose(&self, other: &Pose2) -> Self {
        Self::new(
            self.rotation * other.rotation,
            self.rotation * other.translation + self.translation,
        )
    }

    /// Return the rotation angle of the transform in radians, in (-pi, pi].
    pub fn yaw(&self) -> f64 {
        self.rotation[(1, 0)].atan2(self.rotation[(0, 0)])
    }

    /// Apply the transform to a point.
    pub fn transform_point(&self, point: &Vector2<f64>) -> Vector2<f64> {
        self.rotation * point + self.translation
    }
}

impl Default for Pose2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul for Pose2 {
    type Output = Pose2;

    fn mul(self, rhs: Pose2) -> Pose2 {
        self.compose(&rhs)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the 2D rotation matrix for the given angle.
pub fn rotation(yaw_rad: f64) -> Matrix2<f64> {
    let (s, c) = yaw_rad.sin_cos();

    Matrix2::new(
        c, -s,
        s, c,
    )
}

/// Derivative of the rotation matrix with respect to the angle.
pub fn rotation_deriv(yaw_rad: f64) -> Matrix2<f64> {
    let (s, c) = yaw_rad.sin_cos();

    Matrix2::new(
        -s, -c,
        c, -s,
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_compose_inverse_is_identity() {
        let cases = [
            (0.0, Vector2::new(0.0, 0.0)),
            (0.3, Vector2::new(1.0, -2.0)),
            (-2.9, Vector2::new(-7.5, 3.25)),
            (PI, Vector2::new(100.0, 0.01)),
            (1.234, Vector2::new(-0.5, -0.5)),
        ];

        for (yaw, t) in cases.iter() {
            let pose = Pose2::from_yaw(*yaw, *t);

            for p in [pose.compose(&pose.inverse()), pose.inverse().compose(&pose)].iter() {
                assert_relative_eq!(p.rotation, Matrix2::identity(), epsilon = 1e-9);
                assert_relative_eq!(p.translation, Vector2::zeros(), epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_compose_not_commutative() {
        let a = Pose2::from_yaw(FRAC_PI_2, Vector2::new(1.0, 0.0));
        let b = Pose2::from_yaw(0.0, Vector2::new(1.0, 0.0));

        // Translate then rotate vs rotate then translate
        assert_relative_eq!((a * b).translation, Vector2::new(1.0, 1.0), epsilon = 1e-12);
        assert_relative_eq!((b * a).translation, Vector2::new(2.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_compose_associative() {
        let a = Pose2::from_yaw(0.4, Vector2::new(1.0, 2.0));
        let b = Pose2::from_yaw(-1.1, Vector2::new(-3.0, 0.5));
        let c = Pose2::from_yaw(2.7, Vector2::new(0.2, 0.9));

        let ab_c = (a * b) * c;
        let a_bc = a * (b * c);

        assert_relative_eq!(ab_c.rotation, a_bc.rotation, epsilon = 1e-12);
        assert_relative_eq!(ab_c.translation, a_bc.translation, epsilon = 1e-12);
    }

    #[test]
    fn test_yaw() {
        assert_relative_eq!(Pose2::from_yaw(0.7, Vector2::zeros()).yaw(), 0.7);
        assert_relative_eq!(Pose2::from_yaw(-2.0, Vector2::zeros()).yaw(), -2.0);
        assert_relative_eq!(Pose2::from_yaw(PI, Vector2::zeros()).yaw(), PI);
        assert_relative_eq!(
            Pose2::from_yaw(3.0 * FRAC_PI_2, Vector2::zeros()).yaw(),
            -FRAC_PI_2,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_transform_point() {
        let pose = Pose2::from_yaw(FRAC_PI_2, Vector2::new(1.0, 1.0));
        assert_relative_eq!(
            pose.transform_point(&Vector2::new(1.0, 0.0)),
            Vector2::new(1.0, 2.0),
            epsilon = 1e-12
        );
    }
}
