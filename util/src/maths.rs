//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Normalise a yaw angle into the range (-pi, pi].
///
/// Angles already inside the range are returned untouched, others are wrapped
/// using the euclidian remainder so that arbitrarily large magnitudes are
/// handled without looping.
pub fn norm_yaw<T>(angle: T) -> T
where
    T: Float
{
    let pi_t: T = T::from(std::f64::consts::PI).unwrap();
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap();

    if angle > -pi_t && angle <= pi_t {
        return angle;
    }

    let mut wrapped = pi_t - rem_euclid(pi_t - angle, tau_t);

    // rem_euclid can round up to exactly tau, which lands on -pi
    if wrapped <= -pi_t {
        wrapped = wrapped + tau_t;
    }

    wrapped
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()` if `lhs` is much smaller than `rhs.abs()` in
/// magnitude and `lhs < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{PI, TAU};

    #[test]
    fn test_norm_yaw_in_range_untouched() {
        assert_eq!(norm_yaw(0.5f64), 0.5);
        assert_eq!(norm_yaw(-3.0f64), -3.0);
        assert_eq!(norm_yaw(PI), PI);
    }

    #[test]
    fn test_norm_yaw_boundaries() {
        // -pi is excluded from the range and maps onto +pi
        assert_relative_eq!(norm_yaw(-PI), PI);
        assert_relative_eq!(norm_yaw(TAU), 0.0, epsilon = 1e-12);
        assert_relative_eq!(norm_yaw(5.0), 5.0 - TAU, epsilon = 1e-12);
        assert_relative_eq!(norm_yaw(-5.0), TAU - 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_norm_yaw_range_and_congruence() {
        let mut y = -1000.0f64;
        while y < 1000.0 {
            let n = norm_yaw(y);
            assert!(n > -PI && n <= PI, "norm_yaw({}) = {} out of range", y, n);

            // The difference must be a whole number of turns
            let turns = (y - n) / TAU;
            assert_relative_eq!(turns, turns.round(), epsilon = 1e-9);

            y += 0.377;
        }
    }

    #[test]
    fn test_norm_yaw_large_magnitude() {
        let y = 1.0e6f64 * TAU + 1.0;
        assert_relative_eq!(norm_yaw(y), 1.0, epsilon = 1e-6);
        assert_relative_eq!(norm_yaw(-y), -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_rem_euclid() {
        assert_eq!(rem_euclid(7.0f64, 4.0), 3.0);
        assert_eq!(rem_euclid(-1.0f64, 4.0), 3.0);
    }
}
