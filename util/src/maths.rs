//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::{Float, FloatConst};

/// Wrap an angle into the range (-pi, pi].
///
/// An input of exactly `-pi` (or any odd multiple of pi) is mapped to `+pi`.
pub fn wrap_to_pi<T>(angle: T) -> T
where
    T: Float + FloatConst,
{
    let pi_t = T::PI();
    let tau_t = pi_t + pi_t;

    if angle > -pi_t && angle <= pi_t {
        return angle;
    }

    let wrapped = rem_euclid(angle + pi_t, tau_t) - pi_t;

    if wrapped <= -pi_t {
        wrapped + tau_t
    } else {
        wrapped
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_wrap_to_pi() {
        const TAU: f64 = std::f64::consts::TAU;
        const PI: f64 = std::f64::consts::PI;

        assert_eq!(wrap_to_pi(0f64), 0f64);
        assert_eq!(wrap_to_pi(1f64), 1f64);
        assert_eq!(wrap_to_pi(-1f64), -1f64);
        assert_eq!(wrap_to_pi(PI), PI);
        assert_eq!(wrap_to_pi(-PI), PI);
        assert!((wrap_to_pi(TAU + 0.5) - 0.5).abs() < 1e-12);
        assert!((wrap_to_pi(-TAU - 0.5) + 0.5).abs() < 1e-12);
        assert!((wrap_to_pi(1.5 * PI) + 0.5 * PI).abs() < 1e-12);
    }

    #[test]
    fn test_rem_euclid() {
        assert_eq!(rem_euclid(7f64, 4f64), 3f64);
        assert_eq!(rem_euclid(-1f64, 4f64), 3f64);
    }
}
