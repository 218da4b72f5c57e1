//! Utility maths functions
//!
//! Headings are compass headings in degrees, `0` pointing along `+y` (north) and increasing
//! clockwise. Direction vectors use `x` east and `y` north.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use num_traits::Float;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Turn radius used when the steering angle is so small the vehicle is effectively driving
/// straight.
pub const STRAIGHT_TURN_RADIUS_M: f64 = 1e10;

/// Steering angles below this magnitude are treated as straight ahead.
pub const MIN_TURN_STEER_DEG: f64 = 0.01;

/// Standard gravity
pub const G_MSS: f64 = 9.81;

// ---------------------------------------------------------------------------
// GENERIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

/// Linear function through the points `(x1, y1)` and `(x2, y2)`, evaluated at `x`.
///
/// Unlike `lin_map` this is intended for extrapolation as well as interpolation.
pub fn fx_lin(x: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    lin_map((x1, x2), (y1, y2), x)
}

pub fn clamp<T>(value: &T, min: &T, max: &T) -> T
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Clamp a value to the symmetric range `[-limit, limit]`.
pub fn clamp_abs(value: f64, limit: f64) -> f64 {
    clamp(&value, &(-limit.abs()), &limit.abs())
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Returns `1.0` for non-negative values and `-1.0` otherwise.
pub fn sign(value: f64) -> f64 {
    if value >= 0.0 { 1.0 } else { -1.0 }
}

// ---------------------------------------------------------------------------
// HEADING FUNCTIONS
// ---------------------------------------------------------------------------

/// Normalise a heading into `[0, 360)`.
pub fn normalize_hdg(hdg_deg: f64) -> f64 {
    let h = rem_euclid(hdg_deg, 360.0);

    // Round-off can land exactly on 360
    if h >= 360.0 { 0.0 } else { h }
}

/// Signed shortest angular distance from `from_deg` to `to_deg`, in `(-180, 180]`.
///
/// Positive when `to_deg` lies clockwise of `from_deg`.
pub fn rel_hdg(from_deg: f64, to_deg: f64) -> f64 {
    let d = rem_euclid(to_deg - from_deg, 360.0);

    if d > 180.0 { d - 360.0 } else { d }
}

/// Unit direction vector of a heading.
pub fn hdg2dir(hdg_deg: f64) -> Vector2<f64> {
    let h = hdg_deg.to_radians();
    Vector2::new(h.sin(), h.cos())
}

/// Heading of a direction vector. The zero vector gives a heading of `0`.
pub fn dir2hdg(dir: &Vector2<f64>) -> f64 {
    if dir.x == 0.0 && dir.y == 0.0 {
        return 0.0;
    }

    normalize_hdg(dir.x.atan2(dir.y).to_degrees())
}

/// Rotate a vector clockwise by the given angle.
pub fn rotate_vec(v: &Vector2<f64>, angle_deg: f64) -> Vector2<f64> {
    let (s, c) = angle_deg.to_radians().sin_cos();
    Vector2::new(v.x * c + v.y * s, -v.x * s + v.y * c)
}

/// Unit vector pointing to the right of the given direction.
pub fn right_normal(dir: &Vector2<f64>) -> Vector2<f64> {
    Vector2::new(dir.y, -dir.x)
}

/// Rescale a vector to the given length, the zero vector stays zero.
pub fn set_abs(v: &Vector2<f64>, len: f64) -> Vector2<f64> {
    let n = v.norm();

    if n == 0.0 {
        Vector2::zeros()
    } else {
        v * (len / n)
    }
}

/// Turn radius of a bicycle model with the given wheelbase and steering angle.
///
/// Signed like the steering angle. Near-zero steering gives `STRAIGHT_TURN_RADIUS_M`.
pub fn turn_radius(wheelbase_m: f64, steer_deg: f64) -> f64 {
    if steer_deg.abs() <= MIN_TURN_STEER_DEG {
        return STRAIGHT_TURN_RADIUS_M * sign(steer_deg);
    }

    wheelbase_m / steer_deg.to_radians().tan()
}

/// Steering angle needed to follow a circle of the given radius.
pub fn steer_for_radius(wheelbase_m: f64, radius_m: f64) -> f64 {
    if radius_m.abs() >= STRAIGHT_TURN_RADIUS_M {
        return 0.0;
    }

    (wheelbase_m / radius_m).atan().to_degrees()
}

#[cfg(test)]
mod test {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_rel_hdg() {
        assert_eq!(rel_hdg(10.0, 20.0), 10.0);
        assert_eq!(rel_hdg(20.0, 10.0), -10.0);
        assert_eq!(rel_hdg(350.0, 10.0), 20.0);
        assert_eq!(rel_hdg(10.0, 350.0), -20.0);
        assert_eq!(rel_hdg(0.0, 180.0), 180.0);
        assert_eq!(rel_hdg(90.0, 90.0), 0.0);
    }

    #[test]
    fn test_normalize_hdg() {
        assert_eq!(normalize_hdg(-90.0), 270.0);
        assert_eq!(normalize_hdg(720.0), 0.0);
        assert_eq!(normalize_hdg(45.0), 45.0);
    }

    #[test]
    fn test_hdg_dir() {
        let east = hdg2dir(90.0);
        assert!(approx(east.x, 1.0) && approx(east.y, 0.0));

        assert!(approx(dir2hdg(&Vector2::new(0.0, -3.0)), 180.0));
        assert!(approx(dir2hdg(&Vector2::new(-1.0, 0.0)), 270.0));
        assert_eq!(dir2hdg(&Vector2::zeros()), 0.0);

        let r = rotate_vec(&hdg2dir(0.0), 90.0);
        assert!(approx(r.x, 1.0) && approx(r.y, 0.0));

        let n = right_normal(&hdg2dir(0.0));
        assert!(approx(n.x, 1.0) && approx(n.y, 0.0));
    }

    #[test]
    fn test_turn_radius() {
        assert!(approx(turn_radius(5.0, 45.0), 5.0));
        assert!(approx(turn_radius(5.0, -45.0), -5.0));
        assert_eq!(turn_radius(5.0, 0.0), STRAIGHT_TURN_RADIUS_M);
        assert!(approx(steer_for_radius(5.0, 5.0), 45.0));
        assert_eq!(steer_for_radius(5.0, STRAIGHT_TURN_RADIUS_M), 0.0);
    }

    #[test]
    fn test_fx_lin() {
        assert!(approx(fx_lin(4.0, 1.0, 3.0, 5.0, 10.0), 8.25));
        assert!(approx(fx_lin(7.0, 1.0, 3.0, 5.0, 10.0), 13.5));
        assert_eq!(clamp_abs(-12.0, 10.0), -10.0);
    }
}
