//! Joint angle geometry.
//!
//! The angle at vertex `b` formed by the segments `b→a` and `b→c`, in degrees
//! within `[0, 180]`. Degenerate input never yields NaN: coincident points or
//! non-finite coordinates map to 180° (a fully extended limb), which is the
//! neutral state for every exercise.

use crate::analysis::types::Point;

pub const EXTENDED_ANGLE_DEG: f64 = 180.0;

const COINCIDENT_EPSILON: f64 = 1e-9;

pub fn angle_at(a: Point, b: Point, c: Point) -> f64 {
    let finite = [a, b, c].iter().all(|p| p.x.is_finite() && p.y.is_finite());
    if !finite
        || a.distance(&b) < COINCIDENT_EPSILON
        || c.distance(&b) < COINCIDENT_EPSILON
        || a.distance(&c) < COINCIDENT_EPSILON
    {
        return EXTENDED_ANGLE_DEG;
    }

    let radians = (c.y - b.y).atan2(c.x - b.x) - (a.y - b.y).atan2(a.x - b.x);
    let mut degrees = radians.abs().to_degrees();
    if degrees > 180.0 {
        degrees = 360.0 - degrees;
    }
    degrees.clamp(0.0, 180.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn straight_limb_is_180() {
        let angle = angle_at(p(0.0, 0.0), p(0.0, 100.0), p(0.0, 200.0));
        assert!((angle - 180.0).abs() < 1e-9);
    }

    #[test]
    fn right_angle_is_90() {
        let angle = angle_at(p(0.0, 0.0), p(0.0, 100.0), p(100.0, 100.0));
        assert!((angle - 90.0).abs() < 1e-9);
    }

    #[test]
    fn reflex_angles_are_reflected() {
        // raw atan2 difference here is 270 degrees
        let angle = angle_at(p(100.0, 0.0), p(0.0, 0.0), p(0.0, -100.0));
        assert!((angle - 90.0).abs() < 1e-9);
    }

    #[test]
    fn coincident_points_default_to_extended() {
        assert_eq!(angle_at(p(5.0, 5.0), p(5.0, 5.0), p(9.0, 1.0)), EXTENDED_ANGLE_DEG);
        assert_eq!(angle_at(p(1.0, 1.0), p(5.0, 5.0), p(5.0, 5.0)), EXTENDED_ANGLE_DEG);
        assert_eq!(angle_at(p(1.0, 1.0), p(5.0, 5.0), p(1.0, 1.0)), EXTENDED_ANGLE_DEG);
    }

    #[test]
    fn non_finite_input_defaults_to_extended() {
        let angle = angle_at(p(f64::NAN, 0.0), p(0.0, 100.0), p(0.0, 200.0));
        assert_eq!(angle, EXTENDED_ANGLE_DEG);
    }

    #[test]
    fn acute_angle() {
        let angle = angle_at(p(100.0, 0.0), p(0.0, 0.0), p(100.0, 100.0));
        assert!((angle - 45.0).abs() < 1e-9);
    }
}
