//! Angle normalization shared by every residual and state update

use std::f64::consts::PI;

/// Wrap an angle into (-pi, pi].
///
/// Non-finite input is returned unchanged so that callers can detect it.
pub fn normalize_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return angle;
    }
    let two_pi = 2.0 * PI;
    let wrapped = (angle + PI).rem_euclid(two_pi) - PI;
    // rem_euclid maps odd multiples of pi onto -pi
    if wrapped <= -PI {
        wrapped + two_pi
    } else {
        wrapped
    }
}
