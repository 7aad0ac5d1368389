//! Constant turn rate and velocity (CTRV) motion model

use crate::common::{AugSigmaPoints, AugStateVector, SigmaPoints, StateVector, N_SIGMA};

/// Below this yaw rate the motion is integrated as a straight line
pub const YAW_RATE_EPSILON: f64 = 1e-3;

/// Advance one augmented point `[px, py, v, yaw, yaw_rate, nu_a, nu_yawdd]`
/// by `dt` seconds. Noise terms are held constant over the interval.
pub fn propagate_ctrv(point: &AugStateVector, dt: f64) -> StateVector {
    let p_x = point[0];
    let p_y = point[1];
    let v = point[2];
    let yaw = point[3];
    let yawd = point[4];
    let nu_a = point[5];
    let nu_yawdd = point[6];

    let (mut px_p, mut py_p) = if yawd.abs() > YAW_RATE_EPSILON {
        (
            p_x + v / yawd * ((yaw + yawd * dt).sin() - yaw.sin()),
            p_y + v / yawd * (yaw.cos() - (yaw + yawd * dt).cos()),
        )
    } else {
        (p_x + v * dt * yaw.cos(), p_y + v * dt * yaw.sin())
    };

    let half_dt2 = 0.5 * dt * dt;
    px_p += half_dt2 * yaw.cos() * nu_a;
    py_p += half_dt2 * yaw.sin() * nu_a;

    StateVector::new(
        px_p,
        py_p,
        v + dt * nu_a,
        yaw + yawd * dt + half_dt2 * nu_yawdd,
        yawd + dt * nu_yawdd,
    )
}

/// Propagate every augmented sigma point through the CTRV model
pub fn predict_sigma_points(sigma_aug: &AugSigmaPoints, dt: f64) -> SigmaPoints {
    let mut sigma_pred = SigmaPoints::zeros();
    for i in 0..N_SIGMA {
        let point = sigma_aug.column(i).into_owned();
        sigma_pred.set_column(i, &propagate_ctrv(&point, dt));
    }
    sigma_pred
}
