//! Weighted mean and covariance recovery from sigma points

use nalgebra::{SMatrix, SVector};

use crate::common::{normalize_angle, N_SIGMA};
use crate::tracking::sigma_points::SigmaWeights;

/// Difference `a - b`, with the circular component (if any) wrapped
pub fn residual<const R: usize>(
    a: &SVector<f64, R>,
    b: &SVector<f64, R>,
    angle_index: Option<usize>,
) -> SVector<f64, R> {
    let mut diff = a - b;
    if let Some(i) = angle_index {
        diff[i] = normalize_angle(diff[i]);
    }
    diff
}

/// Weighted mean of sigma points.
///
/// The circular component is averaged as wrapped offsets from the first
/// point, so points on both sides of +-pi average to an angle near pi
/// instead of near zero. The result is wrapped.
pub fn weighted_mean<const R: usize>(
    points: &SMatrix<f64, R, N_SIGMA>,
    weights: &SigmaWeights,
    angle_index: Option<usize>,
) -> SVector<f64, R> {
    let mut mean = SVector::<f64, R>::zeros();
    for i in 0..N_SIGMA {
        mean += weights.w[i] * points.column(i);
    }

    if let Some(a) = angle_index {
        let anchor = points[(a, 0)];
        let offset: f64 = (0..N_SIGMA)
            .map(|i| weights.w[i] * normalize_angle(points[(a, i)] - anchor))
            .sum();
        mean[a] = normalize_angle(anchor + offset);
    }
    mean
}

/// Weighted mean and covariance of sigma points
pub fn recover_moments<const R: usize>(
    points: &SMatrix<f64, R, N_SIGMA>,
    weights: &SigmaWeights,
    angle_index: Option<usize>,
) -> (SVector<f64, R>, SMatrix<f64, R, R>) {
    let mean = weighted_mean(points, weights, angle_index);

    let mut cov = SMatrix::<f64, R, R>::zeros();
    for i in 0..N_SIGMA {
        let diff = residual(&points.column(i).into_owned(), &mean, angle_index);
        cov += weights.w[i] * diff * diff.transpose();
    }
    (mean, cov)
}
