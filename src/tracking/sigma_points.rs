//! Sigma point weights and augmented sigma point generation

use nalgebra::{SVector, Vector2};

use crate::common::{
    AugCovariance, AugSigmaPoints, AugStateVector, FusionError, FusionResult, StateCovariance,
    StateVector, N_AUG, N_SIGMA, N_X,
};
use crate::tracking::covariance::matrix_sqrt;

/// Unscented transform weights, fixed for the life of a filter
#[derive(Debug, Clone)]
pub struct SigmaWeights {
    /// One weight per sigma point, shared by mean and covariance
    pub w: SVector<f64, N_SIGMA>,
    /// Spreading parameter
    pub lambda: f64,
    /// Scaling of the covariance square root: sqrt(lambda + n_aug)
    pub gamma: f64,
}

impl SigmaWeights {
    /// Create weights for the augmented dimension and spreading parameter `lambda`
    pub fn new(lambda: f64) -> FusionResult<Self> {
        let n_aug = N_AUG as f64;
        if !lambda.is_finite() || lambda + n_aug <= 0.0 {
            return Err(FusionError::InvalidParameter(format!(
                "lambda + n_aug must be positive, got lambda = {}",
                lambda
            )));
        }

        Ok(Self::compute(lambda))
    }

    /// Weights for a `lambda` already known to satisfy `lambda + n_aug > 0`
    pub(crate) fn compute(lambda: f64) -> Self {
        let n_aug = N_AUG as f64;
        let mut w = SVector::<f64, N_SIGMA>::repeat(0.5 / (lambda + n_aug));
        w[0] = lambda / (lambda + n_aug);

        Self {
            w,
            lambda,
            gamma: (lambda + n_aug).sqrt(),
        }
    }
}

/// Build the augmented mean and covariance from the state and the process
/// noise standard deviations (longitudinal acceleration, yaw acceleration).
pub fn augment(
    x: &StateVector,
    p: &StateCovariance,
    process_noise: &Vector2<f64>,
) -> (AugStateVector, AugCovariance) {
    let mut x_aug = AugStateVector::zeros();
    x_aug.fixed_rows_mut::<N_X>(0).copy_from(x);

    let mut p_aug = AugCovariance::zeros();
    p_aug.fixed_view_mut::<N_X, N_X>(0, 0).copy_from(p);
    p_aug[(N_X, N_X)] = process_noise[0].powi(2);
    p_aug[(N_X + 1, N_X + 1)] = process_noise[1].powi(2);

    (x_aug, p_aug)
}

/// Generate the 2 * n_aug + 1 augmented sigma points.
///
/// The augmented covariance is block diagonal, so its square root is the
/// square root of `p` next to the noise standard deviations.
pub fn generate_augmented_sigma_points(
    x: &StateVector,
    p: &StateCovariance,
    process_noise: &Vector2<f64>,
    weights: &SigmaWeights,
) -> FusionResult<AugSigmaPoints> {
    let (x_aug, _) = augment(x, p, process_noise);

    let mut sqrt_aug = AugCovariance::zeros();
    sqrt_aug
        .fixed_view_mut::<N_X, N_X>(0, 0)
        .copy_from(&matrix_sqrt(p)?);
    sqrt_aug[(N_X, N_X)] = process_noise[0];
    sqrt_aug[(N_X + 1, N_X + 1)] = process_noise[1];

    let mut sigma = AugSigmaPoints::zeros();
    sigma.set_column(0, &x_aug);
    for i in 0..N_AUG {
        let offset = weights.gamma * sqrt_aug.column(i);
        sigma.set_column(i + 1, &(x_aug + offset));
        sigma.set_column(i + 1 + N_AUG, &(x_aug - offset));
    }

    if sigma.iter().any(|v| !v.is_finite()) {
        return Err(FusionError::NumericalError(
            "sigma points are not finite".to_string(),
        ));
    }
    Ok(sigma)
}
