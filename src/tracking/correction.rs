//! Kalman correction step shared by every sensor

use nalgebra::SVector;

use crate::common::{
    normalize_angle, FusionError, FusionResult, StateCovariance, StateVector, YAW_INDEX,
};
use crate::tracking::covariance::condition_covariance;
use crate::tracking::measurement_model::MeasurementPrediction;
use crate::tracking::recovery::residual;

/// Posterior state, covariance and consistency score of one correction
#[derive(Debug, Clone)]
pub struct Correction {
    pub state: StateVector,
    pub covariance: StateCovariance,
    /// Normalized innovation squared
    pub nis: f64,
}

/// Fuse measurement `z` with a prediction.
///
/// Fails without side effects when the innovation covariance cannot be
/// inverted or the posterior is not finite.
pub fn correct<const NZ: usize>(
    x_pred: &StateVector,
    p_pred: &StateCovariance,
    prediction: &MeasurementPrediction<NZ>,
    z: &SVector<f64, NZ>,
    angle_index: Option<usize>,
) -> FusionResult<Correction> {
    let s_inv = prediction.s.try_inverse().ok_or_else(|| {
        FusionError::NumericalError("innovation covariance is singular".to_string())
    })?;

    let k = prediction.cross_covariance * s_inv;
    let innovation = residual(z, &prediction.z_pred, angle_index);

    let mut state = x_pred + k * innovation;
    state[YAW_INDEX] = normalize_angle(state[YAW_INDEX]);

    let covariance = condition_covariance(&(p_pred - k * prediction.s * k.transpose()));
    let nis = innovation.dot(&(s_inv * innovation));

    if !nis.is_finite()
        || state.iter().any(|v| !v.is_finite())
        || covariance.iter().any(|v| !v.is_finite())
    {
        return Err(FusionError::NumericalError(
            "correction produced non-finite values".to_string(),
        ));
    }

    Ok(Correction {
        state,
        covariance,
        nis,
    })
}
