//! Evaluation of estimates against ground truth

use itertools::Itertools;

use crate::common::{CartesianState, FusionError, FusionResult, StateVector};

/// Convert a CTRV state to cartesian [px, py, vx, vy]
pub fn state_to_cartesian(x: &StateVector) -> CartesianState {
    let (v, yaw) = (x[2], x[3]);
    CartesianState::new(x[0], x[1], v * yaw.cos(), v * yaw.sin())
}

/// Root mean squared error per component
pub fn calculate_rmse(
    estimations: &[CartesianState],
    ground_truth: &[CartesianState],
) -> FusionResult<CartesianState> {
    if estimations.is_empty() {
        return Err(FusionError::EstimationError(
            "no estimations to evaluate".to_string(),
        ));
    }
    if estimations.len() != ground_truth.len() {
        return Err(FusionError::EstimationError(format!(
            "estimation count {} does not match ground truth count {}",
            estimations.len(),
            ground_truth.len()
        )));
    }

    let sum = estimations
        .iter()
        .zip_eq(ground_truth)
        .fold(CartesianState::zeros(), |acc, (est, gt)| {
            let residual = est - gt;
            acc + residual.component_mul(&residual)
        });

    Ok((sum / estimations.len() as f64).map(f64::sqrt))
}
