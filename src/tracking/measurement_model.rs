//! Lidar and radar measurement models and the shared unscented projection

use nalgebra::{Matrix2, Matrix3, SMatrix, SVector, Vector2, Vector3};

use crate::common::{
    MeasurementModel, SensorType, SigmaPoints, StateVector, BEARING_INDEX, N_SIGMA, N_X,
    N_Z_LIDAR, N_Z_RADAR, YAW_INDEX,
};
use crate::tracking::recovery::{residual, weighted_mean};
use crate::tracking::sigma_points::SigmaWeights;

/// Ranges closer than this are treated as zero when computing range rate
pub const RANGE_EPSILON: f64 = 1e-4;

/// Lidar: direct observation of position
#[derive(Debug, Clone)]
pub struct LidarModel {
    r: Matrix2<f64>,
}

impl LidarModel {
    /// Create from noise standard deviations (px, py) in meters
    pub fn new(noise_std: &Vector2<f64>) -> Self {
        Self {
            r: Matrix2::from_diagonal(&noise_std.map(|s| s * s)),
        }
    }
}

impl MeasurementModel<N_Z_LIDAR> for LidarModel {
    const SENSOR: SensorType = SensorType::Lidar;

    fn project(&self, state: &StateVector) -> Vector2<f64> {
        Vector2::new(state[0], state[1])
    }

    fn noise_covariance(&self) -> &Matrix2<f64> {
        &self.r
    }
}

/// Radar: range, bearing and range rate seen from the origin
#[derive(Debug, Clone)]
pub struct RadarModel {
    r: Matrix3<f64>,
}

impl RadarModel {
    /// Create from noise standard deviations (range m, bearing rad, range rate m/s)
    pub fn new(noise_std: &Vector3<f64>) -> Self {
        Self {
            r: Matrix3::from_diagonal(&noise_std.map(|s| s * s)),
        }
    }
}

impl MeasurementModel<N_Z_RADAR> for RadarModel {
    const SENSOR: SensorType = SensorType::Radar;
    const ANGLE_INDEX: Option<usize> = Some(BEARING_INDEX);

    fn project(&self, state: &StateVector) -> Vector3<f64> {
        let p_x = state[0];
        let p_y = state[1];
        let v = state[2];
        let yaw = state[3];

        let rho = p_x.hypot(p_y);
        let phi = p_y.atan2(p_x);
        let rho_dot = if rho < RANGE_EPSILON {
            0.0
        } else {
            (p_x * v * yaw.cos() + p_y * v * yaw.sin()) / rho
        };
        Vector3::new(rho, phi, rho_dot)
    }

    fn noise_covariance(&self) -> &Matrix3<f64> {
        &self.r
    }
}

/// Predicted sigma points mapped into a measurement space
#[derive(Debug, Clone)]
pub struct MeasurementPrediction<const NZ: usize> {
    /// Projected sigma points, one per column
    pub z_sigma: SMatrix<f64, NZ, N_SIGMA>,
    /// Predicted measurement mean
    pub z_pred: SVector<f64, NZ>,
    /// Innovation covariance, including measurement noise
    pub s: SMatrix<f64, NZ, NZ>,
    /// Cross-covariance between state and measurement space
    pub cross_covariance: SMatrix<f64, N_X, NZ>,
}

/// Project predicted sigma points through `model` and recover the predicted
/// measurement, the innovation covariance and the state/measurement
/// cross-covariance.
pub fn predict_measurement<const NZ: usize, M: MeasurementModel<NZ>>(
    model: &M,
    sigma_pred: &SigmaPoints,
    x_pred: &StateVector,
    weights: &SigmaWeights,
) -> MeasurementPrediction<NZ> {
    let mut z_sigma = SMatrix::<f64, NZ, N_SIGMA>::zeros();
    for i in 0..N_SIGMA {
        let x = sigma_pred.column(i).into_owned();
        z_sigma.set_column(i, &model.project(&x));
    }

    let z_pred = weighted_mean(&z_sigma, weights, M::ANGLE_INDEX);

    let mut s = SMatrix::<f64, NZ, NZ>::zeros();
    let mut cross_covariance = SMatrix::<f64, N_X, NZ>::zeros();
    for i in 0..N_SIGMA {
        let z_diff = residual(&z_sigma.column(i).into_owned(), &z_pred, M::ANGLE_INDEX);
        let x_diff = residual(&sigma_pred.column(i).into_owned(), x_pred, Some(YAW_INDEX));
        s += weights.w[i] * z_diff * z_diff.transpose();
        cross_covariance += weights.w[i] * x_diff * z_diff.transpose();
    }
    s += model.noise_covariance();

    MeasurementPrediction {
        z_sigma,
        z_pred,
        s,
        cross_covariance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{StateCovariance, N_AUG};
    use crate::tracking::process_model::predict_sigma_points;
    use crate::tracking::recovery::recover_moments;
    use crate::tracking::sigma_points::generate_augmented_sigma_points;
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector5;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn predicted(x: StateVector, p: StateCovariance) -> (SigmaPoints, StateVector, SigmaWeights) {
        let weights = SigmaWeights::new(3.0 - N_AUG as f64).unwrap();
        let aug = generate_augmented_sigma_points(&x, &p, &Vector2::new(0.5, 0.3), &weights)
            .unwrap();
        let sigma_pred = predict_sigma_points(&aug, 0.1);
        let (x_pred, _) = recover_moments(&sigma_pred, &weights, Some(YAW_INDEX));
        (sigma_pred, x_pred, weights)
    }

    #[test]
    fn test_lidar_projection() {
        let model = LidarModel::new(&Vector2::new(0.15, 0.15));
        let z = model.project(&StateVector::new(1.0, 2.0, 3.0, 0.4, 0.1));
        assert_eq!(z, Vector2::new(1.0, 2.0));
        assert_abs_diff_eq!(model.noise_covariance()[(0, 0)], 0.0225, epsilon = 1e-15);
        assert_eq!(model.noise_covariance()[(0, 1)], 0.0);
    }

    #[test]
    fn test_radar_projection() {
        let model = RadarModel::new(&Vector3::new(0.3, 0.03, 0.3));
        // moving straight away from the origin along +y
        let z = model.project(&StateVector::new(0.0, 4.0, 2.0, FRAC_PI_2, 0.0));
        assert_abs_diff_eq!(z[0], 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(z[1], FRAC_PI_2, epsilon = 1e-12);
        assert_abs_diff_eq!(z[2], 2.0, epsilon = 1e-12);
        assert_eq!(RadarModel::ANGLE_INDEX, Some(BEARING_INDEX));
    }

    #[test]
    fn test_radar_projection_at_origin() {
        let model = RadarModel::new(&Vector3::new(0.3, 0.03, 0.3));
        let z = model.project(&StateVector::new(0.0, 0.0, 5.0, 1.0, 0.0));
        assert!(z.iter().all(|v| v.is_finite()));
        assert_eq!(z[0], 0.0);
        assert_eq!(z[2], 0.0);
    }

    #[test]
    fn test_lidar_prediction_adds_noise_once() {
        let x = StateVector::new(3.0, 4.0, 1.0, 0.2, 0.05);
        let p = StateCovariance::from_diagonal(&Vector5::new(0.2, 0.3, 0.5, 0.1, 0.05));
        let (sigma_pred, x_pred, weights) = predicted(x, p);
        let model = LidarModel::new(&Vector2::new(0.15, 0.15));
        let prediction = predict_measurement(&model, &sigma_pred, &x_pred, &weights);

        let (_, p_pred) = recover_moments(&sigma_pred, &weights, Some(YAW_INDEX));
        assert_abs_diff_eq!(prediction.z_pred[0], x_pred[0], epsilon = 1e-12);
        assert_abs_diff_eq!(prediction.z_pred[1], x_pred[1], epsilon = 1e-12);
        assert_abs_diff_eq!(prediction.s[(0, 0)], p_pred[(0, 0)] + 0.0225, epsilon = 1e-12);
        assert_abs_diff_eq!(prediction.s[(1, 1)], p_pred[(1, 1)] + 0.0225, epsilon = 1e-12);
        // lidar is linear, so the cross-covariance is the position columns of P
        for r in 0..N_X {
            assert_abs_diff_eq!(prediction.cross_covariance[(r, 0)], p_pred[(r, 0)], epsilon = 1e-12);
            assert_abs_diff_eq!(prediction.cross_covariance[(r, 1)], p_pred[(r, 1)], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_radar_prediction_behind_sensor() {
        // target on the negative x axis: bearings straddle +-pi
        let x = StateVector::new(-10.0, 0.0, 2.0, PI, 0.0);
        let p = StateCovariance::from_diagonal(&Vector5::new(0.5, 0.5, 0.2, 0.05, 0.01));
        let (sigma_pred, x_pred, weights) = predicted(x, p);
        let model = RadarModel::new(&Vector3::new(0.3, 0.03, 0.3));
        let prediction = predict_measurement(&model, &sigma_pred, &x_pred, &weights);

        assert!(prediction.z_pred[1].abs() > 3.0);
        assert!(prediction.z_pred[1] > -PI && prediction.z_pred[1] <= PI);
        // bearing spread stays small when residuals are wrapped
        assert!(prediction.s[(1, 1)] < 0.1);
        assert_abs_diff_eq!((prediction.s - prediction.s.transpose()).amax(), 0.0, epsilon = 1e-12);
    }
}
