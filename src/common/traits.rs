//! Common traits defining the seams between the filter and its collaborators

use nalgebra::{SMatrix, SVector};

use crate::common::types::{CycleOutcome, SensorType, StateVector};

/// Trait for recursive state estimators fed one measurement at a time
pub trait StateEstimator {
    /// State type used by this estimator
    type State;
    /// Covariance type used by this estimator
    type Covariance;
    /// Measurement type used by this estimator
    type Measurement;

    /// Run one predict/update cycle for a measurement, in arrival order
    fn process_measurement(&mut self, measurement: &Self::Measurement) -> CycleOutcome;

    /// Get current state estimate
    fn get_state(&self) -> &Self::State;

    /// Get current covariance estimate
    fn get_covariance(&self) -> &Self::Covariance;

    /// Whether the estimator has been seeded
    fn is_initialized(&self) -> bool;

    /// Latest normalized innovation squared for a sensor, if that sensor has been used
    fn nis(&self, _sensor: SensorType) -> Option<f64> {
        None
    }
}

/// Nonlinear projection of a state into one sensor's measurement space.
///
/// `NZ` is the measurement dimension.
pub trait MeasurementModel<const NZ: usize> {
    /// Sensor this model describes
    const SENSOR: SensorType;

    /// Index of a circular component of the measurement, wrapped in residuals
    const ANGLE_INDEX: Option<usize> = None;

    /// Predict measurement from state
    fn project(&self, state: &StateVector) -> SVector<f64, NZ>;

    /// Additive measurement noise covariance
    fn noise_covariance(&self) -> &SMatrix<f64, NZ, NZ>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix1, Vector1};

    struct SpeedSensor {
        r: Matrix1<f64>,
    }

    impl MeasurementModel<1> for SpeedSensor {
        const SENSOR: SensorType = SensorType::Lidar;

        fn project(&self, state: &StateVector) -> Vector1<f64> {
            Vector1::new(state[2])
        }

        fn noise_covariance(&self) -> &Matrix1<f64> {
            &self.r
        }
    }

    #[test]
    fn test_measurement_model_defaults() {
        let sensor = SpeedSensor { r: Matrix1::new(0.5) };
        let z = sensor.project(&StateVector::new(0.0, 0.0, 3.0, 0.0, 0.0));
        assert_eq!(z[0], 3.0);
        assert_eq!(SpeedSensor::ANGLE_INDEX, None);
        assert_eq!(sensor.noise_covariance()[(0, 0)], 0.5);
    }
}
