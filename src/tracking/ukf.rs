//! Unscented Kalman Filter (UKF) fusing lidar and radar measurements
//!
//! Tracks one object with a constant turn rate and velocity (CTRV) motion
//! model. Sigma points are drawn over the state augmented with the two
//! process noise variables, propagated through the nonlinear motion model
//! and projected into each sensor's measurement space, so neither the
//! motion model nor the radar model is ever linearized.

use nalgebra::{SVector, Vector2, Vector3};
use std::f64::consts::PI;
use tracing::{debug, info, warn};

use crate::common::{
    normalize_angle, CycleOutcome, FusionError, FusionResult, MeasurementModel,
    MeasurementPackage, SensorData, SensorType, SigmaPoints, StateCovariance, StateEstimator,
    StateVector, N_AUG, YAW_INDEX,
};
use crate::tracking::correction::{correct, Correction};
use crate::tracking::covariance::condition_covariance;
use crate::tracking::measurement_model::{predict_measurement, LidarModel, RadarModel};
use crate::tracking::nis::NisRecord;
use crate::tracking::process_model::predict_sigma_points;
use crate::tracking::recovery::recover_moments;
use crate::tracking::sigma_points::{generate_augmented_sigma_points, SigmaWeights};

/// UKF scaling parameters
#[derive(Debug, Clone)]
pub struct UKFParams {
    /// Lambda: sigma point spreading parameter (default: 3 - n_aug)
    pub lambda: f64,
}

impl Default for UKFParams {
    fn default() -> Self {
        Self {
            lambda: 3.0 - N_AUG as f64,
        }
    }
}

/// Configuration for the fusion filter, fixed at construction
#[derive(Debug, Clone)]
pub struct UKFConfig {
    /// UKF scaling parameters
    pub params: UKFParams,
    /// If false, lidar measurements are ignored (including for initialization)
    pub use_lidar: bool,
    /// If false, radar measurements are ignored (including for initialization)
    pub use_radar: bool,
    /// Process noise std: longitudinal acceleration [m/s^2], yaw acceleration [rad/s^2]
    pub process_noise: Vector2<f64>,
    /// Lidar noise std: px [m], py [m]
    pub lidar_noise: Vector2<f64>,
    /// Radar noise std: range [m], bearing [rad], range rate [m/s]
    pub radar_noise: Vector3<f64>,
    /// Initial std of speed [m/s], yaw [rad] and yaw rate [rad/s]
    pub initial_std: Vector3<f64>,
}

impl Default for UKFConfig {
    fn default() -> Self {
        Self {
            params: UKFParams::default(),
            use_lidar: true,
            use_radar: true,
            process_noise: Vector2::new(1.5, 0.6),
            lidar_noise: Vector2::new(0.15, 0.15),
            radar_noise: Vector3::new(0.3, 0.03, 0.3),
            initial_std: Vector3::new(5.0, 1.0, 0.5),
        }
    }
}

fn check_stds(name: &str, values: &[f64], allow_zero: bool) -> FusionResult<()> {
    for &v in values {
        let valid = v.is_finite() && if allow_zero { v >= 0.0 } else { v > 0.0 };
        if !valid {
            return Err(FusionError::InvalidParameter(format!(
                "{} standard deviation must be {}, got {}",
                name,
                if allow_zero { "non-negative" } else { "positive" },
                v
            )));
        }
    }
    Ok(())
}

impl UKFConfig {
    /// Reject parameters the filter cannot run with
    pub fn validate(&self) -> FusionResult<()> {
        check_stds("process noise", self.process_noise.as_slice(), true)?;
        check_stds("lidar noise", self.lidar_noise.as_slice(), false)?;
        check_stds("radar noise", self.radar_noise.as_slice(), false)?;
        check_stds("initial", self.initial_std.as_slice(), false)?;
        if !self.use_lidar && !self.use_radar {
            return Err(FusionError::InvalidParameter(
                "at least one sensor must be enabled".to_string(),
            ));
        }
        SigmaWeights::new(self.params.lambda).map(|_| ())
    }

    pub fn sensor_enabled(&self, sensor: SensorType) -> bool {
        match sensor {
            SensorType::Lidar => self.use_lidar,
            SensorType::Radar => self.use_radar,
        }
    }
}

/// Lifecycle of the filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStatus {
    /// Waiting for the first enabled measurement
    Uninitialized,
    /// Seeded; holds the time the state refers to
    Running { last_timestamp_us: i64 },
}

/// Unscented Kalman Filter for single-object lidar/radar tracking
#[derive(Debug, Clone)]
pub struct UnscentedKalmanFilter {
    status: FilterStatus,
    /// Current state estimate [px, py, v, yaw, yaw_rate]
    x: StateVector,
    /// State covariance matrix
    p: StateCovariance,
    /// Covariance the filter was seeded with, restored after a failed prediction
    seed_covariance: StateCovariance,
    /// Sigma points from the latest prediction
    sigma_pred: Option<SigmaPoints>,
    weights: SigmaWeights,
    lidar: LidarModel,
    radar: RadarModel,
    nis_lidar: Option<f64>,
    nis_radar: Option<f64>,
    /// Number of completed predict/update cycles
    cycles: u64,
    config: UKFConfig,
}

impl UnscentedKalmanFilter {
    /// Create a new filter, rejecting invalid configuration
    pub fn new(config: UKFConfig) -> FusionResult<Self> {
        config.validate()?;
        let weights = SigmaWeights::new(config.params.lambda)?;
        Ok(Self::from_parts(config, weights))
    }

    /// Create with default configuration
    pub fn with_defaults() -> Self {
        let config = UKFConfig::default();
        let weights = SigmaWeights::compute(config.params.lambda);
        Self::from_parts(config, weights)
    }

    /// Create an already running filter from a known state
    pub fn with_initial_state(
        x: StateVector,
        p: StateCovariance,
        timestamp_us: i64,
        config: UKFConfig,
    ) -> FusionResult<Self> {
        let mut ukf = Self::new(config)?;
        ukf.x = x;
        ukf.p = condition_covariance(&p);
        ukf.seed_covariance = ukf.p;
        ukf.status = FilterStatus::Running {
            last_timestamp_us: timestamp_us,
        };
        Ok(ukf)
    }

    fn from_parts(config: UKFConfig, weights: SigmaWeights) -> Self {
        Self {
            status: FilterStatus::Uninitialized,
            x: StateVector::zeros(),
            p: StateCovariance::identity(),
            seed_covariance: StateCovariance::identity(),
            sigma_pred: None,
            weights,
            lidar: LidarModel::new(&config.lidar_noise),
            radar: RadarModel::new(&config.radar_noise),
            nis_lidar: None,
            nis_radar: None,
            cycles: 0,
            config,
        }
    }

    /// Get current state estimate
    pub fn state(&self) -> &StateVector {
        &self.x
    }

    /// Get state covariance
    pub fn covariance(&self) -> &StateCovariance {
        &self.p
    }

    pub fn status(&self) -> FilterStatus {
        self.status
    }

    pub fn config(&self) -> &UKFConfig {
        &self.config
    }

    pub fn weights(&self) -> &SigmaWeights {
        &self.weights
    }

    /// Sigma points of the latest prediction, if one has run
    pub fn predicted_sigma_points(&self) -> Option<&SigmaPoints> {
        self.sigma_pred.as_ref()
    }

    /// Latest NIS for a sensor; `None` until that sensor has updated the filter
    pub fn nis(&self, sensor: SensorType) -> Option<f64> {
        match sensor {
            SensorType::Lidar => self.nis_lidar,
            SensorType::Radar => self.nis_radar,
        }
    }

    /// Number of completed predict/update cycles
    pub fn cycle_count(&self) -> u64 {
        self.cycles
    }

    /// Snapshot of the latest NIS values, tagged with the sensor that produced the last update
    pub fn nis_record(&self, sensor: SensorType) -> NisRecord {
        NisRecord {
            cycle: self.cycles,
            sensor,
            lidar: self.nis_lidar,
            radar: self.nis_radar,
        }
    }

    /// Feed one measurement. Must be called in timestamp order.
    pub fn process_measurement(&mut self, measurement: &MeasurementPackage) -> CycleOutcome {
        let sensor = measurement.sensor_type();
        if !self.config.sensor_enabled(sensor) {
            debug!(%sensor, "sensor disabled, measurement ignored");
            return CycleOutcome::Ignored;
        }
        if !measurement.is_finite() {
            warn!(%sensor, timestamp_us = measurement.timestamp_us, "non-finite measurement rejected");
            return CycleOutcome::Rejected;
        }

        let last_timestamp_us = match self.status {
            FilterStatus::Uninitialized => {
                self.initialize(measurement);
                return CycleOutcome::Initialized;
            }
            FilterStatus::Running { last_timestamp_us } => last_timestamp_us,
        };

        let mut elapsed_us = measurement.timestamp_us.saturating_sub(last_timestamp_us);
        if elapsed_us < 0 {
            warn!(
                timestamp_us = measurement.timestamp_us,
                last_timestamp_us, "measurement out of order, clamping elapsed time to zero"
            );
            elapsed_us = 0;
        }
        let dt = elapsed_us as f64 * 1e-6;

        if let Err(e) = self.prediction(dt) {
            warn!(error = %e, "prediction failed, keeping prior state and resetting covariance");
            self.p = self.seed_covariance;
            return CycleOutcome::Skipped;
        }
        self.status = FilterStatus::Running {
            last_timestamp_us: last_timestamp_us.max(measurement.timestamp_us),
        };
        self.cycles += 1;

        let result = match &measurement.data {
            SensorData::Lidar(z) => self.update_lidar(z),
            SensorData::Radar(z) => self.update_radar(z),
        };
        match result {
            Ok(nis) => {
                debug!(cycle = self.cycles, %sensor, dt, nis, "update");
                CycleOutcome::Updated
            }
            Err(e) => {
                warn!(error = %e, %sensor, "update skipped, keeping prediction");
                CycleOutcome::PredictionOnly
            }
        }
    }

    /// Seed state and covariance from the first usable measurement
    fn initialize(&mut self, measurement: &MeasurementPackage) {
        let init = &self.config.initial_std;
        let (x, position_var) = match &measurement.data {
            SensorData::Lidar(z) => {
                let std = &self.config.lidar_noise;
                (
                    StateVector::new(z[0], z[1], 0.0, 0.0, 0.0),
                    Vector2::new(std[0].powi(2), std[1].powi(2)),
                )
            }
            SensorData::Radar(z) => {
                let (rho, phi, rho_dot) = (z[0], z[1], z[2]);
                // only the radial speed is observed; assume motion along the line of sight
                let yaw = if rho_dot < 0.0 { phi + PI } else { phi };
                let std = &self.config.radar_noise;
                let var = std[0].powi(2) + (rho * std[1]).powi(2);
                (
                    StateVector::new(
                        rho * phi.cos(),
                        rho * phi.sin(),
                        rho_dot.abs(),
                        normalize_angle(yaw),
                        0.0,
                    ),
                    Vector2::new(var, var),
                )
            }
        };

        self.x = x;
        self.p = StateCovariance::from_diagonal(&StateVector::new(
            position_var[0],
            position_var[1],
            init[0].powi(2),
            init[1].powi(2),
            init[2].powi(2),
        ));
        self.seed_covariance = self.p;
        self.status = FilterStatus::Running {
            last_timestamp_us: measurement.timestamp_us,
        };
        info!(
            sensor = %measurement.sensor_type(),
            px = self.x[0],
            py = self.x[1],
            "filter initialized"
        );
    }

    /// Predict sigma points, state and covariance `dt` seconds ahead.
    ///
    /// Leaves the filter untouched on failure.
    pub fn prediction(&mut self, dt: f64) -> FusionResult<()> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(FusionError::InvalidParameter(format!(
                "elapsed time must be non-negative, got {}",
                dt
            )));
        }

        let sigma_aug = generate_augmented_sigma_points(
            &self.x,
            &self.p,
            &self.config.process_noise,
            &self.weights,
        )?;
        let sigma_pred = predict_sigma_points(&sigma_aug, dt);
        let (x_pred, p_pred) = recover_moments(&sigma_pred, &self.weights, Some(YAW_INDEX));

        if x_pred.iter().chain(p_pred.iter()).any(|v| !v.is_finite()) {
            return Err(FusionError::NumericalError(
                "predicted moments are not finite".to_string(),
            ));
        }

        self.x = x_pred;
        self.p = condition_covariance(&p_pred);
        self.sigma_pred = Some(sigma_pred);
        Ok(())
    }

    /// Correct the prediction with a lidar position; returns the NIS
    pub fn update_lidar(&mut self, z: &Vector2<f64>) -> FusionResult<f64> {
        let correction = self.correction_for(&self.lidar, z)?;
        self.nis_lidar = Some(correction.nis);
        Ok(self.apply(correction))
    }

    /// Correct the prediction with a radar range/bearing/range rate; returns the NIS
    pub fn update_radar(&mut self, z: &Vector3<f64>) -> FusionResult<f64> {
        let correction = self.correction_for(&self.radar, z)?;
        self.nis_radar = Some(correction.nis);
        Ok(self.apply(correction))
    }

    fn correction_for<const NZ: usize, M: MeasurementModel<NZ>>(
        &self,
        model: &M,
        z: &SVector<f64, NZ>,
    ) -> FusionResult<Correction> {
        let sigma_pred = self.sigma_pred.as_ref().ok_or_else(|| {
            FusionError::EstimationError(format!("{} update requires a prediction first", M::SENSOR))
        })?;
        let prediction = predict_measurement(model, sigma_pred, &self.x, &self.weights);
        correct(&self.x, &self.p, &prediction, z, M::ANGLE_INDEX)
    }

    fn apply(&mut self, correction: Correction) -> f64 {
        self.x = correction.state;
        self.p = correction.covariance;
        correction.nis
    }
}

impl StateEstimator for UnscentedKalmanFilter {
    type State = StateVector;
    type Covariance = StateCovariance;
    type Measurement = MeasurementPackage;

    fn process_measurement(&mut self, measurement: &Self::Measurement) -> CycleOutcome {
        UnscentedKalmanFilter::process_measurement(self, measurement)
    }

    fn get_state(&self) -> &Self::State {
        &self.x
    }

    fn get_covariance(&self) -> &Self::Covariance {
        &self.p
    }

    fn is_initialized(&self) -> bool {
        self.status != FilterStatus::Uninitialized
    }

    fn nis(&self, sensor: SensorType) -> Option<f64> {
        UnscentedKalmanFilter::nis(self, sensor)
    }
}
