//! Synthetic CTRV scenarios with noisy lidar and radar measurements

use nalgebra::{Vector2, Vector3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::common::{
    normalize_angle, AugStateVector, CartesianState, FusionError, FusionResult,
    MeasurementPackage, Point2D, SensorType, StateVector, YAW_INDEX,
};
use crate::tracking::measurement_model::RANGE_EPSILON;
use crate::tracking::process_model::propagate_ctrv;
use crate::tracking::UKFConfig;
use crate::utils::metrics::state_to_cartesian;

/// Which sensor reports at each step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorPattern {
    /// Lidar on even steps, radar on odd steps
    Alternating,
    LidarOnly,
    RadarOnly,
}

impl SensorPattern {
    fn sensor_at(&self, step: usize) -> SensorType {
        match self {
            SensorPattern::Alternating if step % 2 == 0 => SensorType::Lidar,
            SensorPattern::Alternating => SensorType::Radar,
            SensorPattern::LidarOnly => SensorType::Lidar,
            SensorPattern::RadarOnly => SensorType::Radar,
        }
    }
}

/// Scenario generation parameters
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    /// True initial CTRV state (px, py, v, yaw, yaw rate)
    pub initial_state: StateVector,
    /// Number of measurements
    pub steps: usize,
    /// Time between consecutive measurements [us]
    pub dt_us: i64,
    pub start_timestamp_us: i64,
    /// Std of longitudinal and yaw acceleration driving the truth
    pub process_noise: Vector2<f64>,
    pub lidar_noise: Vector2<f64>,
    pub radar_noise: Vector3<f64>,
    pub pattern: SensorPattern,
    pub seed: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            initial_state: StateVector::new(10.0, 5.0, 4.0, 0.3, 0.1),
            steps: 500,
            dt_us: 50_000,
            start_timestamp_us: 1_477_010_443_000_000,
            process_noise: Vector2::new(1.5, 0.6),
            lidar_noise: Vector2::new(0.15, 0.15),
            radar_noise: Vector3::new(0.3, 0.03, 0.3),
            pattern: SensorPattern::Alternating,
            seed: 42,
        }
    }
}

impl ScenarioConfig {
    /// Default scenario whose noise levels match the filter's assumptions
    pub fn matching(filter: &UKFConfig) -> Self {
        let pattern = match (filter.use_lidar, filter.use_radar) {
            (true, false) => SensorPattern::LidarOnly,
            (false, true) => SensorPattern::RadarOnly,
            _ => SensorPattern::Alternating,
        };
        Self {
            process_noise: filter.process_noise,
            lidar_noise: filter.lidar_noise,
            radar_noise: filter.radar_noise,
            pattern,
            ..Self::default()
        }
    }

    /// Validate scenario parameters
    pub fn validate(&self) -> FusionResult<()> {
        if self.steps == 0 {
            return Err(FusionError::InvalidParameter("steps must be positive".to_string()));
        }
        if self.dt_us <= 0 {
            return Err(FusionError::InvalidParameter("dt_us must be positive".to_string()));
        }
        if !self.initial_state.iter().all(|v| v.is_finite()) {
            return Err(FusionError::InvalidParameter(
                "initial state must be finite".to_string(),
            ));
        }
        let stds = self
            .process_noise
            .iter()
            .chain(self.lidar_noise.iter())
            .chain(self.radar_noise.iter());
        for &std in stds {
            if !std.is_finite() || std < 0.0 {
                return Err(FusionError::InvalidParameter(format!(
                    "noise std must be finite and non-negative, got {}",
                    std
                )));
            }
        }
        Ok(())
    }
}

/// Generated measurement stream with the truth at each measurement time
#[derive(Debug, Clone)]
pub struct Scenario {
    pub measurements: Vec<MeasurementPackage>,
    /// Cartesian truth (px, py, vx, vy), one per measurement
    pub ground_truth: Vec<CartesianState>,
}

impl Scenario {
    /// Measured positions of one sensor, radar converted from polar
    pub fn measurement_positions(&self, sensor: SensorType) -> Vec<Point2D> {
        self.measurements
            .iter()
            .filter(|m| m.sensor_type() == sensor)
            .map(|m| m.position())
            .collect()
    }

    pub fn ground_truth_positions(&self) -> Vec<Point2D> {
        self.ground_truth.iter().map(|g| Point2D::new(g[0], g[1])).collect()
    }
}

fn normal(std: f64) -> FusionResult<Normal<f64>> {
    Normal::new(0.0, std).map_err(|e| FusionError::InvalidParameter(e.to_string()))
}

/// Noise-free radar observation of a state
fn radar_observation(x: &StateVector) -> Vector3<f64> {
    let (px, py, v, yaw) = (x[0], x[1], x[2], x[3]);
    let rho = px.hypot(py);
    let phi = py.atan2(px);
    let rho_dot = if rho < RANGE_EPSILON {
        0.0
    } else {
        (px * yaw.cos() * v + py * yaw.sin() * v) / rho
    };
    Vector3::new(rho, phi, rho_dot)
}

/// Generate a seeded scenario.
///
/// The truth follows the CTRV model driven by Gaussian longitudinal and yaw
/// accelerations, so a filter configured with the same noise is consistent.
pub fn generate_scenario(config: &ScenarioConfig) -> FusionResult<Scenario> {
    config.validate()?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let accel = normal(config.process_noise[0])?;
    let yaw_accel = normal(config.process_noise[1])?;
    let lidar_px = normal(config.lidar_noise[0])?;
    let lidar_py = normal(config.lidar_noise[1])?;
    let radar_rho = normal(config.radar_noise[0])?;
    let radar_phi = normal(config.radar_noise[1])?;
    let radar_rho_dot = normal(config.radar_noise[2])?;

    let dt = config.dt_us as f64 / 1.0e6;
    let mut x = config.initial_state;
    x[YAW_INDEX] = normalize_angle(x[YAW_INDEX]);

    let mut measurements = Vec::with_capacity(config.steps);
    let mut ground_truth = Vec::with_capacity(config.steps);

    for step in 0..config.steps {
        if step > 0 {
            let mut aug = AugStateVector::zeros();
            aug.fixed_rows_mut::<5>(0).copy_from(&x);
            aug[5] = accel.sample(&mut rng);
            aug[6] = yaw_accel.sample(&mut rng);
            x = propagate_ctrv(&aug, dt);
            x[YAW_INDEX] = normalize_angle(x[YAW_INDEX]);
        }

        let timestamp_us = config.start_timestamp_us + step as i64 * config.dt_us;
        let measurement = match config.pattern.sensor_at(step) {
            SensorType::Lidar => MeasurementPackage::lidar(
                timestamp_us,
                x[0] + lidar_px.sample(&mut rng),
                x[1] + lidar_py.sample(&mut rng),
            ),
            SensorType::Radar => {
                let z = radar_observation(&x);
                MeasurementPackage::radar(
                    timestamp_us,
                    z[0] + radar_rho.sample(&mut rng),
                    normalize_angle(z[1] + radar_phi.sample(&mut rng)),
                    z[2] + radar_rho_dot.sample(&mut rng),
                )
            }
        };

        measurements.push(measurement);
        ground_truth.push(state_to_cartesian(&x));
    }

    Ok(Scenario {
        measurements,
        ground_truth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::SensorData;
    use approx::assert_abs_diff_eq;

    fn noiseless() -> ScenarioConfig {
        ScenarioConfig {
            process_noise: Vector2::zeros(),
            lidar_noise: Vector2::zeros(),
            radar_noise: Vector3::zeros(),
            steps: 20,
            ..ScenarioConfig::default()
        }
    }

    #[test]
    fn test_default_scenario_shape() {
        let config = ScenarioConfig::default();
        let scenario = generate_scenario(&config).unwrap();
        assert_eq!(scenario.measurements.len(), config.steps);
        assert_eq!(scenario.ground_truth.len(), config.steps);

        for (i, m) in scenario.measurements.iter().enumerate() {
            let expected = if i % 2 == 0 { SensorType::Lidar } else { SensorType::Radar };
            assert_eq!(m.sensor_type(), expected);
            assert_eq!(m.timestamp_us, config.start_timestamp_us + i as i64 * config.dt_us);
        }
    }

    #[test]
    fn test_seed_reproducibility() {
        let config = ScenarioConfig { steps: 50, ..ScenarioConfig::default() };
        let a = generate_scenario(&config).unwrap();
        let b = generate_scenario(&config).unwrap();
        assert_eq!(a.measurements, b.measurements);

        let other = ScenarioConfig { seed: 7, ..config };
        let c = generate_scenario(&other).unwrap();
        assert_ne!(a.measurements, c.measurements);
    }

    #[test]
    fn test_noiseless_lidar_measures_truth() {
        let config = ScenarioConfig { pattern: SensorPattern::LidarOnly, ..noiseless() };
        let scenario = generate_scenario(&config).unwrap();
        for (m, truth) in scenario.measurements.iter().zip(&scenario.ground_truth) {
            let p = m.position();
            assert_abs_diff_eq!(p.x, truth[0], epsilon = 1e-12);
            assert_abs_diff_eq!(p.y, truth[1], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_noiseless_radar_measures_truth() {
        let config = ScenarioConfig { pattern: SensorPattern::RadarOnly, ..noiseless() };
        let scenario = generate_scenario(&config).unwrap();
        for (m, truth) in scenario.measurements.iter().zip(&scenario.ground_truth) {
            let SensorData::Radar(z) = m.data else {
                panic!("expected radar measurement");
            };
            let range = truth[0].hypot(truth[1]);
            assert_abs_diff_eq!(z[0], range, epsilon = 1e-9);
            assert_abs_diff_eq!(z[1], truth[1].atan2(truth[0]), epsilon = 1e-9);
            let rate = (truth[0] * truth[2] + truth[1] * truth[3]) / range;
            assert_abs_diff_eq!(z[2], rate, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_noiseless_truth_follows_ctrv() {
        let config = noiseless();
        let scenario = generate_scenario(&config).unwrap();
        // Constant speed along the whole trajectory
        for truth in &scenario.ground_truth {
            assert_abs_diff_eq!(truth[2].hypot(truth[3]), 4.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_matching_config() {
        let filter = UKFConfig {
            use_radar: false,
            ..UKFConfig::default()
        };
        let config = ScenarioConfig::matching(&filter);
        assert_eq!(config.pattern, SensorPattern::LidarOnly);
        assert_eq!(config.lidar_noise, filter.lidar_noise);
        assert_eq!(config.process_noise, filter.process_noise);
    }

    #[test]
    fn test_invalid_config() {
        let zero_steps = ScenarioConfig { steps: 0, ..ScenarioConfig::default() };
        assert!(matches!(
            generate_scenario(&zero_steps),
            Err(FusionError::InvalidParameter(_))
        ));

        let negative_noise = ScenarioConfig {
            lidar_noise: Vector2::new(-0.1, 0.1),
            ..ScenarioConfig::default()
        };
        assert!(generate_scenario(&negative_noise).is_err());

        let bad_dt = ScenarioConfig { dt_us: 0, ..ScenarioConfig::default() };
        assert!(bad_dt.validate().is_err());
    }
}
