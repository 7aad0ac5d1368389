//! Feed a scenario through an estimator and score the result

use tracing::{debug, info};

use crate::common::{
    CartesianState, CycleOutcome, FusionResult, MeasurementPackage, SensorType, StateEstimator,
    StateVector,
};
use crate::simulation::scenario::Scenario;
use crate::tracking::nis::{NisRecord, NisSink};
use crate::utils::metrics::{calculate_rmse, state_to_cartesian};

/// Result of running one scenario
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    /// Outcome of every measurement, in order
    pub outcomes: Vec<CycleOutcome>,
    /// Cartesian estimates for every measurement after initialization
    pub estimates: Vec<CartesianState>,
    /// Truth aligned with `estimates`
    pub ground_truth: Vec<CartesianState>,
    /// Final state estimate, if the estimator was ever initialized
    pub final_state: Option<StateVector>,
    pub rmse: Option<CartesianState>,
}

impl ScenarioReport {
    pub fn count(&self, outcome: CycleOutcome) -> usize {
        self.outcomes.iter().filter(|&&o| o == outcome).count()
    }
}

/// Run every measurement of `scenario` through `estimator`.
///
/// A NIS record is forwarded to `sink` after each successful update. Sink
/// errors abort the run.
pub fn run_scenario<E>(
    estimator: &mut E,
    scenario: &Scenario,
    sink: &mut dyn NisSink,
) -> FusionResult<ScenarioReport>
where
    E: StateEstimator<State = StateVector, Measurement = MeasurementPackage>,
{
    let mut outcomes = Vec::with_capacity(scenario.measurements.len());
    let mut estimates = Vec::new();
    let mut ground_truth = Vec::new();
    let mut updates = 0u64;

    for (measurement, truth) in scenario.measurements.iter().zip(&scenario.ground_truth) {
        let outcome = estimator.process_measurement(measurement);
        outcomes.push(outcome);

        if outcome == CycleOutcome::Updated {
            updates += 1;
            sink.record(&NisRecord {
                cycle: updates,
                sensor: measurement.sensor_type(),
                lidar: estimator.nis(SensorType::Lidar),
                radar: estimator.nis(SensorType::Radar),
            })?;
        }

        if estimator.is_initialized() {
            estimates.push(state_to_cartesian(estimator.get_state()));
            ground_truth.push(*truth);
        }
    }

    let rmse = if estimates.is_empty() {
        None
    } else {
        Some(calculate_rmse(&estimates, &ground_truth)?)
    };
    let final_state = estimator.is_initialized().then(|| *estimator.get_state());

    debug!(measurements = outcomes.len(), updates, "scenario finished");
    if let Some(rmse) = &rmse {
        info!(
            px = rmse[0],
            py = rmse[1],
            vx = rmse[2],
            vy = rmse[3],
            "scenario RMSE"
        );
    }

    Ok(ScenarioReport {
        outcomes,
        estimates,
        ground_truth,
        final_state,
        rmse,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::FusionError;
    use crate::simulation::scenario::{generate_scenario, ScenarioConfig};
    use crate::tracking::covariance::max_asymmetry;
    use crate::tracking::nis::{NisCollector, CHI_SQUARED_95_2DOF, CHI_SQUARED_95_3DOF};
    use crate::tracking::{UKFConfig, UnscentedKalmanFilter};

    const WARM_UP: usize = 20;

    fn run_default() -> (UnscentedKalmanFilter, ScenarioReport, NisCollector) {
        let config = UKFConfig::default();
        let scenario = generate_scenario(&ScenarioConfig::matching(&config)).unwrap();
        let mut ukf = UnscentedKalmanFilter::new(config).unwrap();
        let mut collector = NisCollector::new();
        let report = run_scenario(&mut ukf, &scenario, &mut collector).unwrap();
        (ukf, report, collector)
    }

    #[test]
    fn test_every_measurement_used() {
        let (ukf, report, collector) = run_default();
        assert_eq!(report.outcomes.len(), 500);
        assert_eq!(report.outcomes[0], CycleOutcome::Initialized);
        let updated = report.count(CycleOutcome::Updated);
        assert!(updated > 490);
        assert_eq!(updated + report.count(CycleOutcome::PredictionOnly), 499);
        assert_eq!(report.estimates.len(), 500);
        assert_eq!(report.ground_truth.len(), 500);
        assert_eq!(ukf.cycle_count(), 499);
        let recorded = collector.series(SensorType::Lidar).len()
            + collector.series(SensorType::Radar).len();
        assert_eq!(recorded, updated);
    }

    #[test]
    fn test_nis_is_consistent() {
        let (_, _, collector) = run_default();

        let lidar = collector.statistics(SensorType::Lidar, WARM_UP).unwrap();
        assert!(lidar.mean > 1.0 && lidar.mean < 4.0, "lidar NIS mean {}", lidar.mean);
        assert!(lidar.fraction_above_95 < 0.15);

        let radar = collector.statistics(SensorType::Radar, WARM_UP).unwrap();
        assert!(radar.mean > 1.5 && radar.mean < 6.0, "radar NIS mean {}", radar.mean);
        assert!(radar.fraction_above_95 < 0.15);

        assert!(CHI_SQUARED_95_2DOF < CHI_SQUARED_95_3DOF);
    }

    #[test]
    fn test_covariance_stays_symmetric() {
        let (ukf, _, _) = run_default();
        let p = ukf.covariance();
        assert!(max_asymmetry(p) < 1e-9);
        assert!(p.cholesky().is_some());
    }

    #[test]
    fn test_rmse_is_small() {
        let (_, report, _) = run_default();
        let rmse = report.rmse.unwrap();
        assert!(rmse.iter().all(|v| v.is_finite()));
        assert!(rmse[0] < 0.5, "px RMSE {}", rmse[0]);
        assert!(rmse[1] < 0.5, "py RMSE {}", rmse[1]);
        assert!(rmse[2] < 2.0, "vx RMSE {}", rmse[2]);
        assert!(rmse[3] < 2.0, "vy RMSE {}", rmse[3]);
    }

    #[test]
    fn test_disabled_sensor_is_ignored() {
        let config = UKFConfig {
            use_radar: false,
            ..UKFConfig::default()
        };
        let scenario = generate_scenario(&ScenarioConfig {
            steps: 40,
            ..ScenarioConfig::default()
        })
        .unwrap();
        let mut ukf = UnscentedKalmanFilter::new(config).unwrap();
        let mut collector = NisCollector::new();
        let report = run_scenario(&mut ukf, &scenario, &mut collector).unwrap();

        assert_eq!(report.count(CycleOutcome::Ignored), 20);
        assert!(collector.series(SensorType::Radar).is_empty());
        assert!(ukf.nis(SensorType::Radar).is_none());
    }

    struct FailingSink;

    impl NisSink for FailingSink {
        fn record(&mut self, _record: &NisRecord) -> FusionResult<()> {
            Err(FusionError::EstimationError("sink closed".to_string()))
        }
    }

    #[test]
    fn test_sink_error_aborts_run() {
        let scenario = generate_scenario(&ScenarioConfig {
            steps: 5,
            ..ScenarioConfig::default()
        })
        .unwrap();
        let mut ukf = UnscentedKalmanFilter::with_defaults();
        let result = run_scenario(&mut ukf, &scenario, &mut FailingSink);
        assert!(matches!(result, Err(FusionError::EstimationError(_))));
    }
}
