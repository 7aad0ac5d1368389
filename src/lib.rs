//! ukf_sensor_fusion - lidar and radar fusion with an unscented Kalman filter
//!
//! This crate tracks a single object with a constant turn rate and velocity
//! (CTRV) motion model, fusing cartesian lidar and polar radar measurements,
//! and provides the NIS diagnostics, RMSE evaluation and simulated scenarios
//! used to tune it.

// Core modules
pub mod common;
pub mod utils;

// Filter and harness
pub mod tracking;
pub mod simulation;

// Re-export common types for convenience
pub use common::{CycleOutcome, MeasurementPackage, Point2D, SensorData, SensorType};
pub use common::{MeasurementModel, StateEstimator};
pub use common::{FusionError, FusionResult};
pub use tracking::{UKFConfig, UKFParams, UnscentedKalmanFilter};
