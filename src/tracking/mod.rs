// Single-object tracking with an unscented Kalman filter

pub mod correction;
pub mod covariance;
pub mod measurement_model;
pub mod nis;
pub mod process_model;
pub mod recovery;
pub mod sigma_points;
pub mod ukf;

// Re-exports
pub use measurement_model::{predict_measurement, LidarModel, MeasurementPrediction, RadarModel};
pub use nis::{NisCollector, NisRecord, NisSink, NisStatistics, NisWriter};
pub use sigma_points::SigmaWeights;
pub use ukf::{FilterStatus, UKFConfig, UKFParams, UnscentedKalmanFilter};
