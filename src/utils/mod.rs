//! Evaluation and plotting helpers for ukf_sensor_fusion

pub mod metrics;
pub mod visualization;

pub use metrics::{calculate_rmse, state_to_cartesian};
pub use visualization::{colors, PathStyle, PointStyle, Visualizer};
