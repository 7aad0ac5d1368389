//! Common types used throughout ukf_sensor_fusion

use nalgebra::{Matrix5, SMatrix, SVector, Vector2, Vector3, Vector4, Vector5};
use std::fmt;

/// State dimension: [px, py, v, yaw, yaw_rate]
pub const N_X: usize = 5;

/// Augmented state dimension: state + longitudinal and yaw acceleration noise
pub const N_AUG: usize = 7;

/// Number of sigma points (2 * N_AUG + 1)
pub const N_SIGMA: usize = 2 * N_AUG + 1;

/// Lidar measurement dimension: px, py
pub const N_Z_LIDAR: usize = 2;

/// Radar measurement dimension: range, bearing, range rate
pub const N_Z_RADAR: usize = 3;

/// Index of the heading angle inside the state vector
pub const YAW_INDEX: usize = 3;

/// Index of the bearing angle inside the radar measurement vector
pub const BEARING_INDEX: usize = 1;

/// State vector [px, py, v, yaw, yaw_rate] in SI units and rad
pub type StateVector = Vector5<f64>;

/// State covariance matrix
pub type StateCovariance = Matrix5<f64>;

/// Augmented state vector [px, py, v, yaw, yaw_rate, nu_a, nu_yawdd]
pub type AugStateVector = SVector<f64, N_AUG>;

/// Augmented covariance matrix
pub type AugCovariance = SMatrix<f64, N_AUG, N_AUG>;

/// Augmented sigma points, one point per column
pub type AugSigmaPoints = SMatrix<f64, N_AUG, N_SIGMA>;

/// Predicted sigma points in plain state space, one point per column
pub type SigmaPoints = SMatrix<f64, N_X, N_SIGMA>;

/// Cartesian kinematics [px, py, vx, vy], used for evaluation against ground truth
pub type CartesianState = Vector4<f64>;

/// Sensor that produced a measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorType {
    Lidar,
    Radar,
}

impl SensorType {
    /// Dimension of the raw measurement vector
    pub fn dimension(&self) -> usize {
        match self {
            SensorType::Lidar => N_Z_LIDAR,
            SensorType::Radar => N_Z_RADAR,
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorType::Lidar => write!(f, "lidar"),
            SensorType::Radar => write!(f, "radar"),
        }
    }
}

/// Raw measurement values, sized by sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorData {
    /// Position (x, y) in meters
    Lidar(Vector2<f64>),
    /// Range in meters, bearing in radians, range rate in m/s
    Radar(Vector3<f64>),
}

/// A single timestamped sensor reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementPackage {
    /// Timestamp in microseconds
    pub timestamp_us: i64,
    pub data: SensorData,
}

impl MeasurementPackage {
    pub fn lidar(timestamp_us: i64, px: f64, py: f64) -> Self {
        Self {
            timestamp_us,
            data: SensorData::Lidar(Vector2::new(px, py)),
        }
    }

    pub fn radar(timestamp_us: i64, rho: f64, phi: f64, rho_dot: f64) -> Self {
        Self {
            timestamp_us,
            data: SensorData::Radar(Vector3::new(rho, phi, rho_dot)),
        }
    }

    pub fn sensor_type(&self) -> SensorType {
        match self.data {
            SensorData::Lidar(_) => SensorType::Lidar,
            SensorData::Radar(_) => SensorType::Radar,
        }
    }

    /// Raw values as a slice, in sensor order
    pub fn raw_values(&self) -> &[f64] {
        match &self.data {
            SensorData::Lidar(z) => z.as_slice(),
            SensorData::Radar(z) => z.as_slice(),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.raw_values().iter().all(|v| v.is_finite())
    }

    /// Measured position converted to cartesian coordinates
    pub fn position(&self) -> Point2D {
        match self.data {
            SensorData::Lidar(z) => Point2D::new(z[0], z[1]),
            SensorData::Radar(z) => Point2D::new(z[0] * z[1].cos(), z[0] * z[1].sin()),
        }
    }
}

/// Result of feeding one measurement to the filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Sensor disabled by configuration; nothing happened
    Ignored,
    /// Raw values were not finite; nothing happened
    Rejected,
    /// First usable measurement seeded the state
    Initialized,
    /// Prediction and correction both ran
    Updated,
    /// Prediction ran but the correction was numerically degenerate
    PredictionOnly,
    /// Prediction was numerically degenerate; prior state kept
    Skipped,
}

/// 2D point representation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl From<(f64, f64)> for Point2D {
    fn from(tuple: (f64, f64)) -> Self {
        Self { x: tuple.0, y: tuple.1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_sigma_point_count() {
        assert_eq!(N_SIGMA, 15);
    }

    #[test]
    fn test_measurement_sensor_type() {
        let lidar = MeasurementPackage::lidar(0, 1.0, 2.0);
        let radar = MeasurementPackage::radar(0, 1.0, 0.0, 0.5);
        assert_eq!(lidar.sensor_type(), SensorType::Lidar);
        assert_eq!(radar.sensor_type(), SensorType::Radar);
        assert_eq!(lidar.raw_values().len(), SensorType::Lidar.dimension());
        assert_eq!(radar.raw_values().len(), SensorType::Radar.dimension());
    }

    #[test]
    fn test_radar_position() {
        let radar = MeasurementPackage::radar(0, 2.0, FRAC_PI_2, 0.0);
        let p = radar.position();
        assert!(p.x.abs() < 1e-12);
        assert!((p.y - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_measurement() {
        let m = MeasurementPackage::lidar(0, f64::NAN, 1.0);
        assert!(!m.is_finite());
    }

    #[test]
    fn test_point2d_distance() {
        let p1 = Point2D::new(0.0, 0.0);
        let p2 = Point2D::new(3.0, 4.0);
        assert!((p1.distance(&p2) - 5.0).abs() < 1e-10);
    }
}
