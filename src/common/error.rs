//! Error types for ukf_sensor_fusion

use std::fmt;

/// Main error type for the fusion filter and its helpers
#[derive(Debug)]
pub enum FusionError {
    /// Invalid configuration parameter (rejected at construction)
    InvalidParameter(String),
    /// Numerical computation failed (Cholesky, matrix inversion, etc.)
    NumericalError(String),
    /// Estimation or evaluation failed
    EstimationError(String),
    /// I/O error
    IoError(std::io::Error),
    /// Visualization error
    VisualizationError(String),
}

impl fmt::Display for FusionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FusionError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            FusionError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
            FusionError::EstimationError(msg) => write!(f, "Estimation error: {}", msg),
            FusionError::IoError(e) => write!(f, "I/O error: {}", e),
            FusionError::VisualizationError(msg) => write!(f, "Visualization error: {}", msg),
        }
    }
}

impl std::error::Error for FusionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FusionError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FusionError {
    fn from(e: std::io::Error) -> Self {
        FusionError::IoError(e)
    }
}

/// Result type alias for fusion operations
pub type FusionResult<T> = Result<T, FusionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FusionError::NumericalError("innovation covariance is singular".to_string());
        assert_eq!(
            format!("{}", err),
            "Numerical error: innovation covariance is singular"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let err: FusionError = io_err.into();
        assert!(matches!(err, FusionError::IoError(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
