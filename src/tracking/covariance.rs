//! Covariance conditioning and matrix square roots for the state covariance

use crate::common::{FusionError, FusionResult, StateCovariance};

/// Relative tolerance below which a negative eigenvalue is treated as zero
const PSD_TOLERANCE: f64 = 1e-9;

/// Smallest eigenvalue kept when restoring positive definiteness
const EIGENVALUE_FLOOR: f64 = 1e-12;

/// Average a matrix with its transpose
pub fn symmetrize(p: &StateCovariance) -> StateCovariance {
    (p + p.transpose()) * 0.5
}

/// Largest absolute difference between a matrix and its transpose
pub fn max_asymmetry(p: &StateCovariance) -> f64 {
    (p - p.transpose()).amax()
}

/// Symmetrize and, when Cholesky fails, floor the eigenvalues so that the
/// result is positive definite again. Non-finite input is only symmetrized.
pub fn condition_covariance(p: &StateCovariance) -> StateCovariance {
    let sym = symmetrize(p);
    if sym.iter().any(|v| !v.is_finite()) || sym.cholesky().is_some() {
        return sym;
    }

    let eigen = sym.symmetric_eigen();
    let floor = EIGENVALUE_FLOOR.max(eigen.eigenvalues.amax() * PSD_TOLERANCE);
    let floored = eigen.eigenvalues.map(|l| l.max(floor));
    let restored =
        eigen.eigenvectors * StateCovariance::from_diagonal(&floored) * eigen.eigenvectors.transpose();
    symmetrize(&restored)
}

/// Square root `L` with `L * L^T = P`, lower triangular when Cholesky succeeds.
///
/// Uses Cholesky when `P` is positive definite and falls back to a
/// symmetric-eigen root for positive semi-definite `P` (zero variances).
/// Fails for indefinite or non-finite input.
pub fn matrix_sqrt(p: &StateCovariance) -> FusionResult<StateCovariance> {
    if p.iter().any(|v| !v.is_finite()) {
        return Err(FusionError::NumericalError(
            "covariance contains non-finite entries".to_string(),
        ));
    }

    if let Some(chol) = p.cholesky() {
        return Ok(chol.l());
    }

    let eigen = symmetrize(p).symmetric_eigen();
    let scale = eigen.eigenvalues.amax().max(1.0);
    let min_eigenvalue = eigen.eigenvalues.iter().cloned().fold(f64::INFINITY, f64::min);
    if min_eigenvalue < -PSD_TOLERANCE * scale {
        return Err(FusionError::NumericalError(format!(
            "covariance is not positive semi-definite (min eigenvalue {:e})",
            min_eigenvalue
        )));
    }

    let roots = eigen.eigenvalues.map(|l| l.max(0.0).sqrt());
    Ok(eigen.eigenvectors * StateCovariance::from_diagonal(&roots))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector5;

    fn sample_covariance() -> StateCovariance {
        let a = StateCovariance::new(
            1.0, 0.2, 0.0, 0.1, 0.0,
            0.0, 1.5, 0.3, 0.0, 0.0,
            0.0, 0.0, 0.8, 0.0, 0.2,
            0.0, 0.0, 0.0, 0.5, 0.1,
            0.0, 0.0, 0.0, 0.0, 0.3,
        );
        a * a.transpose()
    }

    #[test]
    fn test_symmetrize() {
        let mut p = sample_covariance();
        p[(0, 1)] += 0.01;
        assert!(max_asymmetry(&p) > 0.0);
        assert!(max_asymmetry(&symmetrize(&p)) < 1e-15);
    }

    #[test]
    fn test_matrix_sqrt_cholesky() {
        let p = sample_covariance();
        let l = matrix_sqrt(&p).unwrap();
        assert_relative_eq!(l * l.transpose(), p, epsilon = 1e-12);
    }

    #[test]
    fn test_matrix_sqrt_semi_definite() {
        let p = StateCovariance::from_diagonal(&Vector5::new(0.1, 0.1, 0.1, 0.0, 0.0));
        assert!(p.cholesky().is_none());
        let l = matrix_sqrt(&p).unwrap();
        assert_relative_eq!(l * l.transpose(), p, epsilon = 1e-12);
    }

    #[test]
    fn test_matrix_sqrt_rejects_indefinite() {
        let p = StateCovariance::from_diagonal(&Vector5::new(1.0, 1.0, -0.5, 1.0, 1.0));
        assert!(matches!(matrix_sqrt(&p), Err(FusionError::NumericalError(_))));
    }

    #[test]
    fn test_matrix_sqrt_rejects_nan() {
        let mut p = sample_covariance();
        p[(2, 2)] = f64::NAN;
        assert!(matrix_sqrt(&p).is_err());
    }

    #[test]
    fn test_condition_keeps_positive_definite() {
        let p = sample_covariance();
        assert_relative_eq!(condition_covariance(&p), p, epsilon = 1e-15);
    }

    #[test]
    fn test_condition_repairs_indefinite() {
        let p = StateCovariance::from_diagonal(&Vector5::new(1.0, 2.0, -1e-6, 0.5, 0.1));
        let fixed = condition_covariance(&p);
        assert!(fixed.cholesky().is_some());
        assert!(max_asymmetry(&fixed) < 1e-15);
        assert_relative_eq!(fixed[(1, 1)], 2.0, epsilon = 1e-9);
    }
}
