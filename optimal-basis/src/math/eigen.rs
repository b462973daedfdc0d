// Eigendecomposition of small real symmetric matrices with the cyclic Jacobi
// method.

use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::Error;

const MAX_SWEEPS: usize = 100;
/// Convergence threshold on the off-diagonal norm, relative to the full norm
const TOLERANCE: f64 = 1e-13;

/// Eigendecomposition of a real symmetric matrix into eigenvalues and eigenvectors
#[derive(Debug, Clone)]
pub struct SymmetricEigen {
    /// Eigenvalues of the input matrix, sorted in decreasing order
    pub eigenvalues: Array1<f64>,
    /// Eigenvectors of the input matrix, the i-th column corresponds to the
    /// i-th eigenvalue
    pub eigenvectors: Array2<f64>,
}

impl SymmetricEigen {
    /// Compute the eigendecomposition of a symmetric real matrix. Symmetry of
    /// `matrix` is not checked.
    pub fn new(matrix: ArrayView2<f64>) -> Result<SymmetricEigen, Error> {
        if matrix.nrows() != matrix.ncols() {
            return Err(Error::InvalidParameter(format!(
                "can not compute the eigendecomposition of a non-square {}x{} matrix",
                matrix.nrows(), matrix.ncols()
            )));
        }

        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidParameter(
                "can not compute the eigendecomposition of a matrix containing NaN or infinity".into()
            ));
        }

        let n = matrix.nrows();
        let mut values = matrix.to_owned();
        let mut vectors = Array2::eye(n);

        let norm = values.iter().map(|v| v * v).sum::<f64>().sqrt();
        let mut converged = norm == 0.0;
        for _ in 0..MAX_SWEEPS {
            if converged {
                break;
            }

            for p in 0..n {
                for q in (p + 1)..n {
                    jacobi_rotation(&mut values, &mut vectors, p, q);
                }
            }

            converged = off_diagonal_norm(&values) <= TOLERANCE * norm;
        }

        if !converged {
            return Err(Error::Internal(format!(
                "Jacobi eigenvalue iterations did not converge after {} sweeps", MAX_SWEEPS
            )));
        }

        let eigenvalues = values.diag().to_owned();

        let mut order = (0..n).collect::<Vec<_>>();
        order.sort_by(|&i, &j| eigenvalues[j].total_cmp(&eigenvalues[i]));

        Ok(SymmetricEigen {
            eigenvalues: order.iter().map(|&i| eigenvalues[i]).collect(),
            eigenvectors: vectors.select(Axis(1), &order),
        })
    }
}

fn off_diagonal_norm(matrix: &Array2<f64>) -> f64 {
    let mut sum = 0.0;
    for ((i, j), value) in matrix.indexed_iter() {
        if i != j {
            sum += value * value;
        }
    }
    return sum.sqrt();
}

/// Apply the rotation in the `(p, q)` plane cancelling `matrix[p, q]`, and
/// accumulate it in `vectors`.
#[allow(clippy::many_single_char_names)]
fn jacobi_rotation(matrix: &mut Array2<f64>, vectors: &mut Array2<f64>, p: usize, q: usize) {
    let apq = matrix[[p, q]];
    if apq == 0.0 {
        return;
    }

    let theta = (matrix[[q, q]] - matrix[[p, p]]) / (2.0 * apq);
    let t = if theta.abs() > 1e150 {
        0.5 / theta
    } else {
        theta.signum() / (theta.abs() + f64::hypot(theta, 1.0))
    };
    let c = 1.0 / f64::hypot(t, 1.0);
    let s = t * c;

    let n = matrix.nrows();
    for k in 0..n {
        let akp = matrix[[k, p]];
        let akq = matrix[[k, q]];
        matrix[[k, p]] = c * akp - s * akq;
        matrix[[k, q]] = s * akp + c * akq;
    }

    for k in 0..n {
        let apk = matrix[[p, k]];
        let aqk = matrix[[q, k]];
        matrix[[p, k]] = c * apk - s * aqk;
        matrix[[q, k]] = s * apk + c * aqk;
    }
    // exactly zero instead of rounding noise
    matrix[[p, q]] = 0.0;
    matrix[[q, p]] = 0.0;

    for k in 0..n {
        let vkp = vectors[[k, p]];
        let vkq = vectors[[k, q]];
        vectors[[k, p]] = c * vkp - s * vkq;
        vectors[[k, q]] = s * vkp + c * vkq;
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    use super::SymmetricEigen;

    #[test]
    fn diagonal() {
        let matrix = array![[1.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 2.0]];
        let eigen = SymmetricEigen::new(matrix.view()).unwrap();

        assert_eq!(eigen.eigenvalues, array![3.0, 2.0, 1.0]);
        assert_eq!(eigen.eigenvectors, array![[0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    }

    #[test]
    fn two_by_two() {
        let matrix = array![[2.0, 1.0], [1.0, 2.0]];
        let eigen = SymmetricEigen::new(matrix.view()).unwrap();

        assert_relative_eq!(eigen.eigenvalues, array![3.0, 1.0], max_relative = 1e-12);

        let first = eigen.eigenvectors.column(0);
        assert_relative_eq!(first[0].abs(), f64::sqrt(0.5), max_relative = 1e-12);
        assert_relative_eq!(first[0], first[1], max_relative = 1e-12);
    }

    #[test]
    fn recompose() {
        let n = 9;
        let matrix = Array2::from_shape_fn((n, n), |(i, j)| {
            let (i, j) = (i as f64, j as f64);
            f64::cos(0.3 * i * j) + 1.0 / (1.0 + i + j)
        });
        let eigen = SymmetricEigen::new(matrix.view()).unwrap();

        let vectors = &eigen.eigenvectors;
        let recomposed = vectors.dot(&Array2::from_diag(&eigen.eigenvalues)).dot(&vectors.t());
        assert_relative_eq!(recomposed, matrix, epsilon = 1e-10);

        for window in eigen.eigenvalues.windows(2) {
            assert!(window[0] >= window[1]);
        }

        let identity = eigen.eigenvectors.t().dot(&eigen.eigenvectors);
        assert_relative_eq!(identity, Array2::<f64>::eye(n), epsilon = 1e-12);
    }

    #[test]
    fn zero_matrix() {
        let eigen = SymmetricEigen::new(Array2::zeros((3, 3)).view()).unwrap();
        assert_eq!(eigen.eigenvalues, array![0.0, 0.0, 0.0]);
        assert_eq!(eigen.eigenvectors, Array2::<f64>::eye(3));
    }

    #[test]
    fn invalid_matrices() {
        let error = SymmetricEigen::new(Array2::zeros((3, 2)).view()).unwrap_err();
        assert_eq!(error.to_string(), "invalid parameter: can not compute the eigendecomposition of a non-square 3x2 matrix");

        let matrix = array![[1.0, f64::NAN], [f64::NAN, 1.0]];
        assert!(SymmetricEigen::new(matrix.view()).is_err());
    }
}
