use sprs::CsMat;
use std::time::Instant;
use crate::error::{FvmError, FvmResult};
use super::solver::{Solver, SolverStats, SolverUtils};

/// Direct solver using dense LU decomposition
///
/// Uses nalgebra's LU factorization on a densified copy of the matrix.
/// Good for small problems (a few thousand cells)
pub struct DirectSolver {
    /// Solver name
    name: String,
}

impl DirectSolver {
    pub fn new() -> Self {
        Self {
            name: "Direct (Dense LU)".to_string(),
        }
    }
}

impl Default for DirectSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for DirectSolver {
    fn solve(&mut self, a: &CsMat<f64>, b: &[f64]) -> FvmResult<(Vec<f64>, SolverStats)> {
        SolverUtils::check_dimensions(&self.name, a, b)?;
        let start = Instant::now();

        let n = b.len();

        // Convert sparse matrix to dense nalgebra matrix
        let mut a_dense = nalgebra::DMatrix::zeros(n, n);
        for (row_idx, row) in a.outer_iterator().enumerate() {
            for (col_idx, &val) in row.iter() {
                a_dense[(row_idx, col_idx)] = val;
            }
        }

        let lu = a_dense.lu();
        let b_vec = nalgebra::DVector::from_column_slice(b);

        let x_vec = lu.solve(&b_vec).ok_or_else(|| FvmError::SolverFailure {
            solver: self.name.clone(),
            reason: "matrix is singular".to_string(),
        })?;

        let x: Vec<f64> = x_vec.iter().copied().collect();
        SolverUtils::check_finite(&self.name, &x)?;

        let solve_time = start.elapsed().as_secs_f64();

        let residual_norm = SolverUtils::residual_norm(a, &x, b);
        let relative_residual = SolverUtils::relative_residual(a, &x, b);

        log::debug!(
            "{}: n = {}, relative residual = {:.3e}, {:.3}s",
            self.name, n, relative_residual, solve_time
        );

        let stats = SolverStats {
            iterations: 0, // Direct solver doesn't iterate
            residual_norm,
            relative_residual,
            converged: relative_residual < 1e-8,
            solve_time,
        };

        Ok((x, stats))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprs::TriMat;
    use approx::assert_relative_eq;

    #[test]
    fn test_direct_solver_simple() {
        // Solve [2 1; 1 2] x = [3; 3]
        // Solution: x = [1; 1]
        let mut triplets = TriMat::new((2, 2));
        triplets.add_triplet(0, 0, 2.0);
        triplets.add_triplet(0, 1, 1.0);
        triplets.add_triplet(1, 0, 1.0);
        triplets.add_triplet(1, 1, 2.0);
        let a = triplets.to_csr();

        let b = vec![3.0, 3.0];

        let mut solver = DirectSolver::new();
        let (x, stats) = solver.solve(&a, &b).unwrap();

        assert_relative_eq!(x[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(x[1], 1.0, epsilon = 1e-10);
        assert!(stats.converged);
        assert!(stats.relative_residual < 1e-8);
    }

    #[test]
    fn test_direct_solver_diagonal() {
        let n = 10;
        let mut triplets = TriMat::new((n, n));
        for i in 0..n {
            triplets.add_triplet(i, i, (i + 1) as f64);
        }
        let a = triplets.to_csr();

        let b: Vec<f64> = (1..=n).map(|i| (i * i) as f64).collect();

        let mut solver = DirectSolver::new();
        let (x, stats) = solver.solve(&a, &b).unwrap();

        // x[i] = b[i] / A[i][i] = (i+1)^2 / (i+1) = i+1
        for i in 0..n {
            assert_relative_eq!(x[i], (i + 1) as f64, epsilon = 1e-10);
        }
        assert!(stats.converged);
    }

    #[test]
    fn test_direct_solver_singular() {
        let mut triplets = TriMat::new((2, 2));
        triplets.add_triplet(0, 0, 1.0);
        triplets.add_triplet(0, 1, 1.0);
        triplets.add_triplet(1, 0, 1.0);
        triplets.add_triplet(1, 1, 1.0);
        let a = triplets.to_csr();

        let err = DirectSolver::new().solve(&a, &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, FvmError::SolverFailure { .. }));
    }
}
