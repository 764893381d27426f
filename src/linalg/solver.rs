use sprs::CsMat;
use crate::error::FvmResult;

/// Statistics from solver execution
#[derive(Debug, Clone)]
pub struct SolverStats {
    /// Number of iterations (0 for direct solvers)
    pub iterations: usize,

    /// Final residual norm ||r|| = ||b - Ax||
    pub residual_norm: f64,

    /// Relative residual ||r|| / ||b||
    pub relative_residual: f64,

    /// Whether solver converged
    pub converged: bool,

    /// Solve time in seconds
    pub solve_time: f64,
}

impl SolverStats {
    pub fn new() -> Self {
        Self {
            iterations: 0,
            residual_norm: 0.0,
            relative_residual: 0.0,
            converged: false,
            solve_time: 0.0,
        }
    }
}

impl Default for SolverStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for a linear operator A that can be applied to a vector x to get Ax
pub trait LinearOperator {
    /// Apply the operator to vector v: out = A * v
    fn apply(&self, v: &[f64]) -> Vec<f64>;

    /// Number of rows (output dimension)
    fn rows(&self) -> usize;

    /// Number of columns (input dimension)
    fn cols(&self) -> usize;
}

impl LinearOperator for CsMat<f64> {
    fn apply(&self, v: &[f64]) -> Vec<f64> {
        let mut result = vec![0.0; self.rows()];
        for (row_idx, row) in self.outer_iterator().enumerate() {
            result[row_idx] = row.iter().map(|(col_idx, &val)| val * v[col_idx]).sum();
        }
        result
    }

    fn rows(&self) -> usize {
        self.rows()
    }

    fn cols(&self) -> usize {
        self.cols()
    }
}

/// Linear system solver trait
///
/// Solves Ax = b for x. Implementors are used behind `Box<dyn Solver>`.
pub trait Solver: Send {
    /// Solve the linear system Ax = b
    ///
    /// # Arguments
    /// * `a` - System matrix (n x n)
    /// * `b` - Right-hand side vector (n)
    ///
    /// # Returns
    /// * Solution vector x (n)
    /// * Solver statistics
    ///
    /// # Errors
    /// `SolverFailure` on dimension mismatch, breakdown of the factorization,
    /// or a non-finite solution. Non-convergence of an iterative method is
    /// reported through [`SolverStats::converged`], not as an error.
    fn solve(&mut self, a: &CsMat<f64>, b: &[f64]) -> FvmResult<(Vec<f64>, SolverStats)>;

    /// Get solver name
    fn name(&self) -> &str;
}

/// Helper functions for solver validation
pub struct SolverUtils;

impl SolverUtils {
    /// Compute residual r = b - Ax
    pub fn compute_residual<O: LinearOperator>(a: &O, x: &[f64], b: &[f64]) -> Vec<f64> {
        let ax = a.apply(x);
        b.iter()
            .zip(ax.iter())
            .map(|(&bi, &axi)| bi - axi)
            .collect()
    }

    /// Compute L2 norm of a vector
    pub fn norm(v: &[f64]) -> f64 {
        v.iter().map(|&x| x * x).sum::<f64>().sqrt()
    }

    pub fn dot(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum()
    }

    /// Compute residual norm ||b - Ax||
    pub fn residual_norm<O: LinearOperator>(a: &O, x: &[f64], b: &[f64]) -> f64 {
        let r = Self::compute_residual(a, x, b);
        Self::norm(&r)
    }

    /// Compute relative residual ||b - Ax|| / ||b||
    pub fn relative_residual<O: LinearOperator>(a: &O, x: &[f64], b: &[f64]) -> f64 {
        let r_norm = Self::residual_norm(a, x, b);
        let b_norm = Self::norm(b);

        if b_norm < 1e-14 {
            r_norm
        } else {
            r_norm / b_norm
        }
    }

    /// Check that `a` is square and matches `b`
    pub fn check_dimensions(solver: &str, a: &CsMat<f64>, b: &[f64]) -> FvmResult<()> {
        if a.rows() != a.cols() || a.rows() != b.len() {
            return Err(crate::error::FvmError::SolverFailure {
                solver: solver.to_string(),
                reason: format!(
                    "matrix is {}x{} but right-hand side has {} entries",
                    a.rows(),
                    a.cols(),
                    b.len()
                ),
            });
        }
        Ok(())
    }

    /// Reject solutions containing NaN or infinity
    pub fn check_finite(solver: &str, x: &[f64]) -> FvmResult<()> {
        match x.iter().position(|v| !v.is_finite()) {
            Some(i) => Err(crate::error::FvmError::SolverFailure {
                solver: solver.to_string(),
                reason: format!("non-finite solution entry {} = {}", i, x[i]),
            }),
            None => Ok(()),
        }
    }
}
