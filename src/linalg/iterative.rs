use sprs::CsMat;
use std::time::Instant;
use crate::error::FvmResult;
use super::solver::{Solver, SolverStats, SolverUtils, LinearOperator};
use super::preconditioner::{Preconditioner, JacobiPreconditioner, IdentityPreconditioner};

fn zero_rhs_stats(start: Instant) -> SolverStats {
    SolverStats {
        iterations: 0,
        residual_norm: 0.0,
        relative_residual: 0.0,
        converged: true,
        solve_time: start.elapsed().as_secs_f64(),
    }
}

/// Conjugate Gradient solver for symmetric positive definite systems
///
/// Assembled heat systems are SPD when conductivity is constant; with
/// temperature-dependent conductivity use [`BiCGSTAB`].
pub struct ConjugateGradient {
    max_iterations: usize,
    tolerance: f64,
    abs_tolerance: f64,
    use_preconditioner: bool,
    name: String,
}

impl ConjugateGradient {
    pub fn new() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-8,
            abs_tolerance: 1e-12,
            use_preconditioner: true,
            name: "ConjugateGradient".to_string(),
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_abs_tolerance(mut self, abs_tolerance: f64) -> Self {
        self.abs_tolerance = abs_tolerance;
        self
    }

    pub fn with_preconditioner(mut self, use_precond: bool) -> Self {
        self.use_preconditioner = use_precond;
        self
    }

    pub fn solve_with_operator<O, P>(&self, a: &O, b: &[f64], precond: &P) -> (Vec<f64>, SolverStats)
    where
        O: LinearOperator,
        P: Preconditioner,
    {
        let n = b.len();
        let start = Instant::now();
        let b_norm = SolverUtils::norm(b);

        if b_norm < 1e-25 {
            return (vec![0.0; n], zero_rhs_stats(start));
        }

        let mut x = vec![0.0; n];
        let mut r = b.to_vec();

        let mut z = precond.apply(&r);
        let mut p = z.clone();
        let mut rz = SolverUtils::dot(&r, &z);

        let mut iteration = 0;
        let mut converged = false;
        let mut final_res = b_norm;

        while iteration < self.max_iterations {
            let ap = a.apply(&p);
            let p_ap = SolverUtils::dot(&p, &ap);

            if p_ap.abs() < 1e-30 {
                break;
            }
            let alpha = rz / p_ap;

            for i in 0..n {
                x[i] += alpha * p[i];
                r[i] -= alpha * ap[i];
            }
            iteration += 1;

            let r_norm = SolverUtils::norm(&r);
            final_res = r_norm;
            if r_norm < self.tolerance * b_norm || r_norm < self.abs_tolerance {
                converged = true;
                break;
            }

            z = precond.apply(&r);
            let rz_new = SolverUtils::dot(&r, &z);
            let beta = rz_new / rz;
            rz = rz_new;

            for i in 0..n {
                p[i] = z[i] + beta * p[i];
            }

            if iteration % 50 == 0 {
                log::trace!("CG iter {:4}: res = {:.3e}, rel = {:.3e}", iteration, r_norm, r_norm / b_norm);
            }
        }

        (x, SolverStats {
            iterations: iteration,
            residual_norm: final_res,
            relative_residual: final_res / b_norm,
            converged,
            solve_time: start.elapsed().as_secs_f64(),
        })
    }
}

impl Solver for ConjugateGradient {
    fn solve(&mut self, a: &CsMat<f64>, b: &[f64]) -> FvmResult<(Vec<f64>, SolverStats)> {
        SolverUtils::check_dimensions(&self.name, a, b)?;
        let (x, stats) = if self.use_preconditioner {
            self.solve_with_operator(a, b, &JacobiPreconditioner::new(a))
        } else {
            self.solve_with_operator(a, b, &IdentityPreconditioner)
        };
        SolverUtils::check_finite(&self.name, &x)?;
        report(&self.name, &stats);
        Ok((x, stats))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// BiCGSTAB (Biconjugate Gradient Stabilized) solver for non-symmetric systems
pub struct BiCGSTAB {
    max_iterations: usize,
    tolerance: f64,
    abs_tolerance: f64,
    use_preconditioner: bool,
    name: String,
}

impl BiCGSTAB {
    pub fn new() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-8,
            abs_tolerance: 1e-12,
            use_preconditioner: true,
            name: "BiCGSTAB".to_string(),
        }
    }

    pub fn with_max_iterations(mut self, max_iter: usize) -> Self { self.max_iterations = max_iter; self }
    pub fn with_tolerance(mut self, tol: f64) -> Self { self.tolerance = tol; self }
    pub fn with_abs_tolerance(mut self, abs_tol: f64) -> Self { self.abs_tolerance = abs_tol; self }
    pub fn with_preconditioner(mut self, use_precond: bool) -> Self { self.use_preconditioner = use_precond; self }

    pub fn solve_with_operator<O, P>(&self, a: &O, b: &[f64], precond: &P) -> (Vec<f64>, SolverStats)
    where
        O: LinearOperator,
        P: Preconditioner,
    {
        let n = b.len();
        let start = Instant::now();
        let b_norm = SolverUtils::norm(b);

        if b_norm < 1e-25 {
            return (vec![0.0; n], zero_rhs_stats(start));
        }

        let mut x = vec![0.0; n];
        let mut r = b.to_vec();
        let r_hat = r.clone();

        let mut rho = 1.0;
        let mut alpha = 1.0;
        let mut omega = 1.0;
        let mut v = vec![0.0; n];
        let mut p = vec![0.0; n];

        let mut total_iter = 0;
        let mut converged = false;
        let mut final_res = b_norm;

        while total_iter < self.max_iterations {
            let rho_prev = rho;
            rho = SolverUtils::dot(&r_hat, &r);

            if rho.abs() < 1e-40 { break; }

            if total_iter == 0 {
                p = r.clone();
            } else {
                let beta = (rho / rho_prev) * (alpha / omega);
                for i in 0..n {
                    p[i] = r[i] + beta * (p[i] - omega * v[i]);
                }
            }

            let p_hat = precond.apply(&p);
            v = a.apply(&p_hat);

            let rhat_v = SolverUtils::dot(&r_hat, &v);
            if rhat_v.abs() < 1e-40 { break; }
            alpha = rho / rhat_v;

            let s: Vec<f64> = r.iter().zip(v.iter()).map(|(&ri, &vi)| ri - alpha * vi).collect();

            let s_norm = SolverUtils::norm(&s);
            if s_norm < self.tolerance * b_norm || s_norm < self.abs_tolerance {
                for i in 0..n { x[i] += alpha * p_hat[i]; }
                final_res = s_norm;
                total_iter += 1;
                converged = true;
                break;
            }

            let s_hat = precond.apply(&s);
            let t = a.apply(&s_hat);

            let t_t = SolverUtils::dot(&t, &t);
            let t_s = SolverUtils::dot(&t, &s);

            if t_t.abs() < 1e-40 { break; }
            omega = t_s / t_t;

            for i in 0..n {
                x[i] += alpha * p_hat[i] + omega * s_hat[i];
                r[i] = s[i] - omega * t[i];
            }

            final_res = SolverUtils::norm(&r);
            total_iter += 1;

            if total_iter % 50 == 0 {
                log::trace!("BiCGSTAB iter {:4}: res = {:.3e}, rel = {:.3e}", total_iter, final_res, final_res / b_norm);
            }

            if final_res < self.tolerance * b_norm || final_res < self.abs_tolerance {
                converged = true;
                break;
            }
            if omega.abs() < 1e-40 { break; }
        }

        (x, SolverStats {
            iterations: total_iter,
            residual_norm: final_res,
            relative_residual: final_res / b_norm,
            converged,
            solve_time: start.elapsed().as_secs_f64(),
        })
    }
}

impl Solver for BiCGSTAB {
    fn solve(&mut self, a: &CsMat<f64>, b: &[f64]) -> FvmResult<(Vec<f64>, SolverStats)> {
        SolverUtils::check_dimensions(&self.name, a, b)?;
        let (x, stats) = if self.use_preconditioner {
            self.solve_with_operator(a, b, &JacobiPreconditioner::new(a))
        } else {
            self.solve_with_operator(a, b, &IdentityPreconditioner)
        };
        SolverUtils::check_finite(&self.name, &x)?;
        report(&self.name, &stats);
        Ok((x, stats))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn report(name: &str, stats: &SolverStats) {
    if stats.converged {
        log::debug!(
            "{}: converged in {} iterations, rel = {:.3e}",
            name, stats.iterations, stats.relative_residual
        );
    } else {
        log::warn!(
            "{}: not converged after {} iterations, rel = {:.3e}",
            name, stats.iterations, stats.relative_residual
        );
    }
}

impl Default for BiCGSTAB { fn default() -> Self { Self::new() } }
impl Default for ConjugateGradient { fn default() -> Self { Self::new() } }

#[cfg(test)]
mod tests {
    use super::*;
    use sprs::TriMat;
    use approx::assert_relative_eq;

    /// 1D Laplacian with Dirichlet-like diagonal shift
    fn tridiagonal(n: usize) -> CsMat<f64> {
        let mut triplets = TriMat::new((n, n));
        for i in 0..n {
            triplets.add_triplet(i, i, 2.5);
            if i > 0 {
                triplets.add_triplet(i, i - 1, -1.0);
            }
            if i + 1 < n {
                triplets.add_triplet(i, i + 1, -1.0);
            }
        }
        triplets.to_csr()
    }

    #[test]
    fn test_cg_basic() {
        let mut triplets = TriMat::new((2, 2));
        triplets.add_triplet(0, 0, 2.0);
        triplets.add_triplet(0, 1, 1.0);
        triplets.add_triplet(1, 0, 1.0);
        triplets.add_triplet(1, 1, 2.0);
        let a = triplets.to_csr();
        let b = vec![3.0, 3.0];
        let mut solver = ConjugateGradient::new();
        let (x, stats) = solver.solve(&a, &b).unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(x[1], 1.0, epsilon = 1e-6);
        assert!(stats.converged);
    }

    #[test]
    fn test_cg_and_bicgstab_agree() {
        let a = tridiagonal(30);
        let x_true: Vec<f64> = (0..30).map(|i| (i as f64 * 0.3).sin()).collect();
        let b = a.apply(&x_true);

        let mut cg = ConjugateGradient::new().with_tolerance(1e-12);
        let mut bicg = BiCGSTAB::new().with_tolerance(1e-12).with_preconditioner(false);

        let (x_cg, s_cg) = cg.solve(&a, &b).unwrap();
        let (x_bi, s_bi) = bicg.solve(&a, &b).unwrap();

        assert!(s_cg.converged && s_bi.converged);
        for i in 0..30 {
            assert_relative_eq!(x_cg[i], x_true[i], epsilon = 1e-8);
            assert_relative_eq!(x_bi[i], x_true[i], epsilon = 1e-8);
        }
    }

    #[test]
    fn test_bicgstab_nonsymmetric() {
        let mut triplets = TriMat::new((3, 3));
        triplets.add_triplet(0, 0, 4.0);
        triplets.add_triplet(0, 1, -1.0);
        triplets.add_triplet(1, 0, -2.0);
        triplets.add_triplet(1, 1, 5.0);
        triplets.add_triplet(1, 2, -1.0);
        triplets.add_triplet(2, 1, -0.5);
        triplets.add_triplet(2, 2, 3.0);
        let a = triplets.to_csr();
        let b = a.apply(&[1.0, 2.0, 3.0]);

        let (x, stats) = BiCGSTAB::new().with_tolerance(1e-12).solve(&a, &b).unwrap();
        assert!(stats.converged);
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-8);
        assert_relative_eq!(x[1], 2.0, epsilon = 1e-8);
        assert_relative_eq!(x[2], 3.0, epsilon = 1e-8);
    }

    #[test]
    fn test_iteration_limit_reports_not_converged() {
        let a = tridiagonal(50);
        let b = vec![1.0; 50];
        let (_, stats) = ConjugateGradient::new()
            .with_max_iterations(2)
            .with_tolerance(1e-14)
            .with_abs_tolerance(0.0)
            .solve(&a, &b)
            .unwrap();
        assert!(!stats.converged);
        assert_eq!(stats.iterations, 2);
    }

    #[test]
    fn test_zero_rhs() {
        let a = tridiagonal(4);
        let (x, stats) = BiCGSTAB::new().solve(&a, &[0.0; 4]).unwrap();
        assert!(stats.converged);
        assert!(x.iter().all(|&v| v == 0.0));
    }
}
