use sprs::CsMat;

/// Preconditioner trait for iterative solvers
///
/// Solves M z = r approximately (where M ≈ A)
pub trait Preconditioner {
    /// Apply preconditioner: solve M z = r
    fn apply(&self, r: &[f64]) -> Vec<f64>;
}

/// Jacobi (diagonal) preconditioner
///
/// M = diag(A). Rows with a (near) zero diagonal are left unscaled.
pub struct JacobiPreconditioner {
    /// Inverse of diagonal entries: 1/A_ii
    diag_inv: Vec<f64>,
}

impl JacobiPreconditioner {
    pub fn new(a: &CsMat<f64>) -> Self {
        let n = a.rows();
        let mut diag_inv = vec![1.0; n];

        for (i, d) in diag_inv.iter_mut().enumerate() {
            if let Some(&val) = a.get(i, i) {
                if val.abs() > 1e-14 {
                    *d = 1.0 / val;
                }
            }
        }

        Self { diag_inv }
    }
}

impl Preconditioner for JacobiPreconditioner {
    fn apply(&self, r: &[f64]) -> Vec<f64> {
        // z = D^{-1} r
        r.iter()
            .zip(self.diag_inv.iter())
            .map(|(&ri, &di)| ri * di)
            .collect()
    }
}

/// Identity preconditioner (no preconditioning)
pub struct IdentityPreconditioner;

impl Preconditioner for IdentityPreconditioner {
    fn apply(&self, r: &[f64]) -> Vec<f64> {
        r.to_vec()
    }
}
