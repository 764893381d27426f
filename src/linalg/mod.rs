pub mod solver;
pub mod direct;
pub mod iterative;
pub mod preconditioner;

pub use solver::{Solver, SolverStats, SolverUtils, LinearOperator};
pub use direct::DirectSolver;
pub use iterative::{ConjugateGradient, BiCGSTAB};
pub use preconditioner::{Preconditioner, JacobiPreconditioner, IdentityPreconditioner};
