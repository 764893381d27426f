//! Theta-scheme time integration for the heat equation
//!
//! Each step assembles `A·T_{n+1} = b(T_n)` with the chosen implicitness,
//! solves it, and keeps the result as the next previous-level field.

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::bc::BoundaryConditionStore;
use crate::error::{FvmError, FvmResult};
use crate::linalg::Solver;
use crate::mesh::CellTopology;
use crate::physics::PropertyModel;
use super::assembly::{Assembler, ThetaStep};

/// Time integration statistics for a single step
#[derive(Debug, Clone)]
pub struct TimeStepStats {
    /// Current simulation time
    pub time: f64,
    /// Time step size used
    pub dt: f64,
    /// Number of solver iterations
    pub iterations: usize,
    /// Final residual norm
    pub residual: f64,
}

/// Time discretization scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeScheme {
    /// θ = 0
    Explicit,
    /// θ = 1 (backward Euler)
    Implicit,
    /// θ = 1/2
    CrankNicolson,
    /// θ = 1, Δt = ∞
    Steady,
}

impl TimeScheme {
    pub fn theta(self) -> f64 {
        match self {
            TimeScheme::Explicit => 0.0,
            TimeScheme::Implicit | TimeScheme::Steady => 1.0,
            TimeScheme::CrankNicolson => 0.5,
        }
    }

    pub fn is_steady(self) -> bool {
        self == TimeScheme::Steady
    }

    /// Δt actually used for assembly
    pub fn effective_time_step(self, dt: f64) -> f64 {
        if self.is_steady() {
            f64::INFINITY
        } else {
            dt
        }
    }
}

impl FromStr for TimeScheme {
    type Err = FvmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "explicit" => Ok(TimeScheme::Explicit),
            "implicit" => Ok(TimeScheme::Implicit),
            "crank_nicolson" => Ok(TimeScheme::CrankNicolson),
            "steady" => Ok(TimeScheme::Steady),
            other => Err(FvmError::InvalidConfig(format!("unknown time scheme '{}'", other))),
        }
    }
}

impl fmt::Display for TimeScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimeScheme::Explicit => "explicit",
            TimeScheme::Implicit => "implicit",
            TimeScheme::CrankNicolson => "crank_nicolson",
            TimeScheme::Steady => "steady",
        };
        f.write_str(name)
    }
}

/// Theta-scheme integrator over cell temperatures
///
/// **Algorithm:** at each step t_n → t_{n+1}:
/// 1. Assemble `A, b` with properties evaluated at `T_n`
/// 2. Solve `A T_{n+1} = b`
/// 3. `T_n ← T_{n+1}`, advance time
///
/// In steady mode a step solves the equilibrium problem and time does not advance.
pub struct ThetaIntegrator {
    /// Current simulation time
    pub time: f64,
    /// Time step size
    pub dt: f64,
    scheme: TimeScheme,
    /// Current cell temperatures
    pub temperature: Vec<f64>,
    initial: Vec<f64>,
}

impl ThetaIntegrator {
    /// Create an integrator at t = 0
    ///
    /// # Errors
    /// `InvalidAssemblyInput` if `dt` is not positive and finite for a transient scheme.
    pub fn new(scheme: TimeScheme, dt: f64, initial: Vec<f64>) -> FvmResult<Self> {
        if !scheme.is_steady() {
            check_time_step(dt)?;
        }
        Ok(Self {
            time: 0.0,
            dt,
            scheme,
            temperature: initial.clone(),
            initial,
        })
    }

    pub fn scheme(&self) -> TimeScheme {
        self.scheme
    }

    /// Take one time step
    ///
    /// # Errors
    /// Assembly errors propagate; a solver that does not converge yields
    /// `SolverFailure`. The state is unchanged on error.
    pub fn step<M, P>(
        &mut self,
        mesh: &M,
        properties: &P,
        store: &BoundaryConditionStore,
        solver: &mut dyn Solver,
    ) -> FvmResult<TimeStepStats>
    where
        M: CellTopology + ?Sized,
        P: PropertyModel + ?Sized,
    {
        let step = ThetaStep::new(self.scheme.effective_time_step(self.dt), self.scheme.theta());
        let system = Assembler::assemble_parallel(mesh, properties, store, &self.temperature, step)?;

        let (next, stats) = solver.solve(&system.matrix, &system.rhs)?;
        if !stats.converged {
            return Err(FvmError::SolverFailure {
                solver: solver.name().to_string(),
                reason: format!(
                    "no convergence after {} iterations (relative residual {:.3e})",
                    stats.iterations, stats.relative_residual
                ),
            });
        }

        self.temperature = next;
        if !self.scheme.is_steady() {
            self.time += self.dt;
        }

        Ok(TimeStepStats {
            time: self.time,
            dt: step.time_step,
            iterations: stats.iterations,
            residual: stats.residual_norm,
        })
    }

    /// Get current simulation time
    pub fn current_time(&self) -> f64 {
        self.time
    }

    pub fn current_temperature(&self) -> &[f64] {
        &self.temperature
    }

    /// Reset to t = 0 and the initial field
    pub fn reset(&mut self) {
        self.time = 0.0;
        self.temperature.clone_from(&self.initial);
    }

    /// Change time step size
    pub fn set_timestep(&mut self, new_dt: f64) -> FvmResult<()> {
        check_time_step(new_dt)?;
        self.dt = new_dt;
        Ok(())
    }
}

fn check_time_step(dt: f64) -> FvmResult<()> {
    if dt > 0.0 && dt.is_finite() {
        Ok(())
    } else {
        Err(FvmError::InvalidAssemblyInput(format!(
            "time step must be positive and finite, got {}",
            dt
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bc::ValueArity;
    use crate::linalg::DirectSolver;
    use crate::mesh::{Axis, Mesh1D};
    use crate::physics::{Material, MaterialProperty, DENSITY, SPECIFIC_HEAT, THERMAL_CONDUCTIVITY};
    use approx::assert_relative_eq;

    fn unit_material() -> Material {
        Material::new("unit")
            .with_property(THERMAL_CONDUCTIVITY, MaterialProperty::constant(1.0))
            .with_property(SPECIFIC_HEAT, MaterialProperty::constant(1.0))
            .with_property(DENSITY, MaterialProperty::constant(1.0))
    }

    #[test]
    fn test_scheme_theta() {
        assert_eq!(TimeScheme::Explicit.theta(), 0.0);
        assert_eq!(TimeScheme::Implicit.theta(), 1.0);
        assert_eq!(TimeScheme::CrankNicolson.theta(), 0.5);
        assert!(TimeScheme::Steady.effective_time_step(3.0).is_infinite());
        assert_eq!("crank_nicolson".parse::<TimeScheme>().unwrap(), TimeScheme::CrankNicolson);
        assert!("leapfrog".parse::<TimeScheme>().is_err());
    }

    #[test]
    fn test_integrator_creation() {
        let integrator = ThetaIntegrator::new(TimeScheme::Implicit, 0.5, vec![1.0; 4]).unwrap();
        assert_eq!(integrator.current_time(), 0.0);
        assert_eq!(integrator.current_temperature(), &[1.0; 4]);
        assert!(ThetaIntegrator::new(TimeScheme::Implicit, 0.0, vec![1.0]).is_err());
        assert!(ThetaIntegrator::new(TimeScheme::Steady, f64::INFINITY, vec![1.0]).is_ok());
    }

    #[test]
    fn test_step_advances_and_reset() {
        let mesh = Mesh1D::build((0.0, 1.0), 5, 1.0).unwrap();
        let mut store = BoundaryConditionStore::new(5, ValueArity::Scalar);
        store.apply_by_coordinate(&mesh, Axis::X, 0.0, &[10.0], 1e-9).unwrap();

        let mut integrator = ThetaIntegrator::new(TimeScheme::Implicit, 0.1, vec![0.0; 5]).unwrap();
        let mut solver = DirectSolver::new();
        let stats = integrator.step(&mesh, &unit_material(), &store, &mut solver).unwrap();

        assert_relative_eq!(stats.time, 0.1);
        assert_relative_eq!(stats.dt, 0.1);
        // Heat enters from x = 0; the field decreases away from it
        let t = integrator.current_temperature();
        assert!(t[0] > t[1] && t[1] > t[4] && t[4] > 0.0);

        integrator.reset();
        assert_eq!(integrator.current_time(), 0.0);
        assert!(integrator.current_temperature().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_set_timestep() {
        let mut integrator = ThetaIntegrator::new(TimeScheme::Implicit, 1.0, vec![0.0]).unwrap();
        integrator.set_timestep(0.5).unwrap();
        assert_eq!(integrator.dt, 0.5);
        assert!(integrator.set_timestep(-1.0).is_err());
    }
}
