//! Configuration management for heat-diffusion runs
//!
//! Reads TOML configuration files and provides structured data for building
//! the mesh, material, boundary conditions, linear solver and time stepping.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use crate::bc::{BoundaryConditionStore, BoundaryKind, BoundaryRecord, ValueArity};
use crate::error::{FvmError, FvmResult};
use crate::fvm::TimeScheme;
use crate::linalg::{BiCGSTAB, ConjugateGradient, DirectSolver, Solver};
use crate::mesh::{Axis, CellTopology};
use crate::physics::material::DEFAULT_REFERENCE_TEMPERATURE;
use crate::physics::{Material, MaterialProperty, PropertyMethod};

/// Main simulation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    pub domain: DomainConfig,
    pub material: MaterialConfig,
    #[serde(default)]
    pub boundary: BoundaryConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub time: TimeConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DomainConfig {
    /// Bounds along x (m)
    pub x: [f64; 2],
    /// Bounds along y (m), ignored for 1D
    #[serde(default = "default_interval")]
    pub y: [f64; 2],
    /// Bounds along z (m), ignored for 1D
    #[serde(default = "default_interval")]
    pub z: [f64; 2],
    /// Cells per axis; a single entry selects the 1D slab mesh
    pub divisions: Vec<usize>,
    /// Cross-section area of the 1D mesh (m²)
    #[serde(default = "default_area")]
    pub area: f64,
}

fn default_interval() -> [f64; 2] { [0.0, 1.0] }
fn default_area() -> f64 { 1.0 }

impl DomainConfig {
    pub fn bounds(&self) -> [(f64, f64); 3] {
        [(self.x[0], self.x[1]), (self.y[0], self.y[1]), (self.z[0], self.z[1])]
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MaterialConfig {
    pub name: String,
    pub properties: HashMap<String, PropertyConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PropertyConfig {
    pub base_value: f64,
    /// constant | linear | polynomial | exponential
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub coefficients: Vec<f64>,
    #[serde(default = "default_reference_temperature")]
    pub reference_temperature: f64,
}

fn default_method() -> String { "constant".to_string() }
fn default_reference_temperature() -> f64 { DEFAULT_REFERENCE_TEMPERATURE }

impl MaterialConfig {
    /// Build the material, resolving method names
    pub fn build(&self) -> FvmResult<Material> {
        let mut material = Material::new(&self.name);
        for (name, p) in &self.properties {
            let method: PropertyMethod = p.method.parse()?;
            material.add_property(
                name,
                MaterialProperty::new(p.base_value, method, p.coefficients.clone())
                    .with_reference_temperature(p.reference_temperature),
            );
        }
        Ok(material)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoundaryConfig {
    #[serde(default)]
    pub value_type: ValueArity,
    /// Coordinate match tolerance for face lookup
    #[serde(default = "default_face_tolerance")]
    pub tolerance: f64,
    #[serde(default)]
    pub convection_coefficient: f64,
    #[serde(default)]
    pub emissivity: f64,
    #[serde(default)]
    pub ambient_temperature: f64,
    #[serde(default)]
    pub dependent_source: f64,
    #[serde(default)]
    pub independent_source: f64,
    #[serde(default)]
    pub volumetric_source: f64,
    #[serde(default)]
    pub conditions: Vec<BoundaryRecord>,
}

fn default_face_tolerance() -> f64 { 1e-6 }

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            value_type: ValueArity::Scalar,
            tolerance: default_face_tolerance(),
            convection_coefficient: 0.0,
            emissivity: 0.0,
            ambient_temperature: 0.0,
            dependent_source: 0.0,
            independent_source: 0.0,
            volumetric_source: 0.0,
            conditions: Vec::new(),
        }
    }
}

impl BoundaryConfig {
    /// Populate a store for `mesh` from the configured records and scalars
    pub fn build_store<M>(&self, mesh: &M) -> FvmResult<BoundaryConditionStore>
    where
        M: CellTopology + ?Sized,
    {
        let mut store = BoundaryConditionStore::new(mesh.num_cells(), self.value_type);
        store.convection_coefficient = self.convection_coefficient;
        store.emissivity = self.emissivity;
        store.ambient_temperature = self.ambient_temperature;
        store.set_uniform_sources(self.dependent_source, self.independent_source, self.volumetric_source);

        for record in &self.conditions {
            store.apply_record(mesh, record, self.tolerance)?;
        }
        Ok(store)
    }

    /// Temperature records, used for nodal overrides after interpolation
    pub fn temperature_planes(&self) -> impl Iterator<Item = &BoundaryRecord> + '_ {
        self.conditions
            .iter()
            .filter(|r| r.kind.parse::<BoundaryKind>().ok() == Some(BoundaryKind::Temperature))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverMethod {
    Direct,
    ConjugateGradient,
    Bicgstab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PreconditionerKind {
    None,
    Jacobi,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SolverConfig {
    pub method: SolverMethod,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_abs_tolerance")]
    pub abs_tolerance: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_preconditioner")]
    pub preconditioner: PreconditionerKind,
}

fn default_tolerance() -> f64 { 1e-10 }
fn default_abs_tolerance() -> f64 { 1e-12 }
fn default_max_iterations() -> usize { 10_000 }
fn default_preconditioner() -> PreconditionerKind { PreconditionerKind::Jacobi }

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            method: SolverMethod::Bicgstab,
            tolerance: default_tolerance(),
            abs_tolerance: default_abs_tolerance(),
            max_iterations: default_max_iterations(),
            preconditioner: default_preconditioner(),
        }
    }
}

impl SolverConfig {
    /// Instantiate the configured solver
    pub fn build(&self) -> Box<dyn Solver> {
        let jacobi = self.preconditioner == PreconditionerKind::Jacobi;
        match self.method {
            SolverMethod::Direct => Box::new(DirectSolver::new()),
            SolverMethod::ConjugateGradient => Box::new(
                ConjugateGradient::new()
                    .with_tolerance(self.tolerance)
                    .with_abs_tolerance(self.abs_tolerance)
                    .with_max_iterations(self.max_iterations)
                    .with_preconditioner(jacobi),
            ),
            SolverMethod::Bicgstab => Box::new(
                BiCGSTAB::new()
                    .with_tolerance(self.tolerance)
                    .with_abs_tolerance(self.abs_tolerance)
                    .with_max_iterations(self.max_iterations)
                    .with_preconditioner(jacobi),
            ),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeConfig {
    pub scheme: TimeScheme,
    /// Δt (s), ignored for steady runs
    #[serde(default = "default_time_step")]
    pub time_step: f64,
    #[serde(default = "default_steps")]
    pub steps: usize,
    /// Uniform initial cell temperature (K)
    #[serde(default = "default_reference_temperature")]
    pub initial_temperature: f64,
}

fn default_time_step() -> f64 { 1.0 }
fn default_steps() -> usize { 1 }

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            scheme: TimeScheme::Steady,
            time_step: default_time_step(),
            steps: default_steps(),
            initial_temperature: DEFAULT_REFERENCE_TEMPERATURE,
        }
    }
}

impl SimulationConfig {
    /// Load configuration from TOML file and validate it
    pub fn from_file<P: AsRef<Path>>(path: P) -> FvmResult<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from a TOML string and validate it
    pub fn from_toml_str(contents: &str) -> FvmResult<Self> {
        let config: SimulationConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check everything that can be checked without building the mesh
    pub fn validate(&self) -> FvmResult<()> {
        let d = &self.domain;
        let dims = match d.divisions.len() {
            1 => 1,
            3 => 3,
            n => {
                return Err(FvmError::InvalidConfig(format!(
                    "domain.divisions needs 1 or 3 entries, got {}",
                    n
                )))
            }
        };
        if d.divisions.iter().any(|&n| n == 0) {
            return Err(FvmError::InvalidConfig("domain.divisions must all be at least 1".into()));
        }
        for (name, [lo, hi]) in [("x", d.x), ("y", d.y), ("z", d.z)].into_iter().take(dims) {
            if !(lo < hi) {
                return Err(FvmError::InvalidConfig(format!(
                    "domain.{} must be [min, max] with min < max, got [{}, {}]",
                    name, lo, hi
                )));
            }
        }
        if dims == 1 && !(d.area > 0.0) {
            return Err(FvmError::InvalidConfig(format!("domain.area must be positive, got {}", d.area)));
        }

        for (name, p) in &self.material.properties {
            p.method.parse::<PropertyMethod>().map_err(|_| {
                FvmError::InvalidConfig(format!(
                    "material.properties.{}: unknown method '{}'",
                    name, p.method
                ))
            })?;
        }

        let b = &self.boundary;
        if !(b.tolerance > 0.0) {
            return Err(FvmError::InvalidConfig(format!("boundary.tolerance must be positive, got {}", b.tolerance)));
        }
        for record in &b.conditions {
            let kind: BoundaryKind = record.kind.parse()?;
            if dims == 1 && record.axis != Axis::X {
                return Err(FvmError::InvalidConfig(format!(
                    "{} condition on {} = {}: a 1D domain only has x planes",
                    kind, record.axis, record.coordinate
                )));
            }
            let expected = match kind {
                BoundaryKind::Temperature => b.value_type.components(),
                BoundaryKind::Flux | BoundaryKind::Convective => 1,
            };
            if record.value.len() != expected {
                return Err(FvmError::InvalidConfig(format!(
                    "{} condition on {} = {} needs {} value(s), got {}",
                    kind,
                    record.axis,
                    record.coordinate,
                    expected,
                    record.value.len()
                )));
            }
        }

        let s = &self.solver;
        if !(s.tolerance > 0.0) || s.abs_tolerance < 0.0 || s.max_iterations == 0 {
            return Err(FvmError::InvalidConfig(
                "solver tolerance must be positive and max_iterations at least 1".into(),
            ));
        }

        let t = &self.time;
        if !t.scheme.is_steady() {
            if !(t.time_step > 0.0 && t.time_step.is_finite()) {
                return Err(FvmError::InvalidConfig(format!(
                    "time.time_step must be positive for {} runs, got {}",
                    t.scheme, t.time_step
                )));
            }
            if t.steps == 0 {
                return Err(FvmError::InvalidConfig("time.steps must be at least 1".into()));
            }
        }

        Ok(())
    }

    /// One-paragraph summary for logs
    pub fn summary(&self) -> String {
        format!(
            "domain {:?} x {:?} x {:?}, divisions {:?}; material '{}' ({} properties); \
             {} boundary conditions; solver {:?}; scheme {} (dt = {}, steps = {})",
            self.domain.x,
            self.domain.y,
            self.domain.z,
            self.domain.divisions,
            self.material.name,
            self.material.properties.len(),
            self.boundary.conditions.len(),
            self.solver.method,
            self.time.scheme,
            self.time.time_step,
            self.time.steps
        )
    }
}
