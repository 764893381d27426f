//! End-to-end driver: configuration → mesh → boundary store → time loop → nodal field.

use crate::bc::BoundaryConditionStore;
use crate::config::SimulationConfig;
use crate::error::FvmResult;
use crate::fvm::{ThetaIntegrator, TimeStepStats};
use crate::mesh::{apply_nodal_dirichlet, interpolate_to_nodes, CellTopology, FieldData, Mesh, ScalarField};
use crate::mesh_generator::build_mesh;
use crate::physics::Material;

/// Outcome of a run
#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// Final cell temperatures
    pub cell_temperature: Vec<f64>,
    /// Final temperatures interpolated to mesh points, Dirichlet planes imposed
    pub node_temperature: Vec<f64>,
    /// One entry per step taken
    pub history: Vec<TimeStepStats>,
}

impl SimulationResult {
    /// Final fields as named cell/node data
    pub fn fields(&self) -> FieldData {
        let mut data = FieldData::new();
        data.add_field(ScalarField::on_cells("temperature", self.cell_temperature.clone()));
        data.add_field(ScalarField::on_nodes("temperature", self.node_temperature.clone()));
        data
    }

    pub fn final_time(&self) -> f64 {
        self.history.last().map_or(0.0, |s| s.time)
    }
}

/// A configured heat-diffusion problem
pub struct Simulation {
    config: SimulationConfig,
    mesh: Mesh,
    material: Material,
    store: BoundaryConditionStore,
}

impl Simulation {
    /// Validate the configuration and build mesh, material and boundary store
    pub fn from_config(config: &SimulationConfig) -> FvmResult<Self> {
        config.validate()?;
        let mesh = build_mesh(&config.domain)?;
        let material = config.material.build()?;
        let store = config.boundary.build_store(&mesh)?;

        log::info!("Simulation set up: {}", config.summary());

        Ok(Self {
            config: config.clone(),
            mesh,
            material,
            store,
        })
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn store(&self) -> &BoundaryConditionStore {
        &self.store
    }

    /// Mutable access to the boundary store, e.g. for per-cell sources
    pub fn store_mut(&mut self) -> &mut BoundaryConditionStore {
        &mut self.store
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Run the configured scheme from the uniform initial temperature
    ///
    /// Steady runs take a single step; transient runs take `time.steps` steps.
    pub fn run(&self) -> FvmResult<SimulationResult> {
        let time = &self.config.time;
        let initial = vec![time.initial_temperature; self.mesh.num_cells()];
        let mut integrator = ThetaIntegrator::new(time.scheme, time.time_step, initial)?;
        let mut solver = self.config.solver.build();

        let steps = if time.scheme.is_steady() { 1 } else { time.steps };
        let mut history = Vec::with_capacity(steps);

        for n in 0..steps {
            let stats = integrator.step(&self.mesh, &self.material, &self.store, solver.as_mut())?;
            log::info!(
                "Step {:4}/{}: t = {:.4e}, iterations = {}, residual = {:.3e}",
                n + 1,
                steps,
                stats.time,
                stats.iterations,
                stats.residual
            );
            history.push(stats);
        }

        let cell_temperature = integrator.temperature;
        let mut node_temperature = interpolate_to_nodes(&self.mesh, &cell_temperature)?;
        for record in self.config.boundary.temperature_planes() {
            if let Some(&value) = record.value.first() {
                apply_nodal_dirichlet(
                    &self.mesh,
                    &mut node_temperature,
                    record.axis,
                    record.coordinate,
                    value,
                    self.config.boundary.tolerance,
                );
            }
        }

        Ok(SimulationResult {
            cell_temperature,
            node_temperature,
            history,
        })
    }
}
