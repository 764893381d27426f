pub mod error;
pub mod mesh;
pub mod mesh_generator;
pub mod physics;
pub mod bc;     // Boundary conditions
pub mod fvm;
pub mod linalg;
pub mod config;
pub mod simulation;

pub use error::{FvmError, FvmResult};
pub use mesh::{Axis, CellTopology, Mesh, Mesh1D, StructuredMesh, AdjacencyRecord, AdjacencyStrategy, FieldData, ScalarField, polygon_area, polygon_area_with_normal, interpolate_to_nodes, apply_nodal_dirichlet};
pub use mesh_generator::{build_mesh, MeshGenerator};
pub use physics::{Material, MaterialProperty, PropertyMethod, PropertyModel};
pub use bc::{BoundaryConditionStore, BoundaryKind, BoundaryRecord, ValueArity};
pub use fvm::{assemble, Assembler, LinearSystem, ThetaIntegrator, ThetaStep, TimeScheme, TimeStepStats};
pub use linalg::{Solver, SolverStats, DirectSolver, ConjugateGradient, BiCGSTAB};
pub use config::{SimulationConfig, SolverConfig};
pub use simulation::{Simulation, SimulationResult};
