//! Error types shared by mesh construction, boundary handling, assembly and solving.

use thiserror::Error;

use crate::mesh::Axis;

/// Result alias used throughout the crate
pub type FvmResult<T> = Result<T, FvmError>;

/// All failure kinds produced by the discretization pipeline
#[derive(Debug, Error)]
pub enum FvmError {
    /// Non-positive divisions or degenerate bounds
    #[error("invalid domain: {0}")]
    InvalidDomain(String),

    /// Too few points, or the first three points are collinear
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// A polygon vertex lies off the plane of the first three points
    #[error("non-planar polygon: point {index} is {distance:.3e} from the reference plane")]
    NonPlanarGeometry { index: usize, distance: f64 },

    /// Coordinate-based face query returned nothing
    #[error("no faces found at {axis} = {coordinate} (tolerance {tolerance:e})")]
    NoMatch {
        axis: Axis,
        coordinate: f64,
        tolerance: f64,
    },

    /// A boundary condition plane that only cuts interior faces
    #[error("no boundary faces at {axis} = {coordinate}; the plane lies inside the domain")]
    InteriorPlane { axis: Axis, coordinate: f64 },

    /// Boundary value component count does not match the store arity
    #[error("boundary value has {provided} components, store expects {expected}")]
    ArityMismatch { expected: usize, provided: usize },

    #[error("face {0} is not owned by any cell")]
    UnknownFace(usize),

    #[error("unknown property evaluation method '{0}' (expected constant, linear, polynomial or exponential)")]
    UnknownMethod(String),

    #[error("property '{property}' is not defined for material '{material}'")]
    UnknownProperty { material: String, property: String },

    #[error("invalid assembly input: {0}")]
    InvalidAssemblyInput(String),

    /// Adjacency records violate symmetry or face ownership
    #[error("inconsistent mesh topology: {0}")]
    InvalidTopology(String),

    #[error("linear solver '{solver}' failed: {reason}")]
    SolverFailure { solver: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}
