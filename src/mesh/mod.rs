pub mod geometry;
pub mod topology;
pub mod structured;
pub mod structured_1d;
pub mod fields;

use std::collections::HashSet;
use std::fmt;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use crate::error::{FvmError, FvmResult};

pub use geometry::{Geometry, polygon_area, polygon_area_with_normal, centroid};
pub use topology::{AdjacencyRecord, Connectivity, Face, FaceTable, HexCell, LocalFace};
pub use structured::{AdjacencyStrategy, StructuredMesh};
pub use structured_1d::Mesh1D;
pub use fields::{FieldData, ScalarField, interpolate_to_nodes, apply_nodal_dirichlet};

/// Cartesian coordinate axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

/// Read-only cell/face view consumed by boundary handling and assembly
///
/// Implementors are frozen after construction, so they can be shared across
/// assembly threads.
pub trait CellTopology: Sync {
    fn num_cells(&self) -> usize;
    fn num_faces(&self) -> usize;
    fn num_points(&self) -> usize;

    fn point(&self, id: usize) -> Point3<f64>;
    /// Point ids of a cell
    fn cell_points(&self, cell: usize) -> &[usize];
    fn adjacency(&self, cell: usize) -> &AdjacencyRecord;

    fn cell_center(&self, cell: usize) -> Point3<f64>;
    fn cell_volume(&self, cell: usize) -> f64;
    fn face_center(&self, face: usize) -> Point3<f64>;
    fn face_area(&self, face: usize) -> f64;

    /// Faces whose center lies within `tolerance` of `value` along `axis`
    fn faces_near_coordinate(&self, axis: Axis, value: f64, tolerance: f64) -> Vec<usize> {
        (0..self.num_faces())
            .filter(|&f| (self.face_center(f)[axis.index()] - value).abs() <= tolerance)
            .collect()
    }

    /// Like [`CellTopology::faces_near_coordinate`], but an empty result is an error
    fn faces_by_coordinate(&self, axis: Axis, value: f64, tolerance: f64) -> FvmResult<Vec<usize>> {
        let faces = self.faces_near_coordinate(axis, value, tolerance);
        if faces.is_empty() {
            return Err(FvmError::NoMatch { axis, coordinate: value, tolerance });
        }
        Ok(faces)
    }

    /// Boundary faces on a coordinate plane
    ///
    /// # Errors
    /// * `NoMatch` - no face center on the plane
    /// * `InteriorPlane` - the plane only cuts interior faces
    fn boundary_faces_by_coordinate(&self, axis: Axis, value: f64, tolerance: f64) -> FvmResult<Vec<usize>> {
        let faces = self.faces_by_coordinate(axis, value, tolerance)?;
        let boundary: HashSet<usize> = (0..self.num_cells())
            .flat_map(|c| self.adjacency(c).boundary_faces.iter().copied())
            .collect();
        let faces: Vec<usize> = faces.into_iter().filter(|f| boundary.contains(f)).collect();
        if faces.is_empty() {
            return Err(FvmError::InteriorPlane { axis, coordinate: value });
        }
        Ok(faces)
    }

    /// The single cell owning a boundary face (linear search)
    fn cell_owning_face(&self, face: usize) -> FvmResult<usize> {
        (0..self.num_cells())
            .find(|&c| self.adjacency(c).boundary_faces.contains(&face))
            .ok_or(FvmError::UnknownFace(face))
    }

    /// Every cell that has `face` among its faces (two for interior faces)
    fn cells_sharing_face(&self, face: usize) -> Vec<usize> {
        (0..self.num_cells())
            .filter(|&c| self.adjacency(c).all_faces().any(|f| f == face))
            .collect()
    }
}

/// Mesh variant selected from the configured divisions
#[derive(Debug, Clone)]
pub enum Mesh {
    OneD(Mesh1D),
    ThreeD(StructuredMesh),
}

impl Mesh {
    fn inner(&self) -> &dyn CellTopology {
        match self {
            Mesh::OneD(m) => m,
            Mesh::ThreeD(m) => m,
        }
    }

    pub fn dimension(&self) -> usize {
        match self {
            Mesh::OneD(_) => 1,
            Mesh::ThreeD(_) => 3,
        }
    }
}

impl CellTopology for Mesh {
    fn num_cells(&self) -> usize {
        self.inner().num_cells()
    }

    fn num_faces(&self) -> usize {
        self.inner().num_faces()
    }

    fn num_points(&self) -> usize {
        self.inner().num_points()
    }

    fn point(&self, id: usize) -> Point3<f64> {
        self.inner().point(id)
    }

    fn cell_points(&self, cell: usize) -> &[usize] {
        self.inner().cell_points(cell)
    }

    fn adjacency(&self, cell: usize) -> &AdjacencyRecord {
        self.inner().adjacency(cell)
    }

    fn cell_center(&self, cell: usize) -> Point3<f64> {
        self.inner().cell_center(cell)
    }

    fn cell_volume(&self, cell: usize) -> f64 {
        self.inner().cell_volume(cell)
    }

    fn face_center(&self, face: usize) -> Point3<f64> {
        self.inner().face_center(face)
    }

    fn face_area(&self, face: usize) -> f64 {
        self.inner().face_area(face)
    }

    fn faces_near_coordinate(&self, axis: Axis, value: f64, tolerance: f64) -> Vec<usize> {
        self.inner().faces_near_coordinate(axis, value, tolerance)
    }
}
