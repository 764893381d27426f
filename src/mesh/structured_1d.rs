//! One-dimensional slab mesh along x with a constant cross-section.

use nalgebra::Point3;
use crate::error::{FvmError, FvmResult};
use super::geometry::Geometry;
use super::topology::{verify_adjacency, AdjacencyRecord};
use super::{Axis, CellTopology};

/// Line of `n` cells along x; faces are the `n + 1` grid points, each with
/// the same cross-section area
#[derive(Debug, Clone)]
pub struct Mesh1D {
    bounds: (f64, f64),
    divisions: usize,
    face_area: f64,
    pub geometry: Geometry,
    cells: Vec<[usize; 2]>,
    cell_centers: Vec<Point3<f64>>,
    cell_volume: f64,
    adjacency: Vec<AdjacencyRecord>,
}

impl Mesh1D {
    pub fn build(bounds: (f64, f64), divisions: usize, face_area: f64) -> FvmResult<Self> {
        let (min, max) = bounds;
        if divisions == 0 {
            return Err(FvmError::InvalidDomain("divisions along x must be at least 1".to_string()));
        }
        if !min.is_finite() || !max.is_finite() || max <= min {
            return Err(FvmError::InvalidDomain(format!(
                "bounds along x must satisfy min < max, got ({}, {})",
                min, max
            )));
        }
        if !(face_area > 0.0 && face_area.is_finite()) {
            return Err(FvmError::InvalidDomain(format!(
                "cross-section area must be positive, got {}",
                face_area
            )));
        }

        let dx = (max - min) / divisions as f64;

        let mut geometry = Geometry::with_capacity(divisions + 1);
        for i in 0..=divisions {
            geometry.add_node(min + i as f64 * dx, 0.0, 0.0);
        }

        let cells: Vec<[usize; 2]> = (0..divisions).map(|i| [i, i + 1]).collect();
        let cell_centers = cells
            .iter()
            .map(|&[a, b]| nalgebra::center(&geometry.nodes[a], &geometry.nodes[b]))
            .collect();

        let adjacency: Vec<AdjacencyRecord> = (0..divisions)
            .map(|i| {
                let mut rec = AdjacencyRecord::new(i);
                if i > 0 {
                    rec.shared_cells.push(i - 1);
                    rec.shared_faces.push(i);
                } else {
                    rec.boundary_faces.push(i);
                }
                if i + 1 < divisions {
                    rec.shared_cells.push(i + 1);
                    rec.shared_faces.push(i + 1);
                } else {
                    rec.boundary_faces.push(i + 1);
                }
                rec
            })
            .collect();
        verify_adjacency(&adjacency, divisions + 1)?;

        log::info!("1D mesh: {} cells, dx = {:e}, area = {:e}", divisions, dx, face_area);

        Ok(Self {
            bounds,
            divisions,
            face_area,
            geometry,
            cells,
            cell_centers,
            cell_volume: face_area * dx,
            adjacency,
        })
    }

    pub fn bounds(&self) -> (f64, f64) {
        self.bounds
    }

    pub fn divisions(&self) -> usize {
        self.divisions
    }

    pub fn spacing(&self) -> f64 {
        (self.bounds.1 - self.bounds.0) / self.divisions as f64
    }
}

impl CellTopology for Mesh1D {
    fn num_cells(&self) -> usize {
        self.divisions
    }

    fn num_faces(&self) -> usize {
        self.divisions + 1
    }

    fn num_points(&self) -> usize {
        self.geometry.num_nodes()
    }

    fn point(&self, id: usize) -> Point3<f64> {
        self.geometry.nodes[id]
    }

    fn cell_points(&self, cell: usize) -> &[usize] {
        &self.cells[cell]
    }

    fn adjacency(&self, cell: usize) -> &AdjacencyRecord {
        &self.adjacency[cell]
    }

    fn cell_center(&self, cell: usize) -> Point3<f64> {
        self.cell_centers[cell]
    }

    /// Slab volume `area · dx`
    fn cell_volume(&self, _cell: usize) -> f64 {
        self.cell_volume
    }

    fn face_center(&self, face: usize) -> Point3<f64> {
        self.geometry.nodes[face]
    }

    fn face_area(&self, _face: usize) -> f64 {
        self.face_area
    }

    /// Only x planes exist; every point sits at y = z = 0
    fn faces_near_coordinate(&self, axis: Axis, value: f64, tolerance: f64) -> Vec<usize> {
        if axis != Axis::X {
            return Vec::new();
        }
        (0..self.num_faces())
            .filter(|&f| (self.geometry.nodes[f].x - value).abs() <= tolerance)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_line_topology() {
        let mesh = Mesh1D::build((0.0, 1.0), 4, 2.0).unwrap();
        assert_eq!(mesh.num_cells(), 4);
        assert_eq!(mesh.num_faces(), 5);
        assert_eq!(mesh.adjacency(0).boundary_faces, vec![0]);
        assert_eq!(mesh.adjacency(3).boundary_faces, vec![4]);
        assert_eq!(mesh.adjacency(1).shared_cells, vec![0, 2]);
        assert_relative_eq!(mesh.cell_center(1).x, 0.375);
        assert_relative_eq!(mesh.cell_volume(2), 0.5);
        assert_eq!(mesh.faces_by_coordinate(Axis::X, 1.0, 1e-9).unwrap(), vec![4]);
        assert_eq!(mesh.cell_owning_face(4).unwrap(), 3);
    }

    #[test]
    fn test_only_x_planes_match() {
        let mesh = Mesh1D::build((0.0, 1.0), 4, 1.0).unwrap();
        assert!(mesh.faces_near_coordinate(Axis::Y, 0.0, 1e-9).is_empty());
        assert!(matches!(
            mesh.faces_by_coordinate(Axis::Z, 0.0, 1e-9),
            Err(FvmError::NoMatch { axis: Axis::Z, .. })
        ));
        assert_eq!(mesh.faces_near_coordinate(Axis::X, 0.0, 1e-9), vec![0]);
    }

    #[test]
    fn test_single_cell_line() {
        let mesh = Mesh1D::build((0.0, 1.0), 1, 1.0).unwrap();
        assert_eq!(mesh.adjacency(0).boundary_faces, vec![0, 1]);
    }

    #[test]
    fn test_rejects_bad_domain() {
        assert!(Mesh1D::build((0.0, 1.0), 0, 1.0).is_err());
        assert!(Mesh1D::build((1.0, 0.0), 3, 1.0).is_err());
        assert!(Mesh1D::build((0.0, 1.0), 3, 0.0).is_err());
    }
}
