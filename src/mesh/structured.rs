//! Structured hexahedral grid: point generation, face extraction, adjacency.

use nalgebra::Point3;
use rayon::prelude::*;
use crate::error::{FvmError, FvmResult};
use super::geometry::{self, Geometry};
use super::topology::{
    pairwise_adjacency, verify_adjacency, AdjacencyRecord, Connectivity, Face, FaceTable,
    HexCell, LocalFace,
};
use super::{Axis, CellTopology};

/// How cell neighbors are discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdjacencyStrategy {
    /// Neighbors from `(i±1, j, k)`, `(i, j±1, k)`, `(i, j, k±1)`; linear cost
    #[default]
    Indexed,
    /// Vertex intersection over all cell pairs; quadratic cost
    Pairwise,
}

/// Structured hexahedral mesh over an axis-aligned box
///
/// Cells are numbered x fastest, then y, then z. Everything is computed in
/// [`StructuredMesh::build`] and is read-only afterwards.
#[derive(Debug, Clone)]
pub struct StructuredMesh {
    bounds: [(f64, f64); 3],
    divisions: [usize; 3],
    spacing: [f64; 3],
    pub geometry: Geometry,
    pub connectivity: Connectivity,
    faces: FaceTable,
    cell_centers: Vec<Point3<f64>>,
    cell_volumes: Vec<f64>,
    adjacency: Vec<AdjacencyRecord>,
}

impl StructuredMesh {
    /// Build a mesh with index-based adjacency
    ///
    /// # Arguments
    /// * `bounds` - `(min, max)` per axis
    /// * `divisions` - number of cells per axis, each ≥ 1
    pub fn build(bounds: [(f64, f64); 3], divisions: [usize; 3]) -> FvmResult<Self> {
        Self::build_with(bounds, divisions, AdjacencyStrategy::Indexed)
    }

    pub fn build_with(
        bounds: [(f64, f64); 3],
        divisions: [usize; 3],
        strategy: AdjacencyStrategy,
    ) -> FvmResult<Self> {
        validate_domain(&bounds, &divisions)?;

        let [nx, ny, nz] = divisions;
        let spacing = [0, 1, 2].map(|a| (bounds[a].1 - bounds[a].0) / divisions[a] as f64);

        let mut geometry = Geometry::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
        for k in 0..=nz {
            for j in 0..=ny {
                for i in 0..=nx {
                    geometry.add_node(
                        bounds[0].0 + i as f64 * spacing[0],
                        bounds[1].0 + j as f64 * spacing[1],
                        bounds[2].0 + k as f64 * spacing[2],
                    );
                }
            }
        }

        let point_index = |i: usize, j: usize, k: usize| i + (nx + 1) * (j + (ny + 1) * k);

        let num_cells = nx * ny * nz;
        let mut connectivity = Connectivity::new();
        connectivity.hex_cells.reserve(num_cells);
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    connectivity.hex_cells.push(HexCell::new([
                        point_index(i, j, k),
                        point_index(i + 1, j, k),
                        point_index(i + 1, j + 1, k),
                        point_index(i, j + 1, k),
                        point_index(i, j, k + 1),
                        point_index(i + 1, j, k + 1),
                        point_index(i + 1, j + 1, k + 1),
                        point_index(i, j + 1, k + 1),
                    ]));
                }
            }
        }

        // Face extraction stays sequential so face ids are deterministic
        let mut faces = FaceTable::with_capacity(expected_face_count(divisions));
        connectivity.cell_faces.reserve(num_cells);
        for cell in &connectivity.hex_cells {
            let mut ids = [0usize; 6];
            for local in LocalFace::ALL {
                ids[local.index()] =
                    faces.insert_or_lookup(cell.face_points(local), |pts| make_face(&geometry, pts))?;
            }
            connectivity.cell_faces.push(ids);
        }

        let cell_centers: Vec<Point3<f64>> = connectivity
            .hex_cells
            .par_iter()
            .map(|cell| geometry::centroid(&geometry.gather(&cell.points)))
            .collect();

        let adjacency: Vec<AdjacencyRecord> = match strategy {
            AdjacencyStrategy::Indexed => (0..num_cells)
                .into_par_iter()
                .map(|c| indexed_record(c, divisions, &connectivity.cell_faces[c]))
                .collect(),
            AdjacencyStrategy::Pairwise => pairwise_adjacency(&connectivity, &faces)?,
        };
        verify_adjacency(&adjacency, faces.len())?;

        let cell_volumes = adjacency
            .iter()
            .map(|rec| {
                let areas: Vec<f64> = rec.all_faces().map(|f| faces[f].area).collect();
                geometry::cell_volume(&areas)
            })
            .collect::<FvmResult<Vec<f64>>>()?;

        log::info!(
            "Structured mesh {}x{}x{}: {} points, {} cells, {} faces ({:?} adjacency)",
            nx,
            ny,
            nz,
            geometry.num_nodes(),
            num_cells,
            faces.len(),
            strategy
        );

        Ok(Self {
            bounds,
            divisions,
            spacing,
            geometry,
            connectivity,
            faces,
            cell_centers,
            cell_volumes,
            adjacency,
        })
    }

    pub fn bounds(&self) -> [(f64, f64); 3] {
        self.bounds
    }

    pub fn divisions(&self) -> [usize; 3] {
        self.divisions
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    pub fn faces(&self) -> &FaceTable {
        &self.faces
    }

    /// Face ids of a cell, indexed by [`LocalFace::index`]
    pub fn cell_faces(&self, cell: usize) -> [usize; 6] {
        self.connectivity.cell_faces[cell]
    }

    pub fn cell_index(&self, i: usize, j: usize, k: usize) -> usize {
        let [nx, ny, _] = self.divisions;
        i + nx * (j + ny * k)
    }

    pub fn cell_ijk(&self, cell: usize) -> (usize, usize, usize) {
        cell_ijk(cell, self.divisions)
    }

    pub fn adjacency_records(&self) -> &[AdjacencyRecord] {
        &self.adjacency
    }
}

impl CellTopology for StructuredMesh {
    fn num_cells(&self) -> usize {
        self.connectivity.num_cells()
    }

    fn num_faces(&self) -> usize {
        self.faces.len()
    }

    fn num_points(&self) -> usize {
        self.geometry.num_nodes()
    }

    fn point(&self, id: usize) -> Point3<f64> {
        self.geometry.nodes[id]
    }

    fn cell_points(&self, cell: usize) -> &[usize] {
        &self.connectivity.hex_cells[cell].points
    }

    fn adjacency(&self, cell: usize) -> &AdjacencyRecord {
        &self.adjacency[cell]
    }

    fn cell_center(&self, cell: usize) -> Point3<f64> {
        self.cell_centers[cell]
    }

    fn cell_volume(&self, cell: usize) -> f64 {
        self.cell_volumes[cell]
    }

    fn face_center(&self, face: usize) -> Point3<f64> {
        self.faces[face].center
    }

    fn face_area(&self, face: usize) -> f64 {
        self.faces[face].area
    }
}

/// `3·nx·ny·nz + nx·ny + ny·nz + nx·nz`
pub fn expected_face_count(divisions: [usize; 3]) -> usize {
    let [nx, ny, nz] = divisions;
    3 * nx * ny * nz + nx * ny + ny * nz + nx * nz
}

fn validate_domain(bounds: &[(f64, f64); 3], divisions: &[usize; 3]) -> FvmResult<()> {
    for axis in Axis::ALL {
        let a = axis.index();
        let (min, max) = bounds[a];
        if divisions[a] == 0 {
            return Err(FvmError::InvalidDomain(format!(
                "divisions along {} must be at least 1",
                axis
            )));
        }
        if !min.is_finite() || !max.is_finite() || max <= min {
            return Err(FvmError::InvalidDomain(format!(
                "bounds along {} must satisfy min < max, got ({}, {})",
                axis, min, max
            )));
        }
    }
    Ok(())
}

fn make_face(geometry: &Geometry, points: &[usize; 4]) -> FvmResult<Face> {
    let coords = geometry.gather(points);
    Ok(Face {
        points: *points,
        center: geometry::centroid(&coords),
        area: geometry::polygon_area(&coords)?,
    })
}

fn cell_ijk(cell: usize, divisions: [usize; 3]) -> (usize, usize, usize) {
    let [nx, ny, _] = divisions;
    (cell % nx, (cell / nx) % ny, cell / (nx * ny))
}

fn indexed_record(cell: usize, divisions: [usize; 3], cell_faces: &[usize; 6]) -> AdjacencyRecord {
    let [nx, ny, nz] = divisions;
    let (i, j, k) = cell_ijk(cell, divisions);
    let layer = nx * ny;

    let mut record = AdjacencyRecord::new(cell);
    for local in LocalFace::ALL {
        let neighbor = match local {
            LocalFace::West if i > 0 => Some(cell - 1),
            LocalFace::East if i + 1 < nx => Some(cell + 1),
            LocalFace::South if j > 0 => Some(cell - nx),
            LocalFace::North if j + 1 < ny => Some(cell + nx),
            LocalFace::Bottom if k > 0 => Some(cell - layer),
            LocalFace::Top if k + 1 < nz => Some(cell + layer),
            _ => None,
        };
        let face = cell_faces[local.index()];
        match neighbor {
            Some(n) => {
                record.shared_cells.push(n);
                record.shared_faces.push(face);
            }
            None => record.boundary_faces.push(face),
        }
    }
    record
}
