use std::collections::HashMap;
use nalgebra::Point3;
use crate::error::{FvmError, FvmResult};

/// Local faces of a hexahedral cell
///
/// Corner numbering (x fastest, then y, then z):
/// Bottom layer: 0 (x0,y0), 1 (x1,y0), 2 (x1,y1), 3 (x0,y1)
/// Top layer:    4 (x0,y0), 5 (x1,y0), 6 (x1,y1), 7 (x0,y1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalFace {
    West,
    East,
    South,
    North,
    Bottom,
    Top,
}

impl LocalFace {
    pub const ALL: [LocalFace; 6] = [
        LocalFace::West,
        LocalFace::East,
        LocalFace::South,
        LocalFace::North,
        LocalFace::Bottom,
        LocalFace::Top,
    ];

    /// Local corner indices of this face, in perimeter order
    pub fn corners(self) -> [usize; 4] {
        match self {
            LocalFace::West => [0, 3, 7, 4],
            LocalFace::East => [1, 5, 6, 2],
            LocalFace::South => [0, 1, 5, 4],
            LocalFace::North => [2, 6, 7, 3],
            LocalFace::Bottom => [0, 1, 2, 3],
            LocalFace::Top => [4, 5, 6, 7],
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// An 8-node hexahedral cell
#[derive(Debug, Clone)]
pub struct HexCell {
    /// Global point indices for this cell (8 corners)
    pub points: [usize; 8],
}

impl HexCell {
    pub fn new(points: [usize; 8]) -> Self {
        Self { points }
    }

    /// Global point ids of a local face, order preserved
    pub fn face_points(&self, face: LocalFace) -> [usize; 4] {
        face.corners().map(|corner| self.points[corner])
    }
}

/// A deduplicated quadrilateral face
#[derive(Debug, Clone)]
pub struct Face {
    pub points: [usize; 4],
    pub center: Point3<f64>,
    pub area: f64,
}

/// Face table keyed by sorted point-id tuples
///
/// A face that is already present is never re-inserted, so two cells sharing
/// a quad always resolve to the same face id.
#[derive(Debug, Clone, Default)]
pub struct FaceTable {
    faces: Vec<Face>,
    lookup: HashMap<[usize; 4], usize>,
}

impl FaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            faces: Vec::with_capacity(capacity),
            lookup: HashMap::with_capacity(capacity),
        }
    }

    /// Sorted key used for deduplication
    pub fn key(points: &[usize; 4]) -> [usize; 4] {
        let mut key = *points;
        key.sort_unstable();
        key
    }

    /// Return the id of an existing face with the same points, or insert it
    ///
    /// `make_face` runs only on first insertion.
    pub fn insert_or_lookup<F>(&mut self, points: [usize; 4], make_face: F) -> FvmResult<usize>
    where
        F: FnOnce(&[usize; 4]) -> FvmResult<Face>,
    {
        let key = Self::key(&points);
        if let Some(&id) = self.lookup.get(&key) {
            return Ok(id);
        }
        let face = make_face(&points)?;
        let id = self.faces.len();
        self.faces.push(face);
        self.lookup.insert(key, id);
        Ok(id)
    }

    /// Face id for a set of 4 point ids in any order
    pub fn find(&self, points: &[usize; 4]) -> Option<usize> {
        self.lookup.get(&Self::key(points)).copied()
    }

    pub fn get(&self, id: usize) -> Option<&Face> {
        self.faces.get(id)
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

impl std::ops::Index<usize> for FaceTable {
    type Output = Face;

    fn index(&self, id: usize) -> &Face {
        &self.faces[id]
    }
}

/// Neighbor and boundary faces of one cell
#[derive(Debug, Clone, PartialEq)]
pub struct AdjacencyRecord {
    pub cell_id: usize,
    /// Neighboring cells, parallel to `shared_faces`
    pub shared_cells: Vec<usize>,
    /// Face shared with the neighbor at the same position in `shared_cells`
    pub shared_faces: Vec<usize>,
    /// Faces exposed to the domain exterior
    pub boundary_faces: Vec<usize>,
}

impl AdjacencyRecord {
    pub fn new(cell_id: usize) -> Self {
        Self {
            cell_id,
            shared_cells: Vec::new(),
            shared_faces: Vec::new(),
            boundary_faces: Vec::new(),
        }
    }

    /// Interior faces followed by boundary faces
    pub fn all_faces(&self) -> impl Iterator<Item = usize> + '_ {
        self.shared_faces.iter().chain(self.boundary_faces.iter()).copied()
    }

    pub fn num_faces(&self) -> usize {
        self.shared_faces.len() + self.boundary_faces.len()
    }

    /// (neighbor cell, shared face) pairs
    pub fn neighbors(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.shared_cells.iter().copied().zip(self.shared_faces.iter().copied())
    }
}

/// Cell-to-point and cell-to-face connectivity of a hexahedral mesh
#[derive(Debug, Clone, Default)]
pub struct Connectivity {
    pub hex_cells: Vec<HexCell>,
    /// Face id of every local face, indexed by [`LocalFace::index`]
    pub cell_faces: Vec<[usize; 6]>,
}

impl Connectivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_cells(&self) -> usize {
        self.hex_cells.len()
    }
}

/// Adjacency by pairwise vertex intersection
///
/// Two cells are neighbors when they share more than two vertices; the shared
/// face is the one in `faces` made of exactly those vertices. Quadratic in the
/// number of cells; the structured builder uses index arithmetic instead and
/// this variant serves as a cross-check on small meshes.
pub fn pairwise_adjacency(
    connectivity: &Connectivity,
    faces: &FaceTable,
) -> FvmResult<Vec<AdjacencyRecord>> {
    let n = connectivity.num_cells();
    let mut records: Vec<AdjacencyRecord> = (0..n).map(AdjacencyRecord::new).collect();

    for i in 0..n {
        let mut mine = connectivity.hex_cells[i].points;
        mine.sort_unstable();

        for j in (0..n).filter(|&j| j != i) {
            let theirs = &connectivity.hex_cells[j].points;
            let common: Vec<usize> = mine
                .iter()
                .copied()
                .filter(|p| theirs.contains(p))
                .collect();

            if common.len() <= 2 {
                continue;
            }

            let quad: [usize; 4] = common.as_slice().try_into().map_err(|_| {
                FvmError::InvalidTopology(format!(
                    "cells {} and {} share {} vertices, expected a quadrilateral",
                    i,
                    j,
                    common.len()
                ))
            })?;
            let face = faces.find(&quad).ok_or_else(|| {
                FvmError::InvalidTopology(format!(
                    "shared vertices of cells {} and {} do not form a known face",
                    i, j
                ))
            })?;

            records[i].shared_cells.push(j);
            records[i].shared_faces.push(face);
        }

        let boundary: Vec<usize> = connectivity.cell_faces[i]
            .iter()
            .copied()
            .filter(|f| !records[i].shared_faces.contains(f))
            .collect();
        records[i].boundary_faces = boundary;
    }

    Ok(records)
}

/// Check the structural invariants of a set of adjacency records
///
/// - `shared_cells` and `shared_faces` have equal length
/// - shared and boundary faces are disjoint
/// - if `i` lists `j` over face `f`, then `j` lists `i` over `f`
/// - interior faces appear in exactly two records, boundary faces in exactly one
pub fn verify_adjacency(records: &[AdjacencyRecord], num_faces: usize) -> FvmResult<()> {
    let mut shared_count = vec![0usize; num_faces];
    let mut boundary_count = vec![0usize; num_faces];

    for (i, rec) in records.iter().enumerate() {
        if rec.shared_cells.len() != rec.shared_faces.len() {
            return Err(FvmError::InvalidTopology(format!(
                "cell {}: {} shared cells but {} shared faces",
                i,
                rec.shared_cells.len(),
                rec.shared_faces.len()
            )));
        }

        for (j, f) in rec.neighbors() {
            let back = records.get(j).ok_or_else(|| {
                FvmError::InvalidTopology(format!("cell {} lists unknown neighbor {}", i, j))
            })?;
            let symmetric = back.neighbors().any(|(k, g)| k == i && g == f);
            if !symmetric {
                return Err(FvmError::InvalidTopology(format!(
                    "cell {} lists cell {} over face {}, but not vice versa",
                    i, j, f
                )));
            }
            if rec.boundary_faces.contains(&f) {
                return Err(FvmError::InvalidTopology(format!(
                    "cell {}: face {} is both shared and boundary",
                    i, f
                )));
            }
            shared_count[f] += 1;
        }

        for &f in &rec.boundary_faces {
            boundary_count[f] += 1;
        }
    }

    for f in 0..num_faces {
        match (shared_count[f], boundary_count[f]) {
            (2, 0) | (0, 1) => {}
            (s, b) => {
                return Err(FvmError::InvalidTopology(format!(
                    "face {} appears {} times as shared and {} times as boundary",
                    f, s, b
                )))
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_table_deduplicates() {
        let mut table = FaceTable::new();
        let make = |pts: &[usize; 4]| -> FvmResult<Face> {
            Ok(Face { points: *pts, center: Point3::origin(), area: 1.0 })
        };

        let a = table.insert_or_lookup([1, 5, 6, 2], make).unwrap();
        let b = table.insert_or_lookup([2, 1, 6, 5], make).unwrap();
        let c = table.insert_or_lookup([0, 1, 2, 3], make).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.len(), 2);
        // Original order is kept for the stored face
        assert_eq!(table[a].points, [1, 5, 6, 2]);
        assert_eq!(table.find(&[6, 5, 2, 1]), Some(a));
    }

    #[test]
    fn test_local_faces_cover_each_corner_three_times() {
        let mut count = [0; 8];
        for face in LocalFace::ALL {
            for c in face.corners() {
                count[c] += 1;
            }
        }
        assert!(count.iter().all(|&c| c == 3));
    }

    #[test]
    fn test_verify_detects_asymmetry() {
        let mut a = AdjacencyRecord::new(0);
        a.shared_cells.push(1);
        a.shared_faces.push(0);
        let b = AdjacencyRecord::new(1);
        let err = verify_adjacency(&[a, b], 1).unwrap_err();
        assert!(matches!(err, FvmError::InvalidTopology(_)));
    }
}
