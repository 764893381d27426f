//! Geometry kernel: point storage, planar polygon areas, centroids and cell volumes.
//!
//! All functions here are pure; they know nothing about mesh connectivity.

use nalgebra::{Point3, Vector3};
use crate::error::{FvmError, FvmResult};

/// Maximum absolute distance a polygon vertex may sit off the reference plane
pub const PLANARITY_TOLERANCE: f64 = 1e-6;

/// Relative threshold below which the first two edges count as collinear
const COLLINEAR_TOLERANCE: f64 = 1e-12;

/// Point coordinates of a mesh
#[derive(Debug, Clone)]
pub struct Geometry {
    /// Node coordinates
    pub nodes: Vec<Point3<f64>>,
}

impl Geometry {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { nodes: Vec::with_capacity(capacity) }
    }

    pub fn add_node(&mut self, x: f64, y: f64, z: f64) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(Point3::new(x, y, z));
        idx
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Gather coordinates for a list of node ids
    pub fn gather<const N: usize>(&self, ids: &[usize; N]) -> [Point3<f64>; N] {
        let mut out = [Point3::origin(); N];
        for (slot, &id) in out.iter_mut().zip(ids.iter()) {
            *slot = self.nodes[id];
        }
        out
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new()
    }
}

/// Area of a planar polygon
///
/// The points may be given in any order; they are re-ordered along their
/// convex hull before the shoelace formula is applied.
///
/// # Errors
/// * `DegenerateGeometry` - fewer than 3 points, or the first three are collinear
/// * `NonPlanarGeometry` - a point lies more than [`PLANARITY_TOLERANCE`] off the plane
pub fn polygon_area(points: &[Point3<f64>]) -> FvmResult<f64> {
    polygon_area_with_normal(points).map(|(area, _)| area)
}

/// Area and unit normal of a planar polygon
///
/// The normal follows the right-hand rule over the first three points.
pub fn polygon_area_with_normal(points: &[Point3<f64>]) -> FvmResult<(f64, Vector3<f64>)> {
    if points.len() < 3 {
        return Err(FvmError::DegenerateGeometry(format!(
            "polygon needs at least 3 points, got {}",
            points.len()
        )));
    }

    let e1 = points[1] - points[0];
    let e2 = points[2] - points[1];
    let cross = e1.cross(&e2);
    let cross_norm = cross.norm();

    if cross_norm <= COLLINEAR_TOLERANCE * e1.norm() * e2.norm() {
        return Err(FvmError::DegenerateGeometry(
            "first three polygon points are collinear".to_string(),
        ));
    }

    let normal = cross / cross_norm;

    for (index, p) in points.iter().enumerate().skip(3) {
        let distance = (p - points[0]).dot(&normal).abs();
        if distance > PLANARITY_TOLERANCE {
            return Err(FvmError::NonPlanarGeometry { index, distance });
        }
    }

    // Drop the coordinate most aligned with the normal
    let drop = normal.iamax();
    let (u, v) = match drop {
        0 => (1, 2),
        1 => (2, 0),
        _ => (0, 1),
    };

    let projected: Vec<[f64; 2]> = points.iter().map(|p| [p[u], p[v]]).collect();
    let hull = convex_hull(&projected);
    let projected_area = shoelace(&hull).abs();

    // Projection shrinks the area by |n_drop|; 1 for axis-aligned faces
    Ok((projected_area / normal[drop].abs(), normal))
}

/// Convex hull of 2D points (Andrew's monotone chain), counter-clockwise,
/// collinear points removed
pub fn convex_hull(points: &[[f64; 2]]) -> Vec<[f64; 2]> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
    pts.dedup();

    if pts.len() < 3 {
        return pts;
    }

    let turn = |o: &[f64; 2], a: &[f64; 2], b: &[f64; 2]| {
        (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
    };

    let mut hull: Vec<[f64; 2]> = Vec::with_capacity(2 * pts.len());

    // Lower hull
    for p in &pts {
        while hull.len() >= 2 && turn(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(*p);
    }

    // Upper hull
    let lower_len = hull.len() + 1;
    for p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len && turn(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(*p);
    }

    hull.pop();
    hull
}

/// Signed shoelace area of an ordered 2D polygon
fn shoelace(polygon: &[[f64; 2]]) -> f64 {
    let n = polygon.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let a = polygon[i];
            let b = polygon[(i + 1) % n];
            a[0] * b[1] - b[0] * a[1]
        })
        .sum();
    0.5 * twice
}

/// Arithmetic mean of a set of points
pub fn centroid(points: &[Point3<f64>]) -> Point3<f64> {
    if points.is_empty() {
        return Point3::origin();
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum / points.len() as f64)
}

/// Cell "volume" as the mean of the cell's face areas
///
/// Equals the true volume only for unit-length cells; the transient term and
/// volumetric sources of hexahedral meshes are scaled by this value.
pub fn cell_volume(face_areas: &[f64]) -> FvmResult<f64> {
    if face_areas.is_empty() {
        return Err(FvmError::DegenerateGeometry(
            "cell has no faces to derive a volume from".to_string(),
        ));
    }
    Ok(face_areas.iter().sum::<f64>() / face_areas.len() as f64)
}
