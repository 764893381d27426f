use std::collections::HashMap;
use crate::error::{FvmError, FvmResult};
use super::{Axis, CellTopology};

/// Where the values of a field live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLocation {
    Cell,
    Node,
}

/// Named scalar field on cells or nodes
#[derive(Debug, Clone)]
pub struct ScalarField {
    pub name: String,
    pub location: FieldLocation,
    pub data: Vec<f64>,
}

impl ScalarField {
    pub fn on_cells(name: &str, data: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            location: FieldLocation::Cell,
            data,
        }
    }

    pub fn on_nodes(name: &str, data: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            location: FieldLocation::Node,
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn min(&self) -> f64 {
        self.data.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Collection of named cell and node fields
#[derive(Debug, Clone, Default)]
pub struct FieldData {
    pub cell_fields: HashMap<String, ScalarField>,
    pub node_fields: HashMap<String, ScalarField>,
}

impl FieldData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, replacing any field of the same name and location
    pub fn add_field(&mut self, field: ScalarField) {
        let target = match field.location {
            FieldLocation::Cell => &mut self.cell_fields,
            FieldLocation::Node => &mut self.node_fields,
        };
        target.insert(field.name.clone(), field);
    }

    pub fn cell_field(&self, name: &str) -> Option<&ScalarField> {
        self.cell_fields.get(name)
    }

    pub fn node_field(&self, name: &str) -> Option<&ScalarField> {
        self.node_fields.get(name)
    }

    pub fn num_fields(&self) -> usize {
        self.cell_fields.len() + self.node_fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell_fields.is_empty() && self.node_fields.is_empty()
    }
}

/// Average cell values onto mesh points
///
/// Each point receives the mean of the values of every cell it belongs to.
pub fn interpolate_to_nodes<M>(mesh: &M, cell_values: &[f64]) -> FvmResult<Vec<f64>>
where
    M: CellTopology + ?Sized,
{
    if cell_values.len() != mesh.num_cells() {
        return Err(FvmError::InvalidAssemblyInput(format!(
            "expected {} cell values, got {}",
            mesh.num_cells(),
            cell_values.len()
        )));
    }

    let mut sum = vec![0.0; mesh.num_points()];
    let mut count = vec![0usize; mesh.num_points()];

    for (cell, &value) in cell_values.iter().enumerate() {
        for &p in mesh.cell_points(cell) {
            sum[p] += value;
            count[p] += 1;
        }
    }

    Ok(sum
        .into_iter()
        .zip(count)
        .map(|(s, n)| if n > 0 { s / n as f64 } else { 0.0 })
        .collect())
}

/// Overwrite nodal values on a coordinate plane with a fixed temperature
///
/// Returns the number of nodes overwritten.
pub fn apply_nodal_dirichlet<M>(
    mesh: &M,
    node_values: &mut [f64],
    axis: Axis,
    coordinate: f64,
    value: f64,
    tolerance: f64,
) -> usize
where
    M: CellTopology + ?Sized,
{
    let mut applied = 0;
    for (p, slot) in node_values.iter_mut().enumerate().take(mesh.num_points()) {
        if (mesh.point(p)[axis.index()] - coordinate).abs() <= tolerance {
            *slot = value;
            applied += 1;
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Mesh1D, StructuredMesh};
    use approx::assert_relative_eq;

    #[test]
    fn test_interpolate_line() {
        let mesh = Mesh1D::build((0.0, 3.0), 3, 1.0).unwrap();
        let nodes = interpolate_to_nodes(&mesh, &[1.0, 2.0, 4.0]).unwrap();
        assert_eq!(nodes.len(), 4);
        assert_relative_eq!(nodes[0], 1.0);
        assert_relative_eq!(nodes[1], 1.5);
        assert_relative_eq!(nodes[2], 3.0);
        assert_relative_eq!(nodes[3], 4.0);
    }

    #[test]
    fn test_interpolate_uniform_field_is_uniform() {
        let mesh = StructuredMesh::build([(0.0, 1.0), (0.0, 1.0), (0.0, 1.0)], [2, 2, 2]).unwrap();
        let nodes = interpolate_to_nodes(&mesh, &[5.0; 8]).unwrap();
        assert!(nodes.iter().all(|&v| (v - 5.0).abs() < 1e-14));
    }

    #[test]
    fn test_interpolate_wrong_length() {
        let mesh = Mesh1D::build((0.0, 1.0), 2, 1.0).unwrap();
        assert!(interpolate_to_nodes(&mesh, &[1.0]).is_err());
    }

    #[test]
    fn test_nodal_dirichlet_plane() {
        let mesh = StructuredMesh::build([(0.0, 1.0), (0.0, 1.0), (0.0, 1.0)], [2, 1, 1]).unwrap();
        let mut nodes = vec![0.0; mesh.num_points()];
        let n = apply_nodal_dirichlet(&mesh, &mut nodes, Axis::X, 0.0, 100.0, 1e-9);
        assert_eq!(n, 4);
        assert_eq!(nodes.iter().filter(|&&v| v == 100.0).count(), 4);
    }

    #[test]
    fn test_field_data() {
        let mut data = FieldData::new();
        data.add_field(ScalarField::on_cells("temperature", vec![1.0, 3.0]));
        data.add_field(ScalarField::on_nodes("temperature", vec![1.0, 2.0, 3.0]));
        assert_eq!(data.num_fields(), 2);
        assert_eq!(data.cell_field("temperature").unwrap().len(), 2);
        assert_relative_eq!(data.node_field("temperature").unwrap().max(), 3.0);
        assert_relative_eq!(data.cell_field("temperature").unwrap().min(), 1.0);
    }
}
