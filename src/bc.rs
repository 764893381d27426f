//! Boundary Condition Module
//!
//! This module holds everything the discretization reads at the domain
//! boundary and inside cells:
//! - per-face prescribed values (Dirichlet temperatures) with a fixed arity
//! - per-face heat flux and convection-coefficient overrides
//! - per-cell source fields and global exchange scalars
//! - coordinate-based face selection for populating the tables

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::error::{FvmError, FvmResult};
use crate::mesh::{Axis, CellTopology};

/// Boundary condition kinds
///
/// Each kind lands in a different table of the [`BoundaryConditionStore`]
/// and enters the assembled system differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    /// Fixed face temperature
    /// - Value: temperature, `arity` components (first is used by assembly)
    /// - Enters: diagonal and right-hand side through the face conductance
    Temperature,

    /// Prescribed heat flux into the domain
    /// - Value: flux density (W/m²), scalar
    /// - Enters: right-hand side as `q · A_face`
    Flux,

    /// Face-local convection coefficient
    /// - Value: h (W/m²K), scalar
    /// - Overrides the store's global convection coefficient on that face
    Convective,
}

impl BoundaryKind {
    /// List of all valid kind strings (for validation messages)
    pub fn valid_kinds() -> &'static [&'static str] {
        &["temperature", "flux", "convective"]
    }
}

impl FromStr for BoundaryKind {
    type Err = FvmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "temperature" => Ok(BoundaryKind::Temperature),
            "flux" => Ok(BoundaryKind::Flux),
            "convective" => Ok(BoundaryKind::Convective),
            other => Err(FvmError::InvalidConfig(format!(
                "unknown boundary condition kind '{}' (expected one of {:?})",
                other,
                Self::valid_kinds()
            ))),
        }
    }
}

impl fmt::Display for BoundaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BoundaryKind::Temperature => "temperature",
            BoundaryKind::Flux => "flux",
            BoundaryKind::Convective => "convective",
        };
        f.write_str(name)
    }
}

/// Number of components stored per boundary face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueArity {
    #[default]
    Scalar,
    Vector,
    Tensor,
}

impl ValueArity {
    pub fn components(self) -> usize {
        match self {
            ValueArity::Scalar => 1,
            ValueArity::Vector => 3,
            ValueArity::Tensor => 9,
        }
    }
}

/// A boundary condition located by a coordinate plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryRecord {
    pub axis: Axis,
    pub coordinate: f64,
    pub kind: String,
    pub value: Vec<f64>,
}

/// Boundary and source data consumed by assembly
///
/// Populated once per discretization pass and then only read. Face tables are
/// sparse: faces without an entry get no Dirichlet term, no flux and the
/// global convection coefficient.
#[derive(Debug, Clone)]
pub struct BoundaryConditionStore {
    arity: ValueArity,
    num_cells: usize,
    values: HashMap<usize, Vec<f64>>,
    flux: HashMap<usize, f64>,
    convection: HashMap<usize, f64>,

    /// Linearized source slope `Sp` per cell
    pub dependent_source: Vec<f64>,
    /// Absolute source `Sc` per cell (W)
    pub independent_source: Vec<f64>,
    /// Source density `Sv` per cell (W/m³)
    pub volumetric_source: Vec<f64>,

    /// Global convection coefficient h (W/m²K)
    pub convection_coefficient: f64,
    /// Effective radiative exchange coefficient
    pub emissivity: f64,
    pub ambient_temperature: f64,
}

impl BoundaryConditionStore {
    pub fn new(num_cells: usize, arity: ValueArity) -> Self {
        Self {
            arity,
            num_cells,
            values: HashMap::new(),
            flux: HashMap::new(),
            convection: HashMap::new(),
            dependent_source: vec![0.0; num_cells],
            independent_source: vec![0.0; num_cells],
            volumetric_source: vec![0.0; num_cells],
            convection_coefficient: 0.0,
            emissivity: 0.0,
            ambient_temperature: 0.0,
        }
    }

    pub fn arity(&self) -> ValueArity {
        self.arity
    }

    pub fn num_cells(&self) -> usize {
        self.num_cells
    }

    /// Assign `value` to every face in `faces`; later writes replace earlier ones
    ///
    /// # Errors
    /// `ArityMismatch` if `value` does not have exactly `arity` components.
    /// Nothing is written in that case.
    pub fn set_value(&mut self, faces: &[usize], value: &[f64]) -> FvmResult<()> {
        let expected = self.arity.components();
        if value.len() != expected {
            return Err(FvmError::ArityMismatch { expected, provided: value.len() });
        }
        for &face in faces {
            self.values.insert(face, value.to_vec());
        }
        Ok(())
    }

    /// Stored value of a face, if any
    pub fn value(&self, face: usize) -> Option<&[f64]> {
        self.values.get(&face).map(Vec::as_slice)
    }

    /// Dirichlet temperature of a face (first stored component)
    pub fn dirichlet(&self, face: usize) -> Option<f64> {
        self.values.get(&face).and_then(|v| v.first().copied())
    }

    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    /// Faces with a stored value, sorted
    pub fn valued_faces(&self) -> Vec<usize> {
        let mut faces: Vec<usize> = self.values.keys().copied().collect();
        faces.sort_unstable();
        faces
    }

    pub fn set_flux(&mut self, faces: &[usize], flux: f64) {
        for &face in faces {
            self.flux.insert(face, flux);
        }
    }

    pub fn flux(&self, face: usize) -> Option<f64> {
        self.flux.get(&face).copied()
    }

    pub fn set_convection(&mut self, faces: &[usize], coefficient: f64) {
        for &face in faces {
            self.convection.insert(face, coefficient);
        }
    }

    /// Convection coefficient of a face: its override, else the global value
    pub fn convection_at(&self, face: usize) -> f64 {
        self.convection
            .get(&face)
            .copied()
            .unwrap_or(self.convection_coefficient)
    }

    /// Set every cell's sources to the same values
    pub fn set_uniform_sources(&mut self, dependent: f64, independent: f64, volumetric: f64) {
        self.dependent_source.iter_mut().for_each(|s| *s = dependent);
        self.independent_source.iter_mut().for_each(|s| *s = independent);
        self.volumetric_source.iter_mut().for_each(|s| *s = volumetric);
    }

    /// Resolve boundary faces on a coordinate plane and assign them `value`
    ///
    /// Returns the matched faces. Interior faces on the plane are skipped.
    ///
    /// # Errors
    /// * `NoMatch` - no face center within `tolerance` of the plane
    /// * `InteriorPlane` - the plane has no boundary faces
    /// * `ArityMismatch` - wrong number of components
    pub fn apply_by_coordinate<M>(
        &mut self,
        mesh: &M,
        axis: Axis,
        coordinate: f64,
        value: &[f64],
        tolerance: f64,
    ) -> FvmResult<Vec<usize>>
    where
        M: CellTopology + ?Sized,
    {
        let faces = mesh.boundary_faces_by_coordinate(axis, coordinate, tolerance)?;
        self.set_value(&faces, value)?;
        log::info!(
            "Boundary value {:?} on {} = {}: {} faces",
            value,
            axis,
            coordinate,
            faces.len()
        );
        Ok(faces)
    }

    /// Apply one boundary record of any kind
    ///
    /// # Errors
    /// * `InvalidConfig` - unknown kind, or a non-scalar flux/convective value
    /// * `NoMatch`, `InteriorPlane`, `ArityMismatch` - as for [`Self::apply_by_coordinate`]
    pub fn apply_record<M>(
        &mut self,
        mesh: &M,
        record: &BoundaryRecord,
        tolerance: f64,
    ) -> FvmResult<Vec<usize>>
    where
        M: CellTopology + ?Sized,
    {
        let kind: BoundaryKind = record.kind.parse()?;
        match kind {
            BoundaryKind::Temperature => {
                self.apply_by_coordinate(mesh, record.axis, record.coordinate, &record.value, tolerance)
            }
            BoundaryKind::Flux | BoundaryKind::Convective => {
                let scalar = match record.value.as_slice() {
                    [v] => *v,
                    other => {
                        return Err(FvmError::InvalidConfig(format!(
                            "{} boundary on {} = {} needs a single value, got {}",
                            kind,
                            record.axis,
                            record.coordinate,
                            other.len()
                        )))
                    }
                };
                let faces = mesh.boundary_faces_by_coordinate(record.axis, record.coordinate, tolerance)?;
                if kind == BoundaryKind::Flux {
                    self.set_flux(&faces, scalar);
                } else {
                    self.set_convection(&faces, scalar);
                }
                log::info!(
                    "Boundary {} {} on {} = {}: {} faces",
                    kind,
                    scalar,
                    record.axis,
                    record.coordinate,
                    faces.len()
                );
                Ok(faces)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::StructuredMesh;

    fn cube() -> StructuredMesh {
        StructuredMesh::build([(0.0, 1.0), (0.0, 1.0), (0.0, 1.0)], [2, 2, 2]).unwrap()
    }

    #[test]
    fn test_boundary_kind_parsing() {
        assert_eq!("temperature".parse::<BoundaryKind>().unwrap(), BoundaryKind::Temperature);
        assert_eq!("flux".parse::<BoundaryKind>().unwrap(), BoundaryKind::Flux);
        assert_eq!("convective".parse::<BoundaryKind>().unwrap(), BoundaryKind::Convective);
        assert!("velocity".parse::<BoundaryKind>().is_err());
        assert_eq!(BoundaryKind::valid_kinds().len(), 3);
    }

    #[test]
    fn test_arity_mismatch() {
        let mut store = BoundaryConditionStore::new(4, ValueArity::Scalar);
        match store.set_value(&[0, 1], &[1.0, 2.0]) {
            Err(FvmError::ArityMismatch { expected, provided }) => {
                assert_eq!(expected, 1);
                assert_eq!(provided, 2);
            }
            other => panic!("expected ArityMismatch, got {:?}", other),
        }
        assert_eq!(store.num_values(), 0);

        let mut store = BoundaryConditionStore::new(4, ValueArity::Vector);
        assert!(store.set_value(&[3], &[1.0, 2.0, 3.0]).is_ok());
        assert_eq!(store.value(3), Some(&[1.0, 2.0, 3.0][..]));
    }

    #[test]
    fn test_last_write_wins() {
        let mut store = BoundaryConditionStore::new(1, ValueArity::Scalar);
        store.set_value(&[5], &[10.0]).unwrap();
        store.set_value(&[5], &[20.0]).unwrap();
        assert_eq!(store.dirichlet(5), Some(20.0));
        assert_eq!(store.dirichlet(6), None);
    }

    #[test]
    fn test_apply_by_coordinate() {
        let mesh = cube();
        let mut store = BoundaryConditionStore::new(mesh.num_cells(), ValueArity::Scalar);
        let faces = store.apply_by_coordinate(&mesh, Axis::X, 0.0, &[100.0], 1e-9).unwrap();
        assert_eq!(faces.len(), 4);
        assert_eq!(store.valued_faces(), {
            let mut f = faces.clone();
            f.sort_unstable();
            f
        });
    }

    #[test]
    fn test_apply_by_coordinate_no_match() {
        let mesh = cube();
        let mut store = BoundaryConditionStore::new(mesh.num_cells(), ValueArity::Scalar);
        match store.apply_by_coordinate(&mesh, Axis::Z, 0.3, &[1.0], 1e-9) {
            Err(FvmError::NoMatch { axis, coordinate, .. }) => {
                assert_eq!(axis, Axis::Z);
                assert_eq!(coordinate, 0.3);
            }
            other => panic!("expected NoMatch, got {:?}", other),
        }
    }

    #[test]
    fn test_interior_plane_is_rejected() {
        let mesh = cube();
        let mut store = BoundaryConditionStore::new(mesh.num_cells(), ValueArity::Scalar);
        assert_eq!(mesh.faces_by_coordinate(Axis::X, 0.5, 1e-9).unwrap().len(), 4);

        match store.apply_by_coordinate(&mesh, Axis::X, 0.5, &[7.0], 1e-9) {
            Err(FvmError::InteriorPlane { axis, coordinate }) => {
                assert_eq!(axis, Axis::X);
                assert_eq!(coordinate, 0.5);
            }
            other => panic!("expected InteriorPlane, got {:?}", other),
        }
        assert_eq!(store.num_values(), 0);

        let flux = BoundaryRecord { axis: Axis::Y, coordinate: 0.5, kind: "flux".into(), value: vec![1.0] };
        assert!(matches!(
            store.apply_record(&mesh, &flux, 1e-9),
            Err(FvmError::InteriorPlane { .. })
        ));
    }

    #[test]
    fn test_applied_faces_are_boundary_faces() {
        let mesh = cube();
        let mut store = BoundaryConditionStore::new(mesh.num_cells(), ValueArity::Scalar);
        // x = 0.25 holds the centers of 12 y/z-normal faces, 8 of them on the outer walls
        assert_eq!(mesh.faces_by_coordinate(Axis::X, 0.25, 1e-9).unwrap().len(), 12);
        let faces = store.apply_by_coordinate(&mesh, Axis::X, 0.25, &[1.0], 1e-9).unwrap();
        assert_eq!(faces.len(), 8);
        assert!(faces.iter().all(|&f| mesh.cell_owning_face(f).is_ok()));
        assert_eq!(store.num_values(), 8);
    }

    #[test]
    fn test_flux_and_convection_records() {
        let mesh = cube();
        let mut store = BoundaryConditionStore::new(mesh.num_cells(), ValueArity::Scalar);
        store.convection_coefficient = 5.0;

        let flux = BoundaryRecord { axis: Axis::Y, coordinate: 1.0, kind: "flux".into(), value: vec![250.0] };
        let conv = BoundaryRecord { axis: Axis::Z, coordinate: 1.0, kind: "convective".into(), value: vec![12.0] };

        let flux_faces = store.apply_record(&mesh, &flux, 1e-9).unwrap();
        let conv_faces = store.apply_record(&mesh, &conv, 1e-9).unwrap();

        assert!(flux_faces.iter().all(|&f| store.flux(f) == Some(250.0)));
        assert!(conv_faces.iter().all(|&f| store.convection_at(f) == 12.0));
        assert_eq!(store.convection_at(flux_faces[0]), 5.0);
        assert_eq!(store.num_values(), 0);

        let bad = BoundaryRecord { axis: Axis::Z, coordinate: 1.0, kind: "flux".into(), value: vec![1.0, 2.0] };
        assert!(matches!(store.apply_record(&mesh, &bad, 1e-9), Err(FvmError::InvalidConfig(_))));
    }

    #[test]
    fn test_uniform_sources() {
        let mut store = BoundaryConditionStore::new(3, ValueArity::Scalar);
        assert!(store.volumetric_source.iter().all(|&s| s == 0.0));
        store.set_uniform_sources(-1.0, 2.0, 3.0);
        assert_eq!(store.dependent_source, vec![-1.0; 3]);
        assert_eq!(store.independent_source, vec![2.0; 3]);
        assert_eq!(store.volumetric_source, vec![3.0; 3]);
    }
}
