//! Finite-volume assembly of the heat equation.
//!
//! Each cell `c` contributes exactly one row of `A·T = b`:
//!
//! ```text
//! τ = ρ·cp·V/Δt                       (0 when Δt = ∞)
//! A[c,c] += τ                          b[c] += τ·T_old[c]
//! interior face f, neighbor n:  G  = k·A_f/|x_n - x_c|
//!   A[c,n] -= θ·G   A[c,c] += θ·G      b[c] += (1-θ)·G·(T_old[n] - T_old[c])
//! boundary face f:              Gb = k·A_f/|x_f - x_c|
//!   b[c] += h·A_f·(T_amb - T_old[c]) + ε·A_f·(T_amb⁴ - T_old[c]⁴)
//!   Dirichlet Tb: A[c,c] += θ·Gb      b[c] += Gb·Tb - (1-θ)·Gb·T_old[c]
//!   flux q:                            b[c] += q·A_f
//! sources:      A[c,c] -= θ·Sp         b[c] += Sv·V + (1-θ)·Sp·T_old[c] + Sc
//! ```
//!
//! Properties are evaluated at `T_old[c]` and used for every face of `c`.

use rayon::prelude::*;
use sprs::{CsMat, TriMat};
use crate::bc::BoundaryConditionStore;
use crate::error::{FvmError, FvmResult};
use crate::mesh::CellTopology;
use crate::physics::{PropertyModel, DENSITY, SPECIFIC_HEAT, THERMAL_CONDUCTIVITY};

/// Assembled system `A·T = b`
#[derive(Debug, Clone)]
pub struct LinearSystem {
    pub matrix: CsMat<f64>,
    pub rhs: Vec<f64>,
}

impl LinearSystem {
    pub fn size(&self) -> usize {
        self.rhs.len()
    }

    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    /// Matrix entry, 0 where nothing was assembled
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.matrix.get(row, col).copied().unwrap_or(0.0)
    }
}

/// Time-discretization parameters of one assembly pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThetaStep {
    /// Δt; `f64::INFINITY` for steady state
    pub time_step: f64,
    /// Implicitness, 0 = explicit, 1 = fully implicit
    pub theta: f64,
}

impl ThetaStep {
    pub fn new(time_step: f64, theta: f64) -> Self {
        Self { time_step, theta }
    }

    pub fn steady() -> Self {
        Self { time_step: f64::INFINITY, theta: 1.0 }
    }

    pub fn is_steady(&self) -> bool {
        self.time_step.is_infinite()
    }

    fn validate(&self) -> FvmResult<()> {
        if !(0.0..=1.0).contains(&self.theta) {
            return Err(FvmError::InvalidAssemblyInput(format!(
                "theta must lie in [0, 1], got {}",
                self.theta
            )));
        }
        if self.time_step.is_nan() || self.time_step <= 0.0 {
            return Err(FvmError::InvalidAssemblyInput(format!(
                "time step must be positive or infinite, got {}",
                self.time_step
            )));
        }
        Ok(())
    }
}

/// One assembled matrix row
struct CellRow {
    cell: usize,
    /// (column, value); diagonal last
    entries: Vec<(usize, f64)>,
    rhs: f64,
}

/// Global system assembler
pub struct Assembler;

impl Assembler {
    /// Assemble the system (parallel over cells using Rayon)
    ///
    /// # Arguments
    /// * `mesh` - Cell/face topology
    /// * `properties` - Evaluates `thermal_conductivity`, `specific_heat`, `density`
    /// * `store` - Boundary values, sources and exchange coefficients
    /// * `old_solution` - Cell temperatures at the previous time level
    /// * `step` - Δt and θ
    ///
    /// # Errors
    /// The first failing cell aborts the pass; no partial system is returned.
    pub fn assemble_parallel<M, P>(
        mesh: &M,
        properties: &P,
        store: &BoundaryConditionStore,
        old_solution: &[f64],
        step: ThetaStep,
    ) -> FvmResult<LinearSystem>
    where
        M: CellTopology + ?Sized,
        P: PropertyModel + ?Sized,
    {
        validate_inputs(mesh, store, old_solution, step)?;

        let rows: Vec<CellRow> = (0..mesh.num_cells())
            .into_par_iter()
            .map(|cell| assemble_row(mesh, properties, store, old_solution, step, cell))
            .collect::<FvmResult<_>>()?;

        Ok(merge_rows(mesh.num_cells(), rows))
    }

    /// Assemble the system one cell at a time
    pub fn assemble_serial<M, P>(
        mesh: &M,
        properties: &P,
        store: &BoundaryConditionStore,
        old_solution: &[f64],
        step: ThetaStep,
    ) -> FvmResult<LinearSystem>
    where
        M: CellTopology + ?Sized,
        P: PropertyModel + ?Sized,
    {
        validate_inputs(mesh, store, old_solution, step)?;

        let rows = (0..mesh.num_cells())
            .map(|cell| assemble_row(mesh, properties, store, old_solution, step, cell))
            .collect::<FvmResult<Vec<_>>>()?;

        Ok(merge_rows(mesh.num_cells(), rows))
    }
}

/// Assemble `(A, b)` for one time level; `time_step = ∞` gives the steady system
pub fn assemble<M, P>(
    mesh: &M,
    properties: &P,
    store: &BoundaryConditionStore,
    old_solution: &[f64],
    time_step: f64,
    theta: f64,
) -> FvmResult<LinearSystem>
where
    M: CellTopology + ?Sized,
    P: PropertyModel + ?Sized,
{
    Assembler::assemble_parallel(mesh, properties, store, old_solution, ThetaStep::new(time_step, theta))
}

fn validate_inputs<M>(
    mesh: &M,
    store: &BoundaryConditionStore,
    old_solution: &[f64],
    step: ThetaStep,
) -> FvmResult<()>
where
    M: CellTopology + ?Sized,
{
    step.validate()?;
    let n = mesh.num_cells();
    if old_solution.len() != n {
        return Err(FvmError::InvalidAssemblyInput(format!(
            "previous solution has {} entries, mesh has {} cells",
            old_solution.len(),
            n
        )));
    }
    if store.num_cells() != n {
        return Err(FvmError::InvalidAssemblyInput(format!(
            "boundary store sized for {} cells, mesh has {} cells",
            store.num_cells(),
            n
        )));
    }
    Ok(())
}

fn assemble_row<M, P>(
    mesh: &M,
    properties: &P,
    store: &BoundaryConditionStore,
    old: &[f64],
    step: ThetaStep,
    cell: usize,
) -> FvmResult<CellRow>
where
    M: CellTopology + ?Sized,
    P: PropertyModel + ?Sized,
{
    let ThetaStep { time_step, theta } = step;
    let t_c = old[cell];

    let k = properties.evaluate(THERMAL_CONDUCTIVITY, t_c)?;
    let cp = properties.evaluate(SPECIFIC_HEAT, t_c)?;
    let rho = properties.evaluate(DENSITY, t_c)?;

    let record = mesh.adjacency(cell);
    if record.num_faces() == 0 {
        return Err(FvmError::InvalidAssemblyInput(format!("cell {} has no faces", cell)));
    }
    let volume = mesh.cell_volume(cell);
    if !(volume > 0.0) {
        return Err(FvmError::InvalidAssemblyInput(format!(
            "cell {} has non-positive volume {}",
            cell, volume
        )));
    }

    let center = mesh.cell_center(cell);
    let mut entries = Vec::with_capacity(record.shared_cells.len() + 1);
    let mut diag = 0.0;
    let mut rhs = 0.0;

    // Transient
    if !step.is_steady() {
        let tau = rho * cp * volume / time_step;
        diag += tau;
        rhs += tau * t_c;
    }

    // Diffusion across interior faces
    for (neighbor, face) in record.neighbors() {
        let distance = (mesh.cell_center(neighbor) - center).norm();
        let g = k * mesh.face_area(face) / positive_distance(distance, cell, face)?;
        entries.push((neighbor, -theta * g));
        diag += theta * g;
        rhs += (1.0 - theta) * g * (old[neighbor] - t_c);
    }

    // Boundary exchange
    let t_amb = store.ambient_temperature;
    for &face in &record.boundary_faces {
        let area = mesh.face_area(face);
        let h = store.convection_at(face);

        rhs += h * area * (t_amb - t_c);
        rhs += store.emissivity * area * (t_amb.powi(4) - t_c.powi(4));

        if let Some(t_b) = store.dirichlet(face) {
            let distance = (mesh.face_center(face) - center).norm();
            let g_b = k * area / positive_distance(distance, cell, face)?;
            diag += theta * g_b;
            rhs += g_b * t_b - (1.0 - theta) * g_b * t_c;
        }

        if let Some(q) = store.flux(face) {
            rhs += q * area;
        }
    }

    // Sources
    let sp = store.dependent_source[cell];
    diag -= theta * sp;
    rhs += store.volumetric_source[cell] * volume
        + (1.0 - theta) * sp * t_c
        + store.independent_source[cell];

    entries.push((cell, diag));

    Ok(CellRow { cell, entries, rhs })
}

fn positive_distance(distance: f64, cell: usize, face: usize) -> FvmResult<f64> {
    if distance > 0.0 {
        Ok(distance)
    } else {
        Err(FvmError::InvalidAssemblyInput(format!(
            "zero center distance across face {} of cell {}",
            face, cell
        )))
    }
}

fn merge_rows(n: usize, rows: Vec<CellRow>) -> LinearSystem {
    let nnz: usize = rows.iter().map(|r| r.entries.len()).sum();
    let mut triplets = TriMat::with_capacity((n, n), nnz);
    let mut rhs = vec![0.0; n];

    for row in rows {
        for (col, val) in row.entries {
            triplets.add_triplet(row.cell, col, val);
        }
        rhs[row.cell] = row.rhs;
    }

    let matrix = triplets.to_csr();
    log::debug!("Assembled {}x{} system, nnz = {}", n, n, matrix.nnz());

    LinearSystem { matrix, rhs }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bc::ValueArity;
    use crate::mesh::{Axis, Mesh1D, StructuredMesh};
    use crate::physics::{Material, MaterialProperty, PropertyMethod};
    use approx::assert_relative_eq;

    fn material(k: f64, cp: f64, rho: f64) -> Material {
        Material::new("test")
            .with_property(THERMAL_CONDUCTIVITY, MaterialProperty::constant(k))
            .with_property(SPECIFIC_HEAT, MaterialProperty::constant(cp))
            .with_property(DENSITY, MaterialProperty::constant(rho))
    }

    fn slab() -> StructuredMesh {
        StructuredMesh::build([(0.0, 1.0), (0.0, 1.0), (0.0, 1.0)], [4, 1, 1]).unwrap()
    }

    #[test]
    fn test_steady_rows_sum_to_zero_without_boundaries() {
        let mesh = slab();
        let store = BoundaryConditionStore::new(mesh.num_cells(), ValueArity::Scalar);
        let sys = assemble(&mesh, &material(2.0, 1.0, 1.0), &store, &[0.0; 4], f64::INFINITY, 1.0).unwrap();

        for i in 0..4 {
            let row_sum: f64 = (0..4).map(|j| sys.get(i, j)).sum();
            assert_relative_eq!(row_sum, 0.0, epsilon = 1e-12);
        }
        // k·A/d = 2·1/0.25
        assert_relative_eq!(sys.get(1, 0), -8.0, epsilon = 1e-12);
        assert_relative_eq!(sys.get(1, 1), 16.0, epsilon = 1e-12);
        assert_relative_eq!(sys.get(0, 0), 8.0, epsilon = 1e-12);
        assert!(sys.rhs.iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_matrix_sparsity_follows_adjacency() {
        let mesh = StructuredMesh::build([(0.0, 1.0), (0.0, 1.0), (0.0, 1.0)], [3, 3, 3]).unwrap();
        let store = BoundaryConditionStore::new(mesh.num_cells(), ValueArity::Scalar);
        let sys = assemble(&mesh, &material(1.0, 1.0, 1.0), &store, &[1.0; 27], 1.0, 1.0).unwrap();

        let expected: usize = (0..27).map(|c| mesh.adjacency(c).shared_cells.len() + 1).sum();
        assert_eq!(sys.nnz(), expected);
    }

    #[test]
    fn test_dirichlet_boundary_terms() {
        let mesh = slab();
        let mut store = BoundaryConditionStore::new(mesh.num_cells(), ValueArity::Scalar);
        store.apply_by_coordinate(&mesh, Axis::X, 0.0, &[100.0], 1e-9).unwrap();

        let sys = assemble(&mesh, &material(1.0, 1.0, 1.0), &store, &[0.0; 4], f64::INFINITY, 1.0).unwrap();
        // Gb = 1·1/0.125, G = 1·1/0.25
        assert_relative_eq!(sys.get(0, 0), 8.0 + 4.0, epsilon = 1e-12);
        assert_relative_eq!(sys.rhs[0], 800.0, epsilon = 1e-9);
        assert_relative_eq!(sys.rhs[1], 0.0);
    }

    #[test]
    fn test_transient_and_source_terms() {
        let mesh = Mesh1D::build((0.0, 1.0), 2, 1.0).unwrap();
        let mut store = BoundaryConditionStore::new(2, ValueArity::Scalar);
        store.set_uniform_sources(-3.0, 5.0, 10.0);

        // V = 0.5, τ = 2·4·0.5/0.5 = 8
        let sys = assemble(&mesh, &material(1.0, 4.0, 2.0), &store, &[1.0, 1.0], 0.5, 0.5).unwrap();

        // diag = τ + θG - θSp = 8 + 0.5·2 + 1.5
        assert_relative_eq!(sys.get(0, 0), 10.5, epsilon = 1e-12);
        assert_relative_eq!(sys.get(0, 1), -1.0, epsilon = 1e-12);
        // b = τT + Sv·V + (1-θ)·Sp·T + Sc = 8 + 5 - 1.5 + 5
        assert_relative_eq!(sys.rhs[0], 16.5, epsilon = 1e-12);
    }

    #[test]
    fn test_explicit_neighbor_exchange() {
        // dx = 1, V = 1, τ = 1, G = 2
        let mesh = Mesh1D::build((0.0, 3.0), 3, 1.0).unwrap();
        let store = BoundaryConditionStore::new(3, ValueArity::Scalar);
        let mat = material(2.0, 1.0, 1.0);
        let old = [10.0, 40.0, 20.0];

        let sys = assemble(&mesh, &mat, &store, &old, 1.0, 0.0).unwrap();
        assert_relative_eq!(sys.get(1, 1), 1.0, epsilon = 1e-12);
        assert_relative_eq!(sys.get(1, 0), 0.0);
        // τ·T + G·(T_n - T_c) over both neighbors
        assert_relative_eq!(sys.rhs[0], 10.0 + 2.0 * 30.0, epsilon = 1e-12);
        assert_relative_eq!(sys.rhs[1], 40.0 + 2.0 * (-30.0) + 2.0 * (-20.0), epsilon = 1e-12);
        assert_relative_eq!(sys.rhs[2], 20.0 + 2.0 * 20.0, epsilon = 1e-12);

        // Exchange terms cancel over the closed domain
        let exchange: f64 = sys.rhs.iter().zip(old.iter()).map(|(b, t)| b - t).sum();
        assert_relative_eq!(exchange, 0.0, epsilon = 1e-12);

        let sys = assemble(&mesh, &mat, &store, &old, 1.0, 0.5).unwrap();
        assert_relative_eq!(sys.get(1, 1), 1.0 + 0.5 * 2.0 * 2.0, epsilon = 1e-12);
        assert_relative_eq!(sys.get(1, 2), -1.0, epsilon = 1e-12);
        assert_relative_eq!(sys.rhs[1], 40.0 + 0.5 * (-100.0), epsilon = 1e-12);
    }

    #[test]
    fn test_convection_radiation_and_flux() {
        let mesh = Mesh1D::build((0.0, 1.0), 1, 2.0).unwrap();
        let mut store = BoundaryConditionStore::new(1, ValueArity::Scalar);
        store.convection_coefficient = 3.0;
        store.emissivity = 1e-8;
        store.ambient_temperature = 10.0;
        store.set_flux(&[1], 7.0);

        let sys = assemble(&mesh, &material(1.0, 1.0, 1.0), &store, &[20.0], f64::INFINITY, 1.0).unwrap();

        // Two boundary faces of area 2
        let conv = 2.0 * 3.0 * 2.0 * (10.0 - 20.0);
        let rad = 2.0 * 1e-8 * 2.0 * (10.0f64.powi(4) - 20.0f64.powi(4));
        let flux = 7.0 * 2.0;
        assert_relative_eq!(sys.rhs[0], conv + rad + flux, epsilon = 1e-9);
        assert_relative_eq!(sys.get(0, 0), 0.0);
    }

    #[test]
    fn test_temperature_dependent_conductivity() {
        let mesh = Mesh1D::build((0.0, 1.0), 2, 1.0).unwrap();
        let store = BoundaryConditionStore::new(2, ValueArity::Scalar);
        let mut mat = material(1.0, 1.0, 1.0);
        mat.add_property(
            THERMAL_CONDUCTIVITY,
            MaterialProperty::new(200.0, PropertyMethod::Linear, vec![1e-3]),
        );

        let sys = assemble(&mesh, &mat, &store, &[350.0, 298.15], f64::INFINITY, 1.0).unwrap();
        // Each row uses its own cell's conductivity over d = 0.5
        assert_relative_eq!(sys.get(0, 1), -210.37 / 0.5, epsilon = 1e-9);
        assert_relative_eq!(sys.get(1, 0), -200.0 / 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_serial_matches_parallel() {
        let mesh = StructuredMesh::build([(0.0, 2.0), (0.0, 1.0), (0.0, 1.0)], [4, 3, 2]).unwrap();
        let mut store = BoundaryConditionStore::new(mesh.num_cells(), ValueArity::Scalar);
        store.apply_by_coordinate(&mesh, Axis::X, 0.0, &[50.0], 1e-9).unwrap();
        store.convection_coefficient = 1.5;
        let old: Vec<f64> = (0..mesh.num_cells()).map(|c| 280.0 + c as f64).collect();
        let mat = material(3.0, 2.0, 5.0);
        let step = ThetaStep::new(0.1, 0.5);

        let par = Assembler::assemble_parallel(&mesh, &mat, &store, &old, step).unwrap();
        let ser = Assembler::assemble_serial(&mesh, &mat, &store, &old, step).unwrap();

        assert_eq!(par.nnz(), ser.nnz());
        for i in 0..mesh.num_cells() {
            assert_relative_eq!(par.rhs[i], ser.rhs[i], epsilon = 1e-12);
            for j in 0..mesh.num_cells() {
                assert_relative_eq!(par.get(i, j), ser.get(i, j), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let mesh = slab();
        let store = BoundaryConditionStore::new(4, ValueArity::Scalar);
        let mat = material(1.0, 1.0, 1.0);
        let old = [0.0; 4];

        for (dt, theta) in [(1.0, 1.5), (1.0, -0.1), (0.0, 1.0), (-1.0, 1.0), (f64::NAN, 1.0)] {
            let err = assemble(&mesh, &mat, &store, &old, dt, theta).unwrap_err();
            assert!(matches!(err, FvmError::InvalidAssemblyInput(_)), "dt={} theta={}", dt, theta);
        }

        let err = assemble(&mesh, &mat, &store, &[0.0; 3], 1.0, 1.0).unwrap_err();
        assert!(matches!(err, FvmError::InvalidAssemblyInput(_)));

        let small_store = BoundaryConditionStore::new(2, ValueArity::Scalar);
        assert!(assemble(&mesh, &mat, &small_store, &old, 1.0, 1.0).is_err());
    }

    #[test]
    fn test_missing_property_aborts() {
        let mesh = slab();
        let store = BoundaryConditionStore::new(4, ValueArity::Scalar);
        let mat = Material::new("incomplete")
            .with_property(THERMAL_CONDUCTIVITY, MaterialProperty::constant(1.0));
        let err = assemble(&mesh, &mat, &store, &[0.0; 4], 1.0, 1.0).unwrap_err();
        assert!(matches!(err, FvmError::UnknownProperty { .. }));
    }
}
