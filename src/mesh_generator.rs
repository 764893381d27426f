use crate::config::DomainConfig;
use crate::error::{FvmError, FvmResult};
use crate::mesh::{Mesh, Mesh1D, StructuredMesh};

/// Mesh generator for rectangular domains
pub struct MeshGenerator;

impl MeshGenerator {
    /// Generate a box of hexahedral cells
    ///
    /// # Arguments
    /// * `nx`, `ny`, `nz` - Number of divisions in each direction
    /// * `lx`, `ly`, `lz` - Domain dimensions, with the origin at one corner
    pub fn generate_box(nx: usize, ny: usize, nz: usize, lx: f64, ly: f64, lz: f64) -> FvmResult<Mesh> {
        StructuredMesh::build([(0.0, lx), (0.0, ly), (0.0, lz)], [nx, ny, nz]).map(Mesh::ThreeD)
    }

    /// Generate a 1D slab of `nx` cells along x with cross-section `area`
    pub fn generate_slab(nx: usize, lx: f64, area: f64) -> FvmResult<Mesh> {
        Mesh1D::build((0.0, lx), nx, area).map(Mesh::OneD)
    }
}

/// Build the mesh described by a domain section
///
/// One division entry gives a [`Mesh1D`] along x, three give a [`StructuredMesh`].
pub fn build_mesh(domain: &DomainConfig) -> FvmResult<Mesh> {
    let mesh = match domain.divisions.as_slice() {
        &[nx] => Mesh::OneD(Mesh1D::build((domain.x[0], domain.x[1]), nx, domain.area)?),
        &[nx, ny, nz] => Mesh::ThreeD(StructuredMesh::build(domain.bounds(), [nx, ny, nz])?),
        other => {
            return Err(FvmError::InvalidDomain(format!(
                "expected 1 or 3 divisions, got {}",
                other.len()
            )))
        }
    };
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::CellTopology;

    fn domain(divisions: Vec<usize>) -> DomainConfig {
        DomainConfig {
            x: [0.0, 2.0],
            y: [0.0, 1.0],
            z: [0.0, 1.0],
            divisions,
            area: 0.5,
        }
    }

    #[test]
    fn test_build_mesh_selects_dimension() {
        let line = build_mesh(&domain(vec![4])).unwrap();
        assert_eq!(line.dimension(), 1);
        assert_eq!(line.num_cells(), 4);
        assert_eq!(line.face_area(0), 0.5);

        let cube = build_mesh(&domain(vec![4, 2, 3])).unwrap();
        assert_eq!(cube.dimension(), 3);
        assert_eq!(cube.num_cells(), 24);

        assert!(matches!(build_mesh(&domain(vec![4, 2])), Err(FvmError::InvalidDomain(_))));
    }

    #[test]
    fn test_generators() {
        let mesh = MeshGenerator::generate_box(2, 2, 2, 1.0, 1.0, 1.0).unwrap();
        assert_eq!(mesh.num_points(), 27);
        let slab = MeshGenerator::generate_slab(3, 1.5, 2.0).unwrap();
        assert_eq!(slab.num_faces(), 4);
        assert!(MeshGenerator::generate_box(0, 1, 1, 1.0, 1.0, 1.0).is_err());
    }
}
