use crate::constants::{angular_frequency, VACUUM_PERMEABILITY};
use crate::fields::{EdgeField, StaggeredField};
use crate::math::{CScalar, Scalar, J};
use crate::mesh::{flat_index, Location, TensorMesh};
use crate::simulation::SimulationError;

/// Magnetic field on mesh faces.
///
/// Component `a` holds the normal field on the faces perpendicular to axis `a`.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceField {
    shapes: [[usize; 3]; 3],
    values: [Vec<CScalar>; 3],
}

impl FaceField {
    /// Value of component `axis` at grid index (i, j, k).
    #[must_use]
    pub fn get(&self, axis: usize, i: usize, j: usize, k: usize) -> CScalar {
        self.values[axis][flat_index(self.shapes[axis], i, j, k)]
    }

    /// Total number of face values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.iter().map(Vec::len).sum()
    }

    /// True if the mesh has no faces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StaggeredField for FaceField {
    const LOCATION: Location = Location::Faces;

    fn shape(&self, axis: usize) -> [usize; 3] {
        self.shapes[axis]
    }

    fn component(&self, axis: usize) -> &[CScalar] {
        &self.values[axis]
    }
}

/// Derives H on faces from E on edges through Faraday's law.
///
/// With the e^{-iωt} convention `∇×E = iωμ₀H`, so every face value is the
/// circulation of E around the face divided by `iωμ₀` times the face area.
pub fn derive_secondary_field(
    mesh: &TensorMesh,
    efield: &EdgeField,
    frequency: Scalar,
) -> Result<FaceField, SimulationError> {
    for axis in 0..3 {
        let expected = mesh.component_shape(Location::Edges, axis);
        let found = efield.shape(axis);
        if expected != found {
            return Err(SimulationError::ShapeMismatch {
                expected: (expected.iter().product(), 1),
                found: (found.iter().product(), 1),
            });
        }
    }
    if !(frequency.is_finite() && frequency > 0.0) {
        return Err(SimulationError::InvalidConfig(format!(
            "frequency must be positive, got {frequency}"
        )));
    }

    let iwu = J * (angular_frequency(frequency) * VACUUM_PERMEABILITY);
    let [hx, hy, hz] = [0, 1, 2].map(|a| mesh.widths(a));
    let shapes = [0, 1, 2].map(|a| mesh.component_shape(Location::Faces, a));
    let mut values = shapes.map(|s| vec![CScalar::new(0.0, 0.0); s.iter().product()]);

    let e = |axis: usize, i: usize, j: usize, k: usize| efield.get(axis, i, j, k);

    for (axis, out) in values.iter_mut().enumerate() {
        let [ni, nj, nk] = shapes[axis];
        for k in 0..nk {
            for j in 0..nj {
                for i in 0..ni {
                    let (circulation, area) = match axis {
                        0 => (
                            (e(2, i, j + 1, k) - e(2, i, j, k)) * hz[k]
                                - (e(1, i, j, k + 1) - e(1, i, j, k)) * hy[j],
                            hy[j] * hz[k],
                        ),
                        1 => (
                            (e(0, i, j, k + 1) - e(0, i, j, k)) * hx[i]
                                - (e(2, i + 1, j, k) - e(2, i, j, k)) * hz[k],
                            hz[k] * hx[i],
                        ),
                        _ => (
                            (e(1, i + 1, j, k) - e(1, i, j, k)) * hy[j]
                                - (e(0, i, j + 1, k) - e(0, i, j, k)) * hx[i],
                            hx[i] * hy[j],
                        ),
                    };
                    out[flat_index(shapes[axis], i, j, k)] = circulation / (iwu * area);
                }
            }
        }
    }

    Ok(FaceField { shapes, values })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    use super::*;

    fn stretched_mesh() -> TensorMesh {
        TensorMesh::new(
            vec![0.0, 1.0, 2.5, 4.5, 7.0],
            vec![-3.0, -1.0, 0.0, 1.0],
            vec![0.0, 2.0, 3.0, 3.5, 5.0, 8.0],
        )
        .unwrap()
    }

    #[test]
    fn gradient_fields_have_zero_curl() {
        let mesh = stretched_mesh();
        let phi = |x: f64, y: f64, z: f64| x * x - 2.0 * y * z + 0.3 * x * y * z;
        let mut stacked = Vec::with_capacity(mesh.n_edges());
        for axis in 0..3 {
            let [ni, nj, nk] = mesh.component_shape(Location::Edges, axis);
            for k in 0..nk {
                for j in 0..nj {
                    for i in 0..ni {
                        let start = [i, j, k];
                        let mut end = start;
                        end[axis] += 1;
                        let p = |idx: [usize; 3]| {
                            phi(mesh.nodes(0)[idx[0]], mesh.nodes(1)[idx[1]], mesh.nodes(2)[idx[2]])
                        };
                        let h = mesh.widths(axis)[start[axis]];
                        stacked.push(CScalar::new((p(end) - p(start)) / h, 0.0));
                    }
                }
            }
        }
        let efield = EdgeField::from_stacked(&mesh, &DVector::from_vec(stacked)).unwrap();
        let hfield = derive_secondary_field(&mesh, &efield, 1.0).unwrap();
        for axis in 0..3 {
            for value in hfield.component(axis) {
                assert!(value.norm() < 1.0e-6, "non-zero curl {value}");
            }
        }
    }

    #[test]
    fn linear_field_recovers_constant_curl() {
        // E = (0, 0, c x)  =>  ∇×E = (0, -c, 0)
        let mesh = stretched_mesh();
        let c = 2.5;
        let offsets = mesh.edge_offsets();
        let mut stacked = DVector::from_element(mesh.n_edges(), CScalar::new(0.0, 0.0));
        let shape = mesh.component_shape(Location::Edges, 2);
        for k in 0..shape[2] {
            for j in 0..shape[1] {
                for i in 0..shape[0] {
                    stacked[offsets[2] + flat_index(shape, i, j, k)] =
                        CScalar::new(c * mesh.nodes(0)[i], 0.0);
                }
            }
        }
        let efield = EdgeField::from_stacked(&mesh, &stacked).unwrap();
        let frequency = 3.0;
        let hfield = derive_secondary_field(&mesh, &efield, frequency).unwrap();
        let iwu = J * (angular_frequency(frequency) * VACUUM_PERMEABILITY);
        let expected = CScalar::new(-c, 0.0) / iwu;
        for value in hfield.component(1) {
            assert_relative_eq!(value.re, expected.re, max_relative = 1.0e-10);
            assert_relative_eq!(value.im, expected.im, max_relative = 1.0e-10);
        }
        assert!(hfield.component(0).iter().all(|v| v.norm() == 0.0));
        assert!(hfield.component(2).iter().all(|v| v.norm() == 0.0));
    }

    #[test]
    fn mismatched_mesh_is_rejected() {
        let mesh = stretched_mesh();
        let other = TensorMesh::uniform(crate::math::R3::zeros(), 1.0, [2, 2, 2]).unwrap();
        let efield = EdgeField::zeros(&other);
        assert!(derive_secondary_field(&mesh, &efield, 1.0).is_err());
    }
}
