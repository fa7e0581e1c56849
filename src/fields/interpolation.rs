//! Tensor-product interpolation of staggered fields onto receivers.

use serde::{Deserialize, Serialize};

use crate::fields::{FieldKind, ReceiverData, StaggeredField};
use crate::math::{CScalar, Scalar};
use crate::mesh::{flat_index, TensorMesh};
use crate::simulation::SimulationError;
use crate::survey::ReceiverGrid;

/// Interpolation scheme along each axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    /// Two-point linear interpolation.
    Linear,
    /// Four-point Lagrange interpolation on the non-uniform coordinates.
    #[default]
    Cubic,
}

/// Stencil indices and weights along one axis.
pub(crate) type Stencil = Vec<(usize, Scalar)>;

impl Interpolation {
    pub(crate) fn stencil(self, coords: &[Scalar], x: Scalar) -> Stencil {
        let n = coords.len();
        if n == 1 {
            return vec![(0, 1.0)];
        }
        // Interval [i, i + 1] containing x, clamped to the grid.
        let i = coords.partition_point(|&c| c <= x).clamp(1, n - 1) - 1;

        match self {
            Self::Cubic if n >= 4 => {
                let start = i.saturating_sub(1).min(n - 4);
                let nodes = &coords[start..start + 4];
                let x = x.clamp(coords[0], coords[n - 1]);
                (0..4)
                    .map(|a| {
                        let weight = (0..4)
                            .filter(|&b| b != a)
                            .map(|b| (x - nodes[b]) / (nodes[a] - nodes[b]))
                            .product();
                        (start + a, weight)
                    })
                    .collect()
            }
            _ => {
                let t = ((x - coords[i]) / (coords[i + 1] - coords[i])).clamp(0.0, 1.0);
                vec![(i, 1.0 - t), (i + 1, t)]
            }
        }
    }
}

/// Interpolates `field` at every receiver and projects it on the receiver
/// orientation.
///
/// Each component is interpolated on its own staggered coordinates. Receivers
/// outside the mesh are rejected.
pub fn project_to_receivers<F: StaggeredField>(
    mesh: &TensorMesh,
    field: &F,
    receivers: &ReceiverGrid,
    method: Interpolation,
    kind: FieldKind,
) -> Result<ReceiverData, SimulationError> {
    for axis in 0..3 {
        let expected = mesh.component_shape(F::LOCATION, axis);
        if field.shape(axis) != expected {
            return Err(SimulationError::ShapeMismatch {
                expected: (expected.iter().product(), 1),
                found: (field.shape(axis).iter().product(), 1),
            });
        }
    }
    let (rows, cols) = receivers.shape();
    for row in 0..rows {
        for col in 0..cols {
            let point = receivers.point(row, col);
            if !mesh.contains(&point) {
                return Err(SimulationError::ReceiverOutsideMesh {
                    x: point.x,
                    y: point.y,
                    z: point.z,
                });
            }
        }
    }

    let direction = receivers.direction();
    let mut values = nalgebra::DMatrix::from_element(rows, cols, CScalar::new(0.0, 0.0));

    for axis in 0..3 {
        if direction[axis] == 0.0 {
            continue;
        }
        let coords = mesh.component_coords(F::LOCATION, axis);
        let shape = field.shape(axis);
        let data = field.component(axis);

        let sx: Vec<Stencil> = receivers.x.iter().map(|&x| method.stencil(&coords[0], x)).collect();
        let sy: Vec<Stencil> = receivers.y.iter().map(|&y| method.stencil(&coords[1], y)).collect();
        let sz = method.stencil(&coords[2], receivers.z);

        for (row, wy) in sy.iter().enumerate() {
            for (col, wx) in sx.iter().enumerate() {
                let mut sum = CScalar::new(0.0, 0.0);
                for &(k, a) in &sz {
                    for &(j, b) in wy {
                        for &(i, c) in wx {
                            sum += data[flat_index(shape, i, j, k)] * (a * b * c);
                        }
                    }
                }
                values[(row, col)] += sum * direction[axis];
            }
        }
    }

    Ok(ReceiverData::new(kind, values))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    use super::*;
    use crate::fields::EdgeField;
    use crate::mesh::Location;

    fn mesh() -> TensorMesh {
        TensorMesh::new(
            vec![-10.0, -6.0, -3.0, -1.0, 0.0, 1.5, 4.0, 9.0],
            vec![-8.0, -4.0, -1.0, 1.0, 3.0, 7.0],
            vec![-9.0, -5.0, -2.0, 0.0, 2.0, 6.0],
        )
        .unwrap()
    }

    /// Edge field sampling `f(axis, x, y, z)` at every edge midpoint.
    fn sampled(mesh: &TensorMesh, f: impl Fn(usize, f64, f64, f64) -> f64) -> EdgeField {
        let mut stacked = Vec::with_capacity(mesh.n_edges());
        for axis in 0..3 {
            let [cx, cy, cz] = mesh.component_coords(Location::Edges, axis);
            for z in &cz {
                for y in &cy {
                    for x in &cx {
                        stacked.push(CScalar::new(f(axis, *x, *y, *z), -f(axis, *x, *y, *z)));
                    }
                }
            }
        }
        EdgeField::from_stacked(mesh, &DVector::from_vec(stacked)).unwrap()
    }

    #[test]
    fn linear_interpolation_is_exact_for_trilinear_fields() {
        let mesh = mesh();
        let f = |axis: usize, x: f64, y: f64, z: f64| (axis as f64 + 1.0) * (1.0 + 0.5 * x - y + 0.25 * z + 0.1 * x * y);
        let field = sampled(&mesh, f);
        let receivers = ReceiverGrid::new(vec![-0.7, 0.3, 2.2], vec![-0.5, 0.9], 0.8, 25.0, 10.0);
        let data = project_to_receivers(&mesh, &field, &receivers, Interpolation::Linear, FieldKind::Electric).unwrap();
        let d = receivers.direction();
        for row in 0..2 {
            for col in 0..3 {
                let p = receivers.point(row, col);
                let expected: f64 = (0..3).map(|a| d[a] * f(a, p.x, p.y, p.z)).sum();
                assert_relative_eq!(data.get(row, col).re, expected, epsilon = 1.0e-10);
                assert_relative_eq!(data.get(row, col).im, -expected, epsilon = 1.0e-10);
            }
        }
    }

    #[test]
    fn cubic_interpolation_is_exact_for_cubic_polynomials() {
        let mesh = mesh();
        let f = |_: usize, x: f64, y: f64, z: f64| x * x * x - 2.0 * y * y + x * y * z + 0.5 * z * z * z;
        let field = sampled(&mesh, f);
        let receivers = ReceiverGrid::new(vec![-0.4, 0.6], vec![0.2, 1.7], -0.3, 0.0, 90.0);
        let data = project_to_receivers(&mesh, &field, &receivers, Interpolation::Cubic, FieldKind::Electric).unwrap();
        for row in 0..2 {
            for col in 0..2 {
                let p = receivers.point(row, col);
                assert_relative_eq!(data.get(row, col).re, f(2, p.x, p.y, p.z), epsilon = 1.0e-9);
            }
        }
    }

    #[test]
    fn receivers_outside_the_mesh_are_rejected() {
        let mesh = mesh();
        let field = EdgeField::zeros(&mesh);
        let receivers = ReceiverGrid::new(vec![0.0, 20.0], vec![0.0], 0.0, 0.0, 0.0);
        let err = project_to_receivers(&mesh, &field, &receivers, Interpolation::Linear, FieldKind::Electric)
            .unwrap_err();
        assert!(matches!(err, SimulationError::ReceiverOutsideMesh { x, .. } if x == 20.0));
    }

    #[test]
    fn stencil_weights_sum_to_one() {
        let coords = [0.0, 1.0, 3.0, 6.0, 10.0];
        for method in [Interpolation::Linear, Interpolation::Cubic] {
            for x in [0.0, 0.4, 2.9, 7.5, 10.0] {
                let total: f64 = method.stencil(&coords, x).iter().map(|(_, w)| w).sum();
                assert_relative_eq!(total, 1.0, epsilon = 1.0e-12);
            }
        }
    }
}
