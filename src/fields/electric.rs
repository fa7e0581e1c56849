use nalgebra::DVector;

use crate::fields::StaggeredField;
use crate::math::CScalar;
use crate::mesh::{flat_index, Location, TensorMesh};
use crate::simulation::SimulationError;

/// Electric field on mesh edges.
///
/// Component `a` holds the tangential field on the edges parallel to axis `a`.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeField {
    shapes: [[usize; 3]; 3],
    values: [Vec<CScalar>; 3],
}

impl EdgeField {
    /// Zero field on the edges of `mesh`.
    #[must_use]
    pub fn zeros(mesh: &TensorMesh) -> Self {
        let shapes = [0, 1, 2].map(|a| mesh.component_shape(Location::Edges, a));
        let values = shapes.map(|s| vec![CScalar::new(0.0, 0.0); s.iter().product()]);
        Self { shapes, values }
    }

    /// Splits a stacked `[Ex; Ey; Ez]` solution vector into components.
    pub fn from_stacked(mesh: &TensorMesh, stacked: &DVector<CScalar>) -> Result<Self, SimulationError> {
        let expected = mesh.n_edges();
        if stacked.len() != expected {
            return Err(SimulationError::ShapeMismatch {
                expected: (expected, 1),
                found: (stacked.len(), 1),
            });
        }
        let shapes = [0, 1, 2].map(|a| mesh.component_shape(Location::Edges, a));
        let offsets = mesh.edge_offsets();
        let values = [0, 1, 2].map(|a| {
            let len: usize = shapes[a].iter().product();
            stacked.as_slice()[offsets[a]..offsets[a] + len].to_vec()
        });
        Ok(Self { shapes, values })
    }

    /// Stacks the components back into a single `[Ex; Ey; Ez]` vector.
    #[must_use]
    pub fn to_stacked(&self) -> DVector<CScalar> {
        DVector::from_iterator(self.len(), self.values.iter().flatten().copied())
    }

    /// Value of component `axis` at grid index (i, j, k).
    #[must_use]
    pub fn get(&self, axis: usize, i: usize, j: usize, k: usize) -> CScalar {
        self.values[axis][flat_index(self.shapes[axis], i, j, k)]
    }

    /// Total number of edge values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.iter().map(Vec::len).sum()
    }

    /// True if the mesh has no edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StaggeredField for EdgeField {
    const LOCATION: Location = Location::Edges;

    fn shape(&self, axis: usize) -> [usize; 3] {
        self.shapes[axis]
    }

    fn component(&self, axis: usize) -> &[CScalar] {
        &self.values[axis]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::R3;

    #[test]
    fn stacked_vector_splits_into_components() {
        let mesh = TensorMesh::uniform(R3::zeros(), 1.0, [2, 3, 4]).unwrap();
        let n = mesh.n_edges();
        let stacked = DVector::from_iterator(n, (0..n).map(|i| CScalar::new(i as f64, 0.0)));
        let field = EdgeField::from_stacked(&mesh, &stacked).unwrap();

        // Ex lives on a (2, 4, 5) grid, Ey on (3, 3, 5), Ez on (3, 4, 4).
        assert_eq!(field.shape(0), [2, 4, 5]);
        assert_eq!(field.shape(1), [3, 3, 5]);
        assert_eq!(field.shape(2), [3, 4, 4]);
        assert_eq!(field.get(1, 0, 0, 0).re, 40.0);
        assert_eq!(field.to_stacked(), stacked);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let mesh = TensorMesh::uniform(R3::zeros(), 1.0, [2, 2, 2]).unwrap();
        let stacked = DVector::from_element(3, CScalar::new(1.0, 0.0));
        assert!(matches!(
            EdgeField::from_stacked(&mesh, &stacked),
            Err(SimulationError::ShapeMismatch { .. })
        ));
    }
}
