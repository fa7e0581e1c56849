//! Resistivity models.
//!
//! The background is a transversely isotropic medium with a vertical axis of
//! symmetry (VTI): horizontal resistivity ρh and anisotropy λ = √(ρv/ρh).
//! Optional box-shaped anomalies turn the model into a 3D one, which only the
//! numerical solver can handle.

use serde::{Deserialize, Serialize};

use crate::math::{Scalar, R3};
use crate::mesh::{flat_index, TensorMesh};

/// Transversely isotropic (VTI) resistivity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VtiResistivity {
    /// Horizontal resistivity ρh in Ω·m.
    pub horizontal: Scalar,
    /// Anisotropy λ = √(ρv/ρh), dimensionless.
    #[serde(default = "default_anisotropy")]
    pub anisotropy: Scalar,
}

const fn default_anisotropy() -> Scalar {
    1.0
}

impl VtiResistivity {
    /// Isotropic resistivity.
    #[must_use]
    pub const fn isotropic(resistivity: Scalar) -> Self {
        Self {
            horizontal: resistivity,
            anisotropy: 1.0,
        }
    }

    /// VTI resistivity from ρh and λ.
    #[must_use]
    pub const fn new(horizontal: Scalar, anisotropy: Scalar) -> Self {
        Self {
            horizontal,
            anisotropy,
        }
    }

    /// Vertical resistivity ρv = ρh λ².
    #[must_use]
    pub fn vertical(&self) -> Scalar {
        self.horizontal * self.anisotropy * self.anisotropy
    }

    /// Horizontal conductivity σh in S/m.
    #[must_use]
    pub fn conductivity_h(&self) -> Scalar {
        1.0 / self.horizontal
    }

    /// Vertical conductivity σv in S/m.
    #[must_use]
    pub fn conductivity_v(&self) -> Scalar {
        1.0 / self.vertical()
    }

    /// True if both values are positive and finite.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.horizontal.is_finite()
            && self.horizontal > 0.0
            && self.anisotropy.is_finite()
            && self.anisotropy > 0.0
    }
}

/// Axis-aligned box with its own resistivity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    /// Lower corner (x, y, z) in meters.
    pub min: [Scalar; 3],
    /// Upper corner (x, y, z) in meters.
    pub max: [Scalar; 3],
    /// Resistivity inside the box.
    pub resistivity: VtiResistivity,
}

impl Anomaly {
    /// True if `point` lies inside the box (bounds inclusive).
    #[must_use]
    pub fn contains(&self, point: &R3) -> bool {
        (0..3).all(|a| point[a] >= self.min[a] && point[a] <= self.max[a])
    }
}

/// Background medium plus optional 3D anomalies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medium {
    /// Fullspace background.
    pub background: VtiResistivity,
    /// Anomalies painted over the background, later entries win.
    #[serde(default)]
    pub anomalies: Vec<Anomaly>,
}

impl Medium {
    /// Homogeneous fullspace.
    #[must_use]
    pub const fn fullspace(background: VtiResistivity) -> Self {
        Self {
            background,
            anomalies: Vec::new(),
        }
    }

    /// Adds an anomaly, returning the updated medium.
    #[must_use]
    pub fn with_anomaly(mut self, anomaly: Anomaly) -> Self {
        self.anomalies.push(anomaly);
        self
    }

    /// True if the medium has no 3D structure.
    #[must_use]
    pub fn is_fullspace(&self) -> bool {
        self.anomalies.is_empty()
    }

    /// Resistivity at `point`.
    #[must_use]
    pub fn resistivity_at(&self, point: &R3) -> VtiResistivity {
        self.anomalies
            .iter()
            .rev()
            .find(|a| a.contains(point))
            .map_or(self.background, |a| a.resistivity)
    }

    /// Samples the medium at every cell centre of `mesh`.
    #[must_use]
    pub fn paint(&self, mesh: &TensorMesh) -> CellModel {
        let shape = mesh.shape_cells();
        let mut horizontal = Vec::with_capacity(mesh.n_cells());
        let mut vertical = Vec::with_capacity(mesh.n_cells());
        for k in 0..shape[2] {
            for j in 0..shape[1] {
                for i in 0..shape[0] {
                    let rho = self.resistivity_at(&mesh.cell_center(i, j, k));
                    horizontal.push(rho.horizontal);
                    vertical.push(rho.vertical());
                }
            }
        }
        CellModel {
            shape,
            horizontal,
            vertical,
        }
    }
}

/// Horizontal and vertical resistivity per mesh cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellModel {
    shape: [usize; 3],
    horizontal: Vec<Scalar>,
    vertical: Vec<Scalar>,
}

impl CellModel {
    /// Number of cells along each axis.
    #[must_use]
    pub const fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Horizontal resistivity per cell (x fastest).
    #[must_use]
    pub fn resistivity_h(&self) -> &[Scalar] {
        &self.horizontal
    }

    /// Vertical resistivity per cell (x fastest).
    #[must_use]
    pub fn resistivity_v(&self) -> &[Scalar] {
        &self.vertical
    }

    /// Horizontal conductivity of cell `[i, j, k]`.
    #[must_use]
    pub fn conductivity_h(&self, cell: [usize; 3]) -> Scalar {
        1.0 / self.horizontal[flat_index(self.shape, cell[0], cell[1], cell[2])]
    }

    /// Vertical conductivity of cell `[i, j, k]`.
    #[must_use]
    pub fn conductivity_v(&self, cell: [usize; 3]) -> Scalar {
        1.0 / self.vertical[flat_index(self.shape, cell[0], cell[1], cell[2])]
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn vertical_resistivity_uses_anisotropy_squared() {
        let rho = VtiResistivity::new(1.0, 2.0_f64.sqrt());
        assert_relative_eq!(rho.vertical(), 2.0, epsilon = 1.0e-12);
        assert_relative_eq!(rho.conductivity_v(), 0.5, epsilon = 1.0e-12);
    }

    #[test]
    fn anomalies_override_background() {
        let medium = Medium::fullspace(VtiResistivity::isotropic(1.0)).with_anomaly(Anomaly {
            min: [-10.0, -10.0, -10.0],
            max: [10.0, 10.0, 10.0],
            resistivity: VtiResistivity::isotropic(100.0),
        });
        assert!(!medium.is_fullspace());
        assert_relative_eq!(medium.resistivity_at(&R3::zeros()).horizontal, 100.0);
        assert_relative_eq!(
            medium.resistivity_at(&R3::new(50.0, 0.0, 0.0)).horizontal,
            1.0
        );
    }

    #[test]
    fn painting_samples_cell_centres() {
        let mesh = TensorMesh::uniform(R3::new(-20.0, -20.0, -20.0), 10.0, [4, 4, 4]).unwrap();
        let medium = Medium::fullspace(VtiResistivity::new(2.0, 2.0)).with_anomaly(Anomaly {
            min: [0.0, 0.0, 0.0],
            max: [10.0, 10.0, 10.0],
            resistivity: VtiResistivity::isotropic(50.0),
        });
        let model = medium.paint(&mesh);
        assert_eq!(model.shape(), [4, 4, 4]);
        assert_eq!(model.resistivity_h().len(), 64);
        assert_relative_eq!(model.conductivity_h([2, 2, 2]), 1.0 / 50.0);
        assert_relative_eq!(model.conductivity_v([0, 0, 0]), 1.0 / 8.0);
        assert_eq!(model.resistivity_v().iter().filter(|&&r| r == 50.0).count(), 1);
    }

    #[test]
    fn invalid_resistivity_is_detected() {
        assert!(!VtiResistivity::new(-1.0, 1.0).is_valid());
        assert!(!VtiResistivity::new(1.0, 0.0).is_valid());
        assert!(VtiResistivity::new(1.0, 1.5).is_valid());
    }
}
