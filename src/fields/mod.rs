//! Electromagnetic field representations and helper utilities.
//!
//! Numerical fields live on the staggered mesh ([`EdgeField`] for E,
//! [`FaceField`] for H); analytical fields are evaluated directly at the
//! receivers through the fullspace Green's tensors. Both end up as
//! [`ReceiverData`] once projected onto the receiver orientation.

mod electric;
mod fullspace;
mod interpolation;
mod magnetic;
mod receivers;

pub use electric::EdgeField;
pub use fullspace::{FullspaceGreen, WireIntegrator};
pub use interpolation::{project_to_receivers, Interpolation};
pub use magnetic::{derive_secondary_field, FaceField};
pub use receivers::ReceiverData;

use serde::{Deserialize, Serialize};

use crate::math::CScalar;
use crate::mesh::Location;

/// Which field a dataset describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Electric field E in V/m.
    Electric,
    /// Magnetic field H in A/m.
    Magnetic,
}

impl FieldKind {
    /// Short label used in logs and file names.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Electric => "E",
            Self::Magnetic => "H",
        }
    }

    /// SI unit of the field.
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Electric => "V/m",
            Self::Magnetic => "A/m",
        }
    }
}

/// Vector field stored component-wise on one of the staggered grids.
pub trait StaggeredField {
    /// Grid the components live on.
    const LOCATION: Location;

    /// Grid shape of component `axis`.
    fn shape(&self, axis: usize) -> [usize; 3];

    /// Values of component `axis`, flattened with [`crate::mesh::flat_index`].
    fn component(&self, axis: usize) -> &[CScalar];
}
