//! Forward solvers and the comparator that runs them side by side.
//!
//! A [`Scenario`] bundles everything both solvers must agree on: frequency,
//! medium, source and receivers. Each solver is stateless and turns a
//! scenario into [`ReceiverData`] through the [`ForwardSolver`] trait.

pub mod comparator;
pub mod numerical;
pub mod reference;

pub use comparator::{Comparator, ComparatorOutput, FieldComparison};
pub use numerical::{compute_numerical, MeshPreset, NumericalConfig, NumericalSolution, NumericalSolver};
pub use reference::{compute_reference, ReferenceSolver};

use crate::fields::{FieldKind, ReceiverData};
use crate::materials::Medium;
use crate::math::Scalar;
use crate::mesh::MeshError;
use crate::solver::SolverError;
use crate::survey::{ReceiverGrid, Source};

/// Inputs shared by every forward model of one comparison run.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// Source frequency in Hz.
    pub frequency: Scalar,
    /// Resistivity model.
    pub medium: Medium,
    /// Transmitter.
    pub source: Source,
    /// Receiver grid, also defining the projection direction.
    pub receivers: ReceiverGrid,
}

impl Scenario {
    /// Bundles the scenario inputs.
    #[must_use]
    pub const fn new(frequency: Scalar, medium: Medium, source: Source, receivers: ReceiverGrid) -> Self {
        Self {
            frequency,
            medium,
            source,
            receivers,
        }
    }

    /// Checks the physical parameters of every component.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !(self.frequency.is_finite() && self.frequency > 0.0) {
            return Err(SimulationError::InvalidConfig(format!(
                "frequency must be positive, got {}",
                self.frequency
            )));
        }
        if !self.medium.background.is_valid() {
            return Err(SimulationError::InvalidConfig(format!(
                "invalid background resistivity {:?}",
                self.medium.background
            )));
        }
        for (index, anomaly) in self.medium.anomalies.iter().enumerate() {
            let ordered = (0..3).all(|a| anomaly.max[a] > anomaly.min[a]);
            if !ordered || !anomaly.resistivity.is_valid() {
                return Err(SimulationError::InvalidConfig(format!(
                    "anomaly {index} is degenerate or has invalid resistivity"
                )));
            }
        }
        self.source.validate().map_err(SimulationError::InvalidConfig)?;
        self.receivers.validate().map_err(SimulationError::InvalidConfig)?;
        Ok(())
    }
}

/// A stateless forward model evaluated at the receivers of a scenario.
pub trait ForwardSolver {
    /// Field `kind` at every receiver, projected on the receiver direction.
    fn compute(&self, scenario: &Scenario, kind: FieldKind) -> Result<ReceiverData, SimulationError>;

    /// Short name for logs and reports.
    fn name(&self) -> &str;
}

/// Errors that can occur while configuring or executing simulations.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// Raised when the configuration is internally inconsistent.
    #[error("configuration error: {0}")]
    InvalidConfig(String),
    /// The scenario is outside what the chosen forward model can represent.
    #[error("unsupported scenario: {0}")]
    UnsupportedScenario(String),
    /// A receiver lies outside the computational mesh.
    #[error("receiver at ({x}, {y}, {z}) is outside the mesh")]
    ReceiverOutsideMesh {
        /// Receiver x coordinate.
        x: Scalar,
        /// Receiver y coordinate.
        y: Scalar,
        /// Receiver z coordinate.
        z: Scalar,
    },
    /// Two arrays that must agree in shape do not.
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        /// Expected `(rows, columns)`.
        expected: (usize, usize),
        /// Actual `(rows, columns)`.
        found: (usize, usize),
    },
    /// Mesh construction failed.
    #[error(transparent)]
    Mesh(#[from] MeshError),
    /// The linear solver failed.
    #[error("solver failed: {0}")]
    Solver(#[from] SolverError),
}
