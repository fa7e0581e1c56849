//! Convenience re-exports for building forward-model comparisons.

pub use crate::comparison::{relative_error, ComparisonResult, ErrorStats, Region};
pub use crate::config::{ConfigError, ScenarioConfig};
pub use crate::constants::*;
pub use crate::errors::EmDiffusionError;
pub use crate::fields::{
    derive_secondary_field, project_to_receivers, EdgeField, FaceField, FieldKind, FullspaceGreen,
    Interpolation, ReceiverData, WireIntegrator,
};
pub use crate::materials::{Anomaly, CellModel, Medium, VtiResistivity};
pub use crate::math::{direction, linspace, CScalar, Scalar, R3};
pub use crate::mesh::{construct_mesh, MeshOptions, TensorMesh};
pub use crate::report::Report;
pub use crate::simulation::{
    compute_numerical, compute_reference, Comparator, ComparatorOutput, FieldComparison,
    ForwardSolver, MeshPreset, NumericalConfig, NumericalSolution, NumericalSolver,
    ReferenceSolver, Scenario, SimulationError,
};
pub use crate::solver::{SolverMethod, SolverOptions, SolverStats, SparseSolver};
pub use crate::survey::{ReceiverGrid, Segment, Source};
