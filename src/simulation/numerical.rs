//! 3D finite-volume forward model on a stretched tensor mesh.
//!
//! The pipeline is: construct the mesh around the source, paint the medium
//! onto cells, assemble the curl-curl system with PEC boundaries, distribute
//! the source current onto edges and solve with a Krylov method. The result
//! is the electric field on every edge; the magnetic field follows from
//! Faraday's law on demand.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::skin_depth;
use crate::fields::{
    derive_secondary_field, project_to_receivers, EdgeField, FaceField, FieldKind, Interpolation,
    ReceiverData,
};
use crate::materials::CellModel;
use crate::math::{arange, Scalar};
use crate::mesh::{construct_mesh, MeshOptions, TensorMesh};
use crate::simulation::{ForwardSolver, Scenario, SimulationError};
use crate::solver::{assemble_system, source_vector, SolverOptions, SolverStats};

/// Resolution presets of the gallery comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshPreset {
    /// 40 m minimum cells, uniform stretching of 1.045.
    #[default]
    Coarse,
    /// 20 m minimum cells, stretching between 1.03 and 1.045.
    Fine,
}

impl MeshPreset {
    /// Lower and upper limit of the minimum cell width.
    #[must_use]
    pub const fn min_width_limits(self) -> [Scalar; 2] {
        match self {
            Self::Coarse => [40.0, 40.0],
            Self::Fine => [20.0, 20.0],
        }
    }

    /// Stretching factor range outside the survey domain.
    #[must_use]
    pub const fn stretching(self) -> [Scalar; 2] {
        match self {
            Self::Coarse => [1.045, 1.045],
            Self::Fine => [1.03, 1.045],
        }
    }

    /// Receiver coordinates along one horizontal axis matching the preset.
    ///
    /// Coarse: 256 receivers every 20 m from −2550 m. Fine: 1025 receivers
    /// every 5 m from −2560 m.
    #[must_use]
    pub fn receiver_axis(self) -> Vec<Scalar> {
        match self {
            Self::Coarse => arange(-2550.0, 2560.0, 20.0),
            Self::Fine => arange(-2560.0, 2562.5, 5.0),
        }
    }
}

/// Settings of the numerical forward model.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericalConfig {
    /// Resolution preset; explicit overrides below take precedence.
    pub preset: MeshPreset,
    /// Survey domain; derived from source and receivers when `None`.
    pub domain: Option<[[Scalar; 2]; 3]>,
    /// Override of the preset's minimum width limits.
    pub min_width_limits: Option<[Scalar; 2]>,
    /// Override of the preset's stretching range.
    pub stretching: Option<[Scalar; 2]>,
    /// Boundary distance in diffusive wavelengths.
    pub lambda_factor: Scalar,
    /// Measure the boundary distance from the source centre.
    pub lambda_from_center: bool,
    /// Maximum stretched cells on each side.
    pub max_buffer_cells: usize,
    /// Linear solver.
    pub solver: SolverOptions,
    /// Receiver interpolation.
    pub interpolation: Interpolation,
}

impl Default for NumericalConfig {
    fn default() -> Self {
        Self::from_preset(MeshPreset::default())
    }
}

impl NumericalConfig {
    /// Default settings for `preset`.
    #[must_use]
    pub fn from_preset(preset: MeshPreset) -> Self {
        Self {
            preset,
            domain: None,
            min_width_limits: None,
            stretching: None,
            lambda_factor: 0.8,
            lambda_from_center: true,
            max_buffer_cells: 64,
            solver: SolverOptions::default(),
            interpolation: Interpolation::default(),
        }
    }

    /// Mesh construction options for `scenario`.
    #[must_use]
    pub fn mesh_options(&self, scenario: &Scenario) -> MeshOptions {
        let resistivity = scenario.medium.background.horizontal;
        let domain = self
            .domain
            .unwrap_or_else(|| survey_domain(scenario, skin_depth(scenario.frequency, resistivity) / 3.0));
        let mut options = MeshOptions::new(scenario.frequency, resistivity, scenario.source.center(), domain);
        options.min_width_limits = Some(self.min_width_limits.unwrap_or_else(|| self.preset.min_width_limits()));
        options.stretching = self.stretching.unwrap_or_else(|| self.preset.stretching());
        options.lambda_factor = self.lambda_factor;
        options.lambda_from_center = self.lambda_from_center;
        options.max_buffer_cells = self.max_buffer_cells;
        options
    }
}

/// Bounding box of the source wires and the receivers.
///
/// Axes without extent are widened by `padding` on both sides.
fn survey_domain(scenario: &Scenario, padding: Scalar) -> [[Scalar; 2]; 3] {
    let receivers = &scenario.receivers;
    let mut domain = [[Scalar::INFINITY, Scalar::NEG_INFINITY]; 3];
    let mut include = |axis: usize, value: Scalar| {
        domain[axis][0] = domain[axis][0].min(value);
        domain[axis][1] = domain[axis][1].max(value);
    };
    for segment in scenario.source.segments() {
        for point in [segment.start, segment.end] {
            (0..3).for_each(|a| include(a, point[a]));
        }
    }
    receivers.x.iter().for_each(|&x| include(0, x));
    receivers.y.iter().for_each(|&y| include(1, y));
    include(2, receivers.z);

    for bounds in &mut domain {
        if bounds[1] - bounds[0] <= 0.0 {
            bounds[0] -= padding;
            bounds[1] += padding;
        }
    }
    domain
}

/// Output of [`compute_numerical`].
#[derive(Debug, Clone)]
pub struct NumericalSolution {
    /// Frequency the field was computed at (Hz).
    pub frequency: Scalar,
    /// Computational mesh.
    pub mesh: TensorMesh,
    /// Resistivity painted on the mesh cells.
    pub model: CellModel,
    /// Electric field on the mesh edges.
    pub efield: EdgeField,
    /// Linear solver diagnostics.
    pub stats: SolverStats,
}

impl NumericalSolution {
    /// Magnetic field on the mesh faces.
    pub fn magnetic_field(&self) -> Result<FaceField, SimulationError> {
        derive_secondary_field(&self.mesh, &self.efield, self.frequency)
    }

    /// Field `kind` interpolated at the receivers of `scenario`.
    pub fn receiver_data(
        &self,
        scenario: &Scenario,
        kind: FieldKind,
        method: Interpolation,
    ) -> Result<ReceiverData, SimulationError> {
        match kind {
            FieldKind::Electric => {
                project_to_receivers(&self.mesh, &self.efield, &scenario.receivers, method, kind)
            }
            FieldKind::Magnetic => {
                let hfield = self.magnetic_field()?;
                project_to_receivers(&self.mesh, &hfield, &scenario.receivers, method, kind)
            }
        }
    }
}

/// Solves for the electric field of `scenario` on a freshly constructed mesh.
pub fn compute_numerical(
    scenario: &Scenario,
    config: &NumericalConfig,
) -> Result<NumericalSolution, SimulationError> {
    scenario.validate()?;

    let options = config.mesh_options(scenario);
    debug!(domain = ?options.domain, min_width = options.min_width(), "mesh options");
    let mesh = construct_mesh(&options)?;

    let segments = scenario.source.segments();
    for segment in &segments {
        for point in [segment.start, segment.end] {
            if !mesh.contains(&point) {
                return Err(SimulationError::InvalidConfig(format!(
                    "source point {point:?} lies outside the mesh"
                )));
            }
        }
    }

    let model = scenario.medium.paint(&mesh);
    let matrix = assemble_system(&mesh, &model, scenario.frequency)?;
    let rhs = source_vector(&mesh, &segments, scenario.frequency);
    info!(
        cells = mesh.n_cells(),
        unknowns = mesh.n_edges(),
        nnz = matrix.nnz(),
        "system assembled"
    );

    let mut solver = config.solver.build();
    solver.symbolic(&matrix)?;
    solver.numeric(&matrix)?;
    let (solution, stats) = solver.solve_with_stats(&rhs)?;
    info!(
        solver = solver.name(),
        iterations = ?stats.iterations,
        residual = ?stats.residual_norm,
        elapsed = ?stats.solve_time,
        "solver converged"
    );

    let efield = EdgeField::from_stacked(&mesh, &solution)?;
    Ok(NumericalSolution {
        frequency: scenario.frequency,
        mesh,
        model,
        efield,
        stats,
    })
}

/// [`ForwardSolver`] wrapper that solves once per call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericalSolver {
    /// Mesh, solver and interpolation settings.
    pub config: NumericalConfig,
}

impl NumericalSolver {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: NumericalConfig) -> Self {
        Self { config }
    }
}

impl ForwardSolver for NumericalSolver {
    fn compute(&self, scenario: &Scenario, kind: FieldKind) -> Result<ReceiverData, SimulationError> {
        compute_numerical(scenario, &self.config)?.receiver_data(scenario, kind, self.config.interpolation)
    }

    fn name(&self) -> &str {
        "finite volume"
    }
}
