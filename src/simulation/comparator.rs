//! Runs the reference and numerical forward models on one scenario.

use tracing::info;

use crate::comparison::{relative_error, ComparisonResult};
use crate::fields::{FieldKind, ReceiverData};
use crate::simulation::{
    compute_numerical, ForwardSolver, NumericalConfig, NumericalSolution, ReferenceSolver, Scenario,
    SimulationError,
};

/// Reference, numerical and relative error for one field.
#[derive(Debug, Clone)]
pub struct FieldComparison {
    /// Field the data describe.
    pub kind: FieldKind,
    /// Semi-analytical data.
    pub reference: ReceiverData,
    /// Finite-volume data.
    pub numerical: ReceiverData,
    /// Relative error of the numerical data.
    pub error: ComparisonResult,
}

/// Everything produced by [`Comparator::run`].
#[derive(Debug, Clone)]
pub struct ComparatorOutput {
    /// Electric field comparison.
    pub electric: FieldComparison,
    /// Magnetic field comparison.
    pub magnetic: FieldComparison,
    /// Numerical solution the comparisons were interpolated from.
    pub solution: NumericalSolution,
}

impl ComparatorOutput {
    /// Comparison for `kind`.
    #[must_use]
    pub const fn field(&self, kind: FieldKind) -> &FieldComparison {
        match kind {
            FieldKind::Electric => &self.electric,
            FieldKind::Magnetic => &self.magnetic,
        }
    }
}

/// Single deterministic comparison pass.
///
/// The reference is evaluated for E and H, the numerical model is solved
/// once, H is derived from its E field and both are interpolated at the
/// receivers before errors are computed. Any failure aborts the run.
#[derive(Debug, Clone, Default)]
pub struct Comparator {
    /// Numerical forward-model settings.
    pub config: NumericalConfig,
    /// Reference forward model.
    pub reference: ReferenceSolver,
}

impl Comparator {
    /// Comparator with the default reference integrator.
    #[must_use]
    pub fn new(config: NumericalConfig) -> Self {
        Self {
            config,
            reference: ReferenceSolver::default(),
        }
    }

    /// Runs both models on `scenario`.
    pub fn run(&self, scenario: &Scenario) -> Result<ComparatorOutput, SimulationError> {
        info!(source = %scenario.source, frequency = scenario.frequency, "starting comparison");
        let reference_e = self.reference.compute(scenario, FieldKind::Electric)?;
        let reference_h = self.reference.compute(scenario, FieldKind::Magnetic)?;

        let solution = compute_numerical(scenario, &self.config)?;
        let method = self.config.interpolation;
        let numerical_e = solution.receiver_data(scenario, FieldKind::Electric, method)?;
        let numerical_h = solution.receiver_data(scenario, FieldKind::Magnetic, method)?;

        let electric = compare(FieldKind::Electric, reference_e, numerical_e)?;
        let magnetic = compare(FieldKind::Magnetic, reference_h, numerical_h)?;
        info!("comparison finished");
        Ok(ComparatorOutput {
            electric,
            magnetic,
            solution,
        })
    }
}

fn compare(
    kind: FieldKind,
    reference: ReceiverData,
    numerical: ReceiverData,
) -> Result<FieldComparison, SimulationError> {
    let error = relative_error(&reference, &numerical)?;
    Ok(FieldComparison {
        kind,
        reference,
        numerical,
        error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::{Anomaly, Medium, VtiResistivity};
    use crate::survey::{ReceiverGrid, Source};

    #[test]
    fn anomalous_media_abort_before_solving() {
        let scenario = Scenario::new(
            1.0,
            Medium::fullspace(VtiResistivity::isotropic(1.0)).with_anomaly(Anomaly {
                min: [-50.0, -50.0, -50.0],
                max: [50.0, 50.0, 50.0],
                resistivity: VtiResistivity::isotropic(10.0),
            }),
            Source::electric_from_bipole([-1.0, 1.0, 0.0, 0.0, 0.0, 0.0], 1.0),
            ReceiverGrid::new(vec![200.0], vec![0.0], 0.0, 0.0, 0.0),
        );
        let err = Comparator::default().run(&scenario).unwrap_err();
        assert!(matches!(err, SimulationError::UnsupportedScenario(_)));
    }
}
