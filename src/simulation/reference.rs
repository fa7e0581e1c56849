//! Semi-analytical reference for a homogeneous VTI fullspace.

use tracing::{debug, info};

use crate::fields::{FieldKind, FullspaceGreen, ReceiverData, WireIntegrator};
use crate::math::CScalar;
use crate::simulation::{ForwardSolver, Scenario, SimulationError};

/// Closed-form fullspace solution integrated along the source wires.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceSolver {
    /// Quadrature used along every wire segment.
    pub integrator: WireIntegrator,
}

impl ReferenceSolver {
    /// Solver with a custom wire integrator.
    #[must_use]
    pub const fn new(integrator: WireIntegrator) -> Self {
        Self { integrator }
    }
}

impl ForwardSolver for ReferenceSolver {
    fn compute(&self, scenario: &Scenario, kind: FieldKind) -> Result<ReceiverData, SimulationError> {
        scenario.validate()?;
        if !scenario.medium.is_fullspace() {
            return Err(SimulationError::UnsupportedScenario(format!(
                "the fullspace reference cannot represent {} anomalies",
                scenario.medium.anomalies.len()
            )));
        }

        let green = FullspaceGreen::new(scenario.frequency, &scenario.medium.background);
        let segments = scenario.source.segments();
        let direction = scenario.receivers.direction().map(|c| CScalar::new(c, 0.0));
        let (rows, cols) = scenario.receivers.shape();
        debug!(segments = segments.len(), receivers = rows * cols, "evaluating reference");

        let data = ReceiverData::from_fn(kind, rows, cols, |row, col| {
            let receiver = scenario.receivers.point(row, col);
            self.integrator
                .field(&green, kind, &segments, &receiver)
                .dot(&direction)
        });
        info!(field = kind.label(), "reference solution computed");
        Ok(data)
    }

    fn name(&self) -> &str {
        "fullspace reference"
    }
}

/// Reference field `kind` at the receivers of `scenario`.
///
/// Fails with [`SimulationError::UnsupportedScenario`] if the medium has
/// anomalies.
pub fn compute_reference(scenario: &Scenario, kind: FieldKind) -> Result<ReceiverData, SimulationError> {
    ReferenceSolver::default().compute(scenario, kind)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::materials::{Anomaly, Medium, VtiResistivity};
    use crate::math::R3;
    use crate::survey::{ReceiverGrid, Source};

    fn scenario(receivers: ReceiverGrid) -> Scenario {
        Scenario::new(
            0.77,
            Medium::fullspace(VtiResistivity::new(1.0, 2.0_f64.sqrt())),
            Source::ElectricDipole {
                center: R3::zeros(),
                azimuth: 0.0,
                elevation: 0.0,
                length: 1.0,
                strength: 1.0,
            },
            receivers,
        )
    }

    #[test]
    fn anomalies_are_unsupported() {
        let mut scenario = scenario(ReceiverGrid::new(vec![100.0], vec![0.0], 0.0, 0.0, 0.0));
        scenario.medium = scenario.medium.with_anomaly(Anomaly {
            min: [-10.0, -10.0, -10.0],
            max: [10.0, 10.0, 10.0],
            resistivity: VtiResistivity::isotropic(100.0),
        });
        let err = compute_reference(&scenario, FieldKind::Electric).unwrap_err();
        assert!(matches!(err, SimulationError::UnsupportedScenario(_)));
    }

    #[test]
    fn projection_follows_receiver_orientation() {
        let inline = scenario(ReceiverGrid::new(vec![150.0, 300.0], vec![40.0], -20.0, 0.0, 0.0));
        let crossline = scenario(ReceiverGrid::new(vec![150.0, 300.0], vec![40.0], -20.0, 90.0, 0.0));
        let mut rotated = inline.clone();
        rotated.receivers.azimuth = 30.0;

        let ex = compute_reference(&inline, FieldKind::Electric).unwrap();
        let ey = compute_reference(&crossline, FieldKind::Electric).unwrap();
        let e30 = compute_reference(&rotated, FieldKind::Electric).unwrap();
        let (c, s) = (30.0_f64.to_radians().cos(), 30.0_f64.to_radians().sin());
        for col in 0..2 {
            let expected = ex.get(0, col) * c + ey.get(0, col) * s;
            assert_relative_eq!(e30.get(0, col).re, expected.re, max_relative = 1.0e-10);
            assert_relative_eq!(e30.get(0, col).im, expected.im, max_relative = 1.0e-10);
        }
    }

    #[test]
    fn field_decays_with_offset() {
        let scenario = scenario(ReceiverGrid::new(vec![100.0, 400.0, 1600.0], vec![0.0], -50.0, 90.0, 0.0));
        let data = compute_reference(&scenario, FieldKind::Magnetic).unwrap();
        assert_eq!(data.kind, FieldKind::Magnetic);
        let amplitude = data.amplitude();
        assert!(amplitude[(0, 0)] > amplitude[(0, 1)]);
        assert!(amplitude[(0, 1)] > amplitude[(0, 2)]);
    }
}
