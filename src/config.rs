//! TOML scenario files.
//!
//! Every section is optional; an empty file describes the gallery comparison
//! (magnetic dipole at 0.77 Hz in a 1 Ω·m fullspace with anisotropy √2,
//! receivers 100 m below the source).
//!
//! # Example TOML
//!
//! ```toml
//! frequency = 0.77
//! interpolation = "cubic"
//!
//! [source]
//! type = "magnetic_dipole"
//! coordinates = [-0.5, 0.5, -0.3, 0.3, -300.5, -299.5]
//! strength = 3.141592653589793
//!
//! [medium]
//! resistivity = 1.0
//! anisotropy = 1.4142135623730951
//!
//! [receivers]
//! x = { start = -1000.0, stop = 1000.0, count = 101 }
//! y = [-500.0, 0.0, 500.0]
//! z = -400.0
//! azimuth = 25.0
//! elevation = 10.0
//!
//! [mesh]
//! preset = "coarse"
//!
//! [solver]
//! method = "bicgstab"
//! relative_tolerance = 1e-7
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::fields::Interpolation;
use crate::materials::{Anomaly, Medium, VtiResistivity};
use crate::math::{linspace, Scalar, R3};
use crate::simulation::{MeshPreset, NumericalConfig, Scenario};
use crate::solver::{ConvergenceCriteria, SolverMethod, SolverOptions};
use crate::survey::{ReceiverGrid, Source};

/// Errors raised while loading a scenario file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid TOML or does not match the schema.
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    /// A value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Complete scenario file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Source frequency (Hz).
    pub frequency: Scalar,
    /// Receiver interpolation of the numerical fields.
    pub interpolation: Interpolation,
    /// Transmitter.
    pub source: SourceConfig,
    /// Resistivity model.
    pub medium: MediumConfig,
    /// Receiver grid.
    pub receivers: ReceiverConfig,
    /// Mesh construction.
    pub mesh: MeshConfig,
    /// Linear solver.
    pub solver: SolverConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            frequency: 0.77,
            interpolation: Interpolation::default(),
            source: SourceConfig::default(),
            medium: MediumConfig::default(),
            receivers: ReceiverConfig::default(),
            mesh: MeshConfig::default(),
            solver: SolverConfig::default(),
        }
    }
}

impl ScenarioConfig {
    /// Loads and validates a scenario file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses and validates a TOML string.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scenario()?
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.mesh.validate()?;
        self.solver.validate()
    }

    /// Scenario shared by both forward models.
    pub fn scenario(&self) -> Result<Scenario, ConfigError> {
        Ok(Scenario::new(
            self.frequency,
            self.medium.to_medium(),
            self.source.to_source()?,
            self.receivers.to_grid(self.mesh.preset)?,
        ))
    }

    /// Settings of the numerical forward model.
    #[must_use]
    pub fn numerical(&self) -> NumericalConfig {
        let mut config = NumericalConfig::from_preset(self.mesh.preset);
        config.domain = self.mesh.domain;
        config.min_width_limits = self.mesh.min_width_limits;
        config.stretching = self.mesh.stretching;
        config.lambda_factor = self.mesh.lambda_factor;
        config.lambda_from_center = self.mesh.lambda_from_center;
        config.max_buffer_cells = self.mesh.max_buffer_cells;
        config.solver = self.solver.options();
        config.interpolation = self.interpolation;
        config
    }
}

/// Transmitter section, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum SourceConfig {
    /// Finite electric dipole.
    ElectricDipole {
        /// Centre `[x, y, z]` (m).
        center: [Scalar; 3],
        /// Azimuth (degrees).
        #[serde(default)]
        azimuth: Scalar,
        /// Elevation (degrees).
        #[serde(default)]
        elevation: Scalar,
        /// Length (m).
        length: Scalar,
        /// Current (A).
        #[serde(default = "unit")]
        strength: Scalar,
    },
    /// Electric wire between two points.
    ElectricBipole {
        /// `[x1, x2, y1, y2, z1, z2]` (m).
        coordinates: [Scalar; 6],
        /// Current (A).
        #[serde(default = "unit")]
        strength: Scalar,
    },
    /// Magnetic dipole, given either as bipole coordinates or as centre,
    /// angles and length.
    MagneticDipole {
        /// `[x1, x2, y1, y2, z1, z2]` (m).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        coordinates: Option<[Scalar; 6]>,
        /// Centre `[x, y, z]` (m).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        center: Option<[Scalar; 3]>,
        /// Azimuth (degrees).
        #[serde(default)]
        azimuth: Scalar,
        /// Elevation (degrees).
        #[serde(default)]
        elevation: Scalar,
        /// Length (m), equal to the loop area.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        length: Option<Scalar>,
        /// Current (A).
        #[serde(default = "unit")]
        strength: Scalar,
    },
}

const fn unit() -> Scalar {
    1.0
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::MagneticDipole {
            coordinates: Some([-0.5, 0.5, -0.3, 0.3, -300.5, -299.5]),
            center: None,
            azimuth: 0.0,
            elevation: 0.0,
            length: None,
            strength: std::f64::consts::PI,
        }
    }
}

impl SourceConfig {
    /// Builds the source.
    pub fn to_source(&self) -> Result<Source, ConfigError> {
        let source = match *self {
            Self::ElectricDipole {
                center,
                azimuth,
                elevation,
                length,
                strength,
            } => Source::ElectricDipole {
                center: R3::from(center),
                azimuth,
                elevation,
                length,
                strength,
            },
            Self::ElectricBipole { coordinates, strength } => {
                Source::electric_from_bipole(coordinates, strength)
            }
            Self::MagneticDipole {
                coordinates: Some(coordinates),
                strength,
                ..
            } => Source::magnetic_from_bipole(coordinates, strength),
            Self::MagneticDipole {
                coordinates: None,
                center: Some(center),
                azimuth,
                elevation,
                length: Some(length),
                strength,
            } => Source::MagneticDipole {
                center: R3::from(center),
                azimuth,
                elevation,
                length,
                strength,
            },
            Self::MagneticDipole { .. } => {
                return Err(ConfigError::Invalid(
                    "magnetic_dipole needs either `coordinates` or `center` and `length`".into(),
                ))
            }
        };
        Ok(source)
    }
}

/// Medium section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediumConfig {
    /// Horizontal background resistivity (Ω·m).
    pub resistivity: Scalar,
    /// Background anisotropy √(ρv/ρh).
    pub anisotropy: Scalar,
    /// Box anomalies painted over the background.
    pub anomalies: Vec<Anomaly>,
}

impl Default for MediumConfig {
    fn default() -> Self {
        Self {
            resistivity: 1.0,
            anisotropy: std::f64::consts::SQRT_2,
            anomalies: Vec::new(),
        }
    }
}

impl MediumConfig {
    /// Builds the medium.
    #[must_use]
    pub fn to_medium(&self) -> Medium {
        self.anomalies.iter().fold(
            Medium::fullspace(VtiResistivity::new(self.resistivity, self.anisotropy)),
            |medium, anomaly| medium.with_anomaly(*anomaly),
        )
    }
}

/// Coordinates along one receiver axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisSpec {
    /// `count` evenly spaced values from `start` to `stop` inclusive.
    Range {
        /// First value.
        start: Scalar,
        /// Last value.
        stop: Scalar,
        /// Number of values.
        count: usize,
    },
    /// Explicit values.
    Values(Vec<Scalar>),
}

impl AxisSpec {
    /// Expands the axis into explicit coordinates.
    #[must_use]
    pub fn values(&self) -> Vec<Scalar> {
        match self {
            Self::Range { start, stop, count } => linspace(*start, *stop, *count),
            Self::Values(values) => values.clone(),
        }
    }
}

/// Receiver section; missing axes follow the mesh preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReceiverConfig {
    /// Inline coordinates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<AxisSpec>,
    /// Crossline coordinates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<AxisSpec>,
    /// Depth (m, positive up).
    pub z: Scalar,
    /// Azimuth (degrees).
    pub azimuth: Scalar,
    /// Elevation (degrees).
    pub elevation: Scalar,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            x: None,
            y: None,
            z: -400.0,
            azimuth: 25.0,
            elevation: 10.0,
        }
    }
}

impl ReceiverConfig {
    /// Builds the receiver grid.
    pub fn to_grid(&self, preset: MeshPreset) -> Result<ReceiverGrid, ConfigError> {
        let axis = |spec: &Option<AxisSpec>| spec.as_ref().map_or_else(|| preset.receiver_axis(), AxisSpec::values);
        let grid = ReceiverGrid::new(axis(&self.x), axis(&self.y), self.z, self.azimuth, self.elevation);
        if grid.is_empty() {
            return Err(ConfigError::Invalid("receiver axes must not be empty".into()));
        }
        Ok(grid)
    }
}

/// Mesh section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MeshConfig {
    /// Resolution preset.
    pub preset: MeshPreset,
    /// Survey domain `[[xmin, xmax], [ymin, ymax], [zmin, zmax]]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<[[Scalar; 2]; 3]>,
    /// Override of the preset's minimum width limits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_width_limits: Option<[Scalar; 2]>,
    /// Override of the preset's stretching range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stretching: Option<[Scalar; 2]>,
    /// Boundary distance in diffusive wavelengths.
    pub lambda_factor: Scalar,
    /// Measure the boundary distance from the source centre.
    pub lambda_from_center: bool,
    /// Maximum stretched cells on each side.
    pub max_buffer_cells: usize,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            preset: MeshPreset::Coarse,
            domain: Some([[-2500.0, 2500.0], [-2500.0, 2500.0], [-2900.0, 2100.0]]),
            min_width_limits: None,
            stretching: None,
            lambda_factor: 0.8,
            lambda_from_center: true,
            max_buffer_cells: 64,
        }
    }
}

impl MeshConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(domain) = self.domain {
            if domain.iter().any(|d| !(d[1] > d[0])) {
                return Err(ConfigError::Invalid(format!("mesh domain must be increasing, got {domain:?}")));
            }
        }
        if let Some([lo, hi]) = self.min_width_limits {
            if !(lo > 0.0 && hi >= lo) {
                return Err(ConfigError::Invalid(format!(
                    "min_width_limits must be positive and ordered, got [{lo}, {hi}]"
                )));
            }
        }
        if let Some([lo, hi]) = self.stretching {
            if !(lo >= 1.0 && hi >= lo) {
                return Err(ConfigError::Invalid(format!(
                    "stretching must satisfy 1 <= min <= max, got [{lo}, {hi}]"
                )));
            }
        }
        if !(self.lambda_factor >= 0.0) || self.max_buffer_cells == 0 {
            return Err(ConfigError::Invalid(
                "lambda_factor must be non-negative and max_buffer_cells positive".into(),
            ));
        }
        Ok(())
    }
}

/// Solver section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    /// Krylov method.
    pub method: SolverMethod,
    /// Iteration limit.
    pub max_iterations: usize,
    /// Residual reduction relative to the right-hand side.
    pub relative_tolerance: Scalar,
    /// Absolute residual threshold.
    pub absolute_tolerance: Scalar,
    /// GMRES restart length.
    pub restart: usize,
    /// Jacobi preconditioning.
    pub jacobi: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        let options = SolverOptions::default();
        Self {
            method: options.method,
            max_iterations: options.criteria.max_iterations,
            relative_tolerance: options.criteria.relative_tolerance,
            absolute_tolerance: options.criteria.absolute_tolerance,
            restart: options.restart,
            jacobi: options.jacobi,
        }
    }
}

impl SolverConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 || self.restart == 0 {
            return Err(ConfigError::Invalid(
                "max_iterations and restart must be positive".into(),
            ));
        }
        if !(self.relative_tolerance > 0.0) || !(self.absolute_tolerance >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "tolerances must be positive, got relative {} and absolute {}",
                self.relative_tolerance, self.absolute_tolerance
            )));
        }
        Ok(())
    }

    /// Solver options for the numerical model.
    #[must_use]
    pub const fn options(&self) -> SolverOptions {
        SolverOptions {
            method: self.method,
            criteria: ConvergenceCriteria {
                max_iterations: self.max_iterations,
                relative_tolerance: self.relative_tolerance,
                absolute_tolerance: self.absolute_tolerance,
            },
            restart: self.restart,
            jacobi: self.jacobi,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn empty_file_is_the_gallery_scenario() {
        let config = ScenarioConfig::from_toml("").unwrap();
        let scenario = config.scenario().unwrap();
        assert_relative_eq!(scenario.frequency, 0.77);
        assert!(scenario.source.is_magnetic());
        assert_relative_eq!(scenario.source.strength(), std::f64::consts::PI);
        assert_eq!(scenario.source.center(), R3::new(0.0, 0.0, -300.0));
        assert_relative_eq!(scenario.medium.background.vertical(), 2.0, epsilon = 1.0e-12);
        assert_eq!(scenario.receivers.shape(), (256, 256));
        assert_relative_eq!(scenario.receivers.z, -400.0);
        assert_eq!(config.numerical().preset, MeshPreset::Coarse);
    }

    #[test]
    fn sections_override_defaults() {
        let config = ScenarioConfig::from_toml(
            r#"
            frequency = 2.0
            interpolation = "linear"

            [source]
            type = "electric_dipole"
            center = [0.0, 0.0, -100.0]
            azimuth = 30.0
            length = 10.0

            [medium]
            resistivity = 3.0

            [[medium.anomalies]]
            min = [-10.0, -10.0, -300.0]
            max = [10.0, 10.0, -200.0]
            resistivity = { horizontal = 100.0 }

            [receivers]
            x = { start = -100.0, stop = 100.0, count = 5 }
            y = [0.0, 50.0]
            z = -150.0

            [mesh]
            preset = "fine"
            stretching = [1.1, 1.2]

            [solver]
            method = "gmres"
            restart = 30
            "#,
        )
        .unwrap();
        let scenario = config.scenario().unwrap();
        assert_eq!(scenario.receivers.shape(), (2, 5));
        assert_eq!(scenario.medium.anomalies.len(), 1);
        assert_relative_eq!(scenario.medium.anomalies[0].resistivity.anisotropy, 1.0);
        assert!(matches!(scenario.source, Source::ElectricDipole { strength, .. } if strength == 1.0));

        let numerical = config.numerical();
        assert_eq!(numerical.preset, MeshPreset::Fine);
        assert_eq!(numerical.stretching, Some([1.1, 1.2]));
        assert_eq!(numerical.interpolation, Interpolation::Linear);
        assert_eq!(numerical.solver.method, SolverMethod::Gmres);
        assert_eq!(numerical.solver.restart, 30);
    }

    #[test]
    fn magnetic_dipole_needs_a_geometry() {
        let err = ScenarioConfig::from_toml(
            r#"
            [source]
            type = "magnetic_dipole"
            center = [0.0, 0.0, 0.0]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn invalid_values_are_rejected() {
        for toml in [
            "frequency = -1.0",
            "[medium]\nresistivity = 0.0",
            "[mesh]\nstretching = [0.9, 1.0]",
            "[solver]\nrelative_tolerance = 0.0",
            "[receivers]\nx = []",
        ] {
            let err = ScenarioConfig::from_toml(toml).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{toml}: {err}");
        }
    }

    #[test]
    fn unknown_fields_are_parse_errors() {
        let err = ScenarioConfig::from_toml("[mesh]\ncells = 12").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn misspelled_source_fields_are_parse_errors() {
        let text = "[source]\ntype = \"electric_dipole\"\ncenter = [0.0, 0.0, -300.0]\nlength = 1.0\nazimut = 30.0";
        let err = ScenarioConfig::from_toml(text).unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
        let fixed = text.replace("azimut", "azimuth");
        let config = ScenarioConfig::from_toml(&fixed).unwrap();
        assert!(matches!(config.source, SourceConfig::ElectricDipole { azimuth, .. } if azimuth == 30.0));
    }

    #[test]
    fn defaults_survive_serialization() {
        let text = toml::to_string(&ScenarioConfig::default()).unwrap();
        let parsed = ScenarioConfig::from_toml(&text).unwrap();
        assert_eq!(parsed, ScenarioConfig::default());
    }
}
