//! Shared error types used across submodules.

use thiserror::Error;

use crate::config::ConfigError;
use crate::simulation::SimulationError;

/// Top-level error type for the crate.
#[derive(Debug, Error)]
pub enum EmDiffusionError {
    /// Wraps simulation-related errors.
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    /// Wraps scenario file errors.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Raised when exporting results fails.
    #[error("export failed: {0}")]
    Io(#[from] std::io::Error),
}
