#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![warn(clippy::all, clippy::nursery, missing_docs)]
#![doc = include_str!("../README.md")]

/// Fundamental physical constants and diffusion length scales.
pub mod constants;
/// Shared mathematical utilities (vectors, orientations, quadrature).
pub mod math;
/// Resistivity models: VTI background and 3D anomalies.
pub mod materials;
/// Stretched tensor meshes and frequency-driven mesh construction.
pub mod mesh;
/// Sources and receiver grids.
pub mod survey;
/// Field representations, analytical Green's tensors and interpolation.
pub mod fields;
/// Sparse system assembly and Krylov solvers.
pub mod solver;
/// Forward solvers and the forward-model comparator.
pub mod simulation;
/// Relative-error metrics between two receiver datasets.
pub mod comparison;
/// TOML scenario configuration.
pub mod config;
/// CSV and VTK export.
pub mod io;
/// Reproducibility report.
pub mod report;
/// Error types shared between modules.
pub mod errors;

/// Common exports for downstream crates.
pub mod prelude;
