//! I/O helpers for exporting comparison data and mesh models.

pub mod csv;
pub mod vtk;

pub use csv::write_comparison_csv;
pub use vtk::{write_rectilinear_grid, write_vtk_header};

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::errors::EmDiffusionError;
use crate::simulation::{ComparatorOutput, Scenario};

/// Writes `e_comparison.csv`, `h_comparison.csv` and optionally `model.vtk`
/// into `dir`, returning the written paths.
pub fn export_comparison(
    dir: &Path,
    scenario: &Scenario,
    output: &ComparatorOutput,
    vtk: bool,
) -> Result<Vec<PathBuf>, EmDiffusionError> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for comparison in [&output.electric, &output.magnetic] {
        let path = dir.join(format!("{}_comparison.csv", comparison.kind.label().to_lowercase()));
        let mut writer = BufWriter::new(File::create(&path)?);
        write_comparison_csv(&mut writer, &scenario.receivers, comparison)?;
        writer.flush()?;
        written.push(path);
    }
    if vtk {
        let path = dir.join("model.vtk");
        let title = format!("em-diffusion model at {} Hz", scenario.frequency);
        let mut writer = BufWriter::new(File::create(&path)?);
        write_rectilinear_grid(&mut writer, &output.solution.mesh, &output.solution.model, &title)?;
        writer.flush()?;
        written.push(path);
    }
    info!(files = written.len(), dir = %dir.display(), "results exported");
    Ok(written)
}
