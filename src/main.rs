use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use em_diffusion::comparison::Region;
use em_diffusion::config::ScenarioConfig;
use em_diffusion::io::export_comparison;
use em_diffusion::report::Report;
use em_diffusion::simulation::{Comparator, MeshPreset};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "em-compare",
    version,
    about = "Compare a 3D finite-volume EM solution with the VTI fullspace reference"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the comparison described by a TOML scenario file
    Run {
        /// Path to the scenario file
        config: PathBuf,
        /// Use the fine mesh preset (and its receiver spacing when not set)
        #[arg(long)]
        fine: bool,
        /// Directory for CSV (and VTK) output
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,
        /// Also export the mesh model as VTK
        #[arg(long)]
        vtk: bool,
        /// Half-width (m) of the central region used for the error summary
        #[arg(long, default_value_t = 1000.0)]
        region: f64,
    },
    /// Print the reproducibility report
    Report,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Run {
            config,
            fine,
            output_dir,
            vtk,
            region,
        } => run(config, fine, output_dir, vtk, region),
        Command::Report => {
            println!("{}", Report::collect());
            Ok(())
        }
    }
}

fn run(path: PathBuf, fine: bool, output_dir: PathBuf, vtk: bool, half_width: f64) -> Result<()> {
    let mut config = ScenarioConfig::from_file(&path)
        .with_context(|| format!("loading scenario {}", path.display()))?;
    if fine {
        config.mesh.preset = MeshPreset::Fine;
    }
    let scenario = config.scenario().context("building scenario")?;
    info!(source = %scenario.source, receivers = scenario.receivers.len(), "scenario loaded");

    let output = Comparator::new(config.numerical())
        .run(&scenario)
        .context("running comparison")?;

    let center = scenario.source.center();
    let region = Region::square([center.x, center.y], half_width);
    for comparison in [&output.electric, &output.magnetic] {
        let (real, imag) = comparison.error.region_stats(&scenario.receivers, &region);
        println!("{} real: {}", comparison.kind.label(), real);
        println!("{} imag: {}", comparison.kind.label(), imag);
    }

    let written = export_comparison(&output_dir, &scenario, &output, vtk)
        .with_context(|| format!("writing results to {}", output_dir.display()))?;
    for file in written {
        println!("wrote {}", file.display());
    }
    println!("{}", Report::collect());
    Ok(())
}
