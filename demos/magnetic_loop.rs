use em_diffusion::prelude::*;

fn main() -> Result<(), EmDiffusionError> {
    // Gallery scenario with a sparse receiver line and a cheaper mesh.
    let mut config = ScenarioConfig::from_toml(
        r#"
        [receivers]
        x = { start = -1000.0, stop = 1000.0, count = 21 }
        y = [0.0]

        [mesh]
        domain = [[-1000.0, 1000.0], [-200.0, 200.0], [-500.0, -200.0]]
        min_width_limits = [100.0, 100.0]
        stretching = [1.1, 1.3]
        "#,
    )?;
    config.solver.relative_tolerance = 1.0e-6;

    let scenario = config.scenario()?;
    println!("source: {}", scenario.source);
    println!("frequency: {} Hz", scenario.frequency);

    let output = Comparator::new(config.numerical()).run(&scenario)?;
    println!(
        "mesh: {:?} cells, solver iterations: {:?}",
        output.solution.mesh.shape_cells(),
        output.solution.stats.iterations
    );

    for comparison in [&output.electric, &output.magnetic] {
        println!(
            "\n{} ({}): x, |Re ref|, |Re num|, err re (%), err im (%)",
            comparison.kind.label(),
            comparison.kind.unit()
        );
        for (col, x) in scenario.receivers.x.iter().enumerate() {
            let reference = comparison.reference.get(0, col);
            let numerical = comparison.numerical.get(0, col);
            println!(
                "{:>8.1}, {:.4e}, {:.4e}, {:>8.3}, {:>8.3}",
                x,
                reference.re.abs(),
                numerical.re.abs(),
                comparison.error.real[(0, col)],
                comparison.error.imag[(0, col)]
            );
        }
    }
    Ok(())
}
