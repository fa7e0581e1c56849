use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use em_diffusion::fields::{FieldKind, FullspaceGreen, WireIntegrator};
use em_diffusion::materials::{Medium, VtiResistivity};
use em_diffusion::math::R3;
use em_diffusion::mesh::TensorMesh;
use em_diffusion::solver::{assemble_system, source_vector, SolverOptions};
use em_diffusion::survey::Source;

fn bench_reference(c: &mut Criterion) {
    let mut group = c.benchmark_group("fullspace_reference");
    let green = FullspaceGreen::new(0.77, &VtiResistivity::new(1.0, std::f64::consts::SQRT_2));
    let integrator = WireIntegrator::default();
    let segments =
        Source::magnetic_from_bipole([-0.5, 0.5, -0.3, 0.3, -300.5, -299.5], std::f64::consts::PI)
            .segments();
    let receivers: Vec<R3> = (0..1000)
        .map(|i| R3::new(-2500.0 + 5.0 * i as f64, 250.0, -400.0))
        .collect();

    for kind in [FieldKind::Electric, FieldKind::Magnetic] {
        group.bench_function(BenchmarkId::new(kind.label(), receivers.len()), |b| {
            b.iter(|| {
                receivers
                    .iter()
                    .map(|r| integrator.field(&green, kind, &segments, r))
                    .fold(0.0, |acc, f| acc + f.norm())
            })
        });
    }
    group.finish();
}

fn bench_numerical(c: &mut Criterion) {
    let mut group = c.benchmark_group("finite_volume");
    group.sample_size(10);
    let medium = Medium::fullspace(VtiResistivity::new(1.0, std::f64::consts::SQRT_2));
    let segments = Source::electric_from_bipole([-1.0, 1.0, 0.0, 0.0, 0.0, 0.0], 1.0).segments();

    for cells in [16, 24] {
        let half = 50.0 * cells as f64 / 2.0;
        let mesh = TensorMesh::uniform(R3::new(-half, -half, -half), 50.0, [cells; 3])
            .expect("uniform mesh");
        let model = medium.paint(&mesh);

        group.bench_function(BenchmarkId::new("assemble", cells), |b| {
            b.iter(|| assemble_system(&mesh, &model, 1.0).expect("assembly"))
        });

        let matrix = assemble_system(&mesh, &model, 1.0).expect("assembly");
        let rhs = source_vector(&mesh, &segments, 1.0);
        group.bench_function(BenchmarkId::new("bicgstab", cells), |b| {
            b.iter_batched(
                || SolverOptions::default().build(),
                |mut solver| {
                    solver.symbolic(&matrix).expect("symbolic");
                    solver.numeric(&matrix).expect("numeric");
                    solver.solve(&rhs).expect("solve")
                },
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_reference, bench_numerical);
criterion_main!(benches);
