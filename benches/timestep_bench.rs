//! Benchmark of one full HEVI step on the thermal bubble configuration.

use criterion::{criterion_group, criterion_main, Criterion};
use hevi_rs::{
    CartesianGrid, EquationSet, GridDescriptor, HeviIntegrator, HorizontalDynamics,
    PhysicalConstants, ThermalBubbleTest, TimeScheme, TimestepOptions, UniformStretch,
    VerticalDynamics, ACTIVE_SLOT,
};

fn build_grid(scheme: TimeScheme) -> CartesianGrid {
    let test = ThermalBubbleTest::default();
    let desc = GridDescriptor::periodic_box(test.domain(), 6, 1, 12, 4, 1);
    let mut grid = CartesianGrid::new(
        desc,
        PhysicalConstants::earth(),
        EquationSet::new(3, 0).unwrap(),
        Box::new(UniformStretch),
        HeviIntegrator::required_slots(scheme),
    )
    .unwrap();
    grid.evaluate_test_case(&test, 0.0, ACTIVE_SLOT).unwrap();
    grid
}

fn bench_hevi_step(c: &mut Criterion) {
    for (name, scheme) in [("ark2", TimeScheme::Ark2), ("strang", TimeScheme::Strang)] {
        let mut grid = build_grid(scheme);
        let integrator = HeviIntegrator::new(
            TimestepOptions::new(scheme, 0.002),
            HorizontalDynamics::default(),
            VerticalDynamics::default(),
        );

        c.bench_function(&format!("hevi_step_{name}"), |b| {
            b.iter(|| integrator.step(&mut grid, 0.0, 0.002).unwrap())
        });
    }
}

criterion_group!(benches, bench_hevi_step);
criterion_main!(benches);
