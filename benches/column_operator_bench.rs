//! Benchmarks for column operator construction and application.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hevi_rs::column::{diff_flux_correction, diff_interface, interp, ColumnBasis};
use hevi_rs::grid::VerticalCoordinate;

fn bench_operator_construction(c: &mut Criterion) {
    let vc = VerticalCoordinate::uniform(30, 4);

    c.bench_function("interp_n2e_order4_30elem", |b| {
        b.iter(|| {
            interp(
                ColumnBasis::Levels,
                4,
                black_box(&vc.reta_node),
                &vc.reta_edge,
                &vc.reta_edge,
                false,
            )
            .unwrap()
        })
    });

    c.bench_function("diff_flux_correction_order4_30elem", |b| {
        b.iter(|| {
            diff_flux_correction(
                4,
                black_box(&vc.reta_node),
                &vc.reta_edge,
                &vc.reta_node,
                false,
            )
            .unwrap()
        })
    });
}

fn bench_operator_apply(c: &mut Criterion) {
    let vc = VerticalCoordinate::uniform(30, 4);
    let op = diff_interface(
        ColumnBasis::Levels,
        4,
        &vc.reta_node,
        &vc.reta_edge,
        &vc.reta_node,
        false,
    )
    .unwrap();
    let input: Vec<f64> = vc.reta_node.iter().map(|&x| (3.0 * x).sin()).collect();
    let mut output = vec![0.0; vc.n_levels()];

    c.bench_function("diff_apply_120_levels", |b| {
        b.iter(|| op.apply(black_box(&input), &mut output))
    });
}

criterion_group!(benches, bench_operator_construction, bench_operator_apply);
criterion_main!(benches);
