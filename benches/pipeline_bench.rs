use std::fmt::Write as _;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use molscope::io::parse;
use molscope::options::{ParseOptions, SimulationOptions, ViewerOptions};
use molscope::simulation::SimulationState;
use molscope::{HeadlessContext, Session};

/// A helical chain of carbons with a hydrogen on each, in XYZ form.
fn helix_xyz(carbons: usize) -> String {
    let mut out = format!("{}\nhelix\n", carbons * 2);
    for i in 0..carbons {
        let t = i as f32 * 0.6;
        let (x, y, z) = (1.6 * t.cos(), 1.6 * t.sin(), i as f32 * 0.5);
        let _ = writeln!(out, "C {x:.4} {y:.4} {z:.4}");
        let _ = writeln!(out, "H {:.4} {:.4} {z:.4}", x * 1.6, y * 1.6);
    }
    out
}

fn parse_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_xyz");
    for count in [50, 500, 5000] {
        let input = helix_xyz(count);
        let options = ParseOptions::default();
        let _ = group.bench_with_input(
            BenchmarkId::from_parameter(count * 2),
            &input,
            |b, input| {
                b.iter(|| parse(black_box(input.as_bytes()), "xyz", &options));
            },
        );
    }
    group.finish();
}

fn advance_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation_advance");
    for count in [50, 500, 5000] {
        let input = helix_xyz(count);
        let Ok(structure) =
            parse(input.as_bytes(), "xyz", &ParseOptions::default())
        else {
            continue;
        };
        let options = SimulationOptions {
            spin_rate: 0.3,
            ..SimulationOptions::default()
        };
        let mut state = SimulationState::initialize(&structure, &options);
        let _ = group.bench_function(BenchmarkId::from_parameter(count * 2), |b| {
            b.iter(|| state.advance(&structure, black_box(1.0 / 60.0)));
        });
    }
    group.finish();
}

fn headless_frame_benchmark(c: &mut Criterion) {
    let input = helix_xyz(500);
    let Ok(mut session) = Session::new(
        "bench",
        HeadlessContext::new(800, 600),
        ViewerOptions::default(),
    ) else {
        return;
    };
    if session.add_molecule(input.as_bytes(), "xyz").is_err() {
        return;
    }
    let _ = c.bench_function("headless_frame_1000_atoms", |b| {
        b.iter(|| {
            let _ = session.update_time(1.0 / 60.0);
            session.render()
        });
    });
}

criterion_group!(
    benches,
    parse_benchmark,
    advance_benchmark,
    headless_frame_benchmark
);
criterion_main!(benches);
