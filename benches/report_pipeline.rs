//! Report pipeline benchmarks
//!
//! Measures baseline comparison and CSV rendering for result trees of
//! increasing size (2 buildsets × N sketches × 4 boards).
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use massbuild::dataset::Dataset;
use massbuild::delta::Comparison;
use massbuild::record::{BuildRecord, BuildStatus, MarkerRecord, Measurement};
use massbuild::report::{ReportFormat, ReportRenderer};

const BOARDS: [&str; 4] = [
    "arduino:avr:uno",
    "arduino:avr:mega",
    "arduino:avr:leonardo",
    "arduino:sam:due",
];

fn synthetic_dataset(sketches: usize) -> Dataset {
    let mut records = Vec::with_capacity(sketches * BOARDS.len() * 2);
    for buildset in ["base", "next"] {
        for i in 0..sketches {
            for board in BOARDS {
                let status = match (i + board.len()) % 7 {
                    0 => BuildStatus::FailedToCompile,
                    1 => BuildStatus::FailedToGetSize,
                    _ => BuildStatus::Ok(Measurement {
                        program_size: 1000 + (i as u64 * 13) % 500,
                        data_size: 20 + (i as u64 % 9),
                        content_hash: format!("{:x}", (i * 31 + buildset.len()) % 5),
                    }),
                };
                records.push(BuildRecord::new(
                    MarkerRecord {
                        exit_code: if status == BuildStatus::FailedToCompile { 1 } else { 0 },
                        sketch_dir: format!("libraries/Lib{}/examples/Sketch{}", i % 10, i),
                        sketch_name: format!("Sketch{}", i),
                        board: board.to_string(),
                        buildset: buildset.to_string(),
                    },
                    status,
                ));
            }
        }
    }
    records.into_iter().collect()
}

fn bench_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare");
    for sketches in [10, 100, 1000] {
        let dataset = synthetic_dataset(sketches);
        group.throughput(Throughput::Elements(dataset.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(sketches), &dataset, |b, dataset| {
            b.iter(|| Comparison::compute(black_box(dataset), "base"));
        });
    }
    group.finish();
}

fn bench_render_csv(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_csv");
    for sketches in [10, 100, 1000] {
        let dataset = synthetic_dataset(sketches);
        let comparison = Comparison::compute(&dataset, "base");
        group.throughput(Throughput::Elements(dataset.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(sketches), &dataset, |b, dataset| {
            b.iter(|| {
                ReportRenderer::new(black_box(dataset), Some(&comparison), ReportFormat::Csv)
                    .render_to_string()
                    .unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compare, bench_render_csv);
criterion_main!(benches);
