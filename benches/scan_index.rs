use criterion::{black_box, criterion_group, criterion_main, Criterion};

use mzraw::io::{MemoryRawFile, MemoryScan, ScanIndex, ScanSubset};
use mzraw::prelude::*;
use mzraw::spectrum::{MSOrder, Reaction, ScanEvent};

/// A synthetic run of one MS1 scan followed by ten MS2 scans, repeated
fn make_file(n_cycles: usize) -> MemoryRawFile {
    let mut file = MemoryRawFile::new(1);
    let mut time = 0.0;
    for cycle in 0..n_cycles {
        file.push_scan(MemoryScan::new(
            time,
            ScanEvent {
                ms_order: MSOrder::MS1,
                ..Default::default()
            },
        ));
        time += 0.001;
        for i in 0..10 {
            let precursor = 400.0 + ((cycle * 10 + i) % 500) as f64;
            file.push_scan(MemoryScan::new(
                time,
                ScanEvent {
                    ms_order: MSOrder::MS2,
                    reactions: vec![Reaction::new(precursor, 2.0, 30.0)],
                    ..Default::default()
                },
            ));
            time += 0.001;
        }
    }
    file
}

fn index_build(c: &mut Criterion) {
    let file = make_file(2_000);
    let summary = file.summary().unwrap();
    c.bench_function("scan_index_build", |b| {
        b.iter(|| ScanIndex::build(black_box(&file), black_box(&summary)).unwrap())
    });
    #[cfg(feature = "parallelism")]
    c.bench_function("scan_index_build_parallel", |b| {
        b.iter(|| ScanIndex::build_parallel(black_box(&file), black_box(&summary)).unwrap())
    });
}

fn nearest_queries(c: &mut Criterion) {
    let file = make_file(2_000);
    let summary = file.summary().unwrap();
    let index = ScanIndex::build(&file, &summary).unwrap();
    let queries: Vec<f64> = (0..100)
        .map(|i| summary.total_time * i as f64 / 100.0)
        .collect();
    c.bench_function("nearest_by_time_ms2", |b| {
        b.iter(|| {
            for q in queries.iter() {
                index.nearest_by_time(black_box(*q), ScanSubset::MS2).unwrap();
            }
        })
    });
    c.bench_function("nearest_ms2_by_time_and_mass", |b| {
        b.iter(|| {
            for q in queries.iter() {
                index
                    .nearest_ms2_by_time_and_mass(black_box(*q), 450.0, 0.01)
                    .unwrap();
            }
        })
    });
}

criterion_group!(benches, index_build, nearest_queries);
criterion_main!(benches);
