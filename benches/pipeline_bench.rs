//! Benchmarks for event aggregation, search and graph rendering
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use nutshell::events::{build_index, SearchIndex};
use nutshell::graph::{GraphRenderer, TimeWindow};
use nutshell::store::{ClinicalRecord, GlucoseUnits, RecordKind};

const MIN: i64 = 60_000;

/// A day-like mix: glucose every 5 minutes, a meal with wizard and bolus
/// every 3 hours, a basal segment every hour
fn create_records(count: usize) -> Vec<ClinicalRecord> {
    let mut records = Vec::with_capacity(count);
    let mut i = 0usize;
    while records.len() < count {
        let ts = i as i64 * 5 * MIN;
        records.push(ClinicalRecord::new(
            format!("g{}", i),
            "bench",
            ts,
            RecordKind::Glucose {
                value: Some(90.0 + (i % 40) as f64 * 3.0),
                units: GlucoseUnits::MgDl,
                source: None,
            },
        ));

        if i % 36 == 0 {
            records.push(ClinicalRecord::new(
                format!("m{}", i),
                "bench",
                ts,
                RecordKind::Meal {
                    title: Some(format!("Meal {}", i % 7)),
                    notes: Some("bench notes".to_string()),
                    location: Some(["Home", "Work", "Cafe"][i % 3].to_string()),
                    carb_input: Some(30.0 + (i % 5) as f64 * 10.0),
                    photo_urls: vec![],
                },
            ));
            records.push(ClinicalRecord::new(
                format!("w{}", i),
                "bench",
                ts + MIN,
                RecordKind::Wizard {
                    carb_input: Some(45.0),
                    bolus_id: Some(format!("b{}", i)),
                    recommended_net: Some(4.5),
                    notes: None,
                },
            ));
            records.push(ClinicalRecord::new(
                format!("b{}", i),
                "bench",
                ts + 2 * MIN,
                RecordKind::Bolus {
                    normal: Some(4.5),
                    extended: None,
                    duration_ms: None,
                },
            ));
        }

        if i % 12 == 0 {
            records.push(ClinicalRecord::new(
                format!("r{}", i),
                "bench",
                ts,
                RecordKind::Basal {
                    rate: Some(0.8),
                    duration_ms: Some(60 * MIN),
                    delivery_type: Some("scheduled".to_string()),
                },
            ));
        }
        i += 1;
    }
    records.truncate(count);
    records
}

fn bench_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation");

    for size in [1_000, 10_000] {
        let records = create_records(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("build_index_{}", size), |b| {
            b.iter(|| build_index(black_box(&records)))
        });
    }

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    let index = build_index(&create_records(10_000));

    group.bench_function("typing_narrowing", |b| {
        b.iter(|| {
            let mut search = SearchIndex::new(index.clone());
            for query in ["m", "me", "mea", "meal", "meal 3"] {
                black_box(search.apply_filter(query).len());
            }
        })
    });

    group.bench_function("direct_filter", |b| {
        b.iter(|| {
            let mut search = SearchIndex::new(index.clone());
            black_box(search.apply_filter("meal 3").len())
        })
    });

    group.finish();
}

fn bench_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph");
    let records = create_records(2_000);
    let renderer = GraphRenderer::default();

    for hours in [6.0, 24.0] {
        let window = TimeWindow::new(12 * 60 * MIN, hours * 3600.0, 800.0);
        group.bench_function(format!("render_{}h", hours), |b| {
            b.iter(|| renderer.render(black_box(&records), window, 400.0))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_aggregation, bench_search, bench_graph);
criterion_main!(benches);
