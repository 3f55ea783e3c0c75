use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::{Duration, TimeZone, Utc};
use market_catalog::{Aggregator, Catalog, ImportBatch, UnitImport, UnitStore};
use market_core::{Timestamp, UnitId};

fn t(minutes: i64) -> Timestamp {
    Utc.with_ymd_and_hms(2022, 2, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
}

/// `fanout` top categories, each holding `fanout` sub-categories with
/// `offers` offers apiece.
fn build_catalog(fanout: usize, offers: usize) -> Catalog {
    let mut items = vec![UnitImport::category("root", "root", None)];
    for c in 0..fanout {
        let cat = format!("c{c}");
        items.push(UnitImport::category(cat.as_str(), cat.as_str(), Some("root")));
        for s in 0..fanout {
            let sub = format!("c{c}-s{s}");
            items.push(UnitImport::category(sub.as_str(), sub.as_str(), Some(cat.as_str())));
            for o in 0..offers {
                let offer = format!("c{c}-s{s}-o{o}");
                items.push(UnitImport::offer(offer.as_str(), "offer", Some(sub.as_str()), (o * 10) as i64));
            }
        }
    }
    let mut catalog = Catalog::in_memory();
    catalog.import_batch(ImportBatch::new(items, t(0))).unwrap();
    catalog
}

fn bench_incremental_vs_full_recompute(c: &mut Criterion) {
    let mut group = c.benchmark_group("price_update");

    for fanout in [8usize, 16, 32] {
        group.bench_with_input(BenchmarkId::new("incremental", fanout), &fanout, |b, &fanout| {
            let mut catalog = build_catalog(fanout, 10);
            let mut minute = 1;
            b.iter(|| {
                minute += 1;
                let batch = ImportBatch::new(
                    vec![UnitImport::offer("c0-s0-o0", "offer", Some("c0-s0"), minute)],
                    t(minute),
                );
                black_box(catalog.import_batch(batch).unwrap());
            });
        });

        group.bench_with_input(BenchmarkId::new("full_rebuild", fanout), &fanout, |b, &fanout| {
            let catalog = build_catalog(fanout, 10);
            let mut store = catalog.store().clone();
            b.iter(|| {
                let mut aggregator = Aggregator::new();
                aggregator.mark_all(&store).unwrap();
                black_box(aggregator.recompute(&mut store, Some(t(1))).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_batch_import_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_import");

    for size in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let mut items = vec![UnitImport::category("root", "root", None)];
                for i in 0..size {
                    items.push(UnitImport::offer(format!("o{i}").as_str(), "offer", Some("root"), i as i64));
                }
                let mut catalog = Catalog::in_memory();
                black_box(catalog.import_batch(ImportBatch::new(items, t(0))).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_reads(c: &mut Criterion) {
    let catalog = build_catalog(16, 10);
    let root = UnitId::new("root");

    c.bench_function("subtree_root", |b| {
        b.iter(|| black_box(catalog.get_subtree(&root).unwrap()));
    });

    c.bench_function("statistics_all", |b| {
        b.iter(|| black_box(catalog.get_statistics(None, t(0), t(1)).unwrap()));
    });

    assert!(catalog.store().len() > 2_000);
}

criterion_group!(
    benches,
    bench_incremental_vs_full_recompute,
    bench_batch_import_throughput,
    bench_reads
);
criterion_main!(benches);
