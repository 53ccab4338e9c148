use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::{Arc, Barrier};
use std::thread;

use boimedicado_auth::{Actor, Role};
use boimedicado_core::UnitId;
use boimedicado_infra::{InMemoryCatalog, InMemoryLedgerStore, InMemoryStockStore, LedgerStore, TreatmentCoordinator};
use boimedicado_ledger::{CatalogSnapshot, LedgerQuery, RequestedMedication, TreatmentRequest};
use boimedicado_pharmacy::Millilitres;

type Coordinator = TreatmentCoordinator<Arc<InMemoryStockStore>, Arc<InMemoryLedgerStore>>;

const MEDICINES: [&str; 6] = ["Draxxin", "Flunixin", "Ivomec", "Terramicina", "Banamine", "Zuprevo"];

/// Enough stock that no benchmark run drains it.
const BOTTOMLESS_ML: f64 = 1.0e12;

fn setup() -> anyhow::Result<(Arc<Coordinator>, Actor)> {
    let unit = UnitId::new();
    let catalog = Arc::new(InMemoryCatalog::new());
    let snapshot = MEDICINES
        .iter()
        .fold(CatalogSnapshot::new(), |s, m| s.with_medicine(m))
        .with_disease("Pneumonia")
        .with_location("c01", "Curral 01 - Engorda");
    catalog.replace(unit, snapshot)?;

    let coordinator = TreatmentCoordinator::new(
        Arc::new(InMemoryStockStore::new()),
        Arc::new(InMemoryLedgerStore::new()),
        catalog,
    );
    let manager = Actor::new("Gerente", unit, Role::Manager);
    for name in MEDICINES {
        coordinator.create_medicine(&manager, name, Millilitres::new(BOTTOMLESS_ML)?, 1.5)?;
    }
    Ok((Arc::new(coordinator), Actor::new("Operador 01", unit, Role::Operator)))
}

fn request(lines: usize) -> TreatmentRequest {
    TreatmentRequest {
        animal_tag: "123456-7".to_string(),
        date: "2026-05-10".to_string(),
        location: "c01".to_string(),
        conditions: vec!["Pneumonia".to_string()],
        medications: MEDICINES
            .iter()
            .take(lines)
            .map(|m| RequestedMedication::new(*m, "2,5"))
            .collect(),
    }
}

fn bench_commit_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit_latency");
    group.sample_size(1000);

    for lines in [1, 3, 6] {
        group.bench_with_input(BenchmarkId::new("treatment_lines", lines), &lines, |b, &lines| {
            let (coordinator, operator) = setup().unwrap();
            let form = request(lines);
            b.iter(|| {
                coordinator.commit_treatment(&operator, black_box(&form)).unwrap();
            });
        });
    }

    // Rejected before any lock is taken.
    group.bench_function("rejected_malformed_tag", |b| {
        let (coordinator, operator) = setup().unwrap();
        let form = TreatmentRequest {
            animal_tag: "12345".to_string(),
            ..request(2)
        };
        b.iter(|| {
            black_box(coordinator.commit_treatment(&operator, black_box(&form))).unwrap_err();
        });
    });

    group.finish();
}

/// Every writer commits `per_writer` treatments after a shared start.
fn run_writers(coordinator: &Arc<Coordinator>, operator: &Actor, writers: usize, per_writer: usize, shared: bool) {
    let barrier = Arc::new(Barrier::new(writers));
    let handles: Vec<_> = (0..writers)
        .map(|w| {
            let coordinator = Arc::clone(coordinator);
            let operator = operator.clone();
            let barrier = Arc::clone(&barrier);
            let medicine = if shared { MEDICINES[0] } else { MEDICINES[w % MEDICINES.len()] };
            thread::spawn(move || {
                let form = TreatmentRequest {
                    medications: vec![RequestedMedication::new(medicine, "1")],
                    ..request(0)
                };
                barrier.wait();
                for _ in 0..per_writer {
                    coordinator.commit_treatment(&operator, &form).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

fn bench_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit_contention");
    group.sample_size(20);
    let per_writer = 50;

    for writers in [1, 2, 4, 6] {
        group.throughput(Throughput::Elements((writers * per_writer) as u64));
        group.bench_with_input(BenchmarkId::new("same_medicine", writers), &writers, |b, &writers| {
            let (coordinator, operator) = setup().unwrap();
            b.iter(|| run_writers(&coordinator, &operator, writers, per_writer, true));
        });
        group.bench_with_input(BenchmarkId::new("distinct_medicines", writers), &writers, |b, &writers| {
            let (coordinator, operator) = setup().unwrap();
            b.iter(|| run_writers(&coordinator, &operator, writers, per_writer, false));
        });
    }

    group.finish();
}

fn bench_ledger_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger_query");

    for records in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("newest_first", records), &records, |b, &records| {
            let (coordinator, operator) = setup().unwrap();
            let form = request(2);
            for _ in 0..records {
                coordinator.commit_treatment(&operator, &form).unwrap();
            }
            let query = LedgerQuery::for_unit(operator.unit_id).limit(5);
            b.iter(|| {
                black_box(coordinator.ledger().query(black_box(&query)).unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_commit_latency, bench_contention, bench_ledger_query);
criterion_main!(benches);
