use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use money_movement_core::models::{Account, Currency, LedgerEntry, Money, Transfer, TransferType};
use money_movement_core::observability::LatencyTimer;

fn usd() -> Currency {
    Currency::from_str("USD").unwrap()
}

fn benchmark_balance_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("balance_aggregation");
    group.measurement_time(Duration::from_secs(10));

    for size in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::new("hashmap_signed_sum", size), size, |b, &size| {
            let accounts: Vec<Uuid> = (0..10).map(|_| Uuid::new_v4()).collect();

            b.iter(|| {
                let mut balances: HashMap<Uuid, i64> = HashMap::new();
                for i in 0..size {
                    let from_idx = i % accounts.len();
                    let to_idx = (i + 1) % accounts.len();
                    let amount = ((i % 1000) + 100) as i64;

                    *balances.entry(accounts[from_idx]).or_insert(0) -= amount;
                    *balances.entry(accounts[to_idx]).or_insert(0) += amount;
                }
                black_box(balances)
            });
        });
    }

    group.finish();
}

fn benchmark_account_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("account");

    group.bench_function("open_account", |b| {
        b.iter(|| {
            let account = Account::open(black_box("Bench Account".to_string()), black_box(usd()));
            black_box(account)
        });
    });

    group.bench_function("debit_and_credit", |b| {
        let mut source = Account::open("Source".to_string(), usd());
        let mut dest = Account::open("Dest".to_string(), usd());
        source.balance_minor_units = 1_000_000;
        let amount = Money::from_parts(500, "USD").unwrap();
        let transfer_id = Uuid::new_v4();

        b.iter(|| {
            let _ = source.debit(black_box(&amount), transfer_id, TransferType::Transfer, dest.id);
            let _ = dest.credit(black_box(&amount), transfer_id, TransferType::Transfer, source.id);
            source.release_events();
            dest.release_events();
        });
    });

    group.finish();
}

fn benchmark_transfer_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("transfer");

    group.bench_function("create_transfer", |b| {
        let source_id = Uuid::new_v4();
        let dest_id = Uuid::new_v4();
        let amount = Money::from_parts(1_000, "USD").unwrap();

        b.iter(|| {
            let transfer = Transfer::create(
                black_box("EXT-001".to_string()),
                black_box(source_id),
                black_box(dest_id),
                black_box(&amount),
                black_box(None),
            );
            black_box(transfer)
        });
    });

    group.bench_function("create_ledger_entry_pair", |b| {
        let source_id = Uuid::new_v4();
        let dest_id = Uuid::new_v4();
        let transfer_id = Uuid::new_v4();
        let now = chrono::Utc::now();

        b.iter(|| {
            let debit = LedgerEntry::debit(
                black_box(source_id),
                TransferType::Transfer,
                black_box(1_000),
                "USD".to_string(),
                black_box(9_000),
                transfer_id,
                dest_id,
                now,
            );
            let credit = LedgerEntry::credit(
                black_box(dest_id),
                TransferType::Transfer,
                black_box(1_000),
                "USD".to_string(),
                black_box(1_000),
                transfer_id,
                source_id,
                now,
            );
            black_box((debit, credit))
        });
    });

    group.finish();
}

fn benchmark_latency_timer(c: &mut Criterion) {
    let mut group = c.benchmark_group("latency_timer");

    group.bench_function("create_and_elapsed", |b| {
        b.iter(|| {
            let timer = LatencyTimer::new();
            let elapsed = timer.elapsed_ms();
            black_box(elapsed)
        });
    });

    group.finish();
}

fn benchmark_uuid_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("uuid");

    group.bench_function("generate_v4", |b| {
        b.iter(|| {
            let id = Uuid::new_v4();
            black_box(id)
        });
    });

    group.bench_function("generate_v7", |b| {
        b.iter(|| {
            let id = Uuid::now_v7();
            black_box(id)
        });
    });

    group.finish();
}

fn benchmark_money_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("money");

    group.bench_function("from_parts", |b| {
        b.iter(|| {
            let money = Money::from_parts(black_box(12345), black_box("USD"));
            black_box(money)
        });
    });

    group.bench_function("add", |b| {
        let a = Money::from_parts(12345, "USD").unwrap();
        let bb = Money::from_parts(67890, "USD").unwrap();
        b.iter(|| {
            let result = a.checked_add(&bb);
            black_box(result)
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_balance_aggregation,
    benchmark_account_operations,
    benchmark_transfer_creation,
    benchmark_latency_timer,
    benchmark_uuid_operations,
    benchmark_money_operations,
);

criterion_main!(benches);
