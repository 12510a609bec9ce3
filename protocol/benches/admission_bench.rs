// Admission benchmarks for Tally.
//
// Covers validation against a prepared snapshot, single admissions into the
// in-memory and sled stores, and batch admission at a few sizes.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};

use tally_protocol::admission::{AdmissionEngine, FixedClock};
use tally_protocol::crypto::Keypair;
use tally_protocol::state::SnapshotView;
use tally_protocol::storage::{MemoryStore, SledStore, Store};
use tally_protocol::transaction::{sign_transaction, AssetId, Transaction, TransactionBuilder};
use tally_protocol::validation::{BasicValidator, Validator};

const NOW: u64 = 1_700_000_000;

struct Fixture {
    genesis: Transaction,
    payments: Vec<Transaction>,
}

/// A genesis paying `n` outputs of 100 to alice, and `n` signed payments
/// each spending one of them.
fn fixture(n: u32) -> Fixture {
    let issuer = Keypair::from_seed(&[1u8; 32]);
    let alice = Keypair::from_seed(&[2u8; 32]);
    let bob = Keypair::from_seed(&[3u8; 32]);
    let asset = AssetId::from_issuer(&issuer.public_key());

    let mut builder =
        TransactionBuilder::new().issue(asset, 100 * u64::from(n), issuer.public_key(), 0);
    for _ in 0..n {
        builder = builder.output(asset, 100, alice.public_key());
    }
    let genesis = builder.max_time(NOW).build();

    let payments = (0..n)
        .map(|i| {
            let mut tx = TransactionBuilder::new()
                .spend(genesis.outpoint(i))
                .output(asset, 70, bob.public_key())
                .output(asset, 30, alice.public_key())
                .build();
            sign_transaction(&mut tx, &[&alice]).expect("sign");
            tx
        })
        .collect();

    Fixture { genesis, payments }
}

fn engine<S: Store>(store: S) -> AdmissionEngine<S, BasicValidator> {
    AdmissionEngine::builder(store, BasicValidator::default())
        .clock(Arc::new(FixedClock::new(NOW)))
        .build()
}

fn bench_validate(c: &mut Criterion) {
    let f = fixture(1);
    let mut chain = SnapshotView::new();
    chain.insert_unspent(f.genesis.outpoint(0), f.genesis.outputs[0].clone());
    let validator = BasicValidator::default();
    let tx = &f.payments[0];

    c.bench_function("validate/single_spend", |b| {
        b.iter(|| validator.validate(&chain, tx, NOW).unwrap());
    });
}

fn bench_admit_memory(c: &mut Criterion) {
    let f = fixture(1);
    c.bench_function("admit/memory", |b| {
        b.iter_batched(
            || {
                let store = MemoryStore::new();
                store.seed_confirmed(&f.genesis).unwrap();
                engine(store)
            },
            |engine| engine.admit(&f.payments[0]).unwrap(),
            BatchSize::SmallInput,
        );
    });
}

fn bench_admit_sled(c: &mut Criterion) {
    let f = fixture(1);
    c.bench_function("admit/sled", |b| {
        b.iter_batched(
            || {
                let store = SledStore::open_temporary().unwrap();
                store.seed_confirmed(&f.genesis).unwrap();
                engine(store)
            },
            |engine| engine.admit(&f.payments[0]).unwrap(),
            BatchSize::PerIteration,
        );
    });
}

fn bench_admit_batch(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("admit_batch/memory");

    for size in [16u32, 64, 256] {
        let f = fixture(size);
        group.throughput(Throughput::Elements(u64::from(size)));
        group.bench_with_input(BenchmarkId::from_parameter(size), &f, |b, f| {
            b.iter_batched(
                || {
                    let store = MemoryStore::new();
                    store.seed_confirmed(&f.genesis).unwrap();
                    (engine(store), f.payments.clone())
                },
                |(engine, txs)| runtime.block_on(engine.admit_batch(txs)),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_validate,
    bench_admit_memory,
    bench_admit_sled,
    bench_admit_batch,
);
criterion_main!(benches);
