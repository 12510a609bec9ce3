// Copyright (c) 2026 Tally Contributors. MIT License.
// See LICENSE for details.

//! # Tally Protocol — Pending-Transaction Admission
//!
//! Tally decides which transactions may enter the pending pool of an
//! output-based ledger, and makes each admission durable exactly once.
//!
//! A transaction consumes prior outputs (or issues new units of an asset)
//! and creates new outputs. Admitting it means proving, against what the
//! pool and the chain currently hold, that every input exists and is
//! unspent, that value is conserved per asset, and that every input is
//! authorized; then committing its effects atomically so that no other
//! transaction can spend the same output.
//!
//! ## Architecture
//!
//! - **transaction** — Outpoints, outputs, inputs, transactions, signing.
//! - **state** — Views over the output set, the overlay an admission writes
//!   into, and the combinators that stack them.
//! - **validation** — The `Validator` trait and the reference rule set.
//! - **storage** — The `Store` trait, an in-memory store and a sled store.
//! - **admission** — The pipeline: fetch, dedupe, validate, apply, persist,
//!   notify. Plus batch admission and cancellation.
//! - **metrics** — Prometheus counters for outcomes and persist latency.
//! - **crypto** — Ed25519 keys and BLAKE3 hashing.
//! - **config** — Protocol constants and runtime tunables.
//!
//! ## Design Philosophy
//!
//! 1. The store is the only arbiter of races. Everything above it works on
//!    private snapshots and never holds a lock.
//! 2. Amounts are integers. Arithmetic on them is checked.
//! 3. A duplicate is not an error, and a rejection never leaves a trace.
//! 4. If it touches money, it has tests. Plural.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use tally_protocol::admission::{Admission, AdmissionEngine, FixedClock};
//! use tally_protocol::crypto::Keypair;
//! use tally_protocol::storage::{MemoryStore, Store};
//! use tally_protocol::transaction::{sign_transaction, AssetId, TransactionBuilder};
//! use tally_protocol::validation::BasicValidator;
//!
//! let issuer = Keypair::generate();
//! let alice = Keypair::generate();
//! let asset = AssetId::from_issuer(&issuer.public_key());
//!
//! let genesis = TransactionBuilder::new()
//!     .issue(asset, 100, issuer.public_key(), 0)
//!     .output(asset, 100, issuer.public_key())
//!     .max_time(1)
//!     .build();
//! let store = MemoryStore::new();
//! store.seed_confirmed(&genesis).unwrap();
//!
//! let engine = AdmissionEngine::builder(store, BasicValidator::default())
//!     .clock(Arc::new(FixedClock::new(1_700_000_000)))
//!     .build();
//!
//! let mut pay = TransactionBuilder::new()
//!     .spend(genesis.outpoint(0))
//!     .output(asset, 100, alice.public_key())
//!     .build();
//! sign_transaction(&mut pay, &[&issuer]).unwrap();
//!
//! assert_eq!(engine.admit(&pay).unwrap(), Admission::Admitted);
//! assert_eq!(engine.admit(&pay).unwrap(), Admission::Duplicate);
//! ```

pub mod admission;
pub mod config;
pub mod crypto;
pub mod metrics;
pub mod state;
pub mod storage;
pub mod transaction;
pub mod validation;

pub use admission::{Admission, AdmissionEngine, AdmissionError};
pub use storage::{MemoryStore, SledStore, Store};
pub use validation::{BasicValidator, Validator};
