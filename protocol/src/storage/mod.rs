//! # Storage Module
//!
//! Durable pool and chain state behind the [`Store`] trait.
//!
//! ## Architecture
//!
//! ```text
//! mod.rs    — Store trait, errors, commit outcomes
//! memory.rs — MemoryStore: RwLock-guarded maps, for tests and embedding
//! db.rs     — SledStore: sled trees with multi-tree transactional commit
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! ViewScope ──▶ pool_view / chain_view ──▶ SnapshotView (read)
//! Delta     ──▶ commit_delta            ──▶ pool trees   (write, atomic)
//! ```
//!
//! ## Design Decisions
//!
//! 1. **Narrow reads.** A store answers only for the outpoints and issuance
//!    keys one transaction references. The pipeline never scans.
//!
//! 2. **Check-and-write in one step.** `commit_delta` re-checks every
//!    consumed outpoint and issuance key under the same lock or transaction
//!    that writes the delta. Two admissions that validated against the same
//!    snapshot cannot both commit.
//!
//! 3. **Idempotent per transaction hash.** Committing a transaction that is
//!    already in the pool is `AlreadyPresent`, not an error.
//!
//! 4. **Bincode for on-disk serialization.** JSON is for operator files;
//!    bincode is for storage.

pub mod db;
pub mod memory;

pub use db::SledStore;
pub use memory::MemoryStore;

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::state::{Delta, SnapshotView, ViewScope};
use crate::transaction::{IssuanceKey, Outpoint, Transaction, TxHash};

// ---------------------------------------------------------------------------
// Error Types
// ---------------------------------------------------------------------------

/// I/O-level store failure. Retryable by the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<bincode::Error> for StoreError {
    fn from(e: bincode::Error) -> Self {
        Self::Codec(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A commit lost a race against another admission.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConflictError {
    #[error("outpoint {outpoint} already spent by {spent_by}")]
    OutpointSpent { outpoint: Outpoint, spent_by: TxHash },

    #[error("issuance {key} already used")]
    IssuanceReused { key: IssuanceKey },
}

#[derive(Debug, Error)]
pub enum CommitError {
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// What a successful [`Store::commit_delta`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The delta is now durable and visible.
    Committed,
    /// The transaction was already in the pool. Nothing was written.
    AlreadyPresent,
}

/// Where a transaction hash is known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Existence {
    pub in_pool: bool,
    pub in_chain: bool,
}

impl Existence {
    pub fn exists(&self) -> bool {
        self.in_pool || self.in_chain
    }
}

/// Point-in-time counters, for status output and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub pool_txs: usize,
    pub pool_unspent: usize,
    pub pool_spent: usize,
    pub chain_txs: usize,
    pub chain_unspent: usize,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Durable pool and chain state.
///
/// Every method is synchronous and may block on I/O. Implementations must be
/// safe to call from many threads at once.
pub trait Store: Send + Sync {
    /// Pool-layer answers for `scope`: outputs created by pool transactions,
    /// outpoints consumed by pool transactions, issuance keys used.
    fn pool_view(&self, scope: &ViewScope) -> StoreResult<SnapshotView>;

    /// Chain-layer answers for `scope`.
    fn chain_view(&self, scope: &ViewScope) -> StoreResult<SnapshotView>;

    fn lookup_existence(&self, hash: &TxHash) -> StoreResult<Existence>;

    /// Atomically make `delta` (the effect of `tx`) visible in the pool.
    ///
    /// Either every consumption, creation and issuance lands or none does.
    fn commit_delta(&self, tx: &Transaction, delta: &Delta) -> Result<CommitOutcome, CommitError>;

    /// Write `tx` straight into chain state without validation. Its outputs
    /// become unspent chain outputs and its spend inputs are removed from
    /// the chain set. Used for genesis and fixtures.
    fn seed_confirmed(&self, tx: &Transaction) -> StoreResult<()>;

    fn stats(&self) -> StoreResult<StoreStats>;
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn pool_view(&self, scope: &ViewScope) -> StoreResult<SnapshotView> {
        (**self).pool_view(scope)
    }

    fn chain_view(&self, scope: &ViewScope) -> StoreResult<SnapshotView> {
        (**self).chain_view(scope)
    }

    fn lookup_existence(&self, hash: &TxHash) -> StoreResult<Existence> {
        (**self).lookup_existence(hash)
    }

    fn commit_delta(&self, tx: &Transaction, delta: &Delta) -> Result<CommitOutcome, CommitError> {
        (**self).commit_delta(tx, delta)
    }

    fn seed_confirmed(&self, tx: &Transaction) -> StoreResult<()> {
        (**self).seed_confirmed(tx)
    }

    fn stats(&self) -> StoreResult<StoreStats> {
        (**self).stats()
    }
}
