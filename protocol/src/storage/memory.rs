//! In-memory [`Store`] backed by hash maps behind one `RwLock`.
//!
//! Reads take the read lock just long enough to copy out the entries a
//! [`ViewScope`] names. `commit_delta` holds the write lock across the
//! conflict check and the write, which is what makes it atomic with respect
//! to every other commit.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use super::{
    CommitError, CommitOutcome, ConflictError, Existence, Store, StoreResult, StoreStats,
};
use crate::state::{Delta, SnapshotView, ViewScope};
use crate::transaction::{IssuanceKey, Outpoint, Output, Transaction, TxHash};

#[derive(Debug, Default)]
struct State {
    chain_utxos: HashMap<Outpoint, Output>,
    chain_txs: HashSet<TxHash>,
    pool_utxos: HashMap<Outpoint, Output>,
    /// Outpoint consumed in the pool → the pool transaction that consumed it.
    pool_spent: HashMap<Outpoint, TxHash>,
    pool_txs: HashMap<TxHash, Transaction>,
    /// Issuance keys used by pool or chain transactions.
    issuances: HashSet<IssuanceKey>,
}

/// A [`Store`] that lives entirely in memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pool transaction with `hash`, if any.
    pub fn pool_transaction(&self, hash: &TxHash) -> Option<Transaction> {
        self.state.read().pool_txs.get(hash).cloned()
    }
}

impl Store for MemoryStore {
    fn pool_view(&self, scope: &ViewScope) -> StoreResult<SnapshotView> {
        let state = self.state.read();
        let mut view = SnapshotView::new();
        for outpoint in &scope.outpoints {
            if state.pool_spent.contains_key(outpoint) {
                view.insert_spent(*outpoint);
            } else if let Some(output) = state.pool_utxos.get(outpoint) {
                view.insert_unspent(*outpoint, output.clone());
            }
        }
        for key in &scope.issuances {
            if state.issuances.contains(key) {
                view.mark_issuance_used(*key);
            }
        }
        Ok(view)
    }

    fn chain_view(&self, scope: &ViewScope) -> StoreResult<SnapshotView> {
        let state = self.state.read();
        let mut view = SnapshotView::new();
        for outpoint in &scope.outpoints {
            if let Some(output) = state.chain_utxos.get(outpoint) {
                view.insert_unspent(*outpoint, output.clone());
            }
        }
        for key in &scope.issuances {
            if state.issuances.contains(key) {
                view.mark_issuance_used(*key);
            }
        }
        Ok(view)
    }

    fn lookup_existence(&self, hash: &TxHash) -> StoreResult<Existence> {
        let state = self.state.read();
        Ok(Existence {
            in_pool: state.pool_txs.contains_key(hash),
            in_chain: state.chain_txs.contains(hash),
        })
    }

    fn commit_delta(&self, tx: &Transaction, delta: &Delta) -> Result<CommitOutcome, CommitError> {
        let hash = tx.hash();
        let mut state = self.state.write();

        if state.pool_txs.contains_key(&hash) || state.chain_txs.contains(&hash) {
            return Ok(CommitOutcome::AlreadyPresent);
        }

        // Check everything before writing anything.
        for outpoint in &delta.consumed {
            if let Some(spent_by) = state.pool_spent.get(outpoint) {
                return Err(ConflictError::OutpointSpent {
                    outpoint: *outpoint,
                    spent_by: *spent_by,
                }
                .into());
            }
        }
        for key in &delta.issuances {
            if state.issuances.contains(key) {
                return Err(ConflictError::IssuanceReused { key: *key }.into());
            }
        }

        for outpoint in &delta.consumed {
            state.pool_utxos.remove(outpoint);
            state.pool_spent.insert(*outpoint, hash);
        }
        for (outpoint, output) in &delta.created {
            state.pool_utxos.insert(*outpoint, output.clone());
        }
        state.issuances.extend(delta.issuances.iter().copied());
        state.pool_txs.insert(hash, tx.clone());

        Ok(CommitOutcome::Committed)
    }

    fn seed_confirmed(&self, tx: &Transaction) -> StoreResult<()> {
        let hash = tx.hash();
        let mut state = self.state.write();
        if !state.chain_txs.insert(hash) {
            return Ok(());
        }
        for outpoint in tx.spent_outpoints() {
            state.chain_utxos.remove(outpoint);
        }
        for (index, output) in (0u32..).zip(&tx.outputs) {
            state
                .chain_utxos
                .insert(Outpoint::new(hash, index), output.clone());
        }
        state.issuances.extend(tx.issuance_keys());
        Ok(())
    }

    fn stats(&self) -> StoreResult<StoreStats> {
        let state = self.state.read();
        Ok(StoreStats {
            pool_txs: state.pool_txs.len(),
            pool_unspent: state.pool_utxos.len(),
            pool_spent: state.pool_spent.len(),
            chain_txs: state.chain_txs.len(),
            chain_unspent: state.chain_utxos.len(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
