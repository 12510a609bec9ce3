//! # SledStore — Persistent Pool and Chain State
//!
//! The durable [`Store`], built on sled's embedded key-value store.
//!
//! ## Tree Layout
//!
//! | Tree          | Key                    | Value                  |
//! |---------------|------------------------|------------------------|
//! | `chain_utxos` | outpoint (36B)         | `bincode(Output)`      |
//! | `chain_txs`   | tx hash (32B)          | empty                  |
//! | `pool_utxos`  | outpoint (36B)         | `bincode(Output)`      |
//! | `pool_spent`  | outpoint (36B)         | spender tx hash (32B)  |
//! | `pool_txs`    | tx hash (32B)          | `bincode(Transaction)` |
//! | `issuances`   | issuance key (32B)     | empty                  |
//!
//! Outpoint keys are the tx hash followed by the big-endian index, so all
//! outputs of one transaction sit next to each other.
//!
//! ## Atomicity
//!
//! `commit_delta` runs one sled transaction over `pool_txs`, `pool_spent`,
//! `pool_utxos` and `issuances`. The conflict checks read through the same
//! transaction that writes, so sled's optimistic concurrency control reruns
//! or serializes any two commits that touch the same keys. Either the whole
//! delta lands or nothing does. `pool_view` reads `pool_spent` and
//! `pool_utxos` through one transaction too, so it never sees a commit
//! half-applied.

use std::path::Path;

use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, IVec, Transactional, Tree};
use tracing::{debug, error};

use super::{
    CommitError, CommitOutcome, ConflictError, Existence, Store, StoreError, StoreResult,
    StoreStats,
};
use crate::config::{
    TREE_CHAIN_TXS, TREE_CHAIN_UTXOS, TREE_ISSUANCES, TREE_POOL_SPENT, TREE_POOL_TXS,
    TREE_POOL_UTXOS,
};
use crate::state::{Delta, SnapshotView, ViewScope};
use crate::transaction::{Outpoint, Output, Transaction, TxHash};

/// Value stored in set-like trees.
const PRESENT: &[u8] = &[];

/// Why a commit transaction aborted.
enum Abort {
    Conflict(ConflictError),
    Corrupt(String),
}

/// One outpoint as read from the pool trees, before decoding.
enum PoolEntry {
    Spent(Outpoint),
    Unspent(Outpoint, IVec),
}

// ---------------------------------------------------------------------------
// SledStore
// ---------------------------------------------------------------------------

/// Persistent [`Store`] over a sled database.
///
/// sled trees support concurrent reads and serialized writes, so a
/// `SledStore` can be shared across threads behind an `Arc` without any
/// locking of its own.
#[derive(Debug, Clone)]
pub struct SledStore {
    db: Db,
    chain_utxos: Tree,
    chain_txs: Tree,
    pool_utxos: Tree,
    pool_spent: Tree,
    pool_txs: Tree,
    issuances: Tree,
}

impl SledStore {
    /// Open or create a store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// A store that lives in a temporary directory and is removed on drop.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        Ok(Self {
            chain_utxos: db.open_tree(TREE_CHAIN_UTXOS)?,
            chain_txs: db.open_tree(TREE_CHAIN_TXS)?,
            pool_utxos: db.open_tree(TREE_POOL_UTXOS)?,
            pool_spent: db.open_tree(TREE_POOL_SPENT)?,
            pool_txs: db.open_tree(TREE_POOL_TXS)?,
            issuances: db.open_tree(TREE_ISSUANCES)?,
            db,
        })
    }

    /// The pool transaction with `hash`, if any.
    pub fn pool_transaction(&self, hash: &TxHash) -> StoreResult<Option<Transaction>> {
        match self.pool_txs.get(hash.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Block until every write so far is on disk.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }

    fn read_output(tree: &Tree, outpoint: &Outpoint) -> StoreResult<Option<Output>> {
        match tree.get(outpoint.to_key())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn mark_issuances(&self, scope: &ViewScope, view: &mut SnapshotView) -> StoreResult<()> {
        for key in &scope.issuances {
            if self.issuances.contains_key(key.as_bytes())? {
                view.mark_issuance_used(*key);
            }
        }
        Ok(())
    }
}

/// Once the transaction has committed, the delta is visible to every reader
/// and callers must treat it as admitted. A failed flush only delays
/// durability until sled's next background flush, so it is logged and the
/// commit stands.
fn committed_after_flush(hash: &TxHash, flushed: sled::Result<usize>) -> CommitOutcome {
    if let Err(e) = flushed {
        error!(tx = %hash, error = %e, "delta committed but flush failed");
    }
    CommitOutcome::Committed
}

fn decode_hash(bytes: &[u8]) -> Option<TxHash> {
    let array: [u8; 32] = bytes.try_into().ok()?;
    Some(TxHash::from_bytes(array))
}

impl Store for SledStore {
    fn pool_view(&self, scope: &ViewScope) -> StoreResult<SnapshotView> {
        // Both trees are read in one transaction. A pool output consumed
        // between two plain reads would otherwise look absent instead of spent.
        let read: Result<Vec<PoolEntry>, TransactionError<()>> =
            (&self.pool_spent, &self.pool_utxos).transaction(|(spent, utxos)| {
                let mut entries = Vec::with_capacity(scope.outpoints.len());
                for outpoint in &scope.outpoints {
                    let key = outpoint.to_key();
                    let entry = if spent.get(key)?.is_some() {
                        PoolEntry::Spent(*outpoint)
                    } else {
                        match utxos.get(key)? {
                            Some(bytes) => PoolEntry::Unspent(*outpoint, bytes),
                            None => continue,
                        }
                    };
                    entries.push(entry);
                }
                Ok(entries)
            });
        let entries = match read {
            Ok(entries) => entries,
            Err(TransactionError::Abort(())) => {
                return Err(StoreError::Unavailable("pool read aborted".to_string()))
            }
            Err(TransactionError::Storage(e)) => return Err(e.into()),
        };

        let mut view = SnapshotView::new();
        for entry in entries {
            match entry {
                PoolEntry::Spent(outpoint) => view.insert_spent(outpoint),
                PoolEntry::Unspent(outpoint, bytes) => {
                    view.insert_unspent(outpoint, bincode::deserialize(&bytes)?)
                }
            }
        }
        self.mark_issuances(scope, &mut view)?;
        Ok(view)
    }

    fn chain_view(&self, scope: &ViewScope) -> StoreResult<SnapshotView> {
        let mut view = SnapshotView::new();
        for outpoint in &scope.outpoints {
            if let Some(output) = Self::read_output(&self.chain_utxos, outpoint)? {
                view.insert_unspent(*outpoint, output);
            }
        }
        self.mark_issuances(scope, &mut view)?;
        Ok(view)
    }

    fn lookup_existence(&self, hash: &TxHash) -> StoreResult<Existence> {
        Ok(Existence {
            in_pool: self.pool_txs.contains_key(hash.as_bytes())?,
            in_chain: self.chain_txs.contains_key(hash.as_bytes())?,
        })
    }

    fn commit_delta(&self, tx: &Transaction, delta: &Delta) -> Result<CommitOutcome, CommitError> {
        let hash = tx.hash();
        if self.chain_txs.contains_key(hash.as_bytes()).map_err(StoreError::from)? {
            return Ok(CommitOutcome::AlreadyPresent);
        }

        // Encode outside the transaction; the closure may run more than once.
        let tx_bytes = bincode::serialize(tx).map_err(StoreError::from)?;
        let created = delta
            .created
            .iter()
            .map(|(outpoint, output)| Ok((outpoint.to_key(), bincode::serialize(output)?)))
            .collect::<Result<Vec<_>, bincode::Error>>()
            .map_err(StoreError::from)?;

        let result: Result<CommitOutcome, TransactionError<Abort>> = (
            &self.pool_txs,
            &self.pool_spent,
            &self.pool_utxos,
            &self.issuances,
        )
            .transaction(|(txs, spent, utxos, issuances)| {
                if txs.get(hash.as_bytes())?.is_some() {
                    return Ok(CommitOutcome::AlreadyPresent);
                }

                for outpoint in &delta.consumed {
                    if let Some(spender) = spent.get(outpoint.to_key())? {
                        let abort = match decode_hash(&spender) {
                            Some(spent_by) => Abort::Conflict(ConflictError::OutpointSpent {
                                outpoint: *outpoint,
                                spent_by,
                            }),
                            None => Abort::Corrupt(format!("bad spender record for {outpoint}")),
                        };
                        return Err(ConflictableTransactionError::Abort(abort));
                    }
                }
                for key in &delta.issuances {
                    if issuances.get(key.as_bytes())?.is_some() {
                        return Err(ConflictableTransactionError::Abort(Abort::Conflict(
                            ConflictError::IssuanceReused { key: *key },
                        )));
                    }
                }

                for outpoint in &delta.consumed {
                    let key = outpoint.to_key();
                    utxos.remove(&key[..])?;
                    spent.insert(&key[..], &hash.as_bytes()[..])?;
                }
                for (key, bytes) in &created {
                    utxos.insert(&key[..], bytes.as_slice())?;
                }
                for key in &delta.issuances {
                    issuances.insert(&key.as_bytes()[..], PRESENT)?;
                }
                txs.insert(&hash.as_bytes()[..], tx_bytes.as_slice())?;
                Ok(CommitOutcome::Committed)
            });

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(TransactionError::Abort(Abort::Conflict(conflict))) => {
                return Err(CommitError::Conflict(conflict))
            }
            Err(TransactionError::Abort(Abort::Corrupt(reason))) => {
                return Err(StoreError::Codec(reason).into())
            }
            Err(TransactionError::Storage(e)) => return Err(StoreError::Sled(e).into()),
        };

        if outcome == CommitOutcome::Committed {
            debug!(tx = %hash, consumed = delta.consumed.len(), created = created.len(), "delta committed");
            return Ok(committed_after_flush(&hash, self.db.flush()));
        }
        Ok(outcome)
    }

    fn seed_confirmed(&self, tx: &Transaction) -> StoreResult<()> {
        let hash = tx.hash();
        let created = (0u32..)
            .zip(&tx.outputs)
            .map(|(index, output)| {
                Ok((Outpoint::new(hash, index).to_key(), bincode::serialize(output)?))
            })
            .collect::<Result<Vec<_>, bincode::Error>>()?;
        let spent: Vec<_> = tx.spent_outpoints().map(Outpoint::to_key).collect();
        let issued: Vec<_> = tx.issuance_keys().collect();

        let result: Result<(), TransactionError<()>> = (
            &self.chain_txs,
            &self.chain_utxos,
            &self.issuances,
        )
            .transaction(|(txs, utxos, issuances)| {
                if txs.insert(&hash.as_bytes()[..], PRESENT)?.is_some() {
                    return Ok(());
                }
                for key in &spent {
                    utxos.remove(&key[..])?;
                }
                for (key, bytes) in &created {
                    utxos.insert(&key[..], bytes.as_slice())?;
                }
                for key in &issued {
                    issuances.insert(&key.as_bytes()[..], PRESENT)?;
                }
                Ok(())
            });
        match result {
            Ok(()) => {}
            Err(TransactionError::Abort(())) => {
                return Err(StoreError::Unavailable("seed aborted".to_string()))
            }
            Err(TransactionError::Storage(e)) => return Err(e.into()),
        }
        self.db.flush()?;
        Ok(())
    }

    fn stats(&self) -> StoreResult<StoreStats> {
        Ok(StoreStats {
            pool_txs: self.pool_txs.len(),
            pool_unspent: self.pool_utxos.len(),
            pool_spent: self.pool_spent.len(),
            chain_txs: self.chain_txs.len(),
            chain_unspent: self.chain_utxos.len(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::state::{Lookup, View};
    use crate::transaction::{AssetId, IssuanceKey, TransactionBuilder};

    fn genesis(owner: &Keypair) -> Transaction {
        let asset = AssetId::from_issuer(&owner.public_key());
        TransactionBuilder::new()
            .issue(asset, 100, owner.public_key(), 0)
            .output(asset, 60, owner.public_key())
            .output(asset, 40, owner.public_key())
            .max_time(1)
            .build()
    }

    fn spend(from: Outpoint, owner: &Keypair, amount: u64) -> (Transaction, Delta) {
        let asset = AssetId::from_issuer(&owner.public_key());
        let tx = TransactionBuilder::new()
            .spend(from)
            .output(asset, amount, owner.public_key())
            .build();
        let delta = Delta {
            consumed: vec![from],
            created: vec![(tx.outpoint(0), tx.outputs[0].clone())],
            issuances: vec![],
        };
        (tx, delta)
    }

    #[test]
    fn open_temporary_store() {
        let store = SledStore::open_temporary().expect("should create temp store");
        assert_eq!(store.stats().unwrap(), StoreStats::default());
    }

    #[test]
    fn seed_then_read_chain_view() {
        let owner = Keypair::from_seed(&[1u8; 32]);
        let store = SledStore::open_temporary().unwrap();
        let g = genesis(&owner);
        store.seed_confirmed(&g).unwrap();
        store.seed_confirmed(&g).unwrap();

        let scope = ViewScope {
            outpoints: vec![g.outpoint(0), g.outpoint(1), g.outpoint(2)],
            issuances: g.issuance_keys().collect(),
        };
        let chain = store.chain_view(&scope).unwrap();
        assert_eq!(
            chain.lookup(&g.outpoint(0)),
            Lookup::Unspent(g.outputs[0].clone())
        );
        assert!(chain.lookup(&g.outpoint(1)).is_unspent());
        assert!(chain.lookup(&g.outpoint(2)).is_absent());
        assert!(chain.issuance_used(&scope.issuances[0]));

        let stats = store.stats().unwrap();
        assert_eq!(stats.chain_txs, 1);
        assert_eq!(stats.chain_unspent, 2);
    }

    #[test]
    fn commit_is_visible_in_pool_view() {
        let owner = Keypair::from_seed(&[1u8; 32]);
        let store = SledStore::open_temporary().unwrap();
        let g = genesis(&owner);
        store.seed_confirmed(&g).unwrap();

        let (tx, delta) = spend(g.outpoint(0), &owner, 60);
        assert_eq!(
            store.commit_delta(&tx, &delta).unwrap(),
            CommitOutcome::Committed
        );

        let scope = ViewScope {
            outpoints: vec![g.outpoint(0), tx.outpoint(0)],
            issuances: vec![],
        };
        let pool = store.pool_view(&scope).unwrap();
        assert_eq!(pool.lookup(&g.outpoint(0)), Lookup::Spent);
        assert!(pool.lookup(&tx.outpoint(0)).is_unspent());
        assert_eq!(store.pool_transaction(&tx.hash()).unwrap(), Some(tx.clone()));
        assert!(store.lookup_existence(&tx.hash()).unwrap().in_pool);
    }

    #[test]
    fn duplicate_commit_is_already_present() {
        let owner = Keypair::from_seed(&[1u8; 32]);
        let store = SledStore::open_temporary().unwrap();
        let (tx, delta) = spend(Outpoint::new(TxHash::default(), 0), &owner, 5);
        store.commit_delta(&tx, &delta).unwrap();
        let before = store.stats().unwrap();
        assert_eq!(
            store.commit_delta(&tx, &delta).unwrap(),
            CommitOutcome::AlreadyPresent
        );
        assert_eq!(store.stats().unwrap(), before);
    }

    #[test]
    fn conflicting_commit_aborts_whole_delta() {
        let owner = Keypair::from_seed(&[1u8; 32]);
        let store = SledStore::open_temporary().unwrap();
        let contested = Outpoint::new(TxHash::from_bytes([7u8; 32]), 0);
        let other = Outpoint::new(TxHash::from_bytes([8u8; 32]), 0);

        let (first, first_delta) = spend(contested, &owner, 5);
        store.commit_delta(&first, &first_delta).unwrap();
        let before = store.stats().unwrap();

        // Consumes a fresh outpoint first, then the contested one.
        let (second, mut second_delta) = spend(other, &owner, 6);
        second_delta.consumed.push(contested);
        second_delta.issuances.push(IssuanceKey::from_bytes([5u8; 32]));

        let err = store.commit_delta(&second, &second_delta).unwrap_err();
        assert!(matches!(
            err,
            CommitError::Conflict(ConflictError::OutpointSpent { spent_by, .. })
                if spent_by == first.hash()
        ));
        assert_eq!(store.stats().unwrap(), before);

        let scope = ViewScope {
            outpoints: vec![other],
            issuances: vec![IssuanceKey::from_bytes([5u8; 32])],
        };
        let pool = store.pool_view(&scope).unwrap();
        assert!(pool.lookup(&other).is_absent());
        assert!(!pool.issuance_used(&scope.issuances[0]));
    }

    #[test]
    fn consumed_pool_output_reads_as_spent() {
        let owner = Keypair::from_seed(&[1u8; 32]);
        let store = SledStore::open_temporary().unwrap();
        let funding = Outpoint::new(TxHash::from_bytes([3u8; 32]), 0);
        let (first, first_delta) = spend(funding, &owner, 9);
        store.commit_delta(&first, &first_delta).unwrap();

        // The output `first` created is consumed in the pool, so it leaves
        // pool_utxos and enters pool_spent in the same commit.
        let (second, second_delta) = spend(first.outpoint(0), &owner, 9);
        store.commit_delta(&second, &second_delta).unwrap();

        let scope = ViewScope {
            outpoints: vec![first.outpoint(0), second.outpoint(0)],
            issuances: vec![],
        };
        let pool = store.pool_view(&scope).unwrap();
        assert_eq!(pool.lookup(&first.outpoint(0)), Lookup::Spent);
        assert_eq!(
            pool.lookup(&second.outpoint(0)),
            Lookup::Unspent(second.outputs[0].clone())
        );
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn flush_failure_after_commit_still_counts_as_committed() {
        let hash = TxHash::from_bytes([4u8; 32]);
        let failed = Err(sled::Error::Unsupported("disk went away".to_string()));
        assert_eq!(committed_after_flush(&hash, failed), CommitOutcome::Committed);
        assert_eq!(committed_after_flush(&hash, Ok(0)), CommitOutcome::Committed);
    }

    #[test]
    fn pool_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let owner = Keypair::from_seed(&[1u8; 32]);
        let (tx, delta) = spend(Outpoint::new(TxHash::from_bytes([2u8; 32]), 0), &owner, 9);
        {
            let store = SledStore::open(dir.path()).expect("should open store");
            store.commit_delta(&tx, &delta).unwrap();
        }
        let store = SledStore::open(dir.path()).expect("should reopen store");
        assert!(store.lookup_existence(&tx.hash()).unwrap().in_pool);
        assert_eq!(store.stats().unwrap().pool_txs, 1);
    }
}
