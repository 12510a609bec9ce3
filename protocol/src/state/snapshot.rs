//! Narrow snapshots handed out by a store.
//!
//! A store never exposes its whole output set to the pipeline. It answers
//! for exactly the outpoints and issuance keys one transaction references
//! (its [`ViewScope`]) and packs the answers into an immutable
//! [`SnapshotView`]. Anything outside the scope reads as absent.

use std::collections::{HashMap, HashSet};

use super::view::{Lookup, View};
use crate::transaction::{IssuanceKey, Outpoint, Output, Transaction};

// ---------------------------------------------------------------------------
// ViewScope
// ---------------------------------------------------------------------------

/// The outpoints and issuance keys a transaction references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewScope {
    pub outpoints: Vec<Outpoint>,
    pub issuances: Vec<IssuanceKey>,
}

impl ViewScope {
    /// Scope of `tx`: its spend inputs and its issuance keys, deduplicated,
    /// first occurrence first.
    pub fn for_tx(tx: &Transaction) -> Self {
        let mut seen = HashSet::new();
        let outpoints = tx
            .spent_outpoints()
            .filter(|op| seen.insert(**op))
            .copied()
            .collect();

        let mut seen = HashSet::new();
        let issuances = tx.issuance_keys().filter(|k| seen.insert(*k)).collect();

        Self {
            outpoints,
            issuances,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.outpoints.is_empty() && self.issuances.is_empty()
    }
}

// ---------------------------------------------------------------------------
// SnapshotView
// ---------------------------------------------------------------------------

/// An immutable answer sheet for one [`ViewScope`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotView {
    entries: HashMap<Outpoint, Lookup>,
    used_issuances: HashSet<IssuanceKey>,
}

impl SnapshotView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `outpoint` as holding an unspent `output`.
    pub fn insert_unspent(&mut self, outpoint: Outpoint, output: Output) {
        self.entries.insert(outpoint, Lookup::Unspent(output));
    }

    /// Record `outpoint` as consumed at this layer.
    pub fn insert_spent(&mut self, outpoint: Outpoint) {
        self.entries.insert(outpoint, Lookup::Spent);
    }

    pub fn mark_issuance_used(&mut self, key: IssuanceKey) {
        self.used_issuances.insert(key);
    }

    /// Number of outpoints this snapshot has an opinion on.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.used_issuances.is_empty()
    }
}

impl View for SnapshotView {
    fn lookup(&self, outpoint: &Outpoint) -> Lookup {
        self.entries.get(outpoint).cloned().unwrap_or(Lookup::Absent)
    }

    fn issuance_used(&self, key: &IssuanceKey) -> bool {
        self.used_issuances.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::transaction::{AssetId, TransactionBuilder, TxHash};

    #[test]
    fn scope_collects_spends_and_issuances() {
        let issuer = Keypair::from_seed(&[8u8; 32]);
        let asset = AssetId::from_issuer(&issuer.public_key());
        let a = Outpoint::new(TxHash::from_bytes([1u8; 32]), 0);
        let b = Outpoint::new(TxHash::from_bytes([1u8; 32]), 1);

        let tx = TransactionBuilder::new()
            .spend(a)
            .issue(asset, 3, issuer.public_key(), 1)
            .spend(b)
            .spend(a)
            .output(asset, 3, issuer.public_key())
            .max_time(10)
            .build();

        let scope = ViewScope::for_tx(&tx);
        assert_eq!(scope.outpoints, vec![a, b]);
        assert_eq!(scope.issuances.len(), 1);
        assert!(!scope.is_empty());
    }

    #[test]
    fn snapshot_reports_only_what_it_holds() {
        let key = Keypair::from_seed(&[2u8; 32]).public_key();
        let out = Output::new(AssetId::from_issuer(&key), 9, key);
        let unspent = Outpoint::new(TxHash::from_bytes([1u8; 32]), 0);
        let spent = Outpoint::new(TxHash::from_bytes([1u8; 32]), 1);
        let other = Outpoint::new(TxHash::from_bytes([2u8; 32]), 0);

        let mut snap = SnapshotView::new();
        assert!(snap.is_empty());
        snap.insert_unspent(unspent, out.clone());
        snap.insert_spent(spent);
        snap.mark_issuance_used(IssuanceKey::from_bytes([4u8; 32]));

        assert_eq!(snap.len(), 2);
        assert_eq!(snap.lookup(&unspent), Lookup::Unspent(out));
        assert_eq!(snap.lookup(&spent), Lookup::Spent);
        assert!(snap.lookup(&other).is_absent());
        assert!(snap.issuance_used(&IssuanceKey::from_bytes([4u8; 32])));
        assert!(!snap.issuance_used(&IssuanceKey::from_bytes([5u8; 32])));
    }
}
