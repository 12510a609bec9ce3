//! The in-memory overlay one admission attempt writes into.
//!
//! ```text
//! ┌─────────────────┐
//! │  MemView        │  ← consumed / created / issuances of ONE attempt
//! └────────┬────────┘
//!          │ fallback (via Composed)
//! ┌────────▼────────┐
//! │  pool ▸ chain   │  ← narrow read-only snapshots
//! └─────────────────┘
//! ```
//!
//! A `MemView` is single-use: it is discarded when the attempt fails and
//! converted into a [`Delta`] for the store when it succeeds.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::view::{Lookup, View, ViewMut};
use crate::transaction::{IssuanceKey, Outpoint, Output};

/// Mutations recorded by one admission attempt.
///
/// Ordered collections keep the resulting [`Delta`] deterministic, which
/// matters for stores that write it as one batch.
#[derive(Debug, Clone, Default)]
pub struct MemView {
    consumed: BTreeSet<Outpoint>,
    created: BTreeMap<Outpoint, Output>,
    issuances: BTreeSet<IssuanceKey>,
}

impl MemView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty() && self.created.is_empty() && self.issuances.is_empty()
    }

    pub fn consumed(&self) -> impl Iterator<Item = &Outpoint> + '_ {
        self.consumed.iter()
    }

    pub fn created(&self) -> impl Iterator<Item = (&Outpoint, &Output)> + '_ {
        self.created.iter()
    }

    pub fn issuances(&self) -> impl Iterator<Item = &IssuanceKey> + '_ {
        self.issuances.iter()
    }

    /// Freeze the overlay into the delta a store commits.
    pub fn into_delta(self) -> Delta {
        Delta {
            consumed: self.consumed.into_iter().collect(),
            created: self.created.into_iter().collect(),
            issuances: self.issuances.into_iter().collect(),
        }
    }
}

impl View for MemView {
    fn lookup(&self, outpoint: &Outpoint) -> Lookup {
        if self.consumed.contains(outpoint) {
            return Lookup::Spent;
        }
        match self.created.get(outpoint) {
            Some(output) => Lookup::Unspent(output.clone()),
            None => Lookup::Absent,
        }
    }

    fn issuance_used(&self, key: &IssuanceKey) -> bool {
        self.issuances.contains(key)
    }
}

impl ViewMut for MemView {
    fn consume(&mut self, outpoint: Outpoint) {
        // An output created and spent inside the same overlay never needs to
        // reach the store at all.
        if self.created.remove(&outpoint).is_none() {
            self.consumed.insert(outpoint);
        }
    }

    fn create(&mut self, outpoint: Outpoint, output: Output) {
        self.consumed.remove(&outpoint);
        self.created.insert(outpoint, output);
    }

    fn record_issuance(&mut self, key: IssuanceKey) {
        self.issuances.insert(key);
    }
}

/// The durable effect of one admitted transaction: what it consumed, what it
/// created, and which issuance keys it used. Lists are sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    pub consumed: Vec<Outpoint>,
    pub created: Vec<(Outpoint, Output)>,
    pub issuances: Vec<IssuanceKey>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty() && self.created.is_empty() && self.issuances.is_empty()
    }
}
