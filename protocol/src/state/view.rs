//! The read capability over the output set, and its mutable extension.

use crate::transaction::{IssuanceKey, Outpoint, Output};

/// Result of looking an outpoint up in a [`View`].
///
/// `Spent` and `Absent` are deliberately distinct: a layer that knows an
/// output was consumed must be able to shadow a lower layer that still
/// holds it as unspent, while a layer that simply knows nothing about the
/// outpoint defers to the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The output exists and has not been consumed.
    Unspent(Output),
    /// The output existed but this layer records it as consumed.
    Spent,
    /// This layer has no record of the outpoint.
    Absent,
}

impl Lookup {
    pub fn is_unspent(&self) -> bool {
        matches!(self, Self::Unspent(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// The output if it is spendable, `None` for `Spent` and `Absent`.
    pub fn into_output(self) -> Option<Output> {
        match self {
            Self::Unspent(output) => Some(output),
            Self::Spent | Self::Absent => None,
        }
    }
}

/// A read-only snapshot of (part of) the output set.
pub trait View {
    /// Does `outpoint` exist, is it unspent, and what does it hold?
    fn lookup(&self, outpoint: &Outpoint) -> Lookup;

    /// Has the issuance identified by `key` already been used?
    fn issuance_used(&self, key: &IssuanceKey) -> bool;
}

/// A [`View`] whose topmost layer records mutations.
///
/// Mutations never reach the layers below; they land in an in-memory
/// overlay that the caller flushes (or discards) explicitly.
pub trait ViewMut: View {
    /// Mark `outpoint` as consumed.
    fn consume(&mut self, outpoint: Outpoint);

    /// Record a newly created output.
    fn create(&mut self, outpoint: Outpoint, output: Output);

    /// Mark an issuance key as used.
    fn record_issuance(&mut self, key: IssuanceKey);
}

impl<V: View + ?Sized> View for &V {
    fn lookup(&self, outpoint: &Outpoint) -> Lookup {
        (**self).lookup(outpoint)
    }

    fn issuance_used(&self, key: &IssuanceKey) -> bool {
        (**self).issuance_used(key)
    }
}

impl<V: View + ?Sized> View for Box<V> {
    fn lookup(&self, outpoint: &Outpoint) -> Lookup {
        (**self).lookup(outpoint)
    }

    fn issuance_used(&self, key: &IssuanceKey) -> bool {
        (**self).issuance_used(key)
    }
}

/// The view of nothing. Useful as the base of a standalone overlay.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyView;

impl View for EmptyView {
    fn lookup(&self, _outpoint: &Outpoint) -> Lookup {
        Lookup::Absent
    }

    fn issuance_used(&self, _key: &IssuanceKey) -> bool {
        false
    }
}
