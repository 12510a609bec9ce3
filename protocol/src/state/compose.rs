//! View combinators.
//!
//! - [`compose`] stacks a mutable [`MemView`] on a read-only base. The overlay
//!   always wins: consumed means spent, created means unspent, anything else
//!   falls through to the base.
//! - [`layered`] merges read-only views in a fixed order. The first layer
//!   with an opinion (anything but [`Lookup::Absent`]) wins, so a `Spent`
//!   record in the pool hides the still-unspent chain record below it.

use super::memview::MemView;
use super::view::{Lookup, View, ViewMut};
use crate::transaction::{IssuanceKey, Outpoint, Output};

// ---------------------------------------------------------------------------
// Composed
// ---------------------------------------------------------------------------

/// A [`MemView`] stacked on top of a read-only base.
#[derive(Debug)]
pub struct Composed<B> {
    overlay: MemView,
    base: B,
}

/// Stack `overlay` on `base`. Mutations through the result go to the
/// overlay only.
pub fn compose<B: View>(overlay: MemView, base: B) -> Composed<B> {
    Composed { overlay, base }
}

impl<B> Composed<B> {
    pub fn overlay(&self) -> &MemView {
        &self.overlay
    }

    pub fn base(&self) -> &B {
        &self.base
    }

    /// Take the overlay back, dropping the base.
    pub fn into_overlay(self) -> MemView {
        self.overlay
    }
}

impl<B: View> View for Composed<B> {
    fn lookup(&self, outpoint: &Outpoint) -> Lookup {
        match self.overlay.lookup(outpoint) {
            Lookup::Absent => self.base.lookup(outpoint),
            hit => hit,
        }
    }

    fn issuance_used(&self, key: &IssuanceKey) -> bool {
        self.overlay.issuance_used(key) || self.base.issuance_used(key)
    }
}

impl<B: View> ViewMut for Composed<B> {
    fn consume(&mut self, outpoint: Outpoint) {
        self.overlay.consume(outpoint);
    }

    fn create(&mut self, outpoint: Outpoint, output: Output) {
        self.overlay.create(outpoint, output);
    }

    fn record_issuance(&mut self, key: IssuanceKey) {
        self.overlay.record_issuance(key);
    }
}

// ---------------------------------------------------------------------------
// Layered
// ---------------------------------------------------------------------------

/// Read-only views consulted top-down in a fixed order.
pub struct Layered<'a> {
    layers: Vec<&'a dyn View>,
}

/// Merge `layers`, highest precedence first.
pub fn layered<'a>(layers: impl IntoIterator<Item = &'a dyn View>) -> Layered<'a> {
    Layered {
        layers: layers.into_iter().collect(),
    }
}

impl Layered<'_> {
    pub fn depth(&self) -> usize {
        self.layers.len()
    }
}

impl std::fmt::Debug for Layered<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layered")
            .field("depth", &self.layers.len())
            .finish()
    }
}

impl View for Layered<'_> {
    fn lookup(&self, outpoint: &Outpoint) -> Lookup {
        for layer in &self.layers {
            match layer.lookup(outpoint) {
                Lookup::Absent => continue,
                hit => return hit,
            }
        }
        Lookup::Absent
    }

    fn issuance_used(&self, key: &IssuanceKey) -> bool {
        self.layers.iter().any(|layer| layer.issuance_used(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::state::snapshot::SnapshotView;
    use crate::state::view::EmptyView;
    use crate::transaction::{AssetId, TxHash};

    fn output(amount: u64) -> Output {
        let key = Keypair::from_seed(&[6u8; 32]).public_key();
        Output::new(AssetId::from_issuer(&key), amount, key)
    }

    fn op(n: u8) -> Outpoint {
        Outpoint::new(TxHash::from_bytes([n; 32]), 0)
    }

    #[test]
    fn overlay_consumption_hides_base_output() {
        let mut chain = SnapshotView::new();
        chain.insert_unspent(op(1), output(100));

        let mut view = compose(MemView::new(), &chain);
        assert!(view.lookup(&op(1)).is_unspent());

        view.consume(op(1));
        assert_eq!(view.lookup(&op(1)), Lookup::Spent);
        // The base is untouched.
        assert!(chain.lookup(&op(1)).is_unspent());
    }

    #[test]
    fn overlay_creation_is_visible() {
        let mut view = compose(MemView::new(), EmptyView);
        view.create(op(2), output(60));
        assert_eq!(view.lookup(&op(2)), Lookup::Unspent(output(60)));
    }

    #[test]
    fn unknown_outpoints_fall_through_to_base() {
        let mut base = SnapshotView::new();
        base.insert_unspent(op(3), output(5));
        let view = compose(MemView::new(), &base);
        assert_eq!(view.lookup(&op(3)), Lookup::Unspent(output(5)));
        assert!(view.lookup(&op(4)).is_absent());
    }

    #[test]
    fn composed_issuance_is_union() {
        let k_base = IssuanceKey::from_bytes([1u8; 32]);
        let k_overlay = IssuanceKey::from_bytes([2u8; 32]);
        let mut base = SnapshotView::new();
        base.mark_issuance_used(k_base);

        let mut view = compose(MemView::new(), &base);
        view.record_issuance(k_overlay);
        assert!(view.issuance_used(&k_base));
        assert!(view.issuance_used(&k_overlay));
        assert!(!view.issuance_used(&IssuanceKey::from_bytes([3u8; 32])));
    }

    #[test]
    fn pool_spent_shadows_chain_unspent() {
        let mut pool = SnapshotView::new();
        pool.insert_spent(op(1));
        let mut chain = SnapshotView::new();
        chain.insert_unspent(op(1), output(100));

        let reader = layered([&pool as &dyn View, &chain]);
        assert_eq!(reader.lookup(&op(1)), Lookup::Spent);
    }

    #[test]
    fn pool_output_visible_before_chain() {
        let mut pool = SnapshotView::new();
        pool.insert_unspent(op(7), output(60));
        let chain = SnapshotView::new();

        let reader = layered([&pool as &dyn View, &chain]);
        assert_eq!(reader.lookup(&op(7)), Lookup::Unspent(output(60)));
    }

    #[test]
    fn layered_falls_back_in_order() {
        let first = SnapshotView::new();
        let mut second = SnapshotView::new();
        second.insert_unspent(op(1), output(1));
        let mut third = SnapshotView::new();
        third.insert_unspent(op(1), output(3));
        third.insert_unspent(op(2), output(2));

        let reader = layered([&first as &dyn View, &second, &third]);
        assert_eq!(reader.depth(), 3);
        assert_eq!(reader.lookup(&op(1)), Lookup::Unspent(output(1)));
        assert_eq!(reader.lookup(&op(2)), Lookup::Unspent(output(2)));
        assert!(reader.lookup(&op(9)).is_absent());
    }

    #[test]
    fn full_stack_overlay_over_pool_over_chain() {
        let mut pool = SnapshotView::new();
        pool.insert_unspent(op(2), output(60));
        let mut chain = SnapshotView::new();
        chain.insert_unspent(op(1), output(100));

        let mut view = compose(MemView::new(), layered([&pool as &dyn View, &chain]));
        view.consume(op(2));
        view.create(op(3), output(60));

        assert_eq!(view.lookup(&op(2)), Lookup::Spent);
        assert!(view.lookup(&op(1)).is_unspent());
        assert!(view.lookup(&op(3)).is_unspent());

        let delta = view.into_overlay().into_delta();
        assert_eq!(delta.consumed, vec![op(2)]);
        assert_eq!(delta.created.len(), 1);
    }
}
