//! # Validation Module
//!
//! The rules a transaction must satisfy before it may enter the pool, and
//! the step that records its effects into an overlay.
//!
//! ## Architecture
//!
//! ```text
//! mod.rs   — the Validator trait
//! error.rs — RuleViolation (rejections) and ApplyError (defects)
//! basic.rs — BasicValidator, the reference rule set
//! ```
//!
//! ## Design Decisions
//!
//! - `validate` is pure: it reads a [`View`] and the clock reading it is
//!   given, and never touches storage or time itself.
//! - `apply` only mutates the topmost overlay of a [`ViewMut`]. The layers
//!   below are read-only snapshots, so a failed admission leaves nothing
//!   behind.
//! - The validator is pluggable. The pipeline is generic over it and never
//!   inspects rule details beyond the returned error.

pub mod basic;
pub mod error;

pub use basic::BasicValidator;
pub use error::{ApplyError, RuleViolation};

use crate::state::{View, ViewMut};
use crate::transaction::Transaction;

/// Ledger rules over a view of the output set.
pub trait Validator: Send + Sync {
    /// Check `tx` against `view` as of unix second `now`.
    fn validate(&self, view: &dyn View, tx: &Transaction, now: u64) -> Result<(), RuleViolation>;

    /// Record the effects of an already-validated `tx` into `view`: consume
    /// its spend inputs, mark its issuance keys used and create its outputs.
    fn apply(&self, view: &mut dyn ViewMut, tx: &Transaction) -> Result<(), ApplyError>;
}

impl<T: Validator + ?Sized> Validator for std::sync::Arc<T> {
    fn validate(&self, view: &dyn View, tx: &Transaction, now: u64) -> Result<(), RuleViolation> {
        (**self).validate(view, tx, now)
    }

    fn apply(&self, view: &mut dyn ViewMut, tx: &Transaction) -> Result<(), ApplyError> {
        (**self).apply(view, tx)
    }
}
