//! # Admission Module
//!
//! Takes a transaction, decides whether it may enter the pool, and if so
//! makes its effects durable and tells whoever asked to be told.
//!
//! ## Architecture
//!
//! ```text
//! engine.rs    — AdmissionEngine: admit, admit_with_cancel, admit_batch
//! error.rs     — Admission, AdmissionError, Stage
//! callbacks.rs — CallbackRegistry, frozen at build time
//! clock.rs     — Clock trait, SystemClock, FixedClock
//! ```
//!
//! ## Design Decisions
//!
//! 1. **Snapshot, then overlay.** The engine asks the store for narrow pool
//!    and chain snapshots, stacks an empty overlay on top, and lets the
//!    validator read and write that. Storage is touched again only to commit.
//!
//! 2. **The store arbitrates races.** Two admissions that validated against
//!    the same snapshot meet in `commit_delta`, which re-checks under its own
//!    lock or transaction. The engine itself is lock-free.
//!
//! 3. **Duplicates are success.** Re-submitting a known transaction returns
//!    `Ok(Duplicate)`. It changes nothing and notifies nobody.
//!
//! 4. **Notify after durable.** Callbacks run only once the commit has
//!    returned `Committed`, synchronously, in registration order.

pub mod callbacks;
pub mod clock;
pub mod engine;
pub mod error;

pub use callbacks::{CallbackRegistry, TxCallback};
pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{AdmissionEngine, AdmissionEngineBuilder, AdmissionResult};
pub use error::{Admission, AdmissionError, Stage};
