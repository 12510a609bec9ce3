//! # State Module
//!
//! Read-only views over the output set, and the overlay an admission
//! attempt writes into.
//!
//! ## Architecture
//!
//! ```text
//! view.rs     — View / ViewMut traits and the tri-state Lookup
//! memview.rs  — MemView overlay and the Delta it freezes into
//! compose.rs  — compose(overlay, base) and layered(r1, r2, …)
//! snapshot.rs — SnapshotView and ViewScope, the narrow store answers
//! ```
//!
//! ## Design Decisions
//!
//! - Lookups are tri-state (`Unspent`, `Spent`, `Absent`). A layer that
//!   knows an output is gone must be able to override one that still holds
//!   it; a layer that knows nothing must not.
//! - Views are plain traits, not trait objects by default. The pipeline
//!   only reaches for `dyn View` at the validator boundary.
//! - Nothing in this module does I/O. Stores produce snapshots up front,
//!   so validation never blocks on storage.

pub mod compose;
pub mod memview;
pub mod snapshot;
pub mod view;

pub use compose::{compose, layered, Composed, Layered};
pub use memview::{Delta, MemView};
pub use snapshot::{SnapshotView, ViewScope};
pub use view::{EmptyView, Lookup, View, ViewMut};
