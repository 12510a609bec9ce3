//! # Transaction Module
//!
//! The data model of the output set and the transactions that move value
//! through it.
//!
//! ## Architecture
//!
//! ```text
//! types.rs   — TxHash, AssetId, IssuanceKey, Outpoint, Output, Input
//! builder.rs — Transaction and the fluent TransactionBuilder
//! signing.rs — Per-input Ed25519 witnesses
//! ```
//!
//! ## Design Decisions
//!
//! - Transaction hashes are domain-tagged BLAKE3 over a hand-rolled canonical
//!   encoding that excludes witnesses, so the hash is known before signing.
//! - Amounts are `u64` in the asset's smallest unit.
//! - A transaction is immutable once built; admission only reads it.

pub mod builder;
pub mod signing;
pub mod types;

pub use builder::{Transaction, TransactionBuilder};
pub use signing::{sign_input, sign_transaction, SigningError};
pub use types::{AssetId, Input, IssuanceKey, Outpoint, Output, TxHash};
