//! # Cryptographic Primitives
//!
//! Thin, type-safe wrappers over audited implementations:
//!
//! - **Ed25519** (`ed25519-dalek`) for output control and issuance
//!   authorization.
//! - **BLAKE3** for transaction hashes, asset ids and issuance keys.

pub mod hash;
pub mod keys;

pub use hash::{blake3_hash, blake3_hash_multi, tagged_hash};
pub use keys::{KeyError, Keypair, PublicKey, Signature};
