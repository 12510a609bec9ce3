//! Core value types for Tally transactions.
//!
//! These are the vocabulary of the output set: hashes that name things,
//! outpoints that reference prior outputs, and the outputs themselves.
//! Everything here is immutable once constructed and cheap to clone.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::config::{ASSET_ID_DOMAIN, ISSUANCE_KEY_DOMAIN};
use crate::crypto::hash::{hex_bytes, tagged_hash};
use crate::crypto::PublicKey;

// ---------------------------------------------------------------------------
// 32-byte identifiers
// ---------------------------------------------------------------------------

macro_rules! hash_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name([u8; 32]);

        impl $name {
            pub const fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
                let mut bytes = [0u8; 32];
                hex::decode_to_slice(s, &mut bytes)?;
                Ok(Self(bytes))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), &self.to_hex()[..16])
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                hex_bytes::serialize(self.0, serializer)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                hex_bytes::deserialize_32(deserializer).map(Self)
            }
        }
    };
}

hash_newtype!(
    /// Content hash of a transaction: domain-tagged BLAKE3 over its
    /// signable bytes. Witnesses are excluded, so signing never changes it.
    TxHash
);

hash_newtype!(
    /// Identifier of an asset. Derived from the issuer's public key, so
    /// only the issuer can create new units.
    AssetId
);

hash_newtype!(
    /// Unique fingerprint of one issuance input. Each key may be used at
    /// most once across pool and chain; reuse would mint the same value twice.
    IssuanceKey
);

impl AssetId {
    /// The asset controlled by `issuer`.
    pub fn from_issuer(issuer: &PublicKey) -> Self {
        Self(tagged_hash(ASSET_ID_DOMAIN, issuer.as_bytes()))
    }
}

// ---------------------------------------------------------------------------
// Outpoint
// ---------------------------------------------------------------------------

/// Reference to one output of one prior transaction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Outpoint {
    pub tx_hash: TxHash,
    pub index: u32,
}

/// Width of [`Outpoint::to_key`].
pub const OUTPOINT_KEY_LEN: usize = 36;

impl Outpoint {
    pub fn new(tx_hash: TxHash, index: u32) -> Self {
        Self { tx_hash, index }
    }

    /// Fixed-width storage key: hash followed by big-endian index, so keys of
    /// the same transaction sort together in index order.
    pub fn to_key(&self) -> [u8; OUTPOINT_KEY_LEN] {
        let mut key = [0u8; OUTPOINT_KEY_LEN];
        key[..32].copy_from_slice(self.tx_hash.as_bytes());
        key[32..].copy_from_slice(&self.index.to_be_bytes());
        key
    }

    /// Inverse of [`Outpoint::to_key`]. Returns `None` on a malformed key.
    pub fn from_key(key: &[u8]) -> Option<Self> {
        if key.len() != OUTPOINT_KEY_LEN {
            return None;
        }
        let hash: [u8; 32] = key[..32].try_into().ok()?;
        let index: [u8; 4] = key[32..].try_into().ok()?;
        Some(Self::new(TxHash(hash), u32::from_be_bytes(index)))
    }
}

impl fmt::Display for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_hash, self.index)
    }
}

impl fmt::Debug for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Outpoint({}:{})", &self.tx_hash.to_hex()[..16], self.index)
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// A unit of value: `amount` of `asset`, spendable by whoever holds the
/// secret key for `control`.
///
/// `amount` is always an integer in the asset's smallest unit. No floating
/// point anywhere near money.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub asset: AssetId,
    pub amount: u64,
    pub control: PublicKey,
}

impl Output {
    pub fn new(asset: AssetId, amount: u64, control: PublicKey) -> Self {
        Self {
            asset,
            amount,
            control,
        }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} to {}",
            self.amount,
            &self.asset.to_hex()[..16],
            &self.control.to_hex()[..16]
        )
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One transaction input: either the consumption of a prior output or the
/// issuance of new units.
///
/// Externally tagged (`{"spend": {...}}`) so the same derive works for JSON
/// files and for bincode in sled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Input {
    /// Consume the output at `outpoint`. The witness must be signed by the
    /// output's control key.
    Spend { outpoint: Outpoint },

    /// Create `amount` new units of `asset`. The witness must be signed by
    /// `issuer`, and `asset` must equal `AssetId::from_issuer(issuer)`.
    /// `nonce` distinguishes otherwise identical issuances.
    Issue {
        asset: AssetId,
        amount: u64,
        issuer: PublicKey,
        nonce: u64,
    },
}

impl Input {
    pub fn spend(outpoint: Outpoint) -> Self {
        Self::Spend { outpoint }
    }

    /// The outpoint this input consumes, if it is a spend.
    pub fn outpoint(&self) -> Option<&Outpoint> {
        match self {
            Self::Spend { outpoint } => Some(outpoint),
            Self::Issue { .. } => None,
        }
    }

    /// The issuance key of this input, if it is an issuance. The key binds
    /// the transaction's time window so that two issuances with the same
    /// nonce but different windows stay distinct.
    pub fn issuance_key(&self, min_time: u64, max_time: u64) -> Option<IssuanceKey> {
        match self {
            Self::Spend { .. } => None,
            Self::Issue {
                asset,
                amount,
                issuer: _,
                nonce,
            } => {
                let mut buf = Vec::with_capacity(32 + 8 * 4);
                buf.extend_from_slice(asset.as_bytes());
                buf.extend_from_slice(&amount.to_le_bytes());
                buf.extend_from_slice(&nonce.to_le_bytes());
                buf.extend_from_slice(&min_time.to_le_bytes());
                buf.extend_from_slice(&max_time.to_le_bytes());
                Some(IssuanceKey(tagged_hash(ISSUANCE_KEY_DOMAIN, &buf)))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
