//! Transaction construction via the builder pattern.
//!
//! The [`TransactionBuilder`] assembles inputs, outputs and the time window,
//! and `.build()` returns an unsigned [`Transaction`] with one empty witness
//! slot per input. Signing happens separately in [`super::signing`], which
//! keeps construction testable without key material.

use serde::{Deserialize, Serialize};

use super::types::{AssetId, Input, IssuanceKey, Outpoint, Output, TxHash};
use crate::config::{TX_HASH_DOMAIN, TX_VERSION};
use crate::crypto::hash::{hex_bytes, tagged_hash};
use crate::crypto::{PublicKey, Signature};

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A Tally transaction: consumes prior outputs (or issues new units) and
/// creates new outputs.
///
/// The transaction hash covers every field except `witnesses`, so it is
/// stable across signing. Admission never mutates a transaction.
///
/// # Canonical Byte Format
///
/// [`Transaction::signable_bytes`] serializes, in order: version (u16 LE),
/// input count (u32 LE) and each input, output count (u32 LE) and each
/// output, `min_time`, `max_time` (u64 LE), then length-prefixed
/// `reference_data`. Spend inputs are `0x00 ‖ outpoint key`; issuance inputs
/// are `0x01 ‖ asset ‖ amount ‖ issuer ‖ nonce`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Format version. See [`TX_VERSION`].
    pub version: u16,

    /// Ordered inputs.
    pub inputs: Vec<Input>,

    /// Ordered outputs. Output `i` becomes outpoint `(hash, i)`.
    pub outputs: Vec<Output>,

    /// Earliest unix second at which the transaction is valid. 0 = unbounded.
    pub min_time: u64,

    /// Latest unix second at which the transaction is valid. 0 = unbounded.
    pub max_time: u64,

    /// Opaque application data, covered by the hash.
    #[serde(with = "hex_bytes", default)]
    pub reference_data: Vec<u8>,

    /// One signature per input, over [`Transaction::signable_bytes`].
    pub witnesses: Vec<Signature>,
}

impl Transaction {
    /// Canonical byte representation used for hashing and signing.
    ///
    /// Hand-rolled rather than serde so that the encoding can never drift
    /// with a serializer upgrade.
    pub fn signable_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(
            64 + self.inputs.len() * 81 + self.outputs.len() * 72 + self.reference_data.len(),
        );

        buf.extend_from_slice(&self.version.to_le_bytes());

        buf.extend_from_slice(&(self.inputs.len() as u32).to_le_bytes());
        for input in &self.inputs {
            match input {
                Input::Spend { outpoint } => {
                    buf.push(0x00);
                    buf.extend_from_slice(&outpoint.to_key());
                }
                Input::Issue {
                    asset,
                    amount,
                    issuer,
                    nonce,
                } => {
                    buf.push(0x01);
                    buf.extend_from_slice(asset.as_bytes());
                    buf.extend_from_slice(&amount.to_le_bytes());
                    buf.extend_from_slice(issuer.as_bytes());
                    buf.extend_from_slice(&nonce.to_le_bytes());
                }
            }
        }

        buf.extend_from_slice(&(self.outputs.len() as u32).to_le_bytes());
        for output in &self.outputs {
            buf.extend_from_slice(output.asset.as_bytes());
            buf.extend_from_slice(&output.amount.to_le_bytes());
            buf.extend_from_slice(output.control.as_bytes());
        }

        buf.extend_from_slice(&self.min_time.to_le_bytes());
        buf.extend_from_slice(&self.max_time.to_le_bytes());

        buf.extend_from_slice(&(self.reference_data.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.reference_data);

        buf
    }

    /// The transaction's content hash.
    pub fn hash(&self) -> TxHash {
        TxHash::from_bytes(tagged_hash(TX_HASH_DOMAIN, &self.signable_bytes()))
    }

    /// Outpoint naming output `index` of this transaction.
    pub fn outpoint(&self, index: u32) -> Outpoint {
        Outpoint::new(self.hash(), index)
    }

    /// Outpoints consumed by this transaction's spend inputs, in input order.
    pub fn spent_outpoints(&self) -> impl Iterator<Item = &Outpoint> + '_ {
        self.inputs.iter().filter_map(Input::outpoint)
    }

    /// Issuance keys of this transaction's issuance inputs, in input order.
    pub fn issuance_keys(&self) -> impl Iterator<Item = IssuanceKey> + '_ {
        self.inputs
            .iter()
            .filter_map(|input| input.issuance_key(self.min_time, self.max_time))
    }

    /// Returns `true` if at least one input issues new units.
    pub fn has_issuance(&self) -> bool {
        self.inputs
            .iter()
            .any(|input| matches!(input, Input::Issue { .. }))
    }

    /// Returns `true` if every witness slot holds a signature.
    pub fn is_signed(&self) -> bool {
        self.witnesses.len() == self.inputs.len() && self.witnesses.iter().all(|w| !w.is_empty())
    }
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for unsigned [`Transaction`] instances.
///
/// ```
/// use tally_protocol::crypto::Keypair;
/// use tally_protocol::transaction::{AssetId, TransactionBuilder};
///
/// let issuer = Keypair::generate();
/// let owner = Keypair::generate();
/// let asset = AssetId::from_issuer(&issuer.public_key());
///
/// let tx = TransactionBuilder::new()
///     .issue(asset, 1_000, issuer.public_key(), 1)
///     .output(asset, 1_000, owner.public_key())
///     .max_time(4_102_444_800)
///     .build();
/// assert_eq!(tx.inputs.len(), 1);
/// assert!(!tx.is_signed());
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    inputs: Vec<Input>,
    outputs: Vec<Output>,
    min_time: u64,
    max_time: u64,
    reference_data: Vec<u8>,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the output at `outpoint`.
    pub fn spend(mut self, outpoint: Outpoint) -> Self {
        self.inputs.push(Input::spend(outpoint));
        self
    }

    /// Issue `amount` new units of `asset`, authorized by `issuer`.
    pub fn issue(mut self, asset: AssetId, amount: u64, issuer: PublicKey, nonce: u64) -> Self {
        self.inputs.push(Input::Issue {
            asset,
            amount,
            issuer,
            nonce,
        });
        self
    }

    /// Append an output.
    pub fn output(mut self, asset: AssetId, amount: u64, control: PublicKey) -> Self {
        self.outputs.push(Output::new(asset, amount, control));
        self
    }

    pub fn min_time(mut self, unix_secs: u64) -> Self {
        self.min_time = unix_secs;
        self
    }

    pub fn max_time(mut self, unix_secs: u64) -> Self {
        self.max_time = unix_secs;
        self
    }

    pub fn reference_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.reference_data = data.into();
        self
    }

    /// Finish construction. Witness slots are left empty.
    pub fn build(self) -> Transaction {
        let witnesses = vec![Signature::empty(); self.inputs.len()];
        Transaction {
            version: TX_VERSION,
            inputs: self.inputs,
            outputs: self.outputs,
            min_time: self.min_time,
            max_time: self.max_time,
            reference_data: self.reference_data,
            witnesses,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
