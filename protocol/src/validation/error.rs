//! Validation and apply errors.

use thiserror::Error;

use crate::transaction::{AssetId, IssuanceKey, Outpoint};

/// Why a transaction was rejected.
///
/// Each variant maps to one rule of [`BasicValidator`](super::BasicValidator).
/// A rejection is permanent: resubmitting the same bytes yields the same
/// answer until the view or the clock moves.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleViolation {
    #[error("unsupported transaction version {version}")]
    UnsupportedVersion { version: u16 },

    #[error("transaction has no inputs")]
    NoInputs,

    #[error("transaction has no outputs")]
    NoOutputs,

    #[error("too many inputs: {count} (max {max})")]
    TooManyInputs { count: usize, max: usize },

    #[error("too many outputs: {count} (max {max})")]
    TooManyOutputs { count: usize, max: usize },

    #[error("reference data too large: {len} bytes (max {max})")]
    ReferenceDataTooLarge { len: usize, max: usize },

    /// The same outpoint appears twice among the spend inputs.
    #[error("outpoint {outpoint} is spent twice by the same transaction")]
    DuplicateInput { outpoint: Outpoint },

    /// Two issuance inputs of the same transaction share a key.
    #[error("issuance {key} appears twice in the same transaction")]
    DuplicateIssuance { key: IssuanceKey },

    #[error("expected {inputs} witnesses (one per input), got {witnesses}")]
    WitnessCountMismatch { inputs: usize, witnesses: usize },

    #[error("invalid time window: min_time {min_time} is after max_time {max_time}")]
    InvalidTimeWindow { min_time: u64, max_time: u64 },

    #[error("not valid before {min_time} (now {now})")]
    NotYetValid { min_time: u64, now: u64 },

    #[error("expired at {max_time} (now {now})")]
    Expired { max_time: u64, now: u64 },

    /// Issuance inputs require a bounded `max_time`.
    #[error("issuance requires a bounded max_time")]
    UnboundedIssuance,

    #[error("issuance {key} has already been used")]
    IssuanceReused { key: IssuanceKey },

    /// The outpoint exists but another transaction already consumed it.
    #[error("double spend of {outpoint}")]
    DoubleSpend { outpoint: Outpoint },

    /// Neither pool nor chain knows the outpoint.
    #[error("input {outpoint} does not exist")]
    MissingInput { outpoint: Outpoint },

    #[error("output {index} has zero amount")]
    ZeroAmountOutput { index: usize },

    #[error("issuance input {index} has zero amount")]
    ZeroAmountIssuance { index: usize },

    #[error("amount overflow summing asset {asset}")]
    AmountOverflow { asset: AssetId },

    #[error("asset {asset} not conserved: inputs {inputs}, outputs {outputs}")]
    ValueNotConserved {
        asset: AssetId,
        inputs: u64,
        outputs: u64,
    },

    /// An issuance input names an asset the issuer does not control.
    #[error("issuance input {index} names an asset its issuer does not control")]
    IssuerMismatch { index: usize },

    #[error("witness {index} does not verify")]
    InvalidWitness { index: usize },
}

/// A failure while applying an already-validated transaction.
///
/// Seeing one of these means the validator accepted something its own
/// apply step cannot honor. It is a defect, not a rejection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApplyError {
    #[error("apply found input {outpoint} missing or spent")]
    MissingInput { outpoint: Outpoint },

    #[error("apply found issuance {key} already used")]
    IssuanceAlreadyUsed { key: IssuanceKey },

    #[error("output count {count} exceeds the outpoint index space")]
    OutputIndexOverflow { count: usize },
}
