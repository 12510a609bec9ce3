//! Transaction signing with Ed25519 keypairs.
//!
//! Signing is a separate step from building because the controlling keys
//! may not be available at construction time. Every input gets its own
//! witness, produced over the same [`Transaction::signable_bytes`].

use thiserror::Error;

use super::builder::Transaction;
use crate::crypto::Keypair;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SigningError {
    /// The number of signers does not match the number of inputs.
    #[error("expected {expected} signers (one per input), got {got}")]
    SignerCountMismatch { expected: usize, got: usize },

    #[error("input index {index} out of range ({inputs} inputs)")]
    InputOutOfRange { index: usize, inputs: usize },
}

/// Signs every input of `tx`. `signers[i]` must hold the key controlling
/// input `i`: the spent output's control key, or the issuer for an issuance.
///
/// Mismatched keys are not detected here; the validator rejects them.
pub fn sign_transaction(tx: &mut Transaction, signers: &[&Keypair]) -> Result<(), SigningError> {
    if signers.len() != tx.inputs.len() {
        return Err(SigningError::SignerCountMismatch {
            expected: tx.inputs.len(),
            got: signers.len(),
        });
    }

    let signable = tx.signable_bytes();
    tx.witnesses = signers.iter().map(|kp| kp.sign(&signable)).collect();
    Ok(())
}

/// Signs a single input in place, leaving the other witnesses untouched.
pub fn sign_input(tx: &mut Transaction, index: usize, signer: &Keypair) -> Result<(), SigningError> {
    if index >= tx.inputs.len() {
        return Err(SigningError::InputOutOfRange {
            index,
            inputs: tx.inputs.len(),
        });
    }
    if tx.witnesses.len() != tx.inputs.len() {
        tx.witnesses
            .resize(tx.inputs.len(), crate::crypto::Signature::empty());
    }
    let signable = tx.signable_bytes();
    tx.witnesses[index] = signer.sign(&signable);
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
