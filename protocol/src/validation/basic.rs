//! The reference rule set.
//!
//! [`BasicValidator`] checks a transaction against a [`View`] in a fixed
//! order, cheapest first: structure, then time, then lookups, then
//! arithmetic, and Ed25519 verification last. The first failing rule wins.

use std::collections::{BTreeMap, HashSet};

use super::error::{ApplyError, RuleViolation};
use super::Validator;
use crate::config::{ValidatorConfig, MAX_REFERENCE_DATA, TX_VERSION};
use crate::crypto::PublicKey;
use crate::state::{Lookup, View, ViewMut};
use crate::transaction::{AssetId, Input, Outpoint, Output, Transaction};

/// Validates ownership, conservation, issuance and time-window rules.
#[derive(Debug, Clone, Default)]
pub struct BasicValidator {
    config: ValidatorConfig,
}

impl BasicValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    fn check_structure(&self, tx: &Transaction) -> Result<(), RuleViolation> {
        if tx.version != TX_VERSION {
            return Err(RuleViolation::UnsupportedVersion {
                version: tx.version,
            });
        }
        if tx.inputs.is_empty() {
            return Err(RuleViolation::NoInputs);
        }
        if tx.outputs.is_empty() {
            return Err(RuleViolation::NoOutputs);
        }
        if tx.inputs.len() > self.config.max_inputs {
            return Err(RuleViolation::TooManyInputs {
                count: tx.inputs.len(),
                max: self.config.max_inputs,
            });
        }
        if tx.outputs.len() > self.config.max_outputs {
            return Err(RuleViolation::TooManyOutputs {
                count: tx.outputs.len(),
                max: self.config.max_outputs,
            });
        }
        if tx.reference_data.len() > MAX_REFERENCE_DATA {
            return Err(RuleViolation::ReferenceDataTooLarge {
                len: tx.reference_data.len(),
                max: MAX_REFERENCE_DATA,
            });
        }

        let mut spent = HashSet::new();
        for outpoint in tx.spent_outpoints() {
            if !spent.insert(outpoint) {
                return Err(RuleViolation::DuplicateInput {
                    outpoint: *outpoint,
                });
            }
        }
        let mut issued = HashSet::new();
        for key in tx.issuance_keys() {
            if !issued.insert(key) {
                return Err(RuleViolation::DuplicateIssuance { key });
            }
        }

        if tx.witnesses.len() != tx.inputs.len() {
            return Err(RuleViolation::WitnessCountMismatch {
                inputs: tx.inputs.len(),
                witnesses: tx.witnesses.len(),
            });
        }
        Ok(())
    }

    fn check_time_window(tx: &Transaction, now: u64) -> Result<(), RuleViolation> {
        if tx.max_time != 0 && tx.min_time > tx.max_time {
            return Err(RuleViolation::InvalidTimeWindow {
                min_time: tx.min_time,
                max_time: tx.max_time,
            });
        }
        if tx.min_time > now {
            return Err(RuleViolation::NotYetValid {
                min_time: tx.min_time,
                now,
            });
        }
        if tx.max_time != 0 && now > tx.max_time {
            return Err(RuleViolation::Expired {
                max_time: tx.max_time,
                now,
            });
        }
        Ok(())
    }

    fn check_issuances(&self, view: &dyn View, tx: &Transaction) -> Result<(), RuleViolation> {
        if !tx.has_issuance() {
            return Ok(());
        }
        if self.config.require_bounded_issuance && tx.max_time == 0 {
            return Err(RuleViolation::UnboundedIssuance);
        }
        for key in tx.issuance_keys() {
            if view.issuance_used(&key) {
                return Err(RuleViolation::IssuanceReused { key });
            }
        }
        Ok(())
    }

    /// Resolves every spend input against the view. The result has one slot
    /// per input; issuance slots are `None`.
    fn resolve_inputs(
        view: &dyn View,
        tx: &Transaction,
    ) -> Result<Vec<Option<Output>>, RuleViolation> {
        tx.inputs
            .iter()
            .map(|input| match input {
                Input::Spend { outpoint } => match view.lookup(outpoint) {
                    Lookup::Unspent(output) => Ok(Some(output)),
                    Lookup::Spent => Err(RuleViolation::DoubleSpend {
                        outpoint: *outpoint,
                    }),
                    Lookup::Absent => Err(RuleViolation::MissingInput {
                        outpoint: *outpoint,
                    }),
                },
                Input::Issue { .. } => Ok(None),
            })
            .collect()
    }

    fn check_amounts(tx: &Transaction, resolved: &[Option<Output>]) -> Result<(), RuleViolation> {
        if let Some(index) = tx.outputs.iter().position(|o| o.amount == 0) {
            return Err(RuleViolation::ZeroAmountOutput { index });
        }

        let mut inputs: BTreeMap<AssetId, u64> = BTreeMap::new();
        for (index, (input, spent)) in tx.inputs.iter().zip(resolved).enumerate() {
            let (asset, amount) = match (input, spent) {
                (Input::Spend { .. }, Some(output)) => (output.asset, output.amount),
                (Input::Issue { asset, amount, .. }, _) => {
                    if *amount == 0 {
                        return Err(RuleViolation::ZeroAmountIssuance { index });
                    }
                    (*asset, *amount)
                }
                // resolve_inputs fills every spend slot.
                (Input::Spend { outpoint }, None) => {
                    return Err(RuleViolation::MissingInput {
                        outpoint: *outpoint,
                    })
                }
            };
            accumulate(&mut inputs, asset, amount)?;
        }

        let mut outputs: BTreeMap<AssetId, u64> = BTreeMap::new();
        for output in &tx.outputs {
            accumulate(&mut outputs, output.asset, output.amount)?;
        }

        for (asset, &input_total) in &inputs {
            let output_total = outputs.get(asset).copied().unwrap_or(0);
            if input_total != output_total {
                return Err(RuleViolation::ValueNotConserved {
                    asset: *asset,
                    inputs: input_total,
                    outputs: output_total,
                });
            }
        }
        // Outputs of an asset no input provides.
        if let Some((asset, &output_total)) =
            outputs.iter().find(|(asset, _)| !inputs.contains_key(*asset))
        {
            return Err(RuleViolation::ValueNotConserved {
                asset: *asset,
                inputs: 0,
                outputs: output_total,
            });
        }
        Ok(())
    }

    fn check_issuers(tx: &Transaction) -> Result<(), RuleViolation> {
        for (index, input) in tx.inputs.iter().enumerate() {
            if let Input::Issue { asset, issuer, .. } = input {
                if *asset != AssetId::from_issuer(issuer) {
                    return Err(RuleViolation::IssuerMismatch { index });
                }
            }
        }
        Ok(())
    }

    fn check_witnesses(tx: &Transaction, resolved: &[Option<Output>]) -> Result<(), RuleViolation> {
        let signable = tx.signable_bytes();
        for (index, (input, spent)) in tx.inputs.iter().zip(resolved).enumerate() {
            let key: &PublicKey = match (input, spent) {
                (Input::Spend { .. }, Some(output)) => &output.control,
                (Input::Issue { issuer, .. }, _) => issuer,
                (Input::Spend { .. }, None) => return Err(RuleViolation::InvalidWitness { index }),
            };
            if !key.verify(&signable, &tx.witnesses[index]) {
                return Err(RuleViolation::InvalidWitness { index });
            }
        }
        Ok(())
    }
}

fn accumulate(
    totals: &mut BTreeMap<AssetId, u64>,
    asset: AssetId,
    amount: u64,
) -> Result<(), RuleViolation> {
    let total = totals.entry(asset).or_insert(0);
    *total = total
        .checked_add(amount)
        .ok_or(RuleViolation::AmountOverflow { asset })?;
    Ok(())
}

impl Validator for BasicValidator {
    fn validate(&self, view: &dyn View, tx: &Transaction, now: u64) -> Result<(), RuleViolation> {
        self.check_structure(tx)?;
        Self::check_time_window(tx, now)?;
        self.check_issuances(view, tx)?;
        let resolved = Self::resolve_inputs(view, tx)?;
        Self::check_amounts(tx, &resolved)?;
        Self::check_issuers(tx)?;
        Self::check_witnesses(tx, &resolved)?;
        Ok(())
    }

    fn apply(&self, view: &mut dyn ViewMut, tx: &Transaction) -> Result<(), ApplyError> {
        let count = u32::try_from(tx.outputs.len())
            .map_err(|_| ApplyError::OutputIndexOverflow {
                count: tx.outputs.len(),
            })?;

        for outpoint in tx.spent_outpoints() {
            if !view.lookup(outpoint).is_unspent() {
                return Err(ApplyError::MissingInput {
                    outpoint: *outpoint,
                });
            }
            view.consume(*outpoint);
        }

        for key in tx.issuance_keys() {
            if view.issuance_used(&key) {
                return Err(ApplyError::IssuanceAlreadyUsed { key });
            }
            view.record_issuance(key);
        }

        let hash = tx.hash();
        for (index, output) in (0..count).zip(&tx.outputs) {
            view.create(Outpoint::new(hash, index), output.clone());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::state::{compose, MemView, SnapshotView};
    use crate::transaction::{sign_transaction, TransactionBuilder, TxHash};

    const NOW: u64 = 1_700_000_000;

    struct Fixture {
        issuer: Keypair,
        alice: Keypair,
        bob: Keypair,
        asset: AssetId,
        funding: Outpoint,
        chain: SnapshotView,
    }

    fn fixture() -> Fixture {
        let issuer = Keypair::from_seed(&[1u8; 32]);
        let alice = Keypair::from_seed(&[2u8; 32]);
        let bob = Keypair::from_seed(&[3u8; 32]);
        let asset = AssetId::from_issuer(&issuer.public_key());
        let funding = Outpoint::new(TxHash::from_bytes([9u8; 32]), 0);
        let mut chain = SnapshotView::new();
        chain.insert_unspent(funding, Output::new(asset, 100, alice.public_key()));
        Fixture {
            issuer,
            alice,
            bob,
            asset,
            funding,
            chain,
        }
    }

    fn split(f: &Fixture, a: u64, b: u64) -> Transaction {
        let mut tx = TransactionBuilder::new()
            .spend(f.funding)
            .output(f.asset, a, f.bob.public_key())
            .output(f.asset, b, f.alice.public_key())
            .build();
        sign_transaction(&mut tx, &[&f.alice]).unwrap();
        tx
    }

    fn validate(f: &Fixture, tx: &Transaction) -> Result<(), RuleViolation> {
        BasicValidator::default().validate(&f.chain, tx, NOW)
    }

    #[test]
    fn accepts_balanced_signed_spend() {
        let f = fixture();
        assert_eq!(validate(&f, &split(&f, 60, 40)), Ok(()));
    }

    #[test]
    fn rejects_unbalanced_spend() {
        let f = fixture();
        assert_eq!(
            validate(&f, &split(&f, 60, 41)),
            Err(RuleViolation::ValueNotConserved {
                asset: f.asset,
                inputs: 100,
                outputs: 101
            })
        );
    }

    #[test]
    fn rejects_output_of_unfunded_asset() {
        let f = fixture();
        let other = AssetId::from_issuer(&f.bob.public_key());
        let mut tx = TransactionBuilder::new()
            .spend(f.funding)
            .output(f.asset, 100, f.bob.public_key())
            .output(other, 5, f.bob.public_key())
            .build();
        sign_transaction(&mut tx, &[&f.alice]).unwrap();
        assert!(matches!(
            validate(&f, &tx),
            Err(RuleViolation::ValueNotConserved { inputs: 0, outputs: 5, .. })
        ));
    }

    #[test]
    fn rejects_wrong_signer() {
        let f = fixture();
        let mut tx = TransactionBuilder::new()
            .spend(f.funding)
            .output(f.asset, 100, f.bob.public_key())
            .build();
        sign_transaction(&mut tx, &[&f.bob]).unwrap();
        assert_eq!(
            validate(&f, &tx),
            Err(RuleViolation::InvalidWitness { index: 0 })
        );
    }

    #[test]
    fn rejects_unsigned() {
        let f = fixture();
        let tx = TransactionBuilder::new()
            .spend(f.funding)
            .output(f.asset, 100, f.bob.public_key())
            .build();
        assert_eq!(
            validate(&f, &tx),
            Err(RuleViolation::InvalidWitness { index: 0 })
        );
    }

    #[test]
    fn spent_is_double_spend_and_absent_is_missing() {
        let f = fixture();
        let tx = split(&f, 60, 40);

        let mut spent = SnapshotView::new();
        spent.insert_spent(f.funding);
        assert_eq!(
            BasicValidator::default().validate(&spent, &tx, NOW),
            Err(RuleViolation::DoubleSpend {
                outpoint: f.funding
            })
        );
        assert_eq!(
            BasicValidator::default().validate(&SnapshotView::new(), &tx, NOW),
            Err(RuleViolation::MissingInput {
                outpoint: f.funding
            })
        );
    }

    #[test]
    fn structural_rules_fire_first() {
        let f = fixture();
        let mut tx = split(&f, 60, 40);
        tx.version = 7;
        assert_eq!(
            validate(&f, &tx),
            Err(RuleViolation::UnsupportedVersion { version: 7 })
        );

        let empty = TransactionBuilder::new().build();
        assert_eq!(validate(&f, &empty), Err(RuleViolation::NoInputs));

        let no_outputs = TransactionBuilder::new().spend(f.funding).build();
        assert_eq!(validate(&f, &no_outputs), Err(RuleViolation::NoOutputs));

        let mut dup = TransactionBuilder::new()
            .spend(f.funding)
            .spend(f.funding)
            .output(f.asset, 200, f.bob.public_key())
            .build();
        sign_transaction(&mut dup, &[&f.alice, &f.alice]).unwrap();
        assert_eq!(
            validate(&f, &dup),
            Err(RuleViolation::DuplicateInput {
                outpoint: f.funding
            })
        );

        let mut short = split(&f, 60, 40);
        short.witnesses.clear();
        assert_eq!(
            validate(&f, &short),
            Err(RuleViolation::WitnessCountMismatch {
                inputs: 1,
                witnesses: 0
            })
        );
    }

    #[test]
    fn enforces_configured_limits() {
        let f = fixture();
        let validator = BasicValidator::new(ValidatorConfig {
            max_outputs: 1,
            ..ValidatorConfig::default()
        });
        assert_eq!(
            validator.validate(&f.chain, &split(&f, 60, 40), NOW),
            Err(RuleViolation::TooManyOutputs { count: 2, max: 1 })
        );
    }

    #[test]
    fn rejects_oversized_reference_data() {
        let f = fixture();
        let mut tx = TransactionBuilder::new()
            .spend(f.funding)
            .output(f.asset, 100, f.bob.public_key())
            .reference_data(vec![0u8; MAX_REFERENCE_DATA + 1])
            .build();
        sign_transaction(&mut tx, &[&f.alice]).unwrap();
        assert!(matches!(
            validate(&f, &tx),
            Err(RuleViolation::ReferenceDataTooLarge { .. })
        ));
    }

    #[test]
    fn time_window_is_inclusive() {
        let f = fixture();
        let windowed = |min: u64, max: u64| {
            let mut tx = TransactionBuilder::new()
                .spend(f.funding)
                .output(f.asset, 100, f.bob.public_key())
                .min_time(min)
                .max_time(max)
                .build();
            sign_transaction(&mut tx, &[&f.alice]).unwrap();
            tx
        };

        assert_eq!(validate(&f, &windowed(NOW, NOW)), Ok(()));
        assert_eq!(
            validate(&f, &windowed(NOW + 1, 0)),
            Err(RuleViolation::NotYetValid {
                min_time: NOW + 1,
                now: NOW
            })
        );
        assert_eq!(
            validate(&f, &windowed(0, NOW - 1)),
            Err(RuleViolation::Expired {
                max_time: NOW - 1,
                now: NOW
            })
        );
        assert!(matches!(
            validate(&f, &windowed(NOW + 5, NOW + 1)),
            Err(RuleViolation::InvalidTimeWindow { .. })
        ));
    }

    fn issuance(f: &Fixture, amount: u64, max_time: u64) -> Transaction {
        let mut tx = TransactionBuilder::new()
            .issue(f.asset, amount, f.issuer.public_key(), 1)
            .output(f.asset, amount, f.alice.public_key())
            .max_time(max_time)
            .build();
        sign_transaction(&mut tx, &[&f.issuer]).unwrap();
        tx
    }

    #[test]
    fn accepts_fresh_issuance() {
        let f = fixture();
        assert_eq!(validate(&f, &issuance(&f, 500, NOW + 60)), Ok(()));
    }

    #[test]
    fn issuance_rules() {
        let f = fixture();
        assert_eq!(
            validate(&f, &issuance(&f, 500, 0)),
            Err(RuleViolation::UnboundedIssuance)
        );
        assert_eq!(
            validate(&f, &issuance(&f, 0, NOW + 60)),
            Err(RuleViolation::ZeroAmountOutput { index: 0 })
        );

        let tx = issuance(&f, 500, NOW + 60);
        let key = tx.issuance_keys().next().unwrap();
        let mut used = SnapshotView::new();
        used.mark_issuance_used(key);
        assert_eq!(
            BasicValidator::default().validate(&used, &tx, NOW),
            Err(RuleViolation::IssuanceReused { key })
        );

        let relaxed = BasicValidator::new(ValidatorConfig {
            require_bounded_issuance: false,
            ..ValidatorConfig::default()
        });
        assert_eq!(relaxed.validate(&f.chain, &issuance(&f, 500, 0), NOW), Ok(()));
    }

    #[test]
    fn rejects_issuance_of_foreign_asset() {
        let f = fixture();
        // Bob claims to issue the issuer's asset.
        let mut tx = TransactionBuilder::new()
            .issue(f.asset, 10, f.bob.public_key(), 1)
            .output(f.asset, 10, f.bob.public_key())
            .max_time(NOW + 60)
            .build();
        sign_transaction(&mut tx, &[&f.bob]).unwrap();
        assert_eq!(
            validate(&f, &tx),
            Err(RuleViolation::IssuerMismatch { index: 0 })
        );
    }

    #[test]
    fn amount_overflow_is_detected() {
        let f = fixture();
        let mut tx = TransactionBuilder::new()
            .spend(f.funding)
            .output(f.asset, u64::MAX, f.bob.public_key())
            .output(f.asset, 2, f.bob.public_key())
            .build();
        sign_transaction(&mut tx, &[&f.alice]).unwrap();
        assert_eq!(
            validate(&f, &tx),
            Err(RuleViolation::AmountOverflow { asset: f.asset })
        );
    }

    #[test]
    fn apply_records_consumption_and_creation() {
        let f = fixture();
        let tx = split(&f, 60, 40);
        let validator = BasicValidator::default();

        let mut view = compose(MemView::new(), &f.chain);
        validator.validate(&view, &tx, NOW).unwrap();
        validator.apply(&mut view, &tx).unwrap();

        assert_eq!(view.lookup(&f.funding), Lookup::Spent);
        assert_eq!(
            view.lookup(&tx.outpoint(0)),
            Lookup::Unspent(Output::new(f.asset, 60, f.bob.public_key()))
        );
        let delta = view.into_overlay().into_delta();
        assert_eq!(delta.consumed, vec![f.funding]);
        assert_eq!(delta.created.len(), 2);
        assert!(delta.issuances.is_empty());
    }

    #[test]
    fn apply_records_issuance() {
        let f = fixture();
        let tx = issuance(&f, 500, NOW + 60);
        let mut view = compose(MemView::new(), &f.chain);
        BasicValidator::default().apply(&mut view, &tx).unwrap();
        let key = tx.issuance_keys().next().unwrap();
        assert!(view.issuance_used(&key));
    }

    #[test]
    fn apply_refuses_missing_input() {
        let f = fixture();
        let tx = split(&f, 60, 40);
        let mut view = compose(MemView::new(), SnapshotView::new());
        assert_eq!(
            BasicValidator::default().apply(&mut view, &tx),
            Err(ApplyError::MissingInput {
                outpoint: f.funding
            })
        );
    }
}
