//! # Protocol Configuration & Constants
//!
//! Every tunable number in Tally lives here, next to the two runtime config
//! structs that carry the subset callers are allowed to change:
//! [`AdmissionConfig`] for the pipeline and [`ValidatorConfig`] for the
//! reference rule set.

// ---------------------------------------------------------------------------
// Transaction Format
// ---------------------------------------------------------------------------

/// Current transaction format version. Validators reject anything else.
pub const TX_VERSION: u16 = 1;

/// Domain tag mixed into every transaction hash so a tx hash can never
/// collide with an asset id or issuance key computed over the same bytes.
pub const TX_HASH_DOMAIN: &[u8] = b"tally/tx";

/// Domain tag for asset identifiers derived from an issuer key.
pub const ASSET_ID_DOMAIN: &[u8] = b"tally/asset";

/// Domain tag for issuance keys.
pub const ISSUANCE_KEY_DOMAIN: &[u8] = b"tally/issuance";

// ---------------------------------------------------------------------------
// Transaction Limits
// ---------------------------------------------------------------------------

/// Maximum number of inputs per transaction. Keeps validation bounded.
pub const MAX_TX_INPUTS: usize = 256;

/// Maximum number of outputs per transaction.
pub const MAX_TX_OUTPUTS: usize = 256;

/// Maximum reference data attached to a transaction, in bytes.
pub const MAX_REFERENCE_DATA: usize = 1024;

// ---------------------------------------------------------------------------
// Admission
// ---------------------------------------------------------------------------

/// Default number of admissions a batch runs in parallel.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 16;

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// sled tree holding confirmed unspent outputs, keyed by outpoint.
pub const TREE_CHAIN_UTXOS: &str = "chain_utxos";

/// sled tree holding hashes of confirmed transactions.
pub const TREE_CHAIN_TXS: &str = "chain_txs";

/// sled tree holding outputs created by pool transactions and not yet
/// spent inside the pool.
pub const TREE_POOL_UTXOS: &str = "pool_utxos";

/// sled tree mapping each outpoint consumed in the pool to its spender.
pub const TREE_POOL_SPENT: &str = "pool_spent";

/// sled tree holding full pool transactions keyed by hash.
pub const TREE_POOL_TXS: &str = "pool_txs";

/// sled tree holding issuance keys used by pool or chain transactions.
pub const TREE_ISSUANCES: &str = "issuances";

// ---------------------------------------------------------------------------
// Runtime configuration
// ---------------------------------------------------------------------------

/// Tunables for the admission pipeline.
#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    /// Upper bound on admissions running concurrently inside one
    /// [`admit_batch`](crate::admission::AdmissionEngine::admit_batch) call.
    pub batch_concurrency: usize,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
        }
    }
}

/// Tunables for [`BasicValidator`](crate::validation::BasicValidator).
///
/// Defaults match the protocol limits above. Tests lower them to exercise
/// the limit checks without building 257-input transactions.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Maximum number of inputs accepted per transaction.
    pub max_inputs: usize,

    /// Maximum number of outputs accepted per transaction.
    pub max_outputs: usize,

    /// When set, transactions carrying issuance inputs must declare a
    /// `max_time`. Unbounded issuances would force the issuance-key index
    /// to be kept forever.
    pub require_bounded_issuance: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_inputs: MAX_TX_INPUTS,
            max_outputs: MAX_TX_OUTPUTS,
            require_bounded_issuance: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_tags_are_distinct() {
        assert_ne!(TX_HASH_DOMAIN, ASSET_ID_DOMAIN);
        assert_ne!(TX_HASH_DOMAIN, ISSUANCE_KEY_DOMAIN);
        assert_ne!(ASSET_ID_DOMAIN, ISSUANCE_KEY_DOMAIN);
    }

    #[test]
    fn tree_names_are_distinct() {
        let names = [
            TREE_CHAIN_UTXOS,
            TREE_CHAIN_TXS,
            TREE_POOL_UTXOS,
            TREE_POOL_SPENT,
            TREE_POOL_TXS,
            TREE_ISSUANCES,
        ];
        let unique: std::collections::HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn default_configs_follow_protocol_limits() {
        let v = ValidatorConfig::default();
        assert_eq!(v.max_inputs, MAX_TX_INPUTS);
        assert_eq!(v.max_outputs, MAX_TX_OUTPUTS);
        assert!(v.require_bounded_issuance);

        let a = AdmissionConfig::default();
        assert_eq!(a.batch_concurrency, DEFAULT_BATCH_CONCURRENCY);
        assert!(a.batch_concurrency > 0);
    }
}
