//! Admission outcomes and failures.

use std::fmt;

use thiserror::Error;

use crate::storage::{ConflictError, StoreError};
use crate::validation::{ApplyError, RuleViolation};

/// Pipeline stage, for error reporting and tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    FetchViews,
    DuplicateCheck,
    Validate,
    ApplyInMemory,
    Persist,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchViews => "fetch_views",
            Self::DuplicateCheck => "duplicate_check",
            Self::Validate => "validate",
            Self::ApplyInMemory => "apply_in_memory",
            Self::Persist => "persist",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successful admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Newly committed to the pool. Callbacks have run.
    Admitted,
    /// Already in the pool or on chain. Nothing changed and nobody was
    /// notified.
    Duplicate,
}

impl Admission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admitted => "admitted",
            Self::Duplicate => "duplicate",
        }
    }
}

/// Why an admission did not happen.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// Storage failed. Nothing was committed; the caller may retry.
    #[error("store unavailable during {stage}: {source}")]
    StoreUnavailable {
        stage: Stage,
        #[source]
        source: StoreError,
    },

    /// The transaction broke a ledger rule.
    #[error("rejected: {0}")]
    ValidationRejected(#[from] RuleViolation),

    /// Another admission committed a conflicting transaction first.
    #[error("conflict at commit: {0}")]
    PersistConflict(#[from] ConflictError),

    /// The validator accepted a transaction its own apply step refused.
    #[error("apply invariant violated: {0}")]
    ApplyInvariantViolation(#[from] ApplyError),

    /// The cancellation token fired before the commit began.
    #[error("cancelled before {stage}")]
    Cancelled { stage: Stage },

    /// A batch task panicked or was aborted.
    #[error("admission task failed: {0}")]
    TaskFailed(String),
}

impl AdmissionError {
    /// The stage at which the attempt stopped, if it maps to one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::StoreUnavailable { stage, .. } | Self::Cancelled { stage } => Some(*stage),
            Self::ValidationRejected(_) => Some(Stage::Validate),
            Self::PersistConflict(_) => Some(Stage::Persist),
            Self::ApplyInvariantViolation(_) => Some(Stage::ApplyInMemory),
            Self::TaskFailed(_) => None,
        }
    }

    /// Retrying the same transaction may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. } | Self::Cancelled { .. })
    }

    /// A permanent rejection of the transaction itself.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::ValidationRejected(_) | Self::PersistConflict(_))
    }
}
