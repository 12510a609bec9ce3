//! # Prometheus Metrics
//!
//! Counters and timings for the admission pipeline.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] with the
//! `tally` prefix so they do not collide with any default global registry
//! consumers. The engine takes an `Arc<AdmissionMetrics>` optionally; an
//! engine built without one records nothing.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::admission::{Admission, AdmissionError, AdmissionResult};

/// Label values for `admissions_total{outcome}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Admitted,
    Duplicate,
    Rejected,
    Conflict,
    Unavailable,
    Invariant,
    Cancelled,
    TaskFailed,
}

impl Outcome {
    /// Classify an admission result.
    pub fn of(result: &AdmissionResult) -> Self {
        match result {
            Ok(Admission::Admitted) => Self::Admitted,
            Ok(Admission::Duplicate) => Self::Duplicate,
            Err(AdmissionError::ValidationRejected(_)) => Self::Rejected,
            Err(AdmissionError::PersistConflict(_)) => Self::Conflict,
            Err(AdmissionError::StoreUnavailable { .. }) => Self::Unavailable,
            Err(AdmissionError::ApplyInvariantViolation(_)) => Self::Invariant,
            Err(AdmissionError::Cancelled { .. }) => Self::Cancelled,
            Err(AdmissionError::TaskFailed(_)) => Self::TaskFailed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admitted => "admitted",
            Self::Duplicate => "duplicate",
            Self::Rejected => "rejected",
            Self::Conflict => "conflict",
            Self::Unavailable => "unavailable",
            Self::Invariant => "invariant",
            Self::Cancelled => "cancelled",
            Self::TaskFailed => "task_failed",
        }
    }
}

/// Holds all Prometheus metric handles for admission.
///
/// Prometheus handles are internally reference-counted, so cloning is cheap
/// and every clone records into the same registry.
#[derive(Clone)]
pub struct AdmissionMetrics {
    registry: Registry,
    /// Admission attempts by outcome.
    pub admissions_total: IntCounterVec,
    /// Time spent in `Store::commit_delta`, committed or not.
    pub persist_duration_seconds: Histogram,
    /// Callback invocations after successful commits.
    pub callbacks_invoked_total: IntCounter,
}

impl AdmissionMetrics {
    /// Creates and registers all metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("tally".into()), None)?;

        let admissions_total = IntCounterVec::new(
            Opts::new("admissions_total", "Admission attempts by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(admissions_total.clone()))?;

        let persist_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "persist_duration_seconds",
                "Latency of committing an admitted transaction's delta",
            )
            .buckets(vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ]),
        )?;
        registry.register(Box::new(persist_duration_seconds.clone()))?;

        let callbacks_invoked_total = IntCounter::new(
            "callbacks_invoked_total",
            "Callback invocations for newly admitted transactions",
        )?;
        registry.register(Box::new(callbacks_invoked_total.clone()))?;

        Ok(Self {
            registry,
            admissions_total,
            persist_duration_seconds,
            callbacks_invoked_total,
        })
    }

    pub fn record(&self, outcome: Outcome) {
        self.admissions_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    /// Current count for `outcome`.
    pub fn count(&self, outcome: Outcome) -> u64 {
        self.admissions_total
            .with_label_values(&[outcome.as_str()])
            .get()
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl std::fmt::Debug for AdmissionMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionMetrics").finish_non_exhaustive()
    }
}
