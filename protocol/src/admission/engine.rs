//! The admission pipeline.
//!
//! ```text
//! fetch views ─▶ duplicate? ─▶ validate ─▶ apply (overlay) ─▶ persist ─▶ notify
//!                   │yes          │err         │err              │conflict
//!                   ▼             ▼            ▼                 ▼
//!               Duplicate     Rejected     Invariant          Conflict
//! ```
//!
//! Each run is synchronous and owns its overlay outright, so the engine
//! holds no lock of its own. Concurrent admissions meet only inside
//! [`Store::commit_delta`], which is the single visibility boundary.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn};

use super::callbacks::{CallbackRegistry, TxCallback};
use super::clock::{Clock, SystemClock};
use super::error::{Admission, AdmissionError, Stage};
use crate::config::AdmissionConfig;
use crate::metrics::{AdmissionMetrics, Outcome};
use crate::state::{compose, layered, MemView, View, ViewScope};
use crate::storage::{CommitError, CommitOutcome, Store};
use crate::transaction::{Transaction, TxHash};
use crate::validation::Validator;

pub type AdmissionResult = Result<Admission, AdmissionError>;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Assembles an [`AdmissionEngine`]. Callbacks can only be registered here.
pub struct AdmissionEngineBuilder<S, V> {
    store: Arc<S>,
    validator: Arc<V>,
    callbacks: CallbackRegistry,
    clock: Arc<dyn Clock>,
    config: AdmissionConfig,
    metrics: Option<Arc<AdmissionMetrics>>,
}

impl<S: Store, V: Validator> AdmissionEngineBuilder<S, V> {
    pub fn new(store: S, validator: V) -> Self {
        Self::from_shared(Arc::new(store), Arc::new(validator))
    }

    /// Build over a store and validator the caller keeps handles to.
    pub fn from_shared(store: Arc<S>, validator: Arc<V>) -> Self {
        Self {
            store,
            validator,
            callbacks: CallbackRegistry::new(),
            clock: Arc::new(SystemClock),
            config: AdmissionConfig::default(),
            metrics: None,
        }
    }

    /// Register an observer for newly admitted transactions.
    pub fn on_admit<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Transaction) + Send + Sync + 'static,
    {
        self.callbacks.register(Box::new(callback) as TxCallback);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(mut self, config: AdmissionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn metrics(mut self, metrics: Arc<AdmissionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Freeze the callback registry and produce the engine.
    pub fn build(self) -> AdmissionEngine<S, V> {
        AdmissionEngine {
            store: self.store,
            validator: self.validator,
            callbacks: Arc::new(self.callbacks),
            clock: self.clock,
            config: self.config,
            metrics: self.metrics,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Admits transactions into the pool.
///
/// Cloning is cheap: every clone shares the same store, validator, callbacks
/// and metrics.
pub struct AdmissionEngine<S, V> {
    store: Arc<S>,
    validator: Arc<V>,
    callbacks: Arc<CallbackRegistry>,
    clock: Arc<dyn Clock>,
    config: AdmissionConfig,
    metrics: Option<Arc<AdmissionMetrics>>,
}

impl<S, V> Clone for AdmissionEngine<S, V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            validator: Arc::clone(&self.validator),
            callbacks: Arc::clone(&self.callbacks),
            clock: Arc::clone(&self.clock),
            config: self.config.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<S, V> std::fmt::Debug for AdmissionEngine<S, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionEngine")
            .field("callbacks", &self.callbacks)
            .field("config", &self.config)
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}

impl<S: Store, V: Validator> AdmissionEngine<S, V> {
    pub fn builder(store: S, validator: V) -> AdmissionEngineBuilder<S, V> {
        AdmissionEngineBuilder::new(store, validator)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn validator(&self) -> &V {
        &self.validator
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    pub fn metrics(&self) -> Option<&AdmissionMetrics> {
        self.metrics.as_deref()
    }

    /// Admit `tx` into the pool.
    ///
    /// `Ok(Admitted)` means the transaction's effects are durable and every
    /// callback has run. `Ok(Duplicate)` means it was already known and
    /// nothing happened. Blocks on store I/O.
    pub fn admit(&self, tx: &Transaction) -> AdmissionResult {
        self.run(tx, None)
    }

    /// [`admit`](Self::admit), giving up before the commit if `cancel` fires.
    /// Once the commit has started it runs to completion, notification
    /// included.
    pub fn admit_with_cancel(&self, tx: &Transaction, cancel: &CancellationToken) -> AdmissionResult {
        self.run(tx, Some(cancel))
    }

    fn run(&self, tx: &Transaction, cancel: Option<&CancellationToken>) -> AdmissionResult {
        let hash = tx.hash();
        let span = info_span!("admit", tx = %hash);
        let _enter = span.enter();

        let result = self.pipeline(tx, hash, cancel);
        self.observe(&result);
        result
    }

    fn pipeline(
        &self,
        tx: &Transaction,
        hash: TxHash,
        cancel: Option<&CancellationToken>,
    ) -> AdmissionResult {
        let checkpoint = |stage: Stage| match cancel {
            Some(token) if token.is_cancelled() => Err(AdmissionError::Cancelled { stage }),
            _ => Ok(()),
        };

        checkpoint(Stage::FetchViews)?;
        let scope = ViewScope::for_tx(tx);
        let pool = self
            .store
            .pool_view(&scope)
            .map_err(|source| AdmissionError::StoreUnavailable {
                stage: Stage::FetchViews,
                source,
            })?;
        let chain = self
            .store
            .chain_view(&scope)
            .map_err(|source| AdmissionError::StoreUnavailable {
                stage: Stage::FetchViews,
                source,
            })?;

        checkpoint(Stage::DuplicateCheck)?;
        let existence = self.store.lookup_existence(&hash).map_err(|source| {
            AdmissionError::StoreUnavailable {
                stage: Stage::DuplicateCheck,
                source,
            }
        })?;
        if existence.exists() {
            debug!(
                in_pool = existence.in_pool,
                in_chain = existence.in_chain,
                "already known"
            );
            return Ok(Admission::Duplicate);
        }

        let mut view = compose(MemView::new(), layered([&pool as &dyn View, &chain]));

        checkpoint(Stage::Validate)?;
        self.validator.validate(&view, tx, self.clock.now_unix())?;

        checkpoint(Stage::ApplyInMemory)?;
        self.validator.apply(&mut view, tx)?;
        let delta = view.into_overlay().into_delta();

        checkpoint(Stage::Persist)?;
        let started = Instant::now();
        let committed = self.store.commit_delta(tx, &delta);
        if let Some(metrics) = &self.metrics {
            metrics
                .persist_duration_seconds
                .observe(started.elapsed().as_secs_f64());
        }

        match committed {
            Ok(CommitOutcome::Committed) => {}
            Ok(CommitOutcome::AlreadyPresent) => {
                debug!("lost same-transaction race at commit");
                return Ok(Admission::Duplicate);
            }
            Err(CommitError::Conflict(conflict)) => return Err(conflict.into()),
            Err(CommitError::Store(source)) => {
                return Err(AdmissionError::StoreUnavailable {
                    stage: Stage::Persist,
                    source,
                })
            }
        }

        let invoked = self.callbacks.notify(tx);
        if let Some(metrics) = &self.metrics {
            metrics.callbacks_invoked_total.inc_by(invoked as u64);
        }
        Ok(Admission::Admitted)
    }

    fn observe(&self, result: &AdmissionResult) {
        match result {
            Ok(Admission::Admitted) => info!("admitted"),
            Ok(Admission::Duplicate) => debug!("duplicate"),
            Err(AdmissionError::Cancelled { stage }) => debug!(stage = %stage, "cancelled"),
            Err(e @ AdmissionError::StoreUnavailable { stage, .. }) => {
                warn!(error = %e, stage = %stage, "store unavailable")
            }
            Err(e @ AdmissionError::ApplyInvariantViolation(_)) => {
                error!(error = %e, "validator accepted a transaction it cannot apply")
            }
            Err(e @ AdmissionError::TaskFailed(_)) => error!(error = %e, "task failed"),
            Err(e) => warn!(error = %e, "not admitted"),
        }
        if let Some(metrics) = &self.metrics {
            metrics.record(Outcome::of(result));
        }
    }
}

impl<S, V> AdmissionEngine<S, V>
where
    S: Store + 'static,
    V: Validator + 'static,
{
    /// Admit every transaction in `txs` in parallel on the blocking pool,
    /// at most `batch_concurrency` at a time.
    ///
    /// Results come back in input order. A panic inside one admission (a
    /// defective callback, say) becomes [`AdmissionError::TaskFailed`] in
    /// that slot and leaves the rest of the batch alone.
    pub async fn admit_batch(&self, txs: Vec<Transaction>) -> Vec<AdmissionResult> {
        let semaphore = Arc::new(Semaphore::new(self.config.batch_concurrency.max(1)));

        let tasks = txs.into_iter().map(|tx| {
            let engine = self.clone();
            let semaphore = Arc::clone(&semaphore);
            async move {
                let permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return Err(AdmissionError::TaskFailed(e.to_string())),
                };
                let handle = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    engine.admit(&tx)
                });
                handle.await.unwrap_or_else(|e| Err(task_failed(e)))
            }
        });

        let results = futures::future::join_all(tasks).await;
        if let Some(metrics) = &self.metrics {
            for result in &results {
                if matches!(result, Err(AdmissionError::TaskFailed(_))) {
                    metrics.record(Outcome::TaskFailed);
                }
            }
        }
        results
    }
}

fn task_failed(err: JoinError) -> AdmissionError {
    if !err.is_panic() {
        error!(error = %err, "admission task aborted");
        return AdmissionError::TaskFailed(err.to_string());
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    error!(panic = %message, "admission task panicked");
    AdmissionError::TaskFailed(format!("panicked: {message}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
