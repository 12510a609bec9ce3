//! Observers notified of newly admitted transactions.
//!
//! The registry is append-only while the engine is being built and frozen
//! once [`AdmissionEngineBuilder::build`](super::AdmissionEngineBuilder::build)
//! moves it behind an `Arc`. Nothing can register after serving starts.

use std::fmt;

use crate::transaction::Transaction;

/// An admission observer. It must not fail and should return quickly; it
/// runs on the admitting thread, after the commit.
pub type TxCallback = Box<dyn Fn(&Transaction) + Send + Sync>;

#[derive(Default)]
pub struct CallbackRegistry {
    callbacks: Vec<TxCallback>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, callback: TxCallback) {
        self.callbacks.push(callback);
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Invoke every callback with `tx`, in registration order. Returns the
    /// number invoked.
    pub fn notify(&self, tx: &Transaction) -> usize {
        for callback in &self.callbacks {
            callback(tx);
        }
        self.callbacks.len()
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
