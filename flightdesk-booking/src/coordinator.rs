use flightdesk_core::repository::{StoreTransaction, TransactionalStore};
use flightdesk_core::{EngineResult, StoreError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Opens serializable transaction scopes on a store and keeps count of the
/// ones still alive.
pub struct TransactionCoordinator<S> {
    store: Arc<S>,
    open: Arc<AtomicUsize>,
}

impl<S> Clone for TransactionCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            open: self.open.clone(),
        }
    }
}

impl<S: TransactionalStore> TransactionCoordinator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            open: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Scopes that have been opened and not yet dropped.
    pub fn open_transactions(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    pub async fn begin(&self) -> EngineResult<TxScope<S::Tx>> {
        let tx = self.store.begin().await?;
        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(TxScope {
            tx: Some(tx),
            state: ScopeState::Open,
            open: self.open.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    Open,
    Committed,
    RolledBack,
}

/// One begin/commit bracket. Closing it consumes the scope; a scope that is
/// dropped while still open rolls its transaction back.
pub struct TxScope<T> {
    tx: Option<T>,
    state: ScopeState,
    open: Arc<AtomicUsize>,
}

impl<T: StoreTransaction> TxScope<T> {
    pub fn state(&self) -> ScopeState {
        self.state
    }

    pub fn tx(&mut self) -> EngineResult<&mut T> {
        self.tx
            .as_mut()
            .ok_or_else(|| StoreError::Invariant("transaction scope already closed".to_string()).into())
    }

    pub async fn commit(mut self) -> EngineResult<()> {
        let tx = self.take()?;
        match tx.commit().await {
            Ok(()) => {
                self.state = ScopeState::Committed;
                debug!("Transaction committed");
                Ok(())
            }
            Err(e) => {
                // a failed commit leaves nothing applied
                self.state = ScopeState::RolledBack;
                Err(e.into())
            }
        }
    }

    pub async fn rollback(mut self) -> EngineResult<()> {
        let tx = self.take()?;
        self.state = ScopeState::RolledBack;
        tx.rollback().await?;
        debug!("Transaction rolled back");
        Ok(())
    }

    /// Commit a successful outcome, roll back a failed one. The outcome is
    /// handed back unchanged unless the commit itself fails.
    pub async fn finish<V>(self, outcome: EngineResult<V>) -> EngineResult<V> {
        match outcome {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = self.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    fn take(&mut self) -> EngineResult<T> {
        self.tx
            .take()
            .ok_or_else(|| StoreError::Invariant("transaction scope already closed".to_string()).into())
    }
}

impl<T> Drop for TxScope<T> {
    fn drop(&mut self) {
        if self.state == ScopeState::Open {
            warn!("Transaction scope dropped while open, rolling back");
        }
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}
