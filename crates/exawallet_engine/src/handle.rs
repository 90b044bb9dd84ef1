//! Exclusive owner of one native pending transaction.
//!
//! Hosts construct an empty handle; the wallet binding that builds
//! transactions binds one with [`PendingTransactionHandle::wrap`]. The native
//! resource is released exactly once: when the handle is dropped or disposed,
//! or, if a commit is still running at that point, when the commit task ends.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, trace, warn};

use crate::tasks::{CommitFuture, CommitJob, CommitOutcome, TaskRunner};
use crate::types::{
    render_amount, CommitReceipt, CommitState, NativePendingTransaction, TransactionSummary,
    WalletError,
};

enum Slot {
    Empty,
    Bound(Arc<dyn NativePendingTransaction>),
    Disposed,
}

pub struct PendingTransactionHandle {
    slot: Slot,
    state: Arc<Mutex<CommitState>>,
}

fn lock(state: &Mutex<CommitState>) -> MutexGuard<'_, CommitState> {
    // CommitState is a plain value, a poisoned lock still holds a usable one
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Default for PendingTransactionHandle {
    fn default() -> Self {
        Self::empty()
    }
}

impl PendingTransactionHandle {
    /// Handle with no native resource behind it (host-side `new`).
    pub fn empty() -> Self {
        Self {
            slot: Slot::Empty,
            state: Arc::new(Mutex::new(CommitState::Idle)),
        }
    }

    /// Take ownership of a native transaction produced by the wallet engine.
    pub fn wrap(native: Box<dyn NativePendingTransaction>) -> Self {
        trace!("binding native pending transaction");
        Self {
            slot: Slot::Bound(Arc::from(native)),
            state: Arc::new(Mutex::new(CommitState::Idle)),
        }
    }

    /// True when no native resource is reachable through this handle.
    pub fn is_empty(&self) -> bool {
        !matches!(self.slot, Slot::Bound(_))
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self.slot, Slot::Disposed)
    }

    pub fn commit_state(&self) -> CommitState {
        lock(&self.state).clone()
    }

    fn native(&self) -> Result<&Arc<dyn NativePendingTransaction>, WalletError> {
        match &self.slot {
            Slot::Bound(native) => Ok(native),
            Slot::Empty => Err(WalletError::EmptyHandle),
            Slot::Disposed => Err(WalletError::Disposed),
        }
    }

    pub fn amount(&self) -> Result<String, WalletError> {
        trace!("amount");
        Ok(render_amount(self.native()?.amount()))
    }

    pub fn dust(&self) -> Result<String, WalletError> {
        trace!("dust");
        Ok(render_amount(self.native()?.dust()))
    }

    pub fn fee(&self) -> Result<String, WalletError> {
        trace!("fee");
        Ok(render_amount(self.native()?.fee()))
    }

    /// Identifiers of the constituent transactions, in native order.
    pub fn transactions_ids(&self) -> Result<Vec<String>, WalletError> {
        trace!("transactions_ids");
        self.native()?.txid()
    }

    /// Hosts receive an unsigned 32-bit count.
    pub fn transactions_count(&self) -> Result<u32, WalletError> {
        trace!("transactions_count");
        let count = self.native()?.tx_count();
        u32::try_from(count).map_err(|_| {
            WalletError::InvalidArgument(format!("transaction count {count} does not fit in u32"))
        })
    }

    pub fn summary(&self) -> Result<TransactionSummary, WalletError> {
        Ok(TransactionSummary {
            amount: self.amount()?,
            dust: self.dust()?,
            fee: self.fee()?,
            transaction_ids: self.transactions_ids()?,
            transaction_count: self.transactions_count()?,
        })
    }

    /// Submit the transaction to `runner` and return at once.
    ///
    /// Exactly one job is submitted per successful call. While a commit is in
    /// flight further calls fail with `CommitInProgress`; after a successful
    /// commit they fail with `AlreadyCommitted`. A failed commit may be
    /// submitted again.
    pub fn commit(&self, runner: &dyn TaskRunner) -> Result<CommitFuture, WalletError> {
        let native = Arc::clone(self.native()?);
        {
            let mut state = lock(&self.state);
            match &*state {
                CommitState::InFlight => return Err(WalletError::CommitInProgress),
                CommitState::Committed => return Err(WalletError::AlreadyCommitted),
                CommitState::Idle | CommitState::Failed(_) => *state = CommitState::InFlight,
            }
        }

        let guard = InFlightGuard {
            state: Arc::clone(&self.state),
            settled: false,
        };
        debug!(tx_count = native.tx_count(), "submitting pending transaction");
        let job: CommitJob = Box::new(move || {
            let mut guard = guard;
            // Ids are read first so an unreadable id never follows a relayed commit
            let outcome = native.txid().and_then(|transaction_ids| {
                native.commit().map(|()| CommitReceipt { transaction_ids })
            });
            guard.settle(&outcome);
            outcome
        });
        Ok(runner.submit(job))
    }

    /// Release the native resource now. Returns false if nothing was bound.
    pub fn dispose(&mut self) -> bool {
        match std::mem::replace(&mut self.slot, Slot::Disposed) {
            Slot::Bound(native) => {
                if Arc::strong_count(&native) > 1 {
                    debug!("commit in flight, release deferred to the commit task");
                } else {
                    trace!("releasing native pending transaction");
                }
                true
            }
            Slot::Empty => {
                self.slot = Slot::Empty;
                false
            }
            Slot::Disposed => false,
        }
    }
}

impl fmt::Debug for PendingTransactionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = match self.slot {
            Slot::Empty => "empty",
            Slot::Bound(_) => "bound",
            Slot::Disposed => "disposed",
        };
        f.debug_struct("PendingTransactionHandle")
            .field("slot", &slot)
            .field("state", &self.commit_state())
            .finish()
    }
}

/// Moves the handle's state out of `InFlight` whatever happens to the job:
/// completion, a panic inside the native commit, or the runner dropping it.
struct InFlightGuard {
    state: Arc<Mutex<CommitState>>,
    settled: bool,
}

impl InFlightGuard {
    fn settle(&mut self, outcome: &CommitOutcome) {
        let next = match outcome {
            Ok(receipt) => {
                debug!(txs = receipt.transaction_ids.len(), "pending transaction committed");
                CommitState::Committed
            }
            Err(e) => {
                warn!(error = %e, "pending transaction commit failed");
                CommitState::Failed(e.to_string())
            }
        };
        *lock(&self.state) = next;
        self.settled = true;
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.settled {
            *lock(&self.state) = CommitState::Failed("commit task did not complete".into());
        }
    }
}
