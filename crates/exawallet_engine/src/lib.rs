//! exawallet engine (library)
//! Host-independent half of the pending-transaction bindings: the handle
//! wrapper, the commit dispatcher and the runner it submits to. The napi and
//! pyo3 crates stay thin on top of this.

pub mod types;
pub mod config;
pub mod logging;
pub mod tasks;
pub mod handle;
pub mod registry;
#[cfg(feature = "ffi")]
pub mod ffi;

pub use types::{
    render_amount,
    CommitReceipt,
    CommitState,
    NativePendingTransaction,
    TransactionSummary,
    WalletError,
};

pub use config::RunnerConfig;
pub use handle::PendingTransactionHandle;
pub use tasks::{CommitFuture, CommitJob, CommitOutcome, TaskRunner, TokioTaskRunner};
