use serde::{Deserialize, Serialize};

// -----------------------
// Native Resource Port
// -----------------------

/// A pending transaction owned by the native wallet engine.
///
/// Reads are pure. `txid` fails when the engine cannot produce an id it
/// claims to have. `commit` blocks until the native engine has relayed (or
/// refused) the transaction and is only ever called from a task runner thread.
/// Releasing the native resource is the implementor's `Drop`.
pub trait NativePendingTransaction: Send + Sync {
    fn amount(&self) -> u64;
    fn dust(&self) -> u64;
    fn fee(&self) -> u64;
    fn txid(&self) -> Result<Vec<String>, WalletError>;
    fn tx_count(&self) -> u64;
    fn commit(&self) -> Result<(), WalletError>;
}

// -----------------------
// Shared Values
// -----------------------

/// Render an atomic-unit quantity the way hosts receive it: plain base-10.
pub fn render_amount(units: u64) -> String {
    units.to_string()
}

/// Every host-visible field of a pending transaction, captured in one read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub amount: String,
    pub dust: String,
    pub fee: String,
    pub transaction_ids: Vec<String>,
    pub transaction_count: u32,
}

/// Value a successful commit resolves with
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReceipt {
    pub transaction_ids: Vec<String>,
}

/// Commit lifecycle of one handle. A handle commits at most once successfully.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum CommitState {
    #[default]
    Idle,
    InFlight,
    Committed,
    Failed(String),
}

impl CommitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitState::Idle => "idle",
            CommitState::InFlight => "in-flight",
            CommitState::Committed => "committed",
            CommitState::Failed(_) => "failed",
        }
    }
}

// -----------------------
// Errors
// -----------------------

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("pending transaction handle is empty")]
    EmptyHandle,
    #[error("pending transaction handle was disposed")]
    Disposed,
    #[error("commit already in progress")]
    CommitInProgress,
    #[error("transaction already committed")]
    AlreadyCommitted,
    #[error("commit failed: {0}")]
    Commit(String),
    #[error("task runner: {0}")]
    TaskRunner(String),
    #[error("host conversion: {0}")]
    HostConversion(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("not registered: {0}")]
    NotRegistered(String),
}

impl WalletError {
    /// Precondition faults are programming errors on the host side, not
    /// conditions a caller is expected to recover from.
    pub fn is_precondition(&self) -> bool {
        matches!(self, WalletError::EmptyHandle | WalletError::Disposed)
    }

    /// The host refused to build the transaction id list.
    pub fn transactions_list(reason: impl std::fmt::Display) -> Self {
        WalletError::HostConversion(format!("Couldn't make transactions list: {reason}"))
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(e: serde_json::Error) -> Self {
        WalletError::InvalidArgument(format!("json: {e}"))
    }
}
