// Re-export shared wallet types from exawallet_core to maintain stable paths
pub use exawallet_core::{
    render_amount,
    CommitReceipt,
    CommitState,
    NativePendingTransaction,
    TransactionSummary,
    WalletError,
};
