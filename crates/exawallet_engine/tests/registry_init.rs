// Registration is process-global, so this binary holds a single test.

use exawallet_engine::registry::{self, PENDING_TRANSACTION};
use exawallet_engine::{RunnerConfig, TaskRunner, TokioTaskRunner, WalletError};
use std::sync::Arc;

#[test]
fn register_once_then_reuse() {
    assert!(matches!(registry::get(), Err(WalletError::NotRegistered(_))));

    let runner: Arc<dyn TaskRunner> = Arc::new(TokioTaskRunner::new(&RunnerConfig::default()).unwrap());
    let first = registry::init(runner);
    let again = registry::init_with(|| panic!("runner must not be rebuilt")).unwrap();
    assert!(std::ptr::eq(first, again));
    assert!(std::ptr::eq(first, registry::get().unwrap()));

    let class = first.class("PendingTransaction").unwrap();
    assert_eq!(*class, PENDING_TRANSACTION);
    assert_eq!(
        class.methods,
        &["commit", "amount", "dust", "fee", "transactionsIds", "transactionsCount"]
    );
    assert!(first.class("Wallet").is_none());
    assert_eq!(first.classes().len(), 1);
}
