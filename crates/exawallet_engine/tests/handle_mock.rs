//! Handle tests against a mock native pending transaction.
//!
//! The mock counts releases and native commits so ownership and the
//! single-commit rule can be checked without a wallet engine.

use exawallet_engine::{
    CommitState, NativePendingTransaction, PendingTransactionHandle, TaskRunner, TokioTaskRunner,
    WalletError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Default, Clone)]
struct Counters {
    released: Arc<AtomicUsize>,
    commits: Arc<AtomicUsize>,
}

impl Counters {
    fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

struct MockTx {
    amount: u64,
    dust: u64,
    fee: u64,
    ids: Vec<String>,
    counters: Counters,
    failures_left: AtomicUsize,
    gate: Option<Mutex<mpsc::Receiver<()>>>,
}

impl MockTx {
    fn new(counters: &Counters) -> Self {
        Self {
            amount: 100,
            dust: 5,
            fee: 1,
            ids: vec!["txA".to_string(), "txB".to_string()],
            counters: counters.clone(),
            failures_left: AtomicUsize::new(0),
            gate: None,
        }
    }

    fn failing(mut self, times: usize) -> Self {
        self.failures_left = AtomicUsize::new(times);
        self
    }

    /// Commit blocks until the returned sender fires (or is dropped).
    fn gated(mut self) -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        self.gate = Some(Mutex::new(rx));
        (self, tx)
    }
}

impl NativePendingTransaction for MockTx {
    fn amount(&self) -> u64 {
        self.amount
    }

    fn dust(&self) -> u64 {
        self.dust
    }

    fn fee(&self) -> u64 {
        self.fee
    }

    fn txid(&self) -> Result<Vec<String>, WalletError> {
        Ok(self.ids.clone())
    }

    fn tx_count(&self) -> u64 {
        self.ids.len() as u64
    }

    fn commit(&self) -> Result<(), WalletError> {
        if let Some(gate) = &self.gate {
            let _ = gate.lock().unwrap().recv();
        }
        self.counters.commits.fetch_add(1, Ordering::SeqCst);
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(WalletError::Commit("daemon is busy".to_string()));
        }
        Ok(())
    }
}

impl Drop for MockTx {
    fn drop(&mut self) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}

fn runner() -> TokioTaskRunner {
    TokioTaskRunner::from_handle(tokio::runtime::Handle::current())
}

#[test]
fn bound_handle_exposes_native_fields() {
    let counters = Counters::default();
    let handle = PendingTransactionHandle::wrap(Box::new(MockTx::new(&counters)));

    assert_eq!(handle.amount().unwrap(), "100");
    assert_eq!(handle.dust().unwrap(), "5");
    assert_eq!(handle.fee().unwrap(), "1");
    assert_eq!(handle.transactions_ids().unwrap(), vec!["txA", "txB"]);
    assert_eq!(handle.transactions_count().unwrap(), 2);
    assert!(!handle.is_empty());
}

#[test]
fn count_matches_id_list_length() {
    let counters = Counters::default();
    let mut tx = MockTx::new(&counters);
    tx.ids = (0..7).map(|i| format!("tx{i}")).collect();
    let handle = PendingTransactionHandle::wrap(Box::new(tx));

    let ids = handle.transactions_ids().unwrap();
    assert_eq!(handle.transactions_count().unwrap() as usize, ids.len());
}

#[test]
fn large_amounts_render_without_rounding() {
    let counters = Counters::default();
    let mut tx = MockTx::new(&counters);
    tx.amount = u64::MAX;
    tx.fee = 0;
    let handle = PendingTransactionHandle::wrap(Box::new(tx));

    assert_eq!(handle.amount().unwrap(), "18446744073709551615");
    assert_eq!(handle.fee().unwrap(), "0");
}

#[test]
fn repeated_reads_return_identical_values() {
    let counters = Counters::default();
    let handle = PendingTransactionHandle::wrap(Box::new(MockTx::new(&counters)));

    let first = handle.summary().unwrap();
    let second = handle.summary().unwrap();
    assert_eq!(first, second);
    assert_eq!(handle.commit_state(), CommitState::Idle);
}

#[test]
fn empty_handle_faults_on_every_accessor() {
    let handle = PendingTransactionHandle::empty();

    assert!(handle.is_empty());
    assert_eq!(handle.amount(), Err(WalletError::EmptyHandle));
    assert_eq!(handle.dust(), Err(WalletError::EmptyHandle));
    assert_eq!(handle.fee(), Err(WalletError::EmptyHandle));
    assert_eq!(handle.transactions_ids(), Err(WalletError::EmptyHandle));
    assert_eq!(handle.transactions_count(), Err(WalletError::EmptyHandle));
    assert_eq!(handle.summary(), Err(WalletError::EmptyHandle));
}

#[test]
fn drop_releases_native_exactly_once() {
    let counters = Counters::default();
    let handle = PendingTransactionHandle::wrap(Box::new(MockTx::new(&counters)));
    assert_eq!(counters.released(), 0);

    drop(handle);
    assert_eq!(counters.released(), 1);
}

#[test]
fn dispose_releases_once_and_later_reads_fault() {
    let counters = Counters::default();
    let mut handle = PendingTransactionHandle::wrap(Box::new(MockTx::new(&counters)));

    assert!(handle.dispose());
    assert_eq!(counters.released(), 1);
    assert!(handle.is_disposed());
    assert_eq!(handle.amount(), Err(WalletError::Disposed));

    assert!(!handle.dispose());
    drop(handle);
    assert_eq!(counters.released(), 1);
}

#[test]
fn disposing_an_empty_handle_keeps_it_empty() {
    let mut handle = PendingTransactionHandle::empty();
    assert!(!handle.dispose());
    assert!(!handle.is_disposed());
    assert_eq!(handle.fee(), Err(WalletError::EmptyHandle));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn commit_on_empty_handle_is_rejected_synchronously() {
    let runner = runner();
    let handle = PendingTransactionHandle::empty();
    assert!(matches!(handle.commit(&runner), Err(WalletError::EmptyHandle)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn commit_resolves_with_transaction_ids() {
    let counters = Counters::default();
    let runner = runner();
    let handle = PendingTransactionHandle::wrap(Box::new(MockTx::new(&counters)));

    let receipt = handle.commit(&runner).unwrap().await.unwrap();
    assert_eq!(receipt.transaction_ids, vec!["txA", "txB"]);
    assert_eq!(handle.commit_state(), CommitState::Committed);
    assert_eq!(counters.commits(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn commit_returns_before_the_native_commit_finishes() {
    let counters = Counters::default();
    let runner = runner();
    let (tx, gate) = MockTx::new(&counters).gated();
    let handle = PendingTransactionHandle::wrap(Box::new(tx));

    let started = Instant::now();
    let fut = handle.commit(&runner).unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(handle.commit_state(), CommitState::InFlight);
    assert_eq!(counters.commits(), 0);

    // Reads stay available and unchanged while the commit runs
    assert_eq!(handle.amount().unwrap(), "100");
    assert_eq!(handle.fee().unwrap(), "1");
    assert_eq!(handle.dust().unwrap(), "5");

    gate.send(()).unwrap();
    fut.await.unwrap();
    assert_eq!(counters.commits(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_commit_while_in_flight_is_rejected() {
    let counters = Counters::default();
    let runner = runner();
    let (tx, gate) = MockTx::new(&counters).gated();
    let handle = PendingTransactionHandle::wrap(Box::new(tx));

    let fut = handle.commit(&runner).unwrap();
    assert!(matches!(handle.commit(&runner), Err(WalletError::CommitInProgress)));

    gate.send(()).unwrap();
    fut.await.unwrap();
    assert!(matches!(handle.commit(&runner), Err(WalletError::AlreadyCommitted)));
    assert_eq!(counters.commits(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_commit_rejects_future_and_allows_resubmission() {
    let counters = Counters::default();
    let runner = runner();
    let handle = PendingTransactionHandle::wrap(Box::new(MockTx::new(&counters).failing(1)));

    let err = handle.commit(&runner).unwrap().await.unwrap_err();
    assert_eq!(err, WalletError::Commit("daemon is busy".to_string()));
    assert!(matches!(handle.commit_state(), CommitState::Failed(_)));

    handle.commit(&runner).unwrap().await.unwrap();
    assert_eq!(handle.commit_state(), CommitState::Committed);
    assert_eq!(counters.commits(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropping_handle_mid_commit_defers_release_to_the_task() {
    let counters = Counters::default();
    let runner = runner();
    let (tx, gate) = MockTx::new(&counters).gated();
    let handle = PendingTransactionHandle::wrap(Box::new(tx));

    let fut = handle.commit(&runner).unwrap();
    drop(handle);
    assert_eq!(counters.released(), 0);

    gate.send(()).unwrap();
    fut.await.unwrap();
    assert_eq!(counters.released(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dispose_mid_commit_defers_release_to_the_task() {
    let counters = Counters::default();
    let runner = runner();
    let (tx, gate) = MockTx::new(&counters).gated();
    let mut handle = PendingTransactionHandle::wrap(Box::new(tx));

    let fut = handle.commit(&runner).unwrap();
    assert!(handle.dispose());
    assert!(handle.is_disposed());
    assert_eq!(handle.amount(), Err(WalletError::Disposed));
    assert_eq!(counters.released(), 0);

    gate.send(()).unwrap();
    let receipt = fut.await.unwrap();
    assert_eq!(receipt.transaction_ids, vec!["txA", "txB"]);
    assert_eq!(counters.released(), 1);
    assert_eq!(handle.commit_state(), CommitState::Committed);

    drop(handle);
    assert_eq!(counters.released(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panicking_native_commit_marks_handle_failed() {
    struct Exploding(Counters);

    impl NativePendingTransaction for Exploding {
        fn amount(&self) -> u64 { 0 }
        fn dust(&self) -> u64 { 0 }
        fn fee(&self) -> u64 { 0 }
        fn txid(&self) -> Result<Vec<String>, WalletError> { Ok(Vec::new()) }
        fn tx_count(&self) -> u64 { 0 }
        fn commit(&self) -> Result<(), WalletError> {
            panic!("native abort")
        }
    }

    impl Drop for Exploding {
        fn drop(&mut self) {
            self.0.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    let counters = Counters::default();
    let runner = runner();
    let handle = PendingTransactionHandle::wrap(Box::new(Exploding(counters.clone())));

    let err = handle.commit(&runner).unwrap().await.unwrap_err();
    assert!(matches!(err, WalletError::TaskRunner(_)));
    assert!(matches!(handle.commit_state(), CommitState::Failed(_)));

    drop(handle);
    assert_eq!(counters.released(), 1);
}

/// Runner that never runs anything: jobs are dropped on submission.
struct DroppingRunner;

impl TaskRunner for DroppingRunner {
    fn submit(&self, job: exawallet_engine::CommitJob) -> exawallet_engine::CommitFuture {
        let (tx, fut) = exawallet_engine::tasks::commit_channel();
        drop(job);
        drop(tx);
        fut
    }
}

#[test]
fn dropped_job_fails_future_and_resets_state() {
    let counters = Counters::default();
    let handle = PendingTransactionHandle::wrap(Box::new(MockTx::new(&counters)));

    let outcome = handle.commit(&DroppingRunner).unwrap().wait();
    assert!(matches!(outcome, Err(WalletError::TaskRunner(_))));
    assert!(matches!(handle.commit_state(), CommitState::Failed(_)));
    assert_eq!(counters.commits(), 0);
}
