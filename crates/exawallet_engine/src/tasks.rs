//! Asynchronous task facility behind `commit`.
//!
//! A [`TaskRunner`] accepts a boxed job and hands back a [`CommitFuture`]
//! immediately. The future can be awaited from async code, blocked on from a
//! host worker thread (`wait`), or polled without blocking (`try_take`).

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, warn};

use crate::config::RunnerConfig;
use crate::types::{CommitReceipt, WalletError};

pub type CommitOutcome = Result<CommitReceipt, WalletError>;
pub type CommitJob = Box<dyn FnOnce() -> CommitOutcome + Send + 'static>;

pub trait TaskRunner: Send + Sync {
    /// Schedule `job` without waiting for it.
    fn submit(&self, job: CommitJob) -> CommitFuture;
}

/// Create a linked sender/future pair. Runners other than
/// [`TokioTaskRunner`] use this to plug their own threads in.
pub fn commit_channel() -> (CommitSender, CommitFuture) {
    let (tx, rx) = oneshot::channel();
    (CommitSender { tx }, CommitFuture { rx })
}

fn dropped_before_completion() -> WalletError {
    WalletError::TaskRunner("commit task dropped before completion".into())
}

/// Producer half, owned by whichever thread runs the job.
pub struct CommitSender {
    tx: oneshot::Sender<CommitOutcome>,
}

impl CommitSender {
    pub fn complete(self, outcome: CommitOutcome) {
        if self.tx.send(outcome).is_err() {
            debug!("commit future dropped before the task finished");
        }
    }

    /// Run `job` on the current thread and deliver its outcome. A panic in
    /// the job resolves the future with a `TaskRunner` error.
    pub fn run(self, job: CommitJob) {
        let outcome = catch_unwind(AssertUnwindSafe(job)).unwrap_or_else(|_| {
            warn!("commit task panicked");
            Err(WalletError::TaskRunner("commit task panicked".into()))
        });
        self.complete(outcome);
    }
}

/// Consumer half returned to the caller of `commit`.
pub struct CommitFuture {
    rx: oneshot::Receiver<CommitOutcome>,
}

impl CommitFuture {
    /// Block the current thread until the job finishes.
    /// Must not be called from inside an async runtime.
    pub fn wait(self) -> CommitOutcome {
        self.rx
            .blocking_recv()
            .unwrap_or_else(|_| Err(dropped_before_completion()))
    }

    /// `None` while the job is still running. The outcome is yielded once.
    pub fn try_take(&mut self) -> Option<CommitOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(dropped_before_completion())),
        }
    }
}

impl Future for CommitFuture {
    type Output = CommitOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(dropped_before_completion())),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Runs commit jobs on tokio's blocking pool. Native commits block on network
/// I/O inside the wallet engine, so they never run on the async workers.
pub struct TokioTaskRunner {
    handle: Handle,
    // Kept alive for runners that own their runtime
    _runtime: Option<Runtime>,
}

impl TokioTaskRunner {
    /// Build a dedicated runtime from `config`.
    pub fn new(config: &RunnerConfig) -> Result<Self, WalletError> {
        config.validate()?;
        let runtime = Builder::new_multi_thread()
            .worker_threads(config.worker_threads)
            .max_blocking_threads(config.max_blocking_threads)
            .thread_name(config.thread_name.clone())
            .build()
            .map_err(|e| WalletError::TaskRunner(format!("build runtime: {e}")))?;
        debug!(
            workers = config.worker_threads,
            max_blocking = config.max_blocking_threads,
            "commit runtime started"
        );
        Ok(Self {
            handle: runtime.handle().clone(),
            _runtime: Some(runtime),
        })
    }

    /// Borrow a runtime somebody else owns (e.g. the host's or a test's).
    pub fn from_handle(handle: Handle) -> Self {
        Self { handle, _runtime: None }
    }
}

impl TaskRunner for TokioTaskRunner {
    fn submit(&self, job: CommitJob) -> CommitFuture {
        let (tx, fut) = commit_channel();
        self.handle.spawn_blocking(move || tx.run(job));
        fut
    }
}
