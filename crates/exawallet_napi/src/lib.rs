//! exawallet N-API wrapper for Node.js
//! Thin layer over exawallet_engine: string and array conversions only.

use napi::bindgen_prelude::*;
use napi::{Env, JsObject, Task};
use napi_derive::napi;
use std::sync::Arc;

use exawallet_core::WalletError;
use exawallet_engine as engine;
use engine::registry::{self, Registry};
use engine::{
  CommitFuture, CommitReceipt, NativePendingTransaction, PendingTransactionHandle, RunnerConfig,
  TaskRunner, TokioTaskRunner,
};

fn to_napi_err(e: WalletError) -> napi::Error {
  if e.is_precondition() {
    tracing::error!(error = %e, "pending transaction used without a native resource");
  }
  let status = match e {
    WalletError::InvalidArgument(_) => napi::Status::InvalidArg,
    _ => napi::Status::GenericFailure,
  };
  napi::Error::new(status, e.to_string())
}

fn register() -> std::result::Result<&'static Registry, WalletError> {
  registry::init_with(|| {
    let config = RunnerConfig::from_env()?;
    let runner: Arc<dyn TaskRunner> = Arc::new(TokioTaskRunner::new(&config)?);
    Ok(runner)
  })
}

/// Runs once when Node loads the addon: logging first, then class and runner
/// registration from the `EXAWALLET_*` environment.
#[napi::module_init]
fn init() {
  engine::logging::init();
  match register() {
    Ok(registry) => tracing::debug!(classes = registry.classes().len(), "exawallet addon loaded"),
    // commit() reports NotRegistered until the environment is fixed
    Err(e) => tracing::error!(error = %e, "exawallet addon registration failed"),
  }
}

/// Class names registered at load; fails if registration failed.
#[napi]
pub fn registered_classes() -> napi::Result<Vec<String>> {
  let registry = registry::get().map_err(to_napi_err)?;
  Ok(registry.classes().iter().map(|c| c.class_name.to_string()).collect())
}

/// Every field of a pending transaction in one object
#[napi(object)]
pub struct TransactionSummary {
  pub amount: String,
  pub dust: String,
  pub fee: String,
  pub transaction_ids: Vec<String>,
  pub transaction_count: u32,
}

/// Pending transaction handle for Node.js
#[napi]
pub struct PendingTransaction {
  inner: PendingTransactionHandle,
}

impl PendingTransaction {
  /// Bind a native transaction. Used by the wallet binding that creates
  /// transactions; JS code only ever gets empty handles from `new`.
  pub fn from_native(native: Box<dyn NativePendingTransaction>) -> Self {
    Self { inner: PendingTransactionHandle::wrap(native) }
  }
}

#[napi]
impl PendingTransaction {
  #[napi(constructor)]
  pub fn new() -> Self {
    Self { inner: PendingTransactionHandle::empty() }
  }

  /// Commit on the runner thread pool; resolves with the committed transaction ids
  #[napi(ts_return_type = "Promise<string[]>")]
  pub fn commit(&self) -> napi::Result<AsyncTask<CommitTask>> {
    let registry = registry::get().map_err(to_napi_err)?;
    let future = self.inner.commit(registry.runner()).map_err(to_napi_err)?;
    Ok(AsyncTask::new(CommitTask { future: Some(future) }))
  }

  #[napi]
  pub fn amount(&self) -> napi::Result<String> {
    self.inner.amount().map_err(to_napi_err)
  }

  #[napi]
  pub fn dust(&self) -> napi::Result<String> {
    self.inner.dust().map_err(to_napi_err)
  }

  #[napi]
  pub fn fee(&self) -> napi::Result<String> {
    self.inner.fee().map_err(to_napi_err)
  }

  #[napi(ts_return_type = "string[]")]
  pub fn transactions_ids(&self, env: Env) -> napi::Result<JsObject> {
    let ids = self.inner.transactions_ids().map_err(to_napi_err)?;
    let host = |e: napi::Error| to_napi_err(WalletError::transactions_list(e.reason));
    let mut list = env.create_array_with_length(ids.len()).map_err(host)?;
    for (i, id) in ids.iter().enumerate() {
      let value = env.create_string(id).map_err(host)?;
      list.set_element(i as u32, value).map_err(host)?;
    }
    Ok(list)
  }

  #[napi]
  pub fn transactions_count(&self) -> napi::Result<u32> {
    self.inner.transactions_count().map_err(to_napi_err)
  }

  #[napi]
  pub fn summary(&self) -> napi::Result<TransactionSummary> {
    let s = self.inner.summary().map_err(to_napi_err)?;
    Ok(TransactionSummary {
      amount: s.amount,
      dust: s.dust,
      fee: s.fee,
      transaction_ids: s.transaction_ids,
      transaction_count: s.transaction_count,
    })
  }

  /// `idle`, `in-flight`, `committed` or `failed`
  #[napi]
  pub fn commit_state(&self) -> String {
    self.inner.commit_state().as_str().to_string()
  }

  #[napi]
  pub fn is_empty(&self) -> bool {
    self.inner.is_empty()
  }

  /// Release the native transaction now instead of at garbage collection.
  #[napi]
  pub fn dispose(&mut self) -> bool {
    self.inner.dispose()
  }
}

/// Waits for a submitted commit on a libuv worker so the JS thread never blocks.
pub struct CommitTask {
  future: Option<CommitFuture>,
}

impl Task for CommitTask {
  type Output = CommitReceipt;
  type JsValue = Vec<String>;

  fn compute(&mut self) -> napi::Result<Self::Output> {
    let future = self
      .future
      .take()
      .ok_or_else(|| napi::Error::new(napi::Status::GenericFailure, "commit already awaited"))?;
    future.wait().map_err(to_napi_err)
  }

  fn resolve(&mut self, _env: Env, output: Self::Output) -> napi::Result<Self::JsValue> {
    tracing::debug!(txs = output.transaction_ids.len(), "commit promise resolved");
    Ok(output.transaction_ids)
  }
}
