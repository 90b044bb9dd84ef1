//! Process-wide type registration.
//!
//! Host modules call [`init`] once while loading. It records the classes the
//! host exposes and the task runner every `commit` is dispatched to.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::info;

use crate::tasks::TaskRunner;
use crate::types::WalletError;

/// Name and method table of a host-visible class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassTemplate {
    pub class_name: &'static str,
    pub methods: &'static [&'static str],
}

pub const PENDING_TRANSACTION: ClassTemplate = ClassTemplate {
    class_name: "PendingTransaction",
    methods: &[
        "commit",
        "amount",
        "dust",
        "fee",
        "transactionsIds",
        "transactionsCount",
    ],
};

pub struct Registry {
    runner: Arc<dyn TaskRunner>,
    classes: Vec<ClassTemplate>,
}

impl Registry {
    pub fn runner(&self) -> &dyn TaskRunner {
        self.runner.as_ref()
    }

    pub fn class(&self, name: &str) -> Option<&ClassTemplate> {
        self.classes.iter().find(|c| c.class_name == name)
    }

    pub fn classes(&self) -> &[ClassTemplate] {
        &self.classes
    }
}

static REGISTRY: OnceCell<Registry> = OnceCell::new();

/// Register the host classes and the commit runner. Only the first call
/// installs anything; later calls get the existing registry back and their
/// runner is discarded.
pub fn init(runner: Arc<dyn TaskRunner>) -> &'static Registry {
    REGISTRY.get_or_init(|| {
        info!(class = PENDING_TRANSACTION.class_name, "registering host classes");
        Registry {
            runner,
            classes: vec![PENDING_TRANSACTION],
        }
    })
}

/// Like [`init`], building the runner lazily so a failure to build it is
/// reported instead of leaving the module half-registered.
pub fn init_with<F>(make_runner: F) -> Result<&'static Registry, WalletError>
where
    F: FnOnce() -> Result<Arc<dyn TaskRunner>, WalletError>,
{
    REGISTRY.get_or_try_init(|| {
        let runner = make_runner()?;
        info!(class = PENDING_TRANSACTION.class_name, "registering host classes");
        Ok(Registry {
            runner,
            classes: vec![PENDING_TRANSACTION],
        })
    })
}

pub fn get() -> Result<&'static Registry, WalletError> {
    REGISTRY
        .get()
        .ok_or_else(|| WalletError::NotRegistered("host classes not registered; load the module first".into()))
}
