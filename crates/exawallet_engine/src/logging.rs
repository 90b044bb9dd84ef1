//! Subscriber setup shared by the host modules.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const ENV_LOG: &str = "EXAWALLET_LOG";

/// Install a fmt subscriber filtered by `EXAWALLET_LOG` (default `info`).
///
/// Returns `false` when a global subscriber is already set, which happens when
/// the host loads the module twice or embeds its own subscriber.
pub fn init() -> bool {
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}
