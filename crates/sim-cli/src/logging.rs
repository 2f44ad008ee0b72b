//! Tracing subscriber setup.

use std::sync::OnceLock;

use tracing_subscriber::fmt::SubscriberBuilder;
use tracing_subscriber::EnvFilter;

/// Filter applied when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "warn";

static INIT: OnceLock<()> = OnceLock::new();

/// Installs a compact stderr subscriber filtered by `RUST_LOG`. Later calls
/// are no-ops.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        SubscriberBuilder::default()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .compact()
            .init();
    });
    tracing::debug!("tracing initialised");
}
