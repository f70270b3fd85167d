//! Logging setup.
//!
//! Modules log through `use crate::tracing::prelude::*`. Embedding servers
//! call [`init`] once at startup.

use tracing_subscriber::{EnvFilter, prelude::*};

pub mod prelude {
    #[allow(unused_imports)]
    pub use ::tracing::{debug, error, info, trace, warn};
}

/// `RUST_LOG`, or `info` when unset or unparsable.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber.
///
/// `RUST_LOG` filters, defaulting to `info`. Under systemd (`JOURNAL_STREAM`
/// set) events go to journald; otherwise to stderr.
pub fn init() -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter());

    if std::env::var_os("JOURNAL_STREAM").is_some() {
        if let Ok(journald) = tracing_journald::layer() {
            registry.with(journald).try_init()?;
            return Ok(());
        }
    }

    registry
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(tracing_subscriber::fmt::time::LocalTime::rfc_3339()),
        )
        .try_init()?;
    Ok(())
}
