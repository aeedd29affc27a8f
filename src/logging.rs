//! Logging setup for applications embedding the portal workflow.
//!
//! The library itself only emits `tracing` events. Call [`init`] once at
//! startup to print them; `RUST_LOG` overrides the default filter:
//!
//! ```bash
//! RUST_LOG=idcts_portal=debug ./portal    # state transitions and progress ticks
//! RUST_LOG=warn ./portal                  # failed runs and traffic-log analyses only
//! ```

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "idcts_portal=info";

/// Install a global compact subscriber. Fails if one is already installed.
pub fn try_init() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .compact(),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}

/// Like [`try_init`], but a subscriber that is already installed is kept.
pub fn init() {
    let _ = try_init();
}
