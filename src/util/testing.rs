//! Test logging setup
//!
//! `RUST_LOG` selects the level; without it tests log at debug.

use std::sync::Once;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static TEST_SETUP: Once = Once::new();

/// Install a global stderr subscriber once per test binary.
pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let layer = fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_filter(env_filter);

        if let Err(e) = tracing_subscriber::registry().with(layer).try_init() {
            eprintln!("Error: Failed to set up logging: {}", e);
        }
        info!("Test setup complete");
    });
}
