pub mod builders;
pub mod operators;

use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing once per test binary.
///
/// The filter comes from `SPECDAG_LOG`, falling back to `RUST_LOG` and
/// then `"info"`, so the variable that drives the binary also drives the
/// suite. Output goes through `with_test_writer()`: the harness prints it
/// only for failing tests unless `--nocapture` is passed.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = std::env::var("SPECDAG_LOG")
            .map(EnvFilter::new)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}
