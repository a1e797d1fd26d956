//! Logging utilities
//!
//! The library only ever emits through the `log` facade. Binaries and tests
//! pick a backend with one of the init functions below.

pub use log::{debug, info, warn, error, trace};

/// Initialize `env_logger` from `RUST_LOG`. Safe to call more than once.
pub fn init() {
    let _ = env_logger::try_init();
}

/// Initialize `env_logger`, falling back to `level` when `RUST_LOG` is unset.
pub fn init_with_level(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Initialize a test-friendly logger that writes through the test harness.
pub fn init_for_tests() {
    let _ = env_logger::Builder::from_default_env().is_test(true).try_init();
}
