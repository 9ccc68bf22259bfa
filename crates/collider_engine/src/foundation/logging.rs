//! Logging utilities and structured logging support
//!
//! The engine only emits records through the `log` facade; binaries decide
//! whether and how to install a backend.

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system with a default filter such as `"info"` or
/// `"collider_engine=debug"`; `RUST_LOG` still takes precedence
pub fn init_with_level(default_filter: &str) {
    let env = env_logger::Env::default().default_filter_or(default_filter);
    // A second initialization (e.g. from tests) is not an error worth surfacing
    let _ = env_logger::Builder::from_env(env).format_timestamp_millis().try_init();
}
