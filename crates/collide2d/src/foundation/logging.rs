//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system.
///
/// Safe to call more than once; later calls are ignored. Filtering follows
/// the `RUST_LOG` environment variable.
pub fn init() {
    let _ = env_logger::builder().is_test(cfg!(test)).try_init();
}
