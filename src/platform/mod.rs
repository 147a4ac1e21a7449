//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Logger setup
//! - The exported browser game handle (wasm32 only)

#[cfg(target_arch = "wasm32")]
pub mod wasm;

/// Install the log backend for this platform. Safe to call more than once.
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging() {
    // A second init fails harmlessly
    let _ = env_logger::try_init();
}

/// Install the log backend for this platform. Safe to call more than once.
#[cfg(target_arch = "wasm32")]
pub fn init_logging() {
    use std::sync::Once;

    static INIT: Once = Once::new();
    INIT.call_once(|| {
        console_error_panic_hook::set_once();
        // Fails only if another logger was installed first
        let _ = console_log::init_with_level(log::Level::Info);
    });
}
