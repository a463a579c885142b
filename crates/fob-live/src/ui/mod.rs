//! Terminal status output for the `fob-live` binary.
//!
//! Library code logs through `tracing`; these helpers are for the short,
//! user-facing lines the CLI prints while serving.

mod messages;

use std::sync::atomic::{AtomicBool, Ordering};

pub use messages::{debug, error, info, success, warning};

static COLORS_ENABLED: AtomicBool = AtomicBool::new(true);

/// Initialize color support for terminal output.
///
/// Call once at startup, after parsing `--no-color`.
pub fn init_colors(no_color: bool) {
    let enabled = !no_color && crate::logger::should_use_colors();
    COLORS_ENABLED.store(enabled, Ordering::Relaxed);
}

pub(crate) fn colors_enabled() -> bool {
    COLORS_ENABLED.load(Ordering::Relaxed)
}
