//! Status message functions for terminal output.

use owo_colors::OwoColorize;

/// Print a success message to stderr.
///
/// ```no_run
/// use fob_live::ui::success;
///
/// success("Live server listening on 127.0.0.1:8080");
/// ```
pub fn success(message: &str) {
    if !super::colors_enabled() {
        eprintln!("✓ {}", message);
        return;
    }
    eprintln!("{} {}", "✓".green().bold(), message);
}

/// Print an info message to stderr.
pub fn info(message: &str) {
    if !super::colors_enabled() {
        eprintln!("ℹ {}", message);
        return;
    }
    eprintln!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a warning message to stderr.
pub fn warning(message: &str) {
    if !super::colors_enabled() {
        eprintln!("⚠ {}", message);
        return;
    }
    eprintln!("{} {}", "⚠".yellow().bold(), message.yellow());
}

/// Print an error message to stderr.
pub fn error(message: &str) {
    if !super::colors_enabled() {
        eprintln!("✗ {}", message);
        return;
    }
    eprintln!("{} {}", "✗".red().bold(), message.red());
}

/// Print a debug message to stderr (only if RUST_LOG is set).
pub fn debug(message: &str) {
    if std::env::var("RUST_LOG").is_ok() {
        eprintln!("{} {}", "◆".dimmed(), message.dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_messages() {
        success("Success message");
        info("Info message");
        warning("Warning message");
        error("Error message");
        debug("Debug message");
    }
}
