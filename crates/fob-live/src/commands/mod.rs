//! Command implementations for the `fob-live` binary.
//!
//! - [`serve`] - serve and watch a directory, pushing live updates
//! - [`entries`] - print client bootstrap entries

pub mod entries;
pub mod serve;

pub use entries::execute as entries_execute;
pub use serve::execute as serve_execute;

use crate::cli::ConfigArgs;
use crate::config::LiveConfig;
use crate::error::Result;

/// Load configuration relative to the current directory, applying CLI
/// overrides.
pub(crate) fn load_config(args: &ConfigArgs) -> Result<LiveConfig> {
    let cwd = std::env::current_dir()?;
    LiveConfig::load(&cwd, args.config.as_deref(), &args.overrides())
}
