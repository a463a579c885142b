//! Command-line interface of the `fob-live` binary.
//!
//! - `fob-live serve [DIR]` - serve a directory and push live updates on change
//! - `fob-live entries` - print the client bootstrap entries as JSON

mod commands;
mod validation;

use clap::Parser;

pub use commands::{Command, ConfigArgs, EntriesArgs, ServeArgs};
pub use validation::parse_socket_path;

/// fob-live - live-update channel for development servers
#[derive(Parser, Debug)]
#[command(
    name = "fob-live",
    version,
    about = "Live-update channel for development servers",
    long_about = "fob-live keeps browsers connected to a development server over a socket\n\
                  transport (WebSocket or SockJS) and pushes build status to them: rebuild\n\
                  started, content hash, and the resulting errors or warnings."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}
