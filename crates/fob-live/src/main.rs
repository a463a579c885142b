//! fob-live binary: argument parsing, logging setup and command dispatch.

use clap::Parser;
use fob_live::{cli, commands, error, logger, ui};
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    let result = match args.command {
        cli::Command::Serve(serve_args) => commands::serve_execute(serve_args).await,
        cli::Command::Entries(entries_args) => commands::entries_execute(entries_args).await,
    };

    result.map_err(error::live_error_to_miette)
}
