//! `serve` command.
//!
//! Orchestrates the serving lifecycle:
//! - Load configuration and start the live server
//! - Announce the initial content hash
//! - Watch the directory and turn change bursts into build cycles
//! - Graceful shutdown on Ctrl+C

use crate::broadcast::BuildStats;
use crate::cli::ServeArgs;
use crate::error::{LiveError, Result, ResultExt};
use crate::server::LiveServer;
use crate::ui;
use crate::watch::{content_hash, drive_cycles, FileWatcher, IgnoreRules};
use std::time::Duration;
use tokio::signal;

pub async fn execute(args: ServeArgs) -> Result<()> {
    let config = super::load_config(&args.config)?;

    let root = args.dir.canonicalize().with_path(&args.dir)?;
    if !root.is_dir() {
        return Err(LiveError::FileNotFound(root));
    }
    let rules = IgnoreRules::standard().with_patterns(args.ignore.iter().cloned());

    ui::info("Starting live server...");
    let mut server = LiveServer::new(config).with_static_dir(&root);
    let addr = server.listen().await?;

    ui::success(&format!("Serving {} at http://{}", root.display(), addr));
    if let Some(socket) = server.socket() {
        ui::info(&format!(
            "Clients connect via {} at {}",
            socket.transport_name(),
            socket.path()
        ));
    }
    for entry in server.bootstrap_entries()? {
        ui::debug(&format!("Bootstrap entry: {}", entry));
    }

    // Initial build so the first clients get a hash.
    let hash = content_hash(&root, &rules)?;
    server.done(BuildStats::new(hash))?;

    let (watcher, changes) = FileWatcher::new(root.clone(), rules.clone())?;
    ui::info(&format!("Watching for changes in: {}", watcher.root().display()));

    let events = server.compiler_channel()?;
    let driver = tokio::spawn(drive_cycles(
        root,
        rules,
        changes,
        events,
        Duration::from_millis(args.settle_ms),
    ));

    ui::info("Press Ctrl+C to stop");
    signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    ui::info("Shutting down live server...");
    driver.abort();
    drop(watcher);
    server.close().await?;

    ui::success("Live server stopped");
    Ok(())
}
